//! The effective variables of one component.

use super::{VariableMap, value_to_string};
use regex::{Captures, Regex};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::LazyLock;

/// Matches `${{ name }}` with exactly one space inside each delimiter.
static TOKEN_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\{\{ ([^\s{}]+) \}\}").expect("token pattern is valid"));

/// Replace every known `${{ name }}` token in `text` with the value from `values`.
///
/// The text is scanned once and inserted values are never rescanned, so a value
/// that itself contains a token ends up in the output with that token literal.
/// Tokens naming unknown variables are left untouched.
pub(crate) fn substitute_tokens(text: &str, values: &VariableMap) -> String {
    TOKEN_PATTERN
        .replace_all(text, |caps: &Captures<'_>| match values.get(&caps[1]) {
            Some(value) => value_to_string(value),
            None => caps[0].to_string(),
        })
        .into_owned()
}

/// Immutable, validated variable map of a component.
///
/// Built by [`VariableCollectionBuilder`](super::VariableCollectionBuilder).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VariableCollection {
    values: VariableMap,
}

impl VariableCollection {
    /// Wrap an already merged map.
    #[must_use]
    pub const fn new(values: VariableMap) -> Self {
        Self {
            values,
        }
    }

    /// Value of a variable.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    /// All variables, ordered by name.
    #[must_use]
    pub const fn values(&self) -> &VariableMap {
        &self.values
    }

    /// Number of variables.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the collection is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Substitute `${{ name }}` tokens in `text`.
    ///
    /// Only one level of expansion happens per call; see [`substitute_tokens`].
    #[must_use]
    pub fn substitute(&self, text: &str) -> String {
        substitute_tokens(text, &self.values)
    }

    /// The variables as environment entries, without the inherited environment.
    ///
    /// Dots in names become underscores; arrays and objects are JSON-encoded.
    #[must_use]
    pub fn exported_env(&self) -> HashMap<String, String> {
        self.values
            .iter()
            .map(|(name, value)| (env_var_name(name), value_to_string(value)))
            .collect()
    }

    /// The inherited process environment with [`exported_env`](Self::exported_env)
    /// applied on top. Exported names win on collision.
    ///
    /// Inherited entries that are not valid Unicode are left out.
    #[must_use]
    pub fn as_env_vars(&self) -> HashMap<String, String> {
        let mut env: HashMap<String, String> = std::env::vars_os()
            .filter_map(|(key, value)| Some((key.into_string().ok()?, value.into_string().ok()?)))
            .collect();
        env.extend(self.exported_env());
        env
    }
}

/// Environment variable name for a variable name.
#[must_use]
pub fn env_var_name(name: &str) -> String {
    name.replace('.', "_")
}
