//! Component variables: declaration, merging, validation, and substitution.
//!
//! Packages declare typed variables on their components. A project configures
//! values for them at three levels (project, package, component) and CPM merges
//! those with the declared defaults into a flat, per-component map:
//!
//! ```text
//! project "variables"            (lowest)
//!   -> "packageVariables.<pkg>"
//!   -> "components.<id>.variables"
//!   -> declared defaults / constants of in-scope components
//!   -> built-ins (builtin.package.version, builtin.component.id, ...)   (highest)
//! ```
//!
//! The result is a [`VariableCollection`], which substitutes `${{ name }}`
//! tokens into text and exports the variables as process environment.
//!
//! # Modules
//!
//! - [`builder`] - merge algorithm and constant/scope rules
//! - [`validation`] - missing / wrongly-typed / unused detection
//! - [`collection`] - substitution and environment export
//! - [`builtins`] - computed, non-overridable variables

pub mod builder;
pub mod builtins;
pub mod collection;
pub mod validation;

pub use builder::VariableCollectionBuilder;
pub use collection::VariableCollection;
pub use validation::{ValidationPolicy, ValidationReport};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// Flat variable map: `.`-delimited names to JSON values.
pub type VariableMap = BTreeMap<String, Value>;

/// Declared type of a variable.
///
/// Only used for a shallow check of configured values; nested contents of
/// arrays and objects are not inspected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VariableType {
    /// Any JSON string
    String,
    /// Any JSON number
    Number,
    /// `true` or `false`
    Boolean,
    /// JSON array
    Array,
    /// JSON object
    Object,
    /// Alias of `array`
    List,
}

impl VariableType {
    /// Whether `value` has this type.
    #[must_use]
    pub fn matches(self, value: &Value) -> bool {
        match self {
            Self::Array | Self::List => value.is_array(),
            Self::Object => value.is_object(),
            Self::String => value.is_string(),
            Self::Number => value.is_number(),
            Self::Boolean => value.is_boolean(),
        }
    }

    /// Name as written in manifests.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Number => "number",
            Self::Boolean => "boolean",
            Self::Array => "array",
            Self::Object => "object",
            Self::List => "list",
        }
    }
}

impl fmt::Display for VariableType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Visibility of a declared variable.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VariableScope {
    /// Only the declaring component
    #[default]
    Component,
    /// Every component of the declaring package
    Package,
    /// Every component of the project
    Project,
}

/// A variable declared by a component in its package manifest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariableDefinition {
    /// Variable name, may contain dots
    pub name: String,

    /// Shown to users when the variable is missing
    #[serde(default)]
    pub description: String,

    /// Declared type
    #[serde(rename = "type")]
    pub var_type: VariableType,

    /// Visibility, `component` when omitted
    #[serde(default)]
    pub scope: VariableScope,

    /// Value used when nothing is configured
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,

    /// Fixed value; makes the variable a constant
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
}

impl VariableDefinition {
    /// Constants carry a fixed `value` and cannot be overridden.
    #[must_use]
    pub const fn is_constant(&self) -> bool {
        self.value.is_some()
    }

    /// A variable is required when it has neither a default nor a constant value.
    #[must_use]
    pub const fn is_required(&self) -> bool {
        self.default.is_none() && self.value.is_none()
    }
}

/// Type tag of a JSON value as reported in validation errors.
#[must_use]
pub const fn value_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// String form of a value for substitution and environment export.
///
/// Strings are used verbatim, arrays and objects are JSON-encoded, and `null`
/// becomes the empty string.
#[must_use]
pub fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::Array(_) | Value::Object(_) => value.to_string(),
    }
}
