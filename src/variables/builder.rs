//! Merging user configuration with component declarations.
//!
//! [`VariableCollectionBuilder`] produces the [`VariableCollection`] of one
//! component. It is given every component context of the project (the
//! declarations that might be visible) together with the project-wide user
//! variables, and builds the collection for one current context at a time.
//!
//! # Algorithm
//!
//! 1. Start from the project variables, overlay the current package's
//!    `packageVariables`, then the current component's overrides.
//! 2. Walk the declarations of every context (each component once). For each
//!    declaration visible from the current component:
//!    - a constant that is already set is an error, otherwise its value is set;
//!    - an unset variable with a default receives the default.
//! 3. Validate against the current component's own declarations. A configured
//!    name counts as unused only when no component of the project declares it.
//! 4. Write the built-ins.
//! 5. Expand one level of `${{ name }}` references inside string values.

use super::builtins::builtin_variables;
use super::collection::substitute_tokens;
use super::validation::{ValidationPolicy, ValidationReport};
use super::{VariableCollection, VariableDefinition, VariableMap, VariableScope};
use crate::core::CpmError;
use crate::project::ComponentContext;
use anyhow::Result;
use serde_json::Value;
use std::collections::BTreeSet;

/// Builds per-component variable collections for a project.
///
/// # Examples
///
/// ```rust,ignore
/// use cpm_cli::variables::VariableCollectionBuilder;
///
/// let contexts = project.component_contexts()?;
/// let builder = VariableCollectionBuilder::new(&contexts, &project.config.variables);
/// let vars = builder.build(&contexts[0])?;
/// println!("{}", vars.substitute("listening on ${{ port }}"));
/// ```
#[derive(Debug, Clone, Copy)]
pub struct VariableCollectionBuilder<'a> {
    contexts: &'a [ComponentContext<'a>],
    project_variables: &'a VariableMap,
    policy: ValidationPolicy,
}

impl<'a> VariableCollectionBuilder<'a> {
    /// Create a builder over the in-scope contexts and the project-wide user variables.
    #[must_use]
    pub fn new(contexts: &'a [ComponentContext<'a>], project_variables: &'a VariableMap) -> Self {
        Self {
            contexts,
            project_variables,
            policy: ValidationPolicy::default(),
        }
    }

    /// Use a different validation policy.
    #[must_use]
    pub const fn with_policy(mut self, policy: ValidationPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Build the collection of `current`.
    ///
    /// # Errors
    ///
    /// - [`CpmError::ConstantRedefined`] when a constant is written twice
    /// - [`CpmError::InvalidVariables`] when the current component's declarations
    ///   are not satisfied
    pub fn build(&self, current: &ComponentContext<'a>) -> Result<VariableCollection> {
        let component_id = current.component.id.as_str();

        let mut user_configured = self.project_variables.clone();
        if let Some(package_vars) = current.package_variables {
            user_configured.extend(package_vars.iter().map(|(k, v)| (k.clone(), v.clone())));
        }
        if let Some(component_vars) = current.component_variables {
            user_configured.extend(component_vars.iter().map(|(k, v)| (k.clone(), v.clone())));
        }

        let mut values = user_configured.clone();
        let mut visited = BTreeSet::new();

        let in_scope = self.contexts.iter().chain(std::iter::once(current));
        for ctx in in_scope {
            if !visited.insert(ctx.component.id.as_str()) {
                continue;
            }

            for def in &ctx.component.variables {
                if !is_visible(def.scope, ctx, current) {
                    continue;
                }

                if let Some(constant) = &def.value {
                    if values.contains_key(&def.name) {
                        return Err(CpmError::ConstantRedefined {
                            name: def.name.clone(),
                            component: ctx.component.id.clone(),
                        }
                        .into());
                    }
                    values.insert(def.name.clone(), constant.clone());
                } else if !values.contains_key(&def.name) {
                    if let Some(default) = &def.default {
                        tracing::trace!(
                            "{}: default for '{}' from '{}'",
                            component_id,
                            def.name,
                            ctx.component.id
                        );
                        values.insert(def.name.clone(), default.clone());
                    }
                }
            }
        }

        let consumed = self.declared_names(current);

        let own = own_definitions(&current.component.variables);
        ValidationReport::collect(&values, &own, &consumed, &user_configured)
            .into_result(component_id, self.policy)?;

        values.extend(builtin_variables(current.package, component_id));

        tracing::debug!("Built {} variables for component '{}'", values.len(), component_id);
        Ok(VariableCollection::new(resolve_references(&values)))
    }
}

impl VariableCollectionBuilder<'_> {
    /// Names declared by any context of the project, whatever their scope.
    fn declared_names(&self, current: &ComponentContext<'_>) -> BTreeSet<String> {
        self.contexts
            .iter()
            .chain(std::iter::once(current))
            .flat_map(|ctx| ctx.component.variables.iter().map(|def| def.name.clone()))
            .collect()
    }
}

/// Whether a declaration made in `declaring` is visible from `current`.
fn is_visible(scope: VariableScope, declaring: &ComponentContext<'_>, current: &ComponentContext<'_>) -> bool {
    match scope {
        VariableScope::Component => declaring.component.id == current.component.id,
        VariableScope::Package => declaring.package.name == current.package.name,
        VariableScope::Project => true,
    }
}

/// Declarations of a component, first occurrence of each name.
fn own_definitions(definitions: &[VariableDefinition]) -> Vec<&VariableDefinition> {
    let mut seen = BTreeSet::new();
    definitions.iter().filter(|def| seen.insert(def.name.as_str())).collect()
}

/// Expand references inside string values against the unexpanded map.
///
/// A referenced value is inserted as-is, so references it contains stay literal.
fn resolve_references(values: &VariableMap) -> VariableMap {
    values
        .iter()
        .map(|(name, value)| {
            let resolved = match value {
                Value::String(s) if s.contains("${{") => Value::String(substitute_tokens(s, values)),
                other => other.clone(),
            };
            (name.clone(), resolved)
        })
        .collect()
}
