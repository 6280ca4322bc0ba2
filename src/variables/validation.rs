//! Validation of a component's effective variables.
//!
//! Checks run against the declarations of the component being configured and
//! collect every problem before failing, so a single error lists all missing
//! and wrongly-typed variables.

use super::{VariableDefinition, VariableMap, value_type_name};
use crate::core::{CpmError, MissingVariable, WronglyTypedVariable};
use std::collections::BTreeSet;

/// Which findings fail the build.
///
/// Missing and wrongly-typed variables always fail. Configured variables that
/// no component of the project declares are only reported when `fail_on_unused`
/// is set; otherwise they are logged as warnings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ValidationPolicy {
    /// Treat unused configured variables as an error
    pub fail_on_unused: bool,
}

impl ValidationPolicy {
    /// Policy that also rejects unused configured variables.
    #[must_use]
    pub const fn strict() -> Self {
        Self {
            fail_on_unused: true,
        }
    }
}

/// Findings of a validation pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationReport {
    /// Required variables with no value
    pub missing: Vec<MissingVariable>,
    /// Variables whose value does not match the declared type
    pub wrongly_typed: Vec<WronglyTypedVariable>,
    /// User-configured names nothing consumes
    pub unused: Vec<String>,
}

impl ValidationReport {
    /// Validate `values` against the component's own `definitions`.
    ///
    /// `consumed` holds every name declared in the project; user-configured
    /// names outside it are reported as unused.
    #[must_use]
    pub fn collect(
        values: &VariableMap,
        definitions: &[&VariableDefinition],
        consumed: &BTreeSet<String>,
        user_configured: &VariableMap,
    ) -> Self {
        let mut report = Self::default();

        for def in definitions {
            match values.get(&def.name) {
                None => {
                    if def.default.is_none() {
                        report.missing.push(MissingVariable {
                            name: def.name.clone(),
                            var_type: def.var_type.to_string(),
                            description: def.description.clone(),
                        });
                    }
                }
                Some(value) => {
                    if !def.var_type.matches(value) {
                        report.wrongly_typed.push(WronglyTypedVariable {
                            name: def.name.clone(),
                            expected: def.var_type.to_string(),
                            actual: value_type_name(value).to_string(),
                        });
                    }
                }
            }
        }

        let mut scratch = user_configured.clone();
        for name in consumed {
            scratch.remove(name);
        }
        report.unused = scratch.into_keys().collect();

        report
    }

    /// Whether nothing at all was found.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.missing.is_empty() && self.wrongly_typed.is_empty() && self.unused.is_empty()
    }

    /// Turn the report into an error according to `policy`.
    pub fn into_result(self, component: &str, policy: ValidationPolicy) -> Result<(), CpmError> {
        let fails_on_unused = policy.fail_on_unused && !self.unused.is_empty();

        if !self.unused.is_empty() && !policy.fail_on_unused {
            tracing::warn!(
                "Component '{}': configured variables not used by any component: {}",
                component,
                self.unused.join(", ")
            );
        }

        if self.missing.is_empty() && self.wrongly_typed.is_empty() && !fails_on_unused {
            return Ok(());
        }

        Err(CpmError::InvalidVariables {
            component: component.to_string(),
            missing: self.missing,
            wrongly_typed: self.wrongly_typed,
            unused: if policy.fail_on_unused {
                self.unused
            } else {
                Vec::new()
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::variables::{VariableScope, VariableType};
    use serde_json::json;

    fn def(name: &str, var_type: VariableType, default: Option<serde_json::Value>) -> VariableDefinition {
        VariableDefinition {
            name: name.to_string(),
            description: format!("{name} description"),
            var_type,
            scope: VariableScope::Component,
            default,
            value: None,
        }
    }

    #[test]
    fn test_collects_all_problems() {
        let port = def("port", VariableType::Number, None);
        let host = def("host", VariableType::String, None);
        let replicas = def("replicas", VariableType::Number, None);
        let tags = def("tags", VariableType::Array, None);

        let mut values = VariableMap::new();
        values.insert("replicas".to_string(), json!("three"));
        values.insert("tags".to_string(), json!({"a": 1}));

        let report = ValidationReport::collect(
            &values,
            &[&port, &host, &replicas, &tags],
            &BTreeSet::new(),
            &VariableMap::new(),
        );

        assert_eq!(report.missing.len(), 2);
        assert_eq!(report.wrongly_typed.len(), 2);
        assert_eq!(report.wrongly_typed[0].expected, "number");
        assert_eq!(report.wrongly_typed[0].actual, "string");
        assert_eq!(report.wrongly_typed[1].actual, "object");

        let err = report.into_result("web", ValidationPolicy::default()).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("port (number): port description"));
        assert!(message.contains("host (string): host description"));
        assert!(message.contains("replicas: expected number, got string"));
        assert!(message.contains("tags: expected array, got object"));
    }

    #[test]
    fn test_unused_only_fails_when_enabled() {
        let port = def("port", VariableType::Number, Some(json!(80)));
        let consumed: BTreeSet<String> = ["port".to_string()].into_iter().collect();

        let mut user = VariableMap::new();
        user.insert("prot".to_string(), json!(8080));

        let mut values = user.clone();
        values.insert("port".to_string(), json!(80));

        let report = ValidationReport::collect(&values, &[&port], &consumed, &user);
        assert_eq!(report.unused, vec!["prot".to_string()]);
        assert!(!report.is_clean());

        assert!(report.clone().into_result("web", ValidationPolicy::default()).is_ok());

        let err = report.into_result("web", ValidationPolicy::strict()).unwrap_err();
        assert!(err.to_string().contains("Unused variables"));
        assert!(err.to_string().contains("- prot"));
    }

    #[test]
    fn test_list_accepts_arrays() {
        let hosts = def("hosts", VariableType::List, None);
        let mut values = VariableMap::new();
        values.insert("hosts".to_string(), json!(["a", "b"]));

        let report = ValidationReport::collect(&values, &[&hosts], &BTreeSet::new(), &VariableMap::new());
        assert!(report.is_clean());
    }
}
