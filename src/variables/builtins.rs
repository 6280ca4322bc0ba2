//! Computed variables injected after merging.
//!
//! Built-ins are written last and therefore always win over user configuration
//! and declared defaults.

use super::VariableMap;
use crate::git::repository_owner_and_name;
use crate::project::Package;
use serde_json::Value;

/// Version of the package the component belongs to.
pub const PACKAGE_VERSION: &str = "builtin.package.version";
/// Alias of [`PACKAGE_VERSION`], usable as a git ref.
pub const PACKAGE_REF: &str = "builtin.package.ref";
/// Owner segment of the package repository URL.
pub const PACKAGE_GITHUB_ORG: &str = "builtin.package.github.org";
/// Repository name segment of the package repository URL.
pub const PACKAGE_GITHUB_REPO: &str = "builtin.package.github.repo";
/// Id of the component being configured.
pub const COMPONENT_ID: &str = "builtin.component.id";

/// Built-in variables for `component_id` of `package`.
#[must_use]
pub fn builtin_variables(package: &Package, component_id: &str) -> VariableMap {
    let (org, repo) = repository_owner_and_name(&package.repository);

    let mut vars = VariableMap::new();
    vars.insert(PACKAGE_VERSION.to_string(), Value::String(package.version.clone()));
    vars.insert(PACKAGE_REF.to_string(), Value::String(package.version.clone()));
    vars.insert(PACKAGE_GITHUB_ORG.to_string(), Value::String(org));
    vars.insert(PACKAGE_GITHUB_REPO.to_string(), Value::String(repo));
    vars.insert(COMPONENT_ID.to_string(), Value::String(component_id.to_string()));
    vars
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::PackageManifest;
    use std::path::PathBuf;

    #[test]
    fn test_builtins_from_https_url() {
        let package = Package {
            name: "web-kit".to_string(),
            repository: "https://github.com/acme/web-kit.git".to_string(),
            version: "v1.4.0".to_string(),
            path: PathBuf::from("/tmp/web-kit"),
            manifest: PackageManifest::default(),
        };

        let vars = builtin_variables(&package, "server");
        assert_eq!(vars[PACKAGE_VERSION], "v1.4.0");
        assert_eq!(vars[PACKAGE_REF], "v1.4.0");
        assert_eq!(vars[PACKAGE_GITHUB_ORG], "acme");
        assert_eq!(vars[PACKAGE_GITHUB_REPO], "web-kit");
        assert_eq!(vars[COMPONENT_ID], "server");
    }
}
