//! Project configuration (`cpm.json`).
//!
//! The project configuration lists the packages a project depends on and the
//! values it assigns to component variables, at three levels:
//!
//! ```json
//! {
//!   "packages": [
//!     { "repository": "https://github.com/acme/db-kit.git", "version": "^1.2" },
//!     { "name": "web", "repository": "https://github.com/acme/web-kit.git", "version": "main" }
//!   ],
//!   "variables": { "project.name": "shop" },
//!   "packageVariables": { "web": { "web.port": 8080 } },
//!   "components": {
//!     "postgres": { "variables": { "db.password": "secret" } },
//!     "server": {}
//!   },
//!   "runtime": "postgres"
//! }
//! ```
//!
//! A component is used by the project when it has an entry under `components`,
//! even an empty one. `runtime` selects the runtime component whose start/stop
//! sequences `cpm start` and `cpm stop` run; it may be omitted when exactly
//! one used component is a runtime.

use crate::constants::PROJECT_CONFIG_FILE;
use crate::core::CpmError;
use crate::git::repository_owner_and_name;
use crate::variables::VariableMap;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Contents of `cpm.json`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectConfig {
    /// Package dependencies
    #[serde(default)]
    pub packages: Vec<PackageRef>,

    /// Project-wide variable values
    #[serde(default)]
    pub variables: VariableMap,

    /// Variable values for every component of a package, keyed by package name
    #[serde(default)]
    pub package_variables: BTreeMap<String, VariableMap>,

    /// Used components and their variable values, keyed by component id
    #[serde(default)]
    pub components: BTreeMap<String, ComponentConfig>,

    /// Runtime component driving `cpm start` / `cpm stop`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub runtime: Option<String>,
}

/// A package dependency.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageRef {
    /// Name used in `packageVariables` and as install directory; defaults to
    /// the repository name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Git URL or local path
    pub repository: String,
    /// Version specifier: exact version, semver range, `latest`, or a tag/branch
    pub version: String,
}

impl PackageRef {
    /// Effective package name.
    #[must_use]
    pub fn name(&self) -> String {
        self.name.clone().unwrap_or_else(|| repository_owner_and_name(&self.repository).1)
    }
}

/// Per-component configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ComponentConfig {
    /// Variable values for this component only
    #[serde(default)]
    pub variables: VariableMap,
}

impl ProjectConfig {
    /// Parse a configuration document.
    pub fn from_json(content: &str, file: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(content).map_err(|e| CpmError::ManifestParseError {
            file: file.to_string(),
            reason: e.to_string(),
        })?;
        config.validate(file)?;
        Ok(config)
    }

    /// Read the configuration at `path`.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read project configuration: {}", path.display()))?;
        Self::from_json(&content, &path.display().to_string())
    }

    /// Write the configuration to `path` as pretty-printed JSON.
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self).context("Failed to serialize project configuration")?;
        std::fs::write(path, content + "\n")
            .with_context(|| format!("Failed to write project configuration: {}", path.display()))
    }

    /// Reject configurations where two packages resolve to the same name.
    pub fn validate(&self, file: &str) -> Result<()> {
        let mut names = BTreeMap::new();
        for package in &self.packages {
            let name = package.name();
            if let Some(previous) = names.insert(name.clone(), package.repository.clone()) {
                return Err(CpmError::ManifestParseError {
                    file: file.to_string(),
                    reason: format!(
                        "package name '{name}' is used by both '{previous}' and '{}'",
                        package.repository
                    ),
                }
                .into());
            }
        }
        Ok(())
    }

    /// Whether a component is used by the project.
    #[must_use]
    pub fn uses_component(&self, id: &str) -> bool {
        self.components.contains_key(id)
    }
}

/// Locate `cpm.json` in `start` or its ancestors and return the project root.
pub fn find_project_root(start: &Path) -> Result<PathBuf> {
    let mut dir = Some(start);
    while let Some(current) = dir {
        if current.join(PROJECT_CONFIG_FILE).is_file() {
            return Ok(current.to_path_buf());
        }
        dir = current.parent();
    }

    Err(CpmError::ConfigNotFound {
        file: PROJECT_CONFIG_FILE.to_string(),
        searched: start.display().to_string(),
    }
    .into())
}
