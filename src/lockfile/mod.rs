//! Lockfile (`cpm.lock`) recording the exact version of every installed package.
//!
//! ```json
//! {
//!   "version": 1,
//!   "packages": [
//!     {
//!       "name": "db-kit",
//!       "repository": "https://github.com/acme/db-kit.git",
//!       "specifier": "^1.2",
//!       "version": "v1.2.3",
//!       "commit": "4f0c1e...",
//!       "installedAt": "2026-10-19T12:00:00Z"
//!     }
//!   ]
//! }
//! ```
//!
//! `version` is the tag or branch the specifier resolved to; it is what
//! `builtin.package.version` reports to components.

use crate::constants::LOCKFILE_VERSION;
use crate::core::CpmError;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Contents of `cpm.lock`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lockfile {
    /// Format version
    pub version: u32,
    /// Installed packages
    #[serde(default)]
    pub packages: Vec<LockedPackage>,
}

/// One installed package.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LockedPackage {
    /// Package name
    pub name: String,
    /// Repository URL as configured
    pub repository: String,
    /// Specifier from `cpm.json` at install time
    pub specifier: String,
    /// Resolved tag or branch
    pub version: String,
    /// Commit checked out
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub commit: Option<String>,
    /// When the package was installed
    pub installed_at: DateTime<Utc>,
}

impl Default for Lockfile {
    fn default() -> Self {
        Self::new()
    }
}

impl Lockfile {
    /// Empty lockfile of the current format version.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            version: LOCKFILE_VERSION,
            packages: Vec::new(),
        }
    }

    /// Read a lockfile; a missing file yields `None`.
    pub fn load(path: &Path) -> Result<Option<Self>> {
        if !path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read lockfile: {}", path.display()))?;
        let lockfile: Self = serde_json::from_str(&content).map_err(|e| CpmError::ManifestParseError {
            file: path.display().to_string(),
            reason: e.to_string(),
        })?;

        if lockfile.version > LOCKFILE_VERSION {
            return Err(CpmError::ManifestParseError {
                file: path.display().to_string(),
                reason: format!(
                    "lockfile version {} is newer than supported version {}",
                    lockfile.version, LOCKFILE_VERSION
                ),
            }
            .into());
        }

        Ok(Some(lockfile))
    }

    /// Write the lockfile as pretty-printed JSON.
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self).context("Failed to serialize lockfile")?;
        std::fs::write(path, content + "\n").with_context(|| format!("Failed to write lockfile: {}", path.display()))
    }

    /// Entry for a package name.
    #[must_use]
    pub fn package(&self, name: &str) -> Option<&LockedPackage> {
        self.packages.iter().find(|p| p.name == name)
    }

    /// Insert or replace the entry with the same name.
    pub fn upsert(&mut self, package: LockedPackage) {
        match self.packages.iter_mut().find(|p| p.name == package.name) {
            Some(existing) => *existing = package,
            None => self.packages.push(package),
        }
        self.packages.sort_by(|a, b| a.name.cmp(&b.name));
    }

    /// Drop entries whose name is not in `keep`.
    pub fn retain_names(&mut self, keep: &[String]) {
        self.packages.retain(|p| keep.contains(&p.name));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn locked(name: &str, version: &str) -> LockedPackage {
        LockedPackage {
            name: name.to_string(),
            repository: format!("https://github.com/acme/{name}.git"),
            specifier: "^1".to_string(),
            version: version.to_string(),
            commit: None,
            installed_at: Utc::now(),
        }
    }

    #[test]
    fn test_missing_lockfile_is_none() {
        let temp = TempDir::new().unwrap();
        assert!(Lockfile::load(&temp.path().join("cpm.lock")).unwrap().is_none());
    }

    #[test]
    fn test_upsert_replaces_and_sorts() {
        let mut lockfile = Lockfile::new();
        lockfile.upsert(locked("web", "v1.0.0"));
        lockfile.upsert(locked("db", "v1.0.0"));
        lockfile.upsert(locked("web", "v1.1.0"));

        assert_eq!(lockfile.packages.len(), 2);
        assert_eq!(lockfile.packages[0].name, "db");
        assert_eq!(lockfile.package("web").unwrap().version, "v1.1.0");

        lockfile.retain_names(&["web".to_string()]);
        assert!(lockfile.package("db").is_none());
    }

    #[test]
    fn test_rejects_newer_format() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("cpm.lock");
        std::fs::write(&path, r#"{ "version": 99, "packages": [] }"#).unwrap();

        let err = Lockfile::load(&path).unwrap_err();
        assert!(err.to_string().contains("newer than supported"));
    }
}
