//! Scratch project directories.

use crate::constants::{LOCKFILE_NAME, PACKAGE_MANIFEST_FILE, PACKAGES_DIR, PROJECT_CONFIG_FILE};
use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// A temporary project root that is removed on drop.
pub struct TestProject {
    pub temp_dir: TempDir,
    pub project_dir: PathBuf,
}

impl TestProject {
    /// Create an empty project directory.
    pub fn new() -> Result<Self> {
        super::init_test_logging(None);

        let temp_dir = TempDir::new()?;
        let project_dir = temp_dir.path().join("project");
        fs::create_dir_all(&project_dir)?;

        Ok(Self {
            temp_dir,
            project_dir,
        })
    }

    /// Project root.
    pub fn path(&self) -> &Path {
        &self.project_dir
    }

    /// Write `cpm.json`.
    pub fn write_config(&self, content: &str) -> Result<()> {
        self.write_file(PROJECT_CONFIG_FILE, content)
    }

    /// Write `cpm.lock`.
    pub fn write_lockfile(&self, content: &str) -> Result<()> {
        self.write_file(LOCKFILE_NAME, content)
    }

    /// Directory a package named `name` is installed into.
    pub fn package_dir(&self, name: &str) -> PathBuf {
        self.project_dir.join(PACKAGES_DIR).join(name)
    }

    /// Lay out an installed package with the given manifest.
    pub fn install_package(&self, name: &str, manifest: &str) -> Result<PathBuf> {
        let dir = self.package_dir(name);
        fs::create_dir_all(&dir).with_context(|| format!("Failed to create {}", dir.display()))?;
        fs::write(dir.join(PACKAGE_MANIFEST_FILE), manifest)?;
        Ok(dir)
    }

    /// Write a file inside an installed package.
    pub fn write_package_file(&self, package: &str, relative: &str, content: &str) -> Result<PathBuf> {
        let path = self.package_dir(package).join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, content)?;
        Ok(path)
    }

    /// Write an executable shell script inside an installed package.
    #[cfg(unix)]
    pub fn write_package_script(&self, package: &str, relative: &str, body: &str) -> Result<PathBuf> {
        use std::os::unix::fs::PermissionsExt;

        let path = self.write_package_file(package, relative, &format!("#!/bin/sh\n{body}\n"))?;
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755))?;
        Ok(path)
    }

    /// Write a file relative to the project root.
    pub fn write_file(&self, relative: &str, content: &str) -> Result<()> {
        let path = self.project_dir.join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, content).with_context(|| format!("Failed to write {}", path.display()))
    }

    /// Read a file relative to the project root.
    pub fn read_file(&self, relative: &str) -> Result<String> {
        let path = self.project_dir.join(relative);
        fs::read_to_string(&path).with_context(|| format!("Failed to read {}", path.display()))
    }

    /// Whether a file exists relative to the project root.
    pub fn file_exists(&self, relative: &str) -> bool {
        self.project_dir.join(relative).exists()
    }
}
