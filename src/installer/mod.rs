//! Installing the packages of a project.
//!
//! # Installation Process
//!
//! 1. **Resolve**: for every package in `cpm.json`, list the repository's tags
//!    and branches and pick the one matching the version specifier. A package
//!    whose lockfile entry still matches its configuration and whose checkout
//!    is present is reused as-is.
//! 2. **Fetch**: check the chosen ref out into `.cpm/packages/<name>`.
//! 3. **Lock**: record name, repository, specifier, resolved version, and
//!    commit in `cpm.lock`; entries of removed packages are dropped.
//! 4. **Configure**: build the variables of every used component and render
//!    their files in memory. Nothing is written until every component
//!    validates and every file target is accepted.
//! 5. **Render** each used component's `files[]` into the project.
//! 6. **Hooks**: run `onPostInit` of used components from freshly fetched
//!    packages.

use crate::config::{PackageRef, ProjectConfig};
use crate::constants::{LOCKFILE_NAME, PACKAGE_MANIFEST_FILE, PACKAGES_DIR, PROJECT_CONFIG_FILE};
use crate::core::CpmError;
use crate::git::RepositoryFetcher;
use crate::hooks::run_post_init;
use crate::lockfile::{LockedPackage, Lockfile};
use crate::project::Project;
use crate::templating::{prepare_component_files, write_rendered_files};
use crate::variables::ValidationPolicy;
use crate::version::VersionResolver;
use anyhow::{Context, Result};
use chrono::Utc;
use std::path::{Path, PathBuf};

/// Knobs of an install run.
#[derive(Debug, Clone, Copy)]
pub struct InstallOptions {
    /// Fetch every package even when the lockfile entry is current
    pub force: bool,
    /// Run `onPostInit` hooks of freshly fetched packages
    pub run_hooks: bool,
    /// Variable validation policy
    pub policy: ValidationPolicy,
}

impl Default for InstallOptions {
    fn default() -> Self {
        Self {
            force: false,
            run_hooks: true,
            policy: ValidationPolicy::default(),
        }
    }
}

/// What an install run did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InstallSummary {
    /// Packages checked out in this run
    pub fetched: Vec<String>,
    /// Packages kept from a previous install
    pub reused: Vec<String>,
    /// Files written into the project
    pub files_rendered: usize,
    /// Post-init hooks run
    pub hooks_run: usize,
}

/// Installs the packages of the project at `root`.
#[derive(Debug)]
pub struct Installer<F> {
    root: PathBuf,
    fetcher: F,
    options: InstallOptions,
}

impl<F: RepositoryFetcher> Installer<F> {
    /// Installer for the project at `root`, fetching through `fetcher`.
    pub fn new(root: impl Into<PathBuf>, fetcher: F) -> Self {
        Self {
            root: root.into(),
            fetcher,
            options: InstallOptions::default(),
        }
    }

    /// Replace the options.
    #[must_use]
    pub const fn with_options(mut self, options: InstallOptions) -> Self {
        self.options = options;
        self
    }

    /// Run the installation.
    ///
    /// # Errors
    ///
    /// - [`CpmError::VersionNotFound`] when no ref matches a specifier
    /// - git errors from the fetcher
    /// - variable configuration errors of used components
    /// - [`CpmError::HookFailed`] when a post-init hook fails
    pub async fn install(&self) -> Result<InstallSummary> {
        let config = ProjectConfig::load(&self.root.join(PROJECT_CONFIG_FILE))?;
        let lockfile_path = self.root.join(LOCKFILE_NAME);
        let mut lockfile = Lockfile::load(&lockfile_path)?.unwrap_or_default();
        let mut summary = InstallSummary::default();

        for reference in &config.packages {
            let name = reference.name();
            let dir = self.root.join(PACKAGES_DIR).join(&name);

            if !self.options.force && is_current(lockfile.package(&name), reference, &dir) {
                tracing::debug!("Package '{}' is up to date", name);
                summary.reused.push(name);
                continue;
            }

            let locked = self.fetch_package(reference, &name, &dir).await?;
            lockfile.upsert(locked);
            summary.fetched.push(name);
        }

        let names: Vec<String> = config.packages.iter().map(PackageRef::name).collect();
        lockfile.retain_names(&names);
        lockfile.save(&lockfile_path)?;

        let project = Project::load(&self.root)?;
        for id in project.unknown_components() {
            tracing::warn!("Component '{}' in {} is not provided by any package", id, PROJECT_CONFIG_FILE);
        }

        let contexts = project.component_contexts();
        let mut prepared = Vec::with_capacity(contexts.len());
        for ctx in &contexts {
            let variables = project.variables_for(&ctx.component.id, self.options.policy)?;
            prepared.push((ctx, variables));
        }

        let mut rendered = Vec::with_capacity(prepared.len());
        for (ctx, variables) in &prepared {
            rendered.push(prepare_component_files(ctx.package, ctx.component, &project.root, variables)?);
        }

        for ((ctx, variables), files) in prepared.iter().zip(&rendered) {
            summary.files_rendered += write_rendered_files(files)?.len();

            if self.options.run_hooks && summary.fetched.contains(&ctx.package.name) {
                summary.hooks_run += run_post_init(ctx.package, ctx.component, variables).await?;
            }
        }

        tracing::info!(
            "Installed {} package(s), {} up to date",
            summary.fetched.len(),
            summary.reused.len()
        );
        Ok(summary)
    }

    async fn fetch_package(&self, reference: &PackageRef, name: &str, dir: &Path) -> Result<LockedPackage> {
        let refs = self
            .fetcher
            .list_refs(&reference.repository)
            .await
            .with_context(|| format!("Failed to resolve package '{name}'"))?;

        let version = VersionResolver::new(refs).resolve(&reference.version).ok_or_else(|| {
            CpmError::VersionNotFound {
                repository: reference.repository.clone(),
                specifier: reference.version.clone(),
            }
        })?;

        tracing::info!("Fetching '{}' {} from {}", name, version, reference.repository);
        let commit = self.fetcher.checkout(&reference.repository, &version, dir).await?;

        if !dir.join(PACKAGE_MANIFEST_FILE).is_file() {
            return Err(CpmError::ManifestParseError {
                file: dir.join(PACKAGE_MANIFEST_FILE).display().to_string(),
                reason: format!("{} {} has no {}", reference.repository, version, PACKAGE_MANIFEST_FILE),
            }
            .into());
        }

        Ok(LockedPackage {
            name: name.to_string(),
            repository: reference.repository.clone(),
            specifier: reference.version.clone(),
            version,
            commit,
            installed_at: Utc::now(),
        })
    }
}

/// Whether a locked package still matches its configuration and is checked out.
fn is_current(locked: Option<&LockedPackage>, reference: &PackageRef, dir: &Path) -> bool {
    locked.is_some_and(|locked| {
        locked.repository == reference.repository
            && locked.specifier == reference.version
            && dir.join(PACKAGE_MANIFEST_FILE).is_file()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{ManifestFixture, TestProject};
    use std::collections::HashMap;
    use std::sync::Mutex;

    struct FakeRepository {
        refs: Vec<String>,
        files: Vec<(String, String)>,
    }

    #[derive(Default)]
    struct FakeFetcher {
        repositories: HashMap<String, FakeRepository>,
        checkouts: Mutex<Vec<String>>,
    }

    impl FakeFetcher {
        fn with_repository(mut self, url: &str, refs: &[&str], files: &[(&str, &str)]) -> Self {
            self.repositories.insert(
                url.to_string(),
                FakeRepository {
                    refs: refs.iter().map(|s| (*s).to_string()).collect(),
                    files: files.iter().map(|(p, c)| ((*p).to_string(), (*c).to_string())).collect(),
                },
            );
            self
        }

        fn checkouts(&self) -> Vec<String> {
            self.checkouts.lock().unwrap().clone()
        }
    }

    impl RepositoryFetcher for FakeFetcher {
        async fn list_refs(&self, repository: &str) -> Result<Vec<String>> {
            self.repositories
                .get(repository)
                .map(|r| r.refs.clone())
                .ok_or_else(|| anyhow::anyhow!("unknown repository {repository}"))
        }

        async fn checkout(&self, repository: &str, reference: &str, target: &Path) -> Result<Option<String>> {
            let repo = self.repositories.get(repository).ok_or_else(|| anyhow::anyhow!("unknown repository"))?;
            if target.exists() {
                std::fs::remove_dir_all(target)?;
            }
            for (path, content) in &repo.files {
                let file = target.join(path);
                std::fs::create_dir_all(file.parent().unwrap())?;
                std::fs::write(file, content)?;
            }
            self.checkouts.lock().unwrap().push(format!("{repository}@{reference}"));
            Ok(Some(format!("commit-{reference}")))
        }
    }

    const DB_KIT: &str = "https://github.com/acme/db-kit.git";

    fn db_fetcher() -> FakeFetcher {
        let manifest = ManifestFixture::postgres();
        FakeFetcher::default().with_repository(
            DB_KIT,
            &["v1.0.0", "v1.2.0", "v2.0.0", "main"],
            &[
                ("cpm-package.json", manifest.as_str()),
                ("templates/db.env", "PORT=${{ db.port }}\nVERSION=${{ builtin.package.version }}\n"),
            ],
        )
    }

    fn project_with(version: &str, password: Option<&str>) -> TestProject {
        let env = TestProject::new().unwrap();
        let components = match password {
            Some(pw) => format!(r#"{{ "postgres": {{ "variables": {{ "db.password": "{pw}" }} }} }}"#),
            None => r#"{ "postgres": {} }"#.to_string(),
        };
        env.write_config(&format!(
            r#"{{ "packages": [{{ "repository": "{DB_KIT}", "version": "{version}" }}], "components": {components} }}"#
        ))
        .unwrap();
        env
    }

    #[tokio::test]
    async fn test_install_resolves_locks_and_renders() {
        let env = project_with("^1.0", Some("secret"));
        let fetcher = db_fetcher();
        let installer = Installer::new(env.path(), fetcher);

        let summary = installer.install().await.unwrap();
        assert_eq!(summary.fetched, vec!["db-kit"]);
        assert_eq!(summary.files_rendered, 1);
        assert_eq!(installer.fetcher.checkouts(), vec![format!("{DB_KIT}@v1.2.0")]);

        let lockfile = Lockfile::load(&env.path().join(LOCKFILE_NAME)).unwrap().unwrap();
        let locked = lockfile.package("db-kit").unwrap();
        assert_eq!(locked.version, "v1.2.0");
        assert_eq!(locked.specifier, "^1.0");
        assert_eq!(locked.commit.as_deref(), Some("commit-v1.2.0"));

        assert_eq!(env.read_file("config/postgres.env").unwrap(), "PORT=5432\nVERSION=v1.2.0\n");
    }

    #[tokio::test]
    async fn test_second_install_reuses_locked_package() {
        let env = project_with("latest", Some("secret"));
        let installer = Installer::new(env.path(), db_fetcher());
        installer.install().await.unwrap();

        let summary = installer.install().await.unwrap();
        assert!(summary.fetched.is_empty());
        assert_eq!(summary.reused, vec!["db-kit"]);
        assert_eq!(installer.fetcher.checkouts().len(), 1);

        let forced = installer
            .with_options(InstallOptions {
                force: true,
                ..InstallOptions::default()
            })
            .install()
            .await
            .unwrap();
        assert_eq!(forced.fetched, vec!["db-kit"]);
    }

    #[tokio::test]
    async fn test_unmatched_specifier() {
        let env = project_with("^3.0", Some("secret"));
        let err = Installer::new(env.path(), db_fetcher()).install().await.unwrap_err();
        assert!(matches!(err.downcast_ref::<CpmError>(), Some(CpmError::VersionNotFound { .. })));
    }

    #[tokio::test]
    async fn test_invalid_variables_prevent_rendering() {
        let env = project_with("main", None);
        let err = Installer::new(env.path(), db_fetcher()).install().await.unwrap_err();
        assert!(err.to_string().contains("db.password"));
        assert!(!env.file_exists("config/postgres.env"));
        // packages stay installed and locked so the configuration can be fixed
        assert!(env.file_exists("cpm.lock"));
    }

    #[tokio::test]
    async fn test_escaping_target_in_later_component_writes_nothing() {
        const BAD_KIT: &str = "https://github.com/acme/bad-kit.git";
        let fetcher = db_fetcher().with_repository(
            BAD_KIT,
            &["v1.0.0"],
            &[
                (
                    "cpm-package.json",
                    r#"{ "components": [{ "id": "leaky", "type": "setup",
                        "files": [{ "source": "t.txt", "target": "../outside.txt" }] }] }"#,
                ),
                ("t.txt", "x"),
            ],
        );
        let env = TestProject::new().unwrap();
        env.write_config(&format!(
            r#"{{ "packages": [
                {{ "repository": "{DB_KIT}", "version": "v1.0.0" }},
                {{ "repository": "{BAD_KIT}", "version": "v1.0.0" }}
            ],
            "components": {{ "postgres": {{ "variables": {{ "db.password": "secret" }} }}, "leaky": {{}} }} }}"#
        ))
        .unwrap();

        let err = Installer::new(env.path(), fetcher).install().await.unwrap_err();
        assert!(matches!(err.downcast_ref::<CpmError>(), Some(CpmError::InvalidFileTarget { .. })));
        assert!(!env.file_exists("config/postgres.env"));
        assert!(!env.temp_dir.path().join("outside.txt").exists());
    }

    #[tokio::test]
    async fn test_removed_package_leaves_lockfile() {
        let env = project_with("v1.0.0", Some("secret"));
        let installer = Installer::new(env.path(), db_fetcher());
        installer.install().await.unwrap();

        env.write_config(r#"{ "packages": [] }"#).unwrap();
        installer.install().await.unwrap();
        let lockfile = Lockfile::load(&env.path().join(LOCKFILE_NAME)).unwrap().unwrap();
        assert!(lockfile.packages.is_empty());
    }
}
