//! A project: its configuration, lockfile, and installed packages.
//!
//! [`Project::load`] reads `cpm.json`, the optional `cpm.lock`, and the
//! manifest of every configured package from `.cpm/packages/<name>`. From
//! there it hands out [`ComponentContext`]s, builds variable collections, and
//! plans the runtime sequences used by `cpm start` / `cpm stop`.

use crate::config::{ProjectConfig, find_project_root};
use crate::constants::{LOCKFILE_NAME, PACKAGE_MANIFEST_FILE, PACKAGES_DIR, PROJECT_CONFIG_FILE};
use crate::core::CpmError;
use crate::lockfile::Lockfile;
use crate::manifest::{Component, ComponentKind, PackageManifest};
use crate::runtime::{LaunchContext, SequencePlan};
use crate::variables::{ValidationPolicy, VariableCollection, VariableCollectionBuilder, VariableMap};
use anyhow::Result;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// An installed package.
#[derive(Debug, Clone, PartialEq)]
pub struct Package {
    /// Name from the configuration
    pub name: String,
    /// Repository URL or path
    pub repository: String,
    /// Resolved version, or the configured specifier when not locked
    pub version: String,
    /// Installed directory
    pub path: PathBuf,
    /// Parsed `cpm-package.json`
    pub manifest: PackageManifest,
}

impl Package {
    /// Read the package installed at `path`.
    ///
    /// # Errors
    ///
    /// [`CpmError::PackageNotInstalled`] when the directory has no manifest,
    /// or any manifest parse error.
    pub fn load(name: &str, repository: &str, version: &str, path: &Path) -> Result<Self> {
        let manifest_path = path.join(PACKAGE_MANIFEST_FILE);
        if !manifest_path.is_file() {
            return Err(CpmError::PackageNotInstalled {
                name: name.to_string(),
            }
            .into());
        }

        Ok(Self {
            name: name.to_string(),
            repository: repository.to_string(),
            version: version.to_string(),
            path: path.to_path_buf(),
            manifest: PackageManifest::load(&manifest_path)?,
        })
    }
}

/// A component with its package and the configuration that applies to it.
#[derive(Debug, Clone, Copy)]
pub struct ComponentContext<'a> {
    pub package: &'a Package,
    pub component: &'a Component,
    /// `packageVariables` entry of the package
    pub package_variables: Option<&'a VariableMap>,
    /// `components.<id>.variables` entry of the component
    pub component_variables: Option<&'a VariableMap>,
    /// Listed under `components` in `cpm.json`
    pub used: bool,
}

/// A loaded project.
#[derive(Debug, Clone)]
pub struct Project {
    /// Directory holding `cpm.json`
    pub root: PathBuf,
    pub config: ProjectConfig,
    pub lockfile: Option<Lockfile>,
    /// Installed packages in configuration order
    pub packages: Vec<Package>,
}

impl Project {
    /// Load the project whose `cpm.json` is in `start` or one of its ancestors.
    pub fn discover(start: &Path) -> Result<Self> {
        let root = find_project_root(start)?;
        Self::load(&root)
    }

    /// Load the project rooted at `root`.
    ///
    /// # Errors
    ///
    /// - [`CpmError::ConfigNotFound`] without a `cpm.json`
    /// - [`CpmError::PackageNotInstalled`] for a configured package missing from
    ///   `.cpm/packages`
    /// - [`CpmError::DuplicateComponent`] when two packages declare the same id
    pub fn load(root: &Path) -> Result<Self> {
        let config_path = root.join(PROJECT_CONFIG_FILE);
        if !config_path.is_file() {
            return Err(CpmError::ConfigNotFound {
                file: PROJECT_CONFIG_FILE.to_string(),
                searched: root.display().to_string(),
            }
            .into());
        }
        let config = ProjectConfig::load(&config_path)?;
        let lockfile = Lockfile::load(&root.join(LOCKFILE_NAME))?;

        let mut packages = Vec::with_capacity(config.packages.len());
        for reference in &config.packages {
            let name = reference.name();
            let version = lockfile
                .as_ref()
                .and_then(|lock| lock.package(&name))
                .map_or_else(|| reference.version.clone(), |locked| locked.version.clone());
            let path = root.join(PACKAGES_DIR).join(&name);
            packages.push(Package::load(&name, &reference.repository, &version, &path)?);
        }

        let project = Self {
            root: root.to_path_buf(),
            config,
            lockfile,
            packages,
        };
        project.check_unique_components()?;

        tracing::debug!(
            "Loaded project at {} with {} package(s)",
            project.root.display(),
            project.packages.len()
        );
        Ok(project)
    }

    fn check_unique_components(&self) -> Result<()> {
        let mut owners: BTreeMap<&str, &str> = BTreeMap::new();
        for package in &self.packages {
            for component in &package.manifest.components {
                if let Some(first) = owners.insert(&component.id, &package.name) {
                    return Err(CpmError::DuplicateComponent {
                        id: component.id.clone(),
                        first: first.to_string(),
                        second: package.name.clone(),
                    }
                    .into());
                }
            }
        }
        Ok(())
    }

    /// Context of every component of every installed package.
    #[must_use]
    pub fn all_contexts(&self) -> Vec<ComponentContext<'_>> {
        self.packages
            .iter()
            .flat_map(|package| package.manifest.components.iter().map(move |c| self.make_context(package, c)))
            .collect()
    }

    /// Contexts of the components the project uses.
    #[must_use]
    pub fn component_contexts(&self) -> Vec<ComponentContext<'_>> {
        self.all_contexts().into_iter().filter(|ctx| ctx.used).collect()
    }

    /// Context of the component `id`.
    ///
    /// # Errors
    ///
    /// [`CpmError::ComponentNotFound`] when no installed package declares it.
    pub fn context(&self, id: &str) -> Result<ComponentContext<'_>> {
        self.packages
            .iter()
            .find_map(|package| package.manifest.component(id).map(|c| self.make_context(package, c)))
            .ok_or_else(|| {
                CpmError::ComponentNotFound {
                    id: id.to_string(),
                }
                .into()
            })
    }

    fn make_context<'a>(&'a self, package: &'a Package, component: &'a Component) -> ComponentContext<'a> {
        ComponentContext {
            package,
            component,
            package_variables: self.config.package_variables.get(&package.name),
            component_variables: self.config.components.get(&component.id).map(|c| &c.variables),
            used: self.config.uses_component(&component.id),
        }
    }

    /// Component ids listed under `components` that no installed package declares.
    #[must_use]
    pub fn unknown_components(&self) -> Vec<&str> {
        self.config
            .components
            .keys()
            .filter(|id| self.packages.iter().all(|p| p.manifest.component(id).is_none()))
            .map(String::as_str)
            .collect()
    }

    /// Build the variables of component `id`, with declarations of every used
    /// component in scope.
    pub fn variables_for(&self, id: &str, policy: ValidationPolicy) -> Result<VariableCollection> {
        let contexts = self.component_contexts();
        let current = self.context(id)?;
        VariableCollectionBuilder::new(&contexts, &self.config.variables).with_policy(policy).build(&current)
    }

    /// Id of the runtime component: the configured `runtime`, or the only used
    /// runtime component.
    ///
    /// # Errors
    ///
    /// [`CpmError::NoRuntime`] when none or several candidates exist, or the
    /// configured component is not a runtime.
    pub fn runtime_component(&self) -> Result<ComponentContext<'_>> {
        if let Some(id) = &self.config.runtime {
            let ctx = self.context(id)?;
            if !matches!(ctx.component.kind, ComponentKind::Runtime { .. }) {
                return Err(CpmError::NoRuntime {
                    reason: format!("component '{}' is a {} component", id, ctx.component.kind.tag()),
                }
                .into());
            }
            return Ok(ctx);
        }

        let runtimes: Vec<ComponentContext<'_>> = self
            .component_contexts()
            .into_iter()
            .filter(|ctx| matches!(ctx.component.kind, ComponentKind::Runtime { .. }))
            .collect();

        match runtimes.as_slice() {
            [single] => Ok(*single),
            [] => Err(CpmError::NoRuntime {
                reason: "the project uses no runtime component".to_string(),
            }
            .into()),
            many => Err(CpmError::NoRuntime {
                reason: format!(
                    "several runtime components are used ({}); set 'runtime' in {}",
                    many.iter().map(|ctx| ctx.component.id.as_str()).collect::<Vec<_>>().join(", "),
                    PROJECT_CONFIG_FILE
                ),
            }
            .into()),
        }
    }

    /// Start and stop sequences of the runtime component, with its variables.
    pub fn runtime_plan(&self, policy: ValidationPolicy) -> Result<SequencePlan> {
        let ctx = self.runtime_component()?;
        let ComponentKind::Runtime {
            start,
            stop,
        } = &ctx.component.kind
        else {
            return Err(CpmError::NoRuntime {
                reason: format!("component '{}' has no start sequence", ctx.component.id),
            }
            .into());
        };

        let variables = self.variables_for(&ctx.component.id, policy)?;
        tracing::debug!(
            "Runtime '{}' from package '{}': {} start, {} stop process(es)",
            ctx.component.id,
            ctx.package.name,
            start.len(),
            stop.len()
        );

        Ok(SequencePlan {
            start: start.clone(),
            stop: stop.clone(),
            context: LaunchContext {
                working_dir: ctx.package.path.clone(),
                variables,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{ManifestFixture, TestProject};
    use serde_json::json;

    fn shop() -> TestProject {
        let project = TestProject::new().unwrap();
        project.install_package("db-kit", &ManifestFixture::postgres()).unwrap();
        project.install_package("web-kit", &ManifestFixture::web()).unwrap();
        project
            .write_config(
                r#"{
  "packages": [
    { "name": "db-kit", "repository": "https://github.com/acme/db-kit.git", "version": "^1.0" },
    { "repository": "https://github.com/acme/web-kit.git", "version": "main" }
  ],
  "variables": { "db.port": 6543 },
  "components": {
    "postgres": { "variables": { "db.password": "secret" } },
    "server": {}
  }
}"#,
            )
            .unwrap();
        project
    }

    #[test]
    fn test_load_project() {
        let env = shop();
        let project = Project::load(env.path()).unwrap();
        assert_eq!(project.packages.len(), 2);
        assert_eq!(project.packages[1].name, "web-kit");
        assert_eq!(project.packages[0].version, "^1.0");
        assert!(project.lockfile.is_none());
        assert_eq!(project.component_contexts().len(), 2);
    }

    #[test]
    fn test_discover_from_subdirectory() {
        let env = shop();
        let nested = env.path().join("src/deep");
        std::fs::create_dir_all(&nested).unwrap();
        let project = Project::discover(&nested).unwrap();
        assert_eq!(project.root, env.path());
    }

    #[test]
    fn test_locked_version_is_used() {
        let env = shop();
        env.write_lockfile(
            r#"{ "version": 1, "packages": [
                { "name": "db-kit", "repository": "https://github.com/acme/db-kit.git", "specifier": "^1.0",
                  "version": "v1.3.0", "installedAt": "2024-05-01T10:00:00Z" }
            ] }"#,
        )
        .unwrap();

        let project = Project::load(env.path()).unwrap();
        assert_eq!(project.packages[0].version, "v1.3.0");

        let vars = project.variables_for("postgres", ValidationPolicy::default()).unwrap();
        assert_eq!(vars.get("builtin.package.version"), Some(&json!("v1.3.0")));
        assert_eq!(vars.get("builtin.package.github.org"), Some(&json!("acme")));
    }

    #[test]
    fn test_missing_package() {
        let env = TestProject::new().unwrap();
        env.write_config(r#"{ "packages": [{ "repository": "https://github.com/acme/db-kit.git", "version": "1.0.0" }] }"#)
            .unwrap();
        let err = Project::load(env.path()).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<CpmError>(),
            Some(CpmError::PackageNotInstalled { name }) if name == "db-kit"
        ));
    }

    #[test]
    fn test_duplicate_component_across_packages() {
        let env = TestProject::new().unwrap();
        env.install_package("a", &ManifestFixture::web()).unwrap();
        env.install_package("b", &ManifestFixture::web()).unwrap();
        env.write_config(
            r#"{ "packages": [
                { "name": "a", "repository": "https://github.com/acme/a.git", "version": "1.0.0" },
                { "name": "b", "repository": "https://github.com/acme/b.git", "version": "1.0.0" }
            ] }"#,
        )
        .unwrap();
        let err = Project::load(env.path()).unwrap_err();
        assert!(err.to_string().contains("Component id 'server' is declared by both 'a' and 'b'"));
    }

    #[test]
    fn test_project_scope_is_shared_across_packages() {
        let env = shop();
        let project = Project::load(env.path()).unwrap();

        let server = project.variables_for("server", ValidationPolicy::default()).unwrap();
        assert_eq!(server.get("db.port"), Some(&json!(6543)));
        assert_eq!(server.get("web.port"), Some(&json!(8080)));
        // component-scoped declarations of postgres stay private
        assert!(server.get("db.url").is_none());

        let postgres = project.variables_for("postgres", ValidationPolicy::default()).unwrap();
        assert_eq!(postgres.get("db.url"), Some(&json!("postgres://localhost:6543/app")));
        assert!(postgres.get("web.port").is_none());
    }

    #[test]
    fn test_strict_accepts_values_consumed_by_other_components() {
        let env = shop();
        let mut config = ProjectConfig::load(&env.path().join(PROJECT_CONFIG_FILE)).unwrap();
        config.variables.insert("web.port".to_string(), json!(9090));
        config.save(&env.path().join(PROJECT_CONFIG_FILE)).unwrap();

        let project = Project::load(env.path()).unwrap();
        for id in ["postgres", "server"] {
            project.variables_for(id, ValidationPolicy::strict()).unwrap();
        }

        config.variables.insert("web.prot".to_string(), json!(9090));
        config.save(&env.path().join(PROJECT_CONFIG_FILE)).unwrap();
        let project = Project::load(env.path()).unwrap();
        let err = project.variables_for("postgres", ValidationPolicy::strict()).unwrap_err();
        assert!(err.to_string().contains("- web.prot"));
        assert!(!err.to_string().contains("- web.port"));
    }

    #[test]
    fn test_unknown_component() {
        let env = shop();
        let project = Project::load(env.path()).unwrap();
        let err = project.variables_for("nope", ValidationPolicy::default()).unwrap_err();
        assert!(matches!(err.downcast_ref::<CpmError>(), Some(CpmError::ComponentNotFound { .. })));
    }

    #[test]
    fn test_unknown_components_in_config() {
        let env = shop();
        let mut config = ProjectConfig::load(&env.path().join(PROJECT_CONFIG_FILE)).unwrap();
        config.components.insert("ghost".to_string(), Default::default());
        config.save(&env.path().join(PROJECT_CONFIG_FILE)).unwrap();

        let project = Project::load(env.path()).unwrap();
        assert_eq!(project.unknown_components(), vec!["ghost"]);
    }

    #[test]
    fn test_runtime_plan() {
        let env = shop();
        let project = Project::load(env.path()).unwrap();
        let plan = project.runtime_plan(ValidationPolicy::default()).unwrap();
        assert_eq!(plan.start.len(), 2);
        assert_eq!(plan.stop.len(), 1);
        assert_eq!(plan.context.working_dir, env.package_dir("db-kit"));
        assert_eq!(plan.context.variables.get("db.password"), Some(&json!("secret")));
    }

    #[test]
    fn test_configured_runtime_must_be_runtime() {
        let env = shop();
        let mut config = ProjectConfig::load(&env.path().join(PROJECT_CONFIG_FILE)).unwrap();
        config.runtime = Some("server".to_string());
        config.save(&env.path().join(PROJECT_CONFIG_FILE)).unwrap();

        let project = Project::load(env.path()).unwrap();
        let err = project.runtime_plan(ValidationPolicy::default()).unwrap_err();
        assert!(err.to_string().contains("component 'server' is a setup component"));
    }

    #[test]
    fn test_no_runtime_used() {
        let env = shop();
        let mut config = ProjectConfig::load(&env.path().join(PROJECT_CONFIG_FILE)).unwrap();
        config.components.remove("postgres");
        config.save(&env.path().join(PROJECT_CONFIG_FILE)).unwrap();

        let project = Project::load(env.path()).unwrap();
        let err = project.runtime_plan(ValidationPolicy::default()).unwrap_err();
        assert!(matches!(err.downcast_ref::<CpmError>(), Some(CpmError::NoRuntime { .. })));
    }
}
