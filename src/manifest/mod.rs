//! Package manifests (`cpm-package.json`).
//!
//! Every package repository carries a manifest at its root listing the
//! components it provides:
//!
//! ```json
//! {
//!   "components": [
//!     {
//!       "id": "postgres",
//!       "type": "runtime",
//!       "variables": [
//!         { "name": "db.port", "type": "number", "scope": "project", "default": 5432 }
//!       ],
//!       "programs": [{ "id": "migrate", "executable": "bin/migrate.sh" }],
//!       "onPostInit": [{ "ref": "migrate", "args": ["--init"] }],
//!       "files": [{ "source": "templates/db.env", "target": "config/db.env" }],
//!       "start": [
//!         { "id": "db", "executable": "bin/db.sh", "startupLine": "ready to accept" }
//!       ],
//!       "stop": [{ "id": "db-stop", "executable": "bin/db-stop.sh" }]
//!     }
//!   ]
//! }
//! ```
//!
//! The `type` field selects the [`ComponentKind`] variant; only runtime
//! components carry `start`/`stop` sequences.

use crate::core::CpmError;
use crate::runtime::ProcessSpec;
use crate::variables::VariableDefinition;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::Path;

/// Top-level manifest document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PackageManifest {
    /// Components provided by the package
    #[serde(default)]
    pub components: Vec<Component>,
}

/// A unit exposing variables, programs, and lifecycle hooks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Component {
    /// Unique id across the project
    pub id: String,

    /// Free-form description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Declared variables
    #[serde(default)]
    pub variables: Vec<VariableDefinition>,

    /// Executables that can be invoked through `cpm exec` or hooks
    #[serde(default)]
    pub programs: Vec<ProgramSpec>,

    /// Hooks run after the component has been installed
    #[serde(default)]
    pub on_post_init: Vec<ExecSpec>,

    /// Files rendered into the project
    #[serde(default)]
    pub files: Vec<FileSpec>,

    /// Kind-specific part, selected by `type`
    #[serde(flatten)]
    pub kind: ComponentKind,
}

impl Component {
    /// Program declared under `id`.
    #[must_use]
    pub fn program(&self, id: &str) -> Option<&ProgramSpec> {
        self.programs.iter().find(|p| p.id == id)
    }
}

/// Capability tag of a component.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ComponentKind {
    /// Provides the processes `cpm start` / `cpm stop` run
    Runtime {
        /// Processes started by `cpm start`, in order
        #[serde(default)]
        start: Vec<ProcessSpec>,
        /// Processes run by `cpm stop` and after an interrupted start
        #[serde(default)]
        stop: Vec<ProcessSpec>,
    },
    /// Deployment tooling
    Deployment,
    /// Project setup tooling
    Setup,
}

impl ComponentKind {
    /// The `type` tag as written in manifests.
    #[must_use]
    pub const fn tag(&self) -> &'static str {
        match self {
            Self::Runtime {
                ..
            } => "runtime",
            Self::Deployment => "deployment",
            Self::Setup => "setup",
        }
    }
}

/// An executable entry point of a component.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgramSpec {
    /// Program id, unique within the component
    pub id: String,
    /// Path relative to the package directory, or a command on `PATH`
    pub executable: String,
    /// Arguments, `${{ }}` tokens allowed
    #[serde(default)]
    pub args: Vec<String>,
}

/// A hook invoking one of the component's programs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecSpec {
    /// Id of the program to run
    #[serde(rename = "ref")]
    pub program: String,
    /// Extra arguments appended to the program's own
    #[serde(default)]
    pub args: Vec<String>,
}

/// A template file copied into the project with variables substituted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileSpec {
    /// Path relative to the package directory
    pub source: String,
    /// Path relative to the project root, `${{ }}` tokens allowed
    pub target: String,
}

impl PackageManifest {
    /// Parse a manifest document and validate it.
    pub fn from_json(content: &str, file: &str) -> Result<Self> {
        let manifest: Self = serde_json::from_str(content).map_err(|e| CpmError::ManifestParseError {
            file: file.to_string(),
            reason: e.to_string(),
        })?;
        manifest.validate(file)?;
        Ok(manifest)
    }

    /// Read and validate the manifest at `path`.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read package manifest: {}", path.display()))?;
        Self::from_json(&content, &path.display().to_string())
    }

    /// Component declared under `id`.
    #[must_use]
    pub fn component(&self, id: &str) -> Option<&Component> {
        self.components.iter().find(|c| c.id == id)
    }

    /// Check internal consistency: unique ids, hook references, and runtime
    /// dependencies that point into the same sequence.
    pub fn validate(&self, file: &str) -> Result<()> {
        let invalid = |reason: String| CpmError::ManifestParseError {
            file: file.to_string(),
            reason,
        };

        let mut component_ids = BTreeSet::new();
        for component in &self.components {
            if !component_ids.insert(component.id.as_str()) {
                return Err(invalid(format!("duplicate component id '{}'", component.id)).into());
            }

            let mut program_ids = BTreeSet::new();
            for program in &component.programs {
                if !program_ids.insert(program.id.as_str()) {
                    return Err(invalid(format!(
                        "component '{}' declares program '{}' twice",
                        component.id, program.id
                    ))
                    .into());
                }
            }

            for hook in &component.on_post_init {
                if !program_ids.contains(hook.program.as_str()) {
                    return Err(invalid(format!(
                        "component '{}' has an onPostInit hook referencing unknown program '{}'",
                        component.id, hook.program
                    ))
                    .into());
                }
            }

            if let ComponentKind::Runtime {
                start,
                stop,
            } = &component.kind
            {
                for sequence in [start, stop] {
                    crate::runtime::validate_sequence(sequence)?;
                }
            }
        }

        Ok(())
    }
}
