//! Runtime process sequencing for `cpm start` / `cpm stop`.
//!
//! A runtime component declares ordered `start` and `stop` lists of
//! [`ProcessSpec`]s. The [`Sequencer`] spawns them in order, holding back any
//! process whose `dependsOn` target is not ready yet:
//!
//! ```text
//!  spawn ──► Running ──(stdout matches startupLine)──► Ready
//!               │                                        │
//!               └──────────────(exit)──► Terminated ◄────┘
//! ```
//!
//! A dependency is satisfied when it is `Ready`, has terminated with exit
//! code 0, or was spawned in detached mode (where output is not observed).
//! A dependency that terminates unsuccessfully aborts the rest of the
//! sequence. Processes without a startup line only satisfy dependents by
//! exiting successfully.
//!
//! There is no per-process timeout: a dependency that neither prints its
//! startup line nor exits holds its dependents back until the user interrupts.

pub mod interrupt;
pub mod process;
pub mod sequencer;

pub use interrupt::Interrupt;
pub use process::ProcessState;
pub use sequencer::{
    LaunchContext, ProcessOutcome, SequenceMode, SequencePlan, SequenceReport, Sequencer,
    SequencerOptions,
};

use crate::core::CpmError;
use anyhow::Result;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

/// One entry of a start or stop sequence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessSpec {
    /// Id, unique within the sequence
    pub id: String,

    /// Path relative to the package directory, or a command on `PATH`
    pub executable: String,

    /// Arguments, `${{ }}` tokens allowed
    #[serde(default)]
    pub args: Vec<String>,

    /// Id of a process that must be ready (or have exited successfully) first
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub depends_on: Option<String>,

    /// Regex matched against each stdout line; the first match marks the process ready
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub startup_line: Option<String>,
}

/// Check a sequence before anything is spawned.
///
/// # Errors
///
/// - [`CpmError::DuplicateProcess`] for repeated ids
/// - [`CpmError::UnknownDependency`] for a `dependsOn` outside the sequence
/// - [`CpmError::DependencyCycle`] when dependencies loop
/// - [`CpmError::InvalidStartupLine`] for a startup line that is not a regex
pub fn validate_sequence(specs: &[ProcessSpec]) -> Result<()> {
    compile_startup_lines(specs)?;

    let mut ids = BTreeSet::new();
    for spec in specs {
        if !ids.insert(spec.id.as_str()) {
            return Err(CpmError::DuplicateProcess {
                id: spec.id.clone(),
            }
            .into());
        }
    }

    let deps: HashMap<&str, &str> =
        specs.iter().filter_map(|s| s.depends_on.as_deref().map(|d| (s.id.as_str(), d))).collect();

    for spec in specs {
        if let Some(dep) = spec.depends_on.as_deref() {
            if !ids.contains(dep) {
                return Err(CpmError::UnknownDependency {
                    dependency: dep.to_string(),
                    dependent: spec.id.clone(),
                }
                .into());
            }
        }

        // Each process has at most one dependency, so following the chain
        // either ends or revisits an id
        let mut chain = vec![spec.id.as_str()];
        let mut current = spec.id.as_str();
        while let Some(&next) = deps.get(current) {
            if chain.contains(&next) {
                chain.push(next);
                return Err(CpmError::DependencyCycle {
                    chain: chain.join(" -> "),
                }
                .into());
            }
            chain.push(next);
            current = next;
        }
    }

    Ok(())
}

/// Compiled startup lines keyed by process id.
pub(crate) fn compile_startup_lines(specs: &[ProcessSpec]) -> Result<HashMap<String, Regex>> {
    let mut patterns = HashMap::new();
    for spec in specs {
        if let Some(line) = &spec.startup_line {
            let regex = Regex::new(line).map_err(|e| CpmError::InvalidStartupLine {
                id: spec.id.clone(),
                reason: e.to_string(),
            })?;
            patterns.insert(spec.id.clone(), regex);
        }
    }
    Ok(patterns)
}
