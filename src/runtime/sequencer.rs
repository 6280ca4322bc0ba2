//! Ordered, dependency-aware spawning of a process sequence.

use super::interrupt::Interrupt;
use super::process::{self, ProcessState, SpawnRequest, TrackedProcess};
use super::{ProcessSpec, compile_startup_lines, validate_sequence};
use crate::constants::DEFAULT_DEPENDENCY_WAIT;
use crate::core::CpmError;
use crate::variables::VariableCollection;
use anyhow::Result;
use futures::future::join_all;
use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::watch;

/// Which list of the plan to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SequenceMode {
    /// The `start` list
    Start,
    /// The `stop` list
    Stop,
}

impl fmt::Display for SequenceMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Start => f.write_str("start"),
            Self::Stop => f.write_str("stop"),
        }
    }
}

/// Where and with which variables the processes of a plan run.
#[derive(Debug, Clone)]
pub struct LaunchContext {
    /// Installed directory of the package owning the runtime component
    pub working_dir: PathBuf,
    /// Variables of the runtime component, used for argument substitution and
    /// exported as environment
    pub variables: VariableCollection,
}

/// Start and stop sequences of a runtime component.
#[derive(Debug, Clone)]
pub struct SequencePlan {
    /// Processes spawned by `start`
    pub start: Vec<ProcessSpec>,
    /// Processes spawned by `stop` and after an interrupted start
    pub stop: Vec<ProcessSpec>,
    /// Shared launch context
    pub context: LaunchContext,
}

/// Tuning knobs of a run.
#[derive(Debug, Clone, Copy)]
pub struct SequencerOptions {
    /// Upper bound of each wait for a pending dependency
    pub dependency_wait: Duration,
    /// Spawn start processes without observing their output
    pub detached: bool,
}

impl Default for SequencerOptions {
    fn default() -> Self {
        Self {
            dependency_wait: DEFAULT_DEPENDENCY_WAIT,
            detached: false,
        }
    }
}

/// Final state of one spawned process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessOutcome {
    /// Process id
    pub id: String,
    /// Exit code; `None` for detached processes, signals, or processes still
    /// running when the run was interrupted
    pub exit_code: Option<i32>,
}

/// Result of a sequencer run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SequenceReport {
    /// Which list ran
    pub mode: SequenceMode,
    /// Spawned processes in spawn order
    pub processes: Vec<ProcessOutcome>,
    /// Whether an interrupt halted the run
    pub interrupted: bool,
    /// Stop run performed after an interrupted start
    pub teardown: Option<Box<SequenceReport>>,
}

impl SequenceReport {
    /// Whether every process that exited did so with code 0.
    #[must_use]
    pub fn succeeded(&self) -> bool {
        !self.interrupted && self.processes.iter().all(|p| p.exit_code.is_none_or(|code| code == 0))
    }

    /// Exit code of a process.
    #[must_use]
    pub fn exit_code(&self, id: &str) -> Option<i32> {
        self.processes.iter().find(|p| p.id == id).and_then(|p| p.exit_code)
    }
}

/// Runs the start or stop sequence of a [`SequencePlan`].
///
/// # Examples
///
/// ```rust,ignore
/// use cpm_cli::runtime::{Interrupt, SequenceMode, Sequencer, SequencerOptions};
///
/// let interrupt = Interrupt::new();
/// interrupt.trigger_on_ctrl_c();
/// let report = Sequencer::new(plan, SequencerOptions::default(), interrupt)
///     .run(SequenceMode::Start)
///     .await?;
/// ```
#[derive(Debug)]
pub struct Sequencer {
    plan: SequencePlan,
    options: SequencerOptions,
    interrupt: Interrupt,
}

enum DependencyCheck {
    Satisfied,
    Pending(Option<watch::Receiver<ProcessState>>),
    Failed(Option<i32>),
}

impl Sequencer {
    /// Create a sequencer over `plan`, halted by `interrupt`.
    #[must_use]
    pub const fn new(plan: SequencePlan, options: SequencerOptions, interrupt: Interrupt) -> Self {
        Self {
            plan,
            options,
            interrupt,
        }
    }

    /// Run the list selected by `mode`.
    ///
    /// When a start run is interrupted, the stop list is run right away with a
    /// fresh interrupt and its report is attached as `teardown`.
    ///
    /// # Errors
    ///
    /// - [`CpmError::DependencyFailed`] when a dependency exits unsuccessfully;
    ///   processes already started keep running
    /// - [`CpmError::ExecutableNotFound`] / [`CpmError::SpawnFailed`]
    /// - sequence validation errors, before anything is spawned
    pub async fn run(&self, mode: SequenceMode) -> Result<SequenceReport> {
        let mut report = match mode {
            SequenceMode::Start => self.run_list(mode, &self.plan.start, self.options.detached, &self.interrupt).await?,
            SequenceMode::Stop => self.run_list(mode, &self.plan.stop, false, &self.interrupt).await?,
        };

        if report.interrupted && mode == SequenceMode::Start {
            tracing::warn!("Startup interrupted, running the stop sequence");
            let teardown = self.run_list(SequenceMode::Stop, &self.plan.stop, false, &Interrupt::new()).await?;
            report.teardown = Some(Box::new(teardown));
        }

        Ok(report)
    }

    async fn run_list(
        &self,
        mode: SequenceMode,
        specs: &[ProcessSpec],
        detached: bool,
        interrupt: &Interrupt,
    ) -> Result<SequenceReport> {
        validate_sequence(specs)?;
        let mut startup_lines = compile_startup_lines(specs)?;
        let env = self.plan.context.variables.exported_env();

        let mut queue: VecDeque<&ProcessSpec> = specs.iter().collect();
        let mut spawned: Vec<TrackedProcess> = Vec::new();
        let mut interrupted = false;

        tracing::debug!("Running {} sequence with {} processes", mode, specs.len());

        while let Some(spec) = queue.pop_front() {
            if interrupt.is_triggered() {
                interrupted = true;
                break;
            }

            if let Some(dependency) = spec.depends_on.as_deref() {
                match check_dependency(&spawned, dependency) {
                    DependencyCheck::Satisfied => {}
                    DependencyCheck::Failed(exit_code) => {
                        tracing::error!(
                            "Dependency '{}' of '{}' failed, not starting the remaining processes",
                            dependency,
                            spec.id
                        );
                        return Err(CpmError::DependencyFailed {
                            dependency: dependency.to_string(),
                            dependent: spec.id.clone(),
                            exit_code,
                        }
                        .into());
                    }
                    DependencyCheck::Pending(receiver) => {
                        tracing::debug!("'{}' waits for '{}'", spec.id, dependency);
                        queue.push_back(spec);
                        self.wait_for_dependency(receiver, interrupt).await;
                        continue;
                    }
                }
            }

            let args: Vec<String> =
                spec.args.iter().map(|arg| self.plan.context.variables.substitute(arg)).collect();
            let tracked = process::spawn(SpawnRequest {
                spec,
                args,
                working_dir: &self.plan.context.working_dir,
                env: &env,
                startup_line: startup_lines.remove(&spec.id),
                detached,
            })?;
            spawned.push(tracked);
        }

        if !interrupted && !detached {
            interrupted = self.wait_for_exit(&spawned, interrupt).await;
        }

        let processes = spawned
            .iter()
            .map(|p| ProcessOutcome {
                id: p.id.clone(),
                exit_code: match p.state() {
                    ProcessState::Terminated {
                        exit_code,
                    } => exit_code,
                    _ => None,
                },
            })
            .collect();

        Ok(SequenceReport {
            mode,
            processes,
            interrupted,
            teardown: None,
        })
    }

    /// Sleep until the dependency changes state, the wait bound elapses, or an interrupt.
    async fn wait_for_dependency(&self, receiver: Option<watch::Receiver<ProcessState>>, interrupt: &Interrupt) {
        let delay = tokio::time::sleep(self.options.dependency_wait);
        match receiver {
            Some(mut rx) => {
                tokio::select! {
                    () = delay => {}
                    _ = rx.changed() => {}
                    () = interrupt.triggered() => {}
                }
            }
            None => {
                tokio::select! {
                    () = delay => {}
                    () = interrupt.triggered() => {}
                }
            }
        }
    }

    /// Wait for every attached process to exit. Returns `true` when interrupted first.
    async fn wait_for_exit(&self, spawned: &[TrackedProcess], interrupt: &Interrupt) -> bool {
        let exits = spawned.iter().filter(|p| !p.detached).map(|p| {
            let mut rx = p.subscribe();
            async move {
                let _ = rx.wait_for(|state| state.is_terminated()).await;
            }
        });

        tokio::select! {
            _ = join_all(exits) => false,
            () = interrupt.triggered() => true,
        }
    }
}

fn check_dependency(spawned: &[TrackedProcess], dependency: &str) -> DependencyCheck {
    let Some(tracked) = spawned.iter().find(|p| p.id == dependency) else {
        return DependencyCheck::Pending(None);
    };

    // A detached process is never observed, so being spawned is all it can offer
    if tracked.detached {
        return DependencyCheck::Satisfied;
    }

    let mut rx = tracked.subscribe();
    let state = *rx.borrow_and_update();
    match state {
        ProcessState::Ready
        | ProcessState::Terminated {
            exit_code: Some(0),
        } => DependencyCheck::Satisfied,
        ProcessState::Terminated {
            exit_code,
        } => DependencyCheck::Failed(exit_code),
        ProcessState::Running => DependencyCheck::Pending(Some(rx)),
    }
}
