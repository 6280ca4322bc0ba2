//! Spawning a single process and tracking its state.

use super::ProcessSpec;
use crate::core::CpmError;
use anyhow::Result;
use regex::Regex;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tokio::sync::watch;

/// Lifecycle state of a spawned process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessState {
    /// Spawned, startup line not seen yet
    Running,
    /// Startup line seen
    Ready,
    /// Exited; `None` when killed by a signal
    Terminated {
        /// Exit code
        exit_code: Option<i32>,
    },
}

impl ProcessState {
    /// Whether the process has exited.
    #[must_use]
    pub const fn is_terminated(self) -> bool {
        matches!(self, Self::Terminated { .. })
    }
}

/// How a process is spawned.
#[derive(Debug, Clone)]
pub struct SpawnRequest<'a> {
    /// What to run
    pub spec: &'a ProcessSpec,
    /// Arguments after variable substitution
    pub args: Vec<String>,
    /// Package directory; relative executables resolve against it and it is the working directory
    pub working_dir: &'a Path,
    /// Environment applied on top of the inherited one
    pub env: &'a HashMap<String, String>,
    /// Readiness pattern, ignored when detached
    pub startup_line: Option<Regex>,
    /// Do not capture output or wait for the process
    pub detached: bool,
}

/// A process started by the sequencer.
#[derive(Debug)]
pub struct TrackedProcess {
    /// Process id from the sequence
    pub id: String,
    /// Spawned without output capture
    pub detached: bool,
    state: watch::Receiver<ProcessState>,
}

impl TrackedProcess {
    /// Current state.
    #[must_use]
    pub fn state(&self) -> ProcessState {
        *self.state.borrow()
    }

    /// A receiver for awaiting state changes.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<ProcessState> {
        self.state.clone()
    }
}

/// Find the executable: first relative to `working_dir`, then on `PATH`.
pub fn resolve_executable(executable: &str, working_dir: &Path) -> Option<PathBuf> {
    let candidate = working_dir.join(executable);
    if candidate.is_file() {
        return Some(candidate);
    }
    which::which(executable).ok()
}

/// Feed every line of `reader` to `on_line` until end of stream.
///
/// Lines are decoded lossily so output that is not UTF-8 never stops the
/// pipe from being drained.
async fn for_each_line<R, F>(reader: R, mut on_line: F)
where
    R: AsyncRead + Unpin,
    F: FnMut(&str),
{
    let mut reader = BufReader::new(reader);
    let mut buf = Vec::new();
    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf).await {
            Ok(0) => break,
            Ok(_) => {
                let line = String::from_utf8_lossy(&buf);
                on_line(line.trim_end_matches(['\n', '\r']));
            }
            Err(e) => {
                tracing::debug!(target: "process", "Stopped reading process output: {}", e);
                break;
            }
        }
    }
}

/// Spawn a process and start tracking it.
///
/// In attached mode stdout lines are logged at info level and matched
/// against the startup line; stderr lines are logged at error level.
/// In detached mode all stdio is discarded and the process is placed in its
/// own process group so a Ctrl-C in the terminal does not reach it.
///
/// # Errors
///
/// - [`CpmError::ExecutableNotFound`] when the executable cannot be located
/// - [`CpmError::SpawnFailed`] when the OS refuses to start it
pub fn spawn(request: SpawnRequest<'_>) -> Result<TrackedProcess> {
    let spec = request.spec;
    let executable = resolve_executable(&spec.executable, request.working_dir).ok_or_else(|| {
        CpmError::ExecutableNotFound {
            id: spec.id.clone(),
            executable: spec.executable.clone(),
        }
    })?;

    let mut cmd = Command::new(&executable);
    cmd.args(&request.args).current_dir(request.working_dir).envs(request.env).stdin(Stdio::null());

    if request.detached {
        cmd.stdout(Stdio::null()).stderr(Stdio::null());
        #[cfg(unix)]
        cmd.process_group(0);
    } else {
        cmd.stdout(Stdio::piped()).stderr(Stdio::piped());
    }

    tracing::debug!(
        target: "process",
        "Spawning '{}': {} {}",
        spec.id,
        executable.display(),
        request.args.join(" ")
    );

    let mut child = cmd.spawn().map_err(|e| CpmError::SpawnFailed {
        id: spec.id.clone(),
        executable: executable.display().to_string(),
        reason: e.to_string(),
    })?;

    let (tx, rx) = watch::channel(ProcessState::Running);

    if request.detached {
        // Nothing observes a detached process; it keeps running after we drop the handle
        drop(child);
        return Ok(TrackedProcess {
            id: spec.id.clone(),
            detached: true,
            state: rx,
        });
    }

    let tx = Arc::new(tx);

    if let Some(stdout) = child.stdout.take() {
        let tx = Arc::clone(&tx);
        let id = spec.id.clone();
        let startup_line = request.startup_line;
        tokio::spawn(async move {
            for_each_line(stdout, |line| {
                tracing::info!(target: "process", "[{}] {}", id, line);
                if let Some(pattern) = &startup_line {
                    if pattern.is_match(line) {
                        let became_ready = tx.send_if_modified(|state| {
                            if *state == ProcessState::Running {
                                *state = ProcessState::Ready;
                                true
                            } else {
                                false
                            }
                        });
                        if became_ready {
                            tracing::debug!(target: "process", "'{}' is ready", id);
                        }
                    }
                }
            })
            .await;
        });
    }

    if let Some(stderr) = child.stderr.take() {
        let id = spec.id.clone();
        tokio::spawn(async move {
            for_each_line(stderr, |line| tracing::error!(target: "process", "[{}] {}", id, line)).await;
        });
    }

    let id = spec.id.clone();
    tokio::spawn(async move {
        let exit_code = match child.wait().await {
            Ok(status) => status.code(),
            Err(e) => {
                tracing::error!(target: "process", "Failed to wait for '{}': {}", id, e);
                None
            }
        };
        tracing::debug!(target: "process", "'{}' terminated with {:?}", id, exit_code);
        tx.send_replace(ProcessState::Terminated {
            exit_code,
        });
    });

    Ok(TrackedProcess {
        id: spec.id.clone(),
        detached: false,
        state: rx,
    })
}
