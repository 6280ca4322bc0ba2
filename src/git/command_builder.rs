//! Type-safe Git command builder for consistent command execution
//!
//! Provides a fluent API for building and executing Git commands with uniform
//! timeout handling, logging, and error mapping.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tokio::time::timeout;

use crate::constants::{GIT_CLONE_TIMEOUT, GIT_FETCH_TIMEOUT};
use crate::core::CpmError;

/// Builder for a single `git` invocation.
///
/// # Examples
///
/// ```rust,ignore
/// use cpm_cli::git::command_builder::GitCommand;
///
/// # async fn example() -> anyhow::Result<()> {
/// let head = GitCommand::new()
///     .args(["rev-parse", "HEAD"])
///     .current_dir("/path/to/repo")
///     .execute_stdout()
///     .await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct GitCommand {
    args: Vec<String>,
    current_dir: Option<PathBuf>,
    env_vars: Vec<(String, String)>,
    timeout_duration: Option<Duration>,
    context: Option<String>,
}

/// Captured output of a successful git command.
#[derive(Debug, Clone)]
pub struct GitCommandOutput {
    /// Standard output
    pub stdout: String,
    /// Standard error
    pub stderr: String,
}

impl Default for GitCommand {
    fn default() -> Self {
        Self {
            args: Vec::new(),
            current_dir: None,
            env_vars: Vec::new(),
            timeout_duration: Some(GIT_FETCH_TIMEOUT),
            context: None,
        }
    }
}

impl GitCommand {
    /// Empty command with the default timeout.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// `git ls-remote --tags --heads <url>`
    #[must_use]
    pub fn ls_remote(url: &str) -> Self {
        Self::new().args(["ls-remote", "--tags", "--heads", url])
    }

    /// Shallow clone of a single tag or branch.
    #[must_use]
    pub fn clone_ref(url: &str, reference: &str, target: &Path) -> Self {
        Self::new()
            .args(["clone", "--quiet", "--depth", "1", "--branch", reference, url])
            .arg(target.display().to_string())
            .env("GIT_TERMINAL_PROMPT", "0")
            .with_timeout(Some(GIT_CLONE_TIMEOUT))
    }

    /// `git rev-parse HEAD`
    #[must_use]
    pub fn head_commit() -> Self {
        Self::new().args(["rev-parse", "HEAD"])
    }

    /// Run the command in `dir` (passed to git as `-C <dir>`).
    #[must_use]
    pub fn current_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.current_dir = Some(dir.as_ref().to_path_buf());
        self
    }

    /// Append one argument.
    #[must_use]
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Append several arguments.
    #[must_use]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Set an environment variable for the git process.
    #[must_use]
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env_vars.push((key.into(), value.into()));
        self
    }

    /// Set a custom timeout (None for no timeout).
    #[must_use]
    pub const fn with_timeout(mut self, duration: Option<Duration>) -> Self {
        self.timeout_duration = duration;
        self
    }

    /// Label included in log lines.
    #[must_use]
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    /// Run the command and capture its output.
    ///
    /// # Errors
    ///
    /// - [`CpmError::GitNotFound`] when git is not on `PATH`
    /// - [`CpmError::GitCommandError`] on timeout or non-zero exit
    pub async fn execute(self) -> Result<GitCommandOutput> {
        let git = which::which("git").map_err(|_| CpmError::GitNotFound)?;
        let mut cmd = Command::new(git);

        let mut full_args = Vec::new();
        if let Some(ref dir) = self.current_dir {
            full_args.push("-C".to_string());
            full_args.push(dir.display().to_string());
        }
        full_args.extend(self.args.iter().cloned());
        cmd.args(&full_args);

        let ctx = self.context.as_deref().unwrap_or("git");
        tracing::debug!(target: "git", "({}) Executing command: git {}", ctx, full_args.join(" "));

        for (key, value) in &self.env_vars {
            cmd.env(key, value);
        }
        cmd.stdin(Stdio::null()).stdout(Stdio::piped()).stderr(Stdio::piped());

        let operation = self.args.first().cloned().unwrap_or_else(|| "unknown".to_string());
        let output_future = cmd.output();

        let output = match self.timeout_duration {
            Some(duration) => match timeout(duration, output_future).await {
                Ok(result) => result.with_context(|| format!("Failed to execute git {}", full_args.join(" ")))?,
                Err(_) => {
                    tracing::warn!(
                        target: "git",
                        "Command timed out after {} seconds: git {}",
                        duration.as_secs(),
                        full_args.join(" ")
                    );
                    return Err(CpmError::GitCommandError {
                        operation,
                        stderr: format!("timed out after {} seconds", duration.as_secs()),
                    }
                    .into());
                }
            },
            None => output_future.await.with_context(|| format!("Failed to execute git {}", full_args.join(" ")))?,
        };

        let stdout = String::from_utf8_lossy(&output.stdout).to_string();
        let stderr = String::from_utf8_lossy(&output.stderr).to_string();

        if !output.status.success() {
            tracing::debug!(target: "git", "({}) Command failed with exit code: {:?}", ctx, output.status.code());
            return Err(CpmError::GitCommandError {
                operation,
                stderr: if stderr.trim().is_empty() {
                    stdout
                } else {
                    stderr
                },
            }
            .into());
        }

        if !stderr.trim().is_empty() {
            tracing::debug!(target: "git", "({}) {}", ctx, stderr.trim());
        }

        Ok(GitCommandOutput {
            stdout,
            stderr,
        })
    }

    /// Run the command and return trimmed stdout.
    pub async fn execute_stdout(self) -> Result<String> {
        Ok(self.execute().await?.stdout.trim().to_string())
    }
}
