//! Command-line interface for CPM (Component Package Manager).
//!
//! Each command lives in its own module with its argument struct and an
//! `execute` method. Global options are defined on [`Cli`].
//!
//! # Available Commands
//!
//! - `install` - Fetch the packages listed in `cpm.json`, render files, run hooks
//! - `vars` - Show the effective variables of a component
//! - `validate` - Check the variable configuration of every used component
//! - `start` - Run the start sequence of the runtime component
//! - `stop` - Run the stop sequence of the runtime component
//! - `exec` - Run one of a component's programs
//!
//! # Basic Workflow
//!
//! ```bash
//! cpm install
//! cpm validate
//! cpm start            # Ctrl-C runs the stop sequence
//! cpm exec postgres psql -- -c "select 1"
//! ```

mod exec;
mod install;
mod start;
mod validate;
mod vars;

use crate::config::find_project_root;
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

pub use exec::ExecCommand;
pub use install::InstallCommand;
pub use start::{StartCommand, StopCommand};
pub use validate::ValidateCommand;
pub use vars::VarsCommand;

/// Runtime configuration derived from the global flags.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CliConfig {
    /// Filter directive for the log subscriber.
    ///
    /// `None` keeps whatever `RUST_LOG` says, falling back to `warn`.
    pub log_level: Option<String>,

    /// Project directory given with `--project-dir`.
    pub project_dir: Option<PathBuf>,
}

impl CliConfig {
    /// Create a configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Install the global `tracing` subscriber writing to stderr.
    ///
    /// Process output is logged under the `process` target at info level, so
    /// the default filter lets it through while keeping crate internals quiet.
    pub fn init_logging(&self) {
        let filter = match &self.log_level {
            Some(level) => EnvFilter::new(level),
            None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn,process=info")),
        };

        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(false)
            .without_time()
            .try_init();
    }

    /// Root of the project: the directory holding `cpm.json`, searched from
    /// `--project-dir` or the current directory upwards.
    pub fn project_root(&self) -> Result<PathBuf> {
        let start = match &self.project_dir {
            Some(dir) => dir.clone(),
            None => std::env::current_dir().context("Failed to determine the current directory")?,
        };
        find_project_root(Path::new(&start))
    }
}

/// Component Package Manager.
///
/// # Examples
///
/// ```bash
/// cpm --verbose install
/// cpm --project-dir ../shop vars server --env
/// cpm -q start --detached
/// ```
#[derive(Parser, Debug)]
#[command(name = "cpm", author, version, about = "Component package manager", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable debug logging (equivalent to `RUST_LOG=debug`)
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    verbose: bool,

    /// Only log errors, including process stderr
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Directory to search for cpm.json instead of the current one
    #[arg(long, global = true, value_name = "DIR")]
    project_dir: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Install the packages listed in cpm.json
    Install(InstallCommand),
    /// Show the effective variables of a component
    Vars(VarsCommand),
    /// Validate the variable configuration of every used component
    Validate(ValidateCommand),
    /// Run the start sequence of the runtime component
    Start(StartCommand),
    /// Run the stop sequence of the runtime component
    Stop(StopCommand),
    /// Run a program declared by a component
    Exec(ExecCommand),
}

impl Cli {
    /// Execute the parsed command.
    pub async fn execute(self) -> Result<()> {
        let config = self.build_config();
        self.execute_with_config(config).await
    }

    /// Translate the global flags into a [`CliConfig`].
    ///
    /// ```rust,ignore
    /// use cpm_cli::cli::Cli;
    /// use clap::Parser;
    ///
    /// let cli = Cli::parse_from(["cpm", "--verbose", "validate"]);
    /// assert_eq!(cli.build_config().log_level.as_deref(), Some("debug"));
    /// ```
    #[must_use]
    pub fn build_config(&self) -> CliConfig {
        let log_level = if self.verbose {
            Some("debug".to_string())
        } else if self.quiet {
            Some("error".to_string())
        } else {
            None
        };

        CliConfig {
            log_level,
            project_dir: self.project_dir.clone(),
        }
    }

    /// Execute with an explicit configuration.
    pub async fn execute_with_config(self, config: CliConfig) -> Result<()> {
        config.init_logging();

        match self.command {
            Commands::Install(cmd) => cmd.execute(&config).await,
            Commands::Vars(cmd) => cmd.execute(&config),
            Commands::Validate(cmd) => cmd.execute(&config),
            Commands::Start(cmd) => cmd.execute(&config).await,
            Commands::Stop(cmd) => cmd.execute(&config).await,
            Commands::Exec(cmd) => cmd.execute(&config).await,
        }
    }
}
