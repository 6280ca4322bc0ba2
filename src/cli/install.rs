//! Install the packages of a project.
//!
//! ```bash
//! cpm install            # fetch what changed since the last install
//! cpm install --force    # fetch everything again
//! cpm install --no-hooks # skip onPostInit hooks
//! ```

use super::CliConfig;
use crate::git::GitFetcher;
use crate::installer::{InstallOptions, Installer};
use crate::variables::ValidationPolicy;
use anyhow::Result;
use clap::Args;
use colored::Colorize;

/// Arguments of `cpm install`.
#[derive(Args, Debug)]
pub struct InstallCommand {
    /// Fetch every package even when the lockfile is current
    #[arg(long)]
    force: bool,

    /// Do not run onPostInit hooks
    #[arg(long)]
    no_hooks: bool,

    /// Fail on configured variables that no component declares
    #[arg(long)]
    strict: bool,
}

impl InstallCommand {
    /// Run the installer against the system git.
    pub async fn execute(self, config: &CliConfig) -> Result<()> {
        let root = config.project_root()?;
        let options = InstallOptions {
            force: self.force,
            run_hooks: !self.no_hooks,
            policy: if self.strict {
                ValidationPolicy::strict()
            } else {
                ValidationPolicy::default()
            },
        };

        let summary = Installer::new(root, GitFetcher).with_options(options).install().await?;

        println!("{}", "Installation complete".green().bold());
        println!("  {} fetched, {} up to date", summary.fetched.len(), summary.reused.len());
        if summary.files_rendered > 0 {
            println!("  {} file(s) rendered", summary.files_rendered);
        }
        if summary.hooks_run > 0 {
            println!("  {} hook(s) run", summary.hooks_run);
        }
        Ok(())
    }
}
