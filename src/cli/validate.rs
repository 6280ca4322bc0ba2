//! Validate the variable configuration of a project.
//!
//! Builds the variables of every used component and reports each component
//! that fails, instead of stopping at the first one.
//!
//! ```bash
//! cpm validate
//! cpm validate --strict   # also reject configured variables nobody declares
//! ```

use super::CliConfig;
use crate::constants::PROJECT_CONFIG_FILE;
use crate::project::Project;
use crate::variables::ValidationPolicy;
use anyhow::{Result, bail};
use clap::Args;
use colored::Colorize;

/// Arguments of `cpm validate`.
#[derive(Args, Debug)]
pub struct ValidateCommand {
    /// Treat unused configured variables as errors
    #[arg(long)]
    strict: bool,
}

impl ValidateCommand {
    /// Validate every used component and print a line per component.
    pub fn execute(self, config: &CliConfig) -> Result<()> {
        let project = Project::load(&config.project_root()?)?;
        let policy = if self.strict {
            ValidationPolicy::strict()
        } else {
            ValidationPolicy::default()
        };

        let mut failures = 0;
        for id in project.unknown_components() {
            println!("{} Component '{}' in {} is not provided by any package", "✗".red(), id, PROJECT_CONFIG_FILE);
            failures += 1;
        }

        for ctx in project.component_contexts() {
            match project.variables_for(&ctx.component.id, policy) {
                Ok(variables) => {
                    println!("{} {} ({} variables)", "✓".green(), ctx.component.id, variables.len());
                }
                Err(e) => {
                    println!("{} {}", "✗".red(), e);
                    failures += 1;
                }
            }
        }

        if failures > 0 {
            bail!("Validation failed with {failures} problem(s)");
        }
        println!("{}", "Configuration is valid".green().bold());
        Ok(())
    }
}
