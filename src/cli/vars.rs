//! Show the effective variables of a component.
//!
//! ```bash
//! cpm vars postgres          # name = value, one per line
//! cpm vars postgres --env    # as exported to processes: db_port=5432
//! ```

use super::CliConfig;
use crate::project::Project;
use crate::variables::{ValidationPolicy, value_to_string};
use anyhow::Result;
use clap::Args;
use colored::Colorize;

/// Arguments of `cpm vars`.
#[derive(Args, Debug)]
pub struct VarsCommand {
    /// Component id
    component: String,

    /// Print the variables as environment assignments
    #[arg(long)]
    env: bool,
}

impl VarsCommand {
    /// Build and print the variables.
    pub fn execute(self, config: &CliConfig) -> Result<()> {
        let project = Project::load(&config.project_root()?)?;
        let variables = project.variables_for(&self.component, ValidationPolicy::default())?;

        if self.env {
            let mut env: Vec<(String, String)> = variables.exported_env().into_iter().collect();
            env.sort();
            for (key, value) in env {
                println!("{key}={value}");
            }
        } else {
            for (name, value) in variables.values() {
                println!("{} = {}", name.cyan(), value_to_string(value));
            }
        }
        Ok(())
    }
}
