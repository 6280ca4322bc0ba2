//! Run a program declared by a component.
//!
//! ```bash
//! cpm exec postgres psql -- -c "select 1"
//! ```
//!
//! The program runs in its package directory with the component's variables
//! in its environment. `cpm` exits with the program's exit code.

use super::CliConfig;
use crate::hooks::exec_program;
use crate::project::Project;
use crate::variables::ValidationPolicy;
use anyhow::Result;
use clap::Args;

/// Arguments of `cpm exec`.
#[derive(Args, Debug)]
pub struct ExecCommand {
    /// Component id
    pub(crate) component: String,

    /// Program id within the component
    pub(crate) program: String,

    /// Extra arguments appended to the program's own
    #[arg(last = true)]
    pub(crate) args: Vec<String>,
}

impl ExecCommand {
    /// Run the program and exit with its code when it fails.
    pub async fn execute(self, config: &CliConfig) -> Result<()> {
        let project = Project::load(&config.project_root()?)?;
        let ctx = project.context(&self.component)?;
        let variables = project.variables_for(&self.component, ValidationPolicy::default())?;

        let exit_code = exec_program(ctx.package, ctx.component, &self.program, &self.args, &variables).await?;
        match exit_code {
            Some(0) => Ok(()),
            Some(code) => std::process::exit(code),
            None => std::process::exit(1),
        }
    }
}
