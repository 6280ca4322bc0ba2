//! CPM CLI entry point
//!
//! Parses the command line, runs the command, and renders errors with their
//! suggestions:
//! - `install` - Install the packages listed in cpm.json
//! - `vars` - Show the effective variables of a component
//! - `validate` - Validate the variable configuration
//! - `start` / `stop` - Run the runtime component's process sequences
//! - `exec` - Run a component program

use anyhow::Result;
use clap::Parser;
use cpm_cli::cli;
use cpm_cli::core::user_friendly_error;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = cli::Cli::parse();

    #[cfg(windows)]
    colored::control::set_virtual_terminal(true).ok();

    match cli.execute().await {
        Ok(()) => Ok(()),
        Err(e) => {
            let error_ctx = user_friendly_error(e);
            error_ctx.display();
            std::process::exit(1);
        }
    }
}
