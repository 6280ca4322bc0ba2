//! Run the start and stop sequences of the runtime component.
//!
//! ```bash
//! cpm start              # stays attached; Ctrl-C runs the stop sequence
//! cpm start --detached   # spawn in the background and return
//! cpm stop
//! ```

use super::CliConfig;
use crate::project::Project;
use crate::runtime::{Interrupt, SequenceMode, SequenceReport, Sequencer, SequencerOptions};
use crate::variables::ValidationPolicy;
use anyhow::{Result, bail};
use clap::Args;
use colored::Colorize;
use std::time::Duration;

/// Arguments of `cpm start`.
#[derive(Args, Debug)]
pub struct StartCommand {
    /// Spawn the processes in the background and return immediately
    #[arg(short, long)]
    detached: bool,

    /// Upper bound of each wait for a pending dependency, in milliseconds
    #[arg(long, value_name = "MS", default_value_t = 500)]
    dependency_wait: u64,
}

/// Arguments of `cpm stop`.
#[derive(Args, Debug)]
pub struct StopCommand {}

impl StartCommand {
    /// Run the start sequence.
    pub async fn execute(self, config: &CliConfig) -> Result<()> {
        let options = SequencerOptions {
            dependency_wait: Duration::from_millis(self.dependency_wait),
            detached: self.detached,
        };
        let report = run_sequence(config, SequenceMode::Start, options).await?;

        if self.detached {
            println!("{} Started {} process(es) in the background", "✓".green(), report.processes.len());
            return Ok(());
        }
        finish(&report)
    }
}

impl StopCommand {
    /// Run the stop sequence.
    pub async fn execute(self, config: &CliConfig) -> Result<()> {
        let report = run_sequence(config, SequenceMode::Stop, SequencerOptions::default()).await?;
        finish(&report)
    }
}

async fn run_sequence(config: &CliConfig, mode: SequenceMode, options: SequencerOptions) -> Result<SequenceReport> {
    let project = Project::load(&config.project_root()?)?;
    let plan = project.runtime_plan(ValidationPolicy::default())?;

    let interrupt = Interrupt::new();
    interrupt.trigger_on_ctrl_c();

    Sequencer::new(plan, options, interrupt).run(mode).await
}

fn finish(report: &SequenceReport) -> Result<()> {
    print_report(report);
    if let Some(teardown) = &report.teardown {
        print_report(teardown);
    }

    if report.interrupted {
        return Ok(());
    }
    if !report.succeeded() {
        bail!("The {} sequence did not complete successfully", report.mode);
    }
    Ok(())
}

fn print_report(report: &SequenceReport) {
    println!("{}", format!("{} sequence", report.mode).bold());
    for process in &report.processes {
        let status = match process.exit_code {
            Some(0) => "exited with code 0".green(),
            Some(code) => format!("exited with code {code}").red(),
            None if report.interrupted => "interrupted".yellow(),
            None => "killed by a signal".red(),
        };
        println!("  {} {}", process.id, status);
    }
}
