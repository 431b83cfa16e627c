//! # Run Command Implementation
//!
//! `herder run` executes a shell command in every selected project that is
//! cloned. The command sees the project's name, path, remote and reference in
//! `HERDER_*` environment variables.

use anyhow::Result;
use clap::Args;

use herder::engine::{Operation, RunOptions};

use super::{run_operation, GlobalOpts, JobsArgs, SelectArgs};

/// Run a shell command in every cloned project
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Command line passed to the shell
    #[arg(value_name = "COMMAND")]
    pub command: String,

    #[command(flatten)]
    pub select: SelectArgs,

    #[command(flatten)]
    pub jobs: JobsArgs,

    /// Keep going after a command fails
    #[arg(short = 'k', long)]
    pub keep_going: bool,
}

/// Execute the `run` command.
pub fn execute(args: RunArgs, global: &GlobalOpts) -> Result<()> {
    let op = Operation::Run(RunOptions {
        command: args.command,
    });
    let scheduler = args.jobs.scheduler().fail_fast(!args.keep_going);
    run_operation(global, &args.select, op, scheduler)
}
