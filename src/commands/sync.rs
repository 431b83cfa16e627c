//! # Sync Command Implementation
//!
//! `herder sync` updates forked projects from their upstream and pushes the
//! result to the primary remote. Projects without an upstream are skipped.

use anyhow::Result;
use clap::Args;

use herder::engine::{Operation, SyncOptions};

use super::{run_operation, GlobalOpts, JobsArgs, SelectArgs};

/// Update forks from their upstream and push the result
#[derive(Args, Debug)]
pub struct SyncArgs {
    #[command(flatten)]
    pub select: SelectArgs,

    #[command(flatten)]
    pub jobs: JobsArgs,

    /// Rebase onto the upstream instead of merging it
    #[arg(short, long)]
    pub rebase: bool,
}

/// Execute the `sync` command.
pub fn execute(args: SyncArgs, global: &GlobalOpts) -> Result<()> {
    let op = Operation::Sync(SyncOptions {
        rebase: args.rebase,
    });
    run_operation(global, &args.select, op, args.jobs.scheduler())
}
