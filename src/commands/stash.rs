//! # Stash Command Implementation

use anyhow::Result;
use clap::Args;

use herder::engine::Operation;
use herder::scheduler::Scheduler;

use super::{run_operation, GlobalOpts, SelectArgs};

/// Stash local changes in dirty projects
#[derive(Args, Debug)]
pub struct StashArgs {
    #[command(flatten)]
    pub select: SelectArgs,
}

/// Execute the `stash` command.
pub fn execute(args: StashArgs, global: &GlobalOpts) -> Result<()> {
    run_operation(
        global,
        &args.select,
        Operation::Stash,
        Scheduler::sequential().fail_fast(false),
    )
}
