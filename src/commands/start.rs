//! # Start Command Implementation
//!
//! `herder start` creates a topic branch in each selected project, or switches
//! to it if it already exists. With `--tracking` the branch is also created on
//! the primary remote; offline, that step is skipped with a warning.

use anyhow::Result;
use clap::Args;

use herder::engine::{Operation, StartOptions};
use herder::output::OutputConfig;
use herder::scheduler::Scheduler;

use super::{finish, preflight_network, run_batch, GlobalOpts, SelectArgs, Workspace};

/// Create or switch to a topic branch
#[derive(Args, Debug)]
pub struct StartArgs {
    /// Branch to start
    #[arg(value_name = "BRANCH")]
    pub branch: String,

    #[command(flatten)]
    pub select: SelectArgs,

    /// Also create the branch on the remote and track it
    #[arg(short, long)]
    pub tracking: bool,
}

/// Execute the `start` command.
pub fn execute(args: StartArgs, global: &GlobalOpts) -> Result<()> {
    let out = OutputConfig::for_flag(&global.color);
    let workspace = Workspace::load(&global.manifest)?;
    let projects = workspace.select(&args.select)?;

    let online = if args.tracking {
        preflight_network(&projects, false)?
    } else {
        true
    };
    let ctx = workspace.context(online);

    let op = Operation::Start(StartOptions {
        branch: args.branch,
        tracking: args.tracking,
    });
    let report = run_batch(&out, &op, &projects, &ctx, Scheduler::sequential());
    finish(&out, op.name(), &report)
}
