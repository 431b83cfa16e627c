//! # Prune Command Implementation
//!
//! `herder prune` deletes a branch across the selected projects. The branch is
//! looked up everywhere first; deletion then runs project by project and
//! carries on past individual failures.

use anyhow::Result;
use clap::Args;

use herder::engine::{prune, Operation, PruneOptions};
use herder::output::OutputConfig;
use herder::scheduler::Scheduler;

use super::{finish, preflight_network, run_batch, GlobalOpts, SelectArgs, Workspace};

/// Delete a branch locally and/or on the remote
#[derive(Args, Debug)]
pub struct PruneArgs {
    /// Branch to delete
    #[arg(value_name = "BRANCH")]
    pub branch: String,

    #[command(flatten)]
    pub select: SelectArgs,

    /// Delete the local branch (the default unless --remote is given)
    #[arg(short, long)]
    pub local: bool,

    /// Delete the branch on the primary remote
    #[arg(short, long)]
    pub remote: bool,

    /// Delete the local branch even if it is not merged
    #[arg(short, long)]
    pub force: bool,
}

/// Execute the `prune` command.
pub fn execute(args: PruneArgs, global: &GlobalOpts) -> Result<()> {
    let out = OutputConfig::for_flag(&global.color);
    let workspace = Workspace::load(&global.manifest)?;
    let projects = workspace.select(&args.select)?;

    let opts = PruneOptions {
        branch: args.branch,
        local: args.local,
        remote: args.remote,
        force: args.force,
    };
    let op = Operation::Prune(opts.clone());

    let online = preflight_network(&projects, op.needs_network())?;
    let ctx = workspace.context(online);
    prune::validate_prune(&projects, &ctx, &opts)?;

    let report = run_batch(
        &out,
        &op,
        &projects,
        &ctx,
        Scheduler::sequential().fail_fast(false),
    );
    finish(&out, op.name(), &report)
}
