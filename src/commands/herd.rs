//! # Herd Command Implementation
//!
//! `herder herd` clones every selected project that is missing and brings the
//! existing ones onto their manifest reference. A branch or tag given on the
//! command line is tried on the primary remote, then on the upstream, before
//! falling back to the manifest reference with a warning.

use anyhow::Result;
use clap::Args;

use herder::engine::{HerdOptions, Operation};

use super::{run_operation, GlobalOpts, JobsArgs, SelectArgs};

/// Clone missing projects and update existing ones
#[derive(Args, Debug)]
pub struct HerdArgs {
    #[command(flatten)]
    pub select: SelectArgs,

    #[command(flatten)]
    pub jobs: JobsArgs,

    /// Herd this branch instead of the manifest reference
    #[arg(short, long, value_name = "BRANCH", conflicts_with = "tag")]
    pub branch: Option<String>,

    /// Herd this tag instead of the manifest reference
    #[arg(short, long, value_name = "TAG")]
    pub tag: Option<String>,

    /// Clone depth (0 for full history); ignored for forks
    #[arg(short, long, value_name = "DEPTH")]
    pub depth: Option<u32>,

    /// Rebase local commits instead of merging when pulling
    #[arg(short, long)]
    pub rebase: bool,
}

/// Execute the `herd` command.
pub fn execute(args: HerdArgs, global: &GlobalOpts) -> Result<()> {
    let op = Operation::Herd(HerdOptions {
        branch: args.branch,
        tag: args.tag,
        depth: args.depth,
        rebase: args.rebase,
    });
    run_operation(global, &args.select, op, args.jobs.scheduler())
}
