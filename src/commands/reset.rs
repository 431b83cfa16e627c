//! # Reset Command Implementation
//!
//! `herder reset` forces each selected project back onto its manifest
//! reference (the upstream's, for forks), discarding local commits and
//! changes. With `--timestamp-project`, every project is instead pinned to
//! its newest commit at or before the HEAD commit time of the named project.

use anyhow::{Context as _, Result};
use clap::Args;

use herder::engine::{self, Operation, ResetOptions};
use herder::output::OutputConfig;

use super::{finish, preflight_network, run_batch, GlobalOpts, JobsArgs, SelectArgs, Workspace};

/// Reset projects to their manifest reference, discarding local changes
#[derive(Args, Debug)]
pub struct ResetArgs {
    #[command(flatten)]
    pub select: SelectArgs,

    #[command(flatten)]
    pub jobs: JobsArgs,

    /// Fetch depth for shallow clones (0 for full history)
    #[arg(short, long, value_name = "DEPTH")]
    pub depth: Option<u32>,

    /// Pin every project to the HEAD commit time of this project
    #[arg(long, value_name = "PROJECT", conflicts_with = "timestamp")]
    pub timestamp_project: Option<String>,

    /// Pin every project to this ISO 8601 timestamp
    #[arg(long, value_name = "TIME")]
    pub timestamp: Option<String>,
}

/// Execute the `reset` command.
pub fn execute(args: ResetArgs, global: &GlobalOpts) -> Result<()> {
    let out = OutputConfig::for_flag(&global.color);
    let workspace = Workspace::load(&global.manifest)?;
    let projects = workspace.select(&args.select)?;

    let online = preflight_network(&projects, true)?;
    let ctx = workspace.context(online);

    let timestamp = match (&args.timestamp_project, args.timestamp) {
        (Some(name), _) => {
            let reference = workspace
                .projects
                .get(name)
                .with_context(|| format!("no project named '{}'", name))?;
            Some(engine::reset::timestamp_of(reference, &ctx)?)
        }
        (None, timestamp) => timestamp,
    };

    let op = Operation::Reset(ResetOptions {
        timestamp,
        depth: args.depth,
    });
    let report = run_batch(&out, &op, &projects, &ctx, args.jobs.scheduler());
    finish(&out, op.name(), &report)
}
