//! # Status Command Implementation

use anyhow::Result;
use clap::Args;
use serde::Serialize;

use herder::engine::{status, Operation};
use herder::output::OutputConfig;
use herder::scheduler::Scheduler;

use super::{finish, run_batch, GlobalOpts, SelectArgs, Workspace};

/// Show the state of each project's working copy
#[derive(Args, Debug)]
pub struct StatusArgs {
    #[command(flatten)]
    pub select: SelectArgs,

    /// Print machine-readable JSON instead of text
    #[arg(long)]
    pub json: bool,
}

#[derive(Serialize)]
struct StatusEntry<'a> {
    name: &'a str,
    path: String,
    #[serde(flatten)]
    status: status::ProjectStatus,
}

/// Execute the `status` command.
pub fn execute(args: StatusArgs, global: &GlobalOpts) -> Result<()> {
    let out = OutputConfig::for_flag(&global.color);
    let workspace = Workspace::load(&global.manifest)?;
    let projects = workspace.select(&args.select)?;
    let ctx = workspace.context(true);

    if args.json {
        let entries = projects
            .iter()
            .map(|project| {
                Ok(StatusEntry {
                    name: &project.name,
                    path: project.path.display().to_string(),
                    status: status::describe(project, &ctx)?,
                })
            })
            .collect::<herder::Result<Vec<_>>>()?;
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }

    let report = run_batch(
        &out,
        &Operation::Status,
        &projects,
        &ctx,
        Scheduler::sequential().fail_fast(false),
    );
    finish(&out, "status", &report)
}
