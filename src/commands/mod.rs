//! # Subcommands
//!
//! One file per `herder` subcommand. Each defines a clap `Args` struct and an
//! `execute(args, &GlobalOpts)` entry point that turns the arguments into an
//! engine [`Operation`] and hands it to the shared helpers below.
//!
//! The helpers cover what most commands share: loading the manifest,
//! selecting projects, the connectivity pre-flight, running a batch through
//! the scheduler and turning its report into an exit status.

pub mod clean;
pub mod completions;
pub mod herd;
pub mod prune;
pub mod reset;
pub mod run;
pub mod start;
pub mod stash;
pub mod status;
pub mod sync;
pub mod validate;

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context as _, Result};
use clap::Args;

use herder::engine::{self, Context, Operation};
use herder::error::Error;
use herder::manifest::{self, ProjectSet, ResolvedProject};
use herder::network;
use herder::output::{self, emoji, OutputConfig};
use herder::scheduler::{BatchReport, Scheduler, DEFAULT_JOBS};

/// Options shared by every command.
#[derive(Debug, Clone)]
pub struct GlobalOpts {
    pub manifest: PathBuf,
    pub color: String,
}

/// Positional project selectors.
#[derive(Args, Debug, Clone, Default)]
pub struct SelectArgs {
    /// Projects to act on, by group, name, path or glob (default: all)
    #[arg(value_name = "PROJECT")]
    pub projects: Vec<String>,
}

/// Worker pool size.
#[derive(Args, Debug, Clone, Default)]
pub struct JobsArgs {
    /// Run on N parallel workers (4 when given without a value)
    #[arg(
        short,
        long,
        value_name = "N",
        env = "HERDER_JOBS",
        num_args = 0..=1,
        default_missing_value = "4"
    )]
    pub jobs: Option<usize>,
}

impl JobsArgs {
    pub fn scheduler(&self) -> Scheduler {
        Scheduler::from_jobs(self.jobs.map(|n| if n == 0 { DEFAULT_JOBS } else { n }))
    }
}

/// A loaded manifest and the directory projects live under.
pub struct Workspace {
    pub root: PathBuf,
    pub projects: ProjectSet,
}

impl Workspace {
    pub fn load(manifest_path: &Path) -> Result<Self> {
        let projects = manifest::load(manifest_path)
            .with_context(|| format!("failed to load manifest {}", manifest_path.display()))?;
        let parent = match manifest_path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let root = fs::canonicalize(&parent)
            .with_context(|| format!("cannot resolve workspace root {}", parent.display()))?;
        Ok(Self { root, projects })
    }

    pub fn select(&self, selection: &SelectArgs) -> Result<Vec<ResolvedProject>> {
        Ok(self.projects.select(&selection.projects)?)
    }

    pub fn context(&self, online: bool) -> Context {
        Context::new(&self.root, online)
    }
}

/// Probe connectivity; `required` turns offline into an error.
pub fn preflight_network(projects: &[ResolvedProject], required: bool) -> Result<bool> {
    let online = network::is_online(projects);
    if !online && required {
        return Err(Error::Offline.into());
    }
    Ok(online)
}

/// Run `op` over `projects`, printing per-project results when sequential and
/// a status table plus progress bar when parallel.
pub fn run_batch(
    out: &OutputConfig,
    op: &Operation,
    projects: &[ResolvedProject],
    ctx: &Context,
    scheduler: Scheduler,
) -> BatchReport {
    let scheduler = if scheduler.is_parallel() && projects.len() > 1 {
        output::print_preflight(out, &engine::status::preflight(projects, ctx));
        scheduler.with_progress(output::progress_bar(out, projects.len(), op.name()))
    } else {
        scheduler
    };

    scheduler.run(
        projects,
        |project| engine::execute(op, project, ctx),
        |project, result| output::print_result(out, project, result),
    )
}

/// Print the summary and fail the process if any project failed.
pub fn finish(out: &OutputConfig, operation: &str, report: &BatchReport) -> Result<()> {
    output::print_report(out, operation, report);
    if !report.is_success() {
        bail!(
            "{} {} failed for {} project(s)",
            emoji(out, "❌", "[ERR]"),
            operation,
            report.failed.len()
        );
    }
    Ok(())
}

/// Load, select, check the network, run and report: the shape of most commands.
pub fn run_operation(
    global: &GlobalOpts,
    selection: &SelectArgs,
    op: Operation,
    scheduler: Scheduler,
) -> Result<()> {
    let out = OutputConfig::for_flag(&global.color);
    let workspace = Workspace::load(&global.manifest)?;
    let projects = workspace.select(selection)?;
    let online = if op.needs_network() {
        preflight_network(&projects, true)?
    } else {
        true
    };
    let ctx = workspace.context(online);
    let report = run_batch(&out, &op, &projects, &ctx, scheduler);
    finish(&out, op.name(), &report)
}
