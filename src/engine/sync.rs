//! Sync: bring a fork's branch up to date with its upstream and push it.

use log::info;

use crate::error::{Error, Result};
use crate::manifest::ResolvedProject;

use super::herd::{fetch_upstream, herd_branch_ref, Target};
use super::{Context, Outcome};

#[derive(Debug, Clone, Default)]
pub struct SyncOptions {
    /// Rebase onto the upstream instead of merging it.
    pub rebase: bool,
}

pub fn sync(project: &ResolvedProject, ctx: &Context, opts: &SyncOptions) -> Result<Outcome> {
    let Some(upstream) = &project.upstream else {
        return Ok(Outcome::Skipped("no upstream".to_string()));
    };
    let Some(branch) = project.git_ref.as_branch() else {
        return Ok(Outcome::Skipped(format!(
            "{} is not a branch",
            project.git_ref
        )));
    };
    let upstream_branch = upstream.git_ref.as_branch().unwrap_or(branch);

    let wc = ctx.working_copy(project);
    herd_branch_ref(&wc, Target::primary(project), branch, 0, opts.rebase)?;
    fetch_upstream(&wc, upstream)?;

    if !wc.remote_tracking_ref_exists(&upstream.remote, upstream_branch)? {
        return Err(Error::RemoteBranchMissing {
            remote: upstream.remote.clone(),
            branch: upstream_branch.to_string(),
        });
    }

    let before = wc.head_sha()?;
    if opts.rebase {
        wc.rebase_onto(&upstream.remote, upstream_branch)?;
    } else {
        wc.pull(&upstream.remote, upstream_branch)?;
    }
    let after = wc.head_sha()?;

    if before == after {
        return Ok(Outcome::Unchanged(format!(
            "{} up to date with {}/{}",
            branch, upstream.remote, upstream_branch
        )));
    }

    wc.push(&project.remote, branch, false)?;
    info!(
        "{}: pushed {} after syncing with {}/{}",
        project.name, branch, upstream.remote, upstream_branch
    );
    Ok(Outcome::Changed(format!(
        "synced {} with {}/{} and pushed to {}",
        branch, upstream.remote, upstream_branch, project.remote
    )))
}
