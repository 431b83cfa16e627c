//! Start: create (or switch to) a topic branch in each project.

use log::{info, warn};

use crate::error::{Error, Result};
use crate::git_ref::GitRef;
use crate::manifest::ResolvedProject;

use super::herd::existing_fetch_depth;
use super::{Context, Outcome};

#[derive(Debug, Clone, Default)]
pub struct StartOptions {
    pub branch: String,
    /// Also create the branch on the primary remote and track it.
    pub tracking: bool,
}

pub fn start(project: &ResolvedProject, ctx: &Context, opts: &StartOptions) -> Result<Outcome> {
    let wc = ctx.working_copy(project);
    let branch = opts.branch.as_str();

    let outcome = if wc.local_branch_exists(branch)? {
        if wc.checkout_branch(branch)? {
            Outcome::Changed(format!("checked out existing branch {}", branch))
        } else {
            Outcome::Unchanged(format!("already on {}", branch))
        }
    } else {
        wc.create_branch(branch)?;
        Outcome::Changed(format!("created branch {}", branch))
    };

    if !opts.tracking {
        return Ok(outcome);
    }
    if !ctx.online {
        warn!("{}: offline, not creating remote branch {}", project.name, branch);
        return Ok(outcome.with_note("offline, remote branch not created"));
    }

    let remote = project.remote.as_str();
    if wc.upstream_of(branch)? == Some((remote.to_string(), branch.to_string())) {
        return Ok(outcome);
    }

    if !wc.remote_branch_exists(remote, branch)? {
        wc.push(remote, branch, true)?;
        info!("{}: pushed {} to {}", project.name, branch, remote);
        return Ok(Outcome::Changed(format!(
            "{}; pushed to {}/{}",
            outcome.message(),
            remote,
            branch
        )));
    }

    let remote_ref = format!("{}/{}", remote, branch);
    let depth = existing_fetch_depth(&wc, project.depth);
    wc.fetch(remote, Some(&GitRef::branch(branch)?), depth)?;
    let local = wc.rev_parse(branch)?.unwrap_or_default();
    let remote_sha = wc.rev_parse(&remote_ref)?.unwrap_or_default();
    if local != remote_sha {
        return Err(Error::Divergence {
            project: project.name.clone(),
            branch: branch.to_string(),
            remote: remote.to_string(),
            local,
            remote_sha,
        });
    }
    wc.set_upstream(remote, branch)?;
    Ok(Outcome::Changed(format!(
        "{}; tracking {}",
        outcome.message(),
        remote_ref
    )))
}
