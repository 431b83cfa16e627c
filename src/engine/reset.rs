//! Reset: force an existing working copy back onto its reference.
//!
//! Forked projects are reset to the upstream's reference, since that is the
//! source of truth the fork follows.

use log::info;

use crate::error::{Error, Result};
use crate::git_ref::GitRef;
use crate::manifest::ResolvedProject;
use crate::working_copy::WorkingCopy;

use super::herd::{existing_fetch_depth, Target};
use super::{Context, Outcome};

#[derive(Debug, Clone, Default)]
pub struct ResetOptions {
    /// Pin to the newest commit at or before this ISO 8601 timestamp.
    pub timestamp: Option<String>,
    /// Fetch depth for shallow clones; 0 means full history.
    pub depth: Option<u32>,
}

pub fn reset(project: &ResolvedProject, ctx: &Context, opts: &ResetOptions) -> Result<Outcome> {
    let wc = ctx.working_copy(project);
    let (target, reference) = match &project.upstream {
        Some(upstream) => (Target::upstream(project, upstream), &upstream.git_ref),
        None => (Target::primary(project), &project.git_ref),
    };

    wc.configure_remote(target.remote, target.url)?;
    let depth = existing_fetch_depth(&wc, project.effective_depth(opts.depth));
    wc.fetch(target.remote, Some(reference), depth)?;

    if let Some(timestamp) = &opts.timestamp {
        return reset_to_timestamp(project, &wc, target.remote, reference, timestamp);
    }

    match reference {
        GitRef::Branch(branch) => reset_branch(&wc, target.remote, branch),
        GitRef::Tag(tag) => Ok(if wc.checkout_tag(tag)? {
            Outcome::Changed(format!("reset to tag {} (detached)", tag))
        } else {
            Outcome::Unchanged(format!("already at tag {}", tag))
        }),
        GitRef::Commit(sha) => Ok(if wc.checkout_commit(sha)? {
            Outcome::Changed(format!("reset to commit {} (detached)", reference))
        } else {
            Outcome::Unchanged(format!("already at commit {}", reference))
        }),
    }
}

fn reset_branch(wc: &WorkingCopy, remote: &str, branch: &str) -> Result<Outcome> {
    let remote_ref = format!("{}/{}", remote, branch);
    let switched = if wc.local_branch_exists(branch)? {
        wc.checkout_branch(branch)?
    } else {
        wc.create_tracking_branch(remote, branch)?;
        true
    };

    let before = wc.head_sha()?;
    let target = wc.rev_parse(&remote_ref)?;
    if before.is_some() && before == target && !wc.is_dirty()? {
        return Ok(if switched {
            Outcome::Changed(format!("checked out {}, matches {}", branch, remote_ref))
        } else {
            Outcome::Unchanged(format!("{} matches {}", branch, remote_ref))
        });
    }

    wc.reset_hard(&remote_ref)?;
    Ok(Outcome::Changed(format!("{} reset to {}", branch, remote_ref)))
}

fn reset_to_timestamp(
    project: &ResolvedProject,
    wc: &WorkingCopy,
    remote: &str,
    reference: &GitRef,
    timestamp: &str,
) -> Result<Outcome> {
    let rev = match reference {
        GitRef::Branch(branch) => format!("{}/{}", remote, branch),
        other => other.canonical(),
    };
    let sha = wc
        .commit_at_or_before(&rev, timestamp, project.timestamp_author.as_deref())?
        .ok_or_else(|| Error::NoCommitBeforeTimestamp {
            project: project.name.clone(),
            reference: rev.clone(),
            timestamp: timestamp.to_string(),
        })?;
    info!("{}: {} at {} is {}", project.name, rev, timestamp, sha);

    let short = &sha[..7.min(sha.len())];
    Ok(if wc.checkout_commit(&sha)? {
        Outcome::Changed(format!("reset to {} from {} (detached)", short, timestamp))
    } else {
        Outcome::Unchanged(format!("already at {} from {}", short, timestamp))
    })
}

/// Commit time of a project's HEAD, used to pin other projects to the same moment.
pub fn timestamp_of(project: &ResolvedProject, ctx: &Context) -> Result<String> {
    let wc = ctx.working_copy(project);
    if !wc.exists() {
        return Err(Error::NotCloned {
            project: project.name.clone(),
            path: wc.path().to_path_buf(),
        });
    }
    wc.head_timestamp()
}
