//! Herd: clone a missing project or bring an existing one up to date.
//!
//! The state of a project is derived from its working copy on every call:
//!
//! | State              | Branch reference                          | Tag / commit reference        |
//! |--------------------|-------------------------------------------|-------------------------------|
//! | `Missing`          | init, fetch, create tracking branch       | init, fetch, checkout detached |
//! | `ClonedNoTracking` | track remote only if tips are identical   | fetch, checkout detached      |
//! | `ClonedTracking`   | pull or rebase                            | fetch, checkout detached      |
//! | `ClonedDetached`   | checkout or create the branch, then above | no-op if already on the commit |
//!
//! A failed clone never leaves a half-initialized directory behind.

use log::{info, warn};

use crate::error::{Error, Result};
use crate::git_ref::GitRef;
use crate::manifest::{ResolvedProject, ResolvedUpstream};
use crate::working_copy::WorkingCopy;

use super::{Context, Outcome};

/// Branch used when a remote does not advertise its default branch.
const FALLBACK_BRANCH: &str = "main";

#[derive(Debug, Clone, Default)]
pub struct HerdOptions {
    /// Herd this branch instead of the manifest reference.
    pub branch: Option<String>,
    /// Herd this tag instead of the manifest reference.
    pub tag: Option<String>,
    /// Clone depth override; 0 means full history.
    pub depth: Option<u32>,
    /// Rebase instead of merge when updating a tracking branch.
    pub rebase: bool,
}

/// Where a reference is fetched from.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Target<'a> {
    pub project: &'a str,
    pub remote: &'a str,
    pub url: &'a str,
}

impl<'a> Target<'a> {
    pub(crate) fn primary(project: &'a ResolvedProject) -> Self {
        Self {
            project: &project.name,
            remote: &project.remote,
            url: &project.url,
        }
    }

    pub(crate) fn upstream(project: &'a ResolvedProject, upstream: &'a ResolvedUpstream) -> Self {
        Self {
            project: &project.name,
            remote: &upstream.remote,
            url: &upstream.url,
        }
    }
}

pub fn herd(project: &ResolvedProject, ctx: &Context, opts: &HerdOptions) -> Result<Outcome> {
    let wc = ctx.working_copy(project);
    let depth = project.effective_depth(opts.depth);

    if wc.exists() {
        adopt_existing_remotes(&wc, project)?;
    }

    let requested = match (&opts.branch, &opts.tag) {
        (Some(branch), _) => Some(GitRef::branch(branch)?),
        (None, Some(tag)) => Some(GitRef::tag(tag)?),
        (None, None) => None,
    };

    let outcome = match requested {
        Some(reference) => herd_override(project, &wc, &reference, depth, opts.rebase)?,
        None => herd_reference(&wc, Target::primary(project), &project.git_ref, depth, opts.rebase)?,
    };

    if let Some(upstream) = &project.upstream {
        wc.configure_remote(&project.remote, &project.url)?;
        fetch_upstream(&wc, upstream)?;
    }

    Ok(outcome)
}

/// Herd an explicitly requested branch or tag.
///
/// The reference is looked up on the primary remote first, then on the
/// upstream. If neither has it, the project's own reference is herded and the
/// outcome says so.
fn herd_override(
    project: &ResolvedProject,
    wc: &WorkingCopy,
    reference: &GitRef,
    depth: u32,
    rebase: bool,
) -> Result<Outcome> {
    let mut targets = vec![Target::primary(project)];
    if let Some(upstream) = &project.upstream {
        targets.push(Target::upstream(project, upstream));
    }

    for target in targets {
        if remote_has(wc, target.url, reference)? {
            info!(
                "{}: herding requested {} from {}",
                project.name,
                reference.kind(),
                target.remote
            );
            return herd_reference(wc, target, reference, depth, rebase);
        }
    }

    warn!(
        "{}: {} {} not found on any remote, herding {} instead",
        project.name,
        reference.kind(),
        reference.short(),
        project.git_ref
    );
    let outcome = herd_reference(wc, Target::primary(project), &project.git_ref, depth, rebase)?;
    Ok(outcome.with_note(&format!(
        "{} {} not found on any remote",
        reference.kind(),
        reference.short()
    )))
}

fn remote_has(wc: &WorkingCopy, url: &str, reference: &GitRef) -> Result<bool> {
    match reference {
        GitRef::Branch(b) => wc.remote_branch_exists(url, b),
        GitRef::Tag(t) => wc.remote_tag_exists(url, t),
        GitRef::Commit(_) => Ok(true),
    }
}

fn herd_reference(
    wc: &WorkingCopy,
    target: Target<'_>,
    reference: &GitRef,
    depth: u32,
    rebase: bool,
) -> Result<Outcome> {
    match reference {
        GitRef::Branch(branch) => herd_branch_ref(wc, target, branch, depth, rebase),
        GitRef::Tag(tag) => herd_tag_ref(wc, target, tag, depth, rebase),
        GitRef::Commit(sha) => herd_commit_ref(wc, target, sha, depth),
    }
}

/// Bring the working copy onto `branch`, tracking `<remote>/<branch>`.
pub(crate) fn herd_branch_ref(
    wc: &WorkingCopy,
    target: Target<'_>,
    branch: &str,
    depth: u32,
    rebase: bool,
) -> Result<Outcome> {
    let remote = target.remote;
    let reference = GitRef::branch(branch)?;

    if !wc.exists() {
        clone_atomically(wc, || {
            wc.configure_remote(remote, target.url)?;
            if !wc.remote_branch_exists(remote, branch)? {
                return Err(Error::RemoteBranchMissing {
                    remote: remote.to_string(),
                    branch: branch.to_string(),
                });
            }
            wc.fetch(remote, Some(&reference), depth)?;
            wc.create_tracking_branch(remote, branch)
        })?;
        return Ok(Outcome::Changed(format!(
            "cloned on branch {} tracking {}/{}",
            branch, remote, branch
        )));
    }

    wc.configure_remote(remote, target.url)?;
    let fetch_depth = existing_fetch_depth(wc, depth);

    if !wc.local_branch_exists(branch)? {
        if !wc.remote_branch_exists(remote, branch)? {
            return Err(Error::RemoteBranchMissing {
                remote: remote.to_string(),
                branch: branch.to_string(),
            });
        }
        wc.fetch(remote, Some(&reference), fetch_depth)?;
        wc.create_tracking_branch(remote, branch)?;
        return Ok(Outcome::Changed(format!(
            "created branch {} tracking {}/{}",
            branch, remote, branch
        )));
    }

    let switched = wc.checkout_branch(branch)?;

    if !wc.remote_branch_exists(remote, branch)? {
        info!("{}: {} exists only locally", target.project, branch);
        let message = format!("on local branch {} (not on {})", branch, remote);
        return Ok(if switched {
            Outcome::Changed(message)
        } else {
            Outcome::Unchanged(message)
        });
    }

    if fetch_depth > 0 {
        wc.fetch_connected(remote, branch)?;
    } else {
        wc.fetch(remote, Some(&reference), 0)?;
    }
    let remote_ref = format!("{}/{}", remote, branch);

    let tracking = wc.upstream_of(branch)?;
    if tracking.as_ref() != Some(&(remote.to_string(), branch.to_string())) {
        let local = wc.rev_parse(branch)?.unwrap_or_default();
        let remote_sha = wc.rev_parse(&remote_ref)?.unwrap_or_default();
        if local != remote_sha {
            return Err(Error::Divergence {
                project: target.project.to_string(),
                branch: branch.to_string(),
                remote: remote.to_string(),
                local,
                remote_sha,
            });
        }
        wc.set_upstream(remote, branch)?;
        return Ok(Outcome::Changed(format!(
            "branch {} now tracks {}",
            branch, remote_ref
        )));
    }

    let before = wc.head_sha()?;
    if rebase {
        wc.rebase_onto(remote, branch)?;
    } else {
        wc.pull(remote, branch)?;
    }
    let after = wc.head_sha()?;

    if before != after {
        let verb = if rebase { "rebased onto" } else { "pulled" };
        Ok(Outcome::Changed(format!("{} {} {}", branch, verb, remote_ref)))
    } else if switched {
        Ok(Outcome::Changed(format!("checked out {}, up to date with {}", branch, remote_ref)))
    } else {
        Ok(Outcome::Unchanged(format!("{} up to date with {}", branch, remote_ref)))
    }
}

fn herd_tag_ref(
    wc: &WorkingCopy,
    target: Target<'_>,
    tag: &str,
    depth: u32,
    rebase: bool,
) -> Result<Outcome> {
    let remote = target.remote;
    let reference = GitRef::tag(tag)?;

    if !wc.exists() {
        if !wc.remote_tag_exists(target.url, tag)? {
            let branch = wc
                .remote_default_branch(target.url)?
                .unwrap_or_else(|| FALLBACK_BRANCH.to_string());
            warn!(
                "{}: tag {} not found on {}, cloning default branch {}",
                target.project, tag, remote, branch
            );
            let outcome = herd_branch_ref(wc, target, &branch, 0, rebase)?;
            return Ok(outcome.with_note(&format!("tag {} not found on {}", tag, remote)));
        }
        clone_atomically(wc, || {
            wc.configure_remote(remote, target.url)?;
            wc.fetch(remote, Some(&reference), depth)?;
            wc.checkout_tag(tag).map(|_| ())
        })?;
        return Ok(Outcome::Changed(format!("cloned at tag {} (detached)", tag)));
    }

    wc.configure_remote(remote, target.url)?;
    if !wc.remote_tag_exists(remote, tag)? {
        return Err(Error::RemoteRefMissing {
            remote: remote.to_string(),
            reference: reference.canonical(),
        });
    }
    wc.fetch(remote, Some(&reference), existing_fetch_depth(wc, depth))?;
    if wc.checkout_tag(tag)? {
        Ok(Outcome::Changed(format!("checked out tag {} (detached)", tag)))
    } else {
        Ok(Outcome::Unchanged(format!("already at tag {}", tag)))
    }
}

fn herd_commit_ref(wc: &WorkingCopy, target: Target<'_>, sha: &str, depth: u32) -> Result<Outcome> {
    let remote = target.remote;
    let reference = GitRef::commit(sha)?;
    let short = reference.to_string();

    if !wc.exists() {
        clone_atomically(wc, || {
            wc.configure_remote(remote, target.url)?;
            wc.fetch(remote, Some(&reference), depth)?;
            wc.checkout_commit(sha).map(|_| ())
        })?;
        return Ok(Outcome::Changed(format!("cloned at commit {} (detached)", short)));
    }

    wc.configure_remote(remote, target.url)?;
    if wc.rev_parse(sha)?.is_none() {
        wc.fetch(remote, Some(&reference), existing_fetch_depth(wc, depth))?;
    }
    if wc.checkout_commit(sha)? {
        Ok(Outcome::Changed(format!("checked out commit {} (detached)", short)))
    } else {
        Ok(Outcome::Unchanged(format!("already at commit {}", short)))
    }
}

/// Depth for fetches into an existing repository.
///
/// A complete repository is never made shallow again; a shallow one keeps
/// the requested depth, and depth 0 deepens it to full history.
pub(crate) fn existing_fetch_depth(wc: &WorkingCopy, depth: u32) -> u32 {
    if wc.is_shallow() {
        depth
    } else {
        0
    }
}

/// Run `populate` in a freshly initialized repository, removing everything
/// `init` created if any step fails.
pub(crate) fn clone_atomically<F>(wc: &WorkingCopy, populate: F) -> Result<()>
where
    F: FnOnce() -> Result<()>,
{
    let created_dir = !wc.path().exists();
    let result = wc.init().and_then(|_| populate());
    if let Err(err) = result {
        if let Err(cleanup) = wc.discard(created_dir) {
            warn!(
                "failed to remove partial clone at {}: {}",
                wc.path().display(),
                cleanup
            );
        }
        return Err(err);
    }
    Ok(())
}

/// Rename pre-existing remotes of a forked project to their canonical names.
///
/// A remote whose URL matches the project's or the upstream's URL under some
/// other name is renamed; the primary remote is then configured, which fails
/// if it exists with a different URL.
fn adopt_existing_remotes(wc: &WorkingCopy, project: &ResolvedProject) -> Result<()> {
    if let Some(upstream) = &project.upstream {
        let canonical = [
            (project.remote.as_str(), project.url.as_str()),
            (upstream.remote.as_str(), upstream.url.as_str()),
        ];
        for (name, url) in canonical {
            let remotes = wc.remotes()?;
            if remotes.iter().any(|(n, _)| n == name) {
                continue;
            }
            let stray = remotes.iter().find(|(n, u)| {
                u == url && canonical.iter().all(|(canonical_name, _)| n != canonical_name)
            });
            if let Some((old, _)) = stray {
                wc.rename_remote(old, name)?;
            }
        }
    }
    wc.configure_remote(&project.remote, &project.url)
}

/// Make the upstream's objects available without touching the checkout.
pub(crate) fn fetch_upstream(wc: &WorkingCopy, upstream: &ResolvedUpstream) -> Result<()> {
    wc.configure_remote(&upstream.remote, &upstream.url)?;
    info!("fetching upstream {} from {}", upstream.name, upstream.remote);
    wc.fetch(&upstream.remote, None, 0)
}
