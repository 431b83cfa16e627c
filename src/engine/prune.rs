//! Prune: delete a branch locally and/or on the primary remote.
//!
//! The branch is looked up across the whole selection before anything is
//! deleted, so a typo fails once instead of once per project.

use std::sync::Mutex;

use log::{debug, info};
use rayon::prelude::*;

use crate::error::{Error, Result};
use crate::git_ref::GitRef;
use crate::manifest::ResolvedProject;
use crate::working_copy::WorkingCopy;

use super::herd::existing_fetch_depth;
use super::{Context, Outcome};

#[derive(Debug, Clone, Default)]
pub struct PruneOptions {
    pub branch: String,
    /// Delete the local branch. Implied when `remote` is not set.
    pub local: bool,
    /// Delete the branch on the primary remote.
    pub remote: bool,
    /// Delete the local branch even if it is not merged.
    pub force: bool,
}

impl PruneOptions {
    fn prunes_local(&self) -> bool {
        self.local || !self.remote
    }
}

/// Check that the branch exists in at least one selected project.
///
/// Projects that are not cloned are ignored. Lookups run in parallel since
/// remote checks are network round trips.
pub fn validate_prune(projects: &[ResolvedProject], ctx: &Context, opts: &PruneOptions) -> Result<()> {
    let errors: Mutex<Vec<Error>> = Mutex::new(Vec::new());

    let found = projects.par_iter().any(|project| {
        let wc = ctx.working_copy(project);
        if !wc.exists() {
            return false;
        }
        match branch_present(&wc, project, opts) {
            Ok(present) => present,
            Err(e) => {
                if let Ok(mut errors) = errors.lock() {
                    errors.push(e);
                }
                false
            }
        }
    });

    if found {
        return Ok(());
    }

    let collected = errors.into_inner().map_err(|_| Error::LockPoisoned {
        context: "prune validation errors".to_string(),
    })?;
    if let Some(first) = collected.into_iter().next() {
        return Err(first);
    }

    Err(Error::BranchNotFound {
        branch: opts.branch.clone(),
    })
}

fn branch_present(wc: &WorkingCopy, project: &ResolvedProject, opts: &PruneOptions) -> Result<bool> {
    if opts.prunes_local() && wc.local_branch_exists(&opts.branch)? {
        return Ok(true);
    }
    if opts.remote && wc.remote_branch_exists(&project.remote, &opts.branch)? {
        return Ok(true);
    }
    Ok(false)
}

pub fn prune(project: &ResolvedProject, ctx: &Context, opts: &PruneOptions) -> Result<Outcome> {
    let wc = ctx.working_copy(project);
    let branch = opts.branch.as_str();

    if project.git_ref.as_branch() == Some(branch) {
        return Err(Error::Validation {
            message: format!(
                "cannot prune '{}' in {}: it is the project's default branch",
                branch, project.name
            ),
        });
    }

    let mut deleted = Vec::new();

    if opts.prunes_local() && wc.local_branch_exists(branch)? {
        if wc.current_branch()?.as_deref() == Some(branch) {
            info!("{}: {} is checked out, switching to {}", project.name, branch, project.git_ref);
            checkout_default(&wc, project)?;
        }
        wc.delete_local_branch(branch, opts.force)?;
        deleted.push("local");
    }

    if opts.remote && wc.remote_branch_exists(&project.remote, branch)? {
        wc.delete_remote_branch(&project.remote, branch)?;
        deleted.push("remote");
    }

    if deleted.is_empty() {
        debug!("{}: nothing to prune", project.name);
        Ok(Outcome::Unchanged(format!("no branch {}", branch)))
    } else {
        Ok(Outcome::Changed(format!(
            "deleted {} branch {}",
            deleted.join(" and "),
            branch
        )))
    }
}

/// Move off the branch being pruned onto the project's own reference.
fn checkout_default(wc: &WorkingCopy, project: &ResolvedProject) -> Result<()> {
    match &project.git_ref {
        GitRef::Branch(default) => {
            if wc.local_branch_exists(default)? {
                wc.checkout_branch(default)?;
            } else {
                if !wc.remote_tracking_ref_exists(&project.remote, default)? {
                    let depth = existing_fetch_depth(wc, project.depth);
                    wc.fetch(&project.remote, Some(&project.git_ref), depth)?;
                }
                wc.create_tracking_branch(&project.remote, default)?;
            }
        }
        GitRef::Tag(tag) => {
            if wc.rev_parse(&project.git_ref.canonical())?.is_none() {
                wc.fetch(&project.remote, Some(&project.git_ref), 0)?;
            }
            wc.checkout_tag(tag)?;
        }
        GitRef::Commit(sha) => {
            if wc.rev_parse(sha)?.is_none() {
                wc.fetch(&project.remote, Some(&project.git_ref), 0)?;
            }
            wc.checkout_commit(sha)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prunes_local_by_default() {
        let opts = PruneOptions {
            branch: "feature".to_string(),
            ..PruneOptions::default()
        };
        assert!(opts.prunes_local());

        let remote_only = PruneOptions {
            remote: true,
            ..opts.clone()
        };
        assert!(!remote_only.prunes_local());

        let both = PruneOptions {
            local: true,
            remote: true,
            ..opts
        };
        assert!(both.prunes_local());
    }

    #[test]
    fn test_validate_prune_with_nothing_cloned() {
        let temp = tempfile::TempDir::new().unwrap();
        let decl = crate::config::parse("projects:\n  - name: org/cats\n").unwrap();
        let set = crate::manifest::resolve(&decl).unwrap();
        let ctx = Context::new(temp.path(), true);
        let opts = PruneOptions {
            branch: "feature".to_string(),
            ..PruneOptions::default()
        };
        let err = validate_prune(set.as_slice(), &ctx, &opts).unwrap_err();
        assert!(matches!(err, Error::BranchNotFound { branch } if branch == "feature"));
    }
}
