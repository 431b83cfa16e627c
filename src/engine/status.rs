//! Status: a one-line description of each project's working copy.

use std::fmt;

use rayon::prelude::*;
use serde::Serialize;

use crate::error::Result;
use crate::git_ref::GitRef;
use crate::manifest::ResolvedProject;

use super::{Context, Outcome};

/// Snapshot of one working copy, as shown by `herder status`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ProjectStatus {
    pub cloned: bool,
    /// Checked-out branch; `None` when detached or not cloned.
    pub branch: Option<String>,
    /// `remote/branch` the current branch tracks.
    pub tracking: Option<String>,
    /// Short form of the detached HEAD (tag name or abbreviated sha).
    pub detached_at: Option<String>,
    pub dirty: bool,
    pub ahead: usize,
    pub behind: usize,
}

impl fmt::Display for ProjectStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.cloned {
            return write!(f, "not cloned");
        }
        match (&self.branch, &self.detached_at) {
            (Some(branch), _) => {
                write!(f, "{}", branch)?;
                if let Some(tracking) = &self.tracking {
                    write!(f, " -> {}", tracking)?;
                }
                if self.ahead > 0 || self.behind > 0 {
                    write!(f, " [ahead {}, behind {}]", self.ahead, self.behind)?;
                }
            }
            (None, Some(at)) => write!(f, "detached at {}", at)?,
            (None, None) => write!(f, "detached")?,
        }
        if self.dirty {
            write!(f, " (dirty)")?;
        }
        Ok(())
    }
}

/// Inspect a project's working copy without modifying it.
pub fn describe(project: &ResolvedProject, ctx: &Context) -> Result<ProjectStatus> {
    let wc = ctx.working_copy(project);
    if !wc.exists() {
        return Ok(ProjectStatus::default());
    }

    let mut status = ProjectStatus {
        cloned: true,
        dirty: wc.is_dirty()?,
        ..ProjectStatus::default()
    };

    match wc.current_branch()? {
        Some(branch) => {
            if let Some((remote, merge)) = wc.upstream_of(&branch)? {
                if let Some((ahead, behind)) = wc.ahead_behind(&remote, &merge)? {
                    status.ahead = ahead;
                    status.behind = behind;
                }
                status.tracking = Some(format!("{}/{}", remote, merge));
            }
            status.branch = Some(branch);
        }
        None => {
            let head = wc.head_sha()?;
            let on_tag = matches!(project.git_ref, GitRef::Tag(_))
                && head.is_some()
                && wc.rev_parse(&project.git_ref.canonical())? == head;
            status.detached_at = if on_tag {
                Some(project.git_ref.short().to_string())
            } else {
                head.map(|sha| sha.chars().take(7).collect())
            };
        }
    }

    Ok(status)
}

/// Status of every project, gathered in parallel and returned in input order.
pub fn preflight(projects: &[ResolvedProject], ctx: &Context) -> Vec<(String, String)> {
    projects
        .par_iter()
        .map(|project| {
            let text = match describe(project, ctx) {
                Ok(status) => status.to_string(),
                Err(e) => format!("unreadable: {}", e),
            };
            (project.name.clone(), text)
        })
        .collect()
}

pub fn status(project: &ResolvedProject, ctx: &Context) -> Result<Outcome> {
    let status = describe(project, ctx)?;
    if status.cloned {
        Ok(Outcome::Unchanged(status.to_string()))
    } else {
        Ok(Outcome::Skipped(status.to_string()))
    }
}
