//! # Sync Engine
//!
//! The engine decides, for one project at a time, which sequence of
//! working-copy primitives brings the on-disk repository into agreement with
//! the project's declared reference.
//!
//! Every command is a variant of the closed [`Operation`] enum and maps to a
//! plain function with the shape `(project, context, options) -> Result<Outcome>`.
//! [`execute`] composes those functions with the two cross-cutting steps that
//! apply to many of them:
//!
//! 1. **Precondition**: operations that only make sense on an existing
//!    working copy skip missing projects instead of failing.
//! 2. **Recursion**: herd, reset and sync are followed by a submodule pass for
//!    projects flagged `recursive`.
//!
//! The engine never prints. Each call returns an [`Outcome`] describing what
//! happened, and the scheduler decides how to show it.

pub mod clean;
pub mod herd;
pub mod prune;
pub mod reset;
pub mod run;
pub mod start;
pub mod status;
pub mod sync;

use std::path::PathBuf;

use log::info;

use crate::error::Result;
use crate::manifest::ResolvedProject;
use crate::working_copy::WorkingCopy;

pub use clean::CleanOptions;
pub use herd::HerdOptions;
pub use prune::PruneOptions;
pub use reset::ResetOptions;
pub use run::RunOptions;
pub use start::StartOptions;
pub use sync::SyncOptions;

/// Per-invocation state shared by every project operation.
///
/// Built once by the caller and passed by reference; there is no global
/// registry of projects or sources.
#[derive(Debug, Clone)]
pub struct Context {
    /// Workspace root; project paths are relative to it.
    pub root: PathBuf,
    /// Result of the pre-flight connectivity check.
    pub online: bool,
}

impl Context {
    pub fn new(root: impl Into<PathBuf>, online: bool) -> Self {
        Self {
            root: root.into(),
            online,
        }
    }

    /// A fresh binding to the project's repository.
    pub fn working_copy(&self, project: &ResolvedProject) -> WorkingCopy {
        WorkingCopy::new(
            self.root.join(&project.path),
            project.remote.clone(),
            project.git_ref.clone(),
        )
    }
}

/// What an operation did to one project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The repository was modified.
    Changed(String),
    /// The repository already matched; nothing was modified.
    Unchanged(String),
    /// The operation does not apply to this project.
    Skipped(String),
}

impl Outcome {
    pub fn message(&self) -> &str {
        match self {
            Outcome::Changed(m) | Outcome::Unchanged(m) | Outcome::Skipped(m) => m,
        }
    }

    pub fn is_changed(&self) -> bool {
        matches!(self, Outcome::Changed(_))
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self, Outcome::Skipped(_))
    }

    /// Same kind of outcome with extra text appended.
    pub fn with_note(self, note: &str) -> Self {
        match self {
            Outcome::Changed(m) => Outcome::Changed(format!("{}; {}", m, note)),
            Outcome::Unchanged(m) => Outcome::Unchanged(format!("{}; {}", m, note)),
            Outcome::Skipped(m) => Outcome::Skipped(format!("{}; {}", m, note)),
        }
    }
}

/// Every per-project operation the scheduler can run.
#[derive(Debug, Clone)]
pub enum Operation {
    Herd(HerdOptions),
    Reset(ResetOptions),
    Prune(PruneOptions),
    Start(StartOptions),
    Sync(SyncOptions),
    Status,
    Run(RunOptions),
    Clean(CleanOptions),
    Stash,
}

impl Operation {
    pub fn name(&self) -> &'static str {
        match self {
            Operation::Herd(_) => "herd",
            Operation::Reset(_) => "reset",
            Operation::Prune(_) => "prune",
            Operation::Start(_) => "start",
            Operation::Sync(_) => "sync",
            Operation::Status => "status",
            Operation::Run(_) => "run",
            Operation::Clean(_) => "clean",
            Operation::Stash => "stash",
        }
    }

    /// Operations that skip projects without a working copy.
    pub fn requires_existing(&self) -> bool {
        !matches!(self, Operation::Herd(_) | Operation::Status)
    }

    /// Operations followed by the submodule pass for recursive projects.
    pub fn runs_recursion(&self) -> bool {
        matches!(
            self,
            Operation::Herd(_) | Operation::Reset(_) | Operation::Sync(_)
        )
    }

    /// Operations that cannot do anything useful without the network.
    pub fn needs_network(&self) -> bool {
        match self {
            Operation::Herd(_) | Operation::Reset(_) | Operation::Sync(_) => true,
            Operation::Prune(opts) => opts.remote,
            _ => false,
        }
    }

    fn submodule_depth(&self, project: &ResolvedProject) -> u32 {
        match self {
            Operation::Herd(opts) => opts.depth.unwrap_or(project.depth),
            Operation::Reset(opts) => opts.depth.unwrap_or(project.depth),
            _ => project.depth,
        }
    }
}

/// Run one operation against one project: precondition, operation, recursion.
pub fn execute(op: &Operation, project: &ResolvedProject, ctx: &Context) -> Result<Outcome> {
    if op.requires_existing() && !ctx.working_copy(project).exists() {
        return Ok(Outcome::Skipped(format!(
            "not cloned at {}",
            project.path.display()
        )));
    }

    let outcome = match op {
        Operation::Herd(opts) => herd::herd(project, ctx, opts)?,
        Operation::Reset(opts) => reset::reset(project, ctx, opts)?,
        Operation::Prune(opts) => prune::prune(project, ctx, opts)?,
        Operation::Start(opts) => start::start(project, ctx, opts)?,
        Operation::Sync(opts) => sync::sync(project, ctx, opts)?,
        Operation::Status => status::status(project, ctx)?,
        Operation::Run(opts) => run::run(project, ctx, opts)?,
        Operation::Clean(opts) => clean::clean(project, ctx, opts)?,
        Operation::Stash => clean::stash(project, ctx)?,
    };

    if op.runs_recursion() && project.recursive && !outcome.is_skipped() {
        update_submodules(project, ctx, op.submodule_depth(project))?;
    }

    Ok(outcome)
}

/// The recursion pass: initialize and force-update nested repositories.
fn update_submodules(project: &ResolvedProject, ctx: &Context, depth: u32) -> Result<()> {
    let wc = ctx.working_copy(project);
    if !wc.exists() {
        return Ok(());
    }
    info!("{}: updating submodules", project.name);
    wc.update_submodules_recursive(depth)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest;
    use tempfile::TempDir;

    fn project() -> ResolvedProject {
        let decl = crate::config::parse("projects:\n  - name: org/cats\n    path: cats\n").unwrap();
        manifest::resolve(&decl).unwrap().as_slice()[0].clone()
    }

    #[test]
    fn test_operation_traits() {
        assert!(!Operation::Herd(HerdOptions::default()).requires_existing());
        assert!(!Operation::Status.requires_existing());
        assert!(Operation::Stash.requires_existing());
        assert!(Operation::Reset(ResetOptions::default()).runs_recursion());
        assert!(!Operation::Stash.runs_recursion());
        assert!(Operation::Herd(HerdOptions::default()).needs_network());
        assert!(!Operation::Status.needs_network());
        assert_eq!(Operation::Stash.name(), "stash");
    }

    #[test]
    fn test_missing_project_is_skipped_by_precondition() {
        let temp = TempDir::new().unwrap();
        let ctx = Context::new(temp.path(), false);
        let outcome = execute(&Operation::Stash, &project(), &ctx).unwrap();
        assert!(outcome.is_skipped());
        assert!(outcome.message().contains("not cloned"));
    }

    #[test]
    fn test_outcome_with_note() {
        let outcome = Outcome::Changed("cloned".to_string()).with_note("fallback used");
        assert_eq!(outcome.message(), "cloned; fallback used");
        assert!(outcome.is_changed());
    }

    #[test]
    fn test_working_copy_binding() {
        let ctx = Context::new("/work", true);
        let wc = ctx.working_copy(&project());
        assert_eq!(wc.path(), std::path::Path::new("/work/cats"));
        assert_eq!(wc.remote(), "origin");
    }
}
