//! Clean and stash: discard or set aside local changes.

use crate::error::Result;
use crate::manifest::ResolvedProject;
use crate::working_copy::CleanFlags;

use super::{Context, Outcome};

#[derive(Debug, Clone, Default)]
pub struct CleanOptions {
    pub flags: CleanFlags,
    /// Clean submodules as well.
    pub recursive: bool,
}

/// Remove untracked files, reset tracked ones and abort any rebase.
pub fn clean(project: &ResolvedProject, ctx: &Context, opts: &CleanOptions) -> Result<Outcome> {
    let wc = ctx.working_copy(project);
    wc.abort_rebase()?;
    wc.clean(opts.flags)?;
    wc.reset_hard("HEAD")?;
    if opts.recursive || project.recursive {
        wc.clean_submodules(opts.flags)?;
    }
    Ok(Outcome::Changed("cleaned".to_string()))
}

pub fn stash(project: &ResolvedProject, ctx: &Context) -> Result<Outcome> {
    let wc = ctx.working_copy(project);
    if wc.stash()? {
        Ok(Outcome::Changed("stashed local changes".to_string()))
    } else {
        Ok(Outcome::Unchanged("nothing to stash".to_string()))
    }
}
