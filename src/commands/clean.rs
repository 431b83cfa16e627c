//! # Clean Command Implementation
//!
//! `herder clean` runs `git clean` in each selected project, resets tracked
//! files to HEAD and aborts any rebase left in progress.

use anyhow::Result;
use clap::Args;

use herder::engine::{CleanOptions, Operation};
use herder::scheduler::Scheduler;
use herder::working_copy::CleanFlags;

use super::{run_operation, GlobalOpts, SelectArgs};

/// Remove untracked files and reset tracked ones
#[derive(Args, Debug)]
pub struct CleanArgs {
    #[command(flatten)]
    pub select: SelectArgs,

    /// Remove untracked directories as well as files
    #[arg(short = 'd')]
    pub directories: bool,

    /// Also remove files ignored by .gitignore
    #[arg(short = 'x', conflicts_with = "only_ignored")]
    pub ignored: bool,

    /// Remove only files ignored by .gitignore
    #[arg(short = 'X')]
    pub only_ignored: bool,

    /// Clean submodules too
    #[arg(short, long)]
    pub recursive: bool,
}

/// Execute the `clean` command.
pub fn execute(args: CleanArgs, global: &GlobalOpts) -> Result<()> {
    let op = Operation::Clean(CleanOptions {
        flags: CleanFlags {
            directories: args.directories,
            ignored: args.ignored,
            only_ignored: args.only_ignored,
        },
        recursive: args.recursive,
    });
    run_operation(global, &args.select, op, Scheduler::sequential())
}
