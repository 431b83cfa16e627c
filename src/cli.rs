//! CLI argument parsing and command dispatch

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

use crate::commands::{self, GlobalOpts};

/// Herder - Keep a fleet of git repositories in sync with a manifest
#[derive(Parser, Debug)]
#[command(name = "herder")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    command: Commands,

    /// Path to the manifest file; projects are placed relative to its directory
    #[arg(
        short,
        long,
        global = true,
        value_name = "FILE",
        env = "HERDER_MANIFEST",
        default_value = "herder.yaml"
    )]
    manifest: PathBuf,

    /// Colorize output (always, never, auto)
    #[arg(long, global = true, value_name = "WHEN", default_value = "auto")]
    color: String,

    /// Set log level (error, warn, info, debug, trace)
    #[arg(long, global = true, value_name = "LEVEL", default_value = "warn")]
    log_level: String,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Clone missing projects and update existing ones
    Herd(commands::herd::HerdArgs),

    /// Reset projects to their manifest reference, discarding local changes
    Reset(commands::reset::ResetArgs),

    /// Delete a branch locally and/or on the remote
    Prune(commands::prune::PruneArgs),

    /// Create or switch to a topic branch
    Start(commands::start::StartArgs),

    /// Update forks from their upstream and push the result
    Sync(commands::sync::SyncArgs),

    /// Show the state of each project's working copy
    Status(commands::status::StatusArgs),

    /// Run a shell command in every cloned project
    #[command(visible_alias = "forall")]
    Run(commands::run::RunArgs),

    /// Remove untracked files and reset tracked ones
    Clean(commands::clean::CleanArgs),

    /// Stash local changes in dirty projects
    Stash(commands::stash::StashArgs),

    /// Validate the manifest and list the resolved projects
    Validate(commands::validate::ValidateArgs),

    /// Generate shell completion scripts
    Completions(commands::completions::CompletionsArgs),
}

impl Cli {
    /// Execute the CLI command
    pub fn execute(self) -> Result<()> {
        init_logging(&self.log_level);
        let global = GlobalOpts {
            manifest: self.manifest,
            color: self.color,
        };

        match self.command {
            Commands::Herd(args) => commands::herd::execute(args, &global),
            Commands::Reset(args) => commands::reset::execute(args, &global),
            Commands::Prune(args) => commands::prune::execute(args, &global),
            Commands::Start(args) => commands::start::execute(args, &global),
            Commands::Sync(args) => commands::sync::execute(args, &global),
            Commands::Status(args) => commands::status::execute(args, &global),
            Commands::Run(args) => commands::run::execute(args, &global),
            Commands::Clean(args) => commands::clean::execute(args, &global),
            Commands::Stash(args) => commands::stash::execute(args, &global),
            Commands::Validate(args) => commands::validate::execute(args, &global),
            Commands::Completions(args) => commands::completions::execute(args),
        }
    }
}

/// Logging goes to stderr; `RUST_LOG` wins over `--log-level` when set.
fn init_logging(level: &str) {
    let env = env_logger::Env::default().default_filter_or(level);
    let _ = env_logger::Builder::from_env(env)
        .format_timestamp(None)
        .format_target(false)
        .try_init();
}
