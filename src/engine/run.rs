//! Run: execute a shell command inside every cloned project.

use std::process::{Command, Stdio};

use log::debug;

use crate::error::{Error, Result};
use crate::manifest::ResolvedProject;

use super::{Context, Outcome};

#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub command: String,
}

/// Environment exported to the command, describing the project it runs in.
pub fn project_env(project: &ResolvedProject, ctx: &Context) -> Vec<(&'static str, String)> {
    let mut env = vec![
        ("HERDER_PROJECT_NAME", project.name.clone()),
        (
            "HERDER_PROJECT_PATH",
            ctx.root.join(&project.path).display().to_string(),
        ),
        ("HERDER_PROJECT_REMOTE", project.remote.clone()),
        ("HERDER_PROJECT_REF", project.git_ref.canonical()),
    ];
    if let Some(upstream) = &project.upstream {
        env.push(("HERDER_UPSTREAM_REMOTE", upstream.remote.clone()));
        env.push(("HERDER_UPSTREAM_REF", upstream.git_ref.canonical()));
    }
    env
}

pub fn run(project: &ResolvedProject, ctx: &Context, opts: &RunOptions) -> Result<Outcome> {
    let dir = ctx.root.join(&project.path);
    debug!("running '{}' in {}", opts.command, dir.display());

    let mut command = shell(&opts.command);
    command
        .current_dir(&dir)
        .envs(project_env(project, ctx))
        .stdin(Stdio::null());

    let output = command.output()?;
    if !output.status.success() {
        return Err(Error::CommandFailed {
            command: opts.command.clone(),
            path: dir,
            code: output.status.code(),
        });
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    let text = stdout.trim_end();
    Ok(Outcome::Changed(if text.is_empty() {
        format!("ran '{}'", opts.command)
    } else {
        text.to_string()
    }))
}

#[cfg(windows)]
fn shell(command: &str) -> Command {
    let mut cmd = Command::new("cmd");
    cmd.args(["/C", command]);
    cmd
}

#[cfg(not(windows))]
fn shell(command: &str) -> Command {
    let mut cmd = Command::new("sh");
    cmd.args(["-c", command]);
    cmd
}
