use std::path::Path;
use std::process::{Command, Output, Stdio};

use log::debug;

use crate::error::{Error, Result};

/// Captured result of one git invocation.
#[derive(Debug, Clone)]
pub struct GitOutput {
    pub success: bool,
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl GitOutput {
    fn from_output(output: Output) -> Self {
        Self {
            success: output.status.success(),
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        }
    }

    /// Trimmed stdout.
    pub fn text(&self) -> &str {
        self.stdout.trim()
    }
}

/// Run `git <args>` in `dir` and capture its output.
///
/// Only a failure to start the process is an error here; a non-zero exit is
/// reported through `GitOutput::success`. This uses the system git command,
/// which picks up SSH keys, credential helpers and `~/.gitconfig` on its own.
pub fn run(dir: &Path, args: &[&str]) -> Result<GitOutput> {
    debug!("git {} (in {})", args.join(" "), dir.display());

    let output = Command::new("git")
        .args(args)
        .current_dir(dir)
        .env("GIT_TERMINAL_PROMPT", "0")
        .env("LC_ALL", "C")
        .stdin(Stdio::null())
        .output()
        .map_err(|e| Error::GitCommand {
            command: args.join(" "),
            path: dir.to_path_buf(),
            stderr: format!("failed to start git: {}", e),
        })?;

    Ok(GitOutput::from_output(output))
}

/// Run `git <args>` and fail with `Error::GitCommand` on a non-zero exit.
pub fn run_ok(dir: &Path, args: &[&str]) -> Result<GitOutput> {
    let output = run(dir, args)?;
    if !output.success {
        return Err(Error::GitCommand {
            command: args.join(" "),
            path: dir.to_path_buf(),
            stderr: explain_failure(&output.stderr),
        });
    }
    Ok(output)
}

/// Run `git <args>` and report only whether it exited zero.
pub fn check(dir: &Path, args: &[&str]) -> Result<bool> {
    Ok(run(dir, args)?.success)
}

/// Adds a hint to common authentication failures; otherwise returns stderr as is.
fn explain_failure(stderr: &str) -> String {
    let stderr = stderr.trim();
    const AUTH_MARKERS: [&str; 3] = [
        "Authentication failed",
        "Permission denied",
        "Could not read from remote repository",
    ];
    if AUTH_MARKERS.iter().any(|marker| stderr.contains(marker)) {
        format!(
            "{}\nhint: the remote refused access; check the ssh-agent key or \
             the stored credentials for this host",
            stderr
        )
    } else {
        stderr.to_string()
    }
}

/// Parse `git ls-remote` output into `(sha, refname)` pairs.
///
/// Git ls-remote output format: `<sha>\t<ref>`; `--symref` adds
/// `ref: <target>\t<ref>` lines, which are skipped here.
pub fn parse_ls_remote(stdout: &str) -> Vec<(String, String)> {
    stdout
        .lines()
        .filter(|line| !line.starts_with("ref:"))
        .filter_map(|line| {
            let mut parts = line.split('\t');
            match (parts.next(), parts.next()) {
                (Some(sha), Some(name)) if !sha.is_empty() => {
                    Some((sha.trim().to_string(), name.trim().to_string()))
                }
                _ => None,
            }
        })
        .collect()
}

/// Extract the branch HEAD points at from `git ls-remote --symref <remote> HEAD`.
pub fn parse_symref_head(stdout: &str) -> Option<String> {
    stdout.lines().find_map(|line| {
        let rest = line.strip_prefix("ref: ")?;
        let (target, name) = rest.split_once('\t')?;
        if name.trim() == "HEAD" {
            target.strip_prefix("refs/heads/").map(str::to_string)
        } else {
            None
        }
    })
}
