//! # Error Handling
//!
//! This module defines the centralized error type for `herder`. It uses the
//! `thiserror` library to build a single `Error` enum covering every failure
//! the library can report, with enough context in each variant to explain the
//! problem without a backtrace.
//!
//! ## Error families
//!
//! - **Validation** (`ManifestParse`, `Validation`, `DuplicatePath`,
//!   `UnknownSource`, `InvalidReference`): the manifest is malformed or
//!   ambiguous. These are raised while resolving the manifest, before any
//!   project is touched.
//! - **Divergence** (`Divergence`): a local branch and its remote counterpart
//!   point at different commits where a tracking relationship was expected.
//!   Never resolved automatically.
//! - **Subprocess** (`GitCommand`, `CommandFailed`): the external `git`
//!   executable (or a user command) exited unsuccessfully. The engine does not
//!   retry these.
//! - **Partial clone** (`RemoteBranchMissing`, `RemoteRefMissing`): the
//!   requested revision does not exist on the remote. When raised during a
//!   fresh clone the half-initialized directory has already been removed.
//!
//! The `Result` alias is used across the library so that `?` propagates these
//! errors up to the scheduler, which records them per project.

use std::path::PathBuf;

use thiserror::Error;

/// Main error type for herder operations
#[derive(Error, Debug)]
pub enum Error {
    /// The manifest file could not be parsed.
    #[error("Manifest parsing error: {message}{}", hint.as_ref().map(|h| format!("\n  hint: {}", h)).unwrap_or_default())]
    ManifestParse {
        message: String,
        /// Optional hint for how to fix the manifest
        hint: Option<String>,
    },

    /// The manifest parsed but describes an inconsistent project set.
    #[error("Manifest validation error: {message}")]
    Validation { message: String },

    /// Two projects resolve to the same on-disk path.
    #[error("Duplicate project path '{path}' used by '{first}' and '{second}'")]
    DuplicatePath {
        path: String,
        first: String,
        second: String,
    },

    /// A project, group, default or upstream names a source that is not declared.
    #[error("Unknown source '{source_name}' referenced by {referenced_by}")]
    UnknownSource {
        source_name: String,
        referenced_by: String,
    },

    /// A branch, tag or commit value is malformed or more than one was given.
    #[error("Invalid reference '{value}': {message}")]
    InvalidReference { value: String, message: String },

    /// A git subprocess exited unsuccessfully or could not be started.
    #[error("Git command failed in {}: git {command} - {stderr}", path.display())]
    GitCommand {
        command: String,
        path: PathBuf,
        stderr: String,
    },

    /// A user command run through `herder run` exited unsuccessfully.
    #[error("Command '{command}' failed in {} with {}", path.display(), code.map(|c| format!("exit code {}", c)).unwrap_or_else(|| "a signal".to_string()))]
    CommandFailed {
        command: String,
        path: PathBuf,
        code: Option<i32>,
    },

    /// Local and remote branch tips differ where tracking was expected.
    #[error("Branch '{branch}' in {project} has diverged from {remote}/{branch} (local {local}, remote {remote_sha})\n  hint: reconcile the branches manually, then herd again")]
    Divergence {
        project: String,
        branch: String,
        remote: String,
        local: String,
        remote_sha: String,
    },

    /// The requested branch does not exist on the remote.
    #[error("Remote branch '{branch}' does not exist on {remote}")]
    RemoteBranchMissing { remote: String, branch: String },

    /// The requested tag or commit does not exist on the remote.
    #[error("Remote reference '{reference}' does not exist on {remote}")]
    RemoteRefMissing { remote: String, reference: String },

    /// A remote exists under the expected name but points somewhere else.
    #[error("Remote '{remote}' in {} points to {actual}, expected {expected}\n  hint: fix or remove the remote before herding", path.display())]
    RemoteUrlMismatch {
        remote: String,
        path: PathBuf,
        expected: String,
        actual: String,
    },

    /// The branch to prune exists in none of the selected projects.
    #[error("Branch '{branch}' not found in any selected project")]
    BranchNotFound { branch: String },

    /// No commit on the target revision is at or before the timestamp.
    #[error("No commit on {reference} at or before {timestamp} in {project}")]
    NoCommitBeforeTimestamp {
        project: String,
        reference: String,
        timestamp: String,
    },

    /// The project has no working copy on disk.
    #[error("Project '{project}' is not cloned at {}", path.display())]
    NotCloned { project: String, path: PathBuf },

    /// A networked operation was requested while offline.
    #[error("No network connection available")]
    Offline,

    /// An I/O error, wrapped from `std::io::Error`.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A YAML parsing error, wrapped from `serde_yaml::Error`.
    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// The operation panicked on a worker thread.
    #[error("Operation panicked on '{project}': {message}")]
    WorkerPanic { project: String, message: String },

    /// An error indicating that a mutex or other lock has been poisoned.
    #[error("Lock poisoned: {context}")]
    LockPoisoned { context: String },
}

impl Error {
    /// Returns true for errors raised while loading the manifest.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Error::ManifestParse { .. }
                | Error::Validation { .. }
                | Error::DuplicatePath { .. }
                | Error::UnknownSource { .. }
                | Error::InvalidReference { .. }
                | Error::Yaml(_)
        )
    }
}

/// A convenient type alias for `Result<T, Error>`.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_manifest_parse() {
        let error = Error::ManifestParse {
            message: "Invalid YAML".to_string(),
            hint: None,
        };
        let display = format!("{}", error);
        assert!(display.contains("Manifest parsing error"));
        assert!(display.contains("Invalid YAML"));
        assert!(!display.contains("hint:"));
    }

    #[test]
    fn test_error_display_manifest_parse_with_hint() {
        let error = Error::ManifestParse {
            message: "projects and groups both given".to_string(),
            hint: Some("Use either 'projects' or 'groups'".to_string()),
        };
        let display = format!("{}", error);
        assert!(display.contains("hint:"));
        assert!(display.contains("either 'projects'"));
    }

    #[test]
    fn test_error_display_duplicate_path() {
        let error = Error::DuplicatePath {
            path: "libs/cats".to_string(),
            first: "org/cats".to_string(),
            second: "fork/cats".to_string(),
        };
        let display = format!("{}", error);
        assert!(display.contains("libs/cats"));
        assert!(display.contains("org/cats"));
        assert!(display.contains("fork/cats"));
    }

    #[test]
    fn test_error_display_git_command() {
        let error = Error::GitCommand {
            command: "fetch origin".to_string(),
            path: PathBuf::from("/work/cats"),
            stderr: "Could not read from remote repository".to_string(),
        };
        let display = format!("{}", error);
        assert!(display.contains("git fetch origin"));
        assert!(display.contains("/work/cats"));
        assert!(display.contains("Could not read"));
    }

    #[test]
    fn test_error_display_divergence() {
        let error = Error::Divergence {
            project: "cats".to_string(),
            branch: "main".to_string(),
            remote: "origin".to_string(),
            local: "abc1234".to_string(),
            remote_sha: "def5678".to_string(),
        };
        let display = format!("{}", error);
        assert!(display.contains("diverged from origin/main"));
        assert!(display.contains("abc1234"));
        assert!(display.contains("def5678"));
    }

    #[test]
    fn test_error_display_command_failed_signal() {
        let error = Error::CommandFailed {
            command: "make".to_string(),
            path: PathBuf::from("cats"),
            code: None,
        };
        assert!(error.to_string().contains("a signal"));

        let error = Error::CommandFailed {
            command: "make".to_string(),
            path: PathBuf::from("cats"),
            code: Some(2),
        };
        assert!(error.to_string().contains("exit code 2"));
    }

    #[test]
    fn test_error_from_io_error() {
        let io_error = std::io::Error::new(std::io::ErrorKind::NotFound, "File not found");
        let error: Error = io_error.into();
        let display = format!("{}", error);
        assert!(display.contains("I/O error"));
        assert!(display.contains("File not found"));
    }

    #[test]
    fn test_error_from_yaml_error() {
        let yaml_error = serde_yaml::from_str::<serde_yaml::Value>("invalid: [unclosed").unwrap_err();
        let error: Error = yaml_error.into();
        assert!(error.to_string().contains("YAML parsing error"));
        assert!(error.is_validation());
    }

    #[test]
    fn test_worker_panic_display() {
        let error = Error::WorkerPanic {
            project: "org/cats".to_string(),
            message: "index out of bounds".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "Operation panicked on 'org/cats': index out of bounds"
        );
        assert!(!error.is_validation());
    }

    #[test]
    fn test_is_validation() {
        assert!(Error::Validation {
            message: "x".to_string()
        }
        .is_validation());
        assert!(!Error::Offline.is_validation());
        assert!(!Error::RemoteBranchMissing {
            remote: "origin".to_string(),
            branch: "main".to_string()
        }
        .is_validation());
    }
}
