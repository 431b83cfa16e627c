//! Shared test utilities for integration and E2E tests.
//!
//! Tests drive the real `git` executable against bare repositories created in
//! a temporary directory and served over `file://`, so nothing touches the
//! network.
//!
//! ## Layout
//!
//! ```text
//! <tmp>/remotes/<name>.git   bare repositories, one per project
//! <tmp>/seeds/<name>         non-bare clones used to push new commits
//! <tmp>/workspace/           manifest and working copies
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! mod common;
//! use common::prelude::*;
//!
//! #[test]
//! fn test_example() {
//!     let fixture = TestFixture::new();
//!     fixture.remote("org/cats");
//!     fixture.write_manifest("projects:\n  - name: org/cats\n    path: cats\n");
//!     // ... test code
//! }
//! ```

#![allow(dead_code)]

use assert_fs::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use herder::engine::{self, Context, HerdOptions, Operation, Outcome};
use herder::manifest::{self, ProjectSet, ResolvedProject};
use herder::working_copy::WorkingCopy;

/// Re-export commonly used test dependencies for convenience.
pub mod prelude {
    pub use assert_cmd::cargo::cargo_bin_cmd;
    #[allow(unused_imports)]
    pub use assert_fs::prelude::*;
    #[allow(unused_imports)]
    pub use predicates::prelude::*;

    #[allow(unused_imports)]
    pub use super::{git, TestFixture};
}

/// Run git in `dir` with a fixed identity, panicking on failure. Returns trimmed stdout.
pub fn git(dir: &Path, args: &[&str]) -> String {
    git_with_env(dir, args, &[])
}

fn git_with_env(dir: &Path, args: &[&str], env: &[(&str, &str)]) -> String {
    let output = Command::new("git")
        .args(["-c", "user.name=Herder Test", "-c", "user.email=test@example.com"])
        .args(["-c", "init.defaultBranch=main", "-c", "advice.detachedHead=false"])
        .args(args)
        .current_dir(dir)
        .envs(env.iter().copied())
        .env("GIT_TERMINAL_PROMPT", "0")
        .output()
        .expect("failed to run git");
    assert!(
        output.status.success(),
        "git {} failed in {}: {}",
        args.join(" "),
        dir.display(),
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8_lossy(&output.stdout).trim().to_string()
}

/// A temporary tree of bare remotes plus a workspace holding the manifest.
pub struct TestFixture {
    temp_dir: assert_fs::TempDir,
}

impl TestFixture {
    /// Create a new fixture with empty `remotes`, `seeds` and `workspace` directories.
    pub fn new() -> Self {
        let temp_dir = assert_fs::TempDir::new().expect("Failed to create temp directory");
        for dir in ["remotes", "seeds", "workspace"] {
            temp_dir.child(dir).create_dir_all().expect("Failed to create dir");
        }
        Self { temp_dir }
    }

    pub fn remotes_dir(&self) -> PathBuf {
        self.temp_dir.path().join("remotes")
    }

    pub fn workspace(&self) -> PathBuf {
        self.temp_dir.path().join("workspace")
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.workspace().join("herder.yaml")
    }

    fn bare_path(&self, name: &str) -> PathBuf {
        self.remotes_dir().join(format!("{}.git", name))
    }

    fn seed_path(&self, name: &str) -> PathBuf {
        self.temp_dir.path().join("seeds").join(name)
    }

    /// `file://` URL of a remote, as the manifest resolves it.
    pub fn url(&self, name: &str) -> String {
        format!("file://{}", self.bare_path(name).display())
    }

    /// Create a bare remote `name` with one commit on `main`.
    pub fn remote(&self, name: &str) -> String {
        let bare = self.bare_path(name);
        fs::create_dir_all(&bare).expect("Failed to create bare dir");
        git(&bare, &["init", "--quiet", "--bare"]);
        git(&bare, &["symbolic-ref", "HEAD", "refs/heads/main"]);

        let seed = self.seed_path(name);
        fs::create_dir_all(&seed).expect("Failed to create seed dir");
        git(&seed, &["init", "--quiet"]);
        git(&seed, &["symbolic-ref", "HEAD", "refs/heads/main"]);
        git(&seed, &["remote", "add", "origin", bare.to_str().unwrap()]);
        self.commit(name, "main", "initial commit")
    }

    /// Create a remote `fork` sharing all of `upstream`'s history.
    pub fn fork(&self, upstream: &str, fork: &str) -> String {
        let bare = self.bare_path(fork);
        fs::create_dir_all(bare.parent().unwrap()).unwrap();
        git(
            self.temp_dir.path(),
            &[
                "clone",
                "--quiet",
                "--bare",
                self.bare_path(upstream).to_str().unwrap(),
                bare.to_str().unwrap(),
            ],
        );
        let seed = self.seed_path(fork);
        fs::create_dir_all(seed.parent().unwrap()).unwrap();
        git(
            self.temp_dir.path(),
            &["clone", "--quiet", bare.to_str().unwrap(), seed.to_str().unwrap()],
        );
        self.head(fork, "main")
    }

    /// Push a new commit on `branch` of remote `name`; returns its sha.
    pub fn commit(&self, name: &str, branch: &str, message: &str) -> String {
        self.commit_at(name, branch, message, None)
    }

    /// Like `commit`, with fixed author and committer dates.
    pub fn commit_at(&self, name: &str, branch: &str, message: &str, date: Option<&str>) -> String {
        let seed = self.seed_path(name);
        let current = git(&seed, &["symbolic-ref", "--short", "HEAD"]);
        if current != branch {
            let exists = Command::new("git")
                .args(["rev-parse", "--verify", "--quiet", &format!("refs/heads/{}", branch)])
                .current_dir(&seed)
                .output()
                .map(|o| o.status.success())
                .unwrap_or(false);
            if exists {
                git(&seed, &["checkout", "--quiet", branch]);
            } else {
                git(&seed, &["checkout", "--quiet", "-b", branch]);
            }
        }
        let env: Vec<(&str, &str)> = match date {
            Some(d) => vec![("GIT_AUTHOR_DATE", d), ("GIT_COMMITTER_DATE", d)],
            None => Vec::new(),
        };
        git_with_env(
            &seed,
            &["commit", "--quiet", "--allow-empty", "-m", message],
            &env,
        );
        git(&seed, &["push", "--quiet", "--force", "origin", branch]);
        git(&seed, &["rev-parse", "HEAD"])
    }

    /// Tag the tip of `main` on remote `name`; returns the tagged sha.
    pub fn tag(&self, name: &str, tag: &str) -> String {
        let seed = self.seed_path(name);
        git(&seed, &["tag", tag, "main"]);
        git(&seed, &["push", "--quiet", "origin", tag]);
        git(&seed, &["rev-parse", "main"])
    }

    /// Current tip of `branch` on remote `name`.
    pub fn head(&self, name: &str, branch: &str) -> String {
        git(&self.bare_path(name), &["rev-parse", &format!("refs/heads/{}", branch)])
    }

    /// Whether `branch` exists on remote `name`.
    pub fn has_branch(&self, name: &str, branch: &str) -> bool {
        Command::new("git")
            .args(["show-ref", "--verify", "--quiet", &format!("refs/heads/{}", branch)])
            .current_dir(self.bare_path(name))
            .status()
            .map(|s| s.success())
            .unwrap_or(false)
    }

    /// Write `herder.yaml`, prefixed with a `local` file source as the default.
    pub fn write_manifest(&self, body: &str) -> PathBuf {
        let content = format!(
            "sources:\n  - name: local\n    host: {}\n    protocol: file\ndefaults:\n  source: local\n{}",
            self.remotes_dir().display(),
            body
        );
        self.temp_dir
            .child("workspace/herder.yaml")
            .write_str(&content)
            .expect("Failed to write manifest");
        self.manifest_path()
    }

    pub fn load(&self) -> ProjectSet {
        manifest::load(self.manifest_path()).expect("manifest should load")
    }

    pub fn project(&self, name: &str) -> ResolvedProject {
        self.load().get(name).cloned().expect("project not in manifest")
    }

    pub fn ctx(&self) -> Context {
        Context::new(self.workspace(), true)
    }

    pub fn working_copy(&self, name: &str) -> WorkingCopy {
        self.ctx().working_copy(&self.project(name))
    }

    /// Run an operation on one project of the manifest.
    pub fn execute(&self, op: &Operation, name: &str) -> herder::Result<Outcome> {
        engine::execute(op, &self.project(name), &self.ctx())
    }

    pub fn herd(&self, name: &str) -> herder::Result<Outcome> {
        self.execute(&Operation::Herd(HerdOptions::default()), name)
    }

    /// Run git inside the working copy of `name`.
    pub fn git_in(&self, name: &str, args: &[&str]) -> String {
        git(&self.working_copy(name).path().to_path_buf(), args)
    }
}

impl Default for TestFixture {
    fn default() -> Self {
        Self::new()
    }
}
