//! # Working Copy
//!
//! A `WorkingCopy` binds one project to its on-disk repository and exposes
//! the primitive operations the sync engine is built from. Every primitive
//! is a `git` subprocess call; exit codes and output are the whole contract.
//!
//! Primitives are narrow and idempotent where git allows it (checking out
//! the branch that is already current does nothing, configuring a remote
//! that already has the right URL does nothing). None of them retry; retry
//! policy, if any, belongs to the caller.
//!
//! Existence of the repository is checked on every call to [`WorkingCopy::exists`]
//! rather than cached, because a herd can move a project from missing to
//! cloned halfway through.

use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, info};

use crate::error::{Error, Result};
use crate::git::{self, GitOutput};
use crate::git_ref::GitRef;

/// Options for [`WorkingCopy::clean`], mirroring `git clean` flags.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CleanFlags {
    /// `-d`: remove untracked directories too
    pub directories: bool,
    /// `-x`: also remove ignored files
    pub ignored: bool,
    /// `-X`: remove only ignored files
    pub only_ignored: bool,
}

/// A binding to one project's on-disk repository.
#[derive(Debug, Clone)]
pub struct WorkingCopy {
    path: PathBuf,
    remote: String,
    git_ref: GitRef,
}

impl WorkingCopy {
    pub fn new(path: impl Into<PathBuf>, remote: impl Into<String>, git_ref: GitRef) -> Self {
        Self {
            path: path.into(),
            remote: remote.into(),
            git_ref,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The primary remote name.
    pub fn remote(&self) -> &str {
        &self.remote
    }

    /// The reference this working copy is meant to be on.
    pub fn git_ref(&self) -> &GitRef {
        &self.git_ref
    }

    /// Whether a git repository currently exists at the path.
    pub fn exists(&self) -> bool {
        self.path.join(".git").exists()
    }

    fn git(&self, args: &[&str]) -> Result<GitOutput> {
        git::run_ok(&self.path, args)
    }

    fn git_check(&self, args: &[&str]) -> Result<bool> {
        git::check(&self.path, args)
    }

    /// Directory to run repository-independent queries (ls-remote by URL) from.
    fn query_dir(&self) -> PathBuf {
        if self.path.is_dir() {
            return self.path.clone();
        }
        self.path
            .ancestors()
            .find(|p| p.is_dir())
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."))
    }

    ////// LIFECYCLE //////

    /// Create the directory (if needed) and an empty repository in it.
    pub fn init(&self) -> Result<()> {
        fs::create_dir_all(&self.path)?;
        self.git(&["init", "--quiet"])?;
        info!("initialized empty repository at {}", self.path.display());
        Ok(())
    }

    /// Undo [`WorkingCopy::init`]: remove the directory if `init` created it,
    /// otherwise only the `.git` directory inside it.
    pub fn discard(&self, created_dir: bool) -> Result<()> {
        if created_dir {
            if self.path.exists() {
                fs::remove_dir_all(&self.path)?;
            }
        } else {
            let git_dir = self.path.join(".git");
            if git_dir.exists() {
                fs::remove_dir_all(git_dir)?;
            }
        }
        info!("removed partial clone at {}", self.path.display());
        Ok(())
    }

    ////// REMOTES //////

    /// All configured remotes as `(name, url)` pairs.
    pub fn remotes(&self) -> Result<Vec<(String, String)>> {
        let output = git::run(
            &self.path,
            &["config", "--get-regexp", r"^remote\..*\.url$"],
        )?;
        // Exit code 1 means no remotes are configured
        if !output.success && output.code != Some(1) {
            return Err(Error::GitCommand {
                command: "config --get-regexp remote urls".to_string(),
                path: self.path.clone(),
                stderr: output.stderr.trim().to_string(),
            });
        }

        Ok(output
            .stdout
            .lines()
            .filter_map(|line| {
                let (key, url) = line.split_once(' ')?;
                let name = key.strip_prefix("remote.")?.strip_suffix(".url")?;
                Some((name.to_string(), url.trim().to_string()))
            })
            .collect())
    }

    pub fn remote_url(&self, name: &str) -> Result<Option<String>> {
        Ok(self
            .remotes()?
            .into_iter()
            .find(|(n, _)| n == name)
            .map(|(_, url)| url))
    }

    /// Add `name` pointing at `url` unless it already exists.
    ///
    /// An existing remote with a different URL is an error; it is never
    /// overwritten.
    pub fn configure_remote(&self, name: &str, url: &str) -> Result<()> {
        match self.remote_url(name)? {
            Some(existing) if existing == url => Ok(()),
            Some(existing) => Err(Error::RemoteUrlMismatch {
                remote: name.to_string(),
                path: self.path.clone(),
                expected: url.to_string(),
                actual: existing,
            }),
            None => {
                self.git(&["remote", "add", name, url])?;
                info!("added remote {} -> {}", name, url);
                Ok(())
            }
        }
    }

    pub fn rename_remote(&self, old: &str, new: &str) -> Result<()> {
        self.git(&["remote", "rename", old, new])?;
        info!("renamed remote {} -> {}", old, new);
        Ok(())
    }

    ////// REMOTE QUERIES //////

    fn ls_remote(&self, remote: &str, kind: &str, refname: &str) -> Result<Vec<(String, String)>> {
        let output = git::run_ok(&self.query_dir(), &["ls-remote", kind, remote, refname])?;
        Ok(git::parse_ls_remote(&output.stdout)
            .into_iter()
            .filter(|(_, name)| name == refname)
            .collect())
    }

    /// Whether `branch` exists on `remote` (a remote name or a URL).
    pub fn remote_branch_exists(&self, remote: &str, branch: &str) -> Result<bool> {
        let refname = format!("refs/heads/{}", branch);
        Ok(!self.ls_remote(remote, "--heads", &refname)?.is_empty())
    }

    /// Whether `tag` exists on `remote` (a remote name or a URL).
    pub fn remote_tag_exists(&self, remote: &str, tag: &str) -> Result<bool> {
        let refname = format!("refs/tags/{}", tag);
        Ok(!self.ls_remote(remote, "--tags", &refname)?.is_empty())
    }

    /// The branch the remote's HEAD points at, if it advertises one.
    pub fn remote_default_branch(&self, remote: &str) -> Result<Option<String>> {
        let output = git::run_ok(&self.query_dir(), &["ls-remote", "--symref", remote, "HEAD"])?;
        Ok(git::parse_symref_head(&output.stdout))
    }

    ////// FETCH //////

    /// Fetch from `remote`, optionally limited to one reference.
    ///
    /// `depth` 0 means full history; on a shallow repository it deepens the
    /// clone to full history. Branches land in `refs/remotes/<remote>/`, tags
    /// in `refs/tags/`. Commits are fetched by id when the server allows it,
    /// otherwise by fetching everything and checking the commit arrived.
    pub fn fetch(&self, remote: &str, git_ref: Option<&GitRef>, depth: u32) -> Result<()> {
        let depth_arg = format!("--depth={}", depth);
        let mut args: Vec<&str> = vec!["fetch", "--quiet", "--prune"];
        if depth > 0 {
            args.push(depth_arg.as_str());
        } else if self.is_shallow() {
            args.push("--unshallow");
        }
        args.push(remote);

        let refspec = match git_ref {
            Some(GitRef::Branch(b)) => Some(format!(
                "+refs/heads/{}:refs/remotes/{}/{}",
                b, remote, b
            )),
            Some(GitRef::Tag(t)) => Some(format!("+refs/tags/{}:refs/tags/{}", t, t)),
            Some(GitRef::Commit(sha)) => Some(sha.clone()),
            None => None,
        };
        if let Some(spec) = refspec.as_deref() {
            args.push(spec);
        }

        match git_ref {
            Some(GitRef::Commit(sha)) => {
                if self.git(&args).is_err() {
                    debug!("fetch by id refused for {}, fetching {} in full", sha, remote);
                    let mut fallback: Vec<&str> = vec!["fetch", "--quiet", "--prune", "--tags"];
                    if self.is_shallow() {
                        fallback.push("--unshallow");
                    }
                    fallback.push(remote);
                    self.git(&fallback)?;
                }
                if self.rev_parse(sha)?.is_none() {
                    return Err(Error::RemoteRefMissing {
                        remote: remote.to_string(),
                        reference: sha.clone(),
                    });
                }
                Ok(())
            }
            _ => {
                self.git(&args)?;
                Ok(())
            }
        }
    }

    /// Fetch `branch` without changing the depth of the repository.
    ///
    /// In a shallow repository the new commits are fetched down to ones the
    /// repository already has, so the remote tip stays connected to the
    /// local history. A depth-limited fetch would instead graft the new tip
    /// as a fresh shallow root.
    pub fn fetch_connected(&self, remote: &str, branch: &str) -> Result<()> {
        let refspec = format!("+refs/heads/{}:refs/remotes/{}/{}", branch, remote, branch);
        self.git(&["fetch", "--quiet", "--prune", remote, &refspec])?;
        Ok(())
    }

    ////// LOCAL QUERIES //////

    pub fn is_shallow(&self) -> bool {
        self.path.join(".git").join("shallow").exists()
    }

    pub fn local_branch_exists(&self, branch: &str) -> Result<bool> {
        let refname = format!("refs/heads/{}", branch);
        self.git_check(&["show-ref", "--verify", "--quiet", &refname])
    }

    /// Whether `refs/remotes/<remote>/<branch>` exists locally.
    pub fn remote_tracking_ref_exists(&self, remote: &str, branch: &str) -> Result<bool> {
        let refname = format!("refs/remotes/{}/{}", remote, branch);
        self.git_check(&["show-ref", "--verify", "--quiet", &refname])
    }

    /// The checked-out branch, or `None` when HEAD is detached.
    pub fn current_branch(&self) -> Result<Option<String>> {
        let output = git::run(&self.path, &["symbolic-ref", "--quiet", "--short", "HEAD"])?;
        if output.success {
            Ok(Some(output.text().to_string()))
        } else {
            Ok(None)
        }
    }

    pub fn is_detached(&self) -> Result<bool> {
        Ok(self.current_branch()?.is_none())
    }

    /// Resolve a revision to a commit sha, or `None` if it does not exist.
    pub fn rev_parse(&self, rev: &str) -> Result<Option<String>> {
        let spec = format!("{}^{{commit}}", rev);
        let output = git::run(&self.path, &["rev-parse", "--verify", "--quiet", &spec])?;
        if output.success && !output.text().is_empty() {
            Ok(Some(output.text().to_string()))
        } else {
            Ok(None)
        }
    }

    pub fn head_sha(&self) -> Result<Option<String>> {
        self.rev_parse("HEAD")
    }

    /// The `(remote, branch)` a local branch tracks, if any.
    pub fn upstream_of(&self, branch: &str) -> Result<Option<(String, String)>> {
        let remote_key = format!("branch.{}.remote", branch);
        let merge_key = format!("branch.{}.merge", branch);
        let remote = git::run(&self.path, &["config", "--get", &remote_key])?;
        let merge = git::run(&self.path, &["config", "--get", &merge_key])?;
        if !remote.success || !merge.success {
            return Ok(None);
        }
        let merge_branch = merge
            .text()
            .strip_prefix("refs/heads/")
            .unwrap_or(merge.text())
            .to_string();
        Ok(Some((remote.text().to_string(), merge_branch)))
    }

    /// Whether tracked files have uncommitted changes.
    pub fn is_dirty(&self) -> Result<bool> {
        let output = self.git(&["status", "--porcelain", "--untracked-files=no"])?;
        Ok(!output.text().is_empty())
    }

    pub fn is_rebase_in_progress(&self) -> bool {
        let git_dir = self.path.join(".git");
        git_dir.join("rebase-merge").exists() || git_dir.join("rebase-apply").exists()
    }

    /// Commits `branch` is ahead of and behind `<remote>/<branch>`.
    pub fn ahead_behind(&self, remote: &str, branch: &str) -> Result<Option<(usize, usize)>> {
        if !self.remote_tracking_ref_exists(remote, branch)? {
            return Ok(None);
        }
        let range = format!("{}...{}/{}", branch, remote, branch);
        let output = self.git(&["rev-list", "--left-right", "--count", &range])?;
        let mut counts = output.text().split_whitespace().map(str::parse::<usize>);
        match (counts.next(), counts.next()) {
            (Some(Ok(ahead)), Some(Ok(behind))) => Ok(Some((ahead, behind))),
            _ => Ok(None),
        }
    }

    /// Committer timestamp of HEAD in strict ISO 8601.
    pub fn head_timestamp(&self) -> Result<String> {
        Ok(self
            .git(&["log", "-1", "--format=%cI", "HEAD"])?
            .text()
            .to_string())
    }

    /// The most recent commit on `rev` at or before `timestamp`, optionally
    /// restricted to one author.
    pub fn commit_at_or_before(
        &self,
        rev: &str,
        timestamp: &str,
        author: Option<&str>,
    ) -> Result<Option<String>> {
        let before = format!("--before={}", timestamp);
        let author_arg = author.map(|a| format!("--author={}", a));
        let mut args = vec!["log", "-1", "--format=%H", before.as_str()];
        if let Some(a) = author_arg.as_deref() {
            args.push(a);
        }
        args.push(rev);
        let output = self.git(&args)?;
        let sha = output.text();
        Ok(if sha.is_empty() {
            None
        } else {
            Some(sha.to_string())
        })
    }

    ////// MUTATIONS //////

    /// Check out an existing local branch. Does nothing if already current.
    pub fn checkout_branch(&self, branch: &str) -> Result<bool> {
        if self.current_branch()?.as_deref() == Some(branch) {
            debug!("already on branch {}", branch);
            return Ok(false);
        }
        self.git(&["checkout", "--quiet", branch])?;
        info!("checked out branch {}", branch);
        Ok(true)
    }

    /// Check out `rev` with a detached HEAD. Does nothing if HEAD is already
    /// detached at the same commit.
    pub fn checkout_detached(&self, rev: &str) -> Result<bool> {
        let target = self.rev_parse(rev)?.ok_or_else(|| Error::GitCommand {
            command: format!("rev-parse {}", rev),
            path: self.path.clone(),
            stderr: format!("unknown revision {}", rev),
        })?;
        if self.is_detached()? && self.head_sha()?.as_deref() == Some(target.as_str()) {
            debug!("already detached at {}", rev);
            return Ok(false);
        }
        self.git(&["checkout", "--quiet", "--detach", &target])?;
        info!("checked out {} (detached)", rev);
        Ok(true)
    }

    pub fn checkout_tag(&self, tag: &str) -> Result<bool> {
        self.checkout_detached(&format!("refs/tags/{}", tag))
    }

    pub fn checkout_commit(&self, sha: &str) -> Result<bool> {
        self.checkout_detached(sha)
    }

    /// Create local `branch` tracking `<remote>/<branch>` and check it out.
    pub fn create_tracking_branch(&self, remote: &str, branch: &str) -> Result<()> {
        let start = format!("{}/{}", remote, branch);
        self.git(&["checkout", "--quiet", "-b", branch, "--track", &start])?;
        info!("created branch {} tracking {}", branch, start);
        Ok(())
    }

    /// Create local `branch` at HEAD and check it out.
    pub fn create_branch(&self, branch: &str) -> Result<()> {
        self.git(&["checkout", "--quiet", "-b", branch])?;
        info!("created branch {}", branch);
        Ok(())
    }

    pub fn set_upstream(&self, remote: &str, branch: &str) -> Result<()> {
        let upstream = format!("--set-upstream-to={}/{}", remote, branch);
        self.git(&["branch", &upstream, branch])?;
        info!("branch {} now tracks {}/{}", branch, remote, branch);
        Ok(())
    }

    /// Merge-pull `<remote> <branch>` into the current branch.
    pub fn pull(&self, remote: &str, branch: &str) -> Result<()> {
        self.git(&["pull", "--quiet", "--no-rebase", "--no-edit", remote, branch])?;
        Ok(())
    }

    /// Rebase the current branch onto `<remote> <branch>` via pull.
    pub fn rebase_onto(&self, remote: &str, branch: &str) -> Result<()> {
        self.git(&["pull", "--quiet", "--rebase", remote, branch])?;
        Ok(())
    }

    pub fn reset_hard(&self, target: &str) -> Result<()> {
        self.git(&["reset", "--quiet", "--hard", target])?;
        info!("reset to {}", target);
        Ok(())
    }

    pub fn clean(&self, flags: CleanFlags) -> Result<()> {
        let mut args = vec!["clean", "--quiet", "-f"];
        if flags.directories {
            args.push("-d");
        }
        if flags.only_ignored {
            args.push("-X");
        } else if flags.ignored {
            args.push("-x");
        }
        self.git(&args)?;
        Ok(())
    }

    pub fn abort_rebase(&self) -> Result<()> {
        if self.is_rebase_in_progress() {
            self.git(&["rebase", "--abort"])?;
            info!("aborted rebase in {}", self.path.display());
        }
        Ok(())
    }

    /// Stash local changes. Returns false when there was nothing to stash.
    pub fn stash(&self) -> Result<bool> {
        if !self.is_dirty()? {
            return Ok(false);
        }
        self.git(&["stash", "--quiet"])?;
        Ok(true)
    }

    /// Initialize and force-update all nested submodules.
    pub fn update_submodules_recursive(&self, depth: u32) -> Result<()> {
        let depth_arg = format!("--depth={}", depth);
        let mut args = vec!["submodule", "update", "--init", "--recursive", "--force"];
        if depth > 0 {
            args.push(depth_arg.as_str());
        }
        self.git(&args)?;
        Ok(())
    }

    /// Run `git clean` inside every submodule as well.
    pub fn clean_submodules(&self, flags: CleanFlags) -> Result<()> {
        let mut clean = String::from("git clean -f");
        if flags.directories {
            clean.push_str(" -d");
        }
        if flags.only_ignored {
            clean.push_str(" -X");
        } else if flags.ignored {
            clean.push_str(" -x");
        }
        self.git(&["submodule", "foreach", "--recursive", &clean])?;
        Ok(())
    }

    pub fn delete_local_branch(&self, branch: &str, force: bool) -> Result<()> {
        let flag = if force { "-D" } else { "-d" };
        self.git(&["branch", "--quiet", flag, branch])?;
        info!("deleted local branch {}", branch);
        Ok(())
    }

    pub fn delete_remote_branch(&self, remote: &str, branch: &str) -> Result<()> {
        self.git(&["push", "--quiet", remote, "--delete", branch])?;
        info!("deleted remote branch {}/{}", remote, branch);
        Ok(())
    }

    pub fn push(&self, remote: &str, branch: &str, set_upstream: bool) -> Result<()> {
        let mut args = vec!["push", "--quiet"];
        if set_upstream {
            args.push("--set-upstream");
        }
        args.push(remote);
        args.push(branch);
        self.git(&args)?;
        Ok(())
    }
}
