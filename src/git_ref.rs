//! # Git References
//!
//! A `GitRef` classifies a target revision as a branch, a tag, or a commit.
//! The enum makes "exactly one kind" a type-level fact: there is no way to
//! build a value that is both a branch and a tag.
//!
//! Every reference has two renderings:
//!
//! - `canonical()`: the fully-qualified form git understands unambiguously
//!   (`refs/heads/main`, `refs/tags/v1.0`, or a raw 40-hex sha).
//! - `short()`: the human-facing name (`main`, `v1.0`, or the sha).
//!
//! `GitRef::from_canonical` inverts `canonical()`, so
//! `from_canonical(r.canonical()).short() == r.short()` for every valid `r`.

use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

const HEADS_PREFIX: &str = "refs/heads/";
const TAGS_PREFIX: &str = "refs/tags/";

fn sha_regex() -> &'static Regex {
    static SHA: OnceLock<Regex> = OnceLock::new();
    SHA.get_or_init(|| Regex::new(r"^[0-9a-f]{40}$").expect("static regex is valid"))
}

/// A target revision: a branch, a tag, or a commit.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", try_from = "UncheckedRef")]
pub enum GitRef {
    /// A branch name, without the `refs/heads/` prefix.
    Branch(String),
    /// A tag name, without the `refs/tags/` prefix.
    Tag(String),
    /// A full 40-character hexadecimal commit id.
    Commit(String),
}

impl GitRef {
    /// Builds a branch reference, validating the name.
    pub fn branch(name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        validate_name(&name)?;
        Ok(GitRef::Branch(name))
    }

    /// Builds a tag reference, validating the name.
    pub fn tag(name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        validate_name(&name)?;
        Ok(GitRef::Tag(name))
    }

    /// Builds a commit reference. The sha must be 40 lowercase hex digits.
    pub fn commit(sha: impl Into<String>) -> Result<Self> {
        let sha = sha.into().to_ascii_lowercase();
        if !sha_regex().is_match(&sha) {
            return Err(Error::InvalidReference {
                value: sha,
                message: "commit must be a full 40-character hexadecimal sha".to_string(),
            });
        }
        Ok(GitRef::Commit(sha))
    }

    /// Parses a canonical reference string.
    ///
    /// `refs/heads/x` is a branch, `refs/tags/x` a tag, and a 40-hex string a
    /// commit. Anything else is rejected; use [`GitRef::branch`] for bare names.
    pub fn from_canonical(value: &str) -> Result<Self> {
        if let Some(name) = value.strip_prefix(HEADS_PREFIX) {
            GitRef::branch(name)
        } else if let Some(name) = value.strip_prefix(TAGS_PREFIX) {
            GitRef::tag(name)
        } else if sha_regex().is_match(&value.to_ascii_lowercase()) {
            GitRef::commit(value)
        } else {
            Err(Error::InvalidReference {
                value: value.to_string(),
                message: "expected refs/heads/<branch>, refs/tags/<tag> or a 40-character sha"
                    .to_string(),
            })
        }
    }

    /// The fully-qualified form of this reference.
    pub fn canonical(&self) -> String {
        match self {
            GitRef::Branch(name) => format!("{}{}", HEADS_PREFIX, name),
            GitRef::Tag(name) => format!("{}{}", TAGS_PREFIX, name),
            GitRef::Commit(sha) => sha.clone(),
        }
    }

    /// The short display form of this reference.
    pub fn short(&self) -> &str {
        match self {
            GitRef::Branch(name) | GitRef::Tag(name) | GitRef::Commit(name) => name,
        }
    }

    /// The branch name, if this is a branch.
    pub fn as_branch(&self) -> Option<&str> {
        match self {
            GitRef::Branch(name) => Some(name),
            _ => None,
        }
    }

    pub fn is_branch(&self) -> bool {
        matches!(self, GitRef::Branch(_))
    }

    /// The kind of reference as a lowercase word, for messages.
    pub fn kind(&self) -> &'static str {
        match self {
            GitRef::Branch(_) => "branch",
            GitRef::Tag(_) => "tag",
            GitRef::Commit(_) => "commit",
        }
    }
}

impl fmt::Display for GitRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GitRef::Commit(sha) => write!(f, "{}", &sha[..7.min(sha.len())]),
            other => write!(f, "{}", other.short()),
        }
    }
}

/// Wire shape of a `GitRef` before its name is validated.
#[derive(Deserialize)]
#[serde(rename_all = "lowercase")]
enum UncheckedRef {
    Branch(String),
    Tag(String),
    Commit(String),
}

impl TryFrom<UncheckedRef> for GitRef {
    type Error = Error;

    fn try_from(value: UncheckedRef) -> Result<Self> {
        match value {
            UncheckedRef::Branch(name) => GitRef::branch(name),
            UncheckedRef::Tag(name) => GitRef::tag(name),
            UncheckedRef::Commit(sha) => GitRef::commit(sha),
        }
    }
}

impl FromStr for GitRef {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        GitRef::from_canonical(s)
    }
}

/// Checks a branch or tag name against the subset of git's ref-format rules
/// that matter for manifests.
fn validate_name(name: &str) -> Result<()> {
    let problem = if name.is_empty() {
        Some("name must not be empty")
    } else if name.starts_with('-') {
        Some("name must not start with '-'")
    } else if name.contains("..") {
        Some("name must not contain '..'")
    } else if name.chars().any(|c| c.is_whitespace() || c.is_control()) {
        Some("name must not contain whitespace")
    } else if name.starts_with(HEADS_PREFIX) || name.starts_with(TAGS_PREFIX) {
        Some("name must not carry a refs/ prefix")
    } else if name.ends_with('/') || name.ends_with(".lock") {
        Some("name must not end with '/' or '.lock'")
    } else {
        None
    };

    match problem {
        Some(message) => Err(Error::InvalidReference {
            value: name.to_string(),
            message: message.to_string(),
        }),
        None => Ok(()),
    }
}
