//! # Manifest Schema and Parsing
//!
//! This module defines the data structures that mirror the `herder.yaml`
//! manifest file and the logic for parsing it. These declarations are the raw,
//! unmerged view of the file: every override field is optional. The
//! `manifest` module turns them into resolved projects.
//!
//! ## Shape
//!
//! ```yaml
//! defaults:
//!   branch: main
//!   remote: origin
//!   source: github
//!   protocol: ssh
//! sources:
//!   - name: corp
//!     host: git.example.com
//!     protocol: https
//! projects:
//!   - name: org/cats
//!     path: cats
//!     depth: 1
//!     upstream:
//!       name: upstream-org/cats
//! ```
//!
//! Instead of `projects`, a manifest may list `groups`, each with its own
//! overrides and a nested `projects` list. Giving both is an error.
//!
//! A reference may be written as `branch`, `tag`, `commit`, or a canonical
//! `ref`; at most one of them per level.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::git_ref::GitRef;
use crate::source::Protocol;

/// Top-level manifest declaration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ManifestDecl {
    /// Optional display name of the workspace.
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub defaults: DefaultsDecl,
    #[serde(default)]
    pub sources: Vec<SourceDecl>,
    #[serde(default)]
    pub projects: Vec<ProjectDecl>,
    #[serde(default)]
    pub groups: Vec<GroupDecl>,
}

/// Fallback values applied wherever a group or project omits a field.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DefaultsDecl {
    #[serde(default)]
    pub branch: Option<String>,
    #[serde(default)]
    pub tag: Option<String>,
    #[serde(default)]
    pub commit: Option<String>,
    #[serde(default, rename = "ref")]
    pub r#ref: Option<String>,
    #[serde(default)]
    pub remote: Option<String>,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub protocol: Option<Protocol>,
    #[serde(default)]
    pub depth: Option<i64>,
    #[serde(default)]
    pub recursive: Option<bool>,
    #[serde(default)]
    pub timestamp_author: Option<String>,
}

/// A declared git hosting location.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SourceDecl {
    pub name: String,
    /// Host name, or a directory for the `file` protocol.
    #[serde(alias = "url")]
    pub host: String,
    /// Falls back to `defaults.protocol` when omitted.
    #[serde(default)]
    pub protocol: Option<Protocol>,
}

/// A named group of projects sharing overrides.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GroupDecl {
    pub name: String,
    #[serde(default)]
    pub branch: Option<String>,
    #[serde(default)]
    pub tag: Option<String>,
    #[serde(default)]
    pub commit: Option<String>,
    #[serde(default, rename = "ref")]
    pub r#ref: Option<String>,
    #[serde(default)]
    pub remote: Option<String>,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub depth: Option<i64>,
    #[serde(default)]
    pub recursive: Option<bool>,
    #[serde(default)]
    pub timestamp_author: Option<String>,
    pub projects: Vec<ProjectDecl>,
}

/// A single project declaration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProjectDecl {
    /// Repository name on its source, e.g. `org/repo`.
    pub name: String,
    /// Checkout path relative to the workspace root. Defaults to `name`.
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub branch: Option<String>,
    #[serde(default)]
    pub tag: Option<String>,
    #[serde(default)]
    pub commit: Option<String>,
    #[serde(default, rename = "ref")]
    pub r#ref: Option<String>,
    #[serde(default)]
    pub remote: Option<String>,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub depth: Option<i64>,
    #[serde(default)]
    pub recursive: Option<bool>,
    #[serde(default)]
    pub timestamp_author: Option<String>,
    /// Extra group names this project can be selected by.
    #[serde(default)]
    pub groups: Vec<String>,
    #[serde(default, alias = "fork")]
    pub upstream: Option<UpstreamDecl>,
}

/// The repository a project was forked from.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpstreamDecl {
    pub name: String,
    #[serde(default)]
    pub remote: Option<String>,
    #[serde(default)]
    pub branch: Option<String>,
    #[serde(default)]
    pub tag: Option<String>,
    #[serde(default)]
    pub commit: Option<String>,
    #[serde(default, rename = "ref")]
    pub r#ref: Option<String>,
    #[serde(default)]
    pub source: Option<String>,
}

/// Turns the four mutually exclusive reference fields of one declaration
/// level into at most one `GitRef`.
pub fn reference_from_fields(
    owner: &str,
    branch: Option<&str>,
    tag: Option<&str>,
    commit: Option<&str>,
    canonical: Option<&str>,
) -> Result<Option<GitRef>> {
    let given: Vec<&str> = [
        branch.map(|_| "branch"),
        tag.map(|_| "tag"),
        commit.map(|_| "commit"),
        canonical.map(|_| "ref"),
    ]
    .into_iter()
    .flatten()
    .collect();

    if given.len() > 1 {
        return Err(Error::InvalidReference {
            value: owner.to_string(),
            message: format!(
                "only one of branch, tag, commit or ref may be set (found {})",
                given.join(", ")
            ),
        });
    }

    let reference = if let Some(b) = branch {
        Some(GitRef::branch(b)?)
    } else if let Some(t) = tag {
        Some(GitRef::tag(t)?)
    } else if let Some(c) = commit {
        Some(GitRef::commit(c)?)
    } else if let Some(r) = canonical {
        Some(GitRef::from_canonical(r)?)
    } else {
        None
    };

    Ok(reference)
}

/// Parses a YAML string into a `ManifestDecl`.
///
/// Structural problems (unknown keys, wrong types, both `projects` and
/// `groups`, no projects at all) are rejected here; cross-references between
/// sections are checked by `manifest::resolve`.
pub fn parse(yaml_content: &str) -> Result<ManifestDecl> {
    if yaml_content.trim().is_empty() {
        return Err(Error::ManifestParse {
            message: "manifest is empty".to_string(),
            hint: Some("Declare at least one project under 'projects:'".to_string()),
        });
    }

    let decl: ManifestDecl = serde_yaml::from_str(yaml_content).map_err(|e| {
        let hint = if e.to_string().contains("unknown field") {
            Some(
                "Project keys are name, path, branch, tag, commit, ref, remote, source, \
                 depth, recursive, timestamp_author, groups and upstream"
                    .to_string(),
            )
        } else {
            None
        };
        Error::ManifestParse {
            message: e.to_string(),
            hint,
        }
    })?;

    if !decl.projects.is_empty() && !decl.groups.is_empty() {
        return Err(Error::ManifestParse {
            message: "manifest declares both 'projects' and 'groups'".to_string(),
            hint: Some(
                "Use a flat 'projects' list, or move every project into a group".to_string(),
            ),
        });
    }

    if decl.projects.is_empty() && decl.groups.iter().all(|g| g.projects.is_empty()) {
        return Err(Error::ManifestParse {
            message: "manifest declares no projects".to_string(),
            hint: Some("Declare at least one project under 'projects:'".to_string()),
        });
    }

    Ok(decl)
}

/// Parse a manifest from a YAML file path
pub fn from_file<P: AsRef<Path>>(path: P) -> Result<ManifestDecl> {
    let content = std::fs::read_to_string(path).map_err(Error::Io)?;
    parse(&content)
}
