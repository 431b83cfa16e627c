//! # Manifest Resolution
//!
//! This module merges the raw declarations from `config` into one immutable
//! `ResolvedProject` per project. Values are layered in a fixed order, each
//! level overriding the previous one:
//!
//! 1. built-in fallbacks (`main`, `origin`, `github`, `ssh`, depth 0)
//! 2. `defaults`
//! 3. the enclosing group, if the manifest uses `groups`
//! 4. the project itself
//! 5. the project's `upstream` block, for the upstream's own fields
//!
//! Validation happens here as well: unknown sources, malformed references,
//! negative depths, upstream remotes clashing with the primary remote, and
//! duplicate checkout paths are all rejected before any project is touched.
//!
//! The result is a `ProjectSet`, which can only be built through validation,
//! so holding one means every path in it is unique.

use std::collections::{BTreeSet, HashMap};
use std::path::{Component, Path, PathBuf};

use serde::Serialize;

use crate::config::{self, DefaultsDecl, GroupDecl, ManifestDecl, ProjectDecl, UpstreamDecl};
use crate::error::{Error, Result};
use crate::git_ref::GitRef;
use crate::source::{builtin_sources, Protocol, Source};

const DEFAULT_BRANCH: &str = "main";
const DEFAULT_REMOTE: &str = "origin";
const DEFAULT_SOURCE: &str = "github";
const DEFAULT_UPSTREAM_REMOTE: &str = "upstream";

/// The resolved view of a project's upstream (the repository it was forked from).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedUpstream {
    pub name: String,
    pub remote: String,
    pub git_ref: GitRef,
    pub source: Source,
    pub url: String,
}

/// Everything the sync engine needs to know about one project.
///
/// Built once per invocation and never mutated; commands change the on-disk
/// repository, not this record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedProject {
    pub name: String,
    /// Checkout path relative to the workspace root.
    pub path: PathBuf,
    pub git_ref: GitRef,
    pub remote: String,
    pub source: Source,
    pub url: String,
    /// Clone depth; 0 means full history.
    pub depth: u32,
    pub recursive: bool,
    pub timestamp_author: Option<String>,
    /// Names this project can be selected by, including `all`.
    pub groups: Vec<String>,
    pub upstream: Option<ResolvedUpstream>,
}

impl ResolvedProject {
    /// The depth to use for the primary sync.
    ///
    /// Forked projects always use full history so that fork and upstream
    /// objects can be related later; otherwise an explicit override wins
    /// over the manifest value.
    pub fn effective_depth(&self, requested: Option<u32>) -> u32 {
        if self.upstream.is_some() {
            0
        } else {
            requested.unwrap_or(self.depth)
        }
    }

    /// Whether this project is picked by a command-line selector.
    ///
    /// A selector matches a group name exactly, or is treated as a glob over
    /// the project name and path when it contains glob metacharacters.
    pub fn matches(&self, selector: &str) -> bool {
        if self.groups.iter().any(|g| g == selector) {
            return true;
        }
        if !selector.contains(['*', '?', '[']) {
            return false;
        }
        match glob::Pattern::new(selector) {
            Ok(pattern) => {
                pattern.matches(&self.name) || pattern.matches(&self.path.to_string_lossy())
            }
            Err(_) => false,
        }
    }
}

/// A validated collection of resolved projects with pairwise-unique paths.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ProjectSet {
    projects: Vec<ResolvedProject>,
}

impl ProjectSet {
    /// Builds a set, rejecting duplicate checkout paths.
    pub fn new(projects: Vec<ResolvedProject>) -> Result<Self> {
        let mut seen: HashMap<String, &str> = HashMap::new();
        for project in &projects {
            let key = normalize_path(&project.path);
            if let Some(first) = seen.insert(key.clone(), &project.name) {
                return Err(Error::DuplicatePath {
                    path: key,
                    first: first.to_string(),
                    second: project.name.clone(),
                });
            }
        }
        Ok(Self { projects })
    }

    pub fn len(&self) -> usize {
        self.projects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.projects.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ResolvedProject> {
        self.projects.iter()
    }

    pub fn as_slice(&self) -> &[ResolvedProject] {
        &self.projects
    }

    /// Finds a project by name or path.
    pub fn get(&self, name_or_path: &str) -> Option<&ResolvedProject> {
        self.projects.iter().find(|p| {
            p.name == name_or_path || normalize_path(&p.path) == normalize_path(Path::new(name_or_path))
        })
    }

    /// Picks the projects matching any selector, in manifest order.
    ///
    /// No selectors means every project. A selector that matches nothing is
    /// an error, so typos do not silently shrink the run.
    pub fn select(&self, selectors: &[String]) -> Result<Vec<ResolvedProject>> {
        if selectors.is_empty() {
            return Ok(self.projects.clone());
        }

        for selector in selectors {
            if !self.projects.iter().any(|p| p.matches(selector)) {
                return Err(Error::Validation {
                    message: format!("no project or group matches '{}'", selector),
                });
            }
        }

        Ok(self
            .projects
            .iter()
            .filter(|p| selectors.iter().any(|s| p.matches(s)))
            .cloned()
            .collect())
    }
}

/// Loads and resolves a manifest file.
pub fn load<P: AsRef<Path>>(path: P) -> Result<ProjectSet> {
    let decl = config::from_file(path)?;
    resolve(&decl)
}

/// Values inherited down the defaults → group → project chain.
#[derive(Debug, Clone)]
struct Layer {
    git_ref: GitRef,
    remote: String,
    source: String,
    depth: u32,
    recursive: bool,
    timestamp_author: Option<String>,
}

impl Layer {
    fn from_defaults(defaults: &DefaultsDecl) -> Result<Self> {
        let git_ref = config::reference_from_fields(
            "defaults",
            defaults.branch.as_deref(),
            defaults.tag.as_deref(),
            defaults.commit.as_deref(),
            defaults.r#ref.as_deref(),
        )?;
        Ok(Self {
            git_ref: match git_ref {
                Some(r) => r,
                None => GitRef::branch(DEFAULT_BRANCH)?,
            },
            remote: defaults
                .remote
                .clone()
                .unwrap_or_else(|| DEFAULT_REMOTE.to_string()),
            source: defaults
                .source
                .clone()
                .unwrap_or_else(|| DEFAULT_SOURCE.to_string()),
            depth: validate_depth("defaults", defaults.depth)?.unwrap_or(0),
            recursive: defaults.recursive.unwrap_or(false),
            timestamp_author: defaults.timestamp_author.clone(),
        })
    }

    #[allow(clippy::too_many_arguments)]
    fn overlay(
        &self,
        owner: &str,
        refs: [Option<&str>; 4],
        remote: Option<&String>,
        source: Option<&String>,
        depth: Option<i64>,
        recursive: Option<bool>,
        timestamp_author: Option<&String>,
    ) -> Result<Self> {
        let [branch, tag, commit, canonical] = refs;
        let git_ref = config::reference_from_fields(owner, branch, tag, commit, canonical)?;
        Ok(Self {
            git_ref: git_ref.unwrap_or_else(|| self.git_ref.clone()),
            remote: remote.cloned().unwrap_or_else(|| self.remote.clone()),
            source: source.cloned().unwrap_or_else(|| self.source.clone()),
            depth: validate_depth(owner, depth)?.unwrap_or(self.depth),
            recursive: recursive.unwrap_or(self.recursive),
            timestamp_author: timestamp_author
                .cloned()
                .or_else(|| self.timestamp_author.clone()),
        })
    }

    fn with_group(&self, group: &GroupDecl) -> Result<Self> {
        self.overlay(
            &format!("group '{}'", group.name),
            [
                group.branch.as_deref(),
                group.tag.as_deref(),
                group.commit.as_deref(),
                group.r#ref.as_deref(),
            ],
            group.remote.as_ref(),
            group.source.as_ref(),
            group.depth,
            group.recursive,
            group.timestamp_author.as_ref(),
        )
    }

    fn with_project(&self, project: &ProjectDecl) -> Result<Self> {
        self.overlay(
            &format!("project '{}'", project.name),
            [
                project.branch.as_deref(),
                project.tag.as_deref(),
                project.commit.as_deref(),
                project.r#ref.as_deref(),
            ],
            project.remote.as_ref(),
            project.source.as_ref(),
            project.depth,
            project.recursive,
            project.timestamp_author.as_ref(),
        )
    }
}

/// Resolves a parsed manifest into a validated `ProjectSet`.
pub fn resolve(decl: &ManifestDecl) -> Result<ProjectSet> {
    let protocol = decl.defaults.protocol.unwrap_or_default();
    let sources = collect_sources(decl, protocol)?;
    let defaults = Layer::from_defaults(&decl.defaults)?;
    lookup_source(&sources, &defaults.source, "defaults")?;

    let mut projects = Vec::new();
    for project in &decl.projects {
        let layer = defaults.with_project(project)?;
        projects.push(resolve_project(project, &layer, None, &sources)?);
    }
    for group in &decl.groups {
        if group.name.trim().is_empty() {
            return Err(Error::Validation {
                message: "group name must not be empty".to_string(),
            });
        }
        let group_layer = defaults.with_group(group)?;
        lookup_source(&sources, &group_layer.source, &format!("group '{}'", group.name))?;
        for project in &group.projects {
            let layer = group_layer.with_project(project)?;
            projects.push(resolve_project(project, &layer, Some(&group.name), &sources)?);
        }
    }

    ProjectSet::new(projects)
}

fn collect_sources(decl: &ManifestDecl, protocol: Protocol) -> Result<HashMap<String, Source>> {
    let mut sources: HashMap<String, Source> = builtin_sources(protocol)
        .into_iter()
        .map(|s| (s.name.clone(), s))
        .collect();

    let mut declared = BTreeSet::new();
    for source in &decl.sources {
        if source.name.trim().is_empty() || source.host.trim().is_empty() {
            return Err(Error::Validation {
                message: "sources need a non-empty name and host".to_string(),
            });
        }
        if !declared.insert(source.name.clone()) {
            return Err(Error::Validation {
                message: format!("source '{}' is declared more than once", source.name),
            });
        }
        sources.insert(
            source.name.clone(),
            Source::new(
                source.name.clone(),
                source.host.clone(),
                source.protocol.unwrap_or(protocol),
            ),
        );
    }

    Ok(sources)
}

fn lookup_source<'a>(
    sources: &'a HashMap<String, Source>,
    name: &str,
    referenced_by: &str,
) -> Result<&'a Source> {
    sources.get(name).ok_or_else(|| Error::UnknownSource {
        source_name: name.to_string(),
        referenced_by: referenced_by.to_string(),
    })
}

fn resolve_project(
    project: &ProjectDecl,
    layer: &Layer,
    group: Option<&str>,
    sources: &HashMap<String, Source>,
) -> Result<ResolvedProject> {
    if project.name.trim().is_empty() {
        return Err(Error::Validation {
            message: "project name must not be empty".to_string(),
        });
    }
    let owner = format!("project '{}'", project.name);

    let path = PathBuf::from(project.path.as_deref().unwrap_or(&project.name));
    validate_project_path(&owner, &path)?;

    let source = lookup_source(sources, &layer.source, &owner)?.clone();
    let url = source.clone_url(&project.name)?;

    let upstream = project
        .upstream
        .as_ref()
        .map(|u| resolve_upstream(u, project, layer, sources))
        .transpose()?;

    let mut groups = vec!["all".to_string(), project.name.clone()];
    groups.push(normalize_path(&path));
    groups.extend(group.map(str::to_string));
    groups.extend(project.groups.iter().cloned());
    let mut seen = BTreeSet::new();
    groups.retain(|g| seen.insert(g.clone()));

    Ok(ResolvedProject {
        name: project.name.clone(),
        path,
        git_ref: layer.git_ref.clone(),
        remote: layer.remote.clone(),
        source,
        url,
        depth: layer.depth,
        recursive: layer.recursive,
        timestamp_author: layer.timestamp_author.clone(),
        groups,
        upstream,
    })
}

fn resolve_upstream(
    upstream: &UpstreamDecl,
    project: &ProjectDecl,
    layer: &Layer,
    sources: &HashMap<String, Source>,
) -> Result<ResolvedUpstream> {
    let owner = format!("upstream of project '{}'", project.name);
    if upstream.name.trim().is_empty() {
        return Err(Error::Validation {
            message: format!("{} needs a name", owner),
        });
    }

    let remote = upstream
        .remote
        .clone()
        .unwrap_or_else(|| DEFAULT_UPSTREAM_REMOTE.to_string());
    if remote == layer.remote {
        return Err(Error::Validation {
            message: format!(
                "{} uses remote '{}', which is already the project's primary remote",
                owner, remote
            ),
        });
    }

    let git_ref = config::reference_from_fields(
        &owner,
        upstream.branch.as_deref(),
        upstream.tag.as_deref(),
        upstream.commit.as_deref(),
        upstream.r#ref.as_deref(),
    )?
    .unwrap_or_else(|| layer.git_ref.clone());

    let source_name = upstream.source.as_deref().unwrap_or(&layer.source);
    let source = lookup_source(sources, source_name, &owner)?.clone();
    let url = source.clone_url(&upstream.name)?;

    Ok(ResolvedUpstream {
        name: upstream.name.clone(),
        remote,
        git_ref,
        source,
        url,
    })
}

fn validate_depth(owner: &str, depth: Option<i64>) -> Result<Option<u32>> {
    match depth {
        None => Ok(None),
        Some(d) => u32::try_from(d).map(Some).map_err(|_| Error::Validation {
            message: format!("{} has invalid depth {} (must be 0 or greater)", owner, d),
        }),
    }
}

fn validate_project_path(owner: &str, path: &Path) -> Result<()> {
    let problem = if path.as_os_str().is_empty() {
        Some("path must not be empty")
    } else if path.is_absolute() || path.has_root() {
        Some("path must be relative to the workspace")
    } else if path.components().any(|c| matches!(c, Component::ParentDir)) {
        Some("path must not contain '..'")
    } else if normalize_path(path).is_empty() {
        Some("path must name a directory below the workspace root")
    } else {
        None
    };

    match problem {
        Some(message) => Err(Error::Validation {
            message: format!("{} has invalid path '{}': {}", owner, path.display(), message),
        }),
        None => Ok(()),
    }
}

/// Canonical string form of a relative path, used for uniqueness checks.
fn normalize_path(path: &Path) -> String {
    path.components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}
