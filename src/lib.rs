//! # Herder Library
//!
//! This library keeps a fleet of independently versioned git repositories
//! ("projects") in sync with a declarative manifest. It is designed to be
//! used by the `herder` command-line tool but can also be embedded in other
//! tools that need to clone, update, reset or branch many repositories at once.
//!
//! ## Quick Example
//!
//! ```
//! use herder::{config, manifest};
//! use herder::git_ref::GitRef;
//!
//! let yaml = r#"
//! defaults:
//!   branch: develop
//! projects:
//!   - name: org/cats
//!     path: pets/cats
//!   - name: org/dogs
//!     tag: v1.2.0
//! "#;
//!
//! let decl = config::parse(yaml).unwrap();
//! let projects = manifest::resolve(&decl).unwrap();
//! assert_eq!(projects.len(), 2);
//!
//! let cats = projects.get("pets/cats").unwrap();
//! assert_eq!(cats.git_ref, GitRef::Branch("develop".to_string()));
//! assert_eq!(cats.url, "git@github.com:org/cats.git");
//! ```
//!
//! ## Core Concepts
//!
//! - **References (`git_ref`)**: a target revision, classified as branch,
//!   tag or commit.
//! - **Manifest (`config`, `source`, `manifest`)**: the YAML schema, the
//!   hosting sources, and the resolver that merges defaults, groups, projects
//!   and upstreams into one validated `ResolvedProject` per project.
//! - **Working copies (`git`, `working_copy`)**: primitive operations on one
//!   on-disk repository, each a `git` subprocess call.
//! - **Engine (`engine`)**: the per-project state machines for herd, reset,
//!   prune, start, sync and the smaller maintenance operations.
//! - **Scheduler (`scheduler`)**: runs one operation over many projects,
//!   sequentially or on a bounded worker pool, and aggregates the results.
//!
//! ## Execution Flow
//!
//! 1.  **Load**: parse and resolve the manifest into a `ProjectSet`.
//! 2.  **Select**: pick projects by group, name, path or glob.
//! 3.  **Pre-flight**: check connectivity for networked operations.
//! 4.  **Schedule**: run the operation on every selected project.
//! 5.  **Report**: summarize successes, skips and failures.

pub mod config;
pub mod engine;
pub mod error;
pub mod git;
pub mod git_ref;
pub mod manifest;
pub mod network;
pub mod output;
pub mod scheduler;
pub mod source;
pub mod working_copy;

#[cfg(test)]
mod git_ref_proptest;

pub use error::{Error, Result};
