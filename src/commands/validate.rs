//! # Validate Command Implementation
//!
//! This module implements the `validate` subcommand, which checks the manifest
//! without touching any repository.
//!
//! ## Functionality
//!
//! - **Schema Validation**: Parses the manifest, rejecting unknown keys and
//!   malformed references.
//! - **Resolution**: Merges defaults, groups, projects and upstreams, checking
//!   sources, depths and path uniqueness.
//! - **Warnings**: Flags settings that are accepted but have no effect, such
//!   as a clone depth on a forked project.
//!
//! With `--json`, the resolved projects are printed as JSON instead.

use std::collections::BTreeSet;

use anyhow::Result;
use clap::Args;

use herder::config;
use herder::manifest::{self, ResolvedProject};
use herder::output::{emoji, OutputConfig};

use super::GlobalOpts;

/// Validate the manifest and list the resolved projects
#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// Print the resolved projects as JSON
    #[arg(long)]
    pub json: bool,

    /// Use strict validation (fail on warnings).
    #[arg(long)]
    pub strict: bool,
}

/// Settings that resolve fine but will not do what they suggest.
fn warnings(project: &ResolvedProject) -> Vec<String> {
    let mut found = Vec::new();
    if project.upstream.is_some() && project.depth > 0 {
        found.push(format!(
            "{}: depth {} is ignored because the project has an upstream",
            project.name, project.depth
        ));
    }
    if project.timestamp_author.is_some() && project.git_ref.as_branch().is_none() {
        found.push(format!(
            "{}: timestamp_author only applies to branch references",
            project.name
        ));
    }
    found
}

/// Execute the `validate` command.
pub fn execute(args: ValidateArgs, global: &GlobalOpts) -> Result<()> {
    let out = OutputConfig::for_flag(&global.color);
    let manifest_path = &global.manifest;

    let decl = match config::from_file(manifest_path) {
        Ok(decl) => decl,
        Err(e) => {
            if !args.json {
                println!(
                    "{} Manifest parsing failed: {}",
                    emoji(&out, "❌", "[ERR]"),
                    e
                );
            }
            return Err(anyhow::anyhow!("Manifest parsing failed: {}", e));
        }
    };

    let projects = match manifest::resolve(&decl) {
        Ok(projects) => projects,
        Err(e) => {
            if !args.json {
                println!("{} Manifest is invalid: {}", emoji(&out, "❌", "[ERR]"), e);
            }
            return Err(anyhow::anyhow!("Manifest validation failed: {}", e));
        }
    };

    let found: Vec<String> = projects.iter().flat_map(warnings).collect();

    if args.json {
        println!("{}", serde_json::to_string_pretty(&projects)?);
    } else {
        println!(
            "{} Validating manifest: {}",
            emoji(&out, "🔍", "[SCAN]"),
            manifest_path.display()
        );
        println!("{} Manifest resolved successfully", emoji(&out, "✅", "[OK]"));

        let groups: BTreeSet<&str> = decl.groups.iter().map(|g| g.name.as_str()).collect();
        let forks = projects.iter().filter(|p| p.upstream.is_some()).count();
        println!("\n{} Manifest Summary:", emoji(&out, "📊", "[INFO]"));
        println!("   Projects: {}", projects.len());
        println!("   Groups: {}", groups.len());
        println!("   Forks: {}", forks);

        println!();
        for project in projects.iter() {
            let upstream = project
                .upstream
                .as_ref()
                .map(|u| format!(" <- {} ({})", u.name, u.remote))
                .unwrap_or_default();
            println!(
                "   {}  {} @ {} [{}]{}",
                project.path.display(),
                project.url,
                project.git_ref,
                project.remote,
                upstream
            );
        }

        for warning in &found {
            println!("{} {}", emoji(&out, "⚠️", "[WARN]"), warning);
        }
    }

    if args.strict && !found.is_empty() {
        return Err(anyhow::anyhow!(
            "Validation failed with {} warning(s) in strict mode",
            found.len()
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolve(yaml: &str) -> Vec<ResolvedProject> {
        let decl = config::parse(yaml).unwrap();
        manifest::resolve(&decl).unwrap().as_slice().to_vec()
    }

    #[test]
    fn test_warns_about_depth_on_fork() {
        let projects = resolve(
            "projects:\n  - name: me/cats\n    depth: 1\n    upstream:\n      name: org/cats\n",
        );
        let found = warnings(&projects[0]);
        assert_eq!(found.len(), 1);
        assert!(found[0].contains("depth 1 is ignored"));
    }

    #[test]
    fn test_no_warnings_for_plain_project() {
        let projects = resolve("projects:\n  - name: org/cats\n    depth: 1\n");
        assert!(warnings(&projects[0]).is_empty());
    }
}
