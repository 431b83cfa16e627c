//! Manifest parsing tests using datatest-stable for test data discovery
//!
//! Every YAML file under `tests/testdata/manifests` must parse and resolve.
//! Every YAML file under `tests/testdata/invalid_manifests` must be rejected,
//! either by the schema or by resolution.

use herder::{config, manifest};
use std::path::Path;

/// A valid manifest resolves into at least one project with a clone URL.
fn test_valid_manifest(path: &Path) -> datatest_stable::Result<()> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| format!("Failed to read test file {}: {}", path.display(), e))?;

    let decl = config::parse(&content)
        .map_err(|e| format!("Failed to parse manifest {}: {}", path.display(), e))?;
    let projects = manifest::resolve(&decl)
        .map_err(|e| format!("Failed to resolve manifest {}: {}", path.display(), e))?;

    assert!(
        !projects.is_empty(),
        "Manifest {} should contain at least one project",
        path.display()
    );
    for project in projects.iter() {
        assert!(
            !project.url.is_empty(),
            "Project {} in {} has an empty URL",
            project.name,
            path.display()
        );
        assert!(
            project.groups.iter().any(|g| g == "all"),
            "Project {} in {} is missing the implicit 'all' group",
            project.name,
            path.display()
        );
    }

    Ok(())
}

/// An invalid manifest fails with a message, never a panic.
fn test_invalid_manifest(path: &Path) -> datatest_stable::Result<()> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| format!("Failed to read test file {}: {}", path.display(), e))?;

    let result = config::parse(&content).and_then(|decl| manifest::resolve(&decl));
    match result {
        Ok(projects) => Err(format!(
            "Manifest {} should be rejected but resolved {} project(s)",
            path.display(),
            projects.len()
        )
        .into()),
        Err(e) => {
            assert!(!e.to_string().is_empty());
            Ok(())
        }
    }
}

datatest_stable::harness!(
    test_valid_manifest,
    "tests/testdata/manifests",
    r".*\.yaml$",
    test_invalid_manifest,
    "tests/testdata/invalid_manifests",
    r".*\.yaml$"
);
