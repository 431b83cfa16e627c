//! Reset, prune, start, sync and the maintenance operations on real repositories.

mod common;

use common::prelude::*;
use herder::engine::{
    prune, reset, CleanOptions, Operation, PruneOptions, ResetOptions, RunOptions, StartOptions,
    SyncOptions,
};
use herder::working_copy::CleanFlags;
use herder::Error;

fn cloned(name: &str) -> TestFixture {
    let fixture = TestFixture::new();
    fixture.remote(name);
    fixture.write_manifest(&format!("projects:\n  - name: {}\n", name));
    fixture.herd(name).unwrap();
    fixture
}

fn start(branch: &str, tracking: bool) -> Operation {
    Operation::Start(StartOptions {
        branch: branch.to_string(),
        tracking,
    })
}

fn prune_op(branch: &str, local: bool, remote: bool) -> Operation {
    Operation::Prune(PruneOptions {
        branch: branch.to_string(),
        local,
        remote,
        force: false,
    })
}

#[test]
fn test_reset_discards_local_commits_and_edits() {
    let fixture = cloned("org/cats");
    let tip = fixture.head("org/cats", "main");
    fixture.git_in("org/cats", &["commit", "--quiet", "--allow-empty", "-m", "oops"]);
    std::fs::write(fixture.workspace().join("org/cats/scratch.txt"), "x").unwrap();
    fixture.git_in("org/cats", &["add", "scratch.txt"]);

    let outcome = fixture
        .execute(&Operation::Reset(ResetOptions::default()), "org/cats")
        .unwrap();
    assert!(outcome.is_changed());

    let wc = fixture.working_copy("org/cats");
    assert_eq!(wc.head_sha().unwrap(), Some(tip));
    assert!(!wc.is_dirty().unwrap());

    let again = fixture
        .execute(&Operation::Reset(ResetOptions::default()), "org/cats")
        .unwrap();
    assert!(!again.is_changed(), "{:?}", again);
}

#[test]
fn test_reset_to_timestamp_picks_older_commit() {
    let fixture = TestFixture::new();
    fixture.remote("org/cats");
    let old = fixture.commit_at("org/cats", "main", "old", Some("2030-01-01T00:00:00+00:00"));
    fixture.commit_at("org/cats", "main", "new", Some("2030-06-01T00:00:00+00:00"));
    fixture.write_manifest("projects:\n  - name: org/cats\n");
    fixture.herd("org/cats").unwrap();

    let op = Operation::Reset(ResetOptions {
        timestamp: Some("2030-03-01T00:00:00+00:00".to_string()),
        depth: None,
    });
    fixture.execute(&op, "org/cats").unwrap();

    let wc = fixture.working_copy("org/cats");
    assert!(wc.is_detached().unwrap());
    assert_eq!(wc.head_sha().unwrap(), Some(old));
}

#[test]
fn test_reset_to_timestamp_before_history_fails() {
    let fixture = TestFixture::new();
    fixture.remote("org/cats");
    fixture.commit_at("org/cats", "main", "late", Some("2030-01-01T00:00:00+00:00"));
    fixture.write_manifest("projects:\n  - name: org/cats\n");
    fixture.herd("org/cats").unwrap();

    let op = Operation::Reset(ResetOptions {
        timestamp: Some("1990-01-01T00:00:00+00:00".to_string()),
        depth: None,
    });
    let err = fixture.execute(&op, "org/cats").unwrap_err();
    assert!(matches!(err, Error::NoCommitBeforeTimestamp { .. }), "{:?}", err);
}

#[test]
fn test_timestamp_of_reads_head_commit_time() {
    let fixture = TestFixture::new();
    fixture.remote("org/cats");
    fixture.commit_at("org/cats", "main", "dated", Some("2030-01-01T00:00:00+00:00"));
    fixture.write_manifest("projects:\n  - name: org/cats\n");
    fixture.herd("org/cats").unwrap();

    let timestamp = reset::timestamp_of(&fixture.project("org/cats"), &fixture.ctx()).unwrap();
    assert!(timestamp.starts_with("2030-01-01T00:00:00"), "{}", timestamp);
}

#[test]
fn test_prune_current_branch_switches_to_default() {
    let fixture = cloned("org/cats");
    fixture.execute(&start("topic", false), "org/cats").unwrap();

    let outcome = fixture.execute(&prune_op("topic", false, false), "org/cats").unwrap();
    assert_eq!(outcome.message(), "deleted local branch topic");

    let wc = fixture.working_copy("org/cats");
    assert_eq!(wc.current_branch().unwrap().as_deref(), Some("main"));
    assert!(!wc.local_branch_exists("topic").unwrap());
}

#[test]
fn test_prune_default_branch_is_refused() {
    let fixture = cloned("org/cats");
    let err = fixture.execute(&prune_op("main", false, false), "org/cats").unwrap_err();
    assert!(err.is_validation());
}

#[test]
fn test_validate_prune_reports_unknown_branch() {
    let fixture = cloned("org/cats");
    let projects = fixture.load();
    let opts = PruneOptions {
        branch: "ghost".to_string(),
        ..PruneOptions::default()
    };

    let err = prune::validate_prune(projects.as_slice(), &fixture.ctx(), &opts).unwrap_err();
    assert!(matches!(err, Error::BranchNotFound { .. }), "{:?}", err);
}

#[test]
fn test_start_tracking_pushes_and_prune_remote_deletes() {
    let fixture = cloned("org/cats");

    let outcome = fixture.execute(&start("feature", true), "org/cats").unwrap();
    assert!(outcome.message().contains("pushed to origin/feature"));
    assert!(fixture.has_branch("org/cats", "feature"));
    assert_eq!(
        fixture.working_copy("org/cats").upstream_of("feature").unwrap(),
        Some(("origin".to_string(), "feature".to_string()))
    );

    let projects = fixture.load();
    let opts = PruneOptions {
        branch: "feature".to_string(),
        local: true,
        remote: true,
        force: false,
    };
    prune::validate_prune(projects.as_slice(), &fixture.ctx(), &opts).unwrap();
    let pruned = fixture.execute(&Operation::Prune(opts), "org/cats").unwrap();

    assert_eq!(pruned.message(), "deleted local and remote branch feature");
    assert!(!fixture.has_branch("org/cats", "feature"));
}

#[test]
fn test_start_twice_is_unchanged() {
    let fixture = cloned("org/cats");
    assert!(fixture.execute(&start("topic", false), "org/cats").unwrap().is_changed());

    let again = fixture.execute(&start("topic", false), "org/cats").unwrap();
    assert!(!again.is_changed());
    assert_eq!(again.message(), "already on topic");
}

#[test]
fn test_start_tracking_offline_only_creates_local_branch() {
    let fixture = cloned("org/cats");
    let offline = herder::engine::Context::new(fixture.workspace(), false);

    let outcome =
        herder::engine::execute(&start("topic", true), &fixture.project("org/cats"), &offline)
            .unwrap();
    assert!(outcome.message().contains("offline"));
    assert!(!fixture.has_branch("org/cats", "topic"));
}

#[test]
fn test_sync_fast_forwards_fork_and_pushes() {
    let fixture = TestFixture::new();
    fixture.remote("upstream-org/cats");
    fixture.fork("upstream-org/cats", "me/cats");
    fixture.write_manifest(
        "projects:\n  - name: me/cats\n    upstream:\n      name: upstream-org/cats\n",
    );
    fixture.herd("me/cats").unwrap();

    let upstream_tip = fixture.commit("upstream-org/cats", "main", "upstream work");
    let outcome = fixture
        .execute(&Operation::Sync(SyncOptions::default()), "me/cats")
        .unwrap();

    assert!(outcome.is_changed(), "{:?}", outcome);
    assert_eq!(fixture.head("me/cats", "main"), upstream_tip);

    let again = fixture
        .execute(&Operation::Sync(SyncOptions::default()), "me/cats")
        .unwrap();
    assert!(!again.is_changed(), "{:?}", again);
}

#[test]
fn test_status_describes_branch_and_dirtiness() {
    let fixture = cloned("org/cats");
    std::fs::write(fixture.workspace().join("org/cats/new.txt"), "x").unwrap();
    fixture.git_in("org/cats", &["add", "new.txt"]);

    let outcome = fixture.execute(&Operation::Status, "org/cats").unwrap();
    assert_eq!(outcome.message(), "main -> origin/main (dirty)");
}

#[cfg(unix)]
#[test]
fn test_run_exports_project_environment() {
    let fixture = cloned("org/cats");
    let op = Operation::Run(RunOptions {
        command: "echo $HERDER_PROJECT_NAME on $(git rev-parse --abbrev-ref HEAD)".to_string(),
    });

    let outcome = fixture.execute(&op, "org/cats").unwrap();
    assert!(outcome.message().contains("org/cats on main"), "{:?}", outcome);
}

#[cfg(unix)]
#[test]
fn test_run_failure_reports_exit_code() {
    let fixture = cloned("org/cats");
    let op = Operation::Run(RunOptions {
        command: "exit 3".to_string(),
    });

    let err = fixture.execute(&op, "org/cats").unwrap_err();
    assert!(matches!(err, Error::CommandFailed { code: Some(3), .. }), "{:?}", err);
}

#[test]
fn test_clean_removes_untracked_files() {
    let fixture = cloned("org/cats");
    let root = fixture.workspace().join("org/cats");
    std::fs::write(root.join("junk.txt"), "x").unwrap();
    std::fs::create_dir_all(root.join("build")).unwrap();
    std::fs::write(root.join("build/out.o"), "x").unwrap();

    let op = Operation::Clean(CleanOptions {
        flags: CleanFlags {
            directories: true,
            ..CleanFlags::default()
        },
        recursive: false,
    });
    fixture.execute(&op, "org/cats").unwrap();

    assert!(!root.join("junk.txt").exists());
    assert!(!root.join("build").exists());
    assert!(!fixture.working_copy("org/cats").is_dirty().unwrap());
}

#[test]
fn test_stash_only_touches_dirty_projects() {
    let fixture = cloned("org/cats");
    assert!(!fixture.execute(&Operation::Stash, "org/cats").unwrap().is_changed());

    let root = fixture.workspace().join("org/cats");
    std::fs::write(root.join("tracked.txt"), "one").unwrap();
    fixture.git_in("org/cats", &["add", "tracked.txt"]);
    fixture.git_in("org/cats", &["commit", "--quiet", "-m", "track"]);
    std::fs::write(root.join("tracked.txt"), "two").unwrap();

    fixture.git_in("org/cats", &["config", "user.name", "Herder Test"]);
    fixture.git_in("org/cats", &["config", "user.email", "test@example.com"]);
    assert!(fixture.execute(&Operation::Stash, "org/cats").unwrap().is_changed());
    assert_eq!(std::fs::read_to_string(root.join("tracked.txt")).unwrap(), "one");
}

#[test]
fn test_operations_skip_projects_that_are_not_cloned() {
    let fixture = TestFixture::new();
    fixture.remote("org/cats");
    fixture.write_manifest("projects:\n  - name: org/cats\n    path: cats\n");

    for op in [
        Operation::Reset(ResetOptions::default()),
        start("topic", false),
        Operation::Stash,
        Operation::Status,
    ] {
        let outcome = fixture.execute(&op, "org/cats").unwrap();
        assert!(outcome.is_skipped(), "{} did not skip: {:?}", op.name(), outcome);
    }
    assert!(!fixture.workspace().join("cats").exists());
}
