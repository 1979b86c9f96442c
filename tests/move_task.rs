// tests/move_task.rs

use std::fs;
use std::os::unix::fs::PermissionsExt;

use triggerd::fs::RealFileSystem;
use triggerd::fs::mock::FaultyFileSystem;
use triggerd::task::{AbortStage, EntryOutcome, SkipReason};
use triggerd::transfer::TransferMethod;
use triggerd_test_utils::builders::{MoveTaskBuilder, Workspace, context, real_context_with};
use triggerd_test_utils::fake_process::RecordingBackend;
use triggerd_test_utils::init_tracing;

#[tokio::test]
async fn end_to_end_move_leaves_no_trigger_state_behind() {
    init_tracing();
    let ws = Workspace::new();
    ws.write("w/in/a.txt", "alpha");
    // An entry in the source directory that shares the trigger's name.
    ws.write("w/in/go", "");
    ws.write("w/go", "");

    let task = MoveTaskBuilder::in_workspace(&ws).build();
    let outcome = task.execute(&real_context_with(RecordingBackend::new())).await;

    assert!(outcome.succeeded(), "{outcome:?}");
    assert_eq!(ws.read("w/out/a.txt"), "alpha");
    assert!(!ws.exists("w/in/a.txt"));
    assert!(!ws.exists("w/go"));
    assert!(!ws.exists("w/go.processing"));

    assert!(ws.exists("w/in/go"), "trigger-named entry must not be transferred");
    assert!(!ws.exists("w/out/go"));

    let summary = outcome.report().unwrap().transfer.as_ref().unwrap();
    assert_eq!((summary.moved(), summary.skipped(), summary.total()), (1, 0, 1));
    assert!(summary.outcome_of("go").is_none());
}

#[tokio::test]
async fn trigger_inside_the_source_directory_is_never_moved() {
    let ws = Workspace::new();
    ws.write("w/in/a.txt", "a");
    ws.write("w/in/go", "");

    let task = MoveTaskBuilder::in_workspace(&ws)
        .trigger(ws.path("w/in/go"))
        .build();
    let outcome = task.execute(&real_context_with(RecordingBackend::new())).await;

    assert!(outcome.succeeded());
    let summary = outcome.report().unwrap().transfer.as_ref().unwrap();
    assert_eq!(summary.total(), 1);
    assert!(!ws.exists("w/out/go"));
    assert!(!ws.exists("w/out/go.processing"));
    assert!(!ws.exists("w/in/go"));
    assert!(!ws.exists("w/in/go.processing"));
}

#[tokio::test]
async fn overwrite_disabled_skips_and_leaves_both_sides_untouched() {
    let ws = Workspace::new();
    ws.write("w/in/a.txt", "new");
    ws.write("w/out/a.txt", "old");
    ws.write("w/go", "");

    let task = MoveTaskBuilder::in_workspace(&ws).build();
    let outcome = task.execute(&real_context_with(RecordingBackend::new())).await;

    // Skipped entries do not make the task fail.
    assert!(outcome.succeeded());
    let report = outcome.report().unwrap();
    assert!(report.has_skipped_entries());
    assert!(matches!(
        report.transfer.as_ref().unwrap().outcome_of("a.txt"),
        Some(EntryOutcome::Skipped(SkipReason::DestinationExists))
    ));
    assert_eq!(ws.read("w/in/a.txt"), "new");
    assert_eq!(ws.read("w/out/a.txt"), "old");
}

#[tokio::test]
async fn overwrite_enabled_replaces_files_and_whole_directories() {
    let ws = Workspace::new();
    ws.write("w/in/a.txt", "new");
    ws.write("w/out/a.txt", "old");
    ws.write("w/in/d/fresh.txt", "f");
    ws.write("w/out/d/stale.txt", "s");
    ws.write("w/go", "");

    let task = MoveTaskBuilder::in_workspace(&ws).overwrite(true).build();
    let outcome = task.execute(&real_context_with(RecordingBackend::new())).await;

    assert!(outcome.succeeded());
    assert_eq!(ws.read("w/out/a.txt"), "new");
    assert_eq!(ws.read("w/out/d/fresh.txt"), "f");
    assert!(!ws.exists("w/out/d/stale.txt"));
    assert!(!ws.exists("w/in/a.txt"));
    assert!(!ws.exists("w/in/d"));
}

#[tokio::test]
async fn cross_device_entries_are_copied_then_deleted() {
    let ws = Workspace::new();
    ws.write("w/in/a.txt", "alpha");
    ws.write("w/in/tree/nested/b.txt", "beta");
    std::os::unix::fs::symlink("nested/b.txt", ws.path("w/in/tree/link")).unwrap();
    fs::set_permissions(ws.path("w/in/a.txt"), fs::Permissions::from_mode(0o640)).unwrap();
    ws.write("w/go", "");

    let faulty = FaultyFileSystem::new();
    faulty.cross_device_below(ws.path("w/in"));

    let task = MoveTaskBuilder::in_workspace(&ws).build();
    let outcome = task.execute(&context(faulty, RecordingBackend::new())).await;

    assert!(outcome.succeeded(), "{outcome:?}");
    let summary = outcome.report().unwrap().transfer.as_ref().unwrap();
    for name in ["a.txt", "tree"] {
        assert!(
            matches!(
                summary.outcome_of(name),
                Some(EntryOutcome::Moved {
                    method: TransferMethod::Copy { source_removed: true },
                    ..
                })
            ),
            "{name}: {:?}",
            summary.outcome_of(name)
        );
    }

    assert!(!ws.exists("w/in/a.txt"));
    assert!(!ws.exists("w/in/tree"));
    assert_eq!(ws.read("w/out/a.txt"), "alpha");
    assert_eq!(ws.read("w/out/tree/nested/b.txt"), "beta");
    assert_eq!(
        fs::read_link(ws.path("w/out/tree/link")).unwrap(),
        std::path::Path::new("nested/b.txt")
    );
    let mode = fs::metadata(ws.path("w/out/a.txt")).unwrap().permissions().mode() & 0o777;
    assert_eq!(mode, 0o640);
}

#[tokio::test]
async fn remediation_applies_modes_to_moved_entries_only() {
    let ws = Workspace::new();
    ws.write("w/in/a.txt", "a");
    ws.write("w/in/d/inner.txt", "i");
    ws.write("w/in/kept.txt", "k");
    ws.write("w/out/kept.txt", "existing");
    fs::set_permissions(ws.path("w/out/kept.txt"), fs::Permissions::from_mode(0o644)).unwrap();
    ws.write("w/go", "");

    let task = MoveTaskBuilder::in_workspace(&ws)
        .file_mode("0600")
        .dir_mode("0750")
        .build();
    let outcome = task.execute(&real_context_with(RecordingBackend::new())).await;
    assert!(outcome.succeeded());

    let mode = |rel: &str| fs::metadata(ws.path(rel)).unwrap().permissions().mode() & 0o777;
    assert_eq!(mode("w/out/a.txt"), 0o600);
    assert_eq!(mode("w/out/d"), 0o750);
    assert_eq!(mode("w/out/d/inner.txt"), 0o600);
    assert_eq!(mode("w/out/kept.txt"), 0o644);
}

#[tokio::test]
async fn invalid_mode_is_logged_not_fatal() {
    let ws = Workspace::new();
    ws.write("w/in/a.txt", "a");
    ws.write("w/go", "");

    let task = MoveTaskBuilder::in_workspace(&ws).file_mode("rw-r--r--").build();
    let outcome = task.execute(&real_context_with(RecordingBackend::new())).await;

    assert!(outcome.succeeded());
    assert!(ws.exists("w/out/a.txt"));
}

#[tokio::test]
async fn missing_trigger_aborts_at_claim_without_moving_anything() {
    let ws = Workspace::new();
    ws.write("w/in/a.txt", "a");

    let task = MoveTaskBuilder::in_workspace(&ws).build();
    let outcome = task.execute(&real_context_with(RecordingBackend::new())).await;

    assert_eq!(outcome.abort_stage(), Some(AbortStage::Claim));
    assert!(ws.exists("w/in/a.txt"));
    assert!(!ws.exists("w/out/a.txt"));
}

#[tokio::test]
async fn unreadable_source_aborts_after_the_claim() {
    let ws = Workspace::new();
    ws.write("w/go", "");

    let task = MoveTaskBuilder::new(ws.path("w/go"), ws.path("w/missing"), ws.path("w/out")).build();
    let outcome = task.execute(&real_context_with(RecordingBackend::new())).await;

    assert_eq!(outcome.abort_stage(), Some(AbortStage::ReadSource));
    // The claim happened; the marker records the interrupted run.
    assert!(!ws.exists("w/go"));
    assert!(ws.exists("w/go.processing"));
}

#[tokio::test]
async fn cleanup_failure_is_reported_separately_from_the_move() {
    let ws = Workspace::new();
    ws.write("w/in/a.txt", "a");
    ws.write("w/go", "");

    let faulty = FaultyFileSystem::new();
    faulty.fail_remove_of(ws.path("w/go.processing"), nix::libc::EACCES);

    let task = MoveTaskBuilder::in_workspace(&ws).build();
    let outcome = task.execute(&context(faulty, RecordingBackend::new())).await;

    assert!(outcome.domain_completed());
    assert!(!outcome.succeeded());
    assert!(outcome.report().unwrap().cleanup_error.is_some());
    assert!(ws.exists("w/out/a.txt"));
}

#[tokio::test]
async fn real_filesystem_claim_and_release_are_idempotent() {
    let ws = Workspace::new();
    let task = MoveTaskBuilder::in_workspace(&ws).build();

    task.trigger.release(&RealFileSystem).unwrap();
    ws.write("w/go.processing", "");
    task.trigger.release(&RealFileSystem).unwrap();
    assert!(!ws.exists("w/go.processing"));
}
