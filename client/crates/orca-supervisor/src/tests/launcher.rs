use crate::tests::{Category, RecordingNotifier, RecordingSink, ScriptedProbe, eventually};
use crate::{LaunchOutcome, NoticeLevel, ProcessLauncher, SupervisorError};

use std::sync::Arc;
use std::time::Duration;

use googletest::assert_that;
use googletest::prelude::{anything, eq, err};

const WAIT: Duration = Duration::from_secs(5);

fn launcher(
    command: &str,
    args: &[&str],
    probe: Arc<ScriptedProbe>,
) -> (ProcessLauncher, Arc<RecordingSink>, Arc<RecordingNotifier>) {
    let sink = RecordingSink::new();
    let notifier = RecordingNotifier::new();
    let launcher = ProcessLauncher::new(
        command,
        args.iter().map(|a| a.to_string()).collect(),
        probe,
        sink.clone(),
        notifier.clone(),
    )
    .with_termination_grace(Duration::from_secs(2));
    (launcher, sink, notifier)
}

#[tokio::test]
async fn given_no_handle_when_stop_then_false_and_not_running_warning() {
    // Given
    let (launcher, _sink, notifier) = launcher("orca", &["server"], ScriptedProbe::always(false));

    // When
    let stopped = launcher.stop().await;

    // Then
    assert_that!(stopped, eq(false));
    assert_that!(
        notifier.count(NoticeLevel::Warning, "Orca server is not running."),
        eq(1)
    );
}

#[tokio::test]
async fn given_server_already_reachable_when_start_then_nothing_spawned() {
    // Given
    let (launcher, sink, _notifier) = launcher(
        "/nonexistent/orca-binary",
        &["server"],
        ScriptedProbe::always(true),
    );

    // When
    let outcome = launcher.start().await.unwrap();

    // Then
    assert_that!(outcome, eq(LaunchOutcome::ExternallyRunning));
    assert_that!(launcher.is_owned().await, eq(false));
    assert!(sink.contains(Category::Extension, "already running"));
}

#[tokio::test]
async fn given_missing_executable_when_start_then_launch_failure_and_error_notice() {
    // Given
    let (launcher, sink, notifier) = launcher(
        "/nonexistent/orca-binary",
        &["server"],
        ScriptedProbe::always(false),
    );

    // When
    let result = launcher.start().await;

    // Then
    assert_that!(result, err(anything()));
    assert!(matches!(
        result,
        Err(SupervisorError::LaunchFailure { ref command, .. }) if command == "/nonexistent/orca-binary"
    ));
    assert_that!(launcher.is_owned().await, eq(false));
    assert!(sink.contains(Category::Server, "Failed to start Orca server"));
    let errors = notifier
        .notices()
        .into_iter()
        .filter(|n| n.level == NoticeLevel::Error)
        .count();
    assert_that!(errors, eq(1));
}

#[cfg(unix)]
#[tokio::test]
async fn given_spawned_server_when_it_prints_then_lines_reach_server_log() {
    // Given
    let (launcher, sink, _notifier) = launcher(
        "sh",
        &["-c", "echo 'Orca listening'; echo 'warming up' 1>&2; sleep 30"],
        ScriptedProbe::always(false),
    );

    // When
    let outcome = launcher.start().await.unwrap();

    // Then
    assert!(matches!(outcome, LaunchOutcome::Spawned { pid: Some(_) }));
    assert!(
        eventually(WAIT, || {
            sink.contains(Category::Server, "Orca listening")
                && sink.contains(Category::Server, "warming up")
        })
        .await
    );

    assert_that!(launcher.stop().await, eq(true));
}

#[cfg(unix)]
#[tokio::test]
async fn given_owned_process_when_start_again_then_already_owned_without_probing() {
    // Given
    let probe = ScriptedProbe::always(false);
    let (launcher, _sink, _notifier) = launcher("sleep", &["30"], probe.clone());
    launcher.start().await.unwrap();
    let pid = launcher.pid().await;

    // When
    let outcome = launcher.start().await.unwrap();

    // Then
    assert_that!(outcome, eq(LaunchOutcome::AlreadyOwned));
    assert_that!(probe.calls(), eq(1));
    assert_that!(launcher.pid().await, eq(pid));

    launcher.stop().await;
}

#[cfg(unix)]
#[tokio::test]
async fn given_owned_process_when_stop_then_terminated_and_handle_cleared() {
    // Given
    let (launcher, sink, _notifier) = launcher("sleep", &["30"], ScriptedProbe::always(false));
    launcher.start().await.unwrap();

    // When
    let stopped = launcher.stop().await;

    // Then
    assert_that!(stopped, eq(true));
    assert_that!(launcher.is_owned().await, eq(false));
    assert!(
        eventually(WAIT, || sink.contains(Category::Server, "terminated by signal 15")).await
    );
}

#[cfg(unix)]
#[tokio::test]
async fn given_process_exits_on_its_own_when_watched_then_handle_cleared_with_exit_code() {
    // Given
    let (launcher, sink, _notifier) = launcher("sh", &["-c", "exit 3"], ScriptedProbe::always(false));

    // When
    launcher.start().await.unwrap();

    // Then
    assert!(eventually(WAIT, || sink.contains(Category::Server, "exited with code 3")).await);
    // Handle is cleared before the exit line is written
    assert_that!(launcher.is_owned().await, eq(false));
}

#[cfg(unix)]
#[tokio::test]
async fn given_owned_process_when_released_then_handle_returned_and_process_not_signalled() {
    // Given
    let (launcher, sink, _notifier) = launcher("sleep", &["1"], ScriptedProbe::always(false));
    launcher.start().await.unwrap();

    // When
    let released = launcher.release().await;

    // Then
    assert_that!(released.is_some(), eq(true));
    assert_that!(released.unwrap().command(), eq("sleep"));
    assert_that!(launcher.is_owned().await, eq(false));
    assert!(eventually(WAIT, || sink.contains(Category::Server, "exited with code 0")).await);
    assert!(!sink.contains(Category::Server, "terminated by signal"));
}

/// Start `sh -c "sleep 1; touch <marker>"` on a private runtime, apply
/// `before_teardown`, drop the runtime and report whether the marker appeared.
#[cfg(unix)]
fn marker_written_after_runtime_drop<F>(before_teardown: F) -> bool
where
    F: AsyncFnOnce(&ProcessLauncher),
{
    let dir = tempfile::tempdir().unwrap();
    let marker = dir.path().join("shutdown-complete");
    let script = format!("sleep 1; touch '{}'", marker.display());

    let runtime = tokio::runtime::Runtime::new().unwrap();
    runtime.block_on(async {
        let (launcher, _sink, _notifier) =
            launcher("sh", &["-c", &script], ScriptedProbe::always(false));
        launcher.start().await.unwrap();
        before_teardown(&launcher).await;
        // Keep the launcher alive until the runtime goes away
        std::mem::forget(launcher);
    });
    drop(runtime);

    std::thread::sleep(Duration::from_secs(2));
    marker.exists()
}

#[cfg(unix)]
#[test]
fn given_released_process_when_runtime_dropped_then_process_finishes_its_work() {
    let finished = marker_written_after_runtime_drop(async |launcher: &ProcessLauncher| {
        assert!(launcher.release().await.is_some());
    });

    assert_that!(finished, eq(true));
}

#[cfg(unix)]
#[test]
fn given_owned_process_when_runtime_dropped_then_process_killed() {
    let finished = marker_written_after_runtime_drop(async |_launcher: &ProcessLauncher| {});

    assert_that!(finished, eq(false));
}

#[cfg(unix)]
#[tokio::test]
async fn given_owned_process_when_launcher_dropped_then_process_terminated() {
    // Given
    let (launcher, sink, _notifier) = launcher("sleep", &["30"], ScriptedProbe::always(false));
    launcher.start().await.unwrap();

    // When
    drop(launcher);

    // Then
    assert!(
        eventually(WAIT, || sink.contains(Category::Server, "terminated by signal 15")).await
    );
}
