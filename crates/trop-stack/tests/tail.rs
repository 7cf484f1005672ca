use jiff::{SignedDuration, Timestamp};
use trop_core::models::{ParameterSet, StackEvent, StackStatus};
use trop_stack::memory::{InMemoryControlPlane, ManualClock};
use trop_stack::tail::POLL_INTERVAL;
use trop_stack::{EventTailer, StackError, TailState, tail_events};

const STACK: &str = "my-stack";

fn start() -> Timestamp {
    "2026-03-01T10:00:00Z".parse().unwrap()
}

fn control_plane(status: StackStatus) -> InMemoryControlPlane {
    let api = InMemoryControlPlane::new(ManualClock::new(start()));
    api.insert_stack(STACK, status, ParameterSet::new(), vec![]);
    api
}

fn event(id: &str, offset_secs: i64, logical: &str, status: &str) -> StackEvent {
    StackEvent {
        id: id.to_string(),
        timestamp: start()
            .checked_add(SignedDuration::from_secs(offset_secs))
            .unwrap(),
        logical_resource_id: logical.to_string(),
        resource_status: status.to_string(),
        status_reason: None,
    }
}

fn lines(out: &[u8]) -> Vec<String> {
    String::from_utf8(out.to_vec())
        .unwrap()
        .lines()
        .map(String::from)
        .collect()
}

#[tokio::test]
async fn terminal_statuses_stop_after_one_poll() {
    for status in StackStatus::ALL.into_iter().filter(StackStatus::is_terminal) {
        let api = control_plane(status.clone());
        let mut out = Vec::new();

        let final_status = tail_events(&api, api.clock(), STACK, &mut out).await.unwrap();

        assert_eq!(final_status, status);
        assert!(api.clock().sleeps().is_empty(), "{status} should not sleep");
    }
}

#[tokio::test]
async fn non_terminal_statuses_keep_polling() {
    for status in StackStatus::ALL.into_iter().filter(|s| !s.is_terminal()) {
        let api = control_plane(status.clone());
        let mut out = Vec::new();
        let mut tailer = EventTailer::new(&api, api.clock(), STACK).unwrap();

        let state = tailer.poll(&mut out).await.unwrap();
        assert_eq!(state, &TailState::Polling, "{status} must not stop the tail");
    }
}

#[tokio::test]
async fn failed_then_complete_sleeps_between_polls() {
    let api = control_plane(StackStatus::CreateInProgress);
    api.script(
        STACK,
        [
            StackStatus::CreateFailed,
            StackStatus::RollbackInProgress,
            StackStatus::RollbackComplete,
        ],
    );
    let mut out = Vec::new();

    let final_status = tail_events(&api, api.clock(), STACK, &mut out).await.unwrap();

    assert_eq!(final_status, StackStatus::RollbackComplete);
    assert!(final_status.is_rollback());
    assert_eq!(api.clock().sleeps(), vec![POLL_INTERVAL, POLL_INTERVAL]);

    let printed = lines(&out);
    assert_eq!(printed.len(), 3);
    assert!(printed[0].ends_with("] CREATE_FAILED"));
    assert!(printed[1].ends_with("] ROLLBACK_IN_PROGRESS"));
    assert!(printed[2].ends_with("] ROLLBACK_COMPLETE"));
}

#[tokio::test]
async fn redelivered_events_print_once() {
    let api = control_plane(StackStatus::CreateInProgress);
    api.push_event(STACK, event("bucket-1", 0, "MyBucket", "CREATE_IN_PROGRESS"));
    let mut out = Vec::new();
    let mut tailer = EventTailer::new(&api, api.clock(), STACK).unwrap();

    tailer.poll(&mut out).await.unwrap();
    tailer.poll(&mut out).await.unwrap();

    let printed = lines(&out);
    assert_eq!(printed.len(), 1);
    assert_eq!(
        printed[0],
        "2026-03-01T10:00:00Z [ MyBucket             ] CREATE_IN_PROGRESS"
    );
}

#[tokio::test]
async fn history_before_grace_window_is_never_printed() {
    let api = control_plane(StackStatus::UpdateComplete);
    api.push_event(STACK, event("old", -3, STACK, "UPDATE_COMPLETE"));
    api.push_event(STACK, event("edge", -2, STACK, "UPDATE_IN_PROGRESS"));
    api.push_event(STACK, event("skewed", -1, "MyBucket", "UPDATE_COMPLETE"));
    let mut out = Vec::new();

    tail_events(&api, api.clock(), STACK, &mut out).await.unwrap();

    let printed = lines(&out);
    assert_eq!(printed.len(), 2);
    assert!(printed[0].contains("UPDATE_IN_PROGRESS"));
    assert!(printed[1].contains("[ MyBucket             ]"));
}

#[tokio::test]
async fn events_print_oldest_first() {
    let api = control_plane(StackStatus::CreateComplete);
    // Stored oldest-first, so the API hands back [E3, E1, E2].
    api.push_event(STACK, event("E2", 2, "Second", "CREATE_COMPLETE"));
    api.push_event(STACK, event("E1", 1, "First", "CREATE_IN_PROGRESS"));
    api.push_event(STACK, event("E3", 3, "Third", "CREATE_COMPLETE"));
    let mut out = Vec::new();

    tail_events(&api, api.clock(), STACK, &mut out).await.unwrap();

    let printed = lines(&out);
    assert_eq!(printed.len(), 3);
    assert!(printed[0].contains("[ First "));
    assert!(printed[1].contains("[ Second "));
    assert!(printed[2].contains("[ Third "));
}

#[tokio::test]
async fn status_reason_is_appended() {
    let api = control_plane(StackStatus::CreateComplete);
    let mut failed = event("e", 0, "MyBucket", "CREATE_FAILED");
    failed.status_reason = Some("Resource creation cancelled".into());
    api.push_event(STACK, failed);
    let mut out = Vec::new();

    tail_events(&api, api.clock(), STACK, &mut out).await.unwrap();

    assert_eq!(
        lines(&out),
        vec![
            "2026-03-01T10:00:00Z [ MyBucket             ] CREATE_FAILED - Resource creation cancelled"
        ]
    );
}

#[tokio::test]
async fn poll_after_terminal_is_a_no_op() {
    let api = control_plane(StackStatus::CreateComplete);
    let mut out = Vec::new();
    let mut tailer = EventTailer::new(&api, api.clock(), STACK).unwrap();

    tailer.poll(&mut out).await.unwrap();
    api.fail_next("would fail if called");
    let state = tailer.poll(&mut out).await.unwrap();

    assert_eq!(state, &TailState::Terminal(StackStatus::CreateComplete));
}

#[tokio::test]
async fn api_errors_abort_the_tail() {
    let api = control_plane(StackStatus::CreateInProgress);
    api.fail_next("Rate exceeded");
    let mut out = Vec::new();

    let err = tail_events(&api, api.clock(), STACK, &mut out)
        .await
        .unwrap_err();

    assert!(matches!(err, StackError::Aws { .. }));
    assert!(out.is_empty());
}

#[tokio::test]
async fn missing_stack_is_not_found() {
    let api = InMemoryControlPlane::new(ManualClock::new(start()));
    let mut out = Vec::new();

    let err = tail_events(&api, api.clock(), "nope", &mut out)
        .await
        .unwrap_err();

    assert!(err.is_not_found());
}
