use std::sync::Arc;
use std::time::Duration;

use billy_protocol::{ServiceState, UserProfile, UserRef};
use tokio::sync::broadcast::error::TryRecvError;

use super::*;
use crate::testing::{ApiCall, ScriptedDeviceApi};

const INTERVAL: Duration = Duration::from_secs(3);

fn poller_over(api: &Arc<ScriptedDeviceApi>) -> Arc<ChangePoller> {
    let cache = Arc::new(SnapshotCache::for_status(
        Arc::clone(api) as Arc<dyn crate::api::DeviceApi>,
        Duration::from_secs(2),
    ));
    Arc::new(ChangePoller::new(cache, INTERVAL))
}

/// Let spawned tasks run without moving the clock.
async fn settle() {
    for _ in 0..10 {
        tokio::task::yield_now().await;
    }
}

#[tokio::test(start_paused = true)]
async fn test_first_cycle_is_baseline_without_events() {
    let api = Arc::new(ScriptedDeviceApi::new());
    let poller = poller_over(&api);
    let mut rx = poller.subscribe();

    assert_eq!(poller.poll_once().await, PollOutcome::Baseline);
    assert!(matches!(rx.try_recv(), Err(TryRecvError::Empty)));
    assert!(poller.last_known().is_some());
}

#[tokio::test(start_paused = true)]
async fn test_service_state_change_emits_exactly_one_event() {
    let api = Arc::new(ScriptedDeviceApi::new());
    let poller = poller_over(&api);
    let mut rx = poller.subscribe();

    poller.poll_once().await;
    api.update_status(|s| s.service_state = ServiceState::Failed);

    let outcome = poller.poll_once().await;
    let expected = StatusChange::ServiceState {
        previous: ServiceState::Active,
        current: ServiceState::Failed,
    };
    assert_eq!(outcome, PollOutcome::Changes(vec![expected.clone()]));
    assert_eq!(rx.try_recv().unwrap(), expected);
    assert!(matches!(rx.try_recv(), Err(TryRecvError::Empty)));

    // Same state again: nothing new.
    assert_eq!(poller.poll_once().await, PollOutcome::Changes(vec![]));
    assert!(matches!(rx.try_recv(), Err(TryRecvError::Empty)));
}

#[tokio::test(start_paused = true)]
async fn test_poll_always_bypasses_cache() {
    let api = Arc::new(ScriptedDeviceApi::new());
    let poller = poller_over(&api);

    poller.poll_once().await;
    poller.poll_once().await;
    assert_eq!(api.count(|c| *c == ApiCall::FetchStatus), 2);
}

#[tokio::test(start_paused = true)]
async fn test_memory_count_decrease_is_a_change() {
    let api = Arc::new(ScriptedDeviceApi::new());
    api.update_status(|s| s.memory_count = 5);
    let poller = poller_over(&api);

    poller.poll_once().await;
    api.update_status(|s| s.memory_count = 4);
    assert_eq!(
        poller.poll_once().await,
        PollOutcome::Changes(vec![StatusChange::MemoryCount {
            previous: 5,
            current: 4
        }])
    );
}

#[tokio::test(start_paused = true)]
async fn test_user_loading_is_not_a_user_change() {
    let api = Arc::new(ScriptedDeviceApi::new());
    api.update_status(|s| {
        s.current_user = UserRef::IdOnly {
            id: "Alice".into(),
        }
    });
    let poller = poller_over(&api);
    poller.poll_once().await;

    api.update_status(|s| {
        s.current_user = UserRef::Full {
            profile: UserProfile::new("alice"),
        }
    });
    assert_eq!(poller.poll_once().await, PollOutcome::Changes(vec![]));
}

#[tokio::test(start_paused = true)]
async fn test_failed_fetch_skips_cycle_and_keeps_baseline() {
    let api = Arc::new(ScriptedDeviceApi::new());
    let poller = poller_over(&api);
    let mut rx = poller.subscribe();
    poller.poll_once().await;

    api.fail(
        "fetch_status",
        ApiError::Transport {
            message: "offline".into(),
        },
    );
    assert!(matches!(poller.poll_once().await, PollOutcome::Skipped(_)));
    assert_eq!(
        poller.last_known().unwrap().service_state,
        ServiceState::Active
    );

    api.recover("fetch_status");
    api.update_status(|s| s.service_state = ServiceState::Failed);
    assert_eq!(
        poller.poll_once().await,
        PollOutcome::Changes(vec![StatusChange::ServiceState {
            previous: ServiceState::Active,
            current: ServiceState::Failed,
        }])
    );
    assert!(rx.try_recv().is_ok());
}

#[tokio::test(start_paused = true)]
async fn test_failed_first_fetch_does_not_become_baseline() {
    let api = Arc::new(ScriptedDeviceApi::new());
    let poller = poller_over(&api);
    api.fail(
        "fetch_status",
        ApiError::Server {
            status: 500,
            message: None,
        },
    );
    assert!(matches!(poller.poll_once().await, PollOutcome::Skipped(_)));
    assert!(poller.last_known().is_none());

    api.recover("fetch_status");
    assert_eq!(poller.poll_once().await, PollOutcome::Baseline);
}

#[tokio::test(start_paused = true)]
async fn test_suppression_mutes_reactions_but_stores_snapshot() {
    let api = Arc::new(ScriptedDeviceApi::new());
    let poller = poller_over(&api);
    let mut rx = poller.subscribe();
    poller.poll_once().await;

    poller.suppress_for(Duration::from_secs(3));
    api.update_status(|s| s.current_persona = Some("cheerful".into()));
    assert_eq!(poller.poll_once().await, PollOutcome::Suppressed);
    assert!(matches!(rx.try_recv(), Err(TryRecvError::Empty)));
    assert_eq!(
        poller.last_known().unwrap().current_persona.as_deref(),
        Some("cheerful")
    );

    // After the window the stored snapshot is the comparison base, so the
    // muted change is not replayed.
    tokio::time::advance(Duration::from_secs(3)).await;
    assert!(!poller.is_suppressed());
    assert_eq!(poller.poll_once().await, PollOutcome::Changes(vec![]));

    api.update_status(|s| s.current_persona = Some("default".into()));
    assert_eq!(
        poller.poll_once().await,
        PollOutcome::Changes(vec![StatusChange::CurrentPersona {
            previous: Some("cheerful".into()),
            current: Some("default".into()),
        }])
    );
}

#[tokio::test(start_paused = true)]
async fn test_suppression_extends_but_never_shortens() {
    let api = Arc::new(ScriptedDeviceApi::new());
    let poller = poller_over(&api);

    poller.suppress_for(Duration::from_secs(5));
    poller.suppress_for(Duration::from_secs(1));
    tokio::time::advance(Duration::from_secs(2)).await;
    assert!(poller.is_suppressed());

    poller.suppress_for(Duration::from_secs(6));
    tokio::time::advance(Duration::from_secs(5)).await;
    assert!(poller.is_suppressed());
    tokio::time::advance(Duration::from_secs(1)).await;
    assert!(!poller.is_suppressed());
}

#[tokio::test(start_paused = true)]
async fn test_watch_list_limits_detection() {
    let api = Arc::new(ScriptedDeviceApi::new());
    let cache = Arc::new(SnapshotCache::for_status(
        Arc::clone(&api) as Arc<dyn crate::api::DeviceApi>,
        Duration::from_secs(2),
    ));
    let poller = ChangePoller::new(cache, INTERVAL).with_watch_list(vec![WatchedField::MemoryCount]);

    poller.poll_once().await;
    api.update_status(|s| {
        s.service_state = ServiceState::Failed;
        s.config_version = Some("v2".into());
    });
    assert_eq!(poller.poll_once().await, PollOutcome::Changes(vec![]));
}

#[tokio::test(start_paused = true)]
async fn test_running_poller_ticks_and_stop_halts_ticks() {
    let api = Arc::new(ScriptedDeviceApi::new());
    let poller = poller_over(&api);
    let mut rx = poller.subscribe();

    poller.start();
    settle().await;
    assert!(poller.is_running());
    assert_eq!(api.count(|c| *c == ApiCall::FetchStatus), 1);
    assert!(matches!(rx.try_recv(), Err(TryRecvError::Empty)));

    api.update_status(|s| s.service_state = ServiceState::Failed);
    tokio::time::advance(INTERVAL).await;
    settle().await;
    assert_eq!(api.count(|c| *c == ApiCall::FetchStatus), 2);
    assert_eq!(
        rx.try_recv().unwrap(),
        StatusChange::ServiceState {
            previous: ServiceState::Active,
            current: ServiceState::Failed,
        }
    );

    poller.stop();
    assert!(!poller.is_running());
    tokio::time::advance(INTERVAL * 3).await;
    settle().await;
    assert_eq!(api.count(|c| *c == ApiCall::FetchStatus), 2);
}

#[tokio::test(start_paused = true)]
async fn test_restart_takes_new_baseline() {
    let api = Arc::new(ScriptedDeviceApi::new());
    let poller = poller_over(&api);
    let mut rx = poller.subscribe();

    poller.start();
    settle().await;
    poller.stop();

    api.update_status(|s| s.service_state = ServiceState::Inactive);
    poller.start();
    settle().await;
    assert!(matches!(rx.try_recv(), Err(TryRecvError::Empty)));
    assert_eq!(
        poller.last_known().unwrap().service_state,
        ServiceState::Inactive
    );
    poller.stop();
}

#[tokio::test(start_paused = true)]
async fn test_stop_lets_running_cycle_finish() {
    let api = Arc::new(ScriptedDeviceApi::new());
    api.set_status_delay(Duration::from_millis(500));
    let poller = poller_over(&api);

    poller.start();
    settle().await;
    assert_eq!(api.count(|c| *c == ApiCall::FetchStatus), 1);
    poller.stop();

    tokio::time::advance(Duration::from_millis(500)).await;
    settle().await;
    assert!(poller.last_known().is_some());
    tokio::time::advance(INTERVAL * 2).await;
    settle().await;
    assert_eq!(api.count(|c| *c == ApiCall::FetchStatus), 1);
}

#[tokio::test(start_paused = true)]
async fn test_cycle_from_stopped_run_does_not_replace_new_baseline() {
    let api = Arc::new(ScriptedDeviceApi::new());
    api.set_status_delay(Duration::from_millis(500));
    let poller = poller_over(&api);
    let mut rx = poller.subscribe();

    poller.start();
    settle().await;
    poller.stop();

    api.update_status(|s| s.service_state = ServiceState::Inactive);
    api.set_status_delay(Duration::from_millis(100));
    poller.start();
    settle().await;
    tokio::time::advance(Duration::from_millis(100)).await;
    settle().await;
    assert_eq!(
        poller.last_known().unwrap().service_state,
        ServiceState::Inactive
    );

    // The first run's cycle lands now, carrying the old service state.
    tokio::time::advance(Duration::from_millis(400)).await;
    settle().await;
    assert_eq!(
        poller.last_known().unwrap().service_state,
        ServiceState::Inactive
    );

    tokio::time::advance(INTERVAL).await;
    settle().await;
    assert_eq!(api.count(|c| *c == ApiCall::FetchStatus), 3);
    assert!(matches!(rx.try_recv(), Err(TryRecvError::Empty)));
    poller.stop();
}

#[tokio::test(start_paused = true)]
async fn test_poll_once_after_restart_belongs_to_new_run() {
    let api = Arc::new(ScriptedDeviceApi::new());
    let poller = poller_over(&api);

    poller.start();
    settle().await;
    poller.stop();
    poller.start();
    settle().await;
    poller.stop();

    api.update_status(|s| s.service_state = ServiceState::Failed);
    assert!(matches!(poller.poll_once().await, PollOutcome::Changes(ref c) if c.len() == 1));
}

#[test]
fn test_diff_reports_fields_in_watch_order() {
    let previous = StatusSnapshot::default();
    let current = StatusSnapshot {
        service_state: ServiceState::Active,
        config_version: Some("v2".into()),
        available_profiles: vec!["alice".into()],
        ..Default::default()
    };
    let fields: Vec<WatchedField> = diff_status(&previous, &current, &WatchedField::ALL)
        .iter()
        .map(StatusChange::field)
        .collect();
    assert_eq!(
        fields,
        vec![
            WatchedField::ServiceState,
            WatchedField::ProfileList,
            WatchedField::ConfigVersion
        ]
    );
}
