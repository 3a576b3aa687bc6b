//! End-to-end queue lifecycle across viewer and operator clients

use crate::fixtures::queue_state;
use chrono::Duration as ChronoDuration;
use queue_display::clock::{Clock, ManualClock};
use queue_display::store::{InMemoryQueueStore, MockQueueStore, QueueStore};
use queue_display::sync::{AutoRefresher, DisplayFrame, QueueSyncClient};
use queue_display::types::{MutationOutcome, QueueAction};
use queue_display::wait_time::FixedRateCalculator;
use std::sync::Arc;
use std::time::Duration;
use tokio_test::assert_ok;

fn clients(
    store: Arc<dyn QueueStore>,
    clock: Arc<ManualClock>,
) -> (Arc<QueueSyncClient>, Arc<QueueSyncClient>) {
    (
        Arc::new(QueueSyncClient::new(store.clone(), clock.clone())),
        Arc::new(QueueSyncClient::new(store, clock)),
    )
}

#[tokio::test]
async fn test_operator_day_from_empty_store() {
    let store = Arc::new(InMemoryQueueStore::new());
    let clock = Arc::new(ManualClock::default());
    let (viewer, operator) = clients(store.clone(), clock.clone());

    // Empty store: both clients see a synthesized zero state
    assert_eq!(assert_ok!(viewer.refresh().await).queue_number, 0);
    assert_eq!(assert_ok!(operator.refresh().await).queue_number, 0);
    assert!(store.fetch_latest_state().await.unwrap().is_none());

    for _ in 0..3 {
        assert!(assert_ok!(operator.increment().await).is_applied());
    }
    assert!(assert_ok!(operator.decrement().await).is_applied());
    assert!(assert_ok!(operator.mutate(5).await).is_applied());
    assert!(assert_ok!(operator.reset().await).is_applied());

    let actions: Vec<(u32, QueueAction)> = store
        .history()
        .unwrap()
        .into_iter()
        .map(|e| (e.queue_number, e.action))
        .collect();
    assert_eq!(
        actions,
        vec![
            (1, QueueAction::Increment),
            (2, QueueAction::Increment),
            (3, QueueAction::Increment),
            (2, QueueAction::Decrement),
            (5, QueueAction::Increment),
            (0, QueueAction::Decrement),
        ]
    );
    assert_eq!(store.state_row_count().unwrap(), 1);

    // Resetting an empty queue is refused, but an explicit same-value write still logs
    assert_eq!(
        assert_ok!(operator.reset().await),
        MutationOutcome::Rejected { requested: 0 }
    );
    assert_eq!(store.history().unwrap().len(), 6);
    assert!(assert_ok!(operator.mutate(0).await).is_applied());
    assert_eq!(store.history().unwrap().last().unwrap().action, QueueAction::Reset);

    // The clock never moved, yet every write advanced updated_at
    let state = assert_ok!(viewer.refresh().await);
    assert_eq!(state.queue_number, 0);
    assert_eq!(
        state.updated_at,
        clock.now() + ChronoDuration::milliseconds(7)
    );
}

#[tokio::test]
async fn test_viewer_estimate_follows_operator_writes() {
    let clock = Arc::new(ManualClock::default());
    let store = Arc::new(InMemoryQueueStore::with_state(queue_state(0, clock.now())));
    let (viewer, operator) = clients(store, clock.clone());
    let calculator = FixedRateCalculator::default();

    operator.refresh().await.unwrap();
    clock.advance(ChronoDuration::seconds(1));
    operator.mutate(3).await.unwrap();
    viewer.refresh().await.unwrap();

    let frame = DisplayFrame::render(&viewer.snapshot().await, &calculator, clock.now());
    assert_eq!(frame.queue_number, Some(3));
    assert_eq!(frame.estimate_text, "~30 minutes");

    clock.advance(ChronoDuration::minutes(29));
    let frame = DisplayFrame::render(&viewer.snapshot().await, &calculator, clock.now());
    assert_eq!(frame.estimate_text, "~1 minutes");

    clock.advance(ChronoDuration::minutes(5));
    let frame = DisplayFrame::render(&viewer.snapshot().await, &calculator, clock.now());
    assert_eq!(frame.estimate_text, "Ready for service");
}

#[tokio::test]
async fn test_outage_and_manual_recovery() {
    let clock = Arc::new(ManualClock::default());
    let store = Arc::new(MockQueueStore::with_state(queue_state(4, clock.now())));
    let viewer = QueueSyncClient::new(store.clone(), clock.clone());

    viewer.refresh().await.unwrap();
    store.set_fail_fetch(true);

    assert!(viewer.refresh().await.is_err());
    let snapshot = viewer.snapshot().await;
    assert_eq!(snapshot.current_state.unwrap().queue_number, 4);
    assert!(!snapshot.is_loading);
    assert!(snapshot
        .last_error
        .unwrap()
        .starts_with("Failed to fetch queue state"));

    // No automatic retry: the error stays until someone refreshes again
    store.set_fail_fetch(false);
    assert!(viewer.last_error().await.is_some());
    viewer.refresh().await.unwrap();
    assert!(viewer.last_error().await.is_none());
}

#[tokio::test]
async fn test_rejected_values_never_reach_the_store() {
    let store = Arc::new(MockQueueStore::new());
    let operator = QueueSyncClient::new(store.clone(), Arc::new(ManualClock::default()));
    operator.refresh().await.unwrap();
    let calls_before = store.total_calls();

    for value in [-1, -100, i64::from(u32::MAX) + 1] {
        let outcome = operator.mutate(value).await.unwrap();
        assert_eq!(outcome, MutationOutcome::Rejected { requested: value });
    }

    // Decrement at zero is a rejected -1
    assert_eq!(
        operator.decrement().await.unwrap(),
        MutationOutcome::Rejected { requested: -1 }
    );
    assert_eq!(store.total_calls(), calls_before);
    assert!(operator.last_error().await.is_none());
}

#[tokio::test(start_paused = true)]
async fn test_autorefresh_keeps_viewer_in_step() {
    let clock = Arc::new(ManualClock::default());
    let store = Arc::new(MockQueueStore::with_state(queue_state(1, clock.now())));
    let (viewer, operator) = clients(store.clone(), clock);

    viewer.refresh().await.unwrap();
    operator.refresh().await.unwrap();
    let refresher = AutoRefresher::spawn(viewer.clone(), Duration::from_secs(30));

    operator.mutate(9).await.unwrap();
    assert_eq!(viewer.current_state().await.unwrap().queue_number, 1);

    tokio::time::sleep(Duration::from_secs(31)).await;
    assert_eq!(viewer.current_state().await.unwrap().queue_number, 9);

    refresher.stop();
}
