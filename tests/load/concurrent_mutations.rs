//! Concurrent mutation tests
//!
//! These tests validate the busy flag within one client and last-write-wins
//! behavior across clients sharing a store.

use crate::fixtures::queue_state;
use futures::future::join_all;
use queue_display::clock::{Clock, ManualClock};
use queue_display::store::{MockQueueStore, QueueStore};
use queue_display::sync::QueueSyncClient;
use queue_display::types::MutationOutcome;
use std::sync::Arc;
use std::time::{Duration, Instant};

#[tokio::test]
async fn test_burst_on_one_client_applies_once() {
    let clock = Arc::new(ManualClock::default());
    let store = Arc::new(MockQueueStore::with_state(queue_state(0, clock.now())));
    store.set_latency(Some(Duration::from_millis(20)));
    let client = Arc::new(QueueSyncClient::new(store.clone(), clock));
    client.refresh().await.unwrap();

    let outcomes = join_all((1..=10).map(|n| {
        let client = client.clone();
        async move { client.mutate(n).await.unwrap() }
    }))
    .await;

    let applied = outcomes.iter().filter(|o| o.is_applied()).count();
    let busy = outcomes
        .iter()
        .filter(|o| matches!(o, MutationOutcome::Busy))
        .count();

    assert_eq!(applied, 1);
    assert_eq!(busy, 9);
    assert_eq!(store.upsert_calls(), 1);
    assert_eq!(store.history().len(), 1);
    assert!(!client.is_busy());
}

#[tokio::test]
async fn test_clients_race_and_last_write_wins() {
    let clock = Arc::new(ManualClock::default());
    let store = Arc::new(MockQueueStore::with_state(queue_state(0, clock.now())));

    let operators: Vec<Arc<QueueSyncClient>> = (0..8)
        .map(|_| Arc::new(QueueSyncClient::new(store.clone(), clock.clone())))
        .collect();
    for operator in &operators {
        operator.refresh().await.unwrap();
    }

    // Every operator saw 0 and increments from there; no version check
    let outcomes = join_all(operators.iter().map(|operator| {
        let operator = operator.clone();
        tokio::spawn(async move { operator.increment().await.unwrap() })
    }))
    .await;

    assert!(outcomes.into_iter().all(|o| o.unwrap().is_applied()));
    assert_eq!(store.state_row_count(), 1);
    assert_eq!(store.history().len(), 8);
    assert_eq!(
        store.fetch_latest_state().await.unwrap().unwrap().queue_number,
        1
    );
}

#[tokio::test]
async fn test_sequential_mutations_throughput() {
    let clock = Arc::new(ManualClock::default());
    let store = Arc::new(MockQueueStore::new());
    let client = QueueSyncClient::new(store.clone(), clock);
    client.refresh().await.unwrap();

    let start = Instant::now();
    for _ in 0..500 {
        assert!(client.increment().await.unwrap().is_applied());
    }
    let elapsed = start.elapsed();

    println!("500 in-memory mutations took {:?}", elapsed);
    assert_eq!(client.current_state().await.unwrap().queue_number, 500);
    assert_eq!(store.history().len(), 500);
    assert!(elapsed < Duration::from_secs(5));
}
