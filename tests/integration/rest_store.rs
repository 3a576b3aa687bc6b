//! REST store against a local PostgREST look-alike

use crate::fixtures::{FakeRestBackend, API_KEY};
use axum::http::StatusCode;
use chrono::{TimeZone, Utc};
use queue_display::clock::ManualClock;
use queue_display::store::{QueueStore, RestQueueStore, RestStoreConfig};
use queue_display::sync::QueueSyncClient;
use queue_display::types::{NewHistoryEntry, QueueAction, QueueStateUpdate, SINGLETON_QUEUE_ID};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

fn rest_store(backend: &FakeRestBackend) -> RestQueueStore {
    RestQueueStore::new(RestStoreConfig {
        url: backend.url(),
        api_key: API_KEY.to_string(),
        state_table: "queue".to_string(),
        history_table: "queue_history".to_string(),
        request_timeout: Duration::from_secs(5),
    })
    .expect("Failed to build REST store")
}

#[tokio::test]
async fn test_empty_table_is_no_rows() {
    let backend = FakeRestBackend::start().await;
    let store = rest_store(&backend);

    assert!(store.fetch_latest_state().await.unwrap().is_none());

    let requests = backend.requests();
    assert_eq!(requests.len(), 1);
    let request = &requests[0];
    assert_eq!(request.method, "GET");
    assert_eq!(request.table, "queue");
    assert_eq!(request.query.get("select").map(String::as_str), Some("*"));
    assert_eq!(
        request.query.get("order").map(String::as_str),
        Some("created_at.desc")
    );
    assert_eq!(request.query.get("limit").map(String::as_str), Some("1"));
    assert_eq!(request.apikey.as_deref(), Some(API_KEY));
    assert_eq!(
        request.authorization.as_deref(),
        Some(format!("Bearer {}", API_KEY).as_str())
    );
}

#[tokio::test]
async fn test_fetch_parses_latest_row() {
    let backend = FakeRestBackend::start().await;
    backend.insert_row(json!({
        "id": SINGLETON_QUEUE_ID,
        "queue_number": 8,
        "created_at": "2024-03-01T09:00:00+00:00",
        "updated_at": "2024-03-01T11:30:00.123+00:00"
    }));
    let store = rest_store(&backend);

    let state = store.fetch_latest_state().await.unwrap().unwrap();
    assert_eq!(state.id, SINGLETON_QUEUE_ID);
    assert_eq!(state.queue_number, 8);
    assert_eq!(
        state.created_at,
        Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap()
    );
}

#[tokio::test]
async fn test_upsert_and_history_request_shapes() {
    let backend = FakeRestBackend::start().await;
    let store = rest_store(&backend);
    let at = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();

    store
        .append_history(NewHistoryEntry {
            queue_number: 1,
            action: QueueAction::Increment,
            created_at: at,
        })
        .await
        .unwrap();
    store
        .upsert_state(QueueStateUpdate {
            id: SINGLETON_QUEUE_ID.to_string(),
            queue_number: 1,
            updated_at: at,
        })
        .await
        .unwrap();

    let requests = backend.requests();
    assert_eq!(requests.len(), 2);

    let history = &requests[0];
    assert_eq!(history.table, "queue_history");
    assert!(history.query.get("on_conflict").is_none());
    assert_eq!(history.body.as_ref().unwrap()["action"], "increment");

    let upsert = &requests[1];
    assert_eq!(upsert.table, "queue");
    assert_eq!(upsert.query.get("on_conflict").map(String::as_str), Some("id"));
    assert!(upsert
        .prefer
        .as_deref()
        .unwrap()
        .contains("resolution=merge-duplicates"));
    assert_eq!(upsert.body.as_ref().unwrap()["id"], SINGLETON_QUEUE_ID);

    assert_eq!(backend.rows().len(), 1);
    assert_eq!(backend.history().len(), 1);
}

#[tokio::test]
async fn test_server_errors_become_store_errors() {
    let backend = FakeRestBackend::start().await;
    backend.fail_with(Some(StatusCode::SERVICE_UNAVAILABLE));
    let store = rest_store(&backend);

    let err = store.fetch_latest_state().await.unwrap_err();
    assert!(format!("{:#}", err).contains("503"));
}

#[tokio::test]
async fn test_sync_client_over_rest() {
    let backend = FakeRestBackend::start().await;
    let store = Arc::new(rest_store(&backend));
    let client = QueueSyncClient::new(store, Arc::new(ManualClock::default()));

    assert_eq!(client.refresh().await.unwrap().queue_number, 0);
    assert!(client.increment().await.unwrap().is_applied());
    assert!(client.increment().await.unwrap().is_applied());

    assert_eq!(client.current_state().await.unwrap().queue_number, 2);
    assert_eq!(backend.rows().len(), 1);
    assert_eq!(backend.rows()[0]["queue_number"], 2);
    assert_eq!(backend.history().len(), 2);

    backend.fail_with(Some(StatusCode::INTERNAL_SERVER_ERROR));
    assert!(client.increment().await.is_err());
    assert_eq!(client.current_state().await.unwrap().queue_number, 2);
    assert!(client
        .last_error()
        .await
        .unwrap()
        .starts_with("Failed to update queue"));
}
