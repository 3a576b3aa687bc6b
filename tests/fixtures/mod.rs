//! Test fixtures and fake collaborators for integration testing

use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    routing::get,
    Json, Router,
};
use chrono::{DateTime, Utc};
use queue_display::auth::StaticAuthenticator;
use queue_display::clock::ManualClock;
use queue_display::config::AppConfig;
use queue_display::service::AppState;
use queue_display::store::QueueStore;
use queue_display::types::{QueueState, SINGLETON_QUEUE_ID};
use serde_json::Value;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;

pub const OPERATOR_EMAIL: &str = "operator@example.com";
pub const OPERATOR_PASSWORD: &str = "counter-42";
pub const API_KEY: &str = "test-anon-key";

/// State row as the store would return it
pub fn queue_state(number: u32, at: DateTime<Utc>) -> QueueState {
    QueueState {
        id: SINGLETON_QUEUE_ID.to_string(),
        queue_number: number,
        created_at: at,
        updated_at: at,
    }
}

/// Authenticator accepting the fixture operator credentials
pub fn operator_authenticator(clock: Arc<ManualClock>, ttl: Duration) -> StaticAuthenticator {
    let mut credentials = HashMap::new();
    credentials.insert(OPERATOR_EMAIL.to_string(), OPERATOR_PASSWORD.to_string());
    StaticAuthenticator::new(credentials, ttl, clock)
}

/// Fully wired application state over `store`, not yet started
pub fn test_app_state(store: Arc<dyn QueueStore>, clock: Arc<ManualClock>) -> Arc<AppState> {
    let authenticator = Arc::new(operator_authenticator(
        clock.clone(),
        Duration::from_secs(3600),
    ));

    Arc::new(
        AppState::with_components(AppConfig::default(), store, authenticator, clock)
            .expect("Failed to build app state"),
    )
}

/// One request received by the fake REST backend
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: &'static str,
    pub table: String,
    pub query: HashMap<String, String>,
    pub prefer: Option<String>,
    pub apikey: Option<String>,
    pub authorization: Option<String>,
    pub body: Option<Value>,
}

#[derive(Default)]
struct FakeBackendState {
    rows: Vec<Value>,
    history: Vec<Value>,
    requests: Vec<RecordedRequest>,
    fail_with: Option<StatusCode>,
}

/// Minimal PostgREST look-alike serving `/rest/v1/{table}` on a local port
pub struct FakeRestBackend {
    pub addr: SocketAddr,
    state: Arc<Mutex<FakeBackendState>>,
    handle: JoinHandle<()>,
}

type Shared = Arc<Mutex<FakeBackendState>>;

fn header(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

fn record(
    state: &Shared,
    method: &'static str,
    table: String,
    query: HashMap<String, String>,
    headers: &HeaderMap,
    body: Option<Value>,
) -> Option<StatusCode> {
    let mut state = state.lock().unwrap();
    state.requests.push(RecordedRequest {
        method,
        table,
        query,
        prefer: header(headers, "prefer"),
        apikey: header(headers, "apikey"),
        authorization: header(headers, "authorization"),
        body,
    });
    state.fail_with
}

async fn select_rows(
    State(state): State<Shared>,
    Path(table): Path<String>,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> Result<Json<Value>, StatusCode> {
    if let Some(status) = record(&state, "GET", table, query, &headers, None) {
        return Err(status);
    }

    let state = state.lock().unwrap();
    let latest = state
        .rows
        .iter()
        .max_by_key(|row| row["created_at"].as_str().unwrap_or_default().to_string())
        .cloned();
    Ok(Json(Value::Array(latest.into_iter().collect())))
}

async fn insert_rows(
    State(state): State<Shared>,
    Path(table): Path<String>,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> StatusCode {
    let upsert = query.get("on_conflict").is_some();
    if let Some(status) = record(&state, "POST", table, query, &headers, Some(body.clone())) {
        return status;
    }

    let mut state = state.lock().unwrap();
    if upsert {
        match state.rows.iter_mut().find(|row| row["id"] == body["id"]) {
            Some(row) => {
                row["queue_number"] = body["queue_number"].clone();
                row["updated_at"] = body["updated_at"].clone();
            }
            None => {
                let mut row = body.clone();
                row["created_at"] = body["updated_at"].clone();
                state.rows.push(row);
            }
        }
    } else {
        let mut row = body;
        row["id"] = Value::String(uuid::Uuid::new_v4().to_string());
        state.history.push(row);
    }
    StatusCode::CREATED
}

impl FakeRestBackend {
    /// Bind to an ephemeral local port and start serving
    pub async fn start() -> Self {
        let state: Shared = Arc::new(Mutex::new(FakeBackendState::default()));
        let router = Router::new()
            .route("/rest/v1/{table}", get(select_rows).post(insert_rows))
            .with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind fake backend");
        let addr = listener.local_addr().expect("No local address");
        let handle = tokio::spawn(async move {
            let _ = axum::serve(listener, router).await;
        });

        Self {
            addr,
            state,
            handle,
        }
    }

    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Seed a state row
    pub fn insert_row(&self, row: Value) {
        self.state.lock().unwrap().rows.push(row);
    }

    /// Make every subsequent request fail with `status`
    pub fn fail_with(&self, status: Option<StatusCode>) {
        self.state.lock().unwrap().fail_with = status;
    }

    pub fn rows(&self) -> Vec<Value> {
        self.state.lock().unwrap().rows.clone()
    }

    pub fn history(&self) -> Vec<Value> {
        self.state.lock().unwrap().history.clone()
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.state.lock().unwrap().requests.clone()
    }
}

impl Drop for FakeRestBackend {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
