//! Queue store interface and in-process implementations
//!
//! The store owns the singleton state row and the append-only history log.
//! Everything else only ever holds a cached copy.

use crate::types::{NewHistoryEntry, QueueHistoryEntry, QueueState, QueueStateUpdate};
use crate::utils::generate_id;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::RwLock;
use std::time::Duration;
use tracing::debug;

/// Trait for the backing store of the queue
#[async_trait]
pub trait QueueStore: Send + Sync {
    /// Most recently created state row, `None` when the table is empty
    async fn fetch_latest_state(&self) -> crate::error::Result<Option<QueueState>>;

    /// Insert or replace the state row with `update.id`, keeping its `created_at`
    async fn upsert_state(&self, update: QueueStateUpdate) -> crate::error::Result<()>;

    /// Append one history entry
    async fn append_history(&self, entry: NewHistoryEntry) -> crate::error::Result<()>;

    /// Short backend name for logs and health output
    fn backend_name(&self) -> &'static str;
}

/// In-memory queue store implementation
#[derive(Debug, Default)]
pub struct InMemoryQueueStore {
    states: RwLock<HashMap<String, QueueState>>,
    history: RwLock<Vec<QueueHistoryEntry>>,
}

impl InMemoryQueueStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store that already holds `state`
    pub fn with_state(state: QueueState) -> Self {
        let store = Self::new();
        if let Ok(mut states) = store.states.write() {
            states.insert(state.id.clone(), state);
        }
        store
    }

    /// Snapshot of the history log, oldest first
    pub fn history(&self) -> crate::error::Result<Vec<QueueHistoryEntry>> {
        let history = self
            .history
            .read()
            .map_err(|_| crate::error::QueueError::InternalError {
                message: "Failed to acquire history read lock".to_string(),
            })?;

        Ok(history.clone())
    }

    /// Number of state rows (always 0 or 1 when writers use the singleton id)
    pub fn state_row_count(&self) -> crate::error::Result<usize> {
        let states = self
            .states
            .read()
            .map_err(|_| crate::error::QueueError::InternalError {
                message: "Failed to acquire state read lock".to_string(),
            })?;

        Ok(states.len())
    }
}

#[async_trait]
impl QueueStore for InMemoryQueueStore {
    async fn fetch_latest_state(&self) -> crate::error::Result<Option<QueueState>> {
        let states = self
            .states
            .read()
            .map_err(|_| crate::error::QueueError::InternalError {
                message: "Failed to acquire state read lock".to_string(),
            })?;

        Ok(states.values().max_by_key(|s| s.created_at).cloned())
    }

    async fn upsert_state(&self, update: QueueStateUpdate) -> crate::error::Result<()> {
        let mut states = self
            .states
            .write()
            .map_err(|_| crate::error::QueueError::InternalError {
                message: "Failed to acquire state write lock".to_string(),
            })?;

        match states.get_mut(&update.id) {
            Some(existing) => {
                existing.queue_number = update.queue_number;
                existing.updated_at = update.updated_at;
            }
            None => {
                let state = QueueState {
                    id: update.id.clone(),
                    queue_number: update.queue_number,
                    created_at: update.updated_at,
                    updated_at: update.updated_at,
                };
                states.insert(update.id.clone(), state);
            }
        }

        debug!(
            "Upserted queue state {} -> {}",
            update.id, update.queue_number
        );
        Ok(())
    }

    async fn append_history(&self, entry: NewHistoryEntry) -> crate::error::Result<()> {
        let mut history = self
            .history
            .write()
            .map_err(|_| crate::error::QueueError::InternalError {
                message: "Failed to acquire history write lock".to_string(),
            })?;

        history.push(QueueHistoryEntry {
            id: generate_id(),
            queue_number: entry.queue_number,
            action: entry.action,
            created_at: entry.created_at,
        });

        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}

/// Mock queue store for testing: an in-memory store with switchable
/// failures, call counters and an optional artificial latency
#[derive(Debug, Default)]
pub struct MockQueueStore {
    inner: InMemoryQueueStore,
    fail_fetch: AtomicBool,
    fail_upsert: AtomicBool,
    fail_history: AtomicBool,
    fetch_calls: AtomicUsize,
    upsert_calls: AtomicUsize,
    history_calls: AtomicUsize,
    latency: RwLock<Option<Duration>>,
}

impl MockQueueStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_state(state: QueueState) -> Self {
        Self {
            inner: InMemoryQueueStore::with_state(state),
            ..Self::default()
        }
    }

    pub fn set_fail_fetch(&self, fail: bool) {
        self.fail_fetch.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_upsert(&self, fail: bool) {
        self.fail_upsert.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_history(&self, fail: bool) {
        self.fail_history.store(fail, Ordering::SeqCst);
    }

    /// Delay every store call by `latency`
    pub fn set_latency(&self, latency: Option<Duration>) {
        if let Ok(mut current) = self.latency.write() {
            *current = latency;
        }
    }

    pub fn fetch_calls(&self) -> usize {
        self.fetch_calls.load(Ordering::SeqCst)
    }

    pub fn upsert_calls(&self) -> usize {
        self.upsert_calls.load(Ordering::SeqCst)
    }

    pub fn history_calls(&self) -> usize {
        self.history_calls.load(Ordering::SeqCst)
    }

    /// Total number of store calls of any kind
    pub fn total_calls(&self) -> usize {
        self.fetch_calls() + self.upsert_calls() + self.history_calls()
    }

    pub fn history(&self) -> Vec<QueueHistoryEntry> {
        self.inner.history().unwrap_or_default()
    }

    pub fn state_row_count(&self) -> usize {
        self.inner.state_row_count().unwrap_or_default()
    }

    async fn simulate_latency(&self) {
        let latency = self.latency.read().ok().and_then(|l| *l);
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
    }
}

#[async_trait]
impl QueueStore for MockQueueStore {
    async fn fetch_latest_state(&self) -> crate::error::Result<Option<QueueState>> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        self.simulate_latency().await;
        if self.fail_fetch.load(Ordering::SeqCst) {
            anyhow::bail!("simulated fetch failure");
        }
        self.inner.fetch_latest_state().await
    }

    async fn upsert_state(&self, update: QueueStateUpdate) -> crate::error::Result<()> {
        self.upsert_calls.fetch_add(1, Ordering::SeqCst);
        self.simulate_latency().await;
        if self.fail_upsert.load(Ordering::SeqCst) {
            anyhow::bail!("simulated upsert failure");
        }
        self.inner.upsert_state(update).await
    }

    async fn append_history(&self, entry: NewHistoryEntry) -> crate::error::Result<()> {
        self.history_calls.fetch_add(1, Ordering::SeqCst);
        self.simulate_latency().await;
        if self.fail_history.load(Ordering::SeqCst) {
            anyhow::bail!("simulated history insert failure");
        }
        self.inner.append_history(entry).await
    }

    fn backend_name(&self) -> &'static str {
        "mock"
    }
}
