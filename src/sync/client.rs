//! Queue synchronization client
//!
//! Holds the latest known queue state for one display or operator session and
//! performs mutations against the backing store. The cache is only ever
//! replaced by a successful refresh; a failed call leaves it untouched and
//! records a user-visible message in `last_error` instead.

use crate::clock::Clock;
use crate::error::QueueError;
use crate::metrics::MetricsCollector;
use crate::store::QueueStore;
use crate::types::{
    MutationOutcome, NewHistoryEntry, QueueAction, QueueState, QueueStateUpdate,
    SINGLETON_QUEUE_ID,
};
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

/// Point-in-time view of the client
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncSnapshot {
    pub current_state: Option<QueueState>,
    pub is_loading: bool,
    pub last_error: Option<String>,
}

/// Client keeping a cached copy of the queue state in sync with the store
pub struct QueueSyncClient {
    store: Arc<dyn QueueStore>,
    clock: Arc<dyn Clock>,
    metrics: Option<Arc<MetricsCollector>>,
    state: RwLock<SyncSnapshot>,
    busy: AtomicBool,
}

/// Clears the busy flag when a mutation ends, however it ends
struct BusyGuard<'a>(&'a AtomicBool);

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl QueueSyncClient {
    /// Create a client with an empty cache; it reports loading until the first refresh
    pub fn new(store: Arc<dyn QueueStore>, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            clock,
            metrics: None,
            state: RwLock::new(SyncSnapshot {
                current_state: None,
                is_loading: true,
                last_error: None,
            }),
            busy: AtomicBool::new(false),
        }
    }

    /// Create a client seeded with a state fetched elsewhere (e.g. at page render)
    pub fn with_initial_state(
        store: Arc<dyn QueueStore>,
        clock: Arc<dyn Clock>,
        initial: QueueState,
    ) -> Self {
        Self {
            state: RwLock::new(SyncSnapshot {
                current_state: Some(initial),
                is_loading: false,
                last_error: None,
            }),
            ..Self::new(store, clock)
        }
    }

    /// Attach a metrics collector
    pub fn with_metrics(mut self, metrics: Arc<MetricsCollector>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn clock(&self) -> Arc<dyn Clock> {
        self.clock.clone()
    }

    pub fn store(&self) -> Arc<dyn QueueStore> {
        self.store.clone()
    }

    pub async fn snapshot(&self) -> SyncSnapshot {
        self.state.read().await.clone()
    }

    pub async fn current_state(&self) -> Option<QueueState> {
        self.state.read().await.current_state.clone()
    }

    pub async fn is_loading(&self) -> bool {
        self.state.read().await.is_loading
    }

    pub async fn last_error(&self) -> Option<String> {
        self.state.read().await.last_error.clone()
    }

    /// Whether a mutation from this client is in flight
    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    /// Fetch the singleton state from the store and replace the cache.
    ///
    /// An empty store yields a synthesized zero state rather than an error.
    pub async fn refresh(&self) -> crate::error::Result<QueueState> {
        self.state.write().await.is_loading = true;

        let result = self.fetch().await;

        let mut state = self.state.write().await;
        state.is_loading = false;
        match result {
            Ok(fetched) => {
                if let Some(metrics) = &self.metrics {
                    metrics.set_queue_number(fetched.queue_number);
                }
                state.current_state = Some(fetched.clone());
                state.last_error = None;
                Ok(fetched)
            }
            Err(e) => {
                warn!("Queue refresh failed: {}", e);
                state.last_error = Some(e.to_string());
                Err(e.into())
            }
        }
    }

    async fn fetch(&self) -> Result<QueueState, QueueError> {
        let started = Instant::now();
        let result = self.store.fetch_latest_state().await;
        self.observe("fetch", started);

        match result {
            Ok(Some(state)) => {
                debug!("Fetched queue state: {}", state.queue_number);
                self.record_refresh("success");
                Ok(state)
            }
            Ok(None) => {
                debug!("No queue state stored yet, using zero state");
                self.record_refresh("empty");
                Ok(QueueState::zero(self.clock.now()))
            }
            Err(e) => {
                self.record_refresh("error");
                Err(QueueError::FetchFailed {
                    message: format!("{:#}", e),
                })
            }
        }
    }

    /// Set the queue to `new_number`.
    ///
    /// Out-of-range targets are rejected without contacting the store, and a
    /// call made while another mutation is in flight returns `Busy`.
    pub async fn mutate(&self, new_number: i64) -> crate::error::Result<MutationOutcome> {
        self.mutate_from(|_| u32::try_from(new_number).map_err(|_| new_number)).await
    }

    /// Claim the busy flag, then compute the target from the cached number.
    ///
    /// `target` returns `Err(requested)` for a value that must not be written.
    async fn mutate_from<F>(&self, target: F) -> crate::error::Result<MutationOutcome>
    where
        F: FnOnce(u32) -> Result<u32, i64>,
    {
        if self
            .busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!("Queue mutation skipped: client busy");
            self.record_mutation(None, "busy");
            return Ok(MutationOutcome::Busy);
        }
        let _busy = BusyGuard(&self.busy);

        let (cached, target) = {
            let mut state = self.state.write().await;
            let current = state.current_state.as_ref().map_or(0, |s| s.queue_number);
            match target(current) {
                Ok(target) => {
                    state.is_loading = true;
                    (state.current_state.clone(), target)
                }
                Err(requested) => {
                    debug!("Rejected queue mutation to {}", requested);
                    self.record_mutation(None, "rejected");
                    return Ok(MutationOutcome::Rejected { requested });
                }
            }
        };
        let action = QueueAction::derive(cached.as_ref().map(|s| s.queue_number), target);

        if let Err(e) = self.write(target, action, cached.as_ref()).await {
            warn!("Queue mutation to {} failed: {}", target, e);
            self.record_mutation(Some(action), "error");
            let mut state = self.state.write().await;
            state.is_loading = false;
            state.last_error = Some(e.to_string());
            return Err(e.into());
        }

        match self.refresh().await {
            Ok(state) => {
                info!("Queue set to {} ({})", state.queue_number, action);
                self.record_mutation(Some(action), "applied");
                Ok(MutationOutcome::Applied { state })
            }
            Err(e) => {
                self.record_mutation(Some(action), "error");
                Err(e)
            }
        }
    }

    async fn write(
        &self,
        target: u32,
        action: QueueAction,
        cached: Option<&QueueState>,
    ) -> Result<(), QueueError> {
        let now = self.clock.now();

        let started = Instant::now();
        let appended = self
            .store
            .append_history(NewHistoryEntry {
                queue_number: target,
                action,
                created_at: now,
            })
            .await;
        self.observe("append_history", started);
        appended.map_err(|e| QueueError::MutationFailed {
            message: format!("{:#}", e),
        })?;

        let update = QueueStateUpdate {
            id: cached
                .map(|s| s.id.clone())
                .unwrap_or_else(|| SINGLETON_QUEUE_ID.to_string()),
            queue_number: target,
            updated_at: next_update_timestamp(now, cached.map(|s| s.updated_at)),
        };

        let started = Instant::now();
        let upserted = self.store.upsert_state(update).await;
        self.observe("upsert_state", started);
        upserted.map_err(|e| QueueError::MutationFailed {
            message: format!("{:#}", e),
        })
    }

    /// Add one person
    pub async fn increment(&self) -> crate::error::Result<MutationOutcome> {
        self.mutate_from(|current| {
            current
                .checked_add(1)
                .ok_or_else(|| i64::from(current) + 1)
        })
        .await
    }

    /// Remove one person; rejected when the queue is already empty
    pub async fn decrement(&self) -> crate::error::Result<MutationOutcome> {
        self.mutate_from(|current| current.checked_sub(1).ok_or(-1)).await
    }

    /// Empty the queue; rejected when it is already empty
    pub async fn reset(&self) -> crate::error::Result<MutationOutcome> {
        self.mutate_from(|current| if current == 0 { Err(0) } else { Ok(0) }).await
    }

    fn observe(&self, operation: &str, started: Instant) {
        if let Some(metrics) = &self.metrics {
            metrics.record_store_operation(operation, started.elapsed());
        }
    }

    fn record_refresh(&self, outcome: &str) {
        if let Some(metrics) = &self.metrics {
            metrics.record_refresh(outcome);
        }
    }

    fn record_mutation(&self, action: Option<QueueAction>, outcome: &str) {
        if let Some(metrics) = &self.metrics {
            metrics.record_mutation(action, outcome);
        }
    }
}

/// Timestamp for the next write: the clock time, bumped past `previous` if
/// the clock has not moved beyond it
pub fn next_update_timestamp(now: DateTime<Utc>, previous: Option<DateTime<Utc>>) -> DateTime<Utc> {
    match previous {
        Some(previous) if now <= previous => previous + ChronoDuration::milliseconds(1),
        _ => now,
    }
}
