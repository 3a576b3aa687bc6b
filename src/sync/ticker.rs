//! Display ticker
//!
//! Re-renders the wait estimate from the cached state on a short wall-clock
//! period, so the countdown moves between data refreshes.

use crate::metrics::MetricsCollector;
use crate::sync::client::{QueueSyncClient, SyncSnapshot};
use crate::wait_time::{EstimatedTimeCalculator, Freshness, WaitEstimate};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::debug;

/// Default re-render period
pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_secs(1);

/// Longest accepted re-render period
pub const MAX_TICK_INTERVAL: Duration = Duration::from_secs(60);

/// Everything a display shows at one instant
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DisplayFrame {
    pub queue_number: Option<u32>,
    pub estimate: WaitEstimate,
    pub estimate_text: String,
    pub freshness: Freshness,
    pub is_loading: bool,
    pub last_error: Option<String>,
    pub updated_at: Option<DateTime<Utc>>,
    pub created_at: Option<DateTime<Utc>>,
    pub rendered_at: DateTime<Utc>,
}

impl DisplayFrame {
    /// Render `snapshot` as of `now`
    pub fn render(
        snapshot: &SyncSnapshot,
        calculator: &dyn EstimatedTimeCalculator,
        now: DateTime<Utc>,
    ) -> Self {
        let state = snapshot.current_state.as_ref();
        let estimate = calculator.estimate_state(state, now);

        Self {
            queue_number: state.map(|s| s.queue_number),
            estimate,
            estimate_text: estimate.to_string(),
            freshness: Freshness::of(state, now),
            is_loading: snapshot.is_loading,
            last_error: snapshot.last_error.clone(),
            updated_at: state.map(|s| s.updated_at),
            created_at: state.map(|s| s.created_at),
            rendered_at: now,
        }
    }
}

/// Background task publishing a fresh `DisplayFrame` every tick
pub struct DisplayTicker {
    receiver: watch::Receiver<DisplayFrame>,
    handle: JoinHandle<()>,
}

impl DisplayTicker {
    /// Render the first frame immediately, then every `period`
    /// (clamped to 1ms..=`MAX_TICK_INTERVAL`)
    pub async fn spawn(
        client: Arc<QueueSyncClient>,
        calculator: Arc<dyn EstimatedTimeCalculator>,
        period: Duration,
        metrics: Option<Arc<MetricsCollector>>,
    ) -> Self {
        let period = period.clamp(Duration::from_millis(1), MAX_TICK_INTERVAL);
        let clock = client.clock();
        let first =
            DisplayFrame::render(&client.snapshot().await, calculator.as_ref(), clock.now());
        let (sender, receiver) = watch::channel(first);
        let start = Instant::now() + period;

        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval_at(start, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                interval.tick().await;

                let snapshot = client.snapshot().await;
                let frame = DisplayFrame::render(&snapshot, calculator.as_ref(), clock.now());
                if let Some(metrics) = &metrics {
                    metrics.set_estimated_wait_minutes(frame.estimate.remaining_minutes());
                }
                debug!("Display tick: {}", frame.estimate_text);
                sender.send_replace(frame);
            }
        });

        Self { receiver, handle }
    }

    /// Receiver notified on every new frame
    pub fn subscribe(&self) -> watch::Receiver<DisplayFrame> {
        self.receiver.clone()
    }

    /// Most recently rendered frame
    pub fn latest(&self) -> DisplayFrame {
        self.receiver.borrow().clone()
    }

    pub fn is_running(&self) -> bool {
        !self.handle.is_finished()
    }

    pub fn stop(&self) {
        self.handle.abort();
    }
}

impl Drop for DisplayTicker {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
