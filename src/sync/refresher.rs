//! Periodic autorefresh for passive viewers
//!
//! Operator clients do not run this; they refresh after each mutation.

use crate::sync::client::QueueSyncClient;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info};

/// Default polling period for viewers
pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(30);

/// Longest accepted polling period
pub const MAX_REFRESH_INTERVAL: Duration = Duration::from_secs(24 * 60 * 60);

/// Background task calling `refresh()` on a fixed period.
///
/// The first refresh happens one period after spawning; callers perform the
/// initial fetch themselves. Dropping the handle stops the timer, but a fetch
/// already in flight runs to completion.
pub struct AutoRefresher {
    handle: JoinHandle<()>,
    period: Duration,
}

impl AutoRefresher {
    /// Start refreshing `client` every `period`, clamped to 1ms..=`MAX_REFRESH_INTERVAL`
    pub fn spawn(client: Arc<QueueSyncClient>, period: Duration) -> Self {
        let period = period.clamp(Duration::from_millis(1), MAX_REFRESH_INTERVAL);
        let start = Instant::now() + period;

        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval_at(start, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            info!("Autorefresh started ({}s interval)", period.as_secs());

            loop {
                interval.tick().await;
                // Failures are already recorded in the client's last_error
                if client.refresh().await.is_ok() {
                    debug!("Autorefresh completed");
                }
            }
        });

        Self { handle, period }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    pub fn is_running(&self) -> bool {
        !self.handle.is_finished()
    }

    /// Stop the timer
    pub fn stop(&self) {
        if !self.handle.is_finished() {
            info!("Autorefresh stopped");
        }
        self.handle.abort();
    }
}

impl Drop for AutoRefresher {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
