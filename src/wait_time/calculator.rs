//! Estimated wait time calculation
//!
//! The estimate is a countdown: each waiting person adds a fixed number of
//! minutes, and every whole minute since the last queue change is subtracted.
//! It depends only on the cached state and the wall clock, so callers can
//! re-evaluate it on every tick without touching the store.

use crate::types::QueueState;
use crate::utils::elapsed_minutes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Default service time per waiting person
pub const DEFAULT_MINUTES_PER_PERSON: u64 = 10;

pub const SLOT_AVAILABLE_MESSAGE: &str = "Slot available";
pub const READY_FOR_SERVICE_MESSAGE: &str = "Ready for service";

/// Configuration for wait time calculations
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WaitTimeConfig {
    /// Minutes of service time each waiting person adds
    pub minutes_per_person: u64,
}

impl Default for WaitTimeConfig {
    fn default() -> Self {
        Self {
            minutes_per_person: DEFAULT_MINUTES_PER_PERSON,
        }
    }
}

impl WaitTimeConfig {
    /// Validate configuration values
    pub fn validate(&self) -> crate::error::Result<()> {
        if self.minutes_per_person == 0 {
            return Err(crate::error::QueueError::ConfigurationError {
                message: "minutes_per_person must be greater than 0".to_string(),
            }
            .into());
        }

        Ok(())
    }
}

/// A rendered wait estimate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "minutes", rename_all = "snake_case")]
pub enum WaitEstimate {
    /// Nobody is waiting
    SlotAvailable,
    /// The countdown has run out
    ReadyForService,
    /// Minutes still to wait (always > 0)
    Remaining(u64),
}

impl WaitEstimate {
    /// Remaining minutes, zero for the terminal states
    pub fn remaining_minutes(&self) -> u64 {
        match self {
            WaitEstimate::Remaining(minutes) => *minutes,
            _ => 0,
        }
    }
}

impl std::fmt::Display for WaitEstimate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WaitEstimate::SlotAvailable => write!(f, "{}", SLOT_AVAILABLE_MESSAGE),
            WaitEstimate::ReadyForService => write!(f, "{}", READY_FOR_SERVICE_MESSAGE),
            WaitEstimate::Remaining(minutes) if *minutes < 60 => write!(f, "~{} minutes", minutes),
            WaitEstimate::Remaining(minutes) => {
                write!(f, "~{} hours {} minutes", minutes / 60, minutes % 60)
            }
        }
    }
}

/// Trait for calculating wait estimates
pub trait EstimatedTimeCalculator: Send + Sync {
    /// Estimate the wait for `queue_number` people given the last change time
    fn estimate(
        &self,
        queue_number: u32,
        updated_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> WaitEstimate;

    /// Estimate for an optional cached state; nothing fetched yet means nobody waits
    fn estimate_state(&self, state: Option<&QueueState>, now: DateTime<Utc>) -> WaitEstimate {
        match state {
            Some(state) => self.estimate(state.queue_number, state.updated_at, now),
            None => WaitEstimate::SlotAvailable,
        }
    }

    /// Get the current configuration
    fn config(&self) -> &WaitTimeConfig;

    /// Update the configuration
    fn update_config(&mut self, config: WaitTimeConfig) -> crate::error::Result<()>;
}

/// Countdown calculator with a fixed service rate per person
#[derive(Debug, Clone)]
pub struct FixedRateCalculator {
    config: WaitTimeConfig,
}

impl FixedRateCalculator {
    /// Create a new fixed rate calculator
    pub fn new(config: WaitTimeConfig) -> crate::error::Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }
}

impl Default for FixedRateCalculator {
    fn default() -> Self {
        Self {
            config: WaitTimeConfig::default(),
        }
    }
}

impl EstimatedTimeCalculator for FixedRateCalculator {
    fn estimate(
        &self,
        queue_number: u32,
        updated_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> WaitEstimate {
        if queue_number == 0 {
            return WaitEstimate::SlotAvailable;
        }

        let base_minutes = u64::from(queue_number).saturating_mul(self.config.minutes_per_person);
        let elapsed = elapsed_minutes(updated_at, now);
        let remaining = base_minutes.saturating_sub(elapsed);

        debug!(
            "Estimated wait: base={}m elapsed={}m remaining={}m",
            base_minutes, elapsed, remaining
        );

        if remaining == 0 {
            WaitEstimate::ReadyForService
        } else {
            WaitEstimate::Remaining(remaining)
        }
    }

    fn config(&self) -> &WaitTimeConfig {
        &self.config
    }

    fn update_config(&mut self, config: WaitTimeConfig) -> crate::error::Result<()> {
        config.validate()?;
        self.config = config;
        Ok(())
    }
}
