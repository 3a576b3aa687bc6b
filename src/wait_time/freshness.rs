//! Staleness reporting for the displayed queue state
//!
//! Viewers are told how long ago the operator last touched the queue, and a
//! coarse status so a display can flag data nobody has updated for a while.

use crate::types::QueueState;
use crate::utils::elapsed_minutes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Below this many minutes the state counts as fresh
pub const FRESH_THRESHOLD_MINUTES: u64 = 2;
/// Below this many minutes the state counts as recent
pub const RECENT_THRESHOLD_MINUTES: u64 = 10;

/// Coarse age of the last queue update
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FreshnessStatus {
    Fresh,
    Recent,
    Stale,
    Unknown,
}

impl FreshnessStatus {
    pub fn from_elapsed_minutes(minutes: u64) -> Self {
        if minutes < FRESH_THRESHOLD_MINUTES {
            FreshnessStatus::Fresh
        } else if minutes < RECENT_THRESHOLD_MINUTES {
            FreshnessStatus::Recent
        } else {
            FreshnessStatus::Stale
        }
    }
}

/// How long ago the queue state last changed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Freshness {
    pub elapsed_minutes: Option<u64>,
    pub status: FreshnessStatus,
    pub label: String,
}

impl Freshness {
    /// Describe the age of `state` at `now`
    pub fn of(state: Option<&QueueState>, now: DateTime<Utc>) -> Self {
        match state {
            Some(state) => {
                let minutes = elapsed_minutes(state.updated_at, now);
                Self {
                    elapsed_minutes: Some(minutes),
                    status: FreshnessStatus::from_elapsed_minutes(minutes),
                    label: describe_elapsed(minutes),
                }
            }
            None => Self {
                elapsed_minutes: None,
                status: FreshnessStatus::Unknown,
                label: String::new(),
            },
        }
    }
}

/// Human-readable "updated ... ago" label
pub fn describe_elapsed(minutes: u64) -> String {
    match minutes {
        0 => "just updated".to_string(),
        1 => "1 minute ago".to_string(),
        m if m < 60 => format!("{} minutes ago", m),
        m => {
            let hours = m / 60;
            let rest = m % 60;
            let hours_part = if hours == 1 {
                "1 hour".to_string()
            } else {
                format!("{} hours", hours)
            };
            match rest {
                0 => format!("{} ago", hours_part),
                1 => format!("{} 1 minute ago", hours_part),
                r => format!("{} {} minutes ago", hours_part, r),
            }
        }
    }
}
