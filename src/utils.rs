//! Utility functions for the queue display service

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Generate a new unique identifier for history entries and sessions
pub fn generate_id() -> String {
    Uuid::new_v4().to_string()
}

/// Get the current UTC timestamp
pub fn current_timestamp() -> DateTime<Utc> {
    Utc::now()
}

/// Whole minutes elapsed from `since` to `now`, clamped at zero
pub fn elapsed_minutes(since: DateTime<Utc>, now: DateTime<Utc>) -> u64 {
    let elapsed = now.signed_duration_since(since).num_minutes();
    elapsed.max(0) as u64
}
