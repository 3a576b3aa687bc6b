//! Common types used throughout the queue display service

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Key of the one persisted queue state row
pub const SINGLETON_QUEUE_ID: &str = "current";

/// The singleton record describing the queue right now
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueState {
    pub id: String,
    pub queue_number: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl QueueState {
    /// Default state used when the store has no row yet
    pub fn zero(now: DateTime<Utc>) -> Self {
        Self {
            id: SINGLETON_QUEUE_ID.to_string(),
            queue_number: 0,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Kind of change recorded in the history log
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueueAction {
    Increment,
    Decrement,
    Reset,
}

impl QueueAction {
    /// Derive the action for a write of `new` over the previously known number.
    ///
    /// No previous state and equal values both log as `Reset`.
    pub fn derive(previous: Option<u32>, new: u32) -> Self {
        match previous {
            Some(prev) if new > prev => QueueAction::Increment,
            Some(prev) if new < prev => QueueAction::Decrement,
            _ => QueueAction::Reset,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            QueueAction::Increment => "increment",
            QueueAction::Decrement => "decrement",
            QueueAction::Reset => "reset",
        }
    }
}

impl std::fmt::Display for QueueAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A stored history log entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueHistoryEntry {
    pub id: String,
    pub queue_number: u32,
    pub action: QueueAction,
    pub created_at: DateTime<Utc>,
}

/// History entry as sent to the store (the store assigns the id)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewHistoryEntry {
    pub queue_number: u32,
    pub action: QueueAction,
    pub created_at: DateTime<Utc>,
}

/// Upsert payload for the singleton row. `created_at` is owned by the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueStateUpdate {
    pub id: String,
    pub queue_number: u32,
    pub updated_at: DateTime<Utc>,
}

/// Result of a mutation request
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "lowercase")]
pub enum MutationOutcome {
    /// The store accepted the write and the cache was resynchronized
    Applied { state: QueueState },
    /// Target number was out of range; nothing was sent to the store
    Rejected { requested: i64 },
    /// Another mutation from this client is still in flight
    Busy,
}

impl MutationOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, MutationOutcome::Applied { .. })
    }
}
