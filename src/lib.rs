//! Queue Display - live single-counter queue display
//!
//! This crate keeps a shared queue number in sync with a backing store,
//! estimates the remaining wait for the people in line and lets signed-in
//! operators move the queue forward.

pub mod auth;
pub mod clock;
pub mod config;
pub mod error;
pub mod metrics;
pub mod service;
pub mod store;
pub mod sync;
pub mod types;
pub mod utils;
pub mod wait_time;

// Re-export commonly used types and traits
pub use error::{QueueError, Result};
pub use types::*;

// Re-export key components
pub use store::{InMemoryQueueStore, QueueStore, RestQueueStore};
pub use sync::{AutoRefresher, DisplayFrame, DisplayTicker, QueueSyncClient};
pub use wait_time::{EstimatedTimeCalculator, FixedRateCalculator, WaitEstimate};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
