//! Queue synchronization
//!
//! This module keeps a local copy of the queue state in step with the backing
//! store: the sync client itself, viewer autorefresh, and the display ticker.

pub mod client;
pub mod refresher;
pub mod ticker;

// Re-export commonly used types
pub use client::{QueueSyncClient, SyncSnapshot};
pub use refresher::AutoRefresher;
pub use ticker::{DisplayFrame, DisplayTicker};
