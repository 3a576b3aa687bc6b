//! Wait time estimation for the queue display
//!
//! This module turns the cached queue state and the wall clock into the
//! estimate and "last updated" labels shown to viewers.

pub mod calculator;
pub mod freshness;

// Re-export commonly used types
pub use calculator::{EstimatedTimeCalculator, FixedRateCalculator, WaitEstimate, WaitTimeConfig};
pub use freshness::{Freshness, FreshnessStatus};
