//! Metrics and monitoring for the queue-display service
//!
//! This module provides Prometheus metrics collection for queue refreshes,
//! mutations, the displayed estimate and backing store latency.

pub mod collector;

pub use collector::{MetricsCollector, PerformanceMetrics, QueueMetrics, ServiceMetrics};

use prometheus::{Encoder, TextEncoder};
use std::sync::Arc;

/// Render all registered metrics in the Prometheus text format
pub fn encode_metrics(collector: &Arc<MetricsCollector>) -> anyhow::Result<String> {
    let metric_families = collector.registry().gather();
    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|e| anyhow::anyhow!("Failed to encode metrics: {}", e))?;
    String::from_utf8(buffer).map_err(|e| anyhow::anyhow!("Metrics are not valid UTF-8: {}", e))
}
