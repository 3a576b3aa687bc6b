//! Metrics collection using Prometheus
//!
//! This module provides metrics collection for the queue-display service
//! using Prometheus metrics.

use crate::types::QueueAction;
use anyhow::Result;
use prometheus::{
    HistogramOpts, HistogramVec, IntCounterVec, IntGauge, IntGaugeVec, Opts, Registry,
};
use std::sync::Arc;
use std::time::Duration;

/// Main metrics collector for the queue display service
#[derive(Clone)]
pub struct MetricsCollector {
    /// Prometheus registry
    registry: Arc<Registry>,

    /// Service-level metrics
    service_metrics: ServiceMetrics,

    /// Queue-related metrics
    queue_metrics: QueueMetrics,

    /// Store and auth performance metrics
    performance_metrics: PerformanceMetrics,
}

/// Service-level metrics
#[derive(Clone)]
pub struct ServiceMetrics {
    /// Service uptime in seconds
    pub uptime_seconds: IntGauge,

    /// Health check status (0=unhealthy, 1=degraded, 2=healthy)
    pub health_status: IntGauge,

    /// Component health status
    pub component_health: IntGaugeVec,

    /// Operator sign-in attempts by outcome
    pub auth_attempts_total: IntCounterVec,
}

/// Queue-related metrics
#[derive(Clone)]
pub struct QueueMetrics {
    /// Last known queue number
    pub queue_number: IntGauge,

    /// Estimated remaining wait shown on the display, in minutes
    pub estimated_wait_minutes: IntGauge,

    /// Refresh attempts by outcome (success, empty, error)
    pub refreshes_total: IntCounterVec,

    /// Mutation requests by action and outcome
    pub mutations_total: IntCounterVec,
}

/// Performance metrics
#[derive(Clone)]
pub struct PerformanceMetrics {
    /// Store call latency by operation
    pub store_operation_duration: HistogramVec,
}

impl MetricsCollector {
    /// Create a new metrics collector with default registry
    pub fn new() -> Result<Self> {
        let registry = Arc::new(Registry::new());
        Self::with_registry(registry)
    }

    /// Create a new metrics collector with custom registry
    pub fn with_registry(registry: Arc<Registry>) -> Result<Self> {
        let service_metrics = ServiceMetrics::new(&registry)?;
        let queue_metrics = QueueMetrics::new(&registry)?;
        let performance_metrics = PerformanceMetrics::new(&registry)?;

        Ok(Self {
            registry,
            service_metrics,
            queue_metrics,
            performance_metrics,
        })
    }

    /// Get the Prometheus registry
    pub fn registry(&self) -> Arc<Registry> {
        self.registry.clone()
    }

    /// Get service metrics
    pub fn service(&self) -> &ServiceMetrics {
        &self.service_metrics
    }

    /// Get queue metrics
    pub fn queue(&self) -> &QueueMetrics {
        &self.queue_metrics
    }

    /// Get performance metrics
    pub fn performance(&self) -> &PerformanceMetrics {
        &self.performance_metrics
    }

    /// Record a refresh outcome: "success", "empty" or "error"
    pub fn record_refresh(&self, outcome: &str) {
        self.queue_metrics
            .refreshes_total
            .with_label_values(&[outcome])
            .inc();
    }

    /// Record a mutation outcome for an action
    pub fn record_mutation(&self, action: Option<QueueAction>, outcome: &str) {
        let action = action.map(|a| a.as_str()).unwrap_or("none");
        self.queue_metrics
            .mutations_total
            .with_label_values(&[action, outcome])
            .inc();
    }

    /// Update the queue number gauge
    pub fn set_queue_number(&self, queue_number: u32) {
        self.queue_metrics
            .queue_number
            .set(i64::from(queue_number));
    }

    /// Update the displayed estimate gauge
    pub fn set_estimated_wait_minutes(&self, minutes: u64) {
        self.queue_metrics
            .estimated_wait_minutes
            .set(i64::try_from(minutes).unwrap_or(i64::MAX));
    }

    /// Record a store call duration
    pub fn record_store_operation(&self, operation: &str, duration: Duration) {
        self.performance_metrics
            .store_operation_duration
            .with_label_values(&[operation])
            .observe(duration.as_secs_f64());
    }

    /// Record an operator sign-in attempt
    pub fn record_auth_attempt(&self, success: bool) {
        let outcome = if success { "success" } else { "failure" };
        self.service_metrics
            .auth_attempts_total
            .with_label_values(&[outcome])
            .inc();
    }

    /// Update overall health status (0=unhealthy, 1=degraded, 2=healthy)
    pub fn update_health_status(&self, status: i64) {
        self.service_metrics.health_status.set(status);
    }

    /// Update health of a named component
    pub fn update_component_health(&self, component: &str, healthy: bool) {
        self.service_metrics
            .component_health
            .with_label_values(&[component])
            .set(if healthy { 1 } else { 0 });
    }
}

impl ServiceMetrics {
    fn new(registry: &Registry) -> Result<Self> {
        let uptime_seconds =
            IntGauge::new("queue_display_uptime_seconds", "Service uptime in seconds")?;
        registry.register(Box::new(uptime_seconds.clone()))?;

        let health_status = IntGauge::new(
            "queue_display_health_status",
            "Health status (0=unhealthy, 1=degraded, 2=healthy)",
        )?;
        registry.register(Box::new(health_status.clone()))?;

        let component_health = IntGaugeVec::new(
            Opts::new(
                "queue_display_component_health",
                "Component health (1=healthy, 0=unhealthy)",
            ),
            &["component"],
        )?;
        registry.register(Box::new(component_health.clone()))?;

        let auth_attempts_total = IntCounterVec::new(
            Opts::new(
                "queue_display_auth_attempts_total",
                "Operator sign-in attempts",
            ),
            &["outcome"],
        )?;
        registry.register(Box::new(auth_attempts_total.clone()))?;

        Ok(Self {
            uptime_seconds,
            health_status,
            component_health,
            auth_attempts_total,
        })
    }
}

impl QueueMetrics {
    fn new(registry: &Registry) -> Result<Self> {
        let queue_number = IntGauge::new("queue_display_queue_number", "Last known queue number")?;
        registry.register(Box::new(queue_number.clone()))?;

        let estimated_wait_minutes = IntGauge::new(
            "queue_display_estimated_wait_minutes",
            "Estimated remaining wait shown on the display",
        )?;
        registry.register(Box::new(estimated_wait_minutes.clone()))?;

        let refreshes_total = IntCounterVec::new(
            Opts::new("queue_display_refreshes_total", "Queue state refreshes"),
            &["outcome"],
        )?;
        registry.register(Box::new(refreshes_total.clone()))?;

        let mutations_total = IntCounterVec::new(
            Opts::new("queue_display_mutations_total", "Queue mutation requests"),
            &["action", "outcome"],
        )?;
        registry.register(Box::new(mutations_total.clone()))?;

        Ok(Self {
            queue_number,
            estimated_wait_minutes,
            refreshes_total,
            mutations_total,
        })
    }
}

impl PerformanceMetrics {
    fn new(registry: &Registry) -> Result<Self> {
        let store_operation_duration = HistogramVec::new(
            HistogramOpts::new(
                "queue_display_store_operation_duration_seconds",
                "Backing store call latency",
            )
            .buckets(vec![0.005, 0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]),
            &["operation"],
        )?;
        registry.register(Box::new(store_operation_duration.clone()))?;

        Ok(Self {
            store_operation_duration,
        })
    }
}
