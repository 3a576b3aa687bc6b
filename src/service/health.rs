//! Health check endpoints and monitoring
//!
//! This module provides health check functionality for the queue-display
//! service, including readiness and liveness probes.

use crate::service::app::AppState;
use crate::wait_time::FreshnessStatus;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

/// Health check status
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

impl std::fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HealthStatus::Healthy => write!(f, "✅ healthy"),
            HealthStatus::Degraded => write!(f, "⚠️  degraded"),
            HealthStatus::Unhealthy => write!(f, "❌ unhealthy"),
        }
    }
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthCheck {
    /// Overall service status
    pub status: HealthStatus,
    /// Service name
    pub service: String,
    /// Service version
    pub version: String,
    /// Current timestamp
    pub timestamp: chrono::DateTime<chrono::Utc>,
    /// Detailed component checks
    pub checks: Vec<ComponentCheck>,
    /// Service statistics
    pub stats: ServiceStats,
}

/// Individual component health check
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentCheck {
    /// Component name
    pub name: String,
    /// Component status
    pub status: HealthStatus,
    /// Optional error message if unhealthy
    pub message: Option<String>,
    /// Check duration in milliseconds
    pub duration_ms: u64,
}

/// Service statistics for health reporting
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceStats {
    /// Last known queue number, if any state was ever loaded
    pub queue_number: Option<u32>,
    /// Estimate currently shown on the display
    pub estimate: String,
    /// How long ago the queue last changed
    pub last_updated: String,
    /// Store backend in use
    pub store_backend: String,
    /// Service uptime information
    pub uptime_info: String,
}

impl HealthCheck {
    /// Perform a comprehensive health check of the service
    pub async fn check(app_state: Arc<AppState>) -> Result<Self> {
        let mut checks = Vec::new();
        let mut overall_status = HealthStatus::Healthy;

        // Check if service is running
        let service_check = Self::check_service_running(&app_state).await;
        if service_check.status != HealthStatus::Healthy {
            overall_status = HealthStatus::Unhealthy;
        }
        checks.push(service_check);

        for check in [
            Self::check_store(&app_state).await,
            Self::check_data_freshness(&app_state).await,
        ] {
            if check.status == HealthStatus::Unhealthy {
                overall_status = HealthStatus::Unhealthy;
            } else if check.status == HealthStatus::Degraded
                && overall_status == HealthStatus::Healthy
            {
                overall_status = HealthStatus::Degraded;
            }
            checks.push(check);
        }

        let stats = Self::gather_service_stats(&app_state).await;

        Ok(HealthCheck {
            status: overall_status,
            service: app_state.config().service.name.clone(),
            version: crate::VERSION.to_string(),
            timestamp: chrono::Utc::now(),
            checks,
            stats,
        })
    }

    /// Simple liveness check - just verify service is running
    pub async fn liveness_check(app_state: Arc<AppState>) -> Result<HealthStatus> {
        if app_state.is_running().await {
            Ok(HealthStatus::Healthy)
        } else {
            Ok(HealthStatus::Unhealthy)
        }
    }

    /// Readiness check - verify the display has something to show
    pub async fn readiness_check(app_state: Arc<AppState>) -> Result<HealthStatus> {
        if !app_state.is_running().await {
            return Ok(HealthStatus::Unhealthy);
        }

        Ok(Self::check_store(&app_state).await.status)
    }

    /// Check if service is running
    async fn check_service_running(app_state: &AppState) -> ComponentCheck {
        let start = std::time::Instant::now();

        let (status, message) = if app_state.is_running().await {
            (HealthStatus::Healthy, None)
        } else {
            (
                HealthStatus::Unhealthy,
                Some("Service is not running".to_string()),
            )
        };

        ComponentCheck {
            name: "service_running".to_string(),
            status,
            message,
            duration_ms: start.elapsed().as_millis() as u64,
        }
    }

    /// Judge the store from the viewer's last refresh: an error with a cached
    /// state is degraded, an error with nothing ever loaded is unhealthy
    async fn check_store(app_state: &AppState) -> ComponentCheck {
        let start = std::time::Instant::now();
        let snapshot = app_state.viewer().snapshot().await;

        let (status, message) = match (&snapshot.last_error, &snapshot.current_state) {
            (None, Some(_)) => (HealthStatus::Healthy, None),
            (None, None) => (
                HealthStatus::Degraded,
                Some("Queue state not loaded yet".to_string()),
            ),
            (Some(err), Some(_)) => (HealthStatus::Degraded, Some(err.clone())),
            (Some(err), None) => (HealthStatus::Unhealthy, Some(err.clone())),
        };

        ComponentCheck {
            name: format!("store_{}", app_state.store().backend_name()),
            status,
            message,
            duration_ms: start.elapsed().as_millis() as u64,
        }
    }

    /// Stale data is reported but never degrades the service
    async fn check_data_freshness(app_state: &AppState) -> ComponentCheck {
        let start = std::time::Instant::now();
        let frame = app_state.display_frame().await;

        let message = match frame.freshness.status {
            FreshnessStatus::Stale => Some(format!("Queue last updated {}", frame.freshness.label)),
            _ => None,
        };

        ComponentCheck {
            name: "data_freshness".to_string(),
            status: HealthStatus::Healthy,
            message,
            duration_ms: start.elapsed().as_millis() as u64,
        }
    }

    /// Gather current service statistics
    async fn gather_service_stats(app_state: &AppState) -> ServiceStats {
        let frame = app_state.display_frame().await;
        debug!("Gathering service stats from display frame");

        ServiceStats {
            queue_number: frame.queue_number,
            estimate: frame.estimate_text,
            last_updated: frame.freshness.label,
            store_backend: app_state.store().backend_name().to_string(),
            uptime_info: format!("Up {}s", app_state.uptime().as_secs()),
        }
    }
}

/// Convert health check to JSON string
impl HealthCheck {
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| anyhow::anyhow!("Failed to serialize health check: {}", e))
    }
}
