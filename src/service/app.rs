//! Main application state and service coordination
//!
//! This module contains the production AppState that wires the store, the
//! viewer and operator sync clients, authentication and metrics together, and
//! owns the background timers.

use crate::auth::{self, Authenticator};
use crate::clock::{Clock, SystemClock};
use crate::config::AppConfig;
use crate::metrics::MetricsCollector;
use crate::store::{self, QueueStore};
use crate::sync::{AutoRefresher, DisplayFrame, DisplayTicker, QueueSyncClient};
use crate::wait_time::{EstimatedTimeCalculator, FixedRateCalculator, WaitTimeConfig};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Service-level errors
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Store initialization error: {message}")]
    Store { message: String },

    #[error("Service initialization error: {message}")]
    Initialization { message: String },
}

/// Timers and tasks owned by a running service
#[derive(Default)]
struct BackgroundTasks {
    refresher: Option<AutoRefresher>,
    ticker: Option<DisplayTicker>,
    handles: Vec<JoinHandle<()>>,
}

/// Main application state containing all service components
pub struct AppState {
    /// Application configuration
    config: AppConfig,

    /// Backing store shared by both clients
    store: Arc<dyn QueueStore>,

    clock: Arc<dyn Clock>,
    calculator: Arc<dyn EstimatedTimeCalculator>,
    authenticator: Arc<dyn Authenticator>,
    metrics: Arc<MetricsCollector>,

    /// Passive display client, kept current by autorefresh
    viewer: Arc<QueueSyncClient>,

    /// Operator client, refreshed after each mutation
    operator: Arc<QueueSyncClient>,

    tasks: Mutex<BackgroundTasks>,

    /// Service status
    is_running: Arc<RwLock<bool>>,

    started_at: Instant,
}

impl AppState {
    /// Initialize the application with components built from configuration
    pub async fn new(config: AppConfig) -> Result<Self, ServiceError> {
        info!("Initializing queue-display service");
        info!(
            "Configuration: service={}, store={:?}",
            config.service.name, config.store.backend
        );

        let store = store::from_settings(&config.store).map_err(|e| ServiceError::Store {
            message: format!("{:#}", e),
        })?;
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let authenticator: Arc<dyn Authenticator> =
            Arc::new(auth::from_settings(&config.auth, clock.clone()));

        Self::with_components(config, store, authenticator, clock)
    }

    /// Initialize the application with explicitly provided collaborators
    pub fn with_components(
        config: AppConfig,
        store: Arc<dyn QueueStore>,
        authenticator: Arc<dyn Authenticator>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, ServiceError> {
        let metrics = Arc::new(MetricsCollector::new().map_err(|e| {
            ServiceError::Initialization {
                message: format!("Failed to create metrics collector: {}", e),
            }
        })?);

        let calculator: Arc<dyn EstimatedTimeCalculator> = Arc::new(
            FixedRateCalculator::new(WaitTimeConfig {
                minutes_per_person: config.display.minutes_per_person,
            })
            .map_err(|e| ServiceError::Configuration {
                message: e.to_string(),
            })?,
        );

        let viewer = Arc::new(
            QueueSyncClient::new(store.clone(), clock.clone()).with_metrics(metrics.clone()),
        );
        let operator = Arc::new(
            QueueSyncClient::new(store.clone(), clock.clone()).with_metrics(metrics.clone()),
        );

        Ok(Self {
            config,
            store,
            clock,
            calculator,
            authenticator,
            metrics,
            viewer,
            operator,
            tasks: Mutex::new(BackgroundTasks::default()),
            is_running: Arc::new(RwLock::new(false)),
            started_at: Instant::now(),
        })
    }

    /// Load initial state and start the display timers
    pub async fn start(&self) -> Result<(), ServiceError> {
        info!("Starting queue-display service");

        let mut tasks = self.tasks.lock().await;
        if tasks.ticker.is_some() {
            return Err(ServiceError::Initialization {
                message: "service already started".to_string(),
            });
        }

        *self.is_running.write().await = true;

        // A failed first fetch is not fatal: clients keep retrying on their own schedule
        for (name, client) in [("viewer", &self.viewer), ("operator", &self.operator)] {
            match client.refresh().await {
                Ok(state) => info!("Initial {} state: queue number {}", name, state.queue_number),
                Err(e) => warn!("Initial {} refresh failed: {}", name, e),
            }
        }

        info!(
            "Starting viewer autorefresh ({}s interval)...",
            self.config.refresh_interval().as_secs()
        );
        tasks.refresher = Some(AutoRefresher::spawn(
            self.viewer.clone(),
            self.config.refresh_interval(),
        ));

        tasks.ticker = Some(
            DisplayTicker::spawn(
                self.viewer.clone(),
                self.calculator.clone(),
                self.config.tick_interval(),
                Some(self.metrics.clone()),
            )
            .await,
        );

        info!("Starting health metrics task (60s interval)...");
        let health_metrics_task = {
            let metrics = self.metrics.clone();
            let viewer = self.viewer.clone();
            let is_running = self.is_running.clone();
            let started_at = self.started_at;

            tokio::spawn(async move {
                let mut interval = tokio::time::interval(Duration::from_secs(60));

                while *is_running.read().await {
                    interval.tick().await;

                    let uptime_seconds = started_at.elapsed().as_secs() as i64;
                    metrics.service().uptime_seconds.set(uptime_seconds);

                    let store_ok = viewer.last_error().await.is_none();
                    metrics.update_component_health("store", store_ok);
                    metrics.update_health_status(if store_ok { 2 } else { 1 });

                    debug!("Updated service health metrics - uptime: {}s", uptime_seconds);
                }
            })
        };
        tasks.handles.push(health_metrics_task);

        info!("✅ Queue-display service started successfully");
        Ok(())
    }

    /// Stop all timers and background tasks
    pub async fn shutdown(&self) -> Result<(), ServiceError> {
        info!("Starting graceful shutdown of queue-display service");

        *self.is_running.write().await = false;

        let mut tasks = self.tasks.lock().await;
        if let Some(refresher) = tasks.refresher.take() {
            refresher.stop();
        }
        if let Some(ticker) = tasks.ticker.take() {
            ticker.stop();
        }

        let task_count = tasks.handles.len();
        for (i, task) in tasks.handles.drain(..).enumerate() {
            debug!("Aborting background task {}/{}", i + 1, task_count);
            task.abort();
        }

        info!("✅ Queue-display service shutdown completed");
        Ok(())
    }

    /// Get service configuration
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Check if service is running
    pub async fn is_running(&self) -> bool {
        *self.is_running.read().await
    }

    pub fn store(&self) -> Arc<dyn QueueStore> {
        self.store.clone()
    }

    pub fn clock(&self) -> Arc<dyn Clock> {
        self.clock.clone()
    }

    pub fn calculator(&self) -> Arc<dyn EstimatedTimeCalculator> {
        self.calculator.clone()
    }

    pub fn authenticator(&self) -> Arc<dyn Authenticator> {
        self.authenticator.clone()
    }

    pub fn metrics(&self) -> Arc<MetricsCollector> {
        self.metrics.clone()
    }

    pub fn viewer(&self) -> Arc<QueueSyncClient> {
        self.viewer.clone()
    }

    pub fn operator(&self) -> Arc<QueueSyncClient> {
        self.operator.clone()
    }

    pub fn uptime(&self) -> Duration {
        self.started_at.elapsed()
    }

    /// Latest frame for the public display, rendered on demand before start
    pub async fn display_frame(&self) -> DisplayFrame {
        if let Some(ticker) = &self.tasks.lock().await.ticker {
            return ticker.latest();
        }
        self.render_frame(&self.viewer).await
    }

    /// Frame for `client` rendered at the current clock time
    pub async fn render_frame(&self, client: &QueueSyncClient) -> DisplayFrame {
        DisplayFrame::render(
            &client.snapshot().await,
            self.calculator.as_ref(),
            self.clock.now(),
        )
    }
}
