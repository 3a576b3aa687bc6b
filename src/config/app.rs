//! Main application configuration
//!
//! This module defines the primary configuration structures for the
//! queue-display service, including environment variable loading and validation.

use crate::sync::refresher::MAX_REFRESH_INTERVAL;
use crate::sync::ticker::MAX_TICK_INTERVAL;
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;
use std::time::Duration;

/// Longest operator session accepted by `validate_config` (30 days)
pub const MAX_SESSION_TTL_SECONDS: u64 = 30 * 24 * 60 * 60;

/// Main application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub service: ServiceSettings,
    pub store: StoreSettings,
    pub display: DisplaySettings,
    pub auth: AuthSettings,
}

/// Service-level settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceSettings {
    /// Service name for logging and metrics
    pub name: String,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Interface the HTTP server binds to
    pub host: String,
    /// Port for the queue API, health and metrics endpoints
    pub http_port: u16,
    /// Graceful shutdown timeout in seconds
    pub shutdown_timeout_seconds: u64,
}

/// Which store implementation backs the queue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Memory,
    Rest,
}

impl std::str::FromStr for StoreBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "memory" => Ok(StoreBackend::Memory),
            "rest" => Ok(StoreBackend::Rest),
            other => Err(anyhow!("Unknown store backend: {}", other)),
        }
    }
}

/// Backing store settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreSettings {
    pub backend: StoreBackend,
    /// Base URL of the REST backend
    pub url: String,
    /// API key for the REST backend
    pub api_key: String,
    /// Table holding the singleton queue row
    pub state_table: String,
    /// Table holding the append-only history log
    pub history_table: String,
    /// Per-request timeout in seconds
    pub request_timeout_seconds: u64,
}

/// Display and polling settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplaySettings {
    /// Service minutes each waiting person adds to the estimate
    pub minutes_per_person: u64,
    /// Autorefresh period for passive viewers in seconds
    pub refresh_interval_seconds: u64,
    /// Estimate re-render period in milliseconds
    pub tick_interval_ms: u64,
}

/// Operator authentication settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthSettings {
    /// Operator login; mutations are disabled when unset
    pub operator_email: Option<String>,
    pub operator_password: Option<String>,
    /// Session lifetime in seconds
    pub session_ttl_seconds: u64,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            name: "queue-display".to_string(),
            log_level: "info".to_string(),
            host: "0.0.0.0".to_string(),
            http_port: 8080,
            shutdown_timeout_seconds: 30,
        }
    }
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            backend: StoreBackend::Memory,
            url: "http://localhost:54321".to_string(),
            api_key: String::new(),
            state_table: "queue".to_string(),
            history_table: "queue_history".to_string(),
            request_timeout_seconds: 10,
        }
    }
}

impl Default for DisplaySettings {
    fn default() -> Self {
        Self {
            minutes_per_person: 10,
            refresh_interval_seconds: 30,
            tick_interval_ms: 1000,
        }
    }
}

impl Default for AuthSettings {
    fn default() -> Self {
        Self {
            operator_email: None,
            operator_password: None,
            session_ttl_seconds: 8 * 3600, // one working day
        }
    }
}

fn parse_env<T: std::str::FromStr>(name: &str, value: &str) -> Result<T> {
    value
        .parse()
        .map_err(|_| anyhow!("Invalid {} value: {}", name, value))
}

impl AppConfig {
    /// Load configuration from environment variables with fallback to defaults
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        config.apply_env()?;
        validate_config(&config)?;
        Ok(config)
    }

    /// Load configuration from a TOML file, then apply environment overrides
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let mut config = Self::from_toml_str(&contents)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        config.apply_env()?;
        validate_config(&config)?;
        Ok(config)
    }

    /// Parse configuration from TOML text without validation
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        Ok(toml::from_str(contents)?)
    }

    fn apply_env(&mut self) -> Result<()> {
        // Service settings
        if let Ok(name) = env::var("SERVICE_NAME") {
            self.service.name = name;
        }
        if let Ok(log_level) = env::var("LOG_LEVEL") {
            self.service.log_level = log_level;
        }
        if let Ok(host) = env::var("HTTP_HOST") {
            self.service.host = host;
        }
        if let Ok(port) = env::var("HTTP_PORT") {
            self.service.http_port = parse_env("HTTP_PORT", &port)?;
        }
        if let Ok(timeout) = env::var("SHUTDOWN_TIMEOUT_SECONDS") {
            self.service.shutdown_timeout_seconds =
                parse_env("SHUTDOWN_TIMEOUT_SECONDS", &timeout)?;
        }

        // Store settings
        if let Ok(backend) = env::var("STORE_BACKEND") {
            self.store.backend = backend.parse()?;
        }
        if let Ok(url) = env::var("STORE_URL") {
            self.store.url = url;
        }
        if let Ok(key) = env::var("STORE_API_KEY") {
            self.store.api_key = key;
        }
        if let Ok(table) = env::var("STORE_STATE_TABLE") {
            self.store.state_table = table;
        }
        if let Ok(table) = env::var("STORE_HISTORY_TABLE") {
            self.store.history_table = table;
        }
        if let Ok(timeout) = env::var("STORE_REQUEST_TIMEOUT_SECONDS") {
            self.store.request_timeout_seconds =
                parse_env("STORE_REQUEST_TIMEOUT_SECONDS", &timeout)?;
        }

        // Display settings
        if let Ok(minutes) = env::var("MINUTES_PER_PERSON") {
            self.display.minutes_per_person = parse_env("MINUTES_PER_PERSON", &minutes)?;
        }
        if let Ok(interval) = env::var("REFRESH_INTERVAL_SECONDS") {
            self.display.refresh_interval_seconds =
                parse_env("REFRESH_INTERVAL_SECONDS", &interval)?;
        }
        if let Ok(tick) = env::var("TICK_INTERVAL_MS") {
            self.display.tick_interval_ms = parse_env("TICK_INTERVAL_MS", &tick)?;
        }

        // Auth settings
        if let Ok(email) = env::var("OPERATOR_EMAIL") {
            self.auth.operator_email = Some(email);
        }
        if let Ok(password) = env::var("OPERATOR_PASSWORD") {
            self.auth.operator_password = Some(password);
        }
        if let Ok(ttl) = env::var("SESSION_TTL_SECONDS") {
            self.auth.session_ttl_seconds = parse_env("SESSION_TTL_SECONDS", &ttl)?;
        }

        Ok(())
    }

    /// Get shutdown timeout as Duration
    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.service.shutdown_timeout_seconds)
    }

    /// Get autorefresh period as Duration
    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.display.refresh_interval_seconds)
    }

    /// Get display tick period as Duration
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.display.tick_interval_ms)
    }
}

impl AuthSettings {
    /// Get session lifetime as Duration
    pub fn session_ttl(&self) -> Duration {
        Duration::from_secs(self.session_ttl_seconds)
    }
}

/// Validate configuration values
pub fn validate_config(config: &AppConfig) -> Result<()> {
    // Validate log level
    match config.service.log_level.to_lowercase().as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => {}
        _ => return Err(anyhow!("Invalid log level: {}", config.service.log_level)),
    }

    // Validate ports
    if config.service.http_port == 0 {
        return Err(anyhow!("HTTP port cannot be 0"));
    }

    // Validate timeouts
    if config.service.shutdown_timeout_seconds == 0 {
        return Err(anyhow!("Shutdown timeout must be greater than 0"));
    }
    if config.store.request_timeout_seconds == 0 {
        return Err(anyhow!("Store request timeout must be greater than 0"));
    }

    // Validate store settings
    if config.store.backend == StoreBackend::Rest {
        if config.store.url.is_empty() {
            return Err(anyhow!("Store URL cannot be empty"));
        }
        if config.store.api_key.is_empty() {
            return Err(anyhow!("Store API key cannot be empty"));
        }
    }
    if config.store.state_table.is_empty() || config.store.history_table.is_empty() {
        return Err(anyhow!("Store table names cannot be empty"));
    }

    // Validate display settings
    if config.display.minutes_per_person == 0 {
        return Err(anyhow!("Minutes per person must be greater than 0"));
    }
    if config.display.refresh_interval_seconds == 0 {
        return Err(anyhow!("Refresh interval must be greater than 0"));
    }
    if config.refresh_interval() > MAX_REFRESH_INTERVAL {
        return Err(anyhow!(
            "Refresh interval cannot exceed {} seconds",
            MAX_REFRESH_INTERVAL.as_secs()
        ));
    }
    if config.display.tick_interval_ms == 0 {
        return Err(anyhow!("Tick interval must be greater than 0"));
    }
    if config.tick_interval() > MAX_TICK_INTERVAL {
        return Err(anyhow!(
            "Tick interval cannot exceed {} ms",
            MAX_TICK_INTERVAL.as_millis()
        ));
    }

    // Validate auth settings
    if config.auth.operator_email.is_some() != config.auth.operator_password.is_some() {
        return Err(anyhow!(
            "Operator email and password must be configured together"
        ));
    }
    if config.auth.session_ttl_seconds == 0 {
        return Err(anyhow!("Session TTL must be greater than 0"));
    }
    if config.auth.session_ttl_seconds > MAX_SESSION_TTL_SECONDS {
        return Err(anyhow!(
            "Session TTL cannot exceed {} seconds",
            MAX_SESSION_TTL_SECONDS
        ));
    }

    Ok(())
}
