//! Main entry point for the queue-display service
//!
//! This is the production entry point that initializes and runs the queue
//! display service with proper error handling, logging, and graceful shutdown.

use anyhow::Result;
use clap::Parser;
use queue_display::config::{validate_config, AppConfig, StoreBackend};
use queue_display::service::{AppState, HealthCheck, HealthStatus, HttpServer, HttpServerConfig};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::signal;
use tokio::time::Duration;
use tracing::{error, info, warn};

/// Queue Display Service - live queue number with estimated wait times
#[derive(Parser)]
#[command(
    name = "queue-display",
    version,
    about = "A live single-counter queue display with estimated wait times",
    long_about = "Queue Display keeps a shared queue number in sync with a backing store, \
                 renders a per-second countdown of the estimated wait, and exposes an \
                 authenticated HTTP API for operators to move the queue."
)]
struct Args {
    /// Configuration file path
    #[arg(
        short,
        long,
        value_name = "FILE",
        help = "Path to configuration file (TOML format)"
    )]
    config: Option<PathBuf>,

    /// Perform health check and exit
    #[arg(long, help = "Perform a health check and exit with status code")]
    health_check: bool,

    /// Log level override
    #[arg(
        short,
        long,
        value_name = "LEVEL",
        help = "Override log level (trace, debug, info, warn, error)"
    )]
    log_level: Option<String>,

    /// HTTP port override
    #[arg(long, value_name = "PORT", help = "Override HTTP server port")]
    http_port: Option<u16>,

    /// Store URL override
    #[arg(long, value_name = "URL", help = "Override REST store base URL")]
    store_url: Option<String>,

    /// Use the in-memory store
    #[arg(long, help = "Use the in-memory store instead of the REST backend")]
    memory_store: bool,

    /// Enable debug mode
    #[arg(short, long, help = "Enable debug mode with verbose logging")]
    debug: bool,

    /// Dry run mode (validate config and exit)
    #[arg(
        long,
        help = "Validate configuration and exit without starting service"
    )]
    dry_run: bool,
}

/// Initialize structured logging with the configured level
fn init_logging(log_level: &str) -> Result<()> {
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| log_level.into()),
        )
        .with_target(false)
        .with_thread_ids(true)
        .with_line_number(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    Ok(())
}

/// Perform health check and return appropriate exit code
async fn perform_health_check(config: AppConfig) -> Result<()> {
    info!("Performing health check...");

    let app_state = Arc::new(AppState::new(config).await?);
    app_state.start().await?;

    let result = HealthCheck::check(app_state.clone()).await;
    app_state.shutdown().await?;

    match result {
        Ok(health) => {
            println!("Health Check: {}", health.status);
            match health.stats.queue_number {
                Some(number) => println!("  Queue Number: {}", number),
                None => println!("  Queue Number: unavailable"),
            }
            println!("  Estimate: {}", health.stats.estimate);
            println!("  Last Updated: {}", health.stats.last_updated);
            println!("  Store: {}", health.stats.store_backend);
            for check in &health.checks {
                if let Some(message) = &check.message {
                    println!("  {}: {} ({})", check.name, check.status, message);
                }
            }

            if health.status == HealthStatus::Healthy {
                std::process::exit(0);
            } else {
                std::process::exit(1);
            }
        }
        Err(e) => {
            error!("Health check failed: {}", e);
            std::process::exit(1);
        }
    }
}

/// Wait for shutdown signals (SIGINT, SIGTERM)
async fn wait_for_shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received SIGINT (Ctrl+C) signal");
        },
        _ = terminate => {
            info!("Received SIGTERM signal");
        },
    }
}

/// Run periodic health checks
async fn health_check_task(app_state: Arc<AppState>) {
    let mut interval = tokio::time::interval(Duration::from_secs(30));

    while app_state.is_running().await {
        interval.tick().await;

        match HealthCheck::check(app_state.clone()).await {
            Ok(health) if health.status == HealthStatus::Healthy => {
                info!(
                    "Health check: {} - queue {:?}, {}",
                    health.status, health.stats.queue_number, health.stats.estimate
                );
            }
            Ok(health) => {
                let problems: Vec<String> = health
                    .checks
                    .iter()
                    .filter_map(|c| c.message.as_ref().map(|m| format!("{}: {}", c.name, m)))
                    .collect();
                warn!("Health check: {} - {}", health.status, problems.join("; "));
            }
            Err(e) => {
                warn!("Health check failed: {}", e);
            }
        }
    }
}

/// Display startup banner with service information
fn display_startup_banner(config: &AppConfig) {
    info!("🚀 Queue Display Service");
    info!("   Service: {}", config.service.name);
    info!("   Log level: {}", config.service.log_level);
    info!(
        "   HTTP: {}:{}",
        config.service.host, config.service.http_port
    );
    match config.store.backend {
        StoreBackend::Memory => info!("   Store: in-memory"),
        StoreBackend::Rest => info!("   Store: {}", config.store.url),
    }
    info!(
        "   Minutes per person: {}",
        config.display.minutes_per_person
    );
    info!(
        "   Refresh interval: {}s",
        config.display.refresh_interval_seconds
    );
    info!(
        "   Operator login: {}",
        if config.auth.operator_email.is_some() {
            "enabled"
        } else {
            "disabled"
        }
    );
    info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
}

/// Load and merge configuration from environment and CLI arguments
fn load_config(args: &Args) -> Result<AppConfig> {
    let mut config = if let Some(config_path) = &args.config {
        AppConfig::from_file(config_path)?
    } else {
        AppConfig::from_env()?
    };

    // Apply CLI overrides
    if let Some(log_level) = &args.log_level {
        config.service.log_level = log_level.clone();
    }

    if args.debug {
        config.service.log_level = "debug".to_string();
    }

    if let Some(http_port) = args.http_port {
        config.service.http_port = http_port;
    }

    if let Some(store_url) = &args.store_url {
        config.store.url = store_url.clone();
        config.store.backend = StoreBackend::Rest;
    }

    if args.memory_store {
        config.store.backend = StoreBackend::Memory;
    }

    validate_config(&config)?;
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    // Load configuration (CLI args can override environment/config file)
    let config = load_config(&args).unwrap_or_else(|e| {
        eprintln!("Configuration error: {:#}", e);
        std::process::exit(1);
    });

    // Initialize logging early (before any other operations)
    if let Err(e) = init_logging(&config.service.log_level) {
        eprintln!("Failed to initialize logging: {}", e);
        std::process::exit(1);
    }

    // Handle special modes
    if args.health_check {
        return perform_health_check(config).await;
    }

    if args.dry_run {
        info!("Configuration validation successful");
        display_startup_banner(&config);
        info!("Dry run completed - exiting without starting service");
        return Ok(());
    }

    display_startup_banner(&config);

    // Initialize application state
    info!("Initializing service components...");
    let app_state = match AppState::new(config.clone()).await {
        Ok(state) => Arc::new(state),
        Err(e) => {
            error!("Failed to initialize application: {}", e);
            std::process::exit(1);
        }
    };

    // Start the service
    info!("Starting service...");
    if let Err(e) = app_state.start().await {
        error!("Failed to start service: {}", e);
        std::process::exit(1);
    }

    // Start the HTTP server
    let server = Arc::new(HttpServer::new(
        HttpServerConfig::from(&config.service),
        app_state.clone(),
    ));
    let server_task = {
        let server = server.clone();
        tokio::spawn(async move {
            if let Err(e) = server.start().await {
                error!("HTTP server failed: {:#}", e);
            }
        })
    };

    // Start health check monitoring
    let health_task = {
        let app_state = app_state.clone();
        tokio::spawn(async move {
            health_check_task(app_state).await;
        })
    };

    info!("✅ Queue Display Service is running");
    info!("Press Ctrl+C to shutdown gracefully...");

    wait_for_shutdown_signal().await;

    info!("🛑 Shutdown signal received, beginning graceful shutdown...");

    health_task.abort();

    let shutdown_timeout = config.shutdown_timeout();
    let shutdown_future = async {
        info!("Stopping service components...");
        server.stop().await?;
        let _ = server_task.await;
        app_state.shutdown().await?;
        Ok::<(), anyhow::Error>(())
    };

    match tokio::time::timeout(shutdown_timeout, shutdown_future).await {
        Ok(Ok(())) => {
            info!("✅ Graceful shutdown completed successfully");
        }
        Ok(Err(e)) => {
            warn!("⚠️  Shutdown completed with errors: {}", e);
        }
        Err(_) => {
            warn!("⚠️  Shutdown timeout exceeded, forcing exit");
        }
    }

    info!("🛑 Queue Display Service stopped");
    Ok(())
}
