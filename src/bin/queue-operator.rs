//! Queue Operator CLI Tool
//!
//! Command-line tool for operating the queue directly against the configured
//! backing store.
//!
//! Usage:
//!   cargo run --bin queue-operator -- --help
//!   cargo run --bin queue-operator status
//!   cargo run --bin queue-operator increment
//!   cargo run --bin queue-operator set 12
//!   cargo run --bin queue-operator watch --duration 60

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::{Parser, Subcommand};
use queue_display::clock::{Clock, SystemClock};
use queue_display::config::{validate_config, AppConfig, StoreBackend};
use queue_display::store;
use queue_display::sync::{AutoRefresher, DisplayFrame, DisplayTicker, QueueSyncClient};
use queue_display::types::MutationOutcome;
use queue_display::wait_time::{FixedRateCalculator, WaitTimeConfig};

#[derive(Parser)]
#[command(name = "queue-operator")]
#[command(about = "Inspect and move the shared queue number")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path (TOML); environment variables are used otherwise
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Override REST store base URL
    #[arg(long, value_name = "URL")]
    store_url: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the current queue number and estimate
    Status,
    /// Add one person to the queue
    Increment,
    /// Remove one person from the queue
    Decrement,
    /// Empty the queue
    Reset,
    /// Set the queue to an explicit number
    Set {
        /// New queue number
        #[arg(allow_negative_numbers = true)]
        number: i64,
    },
    /// Follow the display as a viewer would
    Watch {
        /// Duration to watch in seconds
        #[arg(short, long, default_value = "60")]
        duration: u64,
    },
}

fn load_config(cli: &Cli) -> Result<AppConfig> {
    let mut config = match &cli.config {
        Some(path) => AppConfig::from_file(path)?,
        None => AppConfig::from_env()?,
    };

    if let Some(url) = &cli.store_url {
        config.store.url = url.clone();
        config.store.backend = StoreBackend::Rest;
    }

    validate_config(&config)?;
    Ok(config)
}

fn print_frame(frame: &DisplayFrame) {
    match frame.queue_number {
        Some(number) => println!(
            "🎫 Queue: {:>3}  ⏱️  {}  ({})",
            number, frame.estimate_text, frame.freshness.label
        ),
        None if frame.is_loading => println!("⏳ Loading..."),
        None => println!("🎫 Queue: -"),
    }
    if let Some(err) = &frame.last_error {
        println!("⚠️  {}", err);
    }
}

fn report(outcome: MutationOutcome, calculator: &FixedRateCalculator, clock: &dyn Clock) {
    match outcome {
        MutationOutcome::Applied { state } => {
            println!("✅ Queue is now {}", state.queue_number);
            let snapshot = queue_display::sync::SyncSnapshot {
                current_state: Some(state),
                is_loading: false,
                last_error: None,
            };
            print_frame(&DisplayFrame::render(&snapshot, calculator, clock.now()));
        }
        MutationOutcome::Rejected { requested } => {
            eprintln!("❌ {} is not a valid queue number", requested);
            std::process::exit(2);
        }
        MutationOutcome::Busy => {
            eprintln!("❌ Another update is in progress");
            std::process::exit(1);
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .with_target(false)
        .init();

    let cli = Cli::parse();
    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ Configuration error: {:#}", e);
            std::process::exit(1);
        }
    };

    let store = store::from_settings(&config.store)?;
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let calculator = FixedRateCalculator::new(WaitTimeConfig {
        minutes_per_person: config.display.minutes_per_person,
    })?;
    let client = Arc::new(QueueSyncClient::new(store, clock.clone()));

    if let Err(e) = client.refresh().await {
        eprintln!("❌ {}", e);
        std::process::exit(1);
    }

    let result = match cli.command {
        Commands::Status => {
            let snapshot = client.snapshot().await;
            print_frame(&DisplayFrame::render(&snapshot, &calculator, clock.now()));
            return Ok(());
        }
        Commands::Increment => client.increment().await,
        Commands::Decrement => client.decrement().await,
        Commands::Reset => client.reset().await,
        Commands::Set { number } => client.mutate(number).await,
        Commands::Watch { duration } => {
            println!("🔍 Watching queue for {} seconds...", duration);

            let _refresher = AutoRefresher::spawn(client.clone(), config.refresh_interval());
            let ticker = DisplayTicker::spawn(
                client.clone(),
                Arc::new(calculator),
                config.tick_interval(),
                None,
            )
            .await;

            let mut frames = ticker.subscribe();
            print_frame(&frames.borrow_and_update());

            let watch = async {
                let mut last_shown = String::new();
                while frames.changed().await.is_ok() {
                    let frame = frames.borrow_and_update().clone();
                    let line = format!(
                        "{:?} {} {:?}",
                        frame.queue_number, frame.estimate_text, frame.last_error
                    );
                    if line != last_shown {
                        print_frame(&frame);
                        last_shown = line;
                    }
                }
            };
            let _ = tokio::time::timeout(Duration::from_secs(duration), watch).await;

            println!("👋 Done");
            return Ok(());
        }
    };

    match result {
        Ok(outcome) => report(outcome, &calculator, clock.as_ref()),
        Err(e) => {
            eprintln!("❌ {}", e);
            std::process::exit(1);
        }
    }

    Ok(())
}
