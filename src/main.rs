//! # Deck Input
//!
//! Print every change of the Steam Deck's built-in controls.
//!
//! Usage: `deck-input [config.toml]`. Without a path the stock Steam Deck
//! device layout is used.

use anyhow::{Context, Result};
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

use deck_input::config::{Config, LoggingConfig};
use deck_input::controller::field::{Field, FieldValue};
use deck_input::session::{DeckInput, SessionState};

/// File name prefix of the rolling log
const LOG_FILE_PREFIX: &str = "deck-input.log";

/// Main entry point for Deck Input
///
/// # Control Flow
///
/// 1. **Initialization**
///    - Load configuration (first argument, or defaults)
///    - Set up logging to stdout or a daily rolling file
///    - Register the change printer
///
/// 2. **Run**
///    - Grab the key devices, poll the raw controller reports
///    - Print each debounced change as it happens
///
/// 3. **Graceful Shutdown**
///    - Ctrl+C stops every reader
///    - Device grabs are released before exit
///
/// # Errors
///
/// Returns error if the configuration file cannot be read or is invalid.
/// Missing devices are logged and end the run in the `Failed` state.
///
/// # Examples
///
/// ```bash
/// sudo deck-input /etc/deck-input.toml
/// ```
///
/// Expected output:
/// ```text
/// INFO deck_input: Deck Input v0.1.0 starting...
/// INFO deck_input::controller::hidraw: Opened hidraw device /dev/hidraw2: Valve Steam Deck
/// Event: 'A' changed to true
/// Event: 'A' changed to false
/// ```
#[tokio::main]
async fn main() -> Result<()> {
    let config = match std::env::args_os().nth(1).map(PathBuf::from) {
        Some(path) => Config::load(&path)
            .with_context(|| format!("Failed to load configuration from {}", path.display()))?,
        None => Config::default(),
    };

    let _log_guard = init_logging(&config.logging)?;
    info!("Deck Input v{} starting...", env!("CARGO_PKG_VERSION"));

    let format = OutputFormat::parse(&config.output.format);
    let mut deck = DeckInput::new(config);
    deck.add_listener(move |field, value| println!("{}", format.render(field, value)));

    let stop = deck.stop_handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Received Ctrl+C, shutting down...");
            stop.stop();
        }
    });

    info!("Press Ctrl+C to exit");
    match deck.start().await? {
        SessionState::Failed => warn!("Stopped with failed devices, see log above"),
        state => info!("Session finished: {:?}", state),
    }

    Ok(())
}

/// Install the tracing subscriber
///
/// RUST_LOG overrides the configured level. The returned guard flushes the
/// file writer and must live until exit.
fn init_logging(logging: &LoggingConfig) -> Result<Option<WorkerGuard>> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&logging.level))
        .context("Invalid log level")?;

    if logging.directory.is_empty() {
        tracing_subscriber::fmt().with_env_filter(filter).init();
        return Ok(None);
    }

    let appender = tracing_appender::rolling::daily(&logging.directory, LOG_FILE_PREFIX);
    let (writer, guard) = tracing_appender::non_blocking(appender);
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(false)
        .init();
    Ok(Some(guard))
}

/// How changes are printed to stdout
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OutputFormat {
    /// `Event: 'A' changed to true`
    Log,
    /// One JSON object per line
    Jsonl,
}

impl OutputFormat {
    /// Config validation only admits "log" and "jsonl"
    fn parse(format: &str) -> Self {
        match format {
            "jsonl" => OutputFormat::Jsonl,
            _ => OutputFormat::Log,
        }
    }

    fn render(self, field: Field, value: FieldValue) -> String {
        match self {
            OutputFormat::Log => format!("Event: '{}' changed to {}", field, value),
            OutputFormat::Jsonl => serde_json::json!({
                "at": chrono::Utc::now().to_rfc3339(),
                "field": field,
                "value": value,
            })
            .to_string(),
        }
    }
}
