pub mod cli;
pub mod client;
pub mod config;
pub mod dispatcher;
pub mod logging_system;
pub mod printer;
pub mod shutdown;

pub use cli::Cli;
pub use client::{Client, Fields, render_fields};
pub use config::{ClientConfig, ConfigError, LOG_ENTRIES_CHAN_SIZE};
pub use dispatcher::DispatcherState;
pub use logging_system::{LoggingError, TracingLevel, setup_logging};
pub use printer::{LinePrinter, StderrPrinter};
pub use shutdown::{ShutdownSequencer, wait_for_signal};

use clap::Parser;
use tokio::io::BufReader;
use tracing::{error, info};

pub fn get_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

// Main entry point for the binary
pub async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.log_level)?;

    let config = cli.resolve_config()?;
    info!("Starting rask-log-shipper v{}", get_version());
    info!(
        "Configuration: push_url={}, labels={}, batch_entries_number={}, batch_wait={:?}, encoding={:?}",
        config.push_url,
        config.labels,
        config.batch_entries_number,
        config.batch_wait,
        config.encoding
    );

    let client = Client::new(config)?;
    let stdin = BufReader::new(tokio::io::stdin());

    tokio::select! {
        result = cli::forward_lines(&client, stdin, cli.stdin_level) => match result {
            Ok(count) => info!("Input closed after {} lines", count),
            Err(e) => error!("Failed to read stdin: {}", e),
        },
        result = wait_for_signal() => {
            if let Err(e) = result {
                error!("Failed to listen for shutdown signals: {}", e);
            }
        }
    }

    client.shutdown().await;

    let stats = client.stats();
    info!(
        "rask-log-shipper stopped: {} batches ({} entries) pushed, {} batches ({} entries) dropped",
        stats.batches_sent, stats.entries_sent, stats.batches_dropped, stats.entries_dropped
    );
    Ok(())
}
