use super::client::{Client, Fields};
use super::config::{ClientConfig, ConfigError};
use super::logging_system::TracingLevel;
use crate::domain::LogLevel;
use crate::sender::Encoding;
use clap::Parser;
use serde_json::Value;
use std::path::PathBuf;
use std::time::Duration;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};

/// Ships lines read from stdin to a Loki-compatible push endpoint.
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Configuration file (TOML); flags and env vars override it
    #[arg(long, env = "RASK_SHIPPER_CONFIG_FILE")]
    pub config_file: Option<PathBuf>,

    /// Push endpoint URL
    #[arg(long, env = "RASK_SHIPPER_PUSH_URL")]
    pub push_url: Option<String>,

    /// Static label set, e.g. {job="api",env="prod"}
    #[arg(long, env = "RASK_SHIPPER_LABELS")]
    pub labels: Option<String>,

    /// Minimum severity forwarded to the endpoint
    #[arg(long, env = "RASK_SHIPPER_SEND_LEVEL")]
    pub send_level: Option<LogLevel>,

    /// Minimum severity printed locally
    #[arg(long, env = "RASK_SHIPPER_PRINT_LEVEL")]
    pub print_level: Option<LogLevel>,

    /// Maximum time a non-empty batch waits, in milliseconds
    #[arg(long, env = "RASK_SHIPPER_BATCH_WAIT_MS")]
    pub batch_wait_ms: Option<u64>,

    /// Number of entries that forces a flush
    #[arg(long, env = "RASK_SHIPPER_BATCH_ENTRIES_NUMBER")]
    pub batch_entries_number: Option<usize>,

    /// Intake queue capacity
    #[arg(long, env = "RASK_SHIPPER_QUEUE_CAPACITY")]
    pub queue_capacity: Option<usize>,

    /// Wire encoding for push requests
    #[arg(long, env = "RASK_SHIPPER_ENCODING")]
    pub encoding: Option<Encoding>,

    /// Severity assigned to lines read from stdin
    #[arg(long, env = "RASK_SHIPPER_STDIN_LEVEL", default_value = "info")]
    pub stdin_level: LogLevel,

    /// Verbosity of the shipper's own diagnostics
    #[arg(long, env = "RASK_SHIPPER_LOG_LEVEL", default_value = "info")]
    pub log_level: TracingLevel,
}

impl Cli {
    /// File (or defaults with a host label), then `RASK_SHIPPER_*` env vars,
    /// then flags, then validation.
    pub fn resolve_config(&self) -> Result<ClientConfig, ConfigError> {
        let mut config = match &self.config_file {
            Some(path) => ClientConfig::from_file(path)?,
            None => ClientConfig {
                labels: default_labels(),
                ..ClientConfig::default()
            },
        };
        config.apply_env()?;

        if let Some(push_url) = &self.push_url {
            config.push_url = push_url.clone();
        }
        if let Some(labels) = &self.labels {
            config.labels = labels.clone();
        }
        if let Some(level) = self.send_level {
            config.send_level = level;
        }
        if let Some(level) = self.print_level {
            config.print_level = level;
        }
        if let Some(millis) = self.batch_wait_ms {
            config.batch_wait = Duration::from_millis(millis);
        }
        if let Some(entries) = self.batch_entries_number {
            config.batch_entries_number = entries;
        }
        if let Some(capacity) = self.queue_capacity {
            config.queue_capacity = capacity;
        }
        if let Some(encoding) = self.encoding {
            config.encoding = encoding;
        }

        config.validate()?;
        Ok(config)
    }
}

/// `{job="rask-log-shipper",host="<hostname>"}`, without the host when it
/// cannot be read.
pub fn default_labels() -> String {
    match hostname::get().ok().and_then(|h| h.into_string().ok()) {
        Some(host) => format!("{{job=\"rask-log-shipper\",host=\"{host}\"}}"),
        None => "{job=\"rask-log-shipper\"}".to_string(),
    }
}

/// A JSON object line becomes the record's fields; anything else is wrapped
/// as `{"msg": line}`.
pub fn fields_from_line(line: &str) -> Fields {
    match serde_json::from_str::<Value>(line) {
        Ok(Value::Object(map)) => map,
        _ => {
            let mut fields = Fields::new();
            fields.insert("msg".to_string(), Value::String(line.to_string()));
            fields
        }
    }
}

/// Feeds every non-blank line to the client until EOF. Returns the number of
/// lines handed over.
pub async fn forward_lines<R>(client: &Client, reader: R, level: LogLevel) -> std::io::Result<u64>
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = reader.lines();
    let mut forwarded = 0;

    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        client.log(level, fields_from_line(&line)).await;
        forwarded += 1;
    }

    Ok(forwarded)
}
