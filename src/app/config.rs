use crate::domain::{LevelPolicy, LogLevel};
use crate::sender::{Encoding, HttpClientConfig};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Capacity of the intake queue between callers and the dispatcher.
pub const LOG_ENTRIES_CHAN_SIZE: usize = 5000;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("File error: {0}")]
    FileError(#[from] std::io::Error),
    #[error("Parse error: {0}")]
    ParseError(#[from] toml::de::Error),
    #[error("Environment error: {0}")]
    EnvError(String),
}

/// Settings fixed at client construction. The dispatcher captures its own
/// copy, so nothing here changes for the lifetime of a client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Remote push endpoint
    pub push_url: String,
    /// Static label set attached to every stream, e.g. `{job="api"}`
    pub labels: String,
    /// Minimum severity forwarded to the endpoint
    pub send_level: LogLevel,
    /// Minimum severity printed locally
    pub print_level: LogLevel,
    /// Longest a non-empty batch may wait before it is flushed
    #[serde(rename = "batch_wait_ms", with = "duration_serde")]
    pub batch_wait: Duration,
    /// Entry count that forces an immediate flush
    pub batch_entries_number: usize,
    /// Intake queue capacity; producers wait when it is full
    pub queue_capacity: usize,
    pub encoding: Encoding,
    #[serde(rename = "request_timeout_ms", with = "duration_serde")]
    pub request_timeout: Duration,
    #[serde(rename = "connect_timeout_ms", with = "duration_serde")]
    pub connect_timeout: Duration,
    pub user_agent: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            push_url: "http://localhost:3100/api/prom/push".to_string(),
            labels: "{job=\"rask-log-shipper\"}".to_string(),
            send_level: LogLevel::Info,
            print_level: LogLevel::Warn,
            batch_wait: Duration::from_secs(5),
            batch_entries_number: 10_000,
            queue_capacity: LOG_ENTRIES_CHAN_SIZE,
            encoding: Encoding::Protobuf,
            request_timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
            user_agent: format!("rask-log-shipper/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl ClientConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: ClientConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Defaults overridden by `RASK_SHIPPER_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = ClientConfig::default();
        config.apply_env()?;
        config.validate()?;
        Ok(config)
    }

    pub fn apply_env(&mut self) -> Result<(), ConfigError> {
        load_env_string("RASK_SHIPPER_PUSH_URL", &mut self.push_url);
        load_env_string("RASK_SHIPPER_LABELS", &mut self.labels);
        load_env_var("RASK_SHIPPER_SEND_LEVEL", &mut self.send_level)?;
        load_env_var("RASK_SHIPPER_PRINT_LEVEL", &mut self.print_level)?;
        load_env_millis("RASK_SHIPPER_BATCH_WAIT_MS", &mut self.batch_wait)?;
        load_env_var(
            "RASK_SHIPPER_BATCH_ENTRIES_NUMBER",
            &mut self.batch_entries_number,
        )?;
        load_env_var("RASK_SHIPPER_QUEUE_CAPACITY", &mut self.queue_capacity)?;
        load_env_millis("RASK_SHIPPER_REQUEST_TIMEOUT_MS", &mut self.request_timeout)?;
        load_env_millis("RASK_SHIPPER_CONNECT_TIMEOUT_MS", &mut self.connect_timeout)?;
        load_env_string("RASK_SHIPPER_USER_AGENT", &mut self.user_agent);

        // Encoding requires special handling
        if let Ok(encoding) = std::env::var("RASK_SHIPPER_ENCODING") {
            self.encoding = Encoding::from_str(&encoding, true).map_err(|_| {
                ConfigError::EnvError(format!(
                    "Invalid RASK_SHIPPER_ENCODING: {encoding}. Valid values: protobuf, json"
                ))
            })?;
        }

        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let url = Url::parse(&self.push_url).map_err(|e| {
            ConfigError::InvalidUrl(format!("Invalid push URL '{}': {}", self.push_url, e))
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ConfigError::InvalidUrl(format!(
                "Push URL '{}' must use http or https",
                self.push_url
            )));
        }

        let labels = self.labels.trim();
        if !(labels.starts_with('{') && labels.ends_with('}')) {
            return Err(ConfigError::InvalidConfig(format!(
                "Labels must be a label set like {{job=\"name\"}}, got '{}'",
                self.labels
            )));
        }

        if self.batch_entries_number == 0 {
            return Err(ConfigError::InvalidConfig(
                "Batch entries number must be greater than 0".to_string(),
            ));
        }

        if self.batch_wait.is_zero() {
            return Err(ConfigError::InvalidConfig(
                "Batch wait must be greater than 0".to_string(),
            ));
        }

        if self.queue_capacity == 0 {
            return Err(ConfigError::InvalidConfig(
                "Queue capacity must be greater than 0".to_string(),
            ));
        }

        if self.request_timeout.is_zero() || self.connect_timeout.is_zero() {
            return Err(ConfigError::InvalidConfig(
                "Timeouts must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }

    pub fn level_policy(&self) -> LevelPolicy {
        LevelPolicy::new(self.send_level, self.print_level)
    }

    pub fn http_client_config(&self) -> HttpClientConfig {
        HttpClientConfig {
            push_url: self.push_url.clone(),
            timeout: self.request_timeout,
            connection_timeout: self.connect_timeout,
            user_agent: self.user_agent.clone(),
        }
    }
}

/// Helper function to load and parse an environment variable.
/// Returns Ok(()) if the variable doesn't exist (keeps default).
fn load_env_var<T>(name: &str, target: &mut T) -> Result<(), ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    if let Ok(value) = std::env::var(name) {
        *target = value
            .parse()
            .map_err(|e| ConfigError::EnvError(format!("Invalid {name}: {e}")))?;
    }
    Ok(())
}

fn load_env_millis(name: &str, target: &mut Duration) -> Result<(), ConfigError> {
    let mut millis = target.as_millis() as u64;
    load_env_var(name, &mut millis)?;
    *target = Duration::from_millis(millis);
    Ok(())
}

fn load_env_string(name: &str, target: &mut String) {
    if let Ok(value) = std::env::var(name) {
        *target = value;
    }
}

// Durations are carried as milliseconds in files and the environment
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_millis() as u64)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = ClientConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.queue_capacity, LOG_ENTRIES_CHAN_SIZE);
    }

    #[test]
    fn rejects_zero_batch_entries() {
        let config = ClientConfig {
            batch_entries_number: 0,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidConfig(_))
        ));
    }

    #[test]
    fn rejects_zero_batch_wait() {
        let config = ClientConfig {
            batch_wait: Duration::ZERO,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_bad_push_url() {
        let config = ClientConfig {
            push_url: "localhost:3100".to_string(),
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::InvalidUrl(_))));
    }

    #[test]
    fn rejects_unbraced_labels() {
        let config = ClientConfig {
            labels: "job=api".to_string(),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let config = ClientConfig::from_toml_str(
            r#"
            push_url = "http://loki:3100/loki/api/v1/push"
            send_level = "warning"
            batch_wait_ms = 250
            encoding = "json"
            "#,
        )
        .unwrap();

        assert_eq!(config.push_url, "http://loki:3100/loki/api/v1/push");
        assert_eq!(config.send_level, LogLevel::Warn);
        assert_eq!(config.batch_wait, Duration::from_millis(250));
        assert_eq!(config.encoding, Encoding::Json);
        assert_eq!(config.batch_entries_number, 10_000);
    }

    #[test]
    fn exposes_level_policy() {
        let config = ClientConfig {
            send_level: LogLevel::Error,
            print_level: LogLevel::Debug,
            ..Default::default()
        };
        let decision = config.level_policy().decide(LogLevel::Info);
        assert!(decision.print);
        assert!(!decision.send);
    }
}
