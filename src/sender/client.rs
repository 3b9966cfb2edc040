use reqwest::{Client, ClientBuilder};
use std::time::Duration;
use thiserror::Error;
use url::Url;

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),
    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),
}

/// Connection settings for the push endpoint.
#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    pub push_url: String,
    pub timeout: Duration,
    pub connection_timeout: Duration,
    pub user_agent: String,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            push_url: "http://localhost:3100/api/prom/push".to_string(),
            timeout: Duration::from_secs(30),
            connection_timeout: Duration::from_secs(10),
            user_agent: format!("rask-log-shipper/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

#[derive(Debug, Clone)]
pub struct HttpClient {
    pub client: Client,
    pub config: HttpClientConfig,
    pub push_url: Url,
}

impl HttpClient {
    pub fn new(config: HttpClientConfig) -> Result<Self, ClientError> {
        let push_url: Url = config
            .push_url
            .parse()
            .map_err(|e| ClientError::InvalidConfiguration(format!("Invalid push URL: {e}")))?;

        if !matches!(push_url.scheme(), "http" | "https") {
            return Err(ClientError::InvalidConfiguration(format!(
                "Unsupported push URL scheme: {}",
                push_url.scheme()
            )));
        }

        let client = ClientBuilder::new()
            .timeout(config.timeout)
            .connect_timeout(config.connection_timeout)
            .user_agent(&config.user_agent)
            .build()
            .map_err(|e| {
                ClientError::InvalidConfiguration(format!("Failed to build HTTP client: {e}"))
            })?;

        Ok(Self {
            client,
            config,
            push_url,
        })
    }

    pub fn endpoint(&self) -> &str {
        self.push_url.as_str()
    }
}
