use thiserror::Error;

/// Top-level error type for the shipper.
#[derive(Error, Debug)]
pub enum ShipperError {
    #[error("Configuration error: {0}")]
    Config(#[from] crate::app::ConfigError),

    #[error("Client error: {0}")]
    Client(#[from] crate::sender::ClientError),

    #[error("Transmission error: {0}")]
    Transmission(#[from] crate::sender::TransmissionError),

    #[error("Render error: {0}")]
    Render(#[from] serde_json::Error),

    #[error("Runtime error: {0}")]
    Runtime(String),
}
