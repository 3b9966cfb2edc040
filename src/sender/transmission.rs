use super::serialization::{EncodedPayload, Encoding, PushEncoder, SerializationError};
use super::{ClientError, HttpClient, HttpClientConfig};
use crate::buffer::Batch;
use reqwest::StatusCode;
use reqwest::header::{CONTENT_ENCODING, CONTENT_TYPE, HeaderMap, HeaderValue};
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum TransmissionError {
    #[error("Serialization failed: {0}")]
    SerializationFailed(#[from] SerializationError),
    #[error("Client error: {0}")]
    ClientError(#[from] ClientError),
    #[error("Request error: {0}")]
    RequestError(#[from] reqwest::Error),
    #[error("Unexpected HTTP status code: {status}, message: {body}")]
    UnexpectedStatus { status: u16, body: String },
}

#[derive(Debug, Clone)]
pub struct TransmissionResult {
    pub status_code: u16,
    pub latency: Duration,
    pub batch_id: String,
    pub entries: usize,
    pub bytes_sent: usize,
}

/// Destination for finished batches.
///
/// The dispatcher awaits each call before handling the next event, so an
/// implementation never sees two batches concurrently.
pub trait BatchSink: Send + Sync + 'static {
    fn send_batch(
        &self,
        batch: Batch,
    ) -> impl Future<Output = Result<TransmissionResult, TransmissionError>> + Send;
}

impl<T: BatchSink> BatchSink for Arc<T> {
    fn send_batch(
        &self,
        batch: Batch,
    ) -> impl Future<Output = Result<TransmissionResult, TransmissionError>> + Send {
        (**self).send_batch(batch)
    }
}

/// Pushes batches to the remote endpoint over HTTP.
///
/// Only `204 No Content` counts as accepted; anything else is reported with
/// the response body so the caller can log it.
#[derive(Debug, Clone)]
pub struct HttpTransmitter {
    pub client: HttpClient,
    encoder: PushEncoder,
}

impl HttpTransmitter {
    pub fn new(client: HttpClient, encoding: Encoding) -> Self {
        Self {
            client,
            encoder: PushEncoder::new(encoding),
        }
    }

    pub fn from_config(
        config: HttpClientConfig,
        encoding: Encoding,
    ) -> Result<Self, TransmissionError> {
        Ok(Self::new(HttpClient::new(config)?, encoding))
    }

    pub fn encoding(&self) -> Encoding {
        self.encoder.encoding()
    }

    pub fn build_headers(&self, payload: &EncodedPayload) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static(payload.content_type));
        if let Some(encoding) = payload.content_encoding {
            headers.insert(CONTENT_ENCODING, HeaderValue::from_static(encoding));
        }
        headers
    }

    async fn transmit(&self, batch: Batch) -> Result<TransmissionResult, TransmissionError> {
        let start = Instant::now();
        let entries = batch.size();

        let payload = self.encoder.encode(&batch)?;
        let bytes_sent = payload.body.len();

        debug!(
            "Pushing batch {} ({} entries, {} bytes, {} before compression)",
            batch.id(),
            entries,
            bytes_sent,
            payload.uncompressed_len
        );

        let response = self
            .client
            .client
            .post(self.client.push_url.clone())
            .headers(self.build_headers(&payload))
            .body(payload.body)
            .send()
            .await?;

        let status = response.status();
        if status != StatusCode::NO_CONTENT {
            let body = response.text().await.unwrap_or_default();
            return Err(TransmissionError::UnexpectedStatus {
                status: status.as_u16(),
                body,
            });
        }

        Ok(TransmissionResult {
            status_code: status.as_u16(),
            latency: start.elapsed(),
            batch_id: batch.id().to_string(),
            entries,
            bytes_sent,
        })
    }
}

impl BatchSink for HttpTransmitter {
    async fn send_batch(&self, batch: Batch) -> Result<TransmissionResult, TransmissionError> {
        self.transmit(batch).await
    }
}
