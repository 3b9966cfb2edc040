use super::proto::PushRequest;
use crate::buffer::Batch;
use bytes::Bytes;
use clap::ValueEnum;
use flate2::{Compression, write::GzEncoder};
use prost::Message;
use serde::{Deserialize, Serialize};
use std::io::Write;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SerializationError {
    #[error("Protobuf encoding failed: {0}")]
    ProtobufError(#[from] prost::EncodeError),
    #[error("JSON serialization failed: {0}")]
    JsonError(#[from] serde_json::Error),
    #[error("Snappy compression failed: {0}")]
    SnappyError(#[from] snap::Error),
    #[error("IO error during serialization: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Batch is empty")]
    EmptyBatch,
}

/// Wire encoding used for push requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Encoding {
    /// Snappy-compressed protobuf `PushRequest` (default)
    #[default]
    Protobuf,
    /// Gzip-compressed JSON push body
    Json,
}

impl Encoding {
    pub fn content_type(self) -> &'static str {
        match self {
            Encoding::Protobuf => "application/x-protobuf",
            Encoding::Json => "application/json",
        }
    }

    /// Value for the `Content-Encoding` header, if the body needs one.
    pub fn content_encoding(self) -> Option<&'static str> {
        match self {
            Encoding::Protobuf => None,
            Encoding::Json => Some("gzip"),
        }
    }
}

/// A serialized, compressed request body plus the headers describing it.
#[derive(Debug, Clone)]
pub struct EncodedPayload {
    pub body: Bytes,
    pub content_type: &'static str,
    pub content_encoding: Option<&'static str>,
    pub uncompressed_len: usize,
}

#[derive(Serialize)]
struct JsonPushRequest<'a> {
    streams: Vec<JsonStream<'a>>,
}

#[derive(Serialize)]
struct JsonStream<'a> {
    labels: &'a str,
    entries: Vec<JsonEntry<'a>>,
}

#[derive(Serialize)]
struct JsonEntry<'a> {
    ts: String,
    line: &'a str,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PushEncoder {
    encoding: Encoding,
}

impl PushEncoder {
    pub fn new(encoding: Encoding) -> Self {
        Self { encoding }
    }

    pub fn encoding(&self) -> Encoding {
        self.encoding
    }

    pub fn encode(&self, batch: &Batch) -> Result<EncodedPayload, SerializationError> {
        if batch.is_empty() {
            return Err(SerializationError::EmptyBatch);
        }

        let (body, uncompressed_len) = match self.encoding {
            Encoding::Protobuf => {
                let raw = self.serialize_protobuf(batch)?;
                let compressed = snap::raw::Encoder::new().compress_vec(&raw)?;
                (compressed, raw.len())
            }
            Encoding::Json => {
                let raw = self.serialize_json(batch)?;
                let mut encoder = GzEncoder::new(Vec::new(), Compression::fast());
                encoder.write_all(&raw)?;
                (encoder.finish()?, raw.len())
            }
        };

        Ok(EncodedPayload {
            body: Bytes::from(body),
            content_type: self.encoding.content_type(),
            content_encoding: self.encoding.content_encoding(),
            uncompressed_len,
        })
    }

    pub fn serialize_protobuf(&self, batch: &Batch) -> Result<Vec<u8>, SerializationError> {
        let request = PushRequest::from(batch);
        let mut buf = Vec::with_capacity(request.encoded_len());
        request.encode(&mut buf)?;
        Ok(buf)
    }

    pub fn serialize_json(&self, batch: &Batch) -> Result<Vec<u8>, SerializationError> {
        let entries = batch
            .entries()
            .iter()
            .map(|record| JsonEntry {
                ts: record
                    .timestamp
                    .to_datetime()
                    .unwrap_or_default()
                    .to_rfc3339_opts(chrono::SecondsFormat::Nanos, true),
                line: &record.line,
            })
            .collect();

        let request = JsonPushRequest {
            streams: vec![JsonStream {
                labels: batch.labels(),
                entries,
            }],
        };

        Ok(serde_json::to_vec(&request)?)
    }
}
