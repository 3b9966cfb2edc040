//! Push-protocol messages for the Loki-compatible protobuf endpoint.
//!
//! Field numbers mirror `logproto.PushRequest` so any Loki ingester can
//! decode the payload.

use crate::buffer::Batch;
use crate::domain::LogRecord;

#[derive(Clone, PartialEq, prost::Message)]
pub struct PushRequest {
    #[prost(message, repeated, tag = "1")]
    pub streams: Vec<StreamAdapter>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct StreamAdapter {
    #[prost(string, tag = "1")]
    pub labels: String,
    #[prost(message, repeated, tag = "2")]
    pub entries: Vec<EntryAdapter>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct EntryAdapter {
    #[prost(message, optional, tag = "1")]
    pub timestamp: Option<prost_types::Timestamp>,
    #[prost(string, tag = "2")]
    pub line: String,
}

impl From<&LogRecord> for EntryAdapter {
    fn from(record: &LogRecord) -> Self {
        Self {
            timestamp: Some(prost_types::Timestamp {
                seconds: record.timestamp.seconds,
                nanos: record.timestamp.nanos as i32,
            }),
            line: record.line.clone(),
        }
    }
}

impl From<&Batch> for PushRequest {
    /// One stream per batch, carrying every entry in arrival order.
    fn from(batch: &Batch) -> Self {
        Self {
            streams: vec![StreamAdapter {
                labels: batch.labels().to_string(),
                entries: batch.entries().iter().map(EntryAdapter::from).collect(),
            }],
        }
    }
}
