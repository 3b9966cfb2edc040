pub mod client;
pub mod proto;
pub mod serialization;
pub mod stats;
pub mod transmission;

pub use client::{ClientError, HttpClient, HttpClientConfig};
pub use proto::{EntryAdapter, PushRequest, StreamAdapter};
pub use serialization::{EncodedPayload, Encoding, PushEncoder, SerializationError};
pub use stats::{StatsSnapshot, TransmissionStats};
pub use transmission::{BatchSink, HttpTransmitter, TransmissionError, TransmissionResult};
