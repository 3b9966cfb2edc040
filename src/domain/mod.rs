//! Domain layer for rask-log-shipper.
//!
//! Contains the canonical types shared across all modules:
//! - `LogRecord`: a timestamped, rendered line
//! - `LogLevel`: record severity (Debug/Info/Warn/Error)
//! - `LevelPolicy`: the print/send threshold decision
//! - `ShipperError`: Top-level error type

pub mod error;
pub mod level_policy;
pub mod log_level;
pub mod log_record;

pub use error::ShipperError;
pub use level_policy::{Decision, LevelPolicy};
pub use log_level::LogLevel;
pub use log_record::{LogRecord, QueuedRecord, Timestamp};
