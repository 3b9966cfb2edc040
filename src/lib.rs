#![deny(warnings, rust_2024_compatibility)]
// Specific pedantic lints enforced (not blanket allow):
#![deny(
    clippy::explicit_iter_loop,
    clippy::manual_let_else,
    clippy::semicolon_if_nothing_returned,
    clippy::inconsistent_struct_constructor
)]
// Noisy pedantic lints suppressed with justification:
#![allow(
    clippy::cast_possible_truncation, // Durations and counters stay far below the limits
    clippy::cast_possible_wrap,       // Protobuf nanos are always < 1e9
    clippy::missing_errors_doc,       // Internal API
    clippy::missing_panics_doc,       // Internal API
    clippy::module_name_repetitions,  // e.g. SerializationError in serialization module
    clippy::must_use_candidate,       // Annotated selectively on critical APIs
    clippy::doc_markdown              // Internal API
)]

pub mod app;
pub mod buffer;
pub mod domain;
pub mod sender;

// Re-export main types for easy access
pub use app::{Client, ClientConfig, DispatcherState, Fields};
pub use domain::{LogLevel, ShipperError};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
