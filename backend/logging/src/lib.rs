//! Structured logging for Manasik.
//!
//! Console output, optional NDJSON file rotation, and scrubbing of credentials
//! before they reach a log line.

pub mod logger;
pub mod redact;

pub use logger::init_logger;
pub use redact::redact_sensitive_data;
