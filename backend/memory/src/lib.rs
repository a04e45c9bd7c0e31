//! Manasik Session Memory
//!
//! Holds the per-session conversation transcripts replayed to the completion
//! service on every request.

pub mod session_store;

pub use session_store::{SessionGuard, SessionId, SessionStore, SessionStoreConfig};
