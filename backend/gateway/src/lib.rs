//! Manasik Gateway HTTP API Server
//!
//! Serves the chat relay endpoint plus health and session inspection routes.

pub mod chat_api;
pub mod health_api;
pub mod server;
pub mod sessions_api;

pub use chat_api::{ChatReply, ChatRequest};
pub use server::{GatewayState, build_router, start_server};
