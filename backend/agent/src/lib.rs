//! Manasik Relay
//!
//! Appends caller turns to a session transcript, forwards the transcript to the
//! completion service with bounded retry, and records the reply.

pub mod model_config;
pub mod relay;
pub mod retry;
pub mod system_prompt;

pub use model_config::ModelConfig;
pub use relay::RelayHandler;
pub use retry::RetryPolicy;
pub use system_prompt::SYSTEM_PROMPT;
