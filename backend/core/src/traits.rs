use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;

use crate::error::RelayError;
use crate::types::Turn;

/// Body sent to the remote completion service.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CompletionRequest {
    pub model: String,
    pub messages: Vec<Turn>,
    pub temperature: f32,
    pub max_tokens: u32,
}

/// What a single call to the completion service produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptOutcome {
    /// HTTP 200 carrying the first choice's message content.
    Completed(String),
    /// HTTP 429. `retry_after` is the parsed `Retry-After` header, if any.
    Throttled { retry_after: Option<Duration> },
    /// Any other HTTP status, with the raw response body.
    Rejected { status: u16, body: String },
}

/// A remote service able to complete a conversation.
///
/// Implementations perform exactly one HTTP exchange per call; retrying is the
/// caller's business. Transport failures and malformed success bodies are
/// returned as [`RelayError`] rather than outcomes.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    /// Client name used in logs (e.g., "openai-compat", "mock").
    fn name(&self) -> &str;

    async fn attempt(&self, request: &CompletionRequest) -> Result<AttemptOutcome, RelayError>;
}
