//! Request relay to the completion service.

use std::sync::Arc;

use tracing::{error, info, instrument, warn};

use manasik_core::{AttemptOutcome, CompletionClient, CompletionRequest, RelayError, Turn};
use manasik_memory::SessionStore;

use crate::model_config::ModelConfig;
use crate::retry::RetryPolicy;

/// Appends caller turns to a session and asks the completion service for the
/// next assistant turn.
pub struct RelayHandler {
    store: SessionStore,
    client: Arc<dyn CompletionClient>,
    model: ModelConfig,
    retry: RetryPolicy,
}

impl RelayHandler {
    pub fn new(store: SessionStore, client: Arc<dyn CompletionClient>) -> Self {
        Self {
            store,
            client,
            model: ModelConfig::default(),
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_model(mut self, model: ModelConfig) -> Self {
        self.model = model;
        self
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    /// Relay one request for `session_id`.
    ///
    /// The session stays locked for the whole exchange, backoff included.
    /// Incoming turns are kept even when the call fails; only a successful
    /// reply adds an assistant turn.
    #[instrument(skip(self, incoming), fields(client = self.client.name(), turns = incoming.len()))]
    pub async fn handle(
        &self,
        session_id: &str,
        incoming: Vec<Turn>,
        reset: bool,
    ) -> Result<String, RelayError> {
        let mut transcript = self.store.get_or_create(session_id, reset).await;
        transcript.extend(incoming);

        let request = CompletionRequest {
            model: self.model.model_name.clone(),
            messages: transcript.turns().to_vec(),
            temperature: self.model.temperature,
            max_tokens: self.model.max_tokens,
        };

        for attempt in 0..self.retry.max_attempts {
            match self.client.attempt(&request).await {
                Ok(AttemptOutcome::Completed(reply)) => {
                    transcript.push(Turn::assistant(reply.clone()));
                    info!(
                        attempt = attempt + 1,
                        transcript_len = transcript.len(),
                        "Reply received"
                    );
                    return Ok(reply);
                }
                Ok(AttemptOutcome::Throttled { retry_after }) => {
                    if attempt + 1 == self.retry.max_attempts {
                        break;
                    }
                    let wait = self.retry.backoff(attempt, retry_after);
                    warn!(
                        attempt = attempt + 1,
                        wait_secs = wait.as_secs(),
                        "Completion service throttled, backing off"
                    );
                    tokio::time::sleep(wait).await;
                }
                Ok(AttemptOutcome::Rejected { status, body }) => {
                    return Err(RelayError::Remote { status, body });
                }
                Err(e) => {
                    error!(error = %e, "Completion call failed");
                    return Err(e);
                }
            }
        }

        warn!(
            attempts = self.retry.max_attempts,
            "Retry budget exhausted while throttled"
        );
        Err(RelayError::Busy)
    }
}
