use std::collections::VecDeque;

use async_trait::async_trait;
use tokio::sync::Mutex;

use manasik_core::{AttemptOutcome, CompletionClient, CompletionRequest, RelayError};

/// A completion client that replays a scripted sequence of outcomes.
///
/// Once the script is exhausted it answers with the fixed response, if one
/// was configured, or a transport error otherwise.
pub struct MockClient {
    name: String,
    script: Mutex<VecDeque<Result<AttemptOutcome, RelayError>>>,
    fixed_response: Option<String>,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl MockClient {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            script: Mutex::new(VecDeque::new()),
            fixed_response: None,
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn with_response(mut self, response: impl Into<String>) -> Self {
        self.fixed_response = Some(response.into());
        self
    }

    /// Queue an outcome to be returned by the next unscripted attempt.
    pub fn then(mut self, outcome: AttemptOutcome) -> Self {
        self.script.get_mut().push_back(Ok(outcome));
        self
    }

    pub fn then_fail(mut self, error: RelayError) -> Self {
        self.script.get_mut().push_back(Err(error));
        self
    }

    /// Number of attempts made so far.
    pub async fn calls(&self) -> usize {
        self.requests.lock().await.len()
    }

    /// Every request received, in order.
    pub async fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().await.clone()
    }
}

#[async_trait]
impl CompletionClient for MockClient {
    fn name(&self) -> &str {
        &self.name
    }

    async fn attempt(&self, request: &CompletionRequest) -> Result<AttemptOutcome, RelayError> {
        self.requests.lock().await.push(request.clone());

        if let Some(next) = self.script.lock().await.pop_front() {
            return next;
        }
        match &self.fixed_response {
            Some(text) => Ok(AttemptOutcome::Completed(text.clone())),
            None => Err(RelayError::Transport("mock script exhausted".into())),
        }
    }
}
