use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, RETRY_AFTER};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tracing::{debug, warn};

use manasik_core::{AttemptOutcome, CompletionClient, CompletionRequest, RelayError};
use manasik_logging::redact_sensitive_data;

/// Client for any endpoint speaking the OpenAI chat-completions protocol.
pub struct OpenAiCompatClient {
    client: Client,
    api_key: String,
    endpoint: String,
}

impl OpenAiCompatClient {
    /// `endpoint` is the full chat-completions URL, not a base URL.
    pub fn new(
        api_key: impl Into<String>,
        endpoint: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build completion HTTP client")?;

        Ok(Self {
            client,
            api_key: api_key.into(),
            endpoint: endpoint.into(),
        })
    }
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: String,
}

/// Extract `choices[0].message.content` from a success body.
fn parse_completion(body: &str) -> Result<String, RelayError> {
    let parsed: ChatResponse = serde_json::from_str(body)
        .map_err(|e| RelayError::MalformedResponse(e.to_string()))?;

    parsed
        .choices
        .into_iter()
        .next()
        .map(|choice| choice.message.content)
        .ok_or_else(|| RelayError::MalformedResponse("response contained no choices".into()))
}

/// A body that cannot be read means the exchange broke mid-response.
async fn read_body(response: reqwest::Response) -> Result<String, RelayError> {
    response
        .text()
        .await
        .map_err(|e| RelayError::Transport(redact_sensitive_data(&e.to_string())))
}

/// `Retry-After` as whole seconds. HTTP-date values and garbage are ignored.
fn parse_retry_after(headers: &HeaderMap) -> Option<Duration> {
    headers
        .get(RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse::<u64>()
        .ok()
        .map(Duration::from_secs)
}

#[async_trait]
impl CompletionClient for OpenAiCompatClient {
    fn name(&self) -> &str {
        "openai-compat"
    }

    async fn attempt(&self, request: &CompletionRequest) -> Result<AttemptOutcome, RelayError> {
        debug!(
            model = %request.model,
            messages = request.messages.len(),
            "Sending request to completion service"
        );

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(request)
            .send()
            .await
            .map_err(|e| RelayError::Transport(redact_sensitive_data(&e.to_string())))?;

        let status = response.status();
        match status {
            StatusCode::OK => {
                let body = read_body(response).await?;
                parse_completion(&body).map(AttemptOutcome::Completed)
            }
            StatusCode::TOO_MANY_REQUESTS => Ok(AttemptOutcome::Throttled {
                retry_after: parse_retry_after(response.headers()),
            }),
            _ => {
                let body = read_body(response).await?;
                warn!(
                    status = status.as_u16(),
                    body = %redact_sensitive_data(&body),
                    "Completion service rejected request"
                );
                Ok(AttemptOutcome::Rejected {
                    status: status.as_u16(),
                    body,
                })
            }
        }
    }
}
