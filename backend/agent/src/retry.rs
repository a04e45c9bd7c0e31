use std::time::Duration;

/// Bounded retry for throttled completion calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first.
    pub max_attempts: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self { max_attempts: 5 }
    }
}

impl RetryPolicy {
    /// Wait before the attempt following `attempt` (zero-based).
    ///
    /// The server's `Retry-After` hint wins; otherwise `2^attempt` seconds.
    pub fn backoff(&self, attempt: u32, retry_after: Option<Duration>) -> Duration {
        retry_after.unwrap_or_else(|| Duration::from_secs(2u64.saturating_pow(attempt)))
    }
}
