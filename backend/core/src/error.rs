use thiserror::Error;

/// Failure of a relay request, as reported back to the caller.
///
/// The `Display` text of each variant is the exact string placed in the
/// `error` field of the chat response.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RelayError {
    /// Every attempt was throttled by the completion service.
    #[error("The service is currently busy. Please try again later.")]
    Busy,

    /// The completion service answered with a status other than 200 or 429.
    #[error("{status}: {body}")]
    Remote { status: u16, body: String },

    /// A 200 response whose body did not carry a completion.
    #[error("malformed completion response: {0}")]
    MalformedResponse(String),

    /// The request never produced an HTTP response.
    #[error("completion service unreachable: {0}")]
    Transport(String),
}
