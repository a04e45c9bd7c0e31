pub mod error;
pub mod traits;
pub mod types;

pub use error::RelayError;
pub use traits::{AttemptOutcome, CompletionClient, CompletionRequest};
pub use types::{Role, Transcript, Turn};
