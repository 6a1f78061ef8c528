//! Completion service boundary.
//!
//! The application layer only sees [`CompletionService`]; the HTTP client
//! and the retry policy live in `parley-interaction`.

use crate::conversation::ConversationTurn;
use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

/// Failure of a completion request.
///
/// Messages are technical and meant for logs. They are never shown to end
/// users.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ServiceError {
    /// The request could not be sent or the connection broke.
    #[error("Completion request failed: {message}")]
    Transport { message: String, is_retryable: bool },

    /// The attempt exceeded its deadline.
    #[error("Completion request timed out after {0:?}")]
    Timeout(Duration),

    /// The service answered with a non-success status.
    #[error("Completion service returned {status}: {message}")]
    Status {
        status: u16,
        message: String,
        is_retryable: bool,
    },

    /// The service answered without usable content.
    #[error("Completion service returned an empty response")]
    EmptyResponse,

    /// The response body could not be decoded.
    #[error("Malformed completion response: {0}")]
    Malformed(String),

    /// The client is not usable (e.g. missing credentials).
    #[error("Completion service unavailable: {0}")]
    Unavailable(String),

    /// Every attempt failed.
    #[error("Completion failed after {attempts} attempt(s): {last}")]
    Exhausted {
        attempts: u32,
        last: Box<ServiceError>,
    },
}

impl ServiceError {
    /// Whether the service itself hinted that a retry could succeed.
    ///
    /// Informational only: the retry policy retries every failure.
    pub fn is_retryable(&self) -> bool {
        match self {
            ServiceError::Transport { is_retryable, .. } => *is_retryable,
            ServiceError::Status { is_retryable, .. } => *is_retryable,
            ServiceError::Timeout(_) | ServiceError::EmptyResponse => true,
            ServiceError::Malformed(_) | ServiceError::Unavailable(_) => false,
            ServiceError::Exhausted { .. } => false,
        }
    }
}

/// A remote generative-language service.
#[async_trait]
pub trait CompletionService: Send + Sync {
    /// Sends `turns` (system instruction first) and returns the reply text.
    async fn complete(&self, turns: &[ConversationTurn]) -> Result<String, ServiceError>;
}
