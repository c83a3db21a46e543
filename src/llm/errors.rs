//! Error types for model backends.

use thiserror::Error;

/// Errors produced while asking a backend for text.
#[derive(Debug, Error)]
pub enum LlmError {
    /// HTTP request failed before a response arrived.
    #[error("HTTP request failed: {0}")]
    HttpRequest(#[from] reqwest::Error),

    /// The backend answered with a non-success status.
    #[error("backend returned status {status}: {body}")]
    HttpStatus {
        /// HTTP status code.
        status: u16,
        /// Truncated response body.
        body: String,
    },

    /// The response could not be parsed into generated text.
    #[error("malformed backend response: {0}")]
    MalformedResponse(String),

    /// The call exceeded its time budget.
    #[error("backend call timed out")]
    Timeout,

    /// Backend configuration error.
    #[error("backend configuration error: {0}")]
    Config(String),
}

impl LlmError {
    /// Longest body excerpt kept in [`LlmError::HttpStatus`].
    pub const MAX_BODY_CHARS: usize = 240;

    /// Build a status error from a raw body, truncating it.
    #[must_use]
    pub fn status(status: u16, body: &str) -> Self {
        Self::HttpStatus {
            status,
            body: body.chars().take(Self::MAX_BODY_CHARS).collect(),
        }
    }

    /// Check if this error is worth retrying.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        match self {
            Self::Timeout | Self::HttpRequest(_) => true,
            Self::HttpStatus { status, .. } => *status == 429 || *status >= 500,
            Self::MalformedResponse(_) | Self::Config(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_body_is_truncated() {
        let body = "x".repeat(1_000);
        match LlmError::status(502, &body) {
            LlmError::HttpStatus { status, body } => {
                assert_eq!(status, 502);
                assert_eq!(body.len(), LlmError::MAX_BODY_CHARS);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_retryable_classification() {
        assert!(LlmError::Timeout.is_retryable());
        assert!(LlmError::status(503, "").is_retryable());
        assert!(LlmError::status(429, "").is_retryable());
        assert!(!LlmError::status(401, "").is_retryable());
        assert!(!LlmError::MalformedResponse(String::new()).is_retryable());
    }
}
