//! Error types for the assistant core.

use thiserror::Error;

use crate::assistant::core::ids::UserIdError;
use crate::llm::LlmError;

/// Assistant subsystem error type.
#[derive(Debug, Error)]
pub enum AssistantError {
    /// Invalid configuration or unsupported values.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    /// Rejected user identifier.
    #[error("invalid user id: {0}")]
    InvalidUserId(#[from] UserIdError),
    /// Persisted history could not be decoded.
    #[error("corrupt history for {user_id}: {reason}")]
    CorruptHistory {
        /// Owner of the unreadable record.
        user_id: String,
        /// Decoder message.
        reason: String,
    },
    /// Model backend failure.
    #[error("model backend error: {0}")]
    Llm(#[from] LlmError),
    /// `SQLite` storage error (sync).
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    /// `SQLite` storage error (async).
    #[error("tokio-rusqlite error: {0}")]
    TokioSqlite(#[from] tokio_rusqlite::Error),
    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    /// Invalid built-in pattern.
    #[error("regex error: {0}")]
    Regex(#[from] regex::Error),
    /// URL parse error.
    #[error("url parse error: {0}")]
    Url(#[from] url::ParseError),
    /// I/O error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience result alias for assistant operations.
pub type AssistantResult<T> = Result<T, AssistantError>;
