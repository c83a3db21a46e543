//! Core assistant types and identifiers.

pub mod config;
pub mod errors;
pub mod ids;
pub mod intent;
pub mod turn;

pub use config::{
    AssistantConfig, BackendKind, ClassifierConfig, HistoryBackendKind, LlmConfig, PromptConfig,
    ServerConfig, SessionConfig,
};
pub use errors::{AssistantError, AssistantResult};
pub use ids::{RequestId, UserId, UserIdError};
pub use intent::Intent;
pub use turn::{ConversationTurn, TurnRole};
