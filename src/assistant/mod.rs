//! Medical chatbot core.
//!
//! This module is organized into:
//! - `core`: configuration, errors, ids, intents, and conversation turns
//! - `session`: bounded per-user history with JSON-file or `SQLite` persistence
//! - `router`: intent classification (remote call with keyword fallback)
//! - `normalize`: canonical four-section response layout
//! - `handlers`: per-intent prompt construction
//! - `orchestrator`: the request pipeline tying everything together

pub mod core;
pub mod handlers;
pub mod normalize;
pub mod orchestrator;
pub mod router;
pub mod session;

pub use self::core::{
    AssistantConfig, AssistantError, AssistantResult, ConversationTurn, Intent, RequestId,
    TurnRole, UserId, UserIdError,
};
pub use handlers::{ChatContext, PromptBuilder};
pub use normalize::ResponseNormalizer;
pub use orchestrator::{AssistantReply, ChatbotOrchestrator};
pub use router::IntentRouter;
pub use session::{
    HistoryBackend, JsonFileHistoryBackend, SessionHistory, SessionStore, SqliteHistoryBackend,
};
