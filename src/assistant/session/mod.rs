//! Per-user conversation history and its persistence backends.

pub mod backend;
pub mod history;
pub mod json_backend;
pub mod sqlite_backend;
pub mod store;

pub use backend::{HistoryBackend, StoreFuture};
pub use history::SessionHistory;
pub use json_backend::JsonFileHistoryBackend;
pub use sqlite_backend::SqliteHistoryBackend;
pub use store::SessionStore;
