//! Session store: per-user bounded history with a write-through cache.
//!
//! The cache is a plain `DashMap` keyed by user id. Entries are only removed by
//! [`SessionStore::clear`]. Two concurrent requests for the same user may
//! interleave their appends; nothing here serializes them. The persisted record
//! then holds whichever full snapshot was written last, and the JSON backend
//! gives each write its own temp file so racing renames cannot clobber a
//! half-written one.

use std::sync::Arc;

use dashmap::DashMap;
use tracing::{debug, info, warn};

use crate::assistant::core::config::{HistoryBackendKind, SessionConfig};
use crate::assistant::core::errors::AssistantResult;
use crate::assistant::core::ids::UserId;
use crate::assistant::core::turn::ConversationTurn;
use crate::assistant::session::backend::HistoryBackend;
use crate::assistant::session::history::SessionHistory;
use crate::assistant::session::json_backend::JsonFileHistoryBackend;
use crate::assistant::session::sqlite_backend::SqliteHistoryBackend;

/// Per-user conversation history with durable persistence.
pub struct SessionStore {
    backend: Arc<dyn HistoryBackend>,
    cache: DashMap<UserId, SessionHistory>,
    max_turns: usize,
}

impl SessionStore {
    /// Create a store over an existing backend.
    #[must_use]
    pub fn new(backend: Arc<dyn HistoryBackend>, max_turns: usize) -> Self {
        Self {
            backend,
            cache: DashMap::new(),
            max_turns,
        }
    }

    /// Build the configured backend and wrap it.
    ///
    /// # Errors
    /// Returns an error if the backend cannot be opened.
    pub async fn from_config(config: &SessionConfig) -> AssistantResult<Self> {
        let backend: Arc<dyn HistoryBackend> = match config.backend {
            HistoryBackendKind::JsonDir => {
                Arc::new(JsonFileHistoryBackend::new(config.path.clone()).await?)
            }
            HistoryBackendKind::Sqlite => Arc::new(SqliteHistoryBackend::new(&config.path).await?),
        };
        info!(
            backend = ?config.backend,
            path = %config.path.display(),
            max_turns = config.max_turns,
            "session store ready"
        );
        Ok(Self::new(backend, config.max_turns))
    }

    /// Turns kept per user.
    #[must_use]
    pub const fn max_turns(&self) -> usize {
        self.max_turns
    }

    /// Load a user's history.
    ///
    /// Missing records and unreadable records both yield an empty history; the
    /// latter is logged and discarded, never surfaced to the caller.
    pub async fn load(&self, user_id: &UserId) -> SessionHistory {
        if let Some(history) = self.cache.get(user_id) {
            return history.clone();
        }

        let history = match self.backend.read(user_id).await {
            Ok(Some(turns)) => SessionHistory::from_turns(turns, self.max_turns),
            Ok(None) => SessionHistory::new(self.max_turns),
            Err(err) => {
                warn!(user_id = %user_id, error = %err, "discarding unreadable history");
                SessionHistory::new(self.max_turns)
            }
        };

        self.cache
            .entry(user_id.clone())
            .or_insert(history)
            .clone()
    }

    /// Append a turn, evict beyond the bound, then persist the whole history.
    ///
    /// The in-memory history is updated before the write; a crash in between
    /// loses at most this turn.
    ///
    /// # Errors
    /// Returns an error if the persistence write fails. The cached history keeps
    /// the new turn either way.
    pub async fn append(&self, user_id: &UserId, turn: ConversationTurn) -> AssistantResult<()> {
        let mut history = self.load(user_id).await;
        let evicted = history.push(turn);
        let snapshot = history.to_vec();
        self.cache.insert(user_id.clone(), history);

        if evicted > 0 {
            debug!(user_id = %user_id, evicted, "evicted oldest turns");
        }

        self.backend.write(user_id, snapshot).await
    }

    /// Forget a user's history on disk, then in memory.
    ///
    /// # Errors
    /// Returns an error if the persisted record cannot be removed; the cached
    /// history is kept so memory and disk stay in agreement.
    pub async fn clear(&self, user_id: &UserId) -> AssistantResult<()> {
        self.backend.remove(user_id).await?;
        self.cache.remove(user_id);
        info!(user_id = %user_id, "history cleared");
        Ok(())
    }

    /// Number of users currently cached.
    #[must_use]
    pub fn cached_users(&self) -> usize {
        self.cache.len()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::assistant::core::errors::AssistantError;
    use crate::assistant::session::backend::StoreFuture;

    async fn json_store(dir: &std::path::Path) -> SessionStore {
        let backend = JsonFileHistoryBackend::new(dir).await.unwrap();
        SessionStore::new(Arc::new(backend), 10)
    }

    #[tokio::test]
    async fn test_load_unknown_user_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = json_store(dir.path()).await;
        let history = store.load(&UserId::new("new-user").unwrap()).await;
        assert!(history.is_empty());
        assert_eq!(history.max_turns(), 10);
    }

    #[tokio::test]
    async fn test_twelve_appends_keep_last_ten_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let store = json_store(dir.path()).await;
        let user = UserId::new("u").unwrap();

        for i in 0..12 {
            store
                .append(&user, ConversationTurn::user(format!("turn {i}")))
                .await
                .unwrap();
        }

        let contents: Vec<String> = store
            .load(&user)
            .await
            .iter()
            .map(|t| t.content.clone())
            .collect();
        let expected: Vec<String> = (2..12).map(|i| format!("turn {i}")).collect();
        assert_eq!(contents, expected);

        let reopened = json_store(dir.path()).await;
        let persisted: Vec<String> = reopened
            .load(&user)
            .await
            .iter()
            .map(|t| t.content.clone())
            .collect();
        assert_eq!(persisted, expected);
    }

    #[tokio::test]
    async fn test_corrupt_history_starts_empty_and_recovers() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("zoe.json"), "{ not json").unwrap();
        let store = json_store(dir.path()).await;
        let user = UserId::new("zoe").unwrap();

        assert!(store.load(&user).await.is_empty());

        store
            .append(&user, ConversationTurn::user("hello again"))
            .await
            .unwrap();
        let reopened = json_store(dir.path()).await;
        assert_eq!(reopened.load(&user).await.len(), 1);
    }

    #[tokio::test]
    async fn test_clear_empties_memory_and_disk() {
        let dir = tempfile::tempdir().unwrap();
        let store = json_store(dir.path()).await;
        let user = UserId::new("yuki").unwrap();

        store
            .append(&user, ConversationTurn::user("remember me"))
            .await
            .unwrap();
        assert_eq!(store.cached_users(), 1);

        store.clear(&user).await.unwrap();
        assert_eq!(store.cached_users(), 0);
        assert!(store.load(&user).await.is_empty());
        assert!(!dir.path().join("yuki.json").exists());
    }

    #[tokio::test]
    async fn test_users_are_isolated() {
        let dir = tempfile::tempdir().unwrap();
        let store = json_store(dir.path()).await;
        let a = UserId::new("a").unwrap();
        let b = UserId::new("b").unwrap();

        store.append(&a, ConversationTurn::user("a1")).await.unwrap();
        store.append(&b, ConversationTurn::user("b1")).await.unwrap();
        store.clear(&a).await.unwrap();

        assert!(store.load(&a).await.is_empty());
        assert_eq!(store.load(&b).await.len(), 1);
    }

    struct FailingWrites {
        writes: AtomicUsize,
    }

    impl HistoryBackend for FailingWrites {
        fn read<'a>(
            &'a self,
            _user_id: &'a UserId,
        ) -> StoreFuture<'a, AssistantResult<Option<Vec<ConversationTurn>>>> {
            Box::pin(async { Ok(None) })
        }

        fn write<'a>(
            &'a self,
            _user_id: &'a UserId,
            _turns: Vec<ConversationTurn>,
        ) -> StoreFuture<'a, AssistantResult<()>> {
            self.writes.fetch_add(1, Ordering::SeqCst);
            Box::pin(async {
                Err(AssistantError::Io(std::io::Error::other("disk full")))
            })
        }

        fn remove<'a>(&'a self, _user_id: &'a UserId) -> StoreFuture<'a, AssistantResult<()>> {
            Box::pin(async { Ok(()) })
        }
    }

    struct StuckRecord;

    impl HistoryBackend for StuckRecord {
        fn read<'a>(
            &'a self,
            _user_id: &'a UserId,
        ) -> StoreFuture<'a, AssistantResult<Option<Vec<ConversationTurn>>>> {
            Box::pin(async { Ok(Some(vec![ConversationTurn::user("on disk")])) })
        }

        fn write<'a>(
            &'a self,
            _user_id: &'a UserId,
            _turns: Vec<ConversationTurn>,
        ) -> StoreFuture<'a, AssistantResult<()>> {
            Box::pin(async { Ok(()) })
        }

        fn remove<'a>(&'a self, _user_id: &'a UserId) -> StoreFuture<'a, AssistantResult<()>> {
            Box::pin(async {
                Err(AssistantError::Io(std::io::Error::other("read-only")))
            })
        }
    }

    #[tokio::test]
    async fn test_failed_clear_keeps_cache_in_step_with_disk() {
        let store = SessionStore::new(Arc::new(StuckRecord), 10);
        let user = UserId::new("r").unwrap();

        store
            .append(&user, ConversationTurn::assistant("cached"))
            .await
            .unwrap();
        assert!(store.clear(&user).await.is_err());

        assert_eq!(store.cached_users(), 1);
        let contents: Vec<String> = store
            .load(&user)
            .await
            .iter()
            .map(|t| t.content.clone())
            .collect();
        assert_eq!(contents, vec!["on disk".to_string(), "cached".to_string()]);
    }

    #[tokio::test]
    async fn test_append_attempts_write_every_time() {
        let backend = Arc::new(FailingWrites {
            writes: AtomicUsize::new(0),
        });
        let store = SessionStore::new(backend.clone(), 10);
        let user = UserId::new("w").unwrap();

        assert!(store.append(&user, ConversationTurn::user("1")).await.is_err());
        assert!(store.append(&user, ConversationTurn::user("2")).await.is_err());

        assert_eq!(backend.writes.load(Ordering::SeqCst), 2);
        assert_eq!(store.load(&user).await.len(), 2);
    }
}
