//! JSON file history backend: one `<user_id>.json` document per user.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::assistant::core::errors::{AssistantError, AssistantResult};
use crate::assistant::core::ids::UserId;
use crate::assistant::core::turn::ConversationTurn;
use crate::assistant::session::backend::{HistoryBackend, StoreFuture};

#[derive(Debug, Serialize, Deserialize)]
struct HistoryRecord {
    user_id: UserId,
    updated_at: DateTime<Utc>,
    turns: Vec<ConversationTurn>,
}

/// Directory of per-user JSON history files.
pub struct JsonFileHistoryBackend {
    dir: PathBuf,
}

impl JsonFileHistoryBackend {
    /// Open (and create if needed) the history directory.
    ///
    /// # Errors
    /// Returns an error if the directory cannot be created.
    pub async fn new(dir: impl Into<PathBuf>) -> AssistantResult<Self> {
        let dir = dir.into();
        tokio::fs::create_dir_all(&dir).await?;
        Ok(Self { dir })
    }

    fn record_path(&self, user_id: &UserId) -> PathBuf {
        self.dir.join(format!("{user_id}.json"))
    }
}

async fn write_then_rename(
    tmp: &Path,
    path: &Path,
    payload: &[u8],
) -> std::io::Result<()> {
    tokio::fs::write(tmp, payload).await?;
    tokio::fs::rename(tmp, path).await
}

impl HistoryBackend for JsonFileHistoryBackend {
    fn read<'a>(
        &'a self,
        user_id: &'a UserId,
    ) -> StoreFuture<'a, AssistantResult<Option<Vec<ConversationTurn>>>> {
        Box::pin(async move {
            let path = self.record_path(user_id);
            let bytes = match tokio::fs::read(&path).await {
                Ok(bytes) => bytes,
                Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
                Err(err) => return Err(err.into()),
            };

            let record: HistoryRecord =
                serde_json::from_slice(&bytes).map_err(|err| AssistantError::CorruptHistory {
                    user_id: user_id.to_string(),
                    reason: err.to_string(),
                })?;

            if record.user_id != *user_id {
                return Err(AssistantError::CorruptHistory {
                    user_id: user_id.to_string(),
                    reason: format!("record belongs to {}", record.user_id),
                });
            }

            Ok(Some(record.turns))
        })
    }

    fn write<'a>(
        &'a self,
        user_id: &'a UserId,
        turns: Vec<ConversationTurn>,
    ) -> StoreFuture<'a, AssistantResult<()>> {
        Box::pin(async move {
            let record = HistoryRecord {
                user_id: user_id.clone(),
                updated_at: Utc::now(),
                turns,
            };
            let payload = serde_json::to_vec_pretty(&record)?;

            let path = self.record_path(user_id);
            // One temp file per write; concurrent writers never share it.
            let tmp = path.with_extension(format!("{}.tmp", Uuid::new_v4().simple()));
            if let Err(err) = write_then_rename(&tmp, &path, &payload).await {
                let _ = tokio::fs::remove_file(&tmp).await;
                return Err(err.into());
            }

            debug!(user_id = %user_id, turns = record.turns.len(), "history file written");
            Ok(())
        })
    }

    fn remove<'a>(&'a self, user_id: &'a UserId) -> StoreFuture<'a, AssistantResult<()>> {
        Box::pin(async move {
            match tokio::fs::remove_file(self.record_path(user_id)).await {
                Ok(()) => Ok(()),
                Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
                Err(err) => Err(err.into()),
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_record_reads_none() {
        let dir = tempfile::tempdir().unwrap();
        let backend = JsonFileHistoryBackend::new(dir.path()).await.unwrap();
        let user = UserId::new("nobody").unwrap();

        assert!(backend.read(&user).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_write_then_read() {
        let dir = tempfile::tempdir().unwrap();
        let backend = JsonFileHistoryBackend::new(dir.path()).await.unwrap();
        let user = UserId::new("alice").unwrap();
        let turns = vec![
            ConversationTurn::user("I have a headache"),
            ConversationTurn::assistant("**Information**\n- Rest"),
        ];

        backend.write(&user, turns.clone()).await.unwrap();
        let loaded = backend.read(&user).await.unwrap().unwrap();

        assert_eq!(loaded, turns);
        let names: Vec<String> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["alice.json".to_string()]);
    }

    #[tokio::test]
    async fn test_corrupt_file_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let backend = JsonFileHistoryBackend::new(dir.path()).await.unwrap();
        let user = UserId::new("bob").unwrap();
        std::fs::write(dir.path().join("bob.json"), b"\x80\x04pickle?").unwrap();

        let result = backend.read(&user).await;
        assert!(matches!(result, Err(AssistantError::CorruptHistory { .. })));
    }

    #[tokio::test]
    async fn test_concurrent_writes_leave_one_valid_record() {
        let dir = tempfile::tempdir().unwrap();
        let backend = JsonFileHistoryBackend::new(dir.path()).await.unwrap();
        let user = UserId::new("dave").unwrap();

        let first = vec![ConversationTurn::user("first")];
        let second = vec![ConversationTurn::user("second")];
        let (a, b) = tokio::join!(
            backend.write(&user, first.clone()),
            backend.write(&user, second.clone())
        );
        a.unwrap();
        b.unwrap();

        let loaded = backend.read(&user).await.unwrap().unwrap();
        assert!(loaded == first || loaded == second);
    }

    #[tokio::test]
    async fn test_remove_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let backend = JsonFileHistoryBackend::new(dir.path()).await.unwrap();
        let user = UserId::new("carol").unwrap();

        backend
            .write(&user, vec![ConversationTurn::user("hello")])
            .await
            .unwrap();
        backend.remove(&user).await.unwrap();
        backend.remove(&user).await.unwrap();

        assert!(backend.read(&user).await.unwrap().is_none());
    }
}
