//! `SQLite` history backend: one row per user, turns stored as JSON text.

use std::path::Path;

use chrono::Utc;
use rusqlite::OptionalExtension;
use tokio_rusqlite::Connection;

use crate::assistant::core::errors::{AssistantError, AssistantResult};
use crate::assistant::core::ids::UserId;
use crate::assistant::core::turn::ConversationTurn;
use crate::assistant::session::backend::{HistoryBackend, StoreFuture};

/// `SQLite` implementation of the history backend.
pub struct SqliteHistoryBackend {
    conn: Connection,
    table: String,
}

impl SqliteHistoryBackend {
    /// Table name for chat histories.
    pub const DEFAULT_TABLE: &'static str = "chat_history";

    /// Open the database and create the table if it doesn't exist.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened.
    pub async fn new(path: impl AsRef<Path>) -> AssistantResult<Self> {
        if let Some(parent) = path.as_ref().parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        let conn = Connection::open(path.as_ref()).await?;
        Self::with_connection(conn).await
    }

    /// Use an already opened connection (e.g. in-memory for tests).
    ///
    /// # Errors
    /// Returns an error if the table cannot be created.
    pub async fn with_connection(conn: Connection) -> AssistantResult<Self> {
        let table = Self::DEFAULT_TABLE.to_string();
        let table_name = table.clone();

        conn.call(move |conn| {
            conn.execute_batch(&format!(
                "CREATE TABLE IF NOT EXISTS {table_name} (
                    user_id TEXT PRIMARY KEY,
                    turns_json TEXT NOT NULL,
                    updated_at INTEGER NOT NULL
                )"
            ))?;
            Ok(())
        })
        .await?;

        Ok(Self { conn, table })
    }
}

impl HistoryBackend for SqliteHistoryBackend {
    fn read<'a>(
        &'a self,
        user_id: &'a UserId,
    ) -> StoreFuture<'a, AssistantResult<Option<Vec<ConversationTurn>>>> {
        Box::pin(async move {
            let table = self.table.clone();
            let user_id_str = user_id.to_string();

            let json = self
                .conn
                .call(move |conn| {
                    let row: Option<String> = conn
                        .query_row(
                            &format!("SELECT turns_json FROM {table} WHERE user_id = ?1"),
                            rusqlite::params![user_id_str],
                            |row| row.get(0),
                        )
                        .optional()?;
                    Ok(row)
                })
                .await?;

            json.map(|text| {
                serde_json::from_str(&text).map_err(|err| AssistantError::CorruptHistory {
                    user_id: user_id.to_string(),
                    reason: err.to_string(),
                })
            })
            .transpose()
        })
    }

    fn write<'a>(
        &'a self,
        user_id: &'a UserId,
        turns: Vec<ConversationTurn>,
    ) -> StoreFuture<'a, AssistantResult<()>> {
        Box::pin(async move {
            let table = self.table.clone();
            let user_id_str = user_id.to_string();
            let turns_json = serde_json::to_string(&turns)?;
            let updated_at = Utc::now().timestamp_millis();

            self.conn
                .call(move |conn| {
                    conn.execute(
                        &format!(
                            "INSERT OR REPLACE INTO {table} (user_id, turns_json, updated_at)
                             VALUES (?1, ?2, ?3)"
                        ),
                        rusqlite::params![user_id_str, turns_json, updated_at],
                    )?;
                    Ok(())
                })
                .await?;

            Ok(())
        })
    }

    fn remove<'a>(&'a self, user_id: &'a UserId) -> StoreFuture<'a, AssistantResult<()>> {
        Box::pin(async move {
            let table = self.table.clone();
            let user_id_str = user_id.to_string();

            self.conn
                .call(move |conn| {
                    conn.execute(
                        &format!("DELETE FROM {table} WHERE user_id = ?1"),
                        rusqlite::params![user_id_str],
                    )?;
                    Ok(())
                })
                .await?;

            Ok(())
        })
    }
}
