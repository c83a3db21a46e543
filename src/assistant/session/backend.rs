//! Durable per-user history persistence.

use std::future::Future;
use std::pin::Pin;

use crate::assistant::core::errors::AssistantResult;
use crate::assistant::core::ids::UserId;
use crate::assistant::core::turn::ConversationTurn;

/// Boxed future type for history backend operations.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// One durable record per user holding that user's ordered turns.
pub trait HistoryBackend: Send + Sync {
    /// Read the persisted turns, `None` when the user has no record.
    ///
    /// # Errors
    /// Returns an error if storage access fails or the record cannot be decoded.
    fn read<'a>(
        &'a self,
        user_id: &'a UserId,
    ) -> StoreFuture<'a, AssistantResult<Option<Vec<ConversationTurn>>>>;

    /// Replace the persisted turns for a user.
    ///
    /// # Errors
    /// Returns an error if storage access fails.
    fn write<'a>(
        &'a self,
        user_id: &'a UserId,
        turns: Vec<ConversationTurn>,
    ) -> StoreFuture<'a, AssistantResult<()>>;

    /// Delete the persisted record. A missing record is not an error.
    ///
    /// # Errors
    /// Returns an error if storage access fails.
    fn remove<'a>(&'a self, user_id: &'a UserId) -> StoreFuture<'a, AssistantResult<()>>;
}
