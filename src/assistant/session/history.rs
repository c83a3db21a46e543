//! Bounded per-user conversation history.

use std::collections::VecDeque;

use crate::assistant::core::turn::ConversationTurn;

/// Ordered turns of one user, capped at `max_turns` with oldest-first eviction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionHistory {
    turns: VecDeque<ConversationTurn>,
    max_turns: usize,
}

impl SessionHistory {
    /// Create an empty history with the given bound.
    #[must_use]
    pub fn new(max_turns: usize) -> Self {
        Self {
            turns: VecDeque::with_capacity(max_turns.min(64)),
            max_turns,
        }
    }

    /// Rebuild a history from persisted turns, keeping only the newest `max_turns`.
    #[must_use]
    pub fn from_turns(turns: Vec<ConversationTurn>, max_turns: usize) -> Self {
        let mut history = Self {
            turns: VecDeque::from(turns),
            max_turns,
        };
        history.evict_overflow();
        history
    }

    /// Append a turn and evict from the front until within bound.
    ///
    /// Returns how many turns were evicted.
    pub fn push(&mut self, turn: ConversationTurn) -> usize {
        self.turns.push_back(turn);
        self.evict_overflow()
    }

    fn evict_overflow(&mut self) -> usize {
        let mut evicted = 0;
        while self.turns.len() > self.max_turns {
            self.turns.pop_front();
            evicted += 1;
        }
        evicted
    }

    /// Number of stored turns.
    #[must_use]
    pub fn len(&self) -> usize {
        self.turns.len()
    }

    /// Whether no turns are stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// Configured bound.
    #[must_use]
    pub const fn max_turns(&self) -> usize {
        self.max_turns
    }

    /// Iterate turns oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &ConversationTurn> {
        self.turns.iter()
    }

    /// The newest `n` turns, oldest first.
    pub fn recent(&self, n: usize) -> impl Iterator<Item = &ConversationTurn> {
        self.turns.iter().skip(self.turns.len().saturating_sub(n))
    }

    /// Owned copy of the turns in order, as persisted.
    #[must_use]
    pub fn to_vec(&self) -> Vec<ConversationTurn> {
        self.turns.iter().cloned().collect()
    }
}
