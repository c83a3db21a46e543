//! Identifier types for the assistant.
//!
//! `UserId` keys every piece of per-user state (history, cache entries, persisted
//! records). It is a validated string rather than a UUID because callers hand us
//! whatever their account system uses, and the JSON history backend turns it into a
//! file name.

use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Errors returned when parsing/validating a [`UserId`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserIdError {
    /// Empty (or whitespace-only) identifier.
    Empty,
    /// Exceeds the maximum accepted length.
    TooLong {
        /// Maximum allowed length.
        max: usize,
        /// Actual length received.
        got: usize,
    },
    /// Contains a disallowed character.
    InvalidChar {
        /// The invalid character.
        ch: char,
        /// The index where it was found.
        index: usize,
    },
}

impl fmt::Display for UserIdError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "user id must not be empty"),
            Self::TooLong { max, got } => write!(f, "user id too long: got {got}, max {max}"),
            Self::InvalidChar { ch, index } => {
                write!(f, "user id contains invalid character {ch:?} at index {index}")
            }
        }
    }
}

impl std::error::Error for UserIdError {}

/// Identifier of the user owning a conversation.
///
/// Rules:
/// - Non-empty after trimming.
/// - At most [`UserId::MAX_LEN`] bytes.
/// - Conservative ASCII set: `[A-Za-z0-9._@-]`, and never `.` or `..` alone.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct UserId(String);

impl UserId {
    /// Hard ceiling to keep file names and keys sane.
    pub const MAX_LEN: usize = 128;

    /// Identifier used when a caller does not name a user.
    pub const DEFAULT: &'static str = "default";

    /// Build a validated `UserId`.
    ///
    /// # Errors
    /// Returns `UserIdError` if the input is empty, too long, or contains invalid characters.
    pub fn new(raw: impl AsRef<str>) -> Result<Self, UserIdError> {
        let s = raw.as_ref().trim();

        if s.is_empty() {
            return Err(UserIdError::Empty);
        }
        if s.len() > Self::MAX_LEN {
            return Err(UserIdError::TooLong {
                max: Self::MAX_LEN,
                got: s.len(),
            });
        }

        for (i, ch) in s.chars().enumerate() {
            let ok = ch.is_ascii_alphanumeric() || matches!(ch, '.' | '_' | '-' | '@');
            if !ok {
                return Err(UserIdError::InvalidChar { ch, index: i });
            }
        }

        if s.chars().all(|ch| ch == '.') {
            return Err(UserIdError::InvalidChar { ch: '.', index: 0 });
        }

        Ok(Self(s.to_owned()))
    }

    /// Identifier for anonymous callers.
    #[must_use]
    pub fn anonymous() -> Self {
        Self(Self::DEFAULT.to_owned())
    }

    /// Resolve an optional raw identifier, falling back to [`UserId::DEFAULT`].
    ///
    /// # Errors
    /// Returns `UserIdError` if a provided identifier is invalid.
    pub fn from_optional(raw: Option<&str>) -> Result<Self, UserIdError> {
        match raw {
            Some(value) if !value.trim().is_empty() => Self::new(value),
            _ => Ok(Self::anonymous()),
        }
    }

    /// Borrow as `&str`.
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for UserId {
    fn default() -> Self {
        Self::anonymous()
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UserId {
    type Err = UserIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl AsRef<str> for UserId {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl From<UserId> for String {
    fn from(value: UserId) -> Self {
        value.0
    }
}

impl TryFrom<String> for UserId {
    type Error = UserIdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

/// Correlation identifier for one `process` call, attached to log spans.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(pub Uuid);

impl RequestId {
    /// Create a new request identifier.
    ///
    /// With feature `uuid_v7` enabled, ids are time-ordered (`Uuid::now_v7()`).
    #[must_use]
    pub fn new() -> Self {
        #[cfg(feature = "uuid_v7")]
        {
            Self(Uuid::now_v7())
        }
        #[cfg(not(feature = "uuid_v7"))]
        {
            Self(Uuid::new_v4())
        }
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
