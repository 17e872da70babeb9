//! Log stream position.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Position marker for "log content already retrieved".
///
/// The backend uses the byte offset into the log file. Within a session the
/// cursor never moves backwards.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Cursor(u64);

impl Cursor {
    /// The start of every stream.
    pub const START: Cursor = Cursor(0);

    pub fn new(position: u64) -> Self {
        Self(position)
    }

    pub fn position(&self) -> u64 {
        self.0
    }

    /// Check that `next` is a legal successor of this cursor.
    pub fn advance_to(self, next: Cursor) -> Result<Cursor, CursorRegression> {
        if next < self {
            return Err(CursorRegression {
                from: self,
                to: next,
            });
        }
        Ok(next)
    }
}

impl fmt::Display for Cursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for Cursor {
    fn from(position: u64) -> Self {
        Self(position)
    }
}

/// A fetch answered with a position behind the one requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("cursor moved backwards from {from} to {to}")]
pub struct CursorRegression {
    pub from: Cursor,
    pub to: Cursor,
}
