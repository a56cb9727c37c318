use serde::{Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::error::RelayError;

/// Opaque ID types for readability
pub type GameId = String;
pub type SessionToken = String;
pub type PrivateToken = String;

/// Timestamps are always UTC instants supplied by the caller
pub type Timestamp = chrono::DateTime<chrono::Utc>;

/// Instant `ttl` after `now`, saturating at the latest representable time
pub fn expires_after(now: Timestamp, ttl: chrono::TimeDelta) -> Timestamp {
    now.checked_add_signed(ttl)
        .unwrap_or(chrono::DateTime::<chrono::Utc>::MAX_UTC)
}

/// Case-insensitive user key derived from a display name.
///
/// Used as the rate-limit and session key. The same identifier may take
/// part in any number of games independently.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    pub fn new(username: &str) -> Self {
        Self(username.to_lowercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One cell of the 3x3 board, written `row-col` on the wire (1-based)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Cell {
    row: u8,
    col: u8,
}

impl Cell {
    /// All nine legal cells in row-major order
    pub const ALL: [Cell; 9] = [
        Cell { row: 1, col: 1 },
        Cell { row: 1, col: 2 },
        Cell { row: 1, col: 3 },
        Cell { row: 2, col: 1 },
        Cell { row: 2, col: 2 },
        Cell { row: 2, col: 3 },
        Cell { row: 3, col: 1 },
        Cell { row: 3, col: 2 },
        Cell { row: 3, col: 3 },
    ];

    /// Build a cell from 1-based coordinates, `None` when off the board
    pub fn new(row: u8, col: u8) -> Option<Self> {
        ((1..=3).contains(&row) && (1..=3).contains(&col)).then_some(Self { row, col })
    }

    pub fn row(self) -> u8 {
        self.row
    }

    pub fn col(self) -> u8 {
        self.col
    }

    /// Zero-based index into a row-major 9-slot board
    pub fn index(self) -> usize {
        usize::from(self.row - 1) * 3 + usize::from(self.col - 1)
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.row, self.col)
    }
}

impl FromStr for Cell {
    type Err = RelayError;

    /// Accepts exactly the nine labels `1-1` through `3-3`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (row, col) = s.split_once('-').ok_or(RelayError::InvalidMove)?;
        // Reject signs, padding and multi-digit forms like "01-1"
        if row.len() != 1 || col.len() != 1 {
            return Err(RelayError::InvalidMove);
        }
        let row: u8 = row.parse().map_err(|_| RelayError::InvalidMove)?;
        let col: u8 = col.parse().map_err(|_| RelayError::InvalidMove)?;
        Cell::new(row, col).ok_or(RelayError::InvalidMove)
    }
}

impl Serialize for Cell {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Treat `None`, empty and whitespace-only strings alike as "not provided"
pub fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.trim().is_empty())
}
