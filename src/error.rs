//! Error taxonomy shared by the chat relay and the game engine

/// Result type for relay operations
pub type RelayResult<T> = Result<T, RelayError>;

/// Every failure a chat or game action can produce.
///
/// The `Display` text is the user-facing explanation returned to clients.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RelayError {
    /// Holds the noun phrase of what is missing, e.g. "a username"
    #[error("Please provide {0}")]
    MissingParameter(&'static str),

    #[error("Invalid move. Please provide a valid move (e.g., 1-1, 2-2, 3-3).")]
    InvalidMove,

    #[error("Session ID mismatch")]
    SessionMismatch,

    #[error("Game is full, you can only watch.")]
    GameFull,

    #[error("Please wait for the other player to make a move.")]
    NotYourTurn,

    #[error("Move already made. Please choose a different move.")]
    CellTaken,

    #[error("Game is over. Start a new game to keep playing.")]
    GameFinished,

    #[error("Rate limit exceeded. Try again in {retry_after_secs} seconds.")]
    RateLimitExceeded { retry_after_secs: u64 },

    #[error("Invalid or expired token.")]
    InvalidOrExpiredToken,

    #[error("No messages stored.")]
    NoMessagesStored,

    /// Holds the list of verbs the dispatcher accepts
    #[error("Invalid action. Use {0}")]
    InvalidAction(&'static str),
}

impl RelayError {
    /// Stable machine-readable code for the error kind
    pub fn code(&self) -> &'static str {
        match self {
            Self::MissingParameter(_) => "MISSING_PARAMETER",
            Self::InvalidMove => "INVALID_MOVE",
            Self::SessionMismatch => "SESSION_MISMATCH",
            Self::GameFull => "GAME_FULL",
            Self::NotYourTurn => "NOT_YOUR_TURN",
            Self::CellTaken => "CELL_TAKEN",
            Self::GameFinished => "GAME_FINISHED",
            Self::RateLimitExceeded { .. } => "RATE_LIMITED",
            Self::InvalidOrExpiredToken => "INVALID_TOKEN",
            Self::NoMessagesStored => "NO_MESSAGES",
            Self::InvalidAction(_) => "INVALID_ACTION",
        }
    }
}
