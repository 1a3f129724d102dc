//! Error types shared by every bracket operation.

use thiserror::Error;

use crate::matches::ScoreError;

/// Broad category of a [`DrawError`], used by the HTTP boundary to pick a
/// response code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed or sport-illegal input
    Validation,
    /// Operation not allowed in the current state
    State,
    /// Unknown bracket, match or team
    NotFound,
    /// Caller is not allowed to act on this resource
    Unauthorized,
    /// Storage or serialization failure
    Internal,
}

/// Bracket errors
#[derive(Debug, Error)]
pub enum DrawError {
    /// Input rejected before any state was touched
    #[error("{0}")]
    Validation(String),

    /// Illegal score submission
    #[error(transparent)]
    Score(#[from] ScoreError),

    /// Precondition on the current bracket/match state failed
    #[error("{0}")]
    State(String),

    /// Versioned write lost against a concurrent update
    #[error("Match {0} was modified concurrently")]
    Conflict(uuid::Uuid),

    #[error("Bracket not found: {0}")]
    BracketNotFound(uuid::Uuid),

    #[error("Match not found: {0}")]
    MatchNotFound(uuid::Uuid),

    #[error("Team {0} is not part of this bracket")]
    TeamNotFound(uuid::Uuid),

    /// Player self-report from a team that does not play this match
    #[error("Team {team} is not a participant of match {match_id}")]
    NotParticipant {
        team: uuid::Uuid,
        match_id: uuid::Uuid,
    },

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl DrawError {
    /// Shorthand for a validation failure
    pub fn validation(reason: impl Into<String>) -> Self {
        DrawError::Validation(reason.into())
    }

    /// Shorthand for a state/precondition failure
    pub fn state(reason: impl Into<String>) -> Self {
        DrawError::State(reason.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            DrawError::Validation(_) | DrawError::Score(_) => ErrorKind::Validation,
            DrawError::State(_) | DrawError::Conflict(_) => ErrorKind::State,
            DrawError::BracketNotFound(_)
            | DrawError::MatchNotFound(_)
            | DrawError::TeamNotFound(_) => ErrorKind::NotFound,
            DrawError::NotParticipant { .. } => ErrorKind::Unauthorized,
            DrawError::Database(_) | DrawError::Serialization(_) => ErrorKind::Internal,
        }
    }

    /// Get a client-safe error message that doesn't leak sensitive information
    ///
    /// Storage errors are reduced to a generic message and the authorization
    /// failure does not echo back the match identifier.
    pub fn client_message(&self) -> String {
        match self {
            DrawError::Database(_) | DrawError::Serialization(_) => {
                "Internal server error".to_string()
            }
            DrawError::NotParticipant { .. } => "Not allowed to report this match".to_string(),
            _ => self.to_string(),
        }
    }
}

/// Result type for bracket operations
pub type DrawResult<T> = Result<T, DrawError>;
