//! Error types for game operations and storage.

/// Broad class of a failure, used by the HTTP layer to pick a status code
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Request was malformed (empty name, zero timer, ...)
    Validation,
    /// Request was well-formed but breaks a game rule
    DomainRule,
    /// Caller could not be identified
    Unauthenticated,
    /// Caller is known but may not do this
    Authorization,
    NotFound,
    Storage,
}

/// Errors raised by the storage backends
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Storage operation '{operation}' failed: {message}")]
    Storage { operation: String, message: String },

    #[error("Stored data is corrupt: {0}")]
    Corrupt(String),

    /// Another game already owns this join token
    #[error("Join token {0} is already taken")]
    JoinTokenTaken(String),
}

impl StoreError {
    pub fn storage(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Storage {
            operation: operation.into(),
            message: message.into(),
        }
    }
}

/// Result type for game operations
pub type GameResult<T> = Result<T, GameError>;

/// Errors that can occur during game operations
#[derive(Debug, thiserror::Error)]
pub enum GameError {
    #[error("Not enough players: need at least {required}, have {found}")]
    InsufficientPlayers { required: usize, found: usize },

    #[error("A round is still in play")]
    RoundInProgress,

    #[error("Round {0} is already resolved")]
    RoundClosed(String),

    #[error("Participants can't vote in their own round")]
    ParticipantCannotVote,

    #[error("You already voted in this round")]
    DuplicateVote,

    #[error("All statements have already been debated in this game")]
    PoolExhausted,

    #[error("A player named '{0}' already exists, please choose another name")]
    UniquePlayerName(String),

    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    #[error("Only the game master can {0}")]
    Unauthorized(&'static str),

    #[error("Missing or expired session")]
    Unauthenticated,

    #[error("Game {0} already finished")]
    GameFinished(String),

    #[error("Invalid input: {0}")]
    Validation(String),

    #[error(transparent)]
    Storage(#[from] StoreError),
}

impl GameError {
    pub fn not_found(kind: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            id: id.into(),
        }
    }

    /// Stable machine-readable code
    pub fn code(&self) -> &'static str {
        match self {
            GameError::InsufficientPlayers { .. } => "INSUFFICIENT_PLAYERS",
            GameError::RoundInProgress => "ROUND_IN_PROGRESS",
            GameError::RoundClosed(_) => "ROUND_CLOSED",
            GameError::ParticipantCannotVote => "PARTICIPANT_CANNOT_VOTE",
            GameError::DuplicateVote => "DUPLICATE_VOTE",
            GameError::PoolExhausted => "POOL_EXHAUSTED",
            GameError::UniquePlayerName(_) => "UNIQUE_PLAYER_NAME",
            GameError::NotFound { .. } => "NOT_FOUND",
            GameError::Unauthorized(_) => "UNAUTHORIZED",
            GameError::Unauthenticated => "UNAUTHENTICATED",
            GameError::GameFinished(_) => "GAME_FINISHED",
            GameError::Validation(_) => "VALIDATION",
            GameError::Storage(_) => "STORAGE",
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            GameError::Validation(_) => ErrorKind::Validation,
            GameError::Unauthenticated => ErrorKind::Unauthenticated,
            GameError::Unauthorized(_) => ErrorKind::Authorization,
            GameError::NotFound { .. } => ErrorKind::NotFound,
            GameError::Storage(_) => ErrorKind::Storage,
            _ => ErrorKind::DomainRule,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_are_distinct_per_rule() {
        let errors = [
            GameError::InsufficientPlayers {
                required: 3,
                found: 2,
            },
            GameError::RoundInProgress,
            GameError::RoundClosed("r".to_string()),
            GameError::ParticipantCannotVote,
            GameError::DuplicateVote,
            GameError::PoolExhausted,
            GameError::UniquePlayerName("Ann".to_string()),
        ];
        let codes: std::collections::HashSet<_> = errors.iter().map(|e| e.code()).collect();
        assert_eq!(codes.len(), errors.len());
        assert!(errors.iter().all(|e| e.kind() == ErrorKind::DomainRule));
    }

    #[test]
    fn test_kinds() {
        assert_eq!(
            GameError::Validation("x".into()).kind(),
            ErrorKind::Validation
        );
        assert_eq!(
            GameError::Unauthorized("open rounds").kind(),
            ErrorKind::Authorization
        );
        assert_eq!(
            GameError::not_found("Game", "g1").kind(),
            ErrorKind::NotFound
        );
        assert_eq!(
            GameError::from(StoreError::Corrupt("bad".into())).kind(),
            ErrorKind::Storage
        );
    }

    #[test]
    fn test_messages() {
        let err = GameError::InsufficientPlayers {
            required: 3,
            found: 2,
        };
        assert_eq!(
            err.to_string(),
            "Not enough players: need at least 3, have 2"
        );
        assert_eq!(
            GameError::not_found("Round", "abc").to_string(),
            "Round not found: abc"
        );
    }
}
