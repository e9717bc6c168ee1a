use database::DatabaseError;
use thiserror::Error;
use types::{game::ParseGameResultError, round::InvalidPlacement, CardId, GameId};

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("game {0} not found")]
    GameNotFound(GameId),

    #[error("card {0} not found")]
    CardNotFound(CardId),

    #[error("access to game {0} denied")]
    Forbidden(GameId),

    #[error("an authenticated user is required")]
    Unauthenticated,

    #[error("validation error: {0}")]
    Validation(String),

    #[error("not enough cards to deal a hand: requested {requested}, available {available}")]
    InsufficientCards { requested: usize, available: usize },

    #[error("no more cards available for game {0}")]
    NoCardsAvailable(GameId),

    #[error("game {0} has already ended")]
    GameAlreadyEnded(GameId),

    #[error("card {card_id} is not the open round card of game {game_id}")]
    StaleSubmission { game_id: GameId, card_id: CardId },

    #[error("consistency violation: {0}")]
    FatalConsistency(String),

    #[error("database error: {0}")]
    Database(#[from] DatabaseError),
}

/// Caller-facing classification of an [`EngineError`].
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    NotFound,
    Forbidden,
    Unauthenticated,
    Validation,
    InsufficientCards,
    NoCardsAvailable,
    GameAlreadyEnded,
    StaleSubmission,
    FatalConsistency,
    Internal,
}

impl ErrorKind {
    /// HTTP-equivalent status for an API layer.
    pub fn status_code(&self) -> u16 {
        match self {
            ErrorKind::NotFound | ErrorKind::NoCardsAvailable => 404,
            ErrorKind::Forbidden => 403,
            ErrorKind::Unauthenticated => 401,
            ErrorKind::Validation => 400,
            ErrorKind::InsufficientCards
            | ErrorKind::GameAlreadyEnded
            | ErrorKind::StaleSubmission => 409,
            ErrorKind::FatalConsistency | ErrorKind::Internal => 500,
        }
    }
}

impl EngineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            EngineError::GameNotFound(_) | EngineError::CardNotFound(_) => ErrorKind::NotFound,
            EngineError::Forbidden(_) => ErrorKind::Forbidden,
            EngineError::Unauthenticated => ErrorKind::Unauthenticated,
            EngineError::Validation(_) => ErrorKind::Validation,
            EngineError::InsufficientCards { .. } => ErrorKind::InsufficientCards,
            EngineError::NoCardsAvailable(_) => ErrorKind::NoCardsAvailable,
            EngineError::GameAlreadyEnded(_) => ErrorKind::GameAlreadyEnded,
            EngineError::StaleSubmission { .. } => ErrorKind::StaleSubmission,
            EngineError::FatalConsistency(_) => ErrorKind::FatalConsistency,
            EngineError::Database(_) => ErrorKind::Internal,
        }
    }

    pub fn status_code(&self) -> u16 {
        self.kind().status_code()
    }
}

impl From<InvalidPlacement> for EngineError {
    fn from(err: InvalidPlacement) -> Self {
        EngineError::Validation(err.to_string())
    }
}

impl From<ParseGameResultError> for EngineError {
    fn from(err: ParseGameResultError) -> Self {
        EngineError::Validation(err.to_string())
    }
}
