use async_trait::async_trait;
use chrono::{DateTime, Utc};
use types::{
    Card, CardId, Game, GameId, GameResult, GameSummary, HandCard, RoundRecord, RoundReview,
    UserId,
};

use crate::models::{NewCard, NewGame};
use crate::DatabaseError;

/// Opens transactions against a backing store. Every engine operation runs
/// inside exactly one [`StoreTxn`].
#[async_trait]
pub trait Persistence: Send + Sync {
    async fn begin(&self) -> Result<Box<dyn StoreTxn>, DatabaseError>;
}

#[async_trait]
impl<P: Persistence + ?Sized> Persistence for std::sync::Arc<P> {
    async fn begin(&self) -> Result<Box<dyn StoreTxn>, DatabaseError> {
        (**self).begin().await
    }
}

#[async_trait]
impl<P: Persistence + ?Sized> Persistence for Box<P> {
    async fn begin(&self) -> Result<Box<dyn StoreTxn>, DatabaseError> {
        (**self).begin().await
    }
}

#[async_trait]
pub trait CardCatalog: Send {
    async fn card_by_id(&mut self, id: CardId) -> Result<Option<Card>, DatabaseError>;

    /// Draws `count` distinct cards uniformly at random from the catalog minus
    /// `exclude`. Fails with [`DatabaseError::InsufficientCards`] when fewer remain.
    async fn random_cards(
        &mut self,
        count: usize,
        exclude: &[CardId],
    ) -> Result<Vec<Card>, DatabaseError>;

    async fn insert_card(&mut self, card: &NewCard) -> Result<Card, DatabaseError>;

    async fn count_cards(&mut self) -> Result<u32, DatabaseError>;
}

#[async_trait]
pub trait GameRecordStore: Send {
    async fn insert_game(&mut self, game: &NewGame) -> Result<Game, DatabaseError>;

    async fn game_by_id(&mut self, id: GameId) -> Result<Option<Game>, DatabaseError>;

    /// Loads the game and holds its write lock until the transaction ends.
    async fn lock_game(&mut self, id: GameId) -> Result<Option<Game>, DatabaseError>;

    async fn set_owner(&mut self, id: GameId, owner: UserId) -> Result<(), DatabaseError>;

    async fn set_pending_card(
        &mut self,
        id: GameId,
        card: Option<CardId>,
    ) -> Result<(), DatabaseError>;

    /// Returns the new attempt count.
    async fn increment_incorrect_attempts(&mut self, id: GameId) -> Result<u32, DatabaseError>;

    /// Writes the terminal result once. Returns `false` if the game already
    /// had a result, in which case nothing changes.
    async fn finish_game(
        &mut self,
        id: GameId,
        result: GameResult,
        ended_at: DateTime<Utc>,
    ) -> Result<bool, DatabaseError>;

    /// Newest first.
    async fn games_for_owner(&mut self, owner: UserId) -> Result<Vec<GameSummary>, DatabaseError>;
}

#[async_trait]
pub trait HandStore: Send {
    async fn append_hand_entry(
        &mut self,
        game_id: GameId,
        card_id: CardId,
        acquisition_order: u32,
    ) -> Result<(), DatabaseError>;

    /// Ordered by acquisition.
    async fn hand_cards(&mut self, game_id: GameId) -> Result<Vec<HandCard>, DatabaseError>;

    async fn hand_size(&mut self, game_id: GameId) -> Result<u32, DatabaseError>;
}

#[async_trait]
pub trait RoundHistoryStore: Send {
    async fn append_round(&mut self, round: &RoundRecord) -> Result<(), DatabaseError>;

    /// Ordered by round number.
    async fn rounds_for_game(&mut self, game_id: GameId) -> Result<Vec<RoundReview>, DatabaseError>;

    async fn count_rounds(&mut self, game_id: GameId) -> Result<u32, DatabaseError>;

    async fn count_incorrect_rounds(&mut self, game_id: GameId) -> Result<u32, DatabaseError>;
}

/// A unit of work over all four stores. Writes become visible only on
/// [`StoreTxn::commit`]; dropping the transaction discards them.
#[async_trait]
pub trait StoreTxn: CardCatalog + GameRecordStore + HandStore + RoundHistoryStore {
    async fn commit(self: Box<Self>) -> Result<(), DatabaseError>;
    async fn rollback(self: Box<Self>) -> Result<(), DatabaseError>;
}
