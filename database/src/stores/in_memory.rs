use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rand::seq::SliceRandom;
use tokio::sync::{Mutex, OwnedMutexGuard};
use types::card::is_valid_misfortune_index;
use types::{
    Card, CardId, Game, GameId, GameResult, GameSummary, HandCard, RoundRecord, RoundReview,
    UserId,
};

use super::traits::{
    CardCatalog, GameRecordStore, HandStore, Persistence, RoundHistoryStore, StoreTxn,
};
use crate::models::{NewCard, NewGame};
use crate::DatabaseError;

#[derive(Clone, Debug)]
struct Inner {
    cards: BTreeMap<CardId, Card>,
    games: BTreeMap<GameId, Game>,
    // (card, acquisition order) in insertion order
    hands: HashMap<GameId, Vec<(CardId, u32)>>,
    rounds: HashMap<GameId, Vec<RoundRecord>>,
    next_card_id: i64,
    next_game_id: i64,
}

impl Default for Inner {
    fn default() -> Self {
        Self {
            cards: BTreeMap::new(),
            games: BTreeMap::new(),
            hands: HashMap::new(),
            rounds: HashMap::new(),
            next_card_id: 1,
            next_game_id: 1,
        }
    }
}

impl Inner {
    fn game_mut(&mut self, id: GameId) -> Result<&mut Game, DatabaseError> {
        self.games
            .get_mut(&id)
            .ok_or(DatabaseError::GameNotFound(id.as_i64()))
    }

    fn card(&self, id: CardId) -> Result<&Card, DatabaseError> {
        self.cards
            .get(&id)
            .ok_or_else(|| DatabaseError::InvalidData(format!("card {id} referenced but missing")))
    }
}

/// Process-local store for tests and the CLI. A transaction holds the store's
/// lock from `begin` until it is committed or dropped, so transactions are
/// fully serialised.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    inner: Arc<Mutex<Inner>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Persistence for InMemoryStore {
    async fn begin(&self) -> Result<Box<dyn StoreTxn>, DatabaseError> {
        let guard = Arc::clone(&self.inner).lock_owned().await;
        let working = guard.clone();
        Ok(Box::new(InMemoryTxn { guard, working }))
    }
}

pub struct InMemoryTxn {
    guard: OwnedMutexGuard<Inner>,
    working: Inner,
}

#[async_trait]
impl CardCatalog for InMemoryTxn {
    async fn card_by_id(&mut self, id: CardId) -> Result<Option<Card>, DatabaseError> {
        Ok(self.working.cards.get(&id).cloned())
    }

    async fn random_cards(
        &mut self,
        count: usize,
        exclude: &[CardId],
    ) -> Result<Vec<Card>, DatabaseError> {
        let candidates: Vec<&Card> = self
            .working
            .cards
            .values()
            .filter(|card| !exclude.contains(&card.id))
            .collect();
        if candidates.len() < count {
            return Err(DatabaseError::InsufficientCards {
                requested: count,
                available: candidates.len(),
            });
        }
        let drawn = {
            let mut rng = rand::thread_rng();
            candidates
                .choose_multiple(&mut rng, count)
                .map(|card| (*card).clone())
                .collect()
        };
        Ok(drawn)
    }

    async fn insert_card(&mut self, card: &NewCard) -> Result<Card, DatabaseError> {
        if !is_valid_misfortune_index(card.misfortune_index) {
            return Err(DatabaseError::InvalidData(format!(
                "misfortune index {} outside [0, 100]",
                card.misfortune_index
            )));
        }
        let id = CardId(self.working.next_card_id);
        self.working.next_card_id += 1;
        let card = Card {
            id,
            name: card.name.clone(),
            image_ref: card.image_ref.clone(),
            misfortune_index: card.misfortune_index,
        };
        self.working.cards.insert(id, card.clone());
        Ok(card)
    }

    async fn count_cards(&mut self) -> Result<u32, DatabaseError> {
        Ok(self.working.cards.len() as u32)
    }
}

#[async_trait]
impl GameRecordStore for InMemoryTxn {
    async fn insert_game(&mut self, game: &NewGame) -> Result<Game, DatabaseError> {
        let id = GameId(self.working.next_game_id);
        self.working.next_game_id += 1;
        let game = Game {
            id,
            owner_id: game.owner_id,
            guest: game.is_guest(),
            started_at: game.started_at,
            ended_at: None,
            result: None,
            incorrect_attempts: 0,
            pending_card_id: None,
        };
        self.working.games.insert(id, game.clone());
        Ok(game)
    }

    async fn game_by_id(&mut self, id: GameId) -> Result<Option<Game>, DatabaseError> {
        Ok(self.working.games.get(&id).cloned())
    }

    async fn lock_game(&mut self, id: GameId) -> Result<Option<Game>, DatabaseError> {
        // the whole store is already locked for this transaction
        self.game_by_id(id).await
    }

    async fn set_owner(&mut self, id: GameId, owner: UserId) -> Result<(), DatabaseError> {
        self.working.game_mut(id)?.owner_id = Some(owner);
        Ok(())
    }

    async fn set_pending_card(
        &mut self,
        id: GameId,
        card: Option<CardId>,
    ) -> Result<(), DatabaseError> {
        self.working.game_mut(id)?.pending_card_id = card;
        Ok(())
    }

    async fn increment_incorrect_attempts(&mut self, id: GameId) -> Result<u32, DatabaseError> {
        let game = self.working.game_mut(id)?;
        game.incorrect_attempts += 1;
        Ok(game.incorrect_attempts)
    }

    async fn finish_game(
        &mut self,
        id: GameId,
        result: GameResult,
        ended_at: DateTime<Utc>,
    ) -> Result<bool, DatabaseError> {
        let Some(game) = self.working.games.get_mut(&id) else {
            return Ok(false);
        };
        if game.result.is_some() {
            return Ok(false);
        }
        game.result = Some(result);
        game.ended_at = Some(ended_at);
        game.pending_card_id = None;
        Ok(true)
    }

    async fn games_for_owner(&mut self, owner: UserId) -> Result<Vec<GameSummary>, DatabaseError> {
        let mut summaries: Vec<GameSummary> = self
            .working
            .games
            .values()
            .filter(|game| game.owner_id == Some(owner))
            .map(|game| GameSummary {
                game: game.clone(),
                card_count: self
                    .working
                    .hands
                    .get(&game.id)
                    .map_or(0, |hand| hand.len() as u32),
            })
            .collect();
        summaries.sort_by(|a, b| {
            b.game
                .started_at
                .cmp(&a.game.started_at)
                .then(b.game.id.cmp(&a.game.id))
        });
        Ok(summaries)
    }
}

#[async_trait]
impl HandStore for InMemoryTxn {
    async fn append_hand_entry(
        &mut self,
        game_id: GameId,
        card_id: CardId,
        acquisition_order: u32,
    ) -> Result<(), DatabaseError> {
        if !self.working.games.contains_key(&game_id) {
            return Err(DatabaseError::GameNotFound(game_id.as_i64()));
        }
        self.working.card(card_id)?;
        let hand = self.working.hands.entry(game_id).or_default();
        if hand
            .iter()
            .any(|(card, order)| *card == card_id || *order == acquisition_order)
        {
            return Err(DatabaseError::Query(format!(
                "UNIQUE constraint failed: game_cards (game {game_id}, card {card_id}, order {acquisition_order})"
            )));
        }
        hand.push((card_id, acquisition_order));
        Ok(())
    }

    async fn hand_cards(&mut self, game_id: GameId) -> Result<Vec<HandCard>, DatabaseError> {
        let mut entries = self
            .working
            .hands
            .get(&game_id)
            .cloned()
            .unwrap_or_default();
        entries.sort_by_key(|(_, order)| *order);
        entries
            .into_iter()
            .map(|(card_id, acquisition_order)| {
                Ok(HandCard {
                    card: self.working.card(card_id)?.clone(),
                    acquisition_order,
                })
            })
            .collect()
    }

    async fn hand_size(&mut self, game_id: GameId) -> Result<u32, DatabaseError> {
        Ok(self
            .working
            .hands
            .get(&game_id)
            .map_or(0, |hand| hand.len() as u32))
    }
}

#[async_trait]
impl RoundHistoryStore for InMemoryTxn {
    async fn append_round(&mut self, round: &RoundRecord) -> Result<(), DatabaseError> {
        if !self.working.games.contains_key(&round.game_id) {
            return Err(DatabaseError::GameNotFound(round.game_id.as_i64()));
        }
        self.working.card(round.presented_card_id)?;
        let rounds = self.working.rounds.entry(round.game_id).or_default();
        if rounds.iter().any(|r| r.round_number == round.round_number) {
            return Err(DatabaseError::Query(format!(
                "UNIQUE constraint failed: game_rounds (game {}, round {})",
                round.game_id, round.round_number
            )));
        }
        rounds.push(round.clone());
        Ok(())
    }

    async fn rounds_for_game(&mut self, game_id: GameId) -> Result<Vec<RoundReview>, DatabaseError> {
        let mut records = self
            .working
            .rounds
            .get(&game_id)
            .cloned()
            .unwrap_or_default();
        records.sort_by_key(|r| r.round_number);
        records
            .into_iter()
            .map(|record| {
                let card = self.working.card(record.presented_card_id)?;
                Ok(RoundReview {
                    card_name: card.name.clone(),
                    card_image_ref: card.image_ref.clone(),
                    card_misfortune_index: card.misfortune_index,
                    record,
                })
            })
            .collect()
    }

    async fn count_rounds(&mut self, game_id: GameId) -> Result<u32, DatabaseError> {
        Ok(self
            .working
            .rounds
            .get(&game_id)
            .map_or(0, |rounds| rounds.len() as u32))
    }

    async fn count_incorrect_rounds(&mut self, game_id: GameId) -> Result<u32, DatabaseError> {
        Ok(self
            .working
            .rounds
            .get(&game_id)
            .map_or(0, |rounds| rounds.iter().filter(|r| !r.is_correct).count() as u32))
    }
}

#[async_trait]
impl StoreTxn for InMemoryTxn {
    async fn commit(self: Box<Self>) -> Result<(), DatabaseError> {
        let InMemoryTxn { mut guard, working } = *self;
        *guard = working;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), DatabaseError> {
        Ok(())
    }
}
