use std::collections::HashSet;

use database::{
    models::NewGame as NewGameRecord, CardCatalog, DatabaseError, GameRecordStore, HandStore,
    Persistence, RoundHistoryStore, StoreTxn,
};
use types::{
    Card, CardId, Game, GameId, GameResult, GameSummary, Hand, Outcome, Placement, Requester,
    RoundCard, RoundRecord, Verdict,
};

use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::views::{GameDetails, NewGame};

/// Drives games through their rounds. Every public operation runs in a single
/// store transaction, committed on success and rolled back on any error.
pub struct RoundEngine<S> {
    store: S,
    config: EngineConfig,
}

impl<S: Persistence> RoundEngine<S> {
    pub fn new(store: S, config: EngineConfig) -> Self {
        Self { store, config }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub async fn create_game(&self, owner: Option<types::UserId>) -> Result<NewGame, EngineError> {
        let mut txn = self.store.begin().await?;
        let result = self.create_game_in(&mut *txn, owner).await;
        finish(txn, result).await
    }

    pub async fn get_game(
        &self,
        game_id: GameId,
        requester: &Requester,
    ) -> Result<GameDetails, EngineError> {
        let mut txn = self.store.begin().await?;
        let result = get_game_in(&mut *txn, game_id, requester).await;
        finish(txn, result).await
    }

    pub async fn get_round_card(
        &self,
        game_id: GameId,
        requester: &Requester,
    ) -> Result<RoundCard, EngineError> {
        let mut txn = self.store.begin().await?;
        let result = get_round_card_in(&mut *txn, game_id, requester).await;
        finish(txn, result).await
    }

    /// `position` is the wire value: `-1` for a timeout, otherwise a slot in
    /// the hand sorted by ascending misfortune index.
    pub async fn submit_placement(
        &self,
        game_id: GameId,
        requester: &Requester,
        card_id: CardId,
        position: i64,
        time_taken_seconds: Option<u32>,
    ) -> Result<Verdict, EngineError> {
        let placement = Placement::try_from(position)?;
        let mut txn = self.store.begin().await?;
        let result = self
            .submit_placement_in(
                &mut *txn,
                game_id,
                requester,
                card_id,
                placement,
                time_taken_seconds,
            )
            .await;
        finish(txn, result).await
    }

    pub async fn end_game(
        &self,
        game_id: GameId,
        requester: &Requester,
        result: GameResult,
    ) -> Result<Game, EngineError> {
        let mut txn = self.store.begin().await?;
        let outcome = end_game_in(&mut *txn, game_id, requester, result).await;
        finish(txn, outcome).await
    }

    pub async fn list_games(&self, requester: &Requester) -> Result<Vec<GameSummary>, EngineError> {
        let owner = requester.user_id().ok_or(EngineError::Unauthenticated)?;
        let mut txn = self.store.begin().await?;
        let result = txn.games_for_owner(owner).await.map_err(EngineError::from);
        finish(txn, result).await
    }

    async fn create_game_in(
        &self,
        txn: &mut dyn StoreTxn,
        owner: Option<types::UserId>,
    ) -> Result<NewGame, EngineError> {
        // The game row goes in first so SQLite takes the write lock before
        // the catalog read; a failed deal rolls the row back.
        let game = txn.insert_game(&NewGameRecord::starting_now(owner)).await?;
        let count = self.config.initial_hand_size;
        let cards = match txn.random_cards(count, &[]).await {
            Err(DatabaseError::InsufficientCards {
                requested,
                available,
            }) => {
                log::warn!("Cannot deal a hand of {requested}: only {available} cards in catalog");
                return Err(EngineError::InsufficientCards {
                    requested,
                    available,
                });
            }
            drawn => drawn?,
        };
        verify_draw(&cards, &HashSet::new(), count)?;

        for (order, card) in (1u32..).zip(cards.iter()) {
            txn.append_hand_entry(game.id, card.id, order).await?;
        }
        log::info!(
            "Created game {} (guest: {}) with cards [{}]",
            game.id,
            game.is_guest(),
            cards
                .iter()
                .map(|card| card.id.to_string())
                .collect::<Vec<_>>()
                .join(", ")
        );
        Ok(NewGame { game, cards })
    }

    async fn submit_placement_in(
        &self,
        txn: &mut dyn StoreTxn,
        game_id: GameId,
        requester: &Requester,
        card_id: CardId,
        placement: Placement,
        time_taken_seconds: Option<u32>,
    ) -> Result<Verdict, EngineError> {
        let game = lock_active_game(txn, game_id, requester).await?;
        let card = txn
            .card_by_id(card_id)
            .await?
            .ok_or(EngineError::CardNotFound(card_id))?;

        let hand = txn.hand_cards(game_id).await?;
        if hand.contains_card(card_id) || game.pending_card_id != Some(card_id) {
            log::warn!(
                "Rejecting stale submission of card {card_id} for game {game_id} (pending: {:?})",
                game.pending_card_id
            );
            return Err(EngineError::StaleSubmission { game_id, card_id });
        }

        let correct_position = hand.correct_position(card.misfortune_index);
        let is_correct = placement.is_correct(correct_position);
        let round_number = txn.count_rounds(game_id).await? + 1;
        txn.append_round(&RoundRecord {
            game_id,
            round_number,
            presented_card_id: card_id,
            chosen_position: placement.position(),
            correct_position: to_u32(correct_position)?,
            is_correct,
            time_taken_seconds,
        })
        .await?;
        txn.set_pending_card(game_id, None).await?;
        if placement.is_timeout() {
            log::debug!("Game {game_id} round {round_number} timed out");
        }
        log::info!(
            "Game {game_id} round {round_number}: {placement} for card {card_id}, correct slot {correct_position} ({})",
            if is_correct { "correct" } else { "incorrect" }
        );

        let guest = game.is_guest();
        if is_correct {
            let hand_size = to_u32(hand.len())? + 1;
            txn.append_hand_entry(game_id, card_id, hand_size).await?;
            let completed = guest || hand_size as usize >= self.config.winning_hand_size;
            if completed {
                close_game(txn, game_id, GameResult::Won).await?;
            }
            Ok(self.verdict(Outcome::Correct, card, guest, completed, None, None))
        } else {
            let attempts = txn.increment_incorrect_attempts(game_id).await?;
            let completed = guest || attempts >= self.config.max_incorrect_attempts;
            if completed {
                close_game(txn, game_id, GameResult::Lost).await?;
            }
            Ok(self.verdict(
                Outcome::Incorrect,
                card,
                guest,
                completed,
                Some(to_u32(correct_position)?),
                Some(attempts),
            ))
        }
    }

    fn verdict(
        &self,
        outcome: Outcome,
        card: Card,
        guest: bool,
        completed: bool,
        correct_position: Option<u32>,
        incorrect_attempts: Option<u32>,
    ) -> Verdict {
        let game_result = match (completed, outcome) {
            (false, _) => None,
            (true, Outcome::Correct) => Some(GameResult::Won),
            (true, Outcome::Incorrect) => Some(GameResult::Lost),
        };
        Verdict {
            result: outcome,
            card,
            correct_position,
            incorrect_attempts,
            game_completed: completed,
            game_result,
            is_guest_game: guest.then_some(true),
            message: guest.then(|| self.config.guest_message.clone()),
        }
    }
}

async fn get_game_in(
    txn: &mut dyn StoreTxn,
    game_id: GameId,
    requester: &Requester,
) -> Result<GameDetails, EngineError> {
    let game = txn
        .game_by_id(game_id)
        .await?
        .ok_or(EngineError::GameNotFound(game_id))?;
    authorize(&game, requester)?;
    let cards = txn.hand_cards(game_id).await?;
    let rounds = txn.rounds_for_game(game_id).await?;
    Ok(GameDetails {
        game,
        cards,
        rounds,
    })
}

async fn get_round_card_in(
    txn: &mut dyn StoreTxn,
    game_id: GameId,
    requester: &Requester,
) -> Result<RoundCard, EngineError> {
    let game = lock_active_game(txn, game_id, requester).await?;

    if game.owner_id.is_none() {
        if let Some(user_id) = requester.user_id() {
            txn.set_owner(game_id, user_id).await?;
            log::info!("Associated game {game_id} with user {user_id}");
        }
    }

    let hand = txn.hand_cards(game_id).await?;
    if let Some(pending) = game.pending_card_id {
        if hand.contains_card(pending) {
            log::error!("Game {game_id} has card {pending} both pending and in hand");
            return Err(EngineError::FatalConsistency(format!(
                "pending card {pending} of game {game_id} is already in the hand"
            )));
        }
        let card = txn.card_by_id(pending).await?.ok_or_else(|| {
            log::error!("Pending card {pending} of game {game_id} is missing from the catalog");
            EngineError::FatalConsistency(format!("pending card {pending} missing"))
        })?;
        log::debug!("Re-issuing pending card {pending} for game {game_id}");
        return Ok(RoundCard::from(card));
    }

    let exclude: Vec<CardId> = hand.iter().map(|entry| entry.card.id).collect();
    let drawn = match txn.random_cards(1, &exclude).await {
        Err(DatabaseError::InsufficientCards { .. }) => {
            log::info!("Catalog exhausted for game {game_id}");
            return Err(EngineError::NoCardsAvailable(game_id));
        }
        drawn => drawn?,
    };
    verify_draw(&drawn, &hand.card_ids(), 1)?;
    let Some(card) = drawn.into_iter().next() else {
        return Err(EngineError::NoCardsAvailable(game_id));
    };

    txn.set_pending_card(game_id, Some(card.id)).await?;
    log::info!("Issued card {} to game {game_id}", card.id);
    Ok(RoundCard::from(card))
}

async fn end_game_in(
    txn: &mut dyn StoreTxn,
    game_id: GameId,
    requester: &Requester,
    result: GameResult,
) -> Result<Game, EngineError> {
    lock_active_game(txn, game_id, requester).await?;
    close_game(txn, game_id, result).await?;
    txn.game_by_id(game_id)
        .await?
        .ok_or(EngineError::GameNotFound(game_id))
}

/// Locks the game row, then checks it exists, the requester may touch it, and
/// it has not ended, in that order.
async fn lock_active_game(
    txn: &mut dyn StoreTxn,
    game_id: GameId,
    requester: &Requester,
) -> Result<Game, EngineError> {
    let game = txn
        .lock_game(game_id)
        .await?
        .ok_or(EngineError::GameNotFound(game_id))?;
    authorize(&game, requester)?;
    if game.is_terminal() {
        return Err(EngineError::GameAlreadyEnded(game_id));
    }
    Ok(game)
}

async fn close_game(
    txn: &mut dyn StoreTxn,
    game_id: GameId,
    result: GameResult,
) -> Result<(), EngineError> {
    if !txn.finish_game(game_id, result, chrono::Utc::now()).await? {
        return Err(EngineError::GameAlreadyEnded(game_id));
    }
    log::info!("Game {game_id} ended: {result}");
    Ok(())
}

/// Ownerless games are open to anyone holding the id; owned games only to
/// their owner.
fn authorize(game: &Game, requester: &Requester) -> Result<(), EngineError> {
    let allowed = match requester.user_id() {
        _ if game.owner_id.is_none() => true,
        Some(user_id) => game.is_owned_by(user_id),
        None => false,
    };
    if !allowed {
        log::debug!("{requester} denied access to game {}", game.id);
        return Err(EngineError::Forbidden(game.id));
    }
    Ok(())
}

/// The catalog must hand back exactly `requested` distinct cards, none of them
/// excluded. Anything else is a store bug and is never retried.
fn verify_draw(
    drawn: &[Card],
    exclude: &HashSet<CardId>,
    requested: usize,
) -> Result<(), EngineError> {
    let distinct: HashSet<CardId> = drawn.iter().map(|card| card.id).collect();
    let problem = if drawn.len() != requested {
        Some(format!("catalog returned {} cards, expected {requested}", drawn.len()))
    } else if distinct.len() != drawn.len() {
        Some("catalog returned duplicate cards".to_string())
    } else if let Some(id) = distinct.iter().find(|id| exclude.contains(id)) {
        Some(format!("catalog returned excluded card {id}"))
    } else {
        None
    };

    match problem {
        Some(problem) => {
            log::error!("Fatal consistency error: {problem}");
            Err(EngineError::FatalConsistency(problem))
        }
        None => Ok(()),
    }
}

fn to_u32(value: usize) -> Result<u32, EngineError> {
    u32::try_from(value).map_err(|e| EngineError::FatalConsistency(e.to_string()))
}

async fn finish<T>(
    txn: Box<dyn StoreTxn>,
    result: Result<T, EngineError>,
) -> Result<T, EngineError> {
    match result {
        Ok(value) => {
            txn.commit().await?;
            Ok(value)
        }
        Err(err) => {
            if let Err(rollback_err) = txn.rollback().await {
                log::warn!("Rollback after '{err}' failed: {rollback_err}");
            }
            Err(err)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn card(id: i64) -> Card {
        Card {
            id: CardId(id),
            name: format!("card {id}"),
            image_ref: String::new(),
            misfortune_index: id as f64,
        }
    }

    #[test]
    fn test_verify_draw_accepts_clean_draw() {
        let exclude: HashSet<CardId> = [CardId(1)].into_iter().collect();
        assert!(verify_draw(&[card(2), card(3)], &exclude, 2).is_ok());
    }

    #[test]
    fn test_verify_draw_rejects_excluded_card() {
        let exclude: HashSet<CardId> = [CardId(1)].into_iter().collect();
        assert!(matches!(
            verify_draw(&[card(1)], &exclude, 1),
            Err(EngineError::FatalConsistency(_))
        ));
    }

    #[test]
    fn test_verify_draw_rejects_duplicates_and_short_draws() {
        assert!(matches!(
            verify_draw(&[card(4), card(4)], &HashSet::new(), 2),
            Err(EngineError::FatalConsistency(_))
        ));
        assert!(matches!(
            verify_draw(&[card(4)], &HashSet::new(), 2),
            Err(EngineError::FatalConsistency(_))
        ));
    }

    #[test]
    fn test_authorize() {
        let owner = types::UserId::new();
        let mut game = Game {
            id: GameId(1),
            owner_id: None,
            guest: true,
            started_at: chrono::Utc::now(),
            ended_at: None,
            result: None,
            incorrect_attempts: 0,
            pending_card_id: None,
        };
        assert!(authorize(&game, &Requester::Guest).is_ok());
        assert!(authorize(&game, &Requester::User(owner)).is_ok());

        game.owner_id = Some(owner);
        assert!(authorize(&game, &Requester::User(owner)).is_ok());
        assert!(authorize(&game, &Requester::Guest).is_err());
        assert!(authorize(&game, &Requester::User(types::UserId::new())).is_err());
    }
}
