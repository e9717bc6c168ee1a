use database::Persistence;
use types::{Card, GameId, Hand, PlacementStrategy, Requester, Verdict};

use crate::{EngineError, GameDetails, RoundEngine};

#[derive(Debug)]
pub struct PlayedGame {
    pub details: GameDetails,
    pub verdicts: Vec<Verdict>,
}

impl PlayedGame {
    pub fn correct_rounds(&self) -> usize {
        self.verdicts.iter().filter(|verdict| verdict.is_correct()).count()
    }
}

/// Creates a game for `requester` and plays rounds with `strategy` until the
/// engine reports the game completed.
pub async fn play_game<S: Persistence>(
    engine: &RoundEngine<S>,
    requester: &Requester,
    strategy: &mut dyn PlacementStrategy,
) -> Result<PlayedGame, EngineError> {
    let created = engine.create_game(requester.user_id()).await?;
    let game_id = created.game.id;
    let mut verdicts = Vec::new();

    loop {
        let hand = sorted_hand(engine, game_id, requester).await?;
        let card = engine.get_round_card(game_id, requester).await?;
        let choice = strategy.choose_placement(&hand, &card);
        let verdict = engine
            .submit_placement(
                game_id,
                requester,
                card.id,
                choice.placement.position(),
                choice.time_taken_seconds,
            )
            .await?;
        log::debug!("Verdict for game {game_id}: {verdict:?}");

        let completed = verdict.game_completed;
        verdicts.push(verdict);
        if completed {
            break;
        }
    }

    let details = engine.get_game(game_id, requester).await?;
    Ok(PlayedGame { details, verdicts })
}

async fn sorted_hand<S: Persistence>(
    engine: &RoundEngine<S>,
    game_id: GameId,
    requester: &Requester,
) -> Result<Vec<Card>, EngineError> {
    let details = engine.get_game(game_id, requester).await?;
    Ok(details
        .cards
        .sorted_by_index()
        .into_iter()
        .cloned()
        .collect())
}
