use serde::{Deserialize, Serialize};
use types::{Card, Game, HandCard, RoundReview};

/// A freshly created game and its initial hand, indices included.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NewGame {
    pub game: Game,
    pub cards: Vec<Card>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GameDetails {
    pub game: Game,
    pub cards: Vec<HandCard>,
    pub rounds: Vec<RoundReview>,
}

impl GameDetails {
    pub fn status(&self) -> types::GameStatus {
        self.game.status(self.rounds.len())
    }
}
