use serde::{Deserialize, Serialize};

use crate::{card::Card, game::GameResult};

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Correct,
    Incorrect,
}

/// The answer to a submitted placement. The presented card is returned with
/// its misfortune index now that the round is over.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Verdict {
    pub result: Outcome,
    pub card: Card,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub correct_position: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub incorrect_attempts: Option<u32>,
    pub game_completed: bool,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub game_result: Option<GameResult>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub is_guest_game: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub message: Option<String>,
}

impl Verdict {
    pub fn is_correct(&self) -> bool {
        self.result == Outcome::Correct
    }
}
