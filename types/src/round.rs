use std::fmt::Display;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{card::CardId, game::GameId};

/// Wire value of a placement that ran out of time.
pub const TIMEOUT_POSITION: i64 = -1;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Placement {
    Timeout,
    At(usize),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("position must be -1 or a non-negative integer, got {0}")]
pub struct InvalidPlacement(pub i64);

impl Placement {
    pub fn position(&self) -> i64 {
        match self {
            Placement::Timeout => TIMEOUT_POSITION,
            Placement::At(position) => *position as i64,
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, Placement::Timeout)
    }

    /// A timeout is never correct.
    pub fn is_correct(&self, correct_position: usize) -> bool {
        matches!(self, Placement::At(position) if *position == correct_position)
    }
}

impl TryFrom<i64> for Placement {
    type Error = InvalidPlacement;

    fn try_from(position: i64) -> Result<Self, Self::Error> {
        match position {
            TIMEOUT_POSITION => Ok(Placement::Timeout),
            p if p >= 0 => Ok(Placement::At(p as usize)),
            p => Err(InvalidPlacement(p)),
        }
    }
}

impl Display for Placement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Placement::Timeout => write!(f, "timeout"),
            Placement::At(position) => write!(f, "position {position}"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoundRecord {
    pub game_id: GameId,
    pub round_number: u32,
    pub presented_card_id: CardId,
    pub chosen_position: i64,
    pub correct_position: u32,
    pub is_correct: bool,
    pub time_taken_seconds: Option<u32>,
}

/// A recorded round joined with the presented card's display fields, for
/// post-game review.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoundReview {
    #[serde(flatten)]
    pub record: RoundRecord,
    pub card_name: String,
    pub card_image_ref: String,
    pub card_misfortune_index: f64,
}
