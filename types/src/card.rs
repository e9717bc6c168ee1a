use std::fmt::Display;

use serde::{Deserialize, Serialize};

pub const MIN_MISFORTUNE_INDEX: f64 = 0.0;
pub const MAX_MISFORTUNE_INDEX: f64 = 100.0;

#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CardId(pub i64);

impl CardId {
    pub fn as_i64(self) -> i64 {
        self.0
    }
}

impl Display for CardId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A catalog card. The misfortune index is only ever revealed for cards the
/// player already holds or has just placed.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Card {
    pub id: CardId,
    pub name: String,
    pub image_ref: String,
    pub misfortune_index: f64,
}

impl Display for Card {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({:.1})", self.name, self.misfortune_index)
    }
}

pub fn is_valid_misfortune_index(index: f64) -> bool {
    (MIN_MISFORTUNE_INDEX..=MAX_MISFORTUNE_INDEX).contains(&index)
}

/// The card as presented during a round: everything but the index.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoundCard {
    pub id: CardId,
    pub name: String,
    pub image_ref: String,
}

impl Display for RoundCard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} (?)", self.name)
    }
}

impl From<&Card> for RoundCard {
    fn from(card: &Card) -> Self {
        Self {
            id: card.id,
            name: card.name.clone(),
            image_ref: card.image_ref.clone(),
        }
    }
}

impl From<Card> for RoundCard {
    fn from(card: Card) -> Self {
        Self {
            id: card.id,
            name: card.name,
            image_ref: card.image_ref,
        }
    }
}
