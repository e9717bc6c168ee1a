use std::collections::HashSet;

use itertools::Itertools;
use serde::{Deserialize, Serialize};

use crate::card::{Card, CardId};

/// A card held in a game's hand together with the order it was acquired in
/// (1 for the first card of the initial hand).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HandCard {
    #[serde(flatten)]
    pub card: Card,
    pub acquisition_order: u32,
}

pub trait Hand {
    fn cards(&self) -> Vec<&Card>;

    fn card_ids(&self) -> HashSet<CardId> {
        self.cards().iter().map(|card| card.id).collect()
    }

    fn contains_card(&self, id: CardId) -> bool {
        self.cards().iter().any(|card| card.id == id)
    }

    /// Cards ordered by ascending misfortune index, the order in which the
    /// player sees their hand laid out.
    fn sorted_by_index(&self) -> Vec<&Card> {
        self.cards()
            .into_iter()
            .sorted_by(|a, b| a.misfortune_index.total_cmp(&b.misfortune_index))
            .collect()
    }

    /// The slot a card with `misfortune_index` belongs in: the number of held
    /// cards with a strictly smaller index. A card equal to existing cards
    /// goes after all of them.
    fn correct_position(&self, misfortune_index: f64) -> usize {
        self.cards()
            .iter()
            .filter(|card| card.misfortune_index < misfortune_index)
            .count()
    }
}

impl Hand for [Card] {
    fn cards(&self) -> Vec<&Card> {
        self.iter().collect()
    }
}

impl Hand for Vec<Card> {
    fn cards(&self) -> Vec<&Card> {
        self.iter().collect()
    }
}

impl Hand for [HandCard] {
    fn cards(&self) -> Vec<&Card> {
        self.iter().map(|held| &held.card).collect()
    }
}

impl Hand for Vec<HandCard> {
    fn cards(&self) -> Vec<&Card> {
        self.iter().map(|held| &held.card).collect()
    }
}

/// True when acquisition orders form the gapless sequence 1..=N and no card
/// id repeats.
pub fn is_contiguous_hand(hand: &[HandCard]) -> bool {
    let orders_ok = hand
        .iter()
        .map(|held| held.acquisition_order)
        .sorted()
        .enumerate()
        .all(|(idx, order)| order as usize == idx + 1);
    let distinct: HashSet<CardId> = hand.iter().map(|held| held.card.id).collect();
    orders_ok && distinct.len() == hand.len()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn card(id: i64, index: f64) -> Card {
        Card {
            id: CardId(id),
            name: format!("card {id}"),
            image_ref: format!("/images/cards/{id}.jpg"),
            misfortune_index: index,
        }
    }

    #[test]
    fn test_correct_position_ties_go_after_equals() {
        let hand = vec![card(1, 10.0), card(2, 30.0), card(3, 30.0), card(4, 50.0)];

        assert_eq!(hand.correct_position(25.0), 1);
        assert_eq!(hand.correct_position(30.0), 2);
        assert_eq!(hand.correct_position(99.0), 4);
        assert_eq!(hand.correct_position(1.0), 0);
    }

    #[test]
    fn test_correct_position_ignores_acquisition_order() {
        let hand = vec![card(1, 80.0), card(2, 20.0), card(3, 50.0)];
        assert_eq!(hand.correct_position(65.0), 2);
        assert_eq!(
            hand.sorted_by_index()
                .iter()
                .map(|c| c.misfortune_index)
                .collect::<Vec<_>>(),
            vec![20.0, 50.0, 80.0]
        );
    }

    #[test]
    fn test_contiguous_hand() {
        let held = |id, order| HandCard {
            card: card(id, id as f64),
            acquisition_order: order,
        };
        assert!(is_contiguous_hand(&[held(1, 1), held(2, 2), held(3, 3)]));
        assert!(is_contiguous_hand(&[held(3, 3), held(1, 1), held(2, 2)]));
        assert!(!is_contiguous_hand(&[held(1, 1), held(2, 3)]));
        assert!(!is_contiguous_hand(&[held(1, 1), held(1, 2)]));
        assert!(!is_contiguous_hand(&[held(1, 0), held(2, 1)]));
    }

    #[test]
    fn test_hand_card_serializes_flat() {
        let json = serde_json::to_value(HandCard {
            card: card(9, 12.5),
            acquisition_order: 2,
        })
        .unwrap();
        assert_eq!(json["id"], 9);
        assert_eq!(json["misfortuneIndex"], 12.5);
        assert_eq!(json["acquisitionOrder"], 2);
    }
}
