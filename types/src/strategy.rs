use std::fmt::Debug;

use crate::{card::Card, card::RoundCard, round::Placement};

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct PlacementChoice {
    pub placement: Placement,
    pub time_taken_seconds: Option<u32>,
}

impl PlacementChoice {
    pub fn new(placement: Placement, time_taken_seconds: Option<u32>) -> Self {
        Self {
            placement,
            time_taken_seconds,
        }
    }
}

/// Decides where a round card goes. `hand` is the player's current hand in
/// ascending misfortune order, so a placement is an index into that slice.
pub trait PlacementStrategy: Debug {
    fn choose_placement(&mut self, hand: &[Card], card: &RoundCard) -> PlacementChoice;
}
