pub mod input_strategy;

use rand::{rngs::ThreadRng, Rng};
use types::{Card, Placement, PlacementChoice, PlacementStrategy, RoundCard};

pub use crate::input_strategy::InputStrategy;

#[derive(Debug, Default)]
pub struct RandomStrategy {
    rng: ThreadRng,
}

impl PlacementStrategy for RandomStrategy {
    fn choose_placement(&mut self, hand: &[Card], card: &RoundCard) -> PlacementChoice {
        let slot = self.rng.gen_range(0..=hand.len());
        log::debug!("Randomly placing {card} at slot {slot}");
        PlacementChoice::new(Placement::At(slot), Some(0))
    }
}
