pub mod card;
pub mod game;
pub mod hand;
pub mod requester;
pub mod round;
pub mod strategy;
pub mod verdict;

pub use card::{Card, CardId, RoundCard};
pub use game::{Game, GameId, GameResult, GameStatus, GameSummary, UserId};
pub use hand::{Hand, HandCard};
pub use requester::Requester;
pub use round::{Placement, RoundRecord, RoundReview};
pub use strategy::{PlacementChoice, PlacementStrategy};
pub use verdict::{Outcome, Verdict};
