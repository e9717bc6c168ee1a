pub mod config;
pub mod engine;
pub mod error;
pub mod gameplay;
pub mod views;

pub use config::{ConfigError, EngineConfig};
pub use engine::RoundEngine;
pub use error::{EngineError, ErrorKind};
pub use gameplay::{play_game, PlayedGame};
pub use views::{GameDetails, NewGame};
