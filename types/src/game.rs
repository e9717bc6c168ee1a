use std::{fmt::Display, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::card::CardId;

#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GameId(pub i64);

impl GameId {
    pub fn as_i64(self) -> i64 {
        self.0
    }
}

impl Display for GameId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub Uuid);

impl UserId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for UserId {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for UserId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GameResult {
    Won,
    Lost,
}

impl GameResult {
    pub fn as_str(&self) -> &'static str {
        match self {
            GameResult::Won => "won",
            GameResult::Lost => "lost",
        }
    }
}

impl Display for GameResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid game result {0:?}, expected \"won\" or \"lost\"")]
pub struct ParseGameResultError(pub String);

impl FromStr for GameResult {
    type Err = ParseGameResultError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "won" => Ok(GameResult::Won),
            "lost" => Ok(GameResult::Lost),
            other => Err(ParseGameResultError(other.to_string())),
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum GameStatus {
    Created,
    InProgress,
    Won,
    Lost,
}

impl GameStatus {
    pub fn is_active(&self) -> bool {
        matches!(self, GameStatus::Created | GameStatus::InProgress)
    }
}

/// One game row. `guest` is decided when the game is created and never
/// changes, even if an owner is attached later.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Game {
    pub id: GameId,
    pub owner_id: Option<UserId>,
    pub guest: bool,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    pub result: Option<GameResult>,
    pub incorrect_attempts: u32,
    #[serde(skip)]
    pub pending_card_id: Option<CardId>,
}

impl Game {
    pub fn is_guest(&self) -> bool {
        self.guest
    }

    pub fn is_terminal(&self) -> bool {
        self.result.is_some()
    }

    pub fn is_owned_by(&self, user_id: UserId) -> bool {
        self.owner_id == Some(user_id)
    }

    pub fn status(&self, rounds_played: usize) -> GameStatus {
        match self.result {
            Some(GameResult::Won) => GameStatus::Won,
            Some(GameResult::Lost) => GameStatus::Lost,
            None if rounds_played == 0 => GameStatus::Created,
            None => GameStatus::InProgress,
        }
    }
}

/// A game in a player's history listing.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameSummary {
    #[serde(flatten)]
    pub game: Game,
    pub card_count: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn game(result: Option<GameResult>) -> Game {
        Game {
            id: GameId(1),
            owner_id: None,
            guest: true,
            started_at: Utc::now(),
            ended_at: None,
            result,
            incorrect_attempts: 0,
            pending_card_id: Some(CardId(4)),
        }
    }

    #[test]
    fn test_game_result_parsing() {
        assert_eq!("won".parse::<GameResult>(), Ok(GameResult::Won));
        assert_eq!("lost".parse::<GameResult>(), Ok(GameResult::Lost));
        assert!("draw".parse::<GameResult>().is_err());
        assert!("Won".parse::<GameResult>().is_err());
    }

    #[test]
    fn test_game_status() {
        assert_eq!(game(None).status(0), GameStatus::Created);
        assert_eq!(game(None).status(2), GameStatus::InProgress);
        assert_eq!(game(Some(GameResult::Won)).status(2), GameStatus::Won);
        assert_eq!(game(Some(GameResult::Lost)).status(0), GameStatus::Lost);
        assert!(game(None).status(1).is_active());
        assert!(!game(Some(GameResult::Lost)).status(1).is_active());
    }

    #[test]
    fn test_ownership() {
        let owner = UserId::new();
        let mut owned = game(None);
        owned.owner_id = Some(owner);
        assert!(owned.is_owned_by(owner));
        assert!(!owned.is_owned_by(UserId::new()));
        assert!(!game(None).is_owned_by(owner));
    }

    #[test]
    fn test_game_serialization_hides_pending_card() {
        let json = serde_json::to_value(game(Some(GameResult::Won))).unwrap();
        assert_eq!(json["result"], "won");
        assert_eq!(json["guest"], true);
        assert_eq!(json["incorrectAttempts"], 0);
        assert!(json.get("pendingCardId").is_none());
    }
}
