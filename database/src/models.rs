use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use types::UserId;

/// A catalog card that has not been assigned an id yet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewCard {
    pub name: String,
    pub image_ref: String,
    pub misfortune_index: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewGame {
    pub owner_id: Option<UserId>,
    pub started_at: DateTime<Utc>,
}

impl NewGame {
    pub fn starting_now(owner_id: Option<UserId>) -> Self {
        Self {
            owner_id,
            started_at: Utc::now(),
        }
    }

    /// Guest status is fixed here, at creation.
    pub fn is_guest(&self) -> bool {
        self.owner_id.is_none()
    }
}
