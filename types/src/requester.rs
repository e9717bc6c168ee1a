use std::fmt::Display;

use crate::game::UserId;

/// Who is calling the engine, as reported by the identity provider.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Requester {
    Guest,
    User(UserId),
}

impl Requester {
    pub fn user_id(&self) -> Option<UserId> {
        match self {
            Requester::Guest => None,
            Requester::User(id) => Some(*id),
        }
    }
}

impl From<Option<UserId>> for Requester {
    fn from(value: Option<UserId>) -> Self {
        value.map_or(Requester::Guest, Requester::User)
    }
}

impl Display for Requester {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Requester::Guest => write!(f, "guest"),
            Requester::User(id) => write!(f, "user {id}"),
        }
    }
}
