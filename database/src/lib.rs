pub mod catalog;
pub mod config;
pub mod error;
pub mod models;
pub mod retry;
pub mod stores;

pub use catalog::{import_cards, load_cards_yaml, parse_cards_yaml};
pub use config::DatabaseConfig;
pub use error::DatabaseError;
pub use models::{NewCard, NewGame};
pub use retry::retry_with_backoff;
pub use stores::{
    CardCatalog, GameRecordStore, HandStore, InMemoryStore, Persistence, RoundHistoryStore,
    SqliteStore, StoreTxn,
};

#[cfg(test)]
mod tests;
