use thiserror::Error;

#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("Database connection error: {0}")]
    Connection(String),

    #[error("Query execution error: {0}")]
    Query(String),

    #[error("Transaction error: {0}")]
    Transaction(String),

    #[error("Migration error: {0}")]
    Migration(String),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("UUID parsing error: {0}")]
    UuidParsing(#[from] uuid::Error),

    #[error("Invalid stored data: {0}")]
    InvalidData(String),

    #[error("Not enough cards in catalog: requested {requested}, available {available}")]
    InsufficientCards { requested: usize, available: usize },

    #[error("Game not found: {0}")]
    GameNotFound(i64),

    #[error("Retry exhausted: {0}")]
    RetryExhausted(String),
}

impl DatabaseError {
    pub(crate) fn query(err: sqlx::Error) -> Self {
        DatabaseError::Query(err.to_string())
    }
}
