use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{QueryBuilder, Row, Sqlite, SqlitePool, Transaction};
use types::{
    Card, CardId, Game, GameId, GameResult, GameSummary, HandCard, RoundRecord, RoundReview,
    UserId,
};

use super::traits::{
    CardCatalog, GameRecordStore, HandStore, Persistence, RoundHistoryStore, StoreTxn,
};
use crate::models::{NewCard, NewGame};
use crate::DatabaseError;

const GAME_COLUMNS: &str =
    "id, owner_id, guest, started_at, ended_at, result, incorrect_attempts, pending_card_id";

pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn run_migrations(&self) -> Result<(), DatabaseError> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| DatabaseError::Migration(e.to_string()))?;
        tracing::info!("database migrations applied");
        Ok(())
    }
}

#[async_trait]
impl Persistence for SqliteStore {
    async fn begin(&self) -> Result<Box<dyn StoreTxn>, DatabaseError> {
        let tx = self
            .pool
            .begin()
            .await
            .map_err(|e| DatabaseError::Transaction(e.to_string()))?;
        Ok(Box::new(SqliteTxn { tx }))
    }
}

pub struct SqliteTxn {
    tx: Transaction<'static, Sqlite>,
}

fn card_from_row(row: &SqliteRow) -> Result<Card, DatabaseError> {
    Ok(Card {
        id: CardId(row.try_get("id").map_err(DatabaseError::query)?),
        name: row.try_get("name").map_err(DatabaseError::query)?,
        image_ref: row.try_get("image_ref").map_err(DatabaseError::query)?,
        misfortune_index: row.try_get("misfortune_index").map_err(DatabaseError::query)?,
    })
}

fn game_from_row(row: &SqliteRow) -> Result<Game, DatabaseError> {
    let owner_id: Option<String> = row.try_get("owner_id").map_err(DatabaseError::query)?;
    let result: Option<String> = row.try_get("result").map_err(DatabaseError::query)?;
    let incorrect_attempts: i64 = row
        .try_get("incorrect_attempts")
        .map_err(DatabaseError::query)?;
    let pending_card_id: Option<i64> = row
        .try_get("pending_card_id")
        .map_err(DatabaseError::query)?;

    Ok(Game {
        id: GameId(row.try_get("id").map_err(DatabaseError::query)?),
        owner_id: owner_id
            .map(|id| id.parse::<UserId>())
            .transpose()
            .map_err(DatabaseError::UuidParsing)?,
        guest: row.try_get("guest").map_err(DatabaseError::query)?,
        started_at: row.try_get("started_at").map_err(DatabaseError::query)?,
        ended_at: row.try_get("ended_at").map_err(DatabaseError::query)?,
        result: result
            .map(|r| r.parse::<GameResult>())
            .transpose()
            .map_err(|e| DatabaseError::InvalidData(e.to_string()))?,
        incorrect_attempts: u32::try_from(incorrect_attempts)
            .map_err(|e| DatabaseError::InvalidData(e.to_string()))?,
        pending_card_id: pending_card_id.map(CardId),
    })
}

fn count_from_row(row: &SqliteRow, column: &str) -> Result<u32, DatabaseError> {
    let count: i64 = row.try_get(column).map_err(DatabaseError::query)?;
    u32::try_from(count).map_err(|e| DatabaseError::InvalidData(e.to_string()))
}

#[async_trait]
impl CardCatalog for SqliteTxn {
    async fn card_by_id(&mut self, id: CardId) -> Result<Option<Card>, DatabaseError> {
        let row = sqlx::query("SELECT id, name, image_ref, misfortune_index FROM cards WHERE id = ?")
            .bind(id.as_i64())
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(DatabaseError::query)?;
        row.as_ref().map(card_from_row).transpose()
    }

    async fn random_cards(
        &mut self,
        count: usize,
        exclude: &[CardId],
    ) -> Result<Vec<Card>, DatabaseError> {
        let mut builder: QueryBuilder<Sqlite> =
            QueryBuilder::new("SELECT id, name, image_ref, misfortune_index FROM cards");
        if !exclude.is_empty() {
            builder.push(" WHERE id NOT IN (");
            let mut ids = builder.separated(", ");
            for id in exclude {
                ids.push_bind(id.as_i64());
            }
            ids.push_unseparated(")");
        }
        builder.push(" ORDER BY RANDOM() LIMIT ");
        builder.push_bind(count as i64);

        let rows = builder
            .build()
            .fetch_all(&mut *self.tx)
            .await
            .map_err(DatabaseError::query)?;
        if rows.len() < count {
            return Err(DatabaseError::InsufficientCards {
                requested: count,
                available: rows.len(),
            });
        }
        rows.iter().map(card_from_row).collect()
    }

    async fn insert_card(&mut self, card: &NewCard) -> Result<Card, DatabaseError> {
        let result =
            sqlx::query("INSERT INTO cards (name, image_ref, misfortune_index) VALUES (?, ?, ?)")
                .bind(&card.name)
                .bind(&card.image_ref)
                .bind(card.misfortune_index)
                .execute(&mut *self.tx)
                .await
                .map_err(DatabaseError::query)?;

        Ok(Card {
            id: CardId(result.last_insert_rowid()),
            name: card.name.clone(),
            image_ref: card.image_ref.clone(),
            misfortune_index: card.misfortune_index,
        })
    }

    async fn count_cards(&mut self) -> Result<u32, DatabaseError> {
        let row = sqlx::query("SELECT COUNT(*) AS count FROM cards")
            .fetch_one(&mut *self.tx)
            .await
            .map_err(DatabaseError::query)?;
        count_from_row(&row, "count")
    }
}

#[async_trait]
impl GameRecordStore for SqliteTxn {
    async fn insert_game(&mut self, game: &NewGame) -> Result<Game, DatabaseError> {
        let result = sqlx::query("INSERT INTO games (owner_id, guest, started_at) VALUES (?, ?, ?)")
            .bind(game.owner_id.map(|id| id.to_string()))
            .bind(game.is_guest())
            .bind(game.started_at)
            .execute(&mut *self.tx)
            .await
            .map_err(DatabaseError::query)?;

        Ok(Game {
            id: GameId(result.last_insert_rowid()),
            owner_id: game.owner_id,
            guest: game.is_guest(),
            started_at: game.started_at,
            ended_at: None,
            result: None,
            incorrect_attempts: 0,
            pending_card_id: None,
        })
    }

    async fn game_by_id(&mut self, id: GameId) -> Result<Option<Game>, DatabaseError> {
        let sql = format!("SELECT {GAME_COLUMNS} FROM games WHERE id = ?");
        let row = sqlx::query(&sql)
            .bind(id.as_i64())
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(DatabaseError::query)?;
        row.as_ref().map(game_from_row).transpose()
    }

    async fn lock_game(&mut self, id: GameId) -> Result<Option<Game>, DatabaseError> {
        // Writing first makes SQLite take the write lock before anything is read.
        let sql =
            format!("UPDATE games SET revision = revision + 1 WHERE id = ? RETURNING {GAME_COLUMNS}");
        let row = sqlx::query(&sql)
            .bind(id.as_i64())
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(DatabaseError::query)?;
        tracing::debug!(game_id = id.as_i64(), found = row.is_some(), "locked game row");
        row.as_ref().map(game_from_row).transpose()
    }

    async fn set_owner(&mut self, id: GameId, owner: UserId) -> Result<(), DatabaseError> {
        let result = sqlx::query("UPDATE games SET owner_id = ? WHERE id = ?")
            .bind(owner.to_string())
            .bind(id.as_i64())
            .execute(&mut *self.tx)
            .await
            .map_err(DatabaseError::query)?;
        if result.rows_affected() == 0 {
            return Err(DatabaseError::GameNotFound(id.as_i64()));
        }
        Ok(())
    }

    async fn set_pending_card(
        &mut self,
        id: GameId,
        card: Option<CardId>,
    ) -> Result<(), DatabaseError> {
        let result = sqlx::query("UPDATE games SET pending_card_id = ? WHERE id = ?")
            .bind(card.map(CardId::as_i64))
            .bind(id.as_i64())
            .execute(&mut *self.tx)
            .await
            .map_err(DatabaseError::query)?;
        if result.rows_affected() == 0 {
            return Err(DatabaseError::GameNotFound(id.as_i64()));
        }
        Ok(())
    }

    async fn increment_incorrect_attempts(&mut self, id: GameId) -> Result<u32, DatabaseError> {
        let row = sqlx::query(
            "UPDATE games SET incorrect_attempts = incorrect_attempts + 1 WHERE id = ? RETURNING incorrect_attempts",
        )
        .bind(id.as_i64())
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(DatabaseError::query)?
        .ok_or(DatabaseError::GameNotFound(id.as_i64()))?;
        count_from_row(&row, "incorrect_attempts")
    }

    async fn finish_game(
        &mut self,
        id: GameId,
        result: GameResult,
        ended_at: DateTime<Utc>,
    ) -> Result<bool, DatabaseError> {
        let updated = sqlx::query(
            "UPDATE games SET ended_at = ?, result = ?, pending_card_id = NULL WHERE id = ? AND result IS NULL",
        )
        .bind(ended_at)
        .bind(result.as_str())
        .bind(id.as_i64())
        .execute(&mut *self.tx)
        .await
        .map_err(DatabaseError::query)?;
        Ok(updated.rows_affected() == 1)
    }

    async fn games_for_owner(&mut self, owner: UserId) -> Result<Vec<GameSummary>, DatabaseError> {
        let rows = sqlx::query(
            "SELECT g.id, g.owner_id, g.guest, g.started_at, g.ended_at, g.result, g.incorrect_attempts, g.pending_card_id, COUNT(gc.id) AS card_count
             FROM games g
             LEFT JOIN game_cards gc ON g.id = gc.game_id
             WHERE g.owner_id = ?
             GROUP BY g.id
             ORDER BY g.started_at DESC, g.id DESC",
        )
        .bind(owner.to_string())
        .fetch_all(&mut *self.tx)
        .await
        .map_err(DatabaseError::query)?;

        rows.iter()
            .map(|row| {
                Ok(GameSummary {
                    game: game_from_row(row)?,
                    card_count: count_from_row(row, "card_count")?,
                })
            })
            .collect()
    }
}

#[async_trait]
impl HandStore for SqliteTxn {
    async fn append_hand_entry(
        &mut self,
        game_id: GameId,
        card_id: CardId,
        acquisition_order: u32,
    ) -> Result<(), DatabaseError> {
        sqlx::query("INSERT INTO game_cards (game_id, card_id, acquisition_order) VALUES (?, ?, ?)")
            .bind(game_id.as_i64())
            .bind(card_id.as_i64())
            .bind(i64::from(acquisition_order))
            .execute(&mut *self.tx)
            .await
            .map_err(DatabaseError::query)?;
        Ok(())
    }

    async fn hand_cards(&mut self, game_id: GameId) -> Result<Vec<HandCard>, DatabaseError> {
        let rows = sqlx::query(
            "SELECT c.id, c.name, c.image_ref, c.misfortune_index, gc.acquisition_order
             FROM cards c
             JOIN game_cards gc ON c.id = gc.card_id
             WHERE gc.game_id = ?
             ORDER BY gc.acquisition_order",
        )
        .bind(game_id.as_i64())
        .fetch_all(&mut *self.tx)
        .await
        .map_err(DatabaseError::query)?;

        rows.iter()
            .map(|row| {
                Ok(HandCard {
                    card: card_from_row(row)?,
                    acquisition_order: count_from_row(row, "acquisition_order")?,
                })
            })
            .collect()
    }

    async fn hand_size(&mut self, game_id: GameId) -> Result<u32, DatabaseError> {
        let row = sqlx::query("SELECT COUNT(*) AS count FROM game_cards WHERE game_id = ?")
            .bind(game_id.as_i64())
            .fetch_one(&mut *self.tx)
            .await
            .map_err(DatabaseError::query)?;
        count_from_row(&row, "count")
    }
}

#[async_trait]
impl RoundHistoryStore for SqliteTxn {
    async fn append_round(&mut self, round: &RoundRecord) -> Result<(), DatabaseError> {
        sqlx::query(
            "INSERT INTO game_rounds (game_id, round_number, presented_card_id, chosen_position, correct_position, is_correct, time_taken)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(round.game_id.as_i64())
        .bind(i64::from(round.round_number))
        .bind(round.presented_card_id.as_i64())
        .bind(round.chosen_position)
        .bind(i64::from(round.correct_position))
        .bind(round.is_correct)
        .bind(round.time_taken_seconds.map(i64::from))
        .execute(&mut *self.tx)
        .await
        .map_err(DatabaseError::query)?;
        Ok(())
    }

    async fn rounds_for_game(&mut self, game_id: GameId) -> Result<Vec<RoundReview>, DatabaseError> {
        let rows = sqlx::query(
            "SELECT r.round_number, r.presented_card_id, r.chosen_position, r.correct_position, r.is_correct, r.time_taken,
                    c.name, c.image_ref, c.misfortune_index
             FROM game_rounds r
             JOIN cards c ON c.id = r.presented_card_id
             WHERE r.game_id = ?
             ORDER BY r.round_number",
        )
        .bind(game_id.as_i64())
        .fetch_all(&mut *self.tx)
        .await
        .map_err(DatabaseError::query)?;

        rows.iter()
            .map(|row| {
                let time_taken: Option<i64> =
                    row.try_get("time_taken").map_err(DatabaseError::query)?;
                Ok(RoundReview {
                    record: RoundRecord {
                        game_id,
                        round_number: count_from_row(row, "round_number")?,
                        presented_card_id: CardId(
                            row.try_get("presented_card_id")
                                .map_err(DatabaseError::query)?,
                        ),
                        chosen_position: row
                            .try_get("chosen_position")
                            .map_err(DatabaseError::query)?,
                        correct_position: count_from_row(row, "correct_position")?,
                        is_correct: row.try_get("is_correct").map_err(DatabaseError::query)?,
                        time_taken_seconds: time_taken
                            .map(u32::try_from)
                            .transpose()
                            .map_err(|e| DatabaseError::InvalidData(e.to_string()))?,
                    },
                    card_name: row.try_get("name").map_err(DatabaseError::query)?,
                    card_image_ref: row.try_get("image_ref").map_err(DatabaseError::query)?,
                    card_misfortune_index: row
                        .try_get("misfortune_index")
                        .map_err(DatabaseError::query)?,
                })
            })
            .collect()
    }

    async fn count_rounds(&mut self, game_id: GameId) -> Result<u32, DatabaseError> {
        let row = sqlx::query("SELECT COUNT(*) AS count FROM game_rounds WHERE game_id = ?")
            .bind(game_id.as_i64())
            .fetch_one(&mut *self.tx)
            .await
            .map_err(DatabaseError::query)?;
        count_from_row(&row, "count")
    }

    async fn count_incorrect_rounds(&mut self, game_id: GameId) -> Result<u32, DatabaseError> {
        let row = sqlx::query(
            "SELECT COUNT(*) AS count FROM game_rounds WHERE game_id = ? AND is_correct = 0",
        )
        .bind(game_id.as_i64())
        .fetch_one(&mut *self.tx)
        .await
        .map_err(DatabaseError::query)?;
        count_from_row(&row, "count")
    }
}

#[async_trait]
impl StoreTxn for SqliteTxn {
    async fn commit(self: Box<Self>) -> Result<(), DatabaseError> {
        self.tx
            .commit()
            .await
            .map_err(|e| DatabaseError::Transaction(e.to_string()))
    }

    async fn rollback(self: Box<Self>) -> Result<(), DatabaseError> {
        self.tx
            .rollback()
            .await
            .map_err(|e| DatabaseError::Transaction(e.to_string()))
    }
}
