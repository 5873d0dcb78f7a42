use std::str::FromStr;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;

use crate::error::BotError;
use crate::media::MovieId;

const CREATE_SQL: &str = "\
CREATE TABLE IF NOT EXISTS favorites (
  user_id    INTEGER NOT NULL,
  movie_id   INTEGER NOT NULL,
  title      TEXT    NOT NULL,
  year       TEXT    NOT NULL,
  PRIMARY KEY (user_id, movie_id)
)";

/// Result of an add: a duplicate is a distinct success, not an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddOutcome {
    Inserted,
    AlreadyExists,
}

/// Durable per-user favorites, unique on `(user_id, movie_id)`.
///
/// Uniqueness is enforced by the primary key, not pre-checked, so
/// concurrent adds for the same pair race safely: exactly one inserts.
#[derive(Clone)]
pub struct FavoritesStore {
    pool: SqlitePool,
}

impl FavoritesStore {
    pub async fn open(db_path: &str) -> Result<Self, BotError> {
        let options = SqliteConnectOptions::from_str(&format!("sqlite://{db_path}"))?
            .create_if_missing(true);
        Self::with_options(options).await
    }

    async fn with_options(options: SqliteConnectOptions) -> Result<Self, BotError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await?;
        sqlx::query(CREATE_SQL).execute(&pool).await?;
        Ok(Self { pool })
    }

    pub async fn add(
        &self,
        user_id: i64,
        movie_id: MovieId,
        title: &str,
        year: &str,
    ) -> Result<AddOutcome, BotError> {
        let result = sqlx::query(
            "INSERT INTO favorites (user_id, movie_id, title, year) VALUES (?, ?, ?, ?)",
        )
        .bind(user_id)
        .bind(movie_id as i64)
        .bind(title)
        .bind(year)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(AddOutcome::Inserted),
            Err(sqlx::Error::Database(db)) if db.is_unique_violation() => {
                Ok(AddOutcome::AlreadyExists)
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Saved favorites as (movie_id, title), ordered by title ascending.
    pub async fn list(&self, user_id: i64) -> Result<Vec<(MovieId, String)>, BotError> {
        let rows: Vec<(i64, String)> = sqlx::query_as(
            "SELECT movie_id, title FROM favorites WHERE user_id = ? ORDER BY title",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows
            .into_iter()
            .map(|(id, title)| (id as MovieId, title))
            .collect())
    }

    /// Remove one favorite; an absent pair affects zero rows.
    pub async fn remove(&self, user_id: i64, movie_id: MovieId) -> Result<u64, BotError> {
        let result = sqlx::query("DELETE FROM favorites WHERE user_id = ? AND movie_id = ?")
            .bind(user_id)
            .bind(movie_id as i64)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    #[cfg(test)]
    async fn in_memory() -> Self {
        let options = SqliteConnectOptions::from_str("sqlite::memory:").unwrap();
        Self::with_options(options).await.unwrap()
    }
}
