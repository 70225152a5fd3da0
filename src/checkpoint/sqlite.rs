use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Row, SqlitePool};
use std::path::Path;
use std::str::FromStr;

use super::{CheckpointError, Checkpointer};
use crate::models::Message;

/// Sqlite-backed checkpointer. Transcripts are stored as JSON, one row per
/// thread, and survive process restarts.
pub struct SqliteSaver {
    pool: SqlitePool,
}

impl SqliteSaver {
    /// Open (and create if needed) a database file at `path`.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, CheckpointError> {
        let options = SqliteConnectOptions::from_str(&format!(
            "sqlite://{}",
            path.as_ref().display()
        ))
        .map_err(|e| CheckpointError::Storage(e.to_string()))?
        .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .map_err(|e| CheckpointError::Storage(e.to_string()))?;

        let saver = Self { pool };
        saver.migrate().await?;
        Ok(saver)
    }

    /// In-memory database, handy for tests.
    pub async fn in_memory() -> Result<Self, CheckpointError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .map_err(|e| CheckpointError::Storage(e.to_string()))?;

        let saver = Self { pool };
        saver.migrate().await?;
        Ok(saver)
    }

    async fn migrate(&self) -> Result<(), CheckpointError> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS checkpoints (
                thread_id TEXT PRIMARY KEY,
                transcript TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )",
        )
        .execute(&self.pool)
        .await
        .map_err(|e| CheckpointError::Storage(e.to_string()))?;
        Ok(())
    }
}

#[async_trait]
impl Checkpointer for SqliteSaver {
    async fn put(&self, thread_id: &str, transcript: &[Message]) -> Result<(), CheckpointError> {
        let encoded = serde_json::to_string(transcript)?;
        sqlx::query(
            "INSERT INTO checkpoints (thread_id, transcript, updated_at)
             VALUES (?1, ?2, ?3)
             ON CONFLICT(thread_id) DO UPDATE SET
                transcript = excluded.transcript,
                updated_at = excluded.updated_at",
        )
        .bind(thread_id)
        .bind(encoded)
        .bind(chrono::Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| CheckpointError::Storage(e.to_string()))?;
        Ok(())
    }

    async fn get(&self, thread_id: &str) -> Result<Option<Vec<Message>>, CheckpointError> {
        let row = sqlx::query("SELECT transcript FROM checkpoints WHERE thread_id = ?1")
            .bind(thread_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| CheckpointError::Storage(e.to_string()))?;

        match row {
            Some(row) => {
                let encoded: String = row
                    .try_get("transcript")
                    .map_err(|e| CheckpointError::Storage(e.to_string()))?;
                Ok(Some(serde_json::from_str(&encoded)?))
            }
            None => Ok(None),
        }
    }

    async fn delete(&self, thread_id: &str) -> Result<(), CheckpointError> {
        sqlx::query("DELETE FROM checkpoints WHERE thread_id = ?1")
            .bind(thread_id)
            .execute(&self.pool)
            .await
            .map_err(|e| CheckpointError::Storage(e.to_string()))?;
        Ok(())
    }

    async fn list_threads(&self) -> Result<Vec<String>, CheckpointError> {
        let rows = sqlx::query("SELECT thread_id FROM checkpoints ORDER BY thread_id")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| CheckpointError::Storage(e.to_string()))?;

        rows.into_iter()
            .map(|row| {
                row.try_get::<String, _>("thread_id")
                    .map_err(|e| CheckpointError::Storage(e.to_string()))
            })
            .collect()
    }
}
