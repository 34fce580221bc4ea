//! Durable record of completed analyses
//!
//! A game id is present iff all of its move records were committed in one
//! unit of work (or the game legitimately produced zero updates). Entries
//! are never removed by this subsystem; forced re-analysis is an
//! operational action elsewhere.

use std::collections::HashSet;

use sqlx::PgPool;

use crate::error::WorkerError;

#[derive(Clone)]
pub struct ProgressTracker {
    pool: PgPool,
}

impl ProgressTracker {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn is_analyzed(&self, game_id: &str) -> Result<bool, WorkerError> {
        let row: Option<(String,)> =
            sqlx::query_as("SELECT game_id FROM analyzed_games WHERE game_id = $1")
                .bind(game_id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.is_some())
    }

    /// Bulk snapshot of all analyzed ids, used to filter incoming pages.
    /// Staleness is tolerated: re-marking is a no-op.
    pub async fn analyzed_set(&self) -> Result<HashSet<String>, WorkerError> {
        let rows: Vec<(String,)> = sqlx::query_as("SELECT game_id FROM analyzed_games")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(|(id,)| id).collect())
    }

    /// Idempotent: inserting an already-present id is a no-op, not an
    /// error. Must only be called after the game's move records are
    /// durably written.
    pub async fn mark_analyzed(&self, game_id: &str) -> Result<(), WorkerError> {
        sqlx::query(
            "INSERT INTO analyzed_games (game_id, analyzed_at) VALUES ($1, NOW())
             ON CONFLICT (game_id) DO NOTHING",
        )
        .bind(game_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
