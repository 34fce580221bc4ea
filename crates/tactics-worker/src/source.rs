//! Paginated reads from the game store

use sqlx::PgPool;

use crate::error::WorkerError;

/// One game as supplied by the game source.
#[derive(Debug, Clone)]
pub struct RawGame {
    pub game_id: String,
    pub pgn: String,
}

/// Read-only pagination over stored games.
#[derive(Clone)]
pub struct GameSource {
    pool: PgPool,
}

impl GameSource {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Fetch one page of games, ordered by id for stable pagination.
    /// `source_filter` restricts to a provenance bucket (e.g. "elite").
    pub async fn fetch_page(
        &self,
        offset: i64,
        limit: i64,
        source_filter: Option<&str>,
    ) -> Result<Vec<RawGame>, WorkerError> {
        let rows: Vec<(String, String)> = if let Some(src) = source_filter {
            sqlx::query_as(
                "SELECT game_id, pgn FROM games WHERE source = $1
                 ORDER BY game_id LIMIT $2 OFFSET $3",
            )
            .bind(src)
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await?
        } else {
            sqlx::query_as(
                "SELECT game_id, pgn FROM games ORDER BY game_id LIMIT $1 OFFSET $2",
            )
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await?
        };

        Ok(rows
            .into_iter()
            .map(|(game_id, pgn)| RawGame { game_id, pgn })
            .collect())
    }
}
