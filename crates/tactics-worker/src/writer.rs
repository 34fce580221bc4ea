//! Atomic per-game move-record updates

use chess::Color;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use tracing::debug;

use chess_tactics::{Severity, TacticalTag};

use crate::error::WorkerError;

/// One classified move, keyed by (move_number, player_color) within a game.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MoveUpdate {
    pub move_number: i32,
    #[serde(with = "color_str")]
    pub player_color: Color,
    pub tag: Option<TacticalTag>,
    pub score_diff: i32,
    pub severity: Severity,
}

/// Counts from one committed batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriteOutcome {
    pub matched: u64,
    /// Updates whose move record does not exist (feature extraction never
    /// ran for that move). A documented no-op, not an error.
    pub unmatched: u64,
}

/// Applies a game's updates as a single all-or-nothing transaction.
#[derive(Clone)]
pub struct ResultWriter {
    pool: PgPool,
}

impl ResultWriter {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Apply all updates for one game atomically. Safe for concurrent use
    /// across different games; the dispatcher guarantees a single writer
    /// per game.
    pub async fn apply_updates(
        &self,
        game_id: &str,
        updates: &[MoveUpdate],
    ) -> Result<WriteOutcome, WorkerError> {
        let mut tx = self.pool.begin().await?;
        let mut outcome = WriteOutcome::default();

        for update in updates {
            let result = sqlx::query(
                "UPDATE move_records
                 SET tag = $4, score_diff = $5, error_label = $6
                 WHERE game_id = $1 AND move_number = $2 AND player_color = $3",
            )
            .bind(game_id)
            .bind(update.move_number)
            .bind(color_str::as_str(update.player_color))
            .bind(update.tag.map(|t| t.as_str()))
            .bind(update.score_diff)
            .bind(update.severity.as_str())
            .execute(&mut *tx)
            .await?;

            if result.rows_affected() == 0 {
                debug!(
                    game_id,
                    move_number = update.move_number,
                    player_color = color_str::as_str(update.player_color),
                    "no matching move record, skipping"
                );
                outcome.unmatched += 1;
            } else {
                outcome.matched += result.rows_affected();
            }
        }

        tx.commit().await?;
        Ok(outcome)
    }
}

/// Stable "white"/"black" strings for persistence and serde.
pub mod color_str {
    use chess::Color;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn as_str(color: Color) -> &'static str {
        match color {
            Color::White => "white",
            Color::Black => "black",
        }
    }

    pub fn serialize<S: Serializer>(color: &Color, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(as_str(*color))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Color, D::Error> {
        let raw = String::deserialize(d)?;
        match raw.as_str() {
            "white" => Ok(Color::White),
            "black" => Ok(Color::Black),
            other => Err(serde::de::Error::custom(format!(
                "unknown player color: {other}"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_move_update_serde_round_trip() {
        let update = MoveUpdate {
            move_number: 14,
            player_color: Color::Black,
            tag: Some(TacticalTag::Fork),
            score_diff: -230,
            severity: Severity::Blunder,
        };
        let json = serde_json::to_value(&update).unwrap();
        assert_eq!(json["player_color"].as_str(), Some("black"));
        assert_eq!(json["tag"].as_str(), Some("fork"));
        let back: MoveUpdate = serde_json::from_value(json).unwrap();
        assert_eq!(back.player_color, Color::Black);
        assert_eq!(back.score_diff, -230);
    }
}
