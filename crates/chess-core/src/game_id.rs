//! Content-derived game identifiers.
//!
//! A game id is a SHA-256 over the normalized headers and the SAN move
//! sequence. Stable: the same game re-imported from any source hashes to
//! the same id.

use sha2::{Digest, Sha256};

use crate::game_data::GameData;

/// Compute the content-derived id for a parsed game.
pub fn game_id(game: &GameData) -> String {
    game_id_from_parts(
        &game.metadata.white,
        &game.metadata.black,
        game.metadata.date.as_deref().unwrap_or(""),
        &game.metadata.result,
        &game.moves,
    )
}

/// Compute a game id directly from header fields and SAN moves.
///
/// Fields are length-prefixed before hashing so that no concatenation of
/// adjacent fields can collide with a different split of the same bytes.
pub fn game_id_from_parts(
    white: &str,
    black: &str,
    date: &str,
    result: &str,
    moves: &[String],
) -> String {
    let mut hasher = Sha256::new();
    for field in [white, black, date, result] {
        let trimmed = field.trim();
        hasher.update((trimmed.len() as u64).to_le_bytes());
        hasher.update(trimmed.as_bytes());
    }
    for san in moves {
        hasher.update((san.len() as u64).to_le_bytes());
        hasher.update(san.as_bytes());
    }
    hex::encode(hasher.finalize())
}
