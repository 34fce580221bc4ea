//! Worker error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum WorkerError {
    #[error("Configuration error: {0}")]
    Config(&'static str),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Invalid position: {0}")]
    InvalidPosition(String),

    #[error("Engine unavailable: {0}")]
    EngineUnavailable(String),

    #[error("Invalid game: {0}")]
    InvalidGame(String),
}

impl WorkerError {
    /// True for failures that require the owning worker to restart its
    /// engine process before serving the next game.
    pub fn needs_engine_restart(&self) -> bool {
        matches!(self, WorkerError::EngineUnavailable(_))
    }
}
