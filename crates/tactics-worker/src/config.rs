//! Worker configuration from environment variables

use std::env;
use std::time::Duration;

use chess_tactics::SeverityPreset;

use crate::error::WorkerError;

#[derive(Clone, Debug)]
pub struct WorkerConfig {
    /// Database connection URL
    pub database_url: String,

    /// Path to the UCI engine binary
    pub engine_path: String,

    /// Search depth per evaluated position
    pub search_depth: u32,

    /// Candidate lines requested per evaluation
    pub multipv: u32,

    /// Worker pool size (one engine process per worker)
    pub workers: usize,

    /// Games fetched per page from the game source
    pub chunk_size: i64,

    /// Opening plies excluded from analysis
    pub opening_plies: usize,

    /// Hard cap on a single engine evaluation
    pub eval_timeout: Duration,

    /// Severity threshold preset, applied uniformly to the whole run
    pub severity_preset: SeverityPreset,
}

impl WorkerConfig {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self, WorkerError> {
        let database_url =
            env::var("DATABASE_URL").map_err(|_| WorkerError::Config("DATABASE_URL not set"))?;

        let engine_path =
            env::var("ENGINE_PATH").unwrap_or_else(|_| "/usr/local/bin/stockfish".to_string());

        let search_depth = env::var("SEARCH_DEPTH")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(12);

        let multipv = env::var("ENGINE_MULTIPV")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(1)
            .max(1);

        // Each worker owns a full engine process; more workers than cores
        // just makes them fight over CPU.
        let workers = env::var("ANALYSIS_WORKERS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(2)
            .clamp(1, num_cpus::get().max(1));

        let chunk_size = env::var("CHUNK_SIZE")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(50)
            .max(1);

        let opening_plies = env::var("OPENING_PLIES")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(10);

        let eval_timeout_secs: u64 = env::var("EVAL_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(30);

        let severity_preset = match env::var("SEVERITY_PRESET") {
            Ok(v) => v
                .parse()
                .map_err(|_| WorkerError::Config("SEVERITY_PRESET must be 'coarse' or 'fine'"))?,
            Err(_) => SeverityPreset::default(),
        };

        Ok(Self {
            database_url,
            engine_path,
            search_depth,
            multipv,
            workers,
            chunk_size,
            opening_plies,
            eval_timeout: Duration::from_secs(eval_timeout_secs),
            severity_preset,
        })
    }
}
