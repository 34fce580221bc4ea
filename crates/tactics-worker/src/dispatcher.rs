//! Analysis dispatcher
//!
//! Pages through unanalyzed games, fans work out to a bounded pool of
//! workers (one engine process per worker), collects results in completion
//! order, and writes progress markers only after a successful commit.
//!
//! Per-game lifecycle: Pending (no marker) -> Submitted (handed to a
//! worker) -> Succeeded (updates committed, marker written) or Failed
//! (left Pending; eligible for retry on the next run, never within this
//! one).

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::config::WorkerConfig;
use crate::engine::UciEngine;
use crate::error::WorkerError;
use crate::source::{GameSource, RawGame};
use crate::tracker::ProgressTracker;
use crate::worker::analyze_game;
use crate::writer::{MoveUpdate, ResultWriter};

/// Run-shaped options from the CLI.
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Provenance bucket to draw from, if any
    pub source_filter: Option<String>,
    /// Maximum number of games to attempt this run
    pub max_games: u64,
    /// Pagination offset to start from
    pub offset: i64,
}

/// Counters reported at the end of a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub attempted: u64,
    pub succeeded: u64,
    pub failed: u64,
    /// Games marked analyzed with zero produced updates
    pub no_findings: u64,
    pub matched_moves: u64,
    pub unmatched_moves: u64,
}

impl RunSummary {
    fn record_failure(&mut self) {
        self.attempted += 1;
        self.failed += 1;
    }

    fn record_success(&mut self, matched: u64, unmatched: u64) {
        self.attempted += 1;
        self.succeeded += 1;
        self.matched_moves += matched;
        self.unmatched_moves += unmatched;
    }

    fn record_empty(&mut self) {
        self.attempted += 1;
        self.succeeded += 1;
        self.no_findings += 1;
    }
}

/// One finished game, reported from a worker to the dispatcher.
struct GameOutcome {
    game_id: String,
    result: Result<Vec<MoveUpdate>, WorkerError>,
}

pub struct Dispatcher {
    config: WorkerConfig,
    source: GameSource,
    tracker: ProgressTracker,
    writer: ResultWriter,
}

impl Dispatcher {
    pub fn new(
        config: WorkerConfig,
        source: GameSource,
        tracker: ProgressTracker,
        writer: ResultWriter,
    ) -> Self {
        Self {
            config,
            source,
            tracker,
            writer,
        }
    }

    /// Run until the source is exhausted, `max_games` is reached, or
    /// cancellation is requested. Cancellation stops new pages but drains
    /// and commits everything already in flight.
    pub async fn run(
        &self,
        opts: RunOptions,
        shutdown: Arc<AtomicBool>,
    ) -> Result<RunSummary, WorkerError> {
        // Snapshot once per run; staleness is fine because marking is
        // idempotent
        let analyzed = self.tracker.analyzed_set().await?;
        info!(analyzed = analyzed.len(), "Progress snapshot loaded");

        // Engine pool: one process per worker. Degrade if some fail to
        // start; none at all is a setup failure.
        let mut engines = Vec::new();
        for worker_id in 0..self.config.workers {
            match UciEngine::spawn(&self.config.engine_path, self.config.eval_timeout).await {
                Ok(engine) => {
                    info!(worker_id, "Engine ready");
                    engines.push(engine);
                }
                Err(e) => warn!(worker_id, error = %e, "Failed to start engine"),
            }
        }
        if engines.is_empty() {
            return Err(WorkerError::EngineUnavailable(
                "could not start any engine process".to_string(),
            ));
        }

        // Bounded job queue: submission blocks when all workers are busy
        let (job_tx, job_rx) = mpsc::channel::<RawGame>(engines.len());
        let job_rx = Arc::new(Mutex::new(job_rx));
        let (done_tx, mut done_rx) = mpsc::channel::<GameOutcome>(engines.len() * 2);

        let mut handles: Vec<JoinHandle<()>> = Vec::new();
        for (worker_id, engine) in engines.into_iter().enumerate() {
            handles.push(tokio::spawn(worker_loop(
                worker_id,
                engine,
                self.config.clone(),
                job_rx.clone(),
                done_tx.clone(),
            )));
        }
        drop(done_tx); // only worker clones remain

        let mut summary = RunSummary::default();
        let mut offset = opts.offset;
        let mut processed: u64 = 0;

        while processed < opts.max_games {
            if shutdown.load(Ordering::Relaxed) {
                info!("Cancellation requested, no further pages");
                break;
            }

            let remaining = opts.max_games - processed;
            let limit = self.config.chunk_size.min(remaining.min(i64::MAX as u64) as i64);
            let page = self
                .source
                .fetch_page(offset, limit, opts.source_filter.as_deref())
                .await?;
            if page.is_empty() {
                info!(offset, "Game source exhausted");
                break;
            }
            let fetched = page.len();

            let todo = filter_unanalyzed(page, &analyzed);
            let submitted = todo.len();
            info!(offset, fetched, submitted, "Page fetched");

            for game in todo {
                if job_tx.send(game).await.is_err() {
                    return Err(WorkerError::EngineUnavailable(
                        "all analysis workers exited".to_string(),
                    ));
                }
            }

            // Collect in completion order (not submission order). In-flight
            // games always drain, even when cancellation arrives mid-page.
            let mut received = 0usize;
            while received < submitted {
                match done_rx.recv().await {
                    Some(outcome) => {
                        received += 1;
                        self.handle_outcome(outcome, &mut summary).await;
                    }
                    None => {
                        return Err(WorkerError::EngineUnavailable(
                            "all analysis workers exited".to_string(),
                        ));
                    }
                }
            }

            offset += fetched as i64;
            processed += submitted as u64;
        }

        drop(job_tx);
        for handle in handles {
            let _ = handle.await;
        }

        Ok(summary)
    }

    async fn handle_outcome(&self, outcome: GameOutcome, summary: &mut RunSummary) {
        match outcome.result {
            Err(e) => {
                error!(game_id = %outcome.game_id, error = %e, "Analysis failed, game stays pending");
                summary.record_failure();
            }
            Ok(updates) if updates.is_empty() => {
                // Zero findings is a completed analysis, not a failure
                match self.tracker.mark_analyzed(&outcome.game_id).await {
                    Ok(()) => {
                        info!(game_id = %outcome.game_id, "No analyzable moves, marked analyzed");
                        summary.record_empty();
                    }
                    Err(e) => {
                        error!(game_id = %outcome.game_id, error = %e, "Failed to mark analyzed");
                        summary.record_failure();
                    }
                }
            }
            Ok(updates) => match self.writer.apply_updates(&outcome.game_id, &updates).await {
                Ok(write) => {
                    if write.unmatched > 0 {
                        warn!(
                            game_id = %outcome.game_id,
                            unmatched = write.unmatched,
                            "Updates without matching move records"
                        );
                    }
                    match self.tracker.mark_analyzed(&outcome.game_id).await {
                        Ok(()) => {
                            info!(
                                game_id = %outcome.game_id,
                                updates = updates.len(),
                                "Analysis committed"
                            );
                            summary.record_success(write.matched, write.unmatched);
                        }
                        Err(e) => {
                            error!(
                                game_id = %outcome.game_id,
                                error = %e,
                                "Marker write failed, game will be retried next run"
                            );
                            summary.record_failure();
                        }
                    }
                }
                Err(e) => {
                    error!(game_id = %outcome.game_id, error = %e, "Result write failed, game stays pending");
                    summary.record_failure();
                }
            },
        }
    }
}

/// Drop games already present in the analyzed snapshot.
fn filter_unanalyzed(page: Vec<RawGame>, analyzed: &HashSet<String>) -> Vec<RawGame> {
    page.into_iter()
        .filter(|g| !analyzed.contains(&g.game_id))
        .collect()
}

/// Worker task: owns one engine for its lifetime, pulls jobs until the
/// channel closes, and replaces the engine after an engine-class failure
/// (one restart attempt per failure, no retry loop).
async fn worker_loop(
    worker_id: usize,
    mut engine: UciEngine,
    config: WorkerConfig,
    jobs: Arc<Mutex<mpsc::Receiver<RawGame>>>,
    done: mpsc::Sender<GameOutcome>,
) {
    loop {
        let job = { jobs.lock().await.recv().await };
        let Some(game) = job else { break };

        let result = analyze_game(&mut engine, &config, &game).await;
        let restart = result
            .as_ref()
            .err()
            .map(|e| e.needs_engine_restart())
            .unwrap_or(false);

        if done
            .send(GameOutcome {
                game_id: game.game_id,
                result,
            })
            .await
            .is_err()
        {
            break; // dispatcher gone
        }

        if restart {
            warn!(worker_id, "Restarting engine after failure");
            match UciEngine::spawn(&config.engine_path, config.eval_timeout).await {
                Ok(fresh) => engine = fresh,
                Err(e) => {
                    error!(worker_id, error = %e, "Engine restart failed, worker exiting");
                    return; // replaced instance is killed on drop
                }
            }
        }
    }

    engine.quit().await;
}
