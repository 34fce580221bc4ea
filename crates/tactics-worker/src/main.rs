//! Batch tactical-analysis worker
//!
//! Pages through stored games, drives a pool of UCI engine processes, and
//! writes per-move tactical tags and severity labels. Safe to kill and
//! restart: completed games are skipped via the durable progress markers.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use clap::Parser;
use tracing::{info, warn};

use tactics_worker::config::WorkerConfig;
use tactics_worker::dispatcher::{Dispatcher, RunOptions};
use tactics_worker::source::GameSource;
use tactics_worker::tracker::ProgressTracker;
use tactics_worker::writer::ResultWriter;

#[derive(Parser, Debug)]
#[command(
    name = "tactics-worker",
    about = "Batch tactical analysis over stored games"
)]
struct Args {
    /// Provenance bucket to draw games from (e.g. "elite", "personal")
    #[arg(long)]
    source: Option<String>,

    /// Maximum number of games to analyze this run (default: unlimited)
    #[arg(long)]
    max_games: Option<u64>,

    /// Pagination offset to start from
    #[arg(long, default_value_t = 0)]
    offset: i64,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    // Load .env file for local dev
    let _ = dotenvy::dotenv();

    let args = Args::parse();
    let config = WorkerConfig::load()?;
    info!(
        engine_path = %config.engine_path,
        depth = config.search_depth,
        workers = config.workers,
        "Worker config loaded"
    );

    // Database pool scaled to worker count, with headroom for overlapping saves
    let pool_size = (config.workers + 2) as u32;
    let pool = sqlx::postgres::PgPoolOptions::new()
        .min_connections(pool_size)
        .max_connections(pool_size)
        .acquire_timeout(std::time::Duration::from_secs(10))
        .idle_timeout(std::time::Duration::from_secs(300))
        .connect(&config.database_url)
        .await?;
    info!(pool_size, "Database connection pool established");

    // Cancellation: stop fetching new pages, let in-flight games drain
    let shutdown = Arc::new(AtomicBool::new(false));
    spawn_shutdown_watcher(shutdown.clone());

    let dispatcher = Dispatcher::new(
        config,
        GameSource::new(pool.clone()),
        ProgressTracker::new(pool.clone()),
        ResultWriter::new(pool),
    );

    let opts = RunOptions {
        source_filter: args.source,
        max_games: args.max_games.unwrap_or(u64::MAX),
        offset: args.offset,
    };

    let summary = dispatcher.run(opts, shutdown).await?;

    info!(
        attempted = summary.attempted,
        succeeded = summary.succeeded,
        failed = summary.failed,
        no_findings = summary.no_findings,
        matched_moves = summary.matched_moves,
        unmatched_moves = summary.unmatched_moves,
        "Run complete"
    );

    // Machine-readable summary on stdout
    println!("{}", serde_json::to_string_pretty(&summary)?);

    Ok(())
}

/// Flip the shutdown flag on ctrl-c or SIGTERM (spot interruptions).
fn spawn_shutdown_watcher(shutdown: Arc<AtomicBool>) {
    tokio::spawn(async move {
        #[cfg(unix)]
        {
            use tokio::signal::unix::{signal, SignalKind};
            match signal(SignalKind::terminate()) {
                Ok(mut sigterm) => {
                    tokio::select! {
                        _ = tokio::signal::ctrl_c() => {}
                        _ = sigterm.recv() => {}
                    }
                }
                Err(e) => {
                    warn!(error = %e, "Failed to install SIGTERM handler");
                    let _ = tokio::signal::ctrl_c().await;
                }
            }
        }
        #[cfg(not(unix))]
        {
            let _ = tokio::signal::ctrl_c().await;
        }
        info!("Shutdown signal received, draining in-flight work");
        shutdown.store(true, Ordering::Relaxed);
    });
}
