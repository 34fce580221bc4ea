//! UCI engine wrapper (async I/O)
//!
//! One `UciEngine` owns one long-lived engine subprocess and is owned by
//! exactly one worker at a time: the protocol is a stateful, sequential
//! request/response exchange and cannot be shared between callers.

use std::str::FromStr;
use std::time::Duration;

use chess::Board;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tokio::time::timeout;
use tracing::debug;

use crate::error::WorkerError;

/// Engine score for one line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Score {
    /// Centipawns from the side to move's perspective
    Cp(i32),
    /// Forced mate in N moves (negative = side to move gets mated)
    Mate(i32),
    /// The engine produced no score for this line
    Unknown,
}

/// One evaluated line: score plus principal variation in UCI notation.
#[derive(Debug, Clone)]
pub struct Evaluation {
    pub score: Score,
    pub pv: Vec<String>,
}

/// A running UCI engine process.
pub struct UciEngine {
    process: Child,
    stdin: ChildStdin,
    stdout: BufReader<ChildStdout>,
    call_timeout: Duration,
}

impl UciEngine {
    /// Spawn a new engine process and complete the UCI handshake.
    pub async fn spawn(path: &str, call_timeout: Duration) -> Result<Self, WorkerError> {
        let mut process = Command::new(path)
            .stdin(std::process::Stdio::piped())
            .stdout(std::process::Stdio::piped())
            .stderr(std::process::Stdio::null())
            .spawn()
            .map_err(|e| {
                WorkerError::EngineUnavailable(format!("failed to spawn engine at {path}: {e}"))
            })?;

        let stdin = process.stdin.take().ok_or_else(|| {
            WorkerError::EngineUnavailable("engine process has no stdin".to_string())
        })?;
        let stdout = process.stdout.take().ok_or_else(|| {
            WorkerError::EngineUnavailable("engine process has no stdout".to_string())
        })?;

        let mut engine = Self {
            process,
            stdin,
            stdout: BufReader::new(stdout),
            call_timeout,
        };

        // Initialize UCI
        engine.send("uci").await?;
        engine.wait_for("uciok").await?;

        // Configure for analysis
        engine.send("setoption name Threads value 1").await?;
        engine.send("setoption name Hash value 256").await?;
        engine.send("setoption name UCI_AnalyseMode value true").await?;
        engine.send("isready").await?;
        engine.wait_for("readyok").await?;

        Ok(engine)
    }

    /// Send a command to the engine
    async fn send(&mut self, cmd: &str) -> Result<(), WorkerError> {
        debug!(cmd, "engine <");
        self.stdin
            .write_all(format!("{cmd}\n").as_bytes())
            .await
            .map_err(|e| WorkerError::EngineUnavailable(format!("failed to write to engine: {e}")))?;
        self.stdin
            .flush()
            .await
            .map_err(|e| WorkerError::EngineUnavailable(format!("failed to flush stdin: {e}")))?;
        Ok(())
    }

    /// Read one line, failing on EOF (a crashed engine closes its stdout)
    async fn read_line(&mut self) -> Result<String, WorkerError> {
        let mut line = String::new();
        let n = self
            .stdout
            .read_line(&mut line)
            .await
            .map_err(|e| WorkerError::EngineUnavailable(format!("failed to read from engine: {e}")))?;
        if n == 0 {
            return Err(WorkerError::EngineUnavailable(
                "engine process closed its output".to_string(),
            ));
        }
        Ok(line.trim().to_string())
    }

    /// Wait for a specific response line, bounded by the call timeout
    async fn wait_for(&mut self, expected: &str) -> Result<(), WorkerError> {
        let deadline = self.call_timeout;
        let wait = async {
            loop {
                let line = self.read_line().await?;
                debug!(line = %line, "engine >");
                if line == expected {
                    return Ok(());
                }
            }
        };
        match timeout(deadline, wait).await {
            Ok(result) => result,
            Err(_) => Err(WorkerError::EngineUnavailable(format!(
                "timed out waiting for '{expected}'"
            ))),
        }
    }

    /// Evaluate a position, returning one line per requested candidate
    /// (`lines[0]` is the engine's best line).
    ///
    /// The FEN is validated before anything is sent: an unparseable
    /// position fails with `InvalidPosition` and never reaches the engine.
    /// The whole exchange is bounded by the call timeout; an unresponsive
    /// or crashed process surfaces as `EngineUnavailable` and the caller
    /// must restart the engine before the next evaluation.
    pub async fn evaluate(
        &mut self,
        fen: &str,
        depth: u32,
        multipv: u32,
    ) -> Result<Vec<Evaluation>, WorkerError> {
        Board::from_str(fen)
            .map_err(|e| WorkerError::InvalidPosition(format!("bad FEN '{fen}': {e}")))?;

        let multipv = multipv.max(1);
        if multipv > 1 {
            self.send(&format!("setoption name MultiPV value {multipv}"))
                .await?;
        }
        self.send(&format!("position fen {fen}")).await?;
        self.send(&format!("go depth {depth}")).await?;

        let deadline = self.call_timeout;
        let lines = match timeout(deadline, self.collect_lines(multipv)).await {
            Ok(result) => result?,
            Err(_) => {
                return Err(WorkerError::EngineUnavailable(format!(
                    "evaluation timed out after {deadline:?}"
                )))
            }
        };

        if multipv > 1 {
            self.send("setoption name MultiPV value 1").await?;
        }

        Ok(lines)
    }

    /// Read info lines until bestmove, keeping the last score/pv per line index
    async fn collect_lines(&mut self, multipv: u32) -> Result<Vec<Evaluation>, WorkerError> {
        let mut lines: Vec<Evaluation> = vec![
            Evaluation {
                score: Score::Unknown,
                pv: vec![],
            };
            multipv as usize
        ];

        loop {
            let line = self.read_line().await?;

            if line.starts_with("info") && line.contains(" pv ") {
                let idx = parse_multipv_index(&line).unwrap_or(1).saturating_sub(1) as usize;
                if idx < lines.len() {
                    let entry = &mut lines[idx];
                    if let Some(mate) = parse_mate(&line) {
                        entry.score = Score::Mate(mate);
                    } else if let Some(cp) = parse_cp(&line) {
                        entry.score = Score::Cp(cp);
                    }
                    entry.pv = parse_pv(&line);
                }
            } else if line.starts_with("bestmove") {
                break;
            }
        }

        Ok(lines)
    }

    /// Send quit and wait for the process to exit
    pub async fn quit(&mut self) {
        let _ = self.send("quit").await;
        let _ = self.process.wait().await;
    }
}

impl Drop for UciEngine {
    fn drop(&mut self) {
        // Best-effort synchronous kill in drop
        let _ = self.process.start_kill();
    }
}

/// Parse centipawn score from an info line
fn parse_cp(line: &str) -> Option<i32> {
    let parts: Vec<&str> = line.split_whitespace().collect();
    for (i, part) in parts.iter().enumerate() {
        if *part == "cp" && i + 1 < parts.len() {
            return parts[i + 1].parse().ok();
        }
    }
    None
}

/// Parse mate score from an info line
fn parse_mate(line: &str) -> Option<i32> {
    let parts: Vec<&str> = line.split_whitespace().collect();
    for (i, part) in parts.iter().enumerate() {
        if *part == "mate" && i + 1 < parts.len() {
            return parts[i + 1].parse().ok();
        }
    }
    None
}

/// Parse multipv index from an info line (1-based)
fn parse_multipv_index(line: &str) -> Option<u32> {
    let parts: Vec<&str> = line.split_whitespace().collect();
    for (i, part) in parts.iter().enumerate() {
        if *part == "multipv" && i + 1 < parts.len() {
            return parts[i + 1].parse().ok();
        }
    }
    None
}

/// Parse PV moves from an info line
fn parse_pv(line: &str) -> Vec<String> {
    let parts: Vec<&str> = line.split_whitespace().collect();
    let mut in_pv = false;
    let mut moves = Vec::new();

    for part in parts {
        if part == "pv" {
            in_pv = true;
            continue;
        }
        if in_pv {
            // PV ends at the next keyword or end of line
            if part.starts_with("bmc") || part == "string" {
                break;
            }
            moves.push(part.to_string());
        }
    }

    moves
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_cp() {
        let line = "info depth 20 seldepth 25 multipv 1 score cp 35 nodes 100000 pv e2e4";
        assert_eq!(parse_cp(line), Some(35));
    }

    #[test]
    fn test_parse_negative_cp() {
        let line = "info depth 18 score cp -112 nodes 500 pv d7d5";
        assert_eq!(parse_cp(line), Some(-112));
    }

    #[test]
    fn test_parse_mate() {
        let line = "info depth 20 score mate 3 nodes 100000 pv e2e4";
        assert_eq!(parse_mate(line), Some(3));
        assert_eq!(parse_cp(line), None);
    }

    #[test]
    fn test_parse_multipv_index() {
        let line = "info depth 20 multipv 2 score cp -10 pv e7e5";
        assert_eq!(parse_multipv_index(line), Some(2));
    }

    #[test]
    fn test_parse_pv() {
        let line = "info depth 20 score cp 35 pv e2e4 e7e5 g1f3";
        let pv = parse_pv(line);
        assert_eq!(pv, vec!["e2e4", "e7e5", "g1f3"]);
    }
}
