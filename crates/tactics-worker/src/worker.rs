//! Per-game analysis
//!
//! A game is processed start-to-finish by one worker using that worker's
//! own engine: each position depends on the board state reached by the
//! previous move, so per-game evaluation is strictly sequential.

use chess::{Board, ChessMove, Color, MoveGen, Piece};

use chess_tactics::{classify_pattern, classify_severity};

use crate::config::WorkerConfig;
use crate::engine::{Score, UciEngine};
use crate::error::WorkerError;
use crate::source::RawGame;
use crate::writer::MoveUpdate;

/// One resolved ply of the recorded game.
struct Ply {
    board_before: Board,
    board_after: Board,
    mv: ChessMove,
    legal_count: usize,
}

/// Analyze one game: parse it, walk the recorded moves, evaluate each
/// analyzed position once, and classify every analyzed ply.
///
/// Any failure (malformed PGN, illegal recorded move, engine trouble)
/// aborts the whole game with no partial output.
pub async fn analyze_game(
    engine: &mut UciEngine,
    config: &WorkerConfig,
    game: &RawGame,
) -> Result<Vec<MoveUpdate>, WorkerError> {
    let parsed = chess_core::pgn::parse_pgn(&game.pgn)
        .ok_or_else(|| WorkerError::InvalidGame("unparseable or empty PGN".to_string()))?;

    // Resolve SAN to legal moves, recording positions around each ply
    let mut board = Board::default();
    let mut plies: Vec<Ply> = Vec::with_capacity(parsed.moves.len());
    for san in &parsed.moves {
        let legal_count = MoveGen::new_legal(&board).len();
        let mv = find_san_move(&board, san)?;
        let board_after = board.make_move_new(mv);
        plies.push(Ply {
            board_before: board,
            board_after,
            mv,
            legal_count,
        });
        board = board_after;
    }

    let mut updates = Vec::with_capacity(plies.len().saturating_sub(config.opening_plies));

    // White-cp eval of the current ply's pre-move position, carried over
    // from the previous ply's post-move eval when available
    let mut prev_eval: Option<i32> = None;

    for (i, ply) in plies.iter().enumerate().skip(config.opening_plies) {
        let mover = ply.board_before.side_to_move();
        let terminal_after = MoveGen::new_legal(&ply.board_after).len() == 0;
        let forced = ply.legal_count == 1;

        let score_diff = if forced || terminal_after {
            // The only legal move costs nothing, and a finished position
            // cannot be searched
            prev_eval = None;
            0
        } else {
            let before_white = match prev_eval {
                Some(cp) => cp,
                None => {
                    let lines = engine
                        .evaluate(
                            &ply.board_before.to_string(),
                            config.search_depth,
                            config.multipv,
                        )
                        .await?;
                    to_white_cp(best_score(&lines), mover == Color::White)
                }
            };

            let after_lines = engine
                .evaluate(
                    &ply.board_after.to_string(),
                    config.search_depth,
                    config.multipv,
                )
                .await?;
            // After the move, the other side is to move
            let after_white = to_white_cp(best_score(&after_lines), mover == Color::Black);
            prev_eval = Some(after_white);

            mover_score_diff(before_white, after_white, mover)
        };

        let tag = classify_pattern(&ply.board_before, ply.mv, score_diff);
        let severity = classify_severity(score_diff, config.severity_preset);

        updates.push(MoveUpdate {
            move_number: (i / 2 + 1) as i32,
            player_color: mover,
            tag,
            score_diff,
            severity,
        });
    }

    Ok(updates)
}

fn best_score(lines: &[crate::engine::Evaluation]) -> Score {
    lines.first().map(|l| l.score).unwrap_or(Score::Unknown)
}

/// Convert an engine score (side-to-move perspective) to white centipawns.
/// Mate distances fold into the cp scale near ±10000 so that a missed or
/// allowed mate reads as a huge swing.
fn to_white_cp(score: Score, white_to_move: bool) -> i32 {
    let stm_cp = match score {
        Score::Mate(m) => {
            if m > 0 {
                10000 - m * 10
            } else {
                -10000 - m * 10
            }
        }
        Score::Cp(c) => c,
        Score::Unknown => 0,
    };
    if white_to_move {
        stm_cp
    } else {
        -stm_cp
    }
}

/// Signed delta from the mover's perspective (negative = lost ground).
fn mover_score_diff(before_white: i32, after_white: i32, mover: Color) -> i32 {
    match mover {
        Color::White => after_white - before_white,
        Color::Black => before_white - after_white,
    }
}

/// Find the legal move matching a SAN string
fn find_san_move(board: &Board, san: &str) -> Result<ChessMove, WorkerError> {
    let clean = san.trim_end_matches(|c: char| c == '+' || c == '#' || c == '!' || c == '?');

    let legal_moves: Vec<ChessMove> = MoveGen::new_legal(board).collect();

    // Castling
    if clean == "O-O" || clean == "0-0" {
        for m in &legal_moves {
            let src = m.get_source();
            let dst = m.get_dest();
            if board.piece_on(src) == Some(Piece::King) {
                let src_file = src.get_file().to_index();
                let dst_file = dst.get_file().to_index();
                if dst_file > src_file && (dst_file - src_file) == 2 {
                    return Ok(*m);
                }
            }
        }
        return Err(WorkerError::InvalidGame(format!(
            "no kingside castling move for: {san}"
        )));
    }
    if clean == "O-O-O" || clean == "0-0-0" {
        for m in &legal_moves {
            let src = m.get_source();
            let dst = m.get_dest();
            if board.piece_on(src) == Some(Piece::King) {
                let src_file = src.get_file().to_index();
                let dst_file = dst.get_file().to_index();
                if src_file > dst_file && (src_file - dst_file) == 2 {
                    return Ok(*m);
                }
            }
        }
        return Err(WorkerError::InvalidGame(format!(
            "no queenside castling move for: {san}"
        )));
    }

    // Parse piece, disambiguation, capture, destination, promotion
    let bytes = clean.as_bytes();
    if bytes.is_empty() {
        return Err(WorkerError::InvalidGame("empty SAN move".to_string()));
    }

    let (piece, rest) = if bytes[0].is_ascii_uppercase() {
        let p = match bytes[0] {
            b'K' => Piece::King,
            b'Q' => Piece::Queen,
            b'R' => Piece::Rook,
            b'B' => Piece::Bishop,
            b'N' => Piece::Knight,
            _ => {
                return Err(WorkerError::InvalidGame(format!(
                    "unknown piece letter in: {san}"
                )))
            }
        };
        (p, &clean[1..])
    } else {
        (Piece::Pawn, clean)
    };

    // Extract promotion
    let (rest, promotion) = if let Some(eq_pos) = rest.find('=') {
        let promo_piece = match rest.as_bytes().get(eq_pos + 1) {
            Some(b'Q') => Some(Piece::Queen),
            Some(b'R') => Some(Piece::Rook),
            Some(b'B') => Some(Piece::Bishop),
            Some(b'N') => Some(Piece::Knight),
            _ => None,
        };
        (&rest[..eq_pos], promo_piece)
    } else {
        (rest, None)
    };

    // Remove capture marker
    let rest = rest.replace('x', "");

    // The last two characters are the destination square
    let rest_bytes = rest.as_bytes();
    if rest_bytes.len() < 2 {
        return Err(WorkerError::InvalidGame(format!("SAN too short: {san}")));
    }

    let dest_file = rest_bytes[rest_bytes.len() - 2];
    let dest_rank = rest_bytes[rest_bytes.len() - 1];

    if !(b'a'..=b'h').contains(&dest_file) || !(b'1'..=b'8').contains(&dest_rank) {
        return Err(WorkerError::InvalidGame(format!(
            "invalid destination in SAN: {san}"
        )));
    }

    let dest = chess::Square::make_square(
        chess::Rank::from_index((dest_rank - b'1') as usize),
        chess::File::from_index((dest_file - b'a') as usize),
    );

    // Disambiguation
    let disambig = &rest[..rest.len() - 2];

    let mut candidates: Vec<ChessMove> = legal_moves
        .into_iter()
        .filter(|m| {
            m.get_dest() == dest
                && board.piece_on(m.get_source()) == Some(piece)
                && m.get_promotion() == promotion
        })
        .collect();

    if candidates.len() == 1 {
        return Ok(candidates[0]);
    }

    if !disambig.is_empty() {
        let disambig_bytes = disambig.as_bytes();
        candidates.retain(|m| {
            let src = m.get_source();
            for &b in disambig_bytes {
                if (b'a'..=b'h').contains(&b) {
                    if src.get_file().to_index() != (b - b'a') as usize {
                        return false;
                    }
                } else if (b'1'..=b'8').contains(&b)
                    && src.get_rank().to_index() != (b - b'1') as usize
                {
                    return false;
                }
            }
            true
        });
    }

    match candidates.len() {
        1 => Ok(candidates[0]),
        0 => Err(WorkerError::InvalidGame(format!(
            "no legal move matches SAN: {san}"
        ))),
        _ => Err(WorkerError::InvalidGame(format!(
            "ambiguous SAN: {san} ({} candidates)",
            candidates.len()
        ))),
    }
}
