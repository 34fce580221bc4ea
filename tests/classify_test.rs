//! Integration tests: run the tactical classifier over positions built
//! from FEN + UCI fixtures and check the produced tags and severities.

use std::str::FromStr;

use chess::{Board, ChessMove, File, Piece, Rank, Square};
use chess_tactics::{classify_pattern, classify_severity, Severity, SeverityPreset, TacticalTag};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Parse a UCI move string ("e2e4", "a7a8q") into a ChessMove.
fn uci(mv: &str) -> ChessMove {
    let bytes = mv.as_bytes();
    let from = Square::make_square(
        Rank::from_index((bytes[1] - b'1') as usize),
        File::from_index((bytes[0] - b'a') as usize),
    );
    let to = Square::make_square(
        Rank::from_index((bytes[3] - b'1') as usize),
        File::from_index((bytes[2] - b'a') as usize),
    );
    let promotion = if mv.len() > 4 {
        match bytes[4] {
            b'q' => Some(Piece::Queen),
            b'r' => Some(Piece::Rook),
            b'b' => Some(Piece::Bishop),
            b'n' => Some(Piece::Knight),
            _ => None,
        }
    } else {
        None
    };
    ChessMove::new(from, to, promotion)
}

fn board(fen: &str) -> Board {
    Board::from_str(fen).expect("invalid FEN")
}

// ---------------------------------------------------------------------------
// Pattern tags
// ---------------------------------------------------------------------------

#[test]
fn knight_fork_on_queen_and_rook() {
    // Nc3-d5 attacks the queen on e7 and the rook on f6; no check, no pin
    let b = board("7k/4q3/5r2/8/8/2N5/8/6K1 w - - 0 1");
    assert_eq!(
        classify_pattern(&b, uci("c3d5"), 0),
        Some(TacticalTag::Fork)
    );
}

#[test]
fn check_takes_priority_over_fork() {
    // The same knight jump also hits the king on b6, so it is a check first
    let b = board("8/4q3/1k3r2/8/8/2N5/8/6K1 w - - 0 1");
    assert_eq!(
        classify_pattern(&b, uci("c3d5"), 0),
        Some(TacticalTag::Check)
    );
}

#[test]
fn back_rank_mate() {
    let b = board("6k1/5ppp/8/8/8/8/8/R5K1 w - - 0 1");
    assert_eq!(
        classify_pattern(&b, uci("a1a8"), 0),
        Some(TacticalTag::Mate)
    );
}

#[test]
fn rook_lift_pins_a_queen() {
    // Re1 skewers e-file: the queen on e5 is pinned to the king on e8
    let b = board("4k3/8/8/4q3/8/8/8/R5K1 w - - 0 1");
    assert_eq!(
        classify_pattern(&b, uci("a1e1"), 0),
        Some(TacticalTag::Pin)
    );
}

#[test]
fn bishop_retreat_uncovers_rook_attack() {
    let b = board("3q3k/8/8/8/8/3B4/8/3R2K1 w - - 0 1");
    assert_eq!(
        classify_pattern(&b, uci("d3f5"), 0),
        Some(TacticalTag::DiscoveredAttack)
    );
}

#[test]
fn quiet_move_with_big_loss_is_blunder() {
    let b = Board::default();
    assert_eq!(
        classify_pattern(&b, uci("e2e4"), -320),
        Some(TacticalTag::Blunder)
    );
}

#[test]
fn quiet_move_with_big_gain_is_opportunity() {
    let b = Board::default();
    assert_eq!(
        classify_pattern(&b, uci("e2e4"), 180),
        Some(TacticalTag::TacticalOpportunity)
    );
}

#[test]
fn quiet_move_with_small_swing_is_untagged() {
    let b = Board::default();
    assert_eq!(classify_pattern(&b, uci("e2e4"), -40), None);
    assert_eq!(classify_pattern(&b, uci("e2e4"), 40), None);
}

// ---------------------------------------------------------------------------
// Severity presets
// ---------------------------------------------------------------------------

#[test]
fn coarse_severity_boundaries() {
    let cases = [
        (-200, Severity::Blunder),
        (-199, Severity::Mistake),
        (-80, Severity::Mistake),
        (-79, Severity::Inaccuracy),
        (-20, Severity::Inaccuracy),
        (-19, Severity::Acceptable),
        (20, Severity::Excellent),
    ];
    for (diff, expected) in cases {
        assert_eq!(
            classify_severity(diff, SeverityPreset::Coarse),
            expected,
            "coarse preset at {diff}"
        );
    }
}

#[test]
fn presets_disagree_on_small_losses() {
    // A 30cp loss is an inaccuracy on the coarse ladder but within the
    // fine ladder's tolerance
    assert_eq!(
        classify_severity(-30, SeverityPreset::Coarse),
        Severity::Inaccuracy
    );
    assert_eq!(classify_severity(-30, SeverityPreset::Fine), Severity::Good);
}

// ---------------------------------------------------------------------------
// Full-game flow: PGN parsing feeding the classifier
// ---------------------------------------------------------------------------

const FOOLS_MATE: &str = r#"[Event "Casual"]
[White "anon"]
[Black "anon"]
[Result "0-1"]
[Date "2024.01.15"]

1. f3 e5 2. g4 Qh4# 0-1"#;

#[test]
fn pgn_replay_classifies_final_move_as_mate() {
    let game = chess_core::pgn::parse_pgn(FOOLS_MATE).expect("PGN should parse");
    assert_eq!(game.moves, vec!["f3", "e5", "g4", "Qh4#"]);

    // Replay the well-known line in UCI and classify the mating move
    let mut b = Board::default();
    for mv in ["f2f3", "e7e5", "g2g4"] {
        b = b.make_move_new(uci(mv));
    }
    assert_eq!(
        classify_pattern(&b, uci("d8h4"), 0),
        Some(TacticalTag::Mate)
    );
}

#[test]
fn game_id_ignores_commentary() {
    let annotated = r#"[Event "Casual"]
[White "anon"]
[Black "anon"]
[Result "0-1"]
[Date "2024.01.15"]

1. f3 {dubious} e5 2. g4 (2. e4 is safer) Qh4# 0-1"#;

    let plain = chess_core::pgn::parse_pgn(FOOLS_MATE).unwrap();
    let with_comments = chess_core::pgn::parse_pgn(annotated).unwrap();
    assert_eq!(
        chess_core::game_id::game_id(&plain),
        chess_core::game_id::game_id(&with_comments)
    );
}

#[test]
fn game_id_differs_for_different_games() {
    let other = FOOLS_MATE.replace("1. f3 e5", "1. e4 e5");
    let a = chess_core::pgn::parse_pgn(FOOLS_MATE).unwrap();
    let b = chess_core::pgn::parse_pgn(&other).unwrap();
    assert_ne!(
        chess_core::game_id::game_id(&a),
        chess_core::game_id::game_id(&b)
    );
}
