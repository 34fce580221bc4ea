//! Pattern classification for a single move.
//!
//! Terminal and check conditions are tested first, then geometric patterns
//! on the position after the move, then the score-based fallback. Structural
//! patterns always win over the fallback.

use chess::{BitBoard, Board, ChessMove, MoveGen, Piece, EMPTY};

use crate::board_utils::attackers;
use crate::tags::TacticalTag;

/// Centipawn swing that turns an untagged move into a
/// blunder / tactical opportunity (1.5 pawns).
pub const TACTIC_SWING_CP: i32 = 150;

/// Classify the tactical pattern of `mv` played from `board_before`.
///
/// `score_diff` is the signed centipawn delta from the mover's perspective
/// (negative = the mover lost ground). The caller's board is never mutated;
/// the move is applied to a copy.
pub fn classify_pattern(
    board_before: &Board,
    mv: ChessMove,
    score_diff: i32,
) -> Option<TacticalTag> {
    let mover = board_before.side_to_move();
    let opponent = !mover;
    let board_after = board_before.make_move_new(mv);

    // Terminal and check conditions first
    let gives_check = board_after.checkers().popcnt() > 0;
    if gives_check && MoveGen::new_legal(&board_after).len() == 0 {
        return Some(TacticalTag::Mate);
    }
    if gives_check {
        return Some(TacticalTag::Check);
    }

    // Knight fork: the moved knight attacks two or more of the
    // opponent's heavy pieces
    if board_before.piece_on(mv.get_source()) == Some(Piece::Knight) {
        let heavy = (*board_after.pieces(Piece::Queen) | *board_after.pieces(Piece::Rook))
            & *board_after.color_combined(opponent);
        let forked = chess::get_knight_moves(mv.get_dest()) & heavy;
        if forked.popcnt() >= 2 {
            return Some(TacticalTag::Fork);
        }
    }

    // Pin: any opposing piece pinned to its king after the move.
    // After the move the side to move is the opponent, so the board's pin
    // mask is computed against the opponent's king; intersecting with the
    // opponent's pieces leaves exactly their pinned men.
    let opponent_pinned = *board_after.pinned() & *board_after.color_combined(opponent);
    if opponent_pinned != EMPTY {
        return Some(TacticalTag::Pin);
    }

    // Discovered attack: an opposing piece newly attacked along a ray that
    // the moved piece's source square was blocking
    if has_discovered_attack(board_before, &board_after, mv) {
        return Some(TacticalTag::DiscoveredAttack);
    }

    // Score-based fallback
    if score_diff <= -TACTIC_SWING_CP {
        return Some(TacticalTag::Blunder);
    }
    if score_diff >= TACTIC_SWING_CP {
        return Some(TacticalTag::TacticalOpportunity);
    }

    None
}

/// True when some opposing piece is attacked after the move, was not
/// attacked before it, and the attack ray runs through the vacated source
/// square (i.e. the moved piece uncovered it rather than delivering it).
fn has_discovered_attack(board_before: &Board, board_after: &Board, mv: ChessMove) -> bool {
    let mover = board_before.side_to_move();
    let opponent = !mover;
    let source_bb = BitBoard::from_square(mv.get_source());

    for target in *board_after.color_combined(opponent) {
        if attackers(board_before, mover, target) != EMPTY {
            continue; // already attacked before the move
        }
        let new_attackers = attackers(board_after, mover, target);
        for attacker in new_attackers {
            if attacker == mv.get_dest() {
                continue; // direct attack by the moved piece
            }
            if chess::between(attacker, target) & source_bb != EMPTY {
                return true;
            }
        }
    }

    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    /// Parse a UCI move string into a ChessMove.
    fn uci(mv: &str) -> ChessMove {
        use chess::{File, Rank, Square};
        let bytes = mv.as_bytes();
        let from = Square::make_square(
            Rank::from_index((bytes[1] - b'1') as usize),
            File::from_index((bytes[0] - b'a') as usize),
        );
        let to = Square::make_square(
            Rank::from_index((bytes[3] - b'1') as usize),
            File::from_index((bytes[2] - b'a') as usize),
        );
        ChessMove::new(from, to, None)
    }

    #[test]
    fn test_mate_detected() {
        // Fool's mate: 1. f3 e5 2. g4 Qh4#
        let board =
            Board::from_str("rnbqkbnr/pppp1ppp/8/4p3/6P1/5P2/PPPPP2P/RNBQKBNR b KQkq g3 0 2")
                .unwrap();
        assert_eq!(
            classify_pattern(&board, uci("d8h4"), 0),
            Some(TacticalTag::Mate)
        );
    }

    #[test]
    fn test_check_detected() {
        // Qe7+ is check but the king can capture the undefended queen
        let board = Board::from_str("4k3/8/8/8/8/8/8/4QK2 w - - 0 1").unwrap();
        assert_eq!(
            classify_pattern(&board, uci("e1e7"), 0),
            Some(TacticalTag::Check)
        );
    }

    #[test]
    fn test_knight_fork_detected() {
        // Nc2-e3 attacks the queen on d5 and the rook on f5
        let board = Board::from_str("7k/8/8/3q1r2/8/8/2N5/6K1 w - - 0 1").unwrap();
        assert_eq!(
            classify_pattern(&board, uci("c2e3"), 0),
            Some(TacticalTag::Fork)
        );
    }

    #[test]
    fn test_knight_single_attack_is_not_fork() {
        // Only the queen is attacked from e3
        let board = Board::from_str("7k/8/8/3q4/8/8/2N5/6K1 w - - 0 1").unwrap();
        assert_eq!(classify_pattern(&board, uci("c2e3"), 0), None);
    }

    #[test]
    fn test_pin_detected() {
        // Ra1-e1 pins the knight on e5 against the king on e8
        let board = Board::from_str("4k3/8/8/4n3/8/8/8/R5K1 w - - 0 1").unwrap();
        assert_eq!(
            classify_pattern(&board, uci("a1e1"), 0),
            Some(TacticalTag::Pin)
        );
    }

    #[test]
    fn test_discovered_attack_detected() {
        // Bd3-f5 uncovers the d1 rook's attack on the d8 queen
        let board = Board::from_str("3q3k/8/8/8/8/3B4/8/3R2K1 w - - 0 1").unwrap();
        assert_eq!(
            classify_pattern(&board, uci("d3f5"), 0),
            Some(TacticalTag::DiscoveredAttack)
        );
    }

    #[test]
    fn test_score_fallback() {
        let board = Board::default();
        assert_eq!(
            classify_pattern(&board, uci("e2e4"), -150),
            Some(TacticalTag::Blunder)
        );
        assert_eq!(
            classify_pattern(&board, uci("e2e4"), 150),
            Some(TacticalTag::TacticalOpportunity)
        );
        assert_eq!(classify_pattern(&board, uci("e2e4"), -149), None);
        assert_eq!(classify_pattern(&board, uci("e2e4"), 149), None);
    }

    #[test]
    fn test_structural_beats_score_fallback() {
        // A mating move with a huge negative delta is still a mate
        let board =
            Board::from_str("rnbqkbnr/pppp1ppp/8/4p3/6P1/5P2/PPPPP2P/RNBQKBNR b KQkq g3 0 2")
                .unwrap();
        assert_eq!(
            classify_pattern(&board, uci("d8h4"), -500),
            Some(TacticalTag::Mate)
        );
    }

    #[test]
    fn test_caller_board_not_mutated() {
        let board = Board::from_str("7k/8/8/3q1r2/8/8/2N5/6K1 w - - 0 1").unwrap();
        let fen_before = board.to_string();
        let _ = classify_pattern(&board, uci("c2e3"), 0);
        assert_eq!(board.to_string(), fen_before);
    }

    #[test]
    fn test_deterministic() {
        let board = Board::from_str("3q3k/8/8/8/8/3B4/8/3R2K1 w - - 0 1").unwrap();
        let first = classify_pattern(&board, uci("d3f5"), 42);
        for _ in 0..10 {
            assert_eq!(classify_pattern(&board, uci("d3f5"), 42), first);
        }
    }
}
