//! Board geometry helpers for the tactical detectors

use chess::{BitBoard, Board, Color, File, Piece, Rank, Square, EMPTY};

/// Squares attacked by the piece on `square`.
/// Equivalent of python-chess board.attacks(square).
pub fn attacks(board: &Board, square: Square) -> BitBoard {
    let piece = match board.piece_on(square) {
        Some(p) => p,
        None => return EMPTY,
    };

    match piece {
        Piece::Pawn => {
            let color = match board.color_on(square) {
                Some(c) => c,
                None => return EMPTY,
            };
            pawn_attacks(square, color)
        }
        Piece::Knight => chess::get_knight_moves(square),
        Piece::King => chess::get_king_moves(square),
        Piece::Bishop => chess::get_bishop_moves(square, *board.combined()),
        Piece::Rook => chess::get_rook_moves(square, *board.combined()),
        Piece::Queen => {
            chess::get_bishop_moves(square, *board.combined())
                | chess::get_rook_moves(square, *board.combined())
        }
    }
}

/// Pawn attack squares (diagonal captures only, not pushes)
pub fn pawn_attacks(square: Square, color: Color) -> BitBoard {
    let file = square.get_file().to_index();
    let rank = square.get_rank().to_index();

    let mut result = EMPTY;

    match color {
        Color::White => {
            if rank < 7 {
                if file > 0 {
                    result |= BitBoard::from_square(Square::make_square(
                        Rank::from_index(rank + 1),
                        File::from_index(file - 1),
                    ));
                }
                if file < 7 {
                    result |= BitBoard::from_square(Square::make_square(
                        Rank::from_index(rank + 1),
                        File::from_index(file + 1),
                    ));
                }
            }
        }
        Color::Black => {
            if rank > 0 {
                if file > 0 {
                    result |= BitBoard::from_square(Square::make_square(
                        Rank::from_index(rank - 1),
                        File::from_index(file - 1),
                    ));
                }
                if file < 7 {
                    result |= BitBoard::from_square(Square::make_square(
                        Rank::from_index(rank - 1),
                        File::from_index(file + 1),
                    ));
                }
            }
        }
    }

    result
}

/// All pieces of `color` attacking `square`.
/// Equivalent of python-chess board.attackers(color, square).
pub fn attackers(board: &Board, color: Color, square: Square) -> BitBoard {
    let occupied = *board.combined();
    let color_pieces = *board.color_combined(color);

    let mut result = EMPTY;

    // Pawns: reverse lookup — pawn attacks FROM the target square
    // with the OPPOSITE color, then intersect with actual pawns
    let pawn_atk = pawn_attacks(square, !color);
    result |= pawn_atk & *board.pieces(Piece::Pawn) & color_pieces;

    // Knights
    let knight_atk = chess::get_knight_moves(square);
    result |= knight_atk & *board.pieces(Piece::Knight) & color_pieces;

    // King
    let king_atk = chess::get_king_moves(square);
    result |= king_atk & *board.pieces(Piece::King) & color_pieces;

    // Bishops (and queen diagonals)
    let bishop_atk = chess::get_bishop_moves(square, occupied);
    result |=
        bishop_atk & (*board.pieces(Piece::Bishop) | *board.pieces(Piece::Queen)) & color_pieces;

    // Rooks (and queen ranks/files)
    let rook_atk = chess::get_rook_moves(square, occupied);
    result |= rook_atk & (*board.pieces(Piece::Rook) | *board.pieces(Piece::Queen)) & color_pieces;

    result
}

/// The king square for a color.
pub fn king_square(board: &Board, color: Color) -> Square {
    let king_bb = *board.pieces(Piece::King) & *board.color_combined(color);
    debug_assert_eq!(king_bb.popcnt(), 1);
    king_bb.to_square()
}
