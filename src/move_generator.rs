use log::trace;
use tinyvec::ArrayVec;

use crate::{
    board::{Board, Color, Piece, PieceId, Square},
    moves::{MOVE_FLAG_CAPTURE, MOVE_FLAG_PROMOTION, Move},
};

/// A man has two destinations per kind of move and a king four
pub type PieceMoves = ArrayVec<[Move; 4]>;

/// Column steps, checked in this order for every row direction
const COLUMN_DIRECTIONS: [i8; 2] = [1, -1];

/// Row directions a piece may move in. Red's direction is listed first for kings.
fn row_directions(piece: &Piece) -> ArrayVec<[i8; 2]> {
    let mut directions = ArrayVec::new();
    if piece.color == Color::Red || piece.king {
        directions.push(Color::Red.forward());
    }
    if piece.color == Color::Black || piece.king {
        directions.push(Color::Black.forward());
    }

    directions
}

/// A simple move needs an on-board, empty destination
pub fn is_valid_move(board: &Board, target_row: i8, target_col: i8) -> bool {
    match Square::new(target_row, target_col) {
        Some(target) => board.piece_at(target).is_none(),
        None => false,
    }
}

/// A capture needs an on-board, empty destination and an opposing piece on the midpoint
pub fn can_capture(board: &Board, piece: &Piece, from: Square, target_row: i8, target_col: i8) -> bool {
    let Some(target) = Square::new(target_row, target_col) else {
        return false;
    };

    if board.piece_at(target).is_some() {
        return false;
    }

    let Some(captured_square) = from.midpoint(target) else {
        return false;
    };

    match board.piece_on(captured_square) {
        Some(captured) => captured.color != piece.color,
        None => false,
    }
}

/// Legal destinations for `piece` standing on `from`. If any capture is available only captures are
/// returned.
pub fn get_moves_from(board: &Board, piece: &Piece, from: Square) -> PieceMoves {
    let mut simple_moves = PieceMoves::new();
    let mut capture_moves = PieceMoves::new();
    let row = from.row as i8;
    let col = from.col as i8;

    for d_row in row_directions(piece) {
        for d_col in COLUMN_DIRECTIONS {
            if is_valid_move(board, row + d_row, col + d_col) {
                if let Some(to) = from.offset(d_row, d_col) {
                    simple_moves.push(Move::new(from, to, promotion_flag(piece, to)));
                }
            }
        }

        for d_col in COLUMN_DIRECTIONS {
            let (target_row, target_col) = (row + 2 * d_row, col + 2 * d_col);
            if can_capture(board, piece, from, target_row, target_col) {
                if let Some(to) = Square::new(target_row, target_col) {
                    capture_moves.push(Move::new(from, to, MOVE_FLAG_CAPTURE | promotion_flag(piece, to)));
                }
            }
        }
    }

    trace!(
        "piece on {from:?}: {} simple, {} capture",
        simple_moves.len(),
        capture_moves.len()
    );

    if capture_moves.is_empty() {
        simple_moves
    } else {
        capture_moves
    }
}

/// Resolver output for a piece id. Captured pieces have no moves.
pub fn get_moves(board: &Board, id: PieceId) -> PieceMoves {
    match board.piece(id) {
        Some(piece) => match piece.position {
            Some(from) => get_moves_from(board, piece, from),
            None => PieceMoves::new(),
        },
        None => PieceMoves::new(),
    }
}

fn promotion_flag(piece: &Piece, to: Square) -> u16 {
    if !piece.king && to.row == piece.color.promotion_row() {
        MOVE_FLAG_PROMOTION
    } else {
        0
    }
}

/// Every move of every piece of the side to move. Nothing is generated once the game is won.
pub fn generate_moves(board: &Board) -> Vec<Move> {
    if board.winner().is_some() {
        return Vec::new();
    }

    board
        .live_piece_ids(board.side_to_move)
        .flat_map(|id| get_moves(board, id))
        .collect()
}

pub fn has_legal_move(board: &Board) -> bool {
    board.winner().is_none()
        && board
            .live_piece_ids(board.side_to_move)
            .any(|id| !get_moves(board, id).is_empty())
}
