use thiserror::Error;

use crate::board::{Color, PieceId, Square};

/// Reasons a click or move request is turned down. None of these end the session; the game state is
/// left as it was apart from the selection being cleared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum MoveError {
    #[error("square ({row}, {col}) is off the board")]
    OutOfBounds { row: i8, col: i8 },
    #[error("square {0} is occupied")]
    CellOccupied(Square),
    #[error("it is {0}'s turn")]
    NotPlayersTurn(Color),
    #[error("no legal move")]
    NoLegalMove,
    #[error("no piece is selected")]
    NoPieceSelected,
    #[error("piece {0} is not on the board")]
    UnknownPiece(PieceId),
    #[error("game is over, {0} won")]
    GameOver(Color),
}
