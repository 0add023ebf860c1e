use log::{debug, error, info};

use crate::board::{Board, PieceId, Square};

// Assumes flags have been shifted to bits 1-4
pub const MOVE_FLAG_CAPTURE: u16 = 1;
pub const MOVE_FLAG_PROMOTION: u16 = 1 << 1;

#[derive(PartialEq, Eq, Copy, Clone, Default, Hash)]
pub struct Move {
    // from: 6 bits, to: 6 bits, flags: 4 bits. Squares are row * 8 + col.
    pub data: u16,
}

impl Move {
    pub fn new(from: Square, to: Square, flags: u16) -> Move {
        Move {
            data: from.index() as u16 | ((to.index() as u16) << 6) | (flags << 12),
        }
    }

    pub fn from(&self) -> Square {
        Square::from_index((self.data & 0x003F) as u8)
    }

    pub fn to(&self) -> Square {
        Square::from_index(((self.data >> 6) & 0x003F) as u8)
    }

    pub fn flags(&self) -> u16 {
        self.data >> 12
    }

    pub fn is_capture(&self) -> bool {
        self.flags() & MOVE_FLAG_CAPTURE != 0
    }

    pub fn is_promotion(&self) -> bool {
        self.flags() & MOVE_FLAG_PROMOTION != 0
    }

    /// Square of the piece jumped over, only for captures
    pub fn captured_square(&self) -> Option<Square> {
        if self.is_capture() {
            self.from().midpoint(self.to())
        } else {
            None
        }
    }

    /// `5,0x3,2` for a capture, `5,0-4,1` for a simple move, with a trailing `K` when the move crowns.
    pub fn notation(&self) -> String {
        let separator = if self.is_capture() { 'x' } else { '-' };
        let crown = if self.is_promotion() { "K" } else { "" };

        format!("{}{}{}{}", self.from(), separator, self.to(), crown)
    }
}

impl std::fmt::Debug for Move {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Move from: {:?} to: {:?} flags: {}\nPretty: {}",
            self.from(),
            self.to(),
            self.flags(),
            self.notation()
        )
    }
}

#[derive(Debug, Default)]
pub struct MoveRollback {
    // Only added when a piece is actually captured
    pub captured_pieces: Vec<PieceId>,
}

impl MoveRollback {
    pub fn is_empty(&self) -> bool {
        self.captured_pieces.is_empty()
    }
}

impl Board {
    /// Plays a move produced by the move generator. Returns the captured piece, if any.
    ///
    /// The captor's score goes up as soon as the piece leaves the board, and the side to move is
    /// passed to the opponent afterwards.
    pub fn make_move(&mut self, r#move: &Move, rollback: &mut MoveRollback) -> Option<PieceId> {
        let from = r#move.from();
        let to = r#move.to();

        let Some(moving_id) = self.piece_at(from) else {
            error!("make_move: no piece on {from:?} for {}", r#move.notation());
            error!("{:#?}", self);
            debug_assert!(false, "make_move called with an empty from square");
            return None;
        };
        let mover = self.side_to_move;

        let mut captured = None;
        if let Some(captured_square) = r#move.captured_square() {
            match self.piece_at(captured_square) {
                Some(captured_id) => {
                    self.remove_piece(captured_id);
                    rollback.captured_pieces.push(captured_id);
                    self.scores[mover.index()] += 1;
                    captured = Some(captured_id);
                    debug!(
                        "{mover} captured piece {captured_id} on {captured_square:?}, score is now {}",
                        self.scores[mover.index()]
                    );
                }
                None => {
                    error!(
                        "make_move: capture {} has nothing to capture on {captured_square:?}",
                        r#move.notation()
                    );
                    debug_assert!(false, "capture move without a captured piece");
                }
            }
        }

        self.place_piece(moving_id, to);

        if r#move.is_promotion() && self.crown(moving_id) {
            debug!("piece {moving_id} crowned on {to:?}");
        }

        self.side_to_move = mover.opponent();

        captured
    }

    pub fn unmake_move(&mut self, r#move: &Move, rollback: &mut MoveRollback) {
        let from = r#move.from();
        let to = r#move.to();

        self.side_to_move = self.side_to_move.opponent();
        let mover = self.side_to_move;

        let Some(moving_id) = self.piece_at(to) else {
            error!("unmake_move: no piece on {to:?} for {}", r#move.notation());
            error!("{:#?}", self);
            debug_assert!(false, "unmake_move called with an empty to square");
            return;
        };

        self.place_piece(moving_id, from);
        if r#move.is_promotion() {
            self.uncrown(moving_id);
        }

        if let Some(captured_square) = r#move.captured_square() {
            match rollback.captured_pieces.pop() {
                Some(captured_id) => {
                    self.place_piece(captured_id, captured_square);
                    self.scores[mover.index()] -= 1;
                }
                None => {
                    error!("unmake_move: rollback has no captured piece for {}", r#move.notation());
                    debug_assert!(false, "rollback is missing a captured piece");
                }
            }
        }
    }
}

/// Plays moves given as (from, to) pairs from `board`, failing on the first one the generator does
/// not produce.
pub fn find_and_run_moves(board: &mut Board, squares: &[(Square, Square)]) -> Result<Vec<Move>, String> {
    let mut rollback = MoveRollback::default();
    let mut played = Vec::with_capacity(squares.len());

    for (i, (from, to)) in squares.iter().enumerate() {
        let moves = crate::move_generator::generate_moves(board);
        let Some(gen_move) = moves.iter().find(|m| m.from() == *from && m.to() == *to) else {
            debug!("{:?}", board);
            return Err(format!(
                "Requested move {} from {from:?} to {to:?} but it was not found in the board state",
                i + 1
            ));
        };

        board.make_move(gen_move, &mut rollback);
        info!("played {}", gen_move.notation());
        played.push(*gen_move);
    }

    Ok(played)
}

#[cfg(test)]
mod moves_tests {
    use crate::board::{Board, Color, STARTING_POSITION, Square};

    use super::*;

    fn sq(row: u8, col: u8) -> Square {
        Square { row, col }
    }

    #[test]
    pub fn packs_squares_and_flags() {
        let m = Move::new(sq(5, 0), sq(3, 2), MOVE_FLAG_CAPTURE);

        assert_eq!(sq(5, 0), m.from());
        assert_eq!(sq(3, 2), m.to());
        assert!(m.is_capture());
        assert!(!m.is_promotion());
        assert_eq!(Some(sq(4, 1)), m.captured_square());
        assert_eq!("5,0x3,2", m.notation());
        assert_eq!("1,2-0,1K", Move::new(sq(1, 2), sq(0, 1), MOVE_FLAG_PROMOTION).notation());
    }

    #[test]
    pub fn capture_removes_one_piece_and_scores_once() {
        let mut board = Board::from_position_string("8/8/8/8/1r6/b7/8/8 b 0 0").unwrap();
        let mut rollback = MoveRollback::default();
        let capture = Move::new(sq(5, 0), sq(3, 2), MOVE_FLAG_CAPTURE);

        let captured = board.make_move(&capture, &mut rollback);

        assert_eq!(Some(0), captured);
        assert_eq!(0, board.live_pieces(Color::Red));
        assert_eq!(1, board.live_pieces(Color::Black));
        assert_eq!(1, board.score(Color::Black));
        assert_eq!(0, board.score(Color::Red));
        assert_eq!(None, board.piece(0).unwrap().position);
        assert_eq!(Color::Red, board.side_to_move);
        assert!(board.validate().is_ok());
    }

    #[test]
    pub fn unmake_restores_capture_and_crown() {
        let mut board = Board::from_position_string("8/2r5/1b6/8/8/8/8/8 b 0 0").unwrap();
        let before = board.clone();
        let mut rollback = MoveRollback::default();
        let m = Move::new(sq(2, 1), sq(0, 3), MOVE_FLAG_CAPTURE | MOVE_FLAG_PROMOTION);

        board.make_move(&m, &mut rollback);
        assert!(board.piece_on(sq(0, 3)).unwrap().king);
        assert_eq!(1, board.score(Color::Black));

        board.unmake_move(&m, &mut rollback);
        assert_eq!(before, board);
        assert!(rollback.is_empty());
    }

    #[test]
    pub fn runs_moves_from_start() {
        let mut board = Board::from_position_string(STARTING_POSITION).unwrap();

        let played = find_and_run_moves(&mut board, &[(sq(5, 0), sq(4, 1)), (sq(2, 1), sq(3, 2))]).unwrap();

        assert_eq!(2, played.len());
        assert_eq!(Color::Black, board.side_to_move);
        assert_eq!(Some(12), board.piece_at(sq(4, 1)));
        assert_eq!(Some(8), board.piece_at(sq(3, 2)));
    }

    #[test]
    pub fn rejects_moves_not_generated() {
        let mut board = Board::default();

        assert!(find_and_run_moves(&mut board, &[(sq(5, 0), sq(3, 2))]).is_err());
        assert!(find_and_run_moves(&mut board, &[(sq(2, 1), sq(3, 2))]).is_err());
    }
}
