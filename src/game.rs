use log::{debug, info, trace};

use crate::{
    board::{Board, Color, PieceId, Square},
    errors::MoveError,
    move_generator::{PieceMoves, get_moves},
    moves::{Move, MoveRollback},
};

/// A pointer event after it has been matched against the board
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameEvent {
    PieceClicked(PieceId),
    SquareClicked(Square),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameOutcome {
    Ongoing,
    Win(Color),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MoveOutcome {
    pub m: Move,
    pub captured: Option<PieceId>,
    pub outcome: GameOutcome,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventResponse {
    /// Destinations to highlight for the newly selected piece
    Highlighted(PieceMoves),
    Moved(MoveOutcome),
}

/// Occupied squares are piece clicks, empty ones are square clicks.
pub fn resolve_click(board: &Board, row: i8, col: i8) -> Result<GameEvent, MoveError> {
    let square = Square::new(row, col).ok_or(MoveError::OutOfBounds { row, col })?;

    Ok(match board.piece_at(square) {
        Some(id) => GameEvent::PieceClicked(id),
        None => GameEvent::SquareClicked(square),
    })
}

/// Owns the board together with the selection state driven by clicks.
#[derive(Debug, Default)]
pub struct Game {
    board: Board,
    selected: Option<PieceId>,
    highlights: PieceMoves,
    history: Vec<Move>,
    rollback: MoveRollback,
}

impl Game {
    pub fn new(board: Board) -> Game {
        Game {
            board,
            ..Default::default()
        }
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn selected(&self) -> Option<PieceId> {
        self.selected
    }

    pub fn highlights(&self) -> &[Move] {
        &self.highlights
    }

    pub fn history(&self) -> &[Move] {
        &self.history
    }

    pub fn outcome(&self) -> GameOutcome {
        match self.board.winner() {
            Some(color) => GameOutcome::Win(color),
            None => GameOutcome::Ongoing,
        }
    }

    pub fn click(&mut self, row: i8, col: i8) -> Result<EventResponse, MoveError> {
        let event = match resolve_click(&self.board, row, col) {
            Ok(event) => event,
            Err(err) => {
                self.clear_selection();
                return Err(err);
            }
        };

        self.handle_event(event)
    }

    pub fn handle_event(&mut self, event: GameEvent) -> Result<EventResponse, MoveError> {
        trace!("handling {event:?}");
        match event {
            GameEvent::PieceClicked(id) => self.select_piece(id).map(EventResponse::Highlighted),
            GameEvent::SquareClicked(square) => self.click_square(square).map(EventResponse::Moved),
        }
    }

    /// Selects a piece and returns the squares to highlight.
    ///
    /// Pieces with no moves stay selected with nothing highlighted.
    pub fn select_piece(&mut self, id: PieceId) -> Result<PieceMoves, MoveError> {
        self.clear_selection();
        self.check_not_over()?;

        let piece = *self.board.piece(id).ok_or(MoveError::UnknownPiece(id))?;
        let Some(position) = piece.position else {
            return Err(MoveError::UnknownPiece(id));
        };

        if piece.color != self.board.side_to_move {
            return Err(MoveError::NotPlayersTurn(self.board.side_to_move));
        }

        self.selected = Some(id);
        let moves = get_moves(&self.board, id);
        debug!("selected piece {id} on {position:?}, {} moves", moves.len());

        if moves.is_empty() {
            return Err(MoveError::NoLegalMove);
        }

        self.highlights = moves.clone();
        Ok(moves)
    }

    /// Moves the selected piece to `square` if it is highlighted. The selection is cleared either way.
    pub fn click_square(&mut self, square: Square) -> Result<MoveOutcome, MoveError> {
        let selected = self.selected;
        let highlighted = self.highlights.iter().find(|m| m.to() == square).copied();
        self.clear_selection();
        self.check_not_over()?;

        if selected.is_none() {
            return Err(MoveError::NoPieceSelected);
        }

        match highlighted {
            Some(m) => Ok(self.play(m)),
            None if self.board.piece_at(square).is_some() => Err(MoveError::CellOccupied(square)),
            None => Err(MoveError::NoLegalMove),
        }
    }

    /// Select then click in one step
    pub fn try_move(&mut self, from: Square, to: Square) -> Result<MoveOutcome, MoveError> {
        let Some(id) = self.board.piece_at(from) else {
            self.clear_selection();
            return Err(MoveError::NoPieceSelected);
        };

        self.select_piece(id)?;
        self.click_square(to)
    }

    /// `try_move` from raw coordinates. Off-board coordinates are rejected the way `click` rejects them.
    pub fn try_move_coords(&mut self, from: (i8, i8), to: (i8, i8)) -> Result<MoveOutcome, MoveError> {
        let squares = Square::new(from.0, from.1)
            .ok_or(MoveError::OutOfBounds { row: from.0, col: from.1 })
            .and_then(|from_square| {
                Square::new(to.0, to.1)
                    .map(|to_square| (from_square, to_square))
                    .ok_or(MoveError::OutOfBounds { row: to.0, col: to.1 })
            });

        match squares {
            Ok((from, to)) => self.try_move(from, to),
            Err(err) => {
                self.clear_selection();
                Err(err)
            }
        }
    }

    /// Takes back the last move. Returns false when there is nothing to take back.
    pub fn undo(&mut self) -> bool {
        self.clear_selection();
        match self.history.pop() {
            Some(m) => {
                self.board.unmake_move(&m, &mut self.rollback);
                info!("took back {}", m.notation());
                true
            }
            None => false,
        }
    }

    fn play(&mut self, m: Move) -> MoveOutcome {
        let mover = self.board.side_to_move;
        let captured = self.board.make_move(&m, &mut self.rollback);
        self.history.push(m);
        info!("{mover} played {}", m.notation());

        if captured.is_some() {
            info!(
                "score red {} black {}",
                self.board.score(Color::Red),
                self.board.score(Color::Black)
            );
        }

        let outcome = self.outcome();
        if let GameOutcome::Win(color) = outcome {
            info!("{color} wins");
        }

        MoveOutcome { m, captured, outcome }
    }

    fn clear_selection(&mut self) {
        self.selected = None;
        self.highlights.clear();
    }

    fn check_not_over(&self) -> Result<(), MoveError> {
        match self.board.winner() {
            Some(color) => Err(MoveError::GameOver(color)),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod game_tests {
    use super::*;

    fn sq(row: u8, col: u8) -> Square {
        Square { row, col }
    }

    fn game(position: &str) -> Game {
        Game::new(Board::from_position_string(position).unwrap())
    }

    fn highlighted(response: Result<EventResponse, MoveError>) -> Vec<Square> {
        match response {
            Ok(EventResponse::Highlighted(moves)) => moves.iter().map(|m| m.to()).collect(),
            other => panic!("expected highlights, got {other:?}"),
        }
    }

    #[test]
    pub fn black_moves_first() {
        let mut game = Game::default();

        assert_eq!(vec![sq(4, 1)], highlighted(game.click(5, 0)));
        assert_eq!(Some(12), game.selected());

        let Ok(EventResponse::Moved(outcome)) = game.click(4, 1) else {
            panic!("expected a move");
        };
        assert_eq!(None, outcome.captured);
        assert_eq!(GameOutcome::Ongoing, outcome.outcome);
        assert_eq!(Color::Red, game.board().side_to_move);
        assert_eq!(None, game.selected());
        assert!(game.highlights().is_empty());
    }

    #[test]
    pub fn wrong_color_is_rejected() {
        let mut game = Game::default();

        assert_eq!(Err(MoveError::NotPlayersTurn(Color::Black)), game.click(2, 1));
        assert_eq!(None, game.selected());
        assert!(game.highlights().is_empty());
    }

    #[test]
    pub fn blocked_piece_stays_selected_without_highlights() {
        let mut game = Game::default();

        assert_eq!(vec![sq(4, 1)], highlighted(game.click(5, 0)));
        assert_eq!(Err(MoveError::NoLegalMove), game.click(7, 0));
        assert_eq!(Some(game.board().piece_at(sq(7, 0)).unwrap()), game.selected());
        assert!(game.highlights().is_empty());

        // The highlights of the previous selection must not be usable
        assert_eq!(Err(MoveError::NoLegalMove), game.click(4, 1));
        assert_eq!(Color::Black, game.board().side_to_move);
    }

    #[test]
    pub fn clicking_unhighlighted_square_clears_selection() {
        let mut game = Game::default();

        highlighted(game.click(5, 2));
        assert_eq!(Err(MoveError::NoLegalMove), game.click(3, 0));
        assert_eq!(None, game.selected());
        assert_eq!(Err(MoveError::NoPieceSelected), game.click(4, 3));
    }

    #[test]
    pub fn off_board_click_is_rejected() {
        let mut game = Game::default();

        assert_eq!(Err(MoveError::OutOfBounds { row: 8, col: 0 }), game.click(8, 0));
        assert_eq!(Err(MoveError::OutOfBounds { row: -1, col: 3 }), game.click(-1, 3));
        assert_eq!(Board::default(), *game.board());
    }

    #[test]
    pub fn occupied_square_is_rejected() {
        let mut game = Game::default();

        highlighted(game.click(5, 2));
        assert_eq!(Err(MoveError::CellOccupied(sq(6, 1))), game.click_square(sq(6, 1)));
    }

    #[test]
    pub fn forced_capture_scores_for_captor() {
        let mut game = game("8/8/8/8/1r6/b7/8/8 b 0 0");

        assert_eq!(vec![sq(3, 2)], highlighted(game.click(5, 0)));
        let Ok(EventResponse::Moved(outcome)) = game.click(3, 2) else {
            panic!("expected a capture");
        };

        assert_eq!(Some(0), outcome.captured);
        assert_eq!(1, game.board().score(Color::Black));
        assert_eq!(0, game.board().score(Color::Red));
        assert_eq!(0, game.board().live_pieces(Color::Red));
        assert_eq!(None, game.board().piece_at(sq(4, 1)));
    }

    #[test]
    pub fn red_man_on_last_row_is_crowned_before_selection() {
        let mut game = game("8/8/8/8/8/8/8/r7 r 0 0");
        let id = game.board().piece_at(sq(7, 0)).unwrap();
        assert!(game.board().piece(id).unwrap().king);

        assert_eq!(vec![sq(6, 1)], highlighted(game.click(7, 0)));
        game.click(6, 1).unwrap();
        assert!(game.undo());
        assert!(game.board().piece(id).unwrap().king);
        assert_eq!("8/8/8/8/8/8/8/R7 r 0 0", game.board().to_position_string());
    }

    #[test]
    pub fn off_board_move_clears_selection() {
        let mut game = Game::default();

        highlighted(game.click(5, 2));
        assert_eq!(Err(MoveError::OutOfBounds { row: 3, col: 8 }), game.try_move_coords((5, 2), (3, 8)));
        assert_eq!(None, game.selected());
        assert!(game.highlights().is_empty());

        highlighted(game.click(5, 2));
        assert_eq!(Err(MoveError::OutOfBounds { row: 9, col: 2 }), game.try_move_coords((9, 2), (4, 3)));
        assert_eq!(None, game.selected());

        assert!(game.try_move_coords((5, 2), (4, 3)).is_ok());
    }

    #[test]
    pub fn man_is_crowned_after_reaching_last_row() {
        let mut game = game("8/2b5/8/8/8/8/8/r7 b 0 0");

        let outcome = game.try_move(sq(1, 2), sq(0, 1)).unwrap();

        assert!(outcome.m.is_promotion());
        assert!(game.board().piece_on(sq(0, 1)).unwrap().king);
    }

    #[test]
    pub fn twelfth_capture_ends_game() {
        let mut game = game("8/8/8/8/1r6/b7/8/4R3 b 0 11");

        let outcome = game.try_move(sq(5, 0), sq(3, 2)).unwrap();

        assert_eq!(GameOutcome::Win(Color::Black), outcome.outcome);
        assert_eq!(GameOutcome::Win(Color::Black), game.outcome());
        assert_eq!(Err(MoveError::GameOver(Color::Black)), game.click(7, 4));
        assert_eq!(1, game.board().live_pieces(Color::Red));
    }

    #[test]
    pub fn repeated_captures_count_down_live_pieces() {
        // Black king zigzags up the board taking a man each turn while red shuffles its king
        let mut game = game("1R6/8/5r2/8/5r2/8/5r2/6B1 b 0 0");
        let captures = [
            (sq(7, 6), sq(5, 4)),
            (sq(5, 4), sq(3, 6)),
            (sq(3, 6), sq(1, 4)),
        ];
        let shuffles = [(sq(0, 1), sq(1, 0)), (sq(1, 0), sq(0, 1))];

        for (i, (from, to)) in captures.iter().enumerate() {
            let red_before = game.board().live_pieces(Color::Red);
            let outcome = game.try_move(*from, *to).unwrap();

            assert!(outcome.captured.is_some());
            assert_eq!(red_before - 1, game.board().live_pieces(Color::Red));
            assert_eq!(i as u8 + 1, game.board().score(Color::Black));
            assert_eq!(0, game.board().score(Color::Red));

            if i + 1 < captures.len() {
                let (from, to) = shuffles[i % 2];
                game.try_move(from, to).unwrap();
            }
        }
    }

    #[test]
    pub fn undo_restores_board() {
        let mut game = game("8/8/8/8/1r6/b7/8/8 b 0 0");
        let before = game.board().clone();

        game.try_move(sq(5, 0), sq(3, 2)).unwrap();
        assert!(game.undo());
        assert!(!game.undo());
        assert_eq!(before, *game.board());
    }

    #[test]
    pub fn captured_piece_cannot_be_selected() {
        let mut game = game("8/8/8/8/1r6/b7/8/8 b 0 0");
        game.try_move(sq(5, 0), sq(3, 2)).unwrap();

        assert_eq!(Err(MoveError::UnknownPiece(0)), game.handle_event(GameEvent::PieceClicked(0)));
        assert_eq!(Err(MoveError::UnknownPiece(99)), game.handle_event(GameEvent::PieceClicked(99)));
    }
}
