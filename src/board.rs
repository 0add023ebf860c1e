use std::fmt::{Debug, Display};

pub const BOARD_SIZE: u8 = 8;
pub const PIECES_PER_SIDE: usize = 12;
pub const MAX_PIECES: usize = PIECES_PER_SIDE * 2;
/// Number of captures that ends the game
pub const WINNING_SCORE: u8 = PIECES_PER_SIDE as u8;

/// Marks an empty square in `Board::squares`
const NO_PIECE: u8 = 0xFF;

pub static STARTING_POSITION: &str = "1r1r1r1r/r1r1r1r1/1r1r1r1r/8/8/b1b1b1b1/1b1b1b1b/b1b1b1b1 b 0 0";

/// Index into `Board::pieces`. Red pieces are 0..12 and black pieces are 12..24.
pub type PieceId = u8;

#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Square {
    pub row: u8,
    pub col: u8,
}

impl Square {
    /// Returns `None` when the coordinates fall outside the 8x8 grid.
    pub fn new(row: i8, col: i8) -> Option<Square> {
        if (0..BOARD_SIZE as i8).contains(&row) && (0..BOARD_SIZE as i8).contains(&col) {
            Some(Square {
                row: row as u8,
                col: col as u8,
            })
        } else {
            None
        }
    }

    pub fn from_index(index: u8) -> Square {
        debug_assert!(index < BOARD_SIZE * BOARD_SIZE);
        Square {
            row: index / BOARD_SIZE,
            col: index % BOARD_SIZE,
        }
    }

    pub fn index(&self) -> usize {
        (self.row * BOARD_SIZE + self.col) as usize
    }

    pub fn offset(&self, d_row: i8, d_col: i8) -> Option<Square> {
        Square::new(self.row as i8 + d_row, self.col as i8 + d_col)
    }

    /// The square jumped over when moving from `self` to `other`. Only defined when both coordinate
    /// differences are even.
    pub fn midpoint(&self, other: Square) -> Option<Square> {
        let row_sum = self.row as i8 + other.row as i8;
        let col_sum = self.col as i8 + other.col as i8;
        if row_sum % 2 != 0 || col_sum % 2 != 0 {
            return None;
        }

        Square::new(row_sum / 2, col_sum / 2)
    }

    /// Only dark squares are ever occupied
    pub fn is_dark(&self) -> bool {
        (self.row + self.col) % 2 != 0
    }
}

impl Display for Square {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{},{}", self.row, self.col)
    }
}

impl Debug for Square {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.row, self.col)
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum Color {
    Red,
    Black,
}

impl Color {
    pub fn opponent(&self) -> Color {
        match self {
            Color::Red => Color::Black,
            Color::Black => Color::Red,
        }
    }

    pub fn index(&self) -> usize {
        match self {
            Color::Red => 0,
            Color::Black => 1,
        }
    }

    /// Row direction a man of this color moves in. Red starts on rows 0-2 and black on rows 5-7.
    pub fn forward(&self) -> i8 {
        match self {
            Color::Red => 1,
            Color::Black => -1,
        }
    }

    /// The opponent's home row, where a man of this color is crowned
    pub fn promotion_row(&self) -> u8 {
        match self {
            Color::Red => BOARD_SIZE - 1,
            Color::Black => 0,
        }
    }

    fn first_piece_id(&self) -> PieceId {
        match self {
            Color::Red => 0,
            Color::Black => PIECES_PER_SIDE as PieceId,
        }
    }

    pub fn of_piece_id(id: PieceId) -> Color {
        if (id as usize) < PIECES_PER_SIDE {
            Color::Red
        } else {
            Color::Black
        }
    }
}

impl Display for Color {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Color::Red => write!(f, "red"),
            Color::Black => write!(f, "black"),
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Piece {
    pub color: Color,
    pub king: bool,
    /// `None` once the piece has been captured
    pub position: Option<Square>,
}

impl Piece {
    pub fn to_char(&self) -> char {
        match (self.color, self.king) {
            (Color::Red, false) => 'r',
            (Color::Red, true) => 'R',
            (Color::Black, false) => 'b',
            (Color::Black, true) => 'B',
        }
    }
}

#[derive(Clone, PartialEq, Eq)]
pub struct Board {
    /// Piece id on each square, row major
    squares: [u8; 64],
    pieces: [Piece; MAX_PIECES],
    pub side_to_move: Color,
    /// Captures made by each color, indexed by `Color::index`
    pub scores: [u8; 2],
}

impl Board {
    /// A board with every piece captured. Used as the base when reading a position string.
    pub fn empty() -> Board {
        Board {
            squares: [NO_PIECE; 64],
            pieces: std::array::from_fn(|id| Piece {
                color: Color::of_piece_id(id as PieceId),
                king: false,
                position: None,
            }),
            side_to_move: Color::Black,
            scores: [0; 2],
        }
    }

    pub fn from_position_string(position: &str) -> Result<Board, String> {
        if !position.is_ascii() {
            return Err(String::from("Expected position to only contain ASCII characters"));
        }

        let fields: Vec<&str> = position.split_whitespace().collect();
        if fields.len() != 4 {
            return Err(format!(
                "Expected position to have 4 space-delimited parts but it had {}",
                fields.len()
            ));
        }

        let rows: Vec<&str> = fields[0].split('/').collect();
        if rows.len() != BOARD_SIZE as usize {
            return Err(format!(
                "Expected piece placement to have {BOARD_SIZE} rows but it had {}",
                rows.len()
            ));
        }

        let mut board = Board::empty();
        let mut next_id = [Color::Red.first_piece_id(), Color::Black.first_piece_id()];

        for (row, row_str) in rows.iter().enumerate() {
            let mut col: u8 = 0;
            for c in row_str.chars() {
                match c {
                    '1'..='8' => {
                        col += c as u8 - b'0';
                        if col > BOARD_SIZE {
                            return Err(format!("Row {row} '{row_str}' describes more than {BOARD_SIZE} squares"));
                        }
                    }
                    'r' | 'R' | 'b' | 'B' => {
                        if col >= BOARD_SIZE {
                            return Err(format!("Row {row} '{row_str}' describes more than {BOARD_SIZE} squares"));
                        }

                        let square = Square { row: row as u8, col };
                        if !square.is_dark() {
                            return Err(format!("Piece '{c}' is on light square {square:?}"));
                        }

                        let color = if c.eq_ignore_ascii_case(&'r') {
                            Color::Red
                        } else {
                            Color::Black
                        };
                        let id = next_id[color.index()];
                        if id as usize >= color.first_piece_id() as usize + PIECES_PER_SIDE {
                            return Err(format!("Position has more than {PIECES_PER_SIDE} {color} pieces"));
                        }

                        // A man standing on its crowning row is loaded as a king
                        board.pieces[id as usize].king = c.is_ascii_uppercase() || square.row == color.promotion_row();
                        board.place_piece(id, square);
                        next_id[color.index()] += 1;
                        col += 1;
                    }
                    _ => {
                        return Err(format!(
                            "Encountered unexpected character {c} while processing piece placement"
                        ));
                    }
                }
            }

            if col != BOARD_SIZE {
                return Err(format!(
                    "Row {row} '{row_str}' describes {col} squares instead of {BOARD_SIZE}"
                ));
            }
        }

        board.side_to_move = match fields[1] {
            "r" => Color::Red,
            "b" => Color::Black,
            other => return Err(format!("Encountered unexpected side to move value '{other}'")),
        };

        for (i, color) in [Color::Red, Color::Black].iter().enumerate() {
            let score = fields[2 + i].parse::<u8>().map_err(|e| {
                format!(
                    "Encountered error while parsing {color} score value '{}' as u8: {e}",
                    fields[2 + i]
                )
            })?;
            if score > WINNING_SCORE {
                return Err(format!("{color} score {score} is above {WINNING_SCORE}"));
            }
            board.scores[color.index()] = score;
        }

        if board.scores.iter().all(|score| *score == WINNING_SCORE) {
            return Err(format!("Both sides have a score of {WINNING_SCORE}"));
        }

        Ok(board)
    }

    pub fn to_position_string(&self) -> String {
        let mut placement = String::new();
        for row in 0..BOARD_SIZE {
            if row != 0 {
                placement.push('/');
            }

            let mut empty_run = 0;
            for col in 0..BOARD_SIZE {
                match self.piece_on(Square { row, col }) {
                    Some(piece) => {
                        if empty_run != 0 {
                            placement.push((b'0' + empty_run) as char);
                            empty_run = 0;
                        }
                        placement.push(piece.to_char());
                    }
                    None => empty_run += 1,
                }
            }

            if empty_run != 0 {
                placement.push((b'0' + empty_run) as char);
            }
        }

        let side = match self.side_to_move {
            Color::Red => 'r',
            Color::Black => 'b',
        };

        format!(
            "{placement} {side} {} {}",
            self.scores[Color::Red.index()],
            self.scores[Color::Black.index()]
        )
    }

    pub fn piece_at(&self, square: Square) -> Option<PieceId> {
        match self.squares[square.index()] {
            NO_PIECE => None,
            id => Some(id),
        }
    }

    pub fn piece(&self, id: PieceId) -> Option<&Piece> {
        self.pieces.get(id as usize)
    }

    pub fn piece_on(&self, square: Square) -> Option<&Piece> {
        self.piece_at(square).and_then(|id| self.piece(id))
    }

    /// Ids of the pieces of `color` still on the board
    pub fn live_piece_ids(&self, color: Color) -> impl Iterator<Item = PieceId> + '_ {
        let first = color.first_piece_id();
        (first..first + PIECES_PER_SIDE as PieceId).filter(move |id| self.pieces[*id as usize].position.is_some())
    }

    pub fn live_pieces(&self, color: Color) -> usize {
        self.live_piece_ids(color).count()
    }

    pub fn score(&self, color: Color) -> u8 {
        self.scores[color.index()]
    }

    pub fn winner(&self) -> Option<Color> {
        [Color::Black, Color::Red]
            .into_iter()
            .find(|color| self.scores[color.index()] >= WINNING_SCORE)
    }

    pub fn place_piece(&mut self, id: PieceId, square: Square) {
        debug_assert!(self.piece_at(square).is_none(), "square {square:?} is already occupied");

        let piece = &mut self.pieces[id as usize];
        if let Some(old) = piece.position {
            self.squares[old.index()] = NO_PIECE;
        }
        piece.position = Some(square);
        self.squares[square.index()] = id;
    }

    /// Takes the piece off the board, returning the square it was on
    pub fn remove_piece(&mut self, id: PieceId) -> Option<Square> {
        let piece = &mut self.pieces[id as usize];
        let square = piece.position.take()?;
        self.squares[square.index()] = NO_PIECE;
        Some(square)
    }

    /// Returns true if the piece was a man and is now a king
    pub fn crown(&mut self, id: PieceId) -> bool {
        let piece = &mut self.pieces[id as usize];
        let crowned = !piece.king;
        piece.king = true;
        crowned
    }

    pub fn uncrown(&mut self, id: PieceId) {
        self.pieces[id as usize].king = false;
    }

    /// Checks the piece list and the grid agree with each other
    pub fn validate(&self) -> Result<(), String> {
        for (id, piece) in self.pieces.iter().enumerate() {
            if piece.color != Color::of_piece_id(id as PieceId) {
                return Err(format!("Piece {id} has color {} but its id belongs to the other side", piece.color));
            }

            if let Some(square) = piece.position {
                if self.squares[square.index()] != id as u8 {
                    return Err(format!(
                        "Piece {id} records square {square:?} but the board holds {:#04x} there",
                        self.squares[square.index()]
                    ));
                }
            }
        }

        for (index, value) in self.squares.iter().enumerate() {
            if *value == NO_PIECE {
                continue;
            }

            let square = Square::from_index(index as u8);
            if !square.is_dark() {
                return Err(format!("Light square {square:?} is occupied by piece {value}"));
            }

            match self.pieces.get(*value as usize) {
                Some(piece) if piece.position == Some(square) => {}
                Some(piece) => {
                    return Err(format!(
                        "Square {square:?} holds piece {value} but the piece records {:?}",
                        piece.position
                    ));
                }
                None => return Err(format!("Square {square:?} holds invalid piece id {value}")),
            }
        }

        Ok(())
    }
}

impl Default for Board {
    /// The starting position: red on the dark squares of rows 0-2, black on rows 5-7, black to move.
    fn default() -> Self {
        let mut board = Board::empty();
        for (color, rows) in [(Color::Red, 0..3), (Color::Black, 5..8)] {
            let mut id = color.first_piece_id();
            for row in rows {
                for col in 0..BOARD_SIZE {
                    let square = Square { row, col };
                    if square.is_dark() {
                        board.place_piece(id, square);
                        id += 1;
                    }
                }
            }
        }

        board
    }
}

impl Debug for Board {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Board")
            .field("squares", &"See end value")
            .field("side_to_move", &self.side_to_move)
            .field("scores", &self.scores)
            .finish()?;

        let pretty_squares = (0..BOARD_SIZE)
            .map(|row| {
                let cells: String = (0..BOARD_SIZE)
                    .map(|col| match self.piece_on(Square { row, col }) {
                        Some(piece) => piece.to_char(),
                        None => '.',
                    })
                    .collect();
                format!("{row} {cells}")
            })
            .collect::<Vec<String>>()
            .join("\n");

        writeln!(f, "\nsquares: \n  01234567\n{}", pretty_squares)
    }
}

#[cfg(test)]
mod board_tests {
    use super::*;

    #[test]
    pub fn default_board_matches_starting_position() {
        let from_string = Board::from_position_string(STARTING_POSITION).unwrap();

        assert_eq!(Board::default(), from_string);
        assert_eq!(STARTING_POSITION, Board::default().to_position_string());
        assert_eq!(Color::Black, from_string.side_to_move);
        assert_eq!(PIECES_PER_SIDE, from_string.live_pieces(Color::Red));
        assert_eq!(PIECES_PER_SIDE, from_string.live_pieces(Color::Black));
        assert!(from_string.validate().is_ok());
    }

    #[test]
    pub fn starting_position_piece_ids() {
        let board = Board::default();

        assert_eq!(Some(0), board.piece_at(Square { row: 0, col: 1 }));
        assert_eq!(Some(11), board.piece_at(Square { row: 2, col: 7 }));
        assert_eq!(Some(12), board.piece_at(Square { row: 5, col: 0 }));
        assert_eq!(Some(23), board.piece_at(Square { row: 7, col: 6 }));
        assert_eq!(None, board.piece_at(Square { row: 3, col: 0 }));
    }

    #[test]
    pub fn position_string_keeps_kings_and_scores() {
        let position = "8/2B5/8/8/8/8/1r6/R7 r 10 11";
        let board = Board::from_position_string(position).unwrap();

        assert_eq!(position, board.to_position_string());
        assert_eq!(1, board.live_pieces(Color::Black));
        assert_eq!(2, board.live_pieces(Color::Red));
        assert!(board.piece_on(Square { row: 1, col: 2 }).unwrap().king);
        assert!(!board.piece_on(Square { row: 6, col: 1 }).unwrap().king);
        assert_eq!(10, board.score(Color::Red));
        assert_eq!(11, board.score(Color::Black));
        assert_eq!(None, board.winner());
    }

    #[test]
    pub fn men_on_crowning_row_load_as_kings() {
        let board = Board::from_position_string("1b6/8/8/8/8/8/8/r1b5 r 0 0").unwrap();

        assert!(board.piece_on(Square { row: 7, col: 0 }).unwrap().king);
        assert!(board.piece_on(Square { row: 0, col: 1 }).unwrap().king);
        assert!(!board.piece_on(Square { row: 7, col: 2 }).unwrap().king);
        assert_eq!("1B6/8/8/8/8/8/8/R1b5 r 0 0", board.to_position_string());
    }

    #[test]
    pub fn twelve_captures_is_a_win() {
        let board = Board::from_position_string("8/8/8/8/8/8/8/b7 r 0 12").unwrap();

        assert_eq!(Some(Color::Black), board.winner());
    }

    #[test]
    pub fn midpoint_requires_even_distance() {
        let from = Square { row: 5, col: 0 };

        assert_eq!(Some(Square { row: 4, col: 1 }), from.midpoint(Square { row: 3, col: 2 }));
        assert_eq!(None, from.midpoint(Square { row: 4, col: 1 }));
    }

    #[test]
    pub fn square_bounds() {
        assert_eq!(None, Square::new(-1, 0));
        assert_eq!(None, Square::new(0, 8));
        assert_eq!(Some(Square { row: 7, col: 7 }), Square::new(7, 7));
        assert_eq!(None, Square { row: 0, col: 1 }.offset(-1, 1));
    }

    #[test]
    pub fn removed_piece_frees_square() {
        let mut board = Board::default();
        let square = Square { row: 5, col: 0 };

        assert_eq!(Some(square), board.remove_piece(12));
        assert_eq!(None, board.piece_at(square));
        assert_eq!(None, board.piece(12).unwrap().position);
        assert_eq!(None, board.remove_piece(12));
        assert!(board.validate().is_ok());
    }

    macro_rules! position_error_test {
        ($($name:ident: $value:expr,)*) => {
            $(
                #[test]
                fn $name() {
                    assert!(Board::from_position_string($value).is_err());
                }
            )*
        }
    }

    position_error_test! {
        missing_fields: "8/8/8/8/8/8/8/8 b 0",
        too_few_rows: "8/8/8/8/8/8/8 b 0 0",
        short_row: "8/8/8/7/8/8/8/8 b 0 0",
        long_row: "8/8/8/8/1r7/8/8/8 b 0 0",
        light_square: "r7/8/8/8/8/8/8/8 b 0 0",
        too_many_red: "1r1r1r1r/r1r1r1r1/1r1r1r1r/r7/8/8/8/8 b 0 0",
        bad_piece_char: "1x6/8/8/8/8/8/8/8 b 0 0",
        bad_side: "8/8/8/8/8/8/8/8 w 0 0",
        bad_score: "8/8/8/8/8/8/8/8 b x 0",
        score_too_high: "8/8/8/8/8/8/8/8 b 0 13",
        long_digit_run: "888888888888888888888888888888888/8/8/8/8/8/8/8 b 0 0",
        digits_past_the_edge: "53/8/8/8/8/8/8/8 b 0 0",
        both_sides_won: "8/8/8/8/8/8/8/8 b 12 12",
    }
}
