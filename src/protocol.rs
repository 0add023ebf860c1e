use std::{io::Write, sync::LazyLock};

use log::{debug, error, trace};
use regex::Regex;

use crate::{
    board::{Board, Color, STARTING_POSITION, Square},
    errors::MoveError,
    game::{EventResponse, Game, GameOutcome, MoveOutcome},
    move_generator::{get_moves, has_legal_move},
    moves::find_and_run_moves,
};

build_info::build_info!(fn build_info);

static COMMAND_PATTERN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\s*(\S+)\s*(.*?)\s*$").unwrap());
static MOVE_PATTERN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^([0-7]),([0-7])[-x]([0-7]),([0-7])K?$").unwrap());

/// Line based command interface over a `Game`. Replies go to `out`.
pub struct ProtocolInterface<W: Write> {
    game: Game,
    out: W,
}

impl<W: Write> ProtocolInterface<W> {
    pub fn new(board: Board, out: W) -> Self {
        Self {
            game: Game::new(board),
            out,
        }
    }

    pub fn game(&self) -> &Game {
        &self.game
    }

    pub fn into_output(self) -> W {
        self.out
    }

    /// Returns false once the session should end
    pub fn process_command(&mut self, cmd: &str) -> std::io::Result<bool> {
        debug!("Received cmd string '{cmd}'");
        let Some(captures) = COMMAND_PATTERN.captures(cmd) else {
            // Blank line
            return Ok(true);
        };
        let name = captures.get(1).map_or("", |m| m.as_str());
        let args = captures.get(2).map_or("", |m| m.as_str());

        match name {
            "new" => {
                self.game = Game::default();
            }
            "position" => self.set_position(args),
            "click" => match parse_numbers::<i8>(args, 2) {
                Ok(coords) => {
                    let response = self.game.click(coords[0], coords[1]);
                    self.write_response(response)?;
                }
                Err(err) => error!("Malformed click '{cmd}': {err}"),
            },
            "piece" => match parse_numbers::<u8>(args, 1) {
                Ok(id) => {
                    let response = self.game.select_piece(id[0]).map(EventResponse::Highlighted);
                    self.write_response(response)?;
                }
                Err(err) => error!("Malformed piece '{cmd}': {err}"),
            },
            "moves" => match parse_numbers::<i8>(args, 2) {
                Ok(coords) => self.write_moves(coords[0], coords[1])?,
                Err(err) => error!("Malformed moves '{cmd}': {err}"),
            },
            "move" => match parse_numbers::<i8>(args, 4) {
                Ok(coords) => {
                    let response = self
                        .game
                        .try_move_coords((coords[0], coords[1]), (coords[2], coords[3]));
                    self.write_response(response.map(EventResponse::Moved))?;
                }
                Err(err) => error!("Malformed move '{cmd}': {err}"),
            },
            "undo" => {
                let last = self.game.history().last().copied();
                if self.game.undo() {
                    if let Some(m) = last {
                        writeln!(self.out, "undone {}", m.notation())?;
                    }
                } else {
                    writeln!(self.out, "illegal nothing to undo")?;
                }
            }
            "history" => {
                let moves: Vec<String> = self.game.history().iter().map(|m| m.notation()).collect();
                writeln!(self.out, "history {}", moves.join(" "))?;
            }
            "board" => {
                writeln!(self.out, "{:?}", self.game.board())?;
                writeln!(self.out, "position {}", self.game.board().to_position_string())?;
            }
            "score" => self.write_score()?,
            "status" => self.write_status()?,
            "perft" => match parse_numbers::<u8>(args, 1) {
                Ok(depth) => {
                    let mut board = self.game.board().clone();
                    let stats = board.start_perft(depth[0]);
                    for (m, nodes) in &stats.divide {
                        writeln!(self.out, "{} {nodes}", m.notation())?;
                    }
                    writeln!(self.out, "nodes {}", stats.nodes)?;
                }
                Err(err) => error!("Malformed perft '{cmd}': {err}"),
            },
            "version" => {
                let info = build_info();
                writeln!(self.out, "id name {} version {}", info.crate_info.name, info.crate_info.version)?;
            }
            "quit" => return Ok(false),
            _ => {
                error!("Unknown cmd in '{cmd}'")
            }
        }

        trace!("After cmd. {:#?}", self.game.board());
        self.out.flush()?;
        Ok(true)
    }

    fn set_position(&mut self, args: &str) {
        let (position, moves) = match args.split_once("moves") {
            Some((position, moves)) => (position.trim(), Some(moves.trim())),
            None => (args, None),
        };

        let position = if position == "startpos" {
            STARTING_POSITION
        } else {
            position
        };

        let mut board = match Board::from_position_string(position) {
            Ok(b) => b,
            Err(err_msg) => {
                error!("Failed to parse position. Error message: {err_msg}. Position: {position}");
                return;
            }
        };

        if let Some(moves) = moves {
            let squares = match moves.split_whitespace().map(parse_move_token).collect::<Result<Vec<_>, _>>() {
                Ok(squares) => squares,
                Err(err_msg) => {
                    error!("Failed to parse position moves. Error message: {err_msg}");
                    return;
                }
            };

            debug!("running {} moves", squares.len());
            if let Err(err_msg) = find_and_run_moves(&mut board, &squares) {
                error!("{err_msg}");
                return;
            }
        }

        self.game = Game::new(board);
    }

    fn write_response(&mut self, response: Result<EventResponse, MoveError>) -> std::io::Result<()> {
        match response {
            Ok(EventResponse::Highlighted(moves)) => {
                let squares: Vec<String> = moves.iter().map(|m| m.to().to_string()).collect();
                writeln!(self.out, "highlight {}", squares.join(" "))
            }
            Ok(EventResponse::Moved(outcome)) => self.write_move(&outcome),
            Err(err) => {
                debug!("rejected: {err}");
                writeln!(self.out, "illegal {err}")
            }
        }
    }

    fn write_move(&mut self, outcome: &MoveOutcome) -> std::io::Result<()> {
        writeln!(self.out, "moved {}", outcome.m.notation())?;
        if let Some(id) = outcome.captured {
            writeln!(self.out, "captured {id}")?;
        }
        self.write_status()
    }

    fn write_moves(&mut self, row: i8, col: i8) -> std::io::Result<()> {
        let Some(square) = Square::new(row, col) else {
            return writeln!(self.out, "illegal {}", MoveError::OutOfBounds { row, col });
        };

        let squares: Vec<String> = match self.game.board().piece_at(square) {
            Some(id) => get_moves(self.game.board(), id)
                .iter()
                .map(|m| m.to().to_string())
                .collect(),
            None => Vec::new(),
        };
        writeln!(self.out, "moves {}", squares.join(" "))
    }

    fn write_score(&mut self) -> std::io::Result<()> {
        let board = self.game.board();
        writeln!(
            self.out,
            "score red {} black {}",
            board.score(Color::Red),
            board.score(Color::Black)
        )
    }

    fn write_status(&mut self) -> std::io::Result<()> {
        let board = self.game.board();
        let result = match self.game.outcome() {
            GameOutcome::Ongoing => String::from("ongoing"),
            GameOutcome::Win(color) => format!("winner {color}"),
        };
        let blocked = if self.game.outcome() == GameOutcome::Ongoing && !has_legal_move(board) {
            " blocked"
        } else {
            ""
        };

        writeln!(
            self.out,
            "status turn {} red {} black {} {result}{blocked}",
            board.side_to_move,
            board.score(Color::Red),
            board.score(Color::Black)
        )
    }
}

fn parse_numbers<T: std::str::FromStr>(args: &str, count: usize) -> Result<Vec<T>, String>
where
    T::Err: std::fmt::Display,
{
    let values = args
        .split_whitespace()
        .map(|v| v.parse::<T>().map_err(|e| format!("'{v}' is not a number: {e}")))
        .collect::<Result<Vec<T>, String>>()?;

    if values.len() != count {
        return Err(format!("expected {count} numbers but got {}", values.len()));
    }

    Ok(values)
}

fn parse_move_token(token: &str) -> Result<(Square, Square), String> {
    let Some(captures) = MOVE_PATTERN.captures(token) else {
        return Err(format!("'{token}' is not a move like 5,0-4,1"));
    };

    let digit = |i: usize| captures[i].as_bytes()[0] - b'0';

    Ok((
        Square {
            row: digit(1),
            col: digit(2),
        },
        Square {
            row: digit(3),
            col: digit(4),
        },
    ))
}
