use std::time::Instant;

use log::info;
use num_format::{Locale, ToFormattedString};

use crate::{
    board::Board,
    move_generator::generate_moves,
    moves::{Move, MoveRollback},
};

impl Board {
    /// Counts the leaves of the move tree `depth` plies deep. The board is left as it was found.
    pub fn start_perft(&mut self, depth: u8) -> PerftStats {
        let mut rollback = MoveRollback::default();
        let mut stats = PerftStats::default();

        let start_time = Instant::now();
        do_perft(depth, 1, self, &mut rollback, &mut stats);
        let elapsed = start_time.elapsed();

        let nps = stats.nodes as f64 / elapsed.as_secs_f64();
        info!(
            "depth {depth} in {elapsed:#?}. Nodes: {}. Nodes per second: {}",
            stats.nodes.to_formatted_string(&Locale::en),
            (nps as u64).to_formatted_string(&Locale::en)
        );
        info!(
            "captures: {} promotions: {} wins: {}",
            stats.captures, stats.promotions, stats.wins
        );
        assert!(rollback.is_empty());

        stats
    }
}

#[derive(Debug, Default)]
pub struct PerftStats {
    pub nodes: u64,
    pub captures: u64,
    pub promotions: u64,
    pub wins: u64,
    /// Node count below each root move
    pub divide: Vec<(Move, u64)>,
}

fn do_perft(draft: u8, ply: u8, board: &mut Board, rollback: &mut MoveRollback, stats: &mut PerftStats) {
    if draft == 0 {
        stats.nodes += 1;
        return;
    }

    let moves = generate_moves(board);
    if moves.is_empty() {
        // Won or blocked positions end the line early
        stats.nodes += 1;
        return;
    }

    for r#move in &moves {
        board.make_move(r#move, rollback);

        if draft == 1 {
            check_perft_stats(r#move, board, stats);
        }

        let start_nodes = stats.nodes;
        do_perft(draft - 1, ply + 1, board, rollback, stats);

        if ply == 1 {
            stats.divide.push((*r#move, stats.nodes - start_nodes));
        }

        board.unmake_move(r#move, rollback);
    }
}

fn check_perft_stats(r#move: &Move, board: &Board, stats: &mut PerftStats) {
    if r#move.is_capture() {
        stats.captures += 1;
    }

    if r#move.is_promotion() {
        stats.promotions += 1;
    }

    if board.winner().is_some() {
        stats.wins += 1;
    }
}
