use std::{
    io::{BufRead, stdin, stdout},
    path::{Path, PathBuf},
    process::exit,
    time::SystemTime,
};

use board::Board;
use clap::{Parser, Subcommand};
use log::{LevelFilter, error, info};
use protocol::ProtocolInterface;

mod board;
mod errors;
mod game;
mod move_generator;
mod moves;
mod perft;
mod protocol;

#[derive(Parser, Debug)]
#[command(version, about = "Checkers rules engine driven by text commands on stdin")]
struct Cli {
    /// Minimum level written to the log
    #[arg(long, default_value_t = LevelFilter::Info)]
    log_level: LevelFilter,

    /// Also write the log to this file
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Position string to start from instead of the standard setup
    #[arg(long)]
    position: Option<String>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Count move tree leaves from the session position and exit
    Perft {
        #[arg(long)]
        depth: u8,

        /// Print the node count below each root move
        #[arg(long)]
        divide: bool,
    },
}

fn main() {
    let cli = Cli::parse();

    if let Err(e) = setup_logger(cli.log_level, cli.log_file.as_deref()) {
        eprintln!("Failed to set up logging: {e}");
        exit(1);
    }
    log_panics::init();

    let mut board = match &cli.position {
        Some(position) => match Board::from_position_string(position) {
            Ok(b) => b,
            Err(err_msg) => {
                error!("Failed to parse position. Error message: {err_msg}. Position: {position}");
                exit(1);
            }
        },
        None => Board::default(),
    };

    match cli.command {
        Some(Command::Perft { depth, divide }) => {
            let stats = board.start_perft(depth);
            if divide {
                for (m, nodes) in &stats.divide {
                    println!("{} {nodes}", m.notation());
                }
                println!();
            }
            println!("{}", stats.nodes);
        }
        None => run_protocol(board),
    }
}

fn run_protocol(board: Board) {
    info!("Starting session from {}", board.to_position_string());
    let mut protocol = ProtocolInterface::new(board, stdout());

    for line in stdin().lock().lines() {
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                error!("Failed to read from stdin: {e}");
                break;
            }
        };

        match protocol.process_command(&line) {
            Ok(true) => {}
            Ok(false) => break,
            Err(e) => {
                error!("Failed to write to stdout: {e}");
                break;
            }
        }
    }

    info!("Session ended");
}

fn setup_logger(level: LevelFilter, log_file: Option<&Path>) -> Result<(), fern::InitError> {
    let mut dispatch = fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "[{} {} {}] {}",
                humantime::format_rfc3339_seconds(SystemTime::now()),
                record.level(),
                record.target(),
                message
            ))
        })
        .level(level)
        .chain(std::io::stderr());

    if let Some(path) = log_file {
        dispatch = dispatch.chain(fern::log_file(path)?);
    }

    dispatch.apply()?;
    Ok(())
}
