mod uci;

use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use chessbot::{Board, ChessBot, EngineConfig, TableBook, move_to_uci, write_binary_book};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::uci::{UciSession, info_line};

#[derive(Parser, Debug)]
#[command(name = "chessbot", version, about = "Opening book plus alpha-beta chess engine")]
struct Cli {
    /// Engine configuration (TOML)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Speak UCI on stdin/stdout (the default)
    Uci,
    /// Print the chosen move for one position and exit
    Bestmove {
        /// Position to analyse; the start position when omitted
        #[arg(long)]
        fen: Option<String>,
        /// Search depth, overriding the configuration
        #[arg(long)]
        depth: Option<u8>,
        /// Skip the opening book
        #[arg(long)]
        no_book: bool,
    },
    /// Compile a TOML table book (or the built-in lines) into a binary book
    BuildBook {
        /// Table book to compile; the built-in repertoire when omitted
        #[arg(long)]
        input: Option<PathBuf>,
        output: PathBuf,
    },
}

fn main() -> Result<()> {
    // stdout belongs to the UCI protocol
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => EngineConfig::load(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => EngineConfig::default(),
    };

    match cli.command.unwrap_or(Command::Uci) {
        Command::Uci => {
            let bot = ChessBot::new(config).context("starting engine")?;
            let mut session = UciSession::new(bot);
            let stdin = io::stdin();
            let mut stdout = io::stdout();
            session.run(stdin.lock(), &mut stdout)?;
        }
        Command::Bestmove { fen, depth, no_book } => {
            let board = match fen {
                Some(fen) => match Board::from_fen(&fen, false) {
                    Ok(board) => board,
                    Err(err) => bail!("invalid FEN {fen:?}: {err:?}"),
                },
                None => Board::default(),
            };
            let mut limits = config.search_limits();
            if let Some(depth) = depth {
                limits.depth = depth;
            }
            let use_book = config.book.enabled && !no_book;

            let mut bot = ChessBot::new(config).context("starting engine")?;
            let weights = bot.weights().clone();
            let result = bot.choose_move_with_limits(&board, &limits, &weights, use_book)?;

            let mut stdout = io::stdout();
            writeln!(stdout, "{}", info_line(&result))?;
            writeln!(stdout, "bestmove {}", move_to_uci(&board, result.best_move))?;
        }
        Command::BuildBook { input, output } => {
            let book = match &input {
                Some(path) => TableBook::load(path)?,
                None => TableBook::builtin()?,
            };
            let entries = book.entries();
            write_binary_book(&output, &entries)
                .with_context(|| format!("writing {}", output.display()))?;
            info!(
                positions = book.len(),
                records = entries.len(),
                output = %output.display(),
                "binary book written"
            );
        }
    }
    Ok(())
}
