//! UCI protocol loop over any [`Engine`].

use std::io::{self, BufRead, Write};
use std::time::Duration;

use chessbot::time_control::MAX_DEPTH;
use chessbot::{
    Board, Color, Engine, EngineError, MATE_SCORE, SearchLimits, SearchResult, move_to_uci,
    parse_uci_move,
};
use tracing::{debug, warn};

/// Share of the remaining clock spent on one move when the GUI sends
/// `wtime`/`btime` without `movetime`.
const CLOCK_DIVISOR: u64 = 30;

/// Protocol state: the engine and the position set by the last `position`.
pub struct UciSession<E: Engine> {
    engine: E,
    board: Board,
}

impl<E: Engine> UciSession<E> {
    pub fn new(engine: E) -> Self {
        Self {
            engine,
            board: Board::default(),
        }
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    /// Read commands until `quit` or end of input.
    pub fn run<R: BufRead, W: Write>(&mut self, input: R, out: &mut W) -> io::Result<()> {
        for line in input.lines() {
            if !self.handle_line(&line?, out)? {
                break;
            }
        }
        Ok(())
    }

    /// Handle one command line. Returns `false` on `quit`.
    pub fn handle_line<W: Write>(&mut self, line: &str, out: &mut W) -> io::Result<bool> {
        let parts: Vec<&str> = line.split_whitespace().collect();
        let Some((&command, args)) = parts.split_first() else {
            return Ok(true);
        };

        match command {
            "uci" => {
                writeln!(out, "id name {}", self.engine.name())?;
                writeln!(out, "id author {}", self.engine.author())?;
                let depth = self.engine.default_limits().depth;
                writeln!(out, "option name Depth type spin default {depth} min 1 max {MAX_DEPTH}")?;
                writeln!(out, "option name OwnBook type check default true")?;
                writeln!(out, "option name BookFile type string default <builtin>")?;
                writeln!(out, "option name MoveOrdering type check default true")?;
                writeln!(out, "option name Parallel type check default false")?;
                writeln!(out, "uciok")?;
            }
            "isready" => writeln!(out, "readyok")?,
            "ucinewgame" => {
                self.board = Board::default();
                self.engine.new_game();
            }
            "setoption" => self.set_option(args),
            "position" => self.set_position(args),
            "go" => {
                let limits = self.go_limits(args);
                self.go(&limits, out)?;
            }
            "quit" => return Ok(false),
            other => debug!(command = other, "ignoring unknown command"),
        }
        out.flush()?;
        Ok(true)
    }

    /// `setoption name <name...> value <value...>`
    fn set_option(&mut self, args: &[&str]) {
        let Some(name_start) = args.iter().position(|&word| word == "name") else {
            return;
        };
        let value_at = args.iter().position(|&word| word == "value");
        let name_end = value_at.unwrap_or(args.len());
        if name_end <= name_start {
            return;
        }
        let name = args[name_start + 1..name_end].join(" ");
        let value = value_at.map(|at| args[at + 1..].join(" ")).unwrap_or_default();

        if !self.engine.set_option(&name, &value) {
            warn!(%name, %value, "unsupported option");
        }
    }

    /// `position (startpos | fen <fen>) [moves <uci>...]`
    ///
    /// An unparsable FEN leaves the current position unchanged; an illegal
    /// move stops applying the rest of the list.
    fn set_position(&mut self, args: &[&str]) {
        let moves_at = args.iter().position(|&word| word == "moves");
        let setup = &args[..moves_at.unwrap_or(args.len())];

        let mut board = match setup.split_first() {
            Some((&"startpos", _)) => Board::default(),
            Some((&"fen", fields)) => {
                let fen = fields.join(" ");
                match Board::from_fen(&fen, false) {
                    Ok(board) => board,
                    Err(err) => {
                        warn!(%fen, error = ?err, "invalid FEN");
                        return;
                    }
                }
            }
            _ => {
                warn!("position needs startpos or fen");
                return;
            }
        };

        if let Some(at) = moves_at {
            for text in &args[at + 1..] {
                match parse_uci_move(&board, text) {
                    Some(mv) => board.play_unchecked(mv),
                    None => {
                        warn!(uci = %text, "illegal move in position command");
                        break;
                    }
                }
            }
        }
        self.board = board;
    }

    /// Turn `go` arguments into limits. Anything missing comes from the
    /// engine's defaults; a time budget without `depth` lifts the depth cap.
    fn go_limits(&self, args: &[&str]) -> SearchLimits {
        let mut limits = self.engine.default_limits();
        let mut depth: Option<u8> = None;
        let mut move_time: Option<u64> = None;
        let mut clock: Option<u64> = None;
        let mut increment: u64 = 0;
        let white = self.board.side_to_move() == Color::White;

        let number = |at: usize| args.get(at + 1).and_then(|text| text.parse::<u64>().ok());
        for (at, &word) in args.iter().enumerate() {
            match word {
                "depth" => depth = number(at).map(|d| d.clamp(1, u64::from(MAX_DEPTH)) as u8),
                "movetime" => move_time = number(at),
                "wtime" if white => clock = number(at),
                "btime" if !white => clock = number(at),
                "winc" if white => increment = number(at).unwrap_or(0),
                "binc" if !white => increment = number(at).unwrap_or(0),
                "infinite" => limits.move_time = None,
                _ => {}
            }
        }

        let budget = move_time.or_else(|| {
            clock.map(|remaining| (remaining / CLOCK_DIVISOR + increment / 2).max(1))
        });
        if let Some(ms) = budget {
            limits.move_time = Some(Duration::from_millis(ms));
            limits.depth = MAX_DEPTH;
        }
        if let Some(depth) = depth {
            limits.depth = depth;
        }
        limits
    }

    fn go<W: Write>(&mut self, limits: &SearchLimits, out: &mut W) -> io::Result<()> {
        match self.engine.search(&self.board, limits) {
            Ok(result) => {
                writeln!(out, "{}", info_line(&result))?;
                writeln!(out, "bestmove {}", move_to_uci(&self.board, result.best_move))?;
            }
            Err(EngineError::NoLegalMoves) => writeln!(out, "bestmove 0000")?,
            Err(err) => {
                warn!(error = %err, "search failed");
                writeln!(out, "info string search failed: {err}")?;
                writeln!(out, "bestmove 0000")?;
            }
        }
        Ok(())
    }
}

/// `info depth .. score (cp|mate) .. nodes ..` for a finished search.
pub fn info_line(result: &SearchResult) -> String {
    let score = if result.is_mate() && result.depth > 0 {
        let remaining = result.score.abs() - MATE_SCORE;
        let plies = (i32::from(result.depth) - remaining).max(1);
        let moves = (plies + 1) / 2;
        format!("mate {}", if result.score > 0 { moves } else { -moves })
    } else {
        format!("cp {}", result.score)
    };
    format!(
        "info depth {} score {} nodes {}",
        result.depth, score, result.nodes
    )
}

#[cfg(test)]
#[path = "uci_tests.rs"]
mod uci_tests;
