//! In-memory opening book, loaded from TOML or built from opening lines.
//!
//! ```toml
//! [[line]]
//! moves = ["e2e4", "e7e5", "g1f3"]
//! base_weight = 100
//! decay = 10
//!
//! [[position]]
//! fen = "rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b KQkq - 0 1"
//! moves = [{ uci = "c7c5", weight = 80 }]
//! ```

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use cozy_chess::{Board, Color, Move};
use serde::Deserialize;

use super::binary::RawEntry;
use super::key::{book_key, encode_move};
use super::{BookMove, OpeningBook, resolve_candidates};
use crate::error::BookError;
use crate::rules::{Rules, parse_uci_move};

/// Hand-curated main lines, in UCI notation from the start position.
const BUILTIN_LINES: &[&[&str]] = &[
    &["e2e4"],
    &["d2d4"],
    &["c2c4"],
    &["g1f3"],
    &["e2e4", "e7e5"],
    &["e2e4", "c7c5"],
    &["e2e4", "e7e6"],
    &["e2e4", "c7c6"],
    &["d2d4", "d7d5"],
    &["d2d4", "g8f6"],
    &["d2d4", "f7f5"],
    &["d2d4", "e7e6"],
    // Ruy Lopez
    &["e2e4", "e7e5", "g1f3", "b8c6", "f1b5"],
    // Italian
    &["e2e4", "e7e5", "g1f3", "b8c6", "f1c4"],
    // Queen's Gambit
    &["d2d4", "d7d5", "c2c4"],
    // Reti
    &["g1f3", "d7d5", "c2c4"],
    // English
    &["c2c4", "e7e5"],
];

const DEFAULT_BASE_WEIGHT: u16 = 100;
const DEFAULT_DECAY: u16 = 10;

/// Result of a finished game, for book reinforcement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameOutcome {
    WhiteWins,
    BlackWins,
    Draw,
}

impl GameOutcome {
    /// Weight adjustment for moves played by `player`.
    pub fn reward(self, player: Color) -> i32 {
        match (self, player) {
            (GameOutcome::Draw, _) => 0,
            (GameOutcome::WhiteWins, Color::White) | (GameOutcome::BlackWins, Color::Black) => 5,
            _ => -5,
        }
    }
}

#[derive(Debug, Deserialize)]
struct TableFile {
    #[serde(default)]
    line: Vec<LineSpec>,
    #[serde(default)]
    position: Vec<PositionSpec>,
}

#[derive(Debug, Deserialize)]
struct LineSpec {
    moves: Vec<String>,
    #[serde(default = "default_base_weight")]
    base_weight: u16,
    #[serde(default = "default_decay")]
    decay: u16,
}

#[derive(Debug, Deserialize)]
struct PositionSpec {
    fen: String,
    moves: Vec<MoveSpec>,
}

#[derive(Debug, Deserialize)]
struct MoveSpec {
    uci: String,
    weight: u16,
}

fn default_base_weight() -> u16 {
    DEFAULT_BASE_WEIGHT
}

fn default_decay() -> u16 {
    DEFAULT_DECAY
}

/// Opening book held in a hash map from book key to move codes and weights.
#[derive(Debug, Clone, Default)]
pub struct TableBook {
    positions: HashMap<u64, Vec<(u16, u16)>>,
}

impl TableBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// The built-in repertoire: every line with weight 100 at its first
    /// move, falling by 10 per ply.
    pub fn builtin() -> Result<Self, BookError> {
        let mut book = Self::new();
        for line in BUILTIN_LINES {
            book.add_line(line, DEFAULT_BASE_WEIGHT, DEFAULT_DECAY)?;
        }
        Ok(book)
    }

    pub fn from_toml_str(text: &str) -> Result<Self, BookError> {
        let spec: TableFile = toml::from_str(text)?;
        let mut book = Self::new();

        for line in &spec.line {
            let moves: Vec<&str> = line.moves.iter().map(String::as_str).collect();
            book.add_line(&moves, line.base_weight, line.decay)?;
        }

        for position in &spec.position {
            let board = Board::from_fen(&position.fen, false).map_err(|_| BookError::InvalidFen {
                fen: position.fen.clone(),
            })?;
            for entry in &position.moves {
                let mv = parse_uci_move(&board, &entry.uci).ok_or_else(|| BookError::IllegalMove {
                    uci: entry.uci.clone(),
                    ply: 0,
                    context: position.fen.clone(),
                })?;
                book.insert(&board, mv, entry.weight);
            }
        }

        Ok(book)
    }

    pub fn load(path: &Path) -> Result<Self, BookError> {
        let text = fs::read_to_string(path).map_err(|source| BookError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// Add a candidate move. A move already listed keeps the larger weight.
    pub fn insert(&mut self, board: &Board, mv: Move, weight: u16) {
        let code = encode_move(mv);
        let moves = self.positions.entry(book_key(board)).or_default();
        match moves.iter_mut().find(|(existing, _)| *existing == code) {
            Some(entry) => entry.1 = entry.1.max(weight),
            None => moves.push((code, weight)),
        }
    }

    /// Add every position along `moves` (UCI, from the start position). The
    /// move at ply `i` gets `base_weight - i * decay`, never less than 1.
    pub fn add_line(&mut self, moves: &[&str], base_weight: u16, decay: u16) -> Result<(), BookError> {
        let mut board = Board::default();
        for (ply, uci) in moves.iter().enumerate() {
            let mv = parse_uci_move(&board, uci).ok_or_else(|| BookError::IllegalMove {
                uci: uci.to_string(),
                ply,
                context: moves.join(" "),
            })?;
            let fade = u16::try_from(ply).unwrap_or(u16::MAX).saturating_mul(decay);
            self.insert(&board, mv, base_weight.saturating_sub(fade).max(1));
            board.play_unchecked(mv);
        }
        Ok(())
    }

    /// Number of positions in the book.
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Records for the binary writer, sorted by key.
    pub fn entries(&self) -> Vec<RawEntry> {
        let mut keys: Vec<u64> = self.positions.keys().copied().collect();
        keys.sort_unstable();
        keys.into_iter()
            .flat_map(|key| {
                self.positions[&key].iter().map(move |&(mv, weight)| RawEntry {
                    key,
                    mv,
                    weight,
                    learn: 0,
                })
            })
            .collect()
    }

    /// A copy of this book with the weights of `player`'s book moves in
    /// `moves` raised by 5 after a win or lowered by 5 after a loss (never
    /// below 1). The walk starts from the initial position and stops where
    /// the game leaves the book.
    pub fn reinforced(&self, moves: &[Move], outcome: GameOutcome, player: Color) -> TableBook {
        let reward = outcome.reward(player);
        let mut book = self.clone();
        let mut board = Board::default();

        for &mv in moves {
            if !board.legal_moves().contains(&mv) {
                break;
            }
            let code = encode_move(mv);
            let Some(entry) = book
                .positions
                .get_mut(&book_key(&board))
                .and_then(|entries| entries.iter_mut().find(|(existing, _)| *existing == code))
            else {
                break;
            };
            if board.side_to_move() == player {
                entry.1 = (i32::from(entry.1) + reward).clamp(1, i32::from(u16::MAX)) as u16;
            }
            board.play_unchecked(mv);
        }

        book
    }
}

impl OpeningBook for TableBook {
    fn lookup(&self, board: &Board) -> Vec<BookMove> {
        match self.positions.get(&book_key(board)) {
            Some(moves) => resolve_candidates(board, moves.iter().copied()),
            None => Vec::new(),
        }
    }
}

#[cfg(test)]
#[path = "table_tests.rs"]
mod table_tests;
