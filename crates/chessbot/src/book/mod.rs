//! Opening books: position key to weighted candidate moves.
//!
//! Books are looked up before any search. A hit returns candidates that are
//! all legal in the position, ordered by weight; a miss returns nothing and
//! the caller falls back to search.

mod binary;
mod key;
mod table;

pub use binary::{BinaryBook, RECORD_SIZE, RawEntry, write_binary_book};
pub use key::{book_key, decode_move, encode_move};
pub use table::{GameOutcome, TableBook};

use std::cmp::Reverse;

use cozy_chess::{Board, Move};
use rand::Rng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

use crate::config::{BookConfig, BookFormat};
use crate::error::BookError;
use crate::rules::Rules;

/// A legal move suggested by a book.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BookMove {
    pub mv: Move,
    pub weight: u16,
}

/// Source of opening moves.
pub trait OpeningBook: Send + Sync {
    /// Candidates for `board`, highest weight first (ties keep book order).
    /// Empty when the position is not in the book.
    fn lookup(&self, board: &Board) -> Vec<BookMove>;
}

/// A book that never has a move.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmptyBook;

impl OpeningBook for EmptyBook {
    fn lookup(&self, _board: &Board) -> Vec<BookMove> {
        Vec::new()
    }
}

/// Turn stored `(code, weight)` pairs into legal candidates.
///
/// Codes that do not match a legal move are dropped. A move listed twice
/// keeps its highest weight.
pub(crate) fn resolve_candidates(
    board: &Board,
    stored: impl IntoIterator<Item = (u16, u16)>,
) -> Vec<BookMove> {
    let legal = board.legal_moves();
    let mut candidates: Vec<BookMove> = stored
        .into_iter()
        .filter_map(|(code, weight)| decode_move(code, &legal).map(|mv| BookMove { mv, weight }))
        .collect();
    candidates.sort_by_key(|candidate| Reverse(candidate.weight));

    let mut seen = Vec::with_capacity(candidates.len());
    candidates.retain(|candidate| {
        if seen.contains(&candidate.mv) {
            false
        } else {
            seen.push(candidate.mv);
            true
        }
    });
    candidates
}

// =============================================================================
// Selection
// =============================================================================

/// How to pick one move among book candidates.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BookPolicy {
    /// Always the highest weight; the first listed on ties.
    #[default]
    BestWeight,
    /// Sample proportionally to weight.
    Weighted,
    /// With `probability`, sample by weight among the `top` best candidates;
    /// otherwise play the best.
    Varied { probability: f64, top: usize },
}

impl BookPolicy {
    /// The occasional variation of the classic bot: 10% of the time, one of
    /// the three heaviest moves.
    pub fn classic_variation() -> Self {
        BookPolicy::Varied {
            probability: 0.1,
            top: 3,
        }
    }
}

/// Pick a candidate according to `policy`. `None` only for an empty slice.
pub fn select<R: Rng + ?Sized>(
    candidates: &[BookMove],
    policy: BookPolicy,
    rng: &mut R,
) -> Option<BookMove> {
    let best = *candidates.first()?;
    let chosen = match policy {
        BookPolicy::BestWeight => best,
        BookPolicy::Weighted => sample(candidates, rng).unwrap_or(best),
        BookPolicy::Varied { probability, top } => {
            let probability = if probability.is_nan() {
                0.0
            } else {
                probability.clamp(0.0, 1.0)
            };
            if rng.gen_bool(probability) {
                let top = top.clamp(1, candidates.len());
                sample(&candidates[..top], rng).unwrap_or(best)
            } else {
                best
            }
        }
    };
    Some(chosen)
}

/// `None` when every weight is zero.
fn sample<R: Rng + ?Sized>(candidates: &[BookMove], rng: &mut R) -> Option<BookMove> {
    candidates
        .choose_weighted(rng, |candidate| u32::from(candidate.weight))
        .ok()
        .copied()
}

// =============================================================================
// Loading
// =============================================================================

/// What became of the configured book.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BookStatus {
    Disabled,
    Loaded { format: BookFormat },
    /// The book could not be opened; lookups always miss.
    Unavailable { reason: String },
}

impl BookStatus {
    pub fn is_loaded(&self) -> bool {
        matches!(self, BookStatus::Loaded { .. })
    }
}

/// Open the book described by `config`, ignoring `config.enabled`.
pub fn load_book(config: &BookConfig) -> Result<Box<dyn OpeningBook>, BookError> {
    match (config.format, &config.path) {
        (BookFormat::Builtin, _) => Ok(Box::new(TableBook::builtin()?)),
        (BookFormat::Binary, Some(path)) => Ok(Box::new(BinaryBook::open(path)?)),
        (BookFormat::Table, Some(path)) => Ok(Box::new(TableBook::load(path)?)),
        (format, None) => Err(BookError::MissingPath { format }),
    }
}
