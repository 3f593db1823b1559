//! The move-decision facade: opening book first, then alpha-beta search.

use std::path::PathBuf;

use cozy_chess::{Board, Color};
use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing::{debug, info, warn};

use crate::Engine;
use crate::book::{BookStatus, EmptyBook, OpeningBook, load_book, select};
use crate::config::{BookFormat, EngineConfig};
use crate::error::{ConfigError, EngineError};
use crate::eval::{Handcrafted, evaluate};
use crate::rules::has_legal_moves;
use crate::search::{MoveSource, SearchResult, search};
use crate::time_control::{MAX_DEPTH, SearchLimits};
use crate::weights::EvaluationWeights;

/// Chess bot combining an opening book with a hand-crafted evaluation and
/// alpha-beta search.
///
/// Every call borrows the caller's board immutably and searches a private
/// copy, so the caller's position is never touched.
pub struct ChessBot {
    config: EngineConfig,
    weights: EvaluationWeights,
    book: Box<dyn OpeningBook>,
    book_status: BookStatus,
    rng: StdRng,
}

impl ChessBot {
    /// Build a bot from configuration.
    ///
    /// Weights that fail to load are an error. A book that fails to load is
    /// not: the bot logs a warning, reports [`BookStatus::Unavailable`] and
    /// always searches.
    pub fn new(config: EngineConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let weights = match &config.weights_path {
            Some(path) => {
                let weights = EvaluationWeights::load_json(path)?;
                info!(path = %path.display(), "loaded evaluation weights");
                weights
            }
            None => EvaluationWeights::default(),
        };

        let mut bot = Self::with_book(config, weights, Box::new(EmptyBook));
        bot.reload_book();
        Ok(bot)
    }

    /// Build a bot around an already opened book.
    pub fn with_book(config: EngineConfig, weights: EvaluationWeights, book: Box<dyn OpeningBook>) -> Self {
        let rng = StdRng::seed_from_u64(config.book.seed);
        let book_status = if config.book.enabled {
            BookStatus::Loaded {
                format: config.book.format,
            }
        } else {
            BookStatus::Disabled
        };
        Self {
            config,
            weights,
            book,
            book_status,
            rng,
        }
    }

    /// Replace the random source used for book choices.
    pub fn with_rng(mut self, rng: StdRng) -> Self {
        self.rng = rng;
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn weights(&self) -> &EvaluationWeights {
        &self.weights
    }

    /// Swap in new weights between games.
    pub fn set_weights(&mut self, weights: EvaluationWeights) {
        self.weights = weights;
    }

    pub fn book_status(&self) -> &BookStatus {
        &self.book_status
    }

    /// Open the configured book again, recording the outcome in
    /// [`book_status`](Self::book_status).
    pub fn reload_book(&mut self) {
        if !self.config.book.enabled {
            self.book = Box::new(EmptyBook);
            self.book_status = BookStatus::Disabled;
            return;
        }
        match load_book(&self.config.book) {
            Ok(book) => {
                info!(format = ?self.config.book.format, "opening book loaded");
                self.book = book;
                self.book_status = BookStatus::Loaded {
                    format: self.config.book.format,
                };
            }
            Err(err) => {
                warn!(error = %err, "opening book unavailable, falling back to search");
                self.book = Box::new(EmptyBook);
                self.book_status = BookStatus::Unavailable {
                    reason: err.to_string(),
                };
            }
        }
    }

    /// Choose a move for `board`.
    ///
    /// With `book_enabled`, a book hit is returned directly. Otherwise, or on
    /// a miss, the position is searched `max_depth` plies deep (0 counts as 1)
    /// with `weights`.
    pub fn choose_move(
        &mut self,
        board: &Board,
        max_depth: u8,
        weights: &EvaluationWeights,
        book_enabled: bool,
    ) -> Result<SearchResult, EngineError> {
        self.choose_move_with_limits(board, &SearchLimits::depth(max_depth), weights, book_enabled)
    }

    /// Like [`choose_move`](Self::choose_move) with an optional time budget.
    pub fn choose_move_with_limits(
        &mut self,
        board: &Board,
        limits: &SearchLimits,
        weights: &EvaluationWeights,
        book_enabled: bool,
    ) -> Result<SearchResult, EngineError> {
        if !has_legal_moves(board) {
            return Err(EngineError::NoLegalMoves);
        }

        if book_enabled {
            if let Some(result) = self.book_move(board, weights) {
                return Ok(result);
            }
        }

        let evaluator = Handcrafted::new(weights);
        search(board, &evaluator, limits, self.config.search_options())
    }

    /// Pick a book move for `board`, if the book knows the position.
    pub fn book_move(&mut self, board: &Board, weights: &EvaluationWeights) -> Option<SearchResult> {
        let candidates = self.book.lookup(board);
        let chosen = select(&candidates, self.config.book.policy, &mut self.rng)?;
        debug!(
            mv = %chosen.mv,
            weight = chosen.weight,
            candidates = candidates.len(),
            "book hit"
        );

        let side = board.side_to_move();
        let white_score = evaluate(board, weights);
        Some(SearchResult {
            best_move: chosen.mv,
            score: match side {
                Color::White => white_score,
                Color::Black => -white_score,
            },
            side,
            depth: 0,
            nodes: 0,
            stopped: false,
            source: MoveSource::Book {
                weight: chosen.weight,
            },
        })
    }
}

impl Engine for ChessBot {
    fn search(&mut self, board: &Board, limits: &SearchLimits) -> Result<SearchResult, EngineError> {
        let weights = self.weights.clone();
        let book_enabled = self.config.book.enabled;
        self.choose_move_with_limits(board, limits, &weights, book_enabled)
    }

    fn name(&self) -> &str {
        concat!("ChessBot ", env!("CARGO_PKG_VERSION"))
    }

    fn default_limits(&self) -> SearchLimits {
        self.config.search_limits()
    }

    fn new_game(&mut self) {
        self.rng = StdRng::seed_from_u64(self.config.book.seed);
    }

    fn set_option(&mut self, name: &str, value: &str) -> bool {
        match name.to_ascii_lowercase().as_str() {
            "depth" => match value.trim().parse::<u8>() {
                Ok(depth) => {
                    self.config.depth = depth.clamp(1, MAX_DEPTH);
                    true
                }
                Err(_) => false,
            },
            "ownbook" => match value.trim().parse::<bool>() {
                Ok(enabled) => {
                    self.config.book.enabled = enabled;
                    self.reload_book();
                    true
                }
                Err(_) => false,
            },
            "bookfile" => {
                let path = PathBuf::from(value.trim());
                self.config.book.format = BookFormat::from_path(&path);
                self.config.book.path = Some(path);
                self.reload_book();
                true
            }
            "moveordering" => match value.trim().parse::<bool>() {
                Ok(enabled) => {
                    self.config.move_ordering = enabled;
                    true
                }
                Err(_) => false,
            },
            "parallel" => match value.trim().parse::<bool>() {
                Ok(enabled) => {
                    self.config.parallel = enabled;
                    true
                }
                Err(_) => false,
            },
            _ => false,
        }
    }
}

#[cfg(test)]
#[path = "bot_tests.rs"]
mod bot_tests;
