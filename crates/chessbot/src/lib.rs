pub mod book;
pub mod bot;
pub mod config;
pub mod error;
pub mod eval;
pub mod rules;
pub mod search;
pub mod time_control;
pub mod weights;

pub use book::{
    BinaryBook, BookMove, BookPolicy, BookStatus, EmptyBook, GameOutcome, OpeningBook, TableBook,
    book_key, load_book, write_binary_book,
};
pub use bot::ChessBot;
pub use config::{BookConfig, BookFormat, EngineConfig};
pub use error::{BookError, ConfigError, EngineError};
pub use eval::{Handcrafted, MATE_SCORE, MAX_EVAL, evaluate};
pub use rules::{Applied, DrawReason, MoveClass, Rules, Status, move_to_uci, parse_uci_move};
pub use search::{Evaluator, MoveSource, SearchOptions, SearchResult};
pub use time_control::{SearchLimits, TimeControl};
pub use weights::EvaluationWeights;

pub use cozy_chess::{Board, Color, Move};

// =============================================================================
// Engine trait, implemented by ChessBot and driven by the UCI front end
// =============================================================================

/// Trait for anything that can pick a move for a position.
///
/// The UCI loop only talks to this trait, so alternative move pickers can be
/// plugged in without touching the protocol code.
pub trait Engine: Send {
    /// Search the position with the given limits.
    ///
    /// # Arguments
    /// * `board` - The position to analyze; never mutated
    /// * `limits` - Search limits (depth, time)
    ///
    /// # Returns
    /// The chosen move with score and statistics, or `NoLegalMoves`.
    fn search(&mut self, board: &Board, limits: &SearchLimits) -> Result<SearchResult, EngineError>;

    /// Returns the engine's name for UCI identification
    fn name(&self) -> &str;

    /// Returns the engine's author for UCI identification
    fn author(&self) -> &str {
        "ML-chess"
    }

    /// Limits used when the GUI sends `go` without any.
    fn default_limits(&self) -> SearchLimits {
        SearchLimits::default()
    }

    /// Reset per-game state (book randomness, statistics).
    fn new_game(&mut self) {}

    /// Optional: Set a UCI option. Returns true if the option was recognized.
    fn set_option(&mut self, _name: &str, _value: &str) -> bool {
        false
    }
}
