//! Error types for the engine, the opening books and configuration loading.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::config::BookFormat;

/// Failures of a single move decision.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("no legal moves in the given position")]
    NoLegalMoves,

    /// Undoing a move did not restore the position it was applied to.
    #[error("position invariant violated: {detail}")]
    InvariantViolation { detail: String },
}

/// Failures while loading or writing an opening book.
#[derive(Debug, Error)]
pub enum BookError {
    #[error("cannot access opening book {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("opening book {} is corrupt: {reason}", .path.display())]
    Corrupt { path: PathBuf, reason: String },

    #[error("invalid table book: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid FEN {fen:?} in table book")]
    InvalidFen { fen: String },

    #[error("move {uci:?} is not legal at ply {ply} of {context}")]
    IllegalMove {
        uci: String,
        ply: usize,
        context: String,
    },

    #[error("{format:?} book requires a path")]
    MissingPath { format: BookFormat },
}

/// Failures while loading configuration or evaluation weights.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot access {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid config: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("invalid weights: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}
