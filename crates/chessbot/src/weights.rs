//! Tunable evaluation coefficients.
//!
//! Weights are plain data so the self-play trainer can write them to JSON and
//! hand them back to the engine between games.

use std::fs;
use std::path::Path;

use cozy_chess::Piece;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Integer coefficients for every evaluation term, in centipawns.
///
/// The terms are colour-agnostic: the same weights score White's and Black's
/// features, so a position and its colour-flipped mirror evaluate to exact
/// negatives of each other.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvaluationWeights {
    pub pawn: i32,
    pub knight: i32,
    pub bishop: i32,
    pub rook: i32,
    pub queen: i32,
    /// Both sides always have exactly one king, so this only matters to
    /// callers inspecting the material breakdown.
    pub king: i32,
    pub bishop_pair: i32,
    /// Penalty per extra pawn on a file.
    pub doubled_pawn: i32,
    pub isolated_pawn: i32,
    /// Bonus for a passed pawn, indexed by rank from its own side.
    pub passed_pawn: [i32; 8],
    pub connected_pawn: i32,
    /// Bonus per shield pawn directly in front of the king; half for two ranks ahead.
    pub pawn_shield: i32,
    pub open_file_near_king: i32,
    pub lost_castling: i32,
    /// Per legal move of the side to move.
    pub mobility: i32,
}

impl Default for EvaluationWeights {
    fn default() -> Self {
        Self {
            pawn: 100,
            knight: 320,
            bishop: 330,
            rook: 500,
            queen: 900,
            king: 0,
            bishop_pair: 50,
            doubled_pawn: 10,
            isolated_pawn: 20,
            passed_pawn: [0, 5, 10, 20, 35, 60, 100, 0],
            connected_pawn: 5,
            pawn_shield: 10,
            open_file_near_king: 15,
            lost_castling: 20,
            mobility: 2,
        }
    }
}

impl EvaluationWeights {
    #[inline]
    pub fn piece_value(&self, piece: Piece) -> i32 {
        match piece {
            Piece::Pawn => self.pawn,
            Piece::Knight => self.knight,
            Piece::Bishop => self.bishop,
            Piece::Rook => self.rook,
            Piece::Queen => self.queen,
            Piece::King => self.king,
        }
    }

    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json_string(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Load weights from a JSON file. Missing fields keep their defaults.
    pub fn load_json(path: &Path) -> Result<Self, ConfigError> {
        let json = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&json)
    }

    pub fn save_json(&self, path: &Path) -> Result<(), ConfigError> {
        let json = self.to_json_string()?;
        fs::write(path, json).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })
    }
}
