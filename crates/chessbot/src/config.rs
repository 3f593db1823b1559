//! Engine configuration, loaded from TOML.
//!
//! ```toml
//! depth = 4
//! move_time_ms = 2000
//! parallel = false
//! weights_path = "weights.json"
//!
//! [book]
//! format = "binary"
//! path = "book.bin"
//! policy = { kind = "varied", probability = 0.1, top = 3 }
//! seed = 7
//! ```
//!
//! Every field is optional; missing fields take their defaults.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::book::BookPolicy;
use crate::error::ConfigError;
use crate::search::SearchOptions;
use crate::time_control::{MAX_DEPTH, SearchLimits};

/// On-disk format of an opening book.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookFormat {
    /// 16-byte big-endian records sorted by key
    Binary,
    /// TOML lines and positions
    Table,
    /// The repertoire compiled into the crate; `path` is ignored
    #[default]
    Builtin,
}

impl BookFormat {
    /// Guess the format from a file extension: `.toml` is a table book,
    /// anything else binary.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => BookFormat::Table,
            _ => BookFormat::Binary,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BookConfig {
    pub enabled: bool,
    pub format: BookFormat,
    pub path: Option<PathBuf>,
    pub policy: BookPolicy,
    /// Seed for the book's random choices.
    pub seed: u64,
}

impl Default for BookConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            format: BookFormat::Builtin,
            path: None,
            policy: BookPolicy::BestWeight,
            seed: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Search depth in plies
    pub depth: u8,
    /// Time budget per move; unset searches to `depth` regardless of time
    pub move_time_ms: Option<u64>,
    pub move_ordering: bool,
    pub parallel: bool,
    /// Evaluation weights written by the trainer; defaults when unset
    pub weights_path: Option<PathBuf>,
    pub book: BookConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            depth: 4,
            move_time_ms: None,
            move_ordering: true,
            parallel: false,
            weights_path: None,
            book: BookConfig::default(),
        }
    }
}

impl EngineConfig {
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.depth == 0 {
            return Err(ConfigError::Invalid("depth must be at least 1".to_string()));
        }
        if self.depth > MAX_DEPTH {
            return Err(ConfigError::Invalid(format!(
                "depth {} exceeds the maximum of {MAX_DEPTH}",
                self.depth
            )));
        }
        if let BookPolicy::Varied { probability, top } = self.book.policy {
            if !(0.0..=1.0).contains(&probability) {
                return Err(ConfigError::Invalid(format!(
                    "book variation probability {probability} is outside 0..=1"
                )));
            }
            if top == 0 {
                return Err(ConfigError::Invalid(
                    "book variation needs at least one candidate".to_string(),
                ));
            }
        }
        Ok(())
    }

    pub fn search_limits(&self) -> SearchLimits {
        match self.move_time_ms {
            Some(ms) => SearchLimits::depth_and_time(self.depth, Duration::from_millis(ms)),
            None => SearchLimits::depth(self.depth),
        }
    }

    pub fn search_options(&self) -> SearchOptions {
        SearchOptions {
            move_ordering: self.move_ordering,
            parallel: self.parallel,
        }
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod config_tests;
