//! Search limits and the shared stop flag.
//!
//! The clock is only consulted at node boundaries, every `check_interval`
//! nodes, so a search never stops in the middle of applying a move.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

/// Deepest search the engine will attempt.
pub const MAX_DEPTH: u8 = 64;

/// Search limits that control when an engine should stop searching.
///
/// Without `move_time` the engine searches exactly `depth` plies. With it,
/// the engine deepens from 1 towards `depth` and keeps the deepest iteration
/// that finished before the budget ran out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchLimits {
    /// Maximum search depth in plies (half-moves)
    pub depth: u8,
    /// Maximum time allowed for this move (None = no budget)
    pub move_time: Option<Duration>,
}

impl SearchLimits {
    /// Create limits with only depth constraint (no time limit).
    pub fn depth(depth: u8) -> Self {
        Self {
            depth,
            move_time: None,
        }
    }

    /// Create limits with both depth and time constraints.
    pub fn depth_and_time(depth: u8, move_time: Duration) -> Self {
        Self {
            depth,
            move_time: Some(move_time),
        }
    }

    /// Create limits with only time constraint.
    pub fn time(move_time: Duration) -> Self {
        Self::depth_and_time(MAX_DEPTH, move_time)
    }

    /// Depth actually searched: zero is treated as one, and anything above
    /// [`MAX_DEPTH`] is capped.
    pub fn effective_depth(&self) -> u8 {
        self.depth.clamp(1, MAX_DEPTH)
    }
}

impl Default for SearchLimits {
    fn default() -> Self {
        Self::depth(4)
    }
}

/// Thread-safe time controller that tracks whether search should stop.
///
/// Clones share the stop flag, so parallel root workers all see a stop
/// raised by any one of them.
#[derive(Debug, Clone)]
pub struct TimeControl {
    stopped: Arc<AtomicBool>,
    started: Instant,
    time_limit: Option<Duration>,
    /// How often to check the clock (in nodes).
    check_interval: u64,
}

impl TimeControl {
    /// Start a clock for one search. `None` never expires.
    pub fn start(time_limit: Option<Duration>) -> Self {
        Self {
            stopped: Arc::new(AtomicBool::new(false)),
            started: Instant::now(),
            time_limit,
            check_interval: 1024,
        }
    }

    pub fn unlimited() -> Self {
        Self::start(None)
    }

    /// Force stop the search.
    pub fn stop(&self) {
        self.stopped.store(true, Ordering::SeqCst);
    }

    #[inline]
    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::Relaxed)
    }

    /// Called at node entry with the number of nodes searched so far.
    ///
    /// Reads the clock every `check_interval` nodes and raises the stop flag
    /// once the budget is spent.
    #[inline]
    pub fn should_stop(&self, nodes: u64) -> bool {
        if self.is_stopped() {
            return true;
        }
        if nodes % self.check_interval != 0 {
            return false;
        }
        self.check_time()
    }

    /// Read the clock now and update the stop flag.
    pub fn check_time(&self) -> bool {
        if let Some(limit) = self.time_limit {
            if self.started.elapsed() >= limit {
                self.stop();
                return true;
            }
        }
        self.is_stopped()
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }
}

impl Default for TimeControl {
    fn default() -> Self {
        Self::unlimited()
    }
}

#[cfg(test)]
#[path = "time_control_tests.rs"]
mod time_control_tests;
