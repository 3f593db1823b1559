//! Depth-limited negamax with alpha-beta pruning.
//!
//! The search is generic over [`Rules`] and [`Evaluator`], so it runs on
//! `cozy_chess::Board` in production and on small synthetic trees in tests.
//!
//! Root moves are compared by exact score; ties go to the move that comes
//! first in the rules' legal-move order. Move ordering therefore only changes
//! how many nodes are visited, never which move is returned.

use std::cmp::Reverse;

use cozy_chess::{Color, Move};
use rayon::prelude::*;
use tracing::debug;

use crate::error::EngineError;
use crate::eval::MATE_SCORE;
use crate::rules::{Applied, Rules};
use crate::time_control::{SearchLimits, TimeControl};

/// Larger than any evaluation, including mate scores.
pub const INFINITY: i32 = 2 * MATE_SCORE;

/// Score for a repetition on the current search path.
const DRAW_SCORE: i32 = 0;

/// Static evaluation used at the leaves of the search.
pub trait Evaluator<P: Rules>: Sync {
    /// Score from White's point of view. `depth_remaining` is the number of
    /// plies the search still had left, used to prefer faster mates.
    fn evaluate(&self, pos: &P, depth_remaining: u8) -> i32;
}

/// Switches that change search effort but never the result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchOptions {
    /// Try captures and checks first.
    pub move_ordering: bool,
    /// Search root moves on separate threads.
    pub parallel: bool,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            move_ordering: true,
            parallel: false,
        }
    }
}

/// Where the chosen move came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveSource {
    Book { weight: u16 },
    Search,
}

/// Result of a move decision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchResult<M = Move> {
    /// The chosen move; always legal in the searched position
    pub best_move: M,
    /// Score in centipawns from the side-to-move's perspective
    pub score: i32,
    /// Side to move in the searched position
    pub side: Color,
    /// Deepest fully completed iteration (0 if none completed)
    pub depth: u8,
    /// Number of nodes searched
    pub nodes: u64,
    /// Whether search was stopped early due to the time budget
    pub stopped: bool,
    pub source: MoveSource,
}

impl<M> SearchResult<M> {
    /// Score from White's perspective.
    pub fn white_score(&self) -> i32 {
        match self.side {
            Color::White => self.score,
            Color::Black => -self.score,
        }
    }

    pub fn is_mate(&self) -> bool {
        self.score.abs() >= MATE_SCORE
    }
}

#[derive(Debug, Clone, Copy)]
struct RootMove<M> {
    /// Position in the rules' legal-move order; the tie-breaker.
    index: usize,
    mv: M,
}

#[derive(Debug, Clone, Copy)]
struct RootBest<M> {
    index: usize,
    mv: M,
    score: i32,
}

impl<M> RootBest<M> {
    fn beats(&self, other: &RootBest<M>) -> bool {
        self.score > other.score || (self.score == other.score && self.index < other.index)
    }
}

struct Iteration<M> {
    best: Option<RootBest<M>>,
    stopped: bool,
    nodes: u64,
}

#[inline]
fn relative(side: Color, white_score: i32) -> i32 {
    match side {
        Color::White => white_score,
        Color::Black => -white_score,
    }
}

/// Pick a move for `pos` within `limits`.
///
/// Fails only with `NoLegalMoves`, or with `InvariantViolation` if the rules
/// implementation does not restore a position on undo.
pub fn search<P, E>(
    pos: &P,
    eval: &E,
    limits: &SearchLimits,
    options: SearchOptions,
) -> Result<SearchResult<P::Move>, EngineError>
where
    P: Rules + Clone + Send + Sync,
    P::Move: Send + Sync,
    E: Evaluator<P>,
{
    let time = TimeControl::start(limits.move_time);
    let mut work = pos.clone();

    let mut root: Vec<RootMove<P::Move>> = work
        .legal_moves()
        .into_iter()
        .enumerate()
        .map(|(index, mv)| RootMove { index, mv })
        .collect();
    if root.is_empty() {
        return Err(EngineError::NoLegalMoves);
    }
    if options.move_ordering {
        root.sort_by_key(|rm| Reverse(work.move_class(rm.mv)));
    }

    let max_depth = limits.effective_depth();
    let first_depth = if limits.move_time.is_some() { 1 } else { max_depth };

    let mut searcher = Searcher::new(eval, options, &time);
    let mut completed: Option<(RootBest<P::Move>, u8)> = None;
    let mut partial: Option<RootBest<P::Move>> = None;
    let mut nodes = 0;
    let mut stopped = false;

    for depth in first_depth..=max_depth {
        let iteration = if options.parallel {
            search_root_parallel(&work, eval, options, &time, &root, depth)?
        } else {
            searcher.nodes = 0;
            searcher.search_root(&mut work, &root, depth)?
        };
        nodes += iteration.nodes;

        if iteration.stopped {
            stopped = true;
            partial = iteration.best;
            break;
        }
        if let Some(best) = iteration.best {
            completed = Some((best, depth));
        }
    }

    let (best, depth) = match (completed, partial) {
        (Some(done), _) => done,
        (None, Some(best)) => (best, 0),
        (None, None) => {
            let first = root[0];
            let score = relative(work.side_to_move(), eval.evaluate(&work, 0));
            (
                RootBest {
                    index: first.index,
                    mv: first.mv,
                    score,
                },
                0,
            )
        }
    };

    debug!(
        depth,
        nodes,
        score = best.score,
        stopped,
        elapsed_ms = time.elapsed().as_millis() as u64,
        "search finished"
    );

    Ok(SearchResult {
        best_move: best.mv,
        score: best.score,
        side: work.side_to_move(),
        depth,
        nodes,
        stopped,
        source: MoveSource::Search,
    })
}

/// Each root move on its own clone with a full window.
fn search_root_parallel<P, E>(
    pos: &P,
    eval: &E,
    options: SearchOptions,
    time: &TimeControl,
    root: &[RootMove<P::Move>],
    depth: u8,
) -> Result<Iteration<P::Move>, EngineError>
where
    P: Rules + Clone + Send + Sync,
    P::Move: Send + Sync,
    E: Evaluator<P>,
{
    let scored: Vec<Result<(RootBest<P::Move>, u64, bool), EngineError>> = root
        .par_iter()
        .map(|rm| {
            let mut local = pos.clone();
            let mut searcher = Searcher::new(eval, options, time);
            searcher.path.push(local.key());

            let mut child = Applied::new(&mut local, rm.mv);
            searcher.path.push(child.key());
            let result = searcher.negamax(&mut *child, depth - 1, -INFINITY, INFINITY);
            child.finish()?;

            let best = RootBest {
                index: rm.index,
                mv: rm.mv,
                score: -result?,
            };
            Ok((best, searcher.nodes, searcher.stopped))
        })
        .collect();

    let mut iteration = Iteration {
        best: None,
        stopped: false,
        nodes: 0,
    };
    for entry in scored {
        let (candidate, nodes, stopped) = entry?;
        iteration.nodes += nodes;
        if stopped {
            iteration.stopped = true;
            continue;
        }
        if iteration.best.as_ref().is_none_or(|best| candidate.beats(best)) {
            iteration.best = Some(candidate);
        }
    }
    Ok(iteration)
}

struct Searcher<'a, E> {
    eval: &'a E,
    options: SearchOptions,
    time: &'a TimeControl,
    nodes: u64,
    stopped: bool,
    /// Keys of the positions from the root to the current node.
    path: Vec<u64>,
}

impl<'a, E> Searcher<'a, E> {
    fn new(eval: &'a E, options: SearchOptions, time: &'a TimeControl) -> Self {
        Self {
            eval,
            options,
            time,
            nodes: 0,
            stopped: false,
            path: Vec::with_capacity(64),
        }
    }

    fn search_root<P>(
        &mut self,
        pos: &mut P,
        root: &[RootMove<P::Move>],
        depth: u8,
    ) -> Result<Iteration<P::Move>, EngineError>
    where
        P: Rules,
        E: Evaluator<P>,
    {
        self.path.clear();
        self.path.push(pos.key());
        let mut best: Option<RootBest<P::Move>> = None;

        for rm in root {
            if self.time.is_stopped() {
                self.stopped = true;
                break;
            }

            // A move earlier in legal order wins ties, so it only needs to
            // reach the current best; later moves must beat it.
            let alpha = match best {
                None => -INFINITY,
                Some(b) if rm.index < b.index => b.score - 1,
                Some(b) => b.score,
            };

            let mut child = Applied::new(pos, rm.mv);
            self.path.push(child.key());
            let result = self.negamax(&mut *child, depth - 1, -INFINITY, -alpha);
            self.path.pop();
            child.finish()?;
            let score = -result?;

            if self.stopped {
                break;
            }
            let candidate = RootBest {
                index: rm.index,
                mv: rm.mv,
                score,
            };
            if best.as_ref().is_none_or(|b| candidate.beats(b)) {
                best = Some(candidate);
            }
        }

        Ok(Iteration {
            best,
            stopped: self.stopped,
            nodes: self.nodes,
        })
    }

    fn negamax<P>(&mut self, pos: &mut P, depth: u8, mut alpha: i32, beta: i32) -> Result<i32, EngineError>
    where
        P: Rules,
        E: Evaluator<P>,
    {
        if self.time.should_stop(self.nodes) {
            self.stopped = true;
            return Ok(0);
        }
        self.nodes += 1;

        if depth == 0 || pos.status().is_terminal() {
            return Ok(self.leaf(pos, depth));
        }
        if self.repeats_on_path() {
            return Ok(DRAW_SCORE);
        }

        let mut moves = Vec::with_capacity(64);
        pos.legal_moves_into(&mut moves);
        if self.options.move_ordering {
            moves.sort_by_key(|&mv| Reverse(pos.move_class(mv)));
        }

        let mut best = -INFINITY;
        for mv in moves {
            let mut child = Applied::new(pos, mv);
            self.path.push(child.key());
            let result = self.negamax(&mut *child, depth - 1, -beta, -alpha);
            self.path.pop();
            child.finish()?;
            let score = -result?;

            if self.stopped {
                return Ok(best);
            }
            if score > best {
                best = score;
            }
            if best > alpha {
                alpha = best;
            }
            if alpha >= beta {
                break;
            }
        }

        Ok(best)
    }

    #[inline]
    fn leaf<P>(&self, pos: &P, depth: u8) -> i32
    where
        P: Rules,
        E: Evaluator<P>,
    {
        relative(pos.side_to_move(), self.eval.evaluate(pos, depth))
    }

    /// Whether the current node repeats an earlier position on the path.
    fn repeats_on_path(&self) -> bool {
        match self.path.split_last() {
            Some((last, earlier)) => earlier.contains(last),
            None => false,
        }
    }
}

#[cfg(test)]
#[path = "search_tests.rs"]
mod search_tests;
