//! Hand-crafted position evaluation over cozy-chess bitboards.
//!
//! Scores are absolute: positive favours White. The search flips the sign for
//! Black before using them.

use cozy_chess::{BitBoard, Board, Color, File, Piece, Rank, Square, get_pawn_attacks};

use crate::rules::draw_by_rule;
use crate::search::Evaluator;
use crate::weights::EvaluationWeights;

/// Base score of a checkmate. Faster mates add the remaining search depth.
pub const MATE_SCORE: i32 = 1_000_000;

/// Bound on any non-terminal evaluation, keeping it clear of mate scores.
pub const MAX_EVAL: i32 = MATE_SCORE / 2;

/// King safety is scaled by `phase / PHASE_MAX`.
const PHASE_MAX: i32 = 256;

/// Non-pawn material of one side at the start (two of each minor and rook, one queen).
const OPENING_NON_PAWN: i32 = 2 * (320 + 330 + 500) + 900;

/// Phase values in centipawns, fixed so that tuning piece weights does not move the phase.
const PHASE_VALUES: [i32; 6] = [0, 320, 330, 500, 900, 0];

/// Evaluate a position with no search depth remaining.
pub fn evaluate(board: &Board, weights: &EvaluationWeights) -> i32 {
    evaluate_at(board, weights, 0)
}

/// Evaluate a position reached with `depth_remaining` plies of search left.
///
/// Checkmate scores `MATE_SCORE + depth_remaining` for the winner, so a mate
/// found higher in the tree scores higher. Stalemate and draws by rule are 0.
pub fn evaluate_at(board: &Board, weights: &EvaluationWeights, depth_remaining: u8) -> i32 {
    let mut mobility = 0usize;
    board.generate_moves(|moves| {
        mobility += moves.len();
        false
    });

    if mobility == 0 {
        if board.checkers().is_empty() {
            return 0;
        }
        let mate = MATE_SCORE + i32::from(depth_remaining);
        return match board.side_to_move() {
            Color::White => -mate,
            Color::Black => mate,
        };
    }
    if draw_by_rule(board).is_some() {
        return 0;
    }

    Breakdown::with_mobility(board, weights, mobility).total()
}

/// Per-term contributions of a non-terminal position, White minus Black.
///
/// Terms are kept wide so that extreme weights cannot overflow before
/// `total` clamps them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Breakdown {
    pub material: i64,
    pub pawn_structure: i64,
    pub king_safety: i64,
    pub mobility: i64,
}

impl Breakdown {
    pub fn new(board: &Board, weights: &EvaluationWeights) -> Self {
        let mut mobility = 0usize;
        board.generate_moves(|moves| {
            mobility += moves.len();
            false
        });
        Self::with_mobility(board, weights, mobility)
    }

    fn with_mobility(board: &Board, weights: &EvaluationWeights, mobility: usize) -> Self {
        let mover = sign(board.side_to_move());
        Self {
            material: material(board, weights),
            pawn_structure: Color::ALL
                .iter()
                .map(|&color| sign(color) * pawn_structure(board, weights, color))
                .sum(),
            king_safety: Color::ALL
                .iter()
                .map(|&color| sign(color) * king_safety(board, weights, color))
                .sum(),
            mobility: mover * i64::from(weights.mobility) * mobility as i64,
        }
    }

    pub fn total(&self) -> i32 {
        let sum = self.material + self.pawn_structure + self.king_safety + self.mobility;
        // Fits after the clamp.
        sum.clamp(-i64::from(MAX_EVAL), i64::from(MAX_EVAL)) as i32
    }
}

/// Evaluator handed to the search, bound to one weight snapshot.
#[derive(Debug, Clone, Copy)]
pub struct Handcrafted<'w> {
    weights: &'w EvaluationWeights,
}

impl<'w> Handcrafted<'w> {
    pub fn new(weights: &'w EvaluationWeights) -> Self {
        Self { weights }
    }
}

impl Evaluator<Board> for Handcrafted<'_> {
    fn evaluate(&self, board: &Board, depth_remaining: u8) -> i32 {
        evaluate_at(board, self.weights, depth_remaining)
    }
}

#[inline]
fn sign(color: Color) -> i64 {
    match color {
        Color::White => 1,
        Color::Black => -1,
    }
}

#[inline]
fn pieces_of(board: &Board, color: Color, piece: Piece) -> BitBoard {
    board.colors(color) & board.pieces(piece)
}

/// Rank index counted from `color`'s back rank.
#[inline]
fn relative_rank(sq: Square, color: Color) -> usize {
    match color {
        Color::White => sq.rank() as usize,
        Color::Black => 7 - sq.rank() as usize,
    }
}

fn material(board: &Board, weights: &EvaluationWeights) -> i64 {
    let mut score = 0;
    for piece in Piece::ALL {
        let white = i64::from(pieces_of(board, Color::White, piece).len());
        let black = i64::from(pieces_of(board, Color::Black, piece).len());
        score += i64::from(weights.piece_value(piece)) * (white - black);
    }
    for color in Color::ALL {
        if pieces_of(board, color, Piece::Bishop).len() >= 2 {
            score += sign(color) * i64::from(weights.bishop_pair);
        }
    }
    score
}

// =============================================================================
// Pawn structure
// =============================================================================

pub(crate) fn adjacent_files(file: File) -> BitBoard {
    let index = file as usize;
    let mut files = BitBoard::EMPTY;
    if index > 0 {
        files |= File::index(index - 1).bitboard();
    }
    if index < 7 {
        files |= File::index(index + 1).bitboard();
    }
    files
}

/// Ranks strictly in front of `rank` from `color`'s point of view.
fn ranks_ahead(rank: Rank, color: Color) -> BitBoard {
    let index = rank as usize;
    let ahead = match color {
        Color::White => index + 1..8,
        Color::Black => 0..index,
    };
    ahead.fold(BitBoard::EMPTY, |acc, r| acc | Rank::index(r).bitboard())
}

/// Squares an enemy pawn must occupy to stop a pawn on `sq` from being passed.
fn front_span(sq: Square, color: Color) -> BitBoard {
    (sq.file().bitboard() | adjacent_files(sq.file())) & ranks_ahead(sq.rank(), color)
}

fn pawn_structure(board: &Board, weights: &EvaluationWeights, color: Color) -> i64 {
    let ours = pieces_of(board, color, Piece::Pawn);
    let theirs = pieces_of(board, !color, Piece::Pawn);
    let mut score = 0;

    for file in File::ALL {
        let on_file = i64::from((ours & file.bitboard()).len());
        if on_file > 1 {
            score -= i64::from(weights.doubled_pawn) * (on_file - 1);
        }
    }

    for sq in ours {
        if (ours & adjacent_files(sq.file())).is_empty() {
            score -= i64::from(weights.isolated_pawn);
        }
        if (theirs & front_span(sq, color)).is_empty() {
            score += i64::from(weights.passed_pawn[relative_rank(sq, color)]);
        }
        // Squares from which one of our pawns would defend this one.
        if !(ours & get_pawn_attacks(sq, !color)).is_empty() {
            score += i64::from(weights.connected_pawn);
        }
    }

    score
}

// =============================================================================
// King safety
// =============================================================================

/// Opponent non-pawn material mapped onto `0..=PHASE_MAX`.
fn phase_against(board: &Board, color: Color) -> i64 {
    let enemy = !color;
    let non_pawn: i32 = [Piece::Knight, Piece::Bishop, Piece::Rook, Piece::Queen]
        .into_iter()
        .map(|piece| PHASE_VALUES[piece as usize] * pieces_of(board, enemy, piece).len() as i32)
        .sum();
    i64::from((non_pawn * PHASE_MAX / OPENING_NON_PAWN).min(PHASE_MAX))
}

fn king_safety(board: &Board, weights: &EvaluationWeights, color: Color) -> i64 {
    let king = board.king(color);
    let ours = pieces_of(board, color, Piece::Pawn);
    let king_file = king.file() as usize;
    let king_rank = king.rank() as usize;
    let mut score = 0;

    for f in king_file.saturating_sub(1)..=(king_file + 1).min(7) {
        let file = File::index(f);
        if (ours & file.bitboard()).is_empty() {
            score -= i64::from(weights.open_file_near_king);
            continue;
        }
        for step in 1..=2 {
            let rank = match color {
                Color::White => king_rank.checked_add(step).filter(|&r| r < 8),
                Color::Black => king_rank.checked_sub(step),
            };
            let Some(rank) = rank else { break };
            if ours.has(Square::new(file, Rank::index(rank))) {
                let shield = i64::from(weights.pawn_shield);
                score += if step == 1 { shield } else { shield / 2 };
                break;
            }
        }
    }

    let home = match color {
        Color::White => Square::E1,
        Color::Black => Square::E8,
    };
    let rights = board.castle_rights(color);
    if king == home && rights.short.is_none() && rights.long.is_none() {
        score -= i64::from(weights.lost_castling);
    }

    score * phase_against(board, color) / i64::from(PHASE_MAX)
}

#[cfg(test)]
#[path = "eval_tests.rs"]
mod eval_tests;
