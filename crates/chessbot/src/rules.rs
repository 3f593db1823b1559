//! Capability interface over the external rules engine.
//!
//! The search never inspects a position directly. It enumerates, applies and
//! undoes moves through [`Rules`]; `cozy_chess::Board` is the production
//! implementation.

use std::fmt;
use std::ops::{Deref, DerefMut};

use cozy_chess::{Board, Color, File, Move, Piece, Square};

use crate::error::EngineError;

/// Why a position is drawn without being stalemate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrawReason {
    FiftyMove,
    InsufficientMaterial,
}

/// Game state of a position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Ongoing,
    Checkmate { winner: Color },
    Stalemate,
    Draw(DrawReason),
}

impl Status {
    pub fn is_terminal(self) -> bool {
        !matches!(self, Status::Ongoing)
    }
}

/// Ordering hint for a move. Larger sorts first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum MoveClass {
    Quiet,
    Check,
    /// MVV-LVA gain: victim value dominates, cheaper attackers break ties.
    Capture { gain: i32 },
}

/// Everything the search needs from a game.
pub trait Rules {
    type Move: Copy + PartialEq + fmt::Debug;
    /// State needed to take a move back.
    type Undo;

    fn side_to_move(&self) -> Color;

    /// Writes the legal moves into `out`, replacing its contents. The order
    /// must be stable for a given position.
    fn legal_moves_into(&self, out: &mut Vec<Self::Move>);

    /// Checkmate, stalemate and draws by rule. The search stops at any
    /// terminal status and scores the position with the evaluator.
    fn status(&self) -> Status;

    fn apply(&mut self, mv: Self::Move) -> Self::Undo;

    fn undo(&mut self, mv: Self::Move, undo: Self::Undo);

    /// Hash of the position, used for repetition and undo checks.
    fn key(&self) -> u64;

    fn move_class(&self, _mv: Self::Move) -> MoveClass {
        MoveClass::Quiet
    }

    fn legal_moves(&self) -> Vec<Self::Move> {
        let mut out = Vec::with_capacity(64);
        self.legal_moves_into(&mut out);
        out
    }
}

// =============================================================================
// Scoped apply/undo
// =============================================================================

/// A move applied to a position for the lifetime of the guard.
///
/// Dropping the guard takes the move back on every exit path. [`finish`]
/// takes it back explicitly and checks that the position key is restored.
///
/// [`finish`]: Applied::finish
pub struct Applied<'a, P: Rules> {
    pos: &'a mut P,
    mv: P::Move,
    undo: Option<P::Undo>,
    key_before: u64,
}

impl<'a, P: Rules> Applied<'a, P> {
    pub fn new(pos: &'a mut P, mv: P::Move) -> Self {
        let key_before = pos.key();
        let undo = pos.apply(mv);
        Self {
            pos,
            mv,
            undo: Some(undo),
            key_before,
        }
    }

    pub fn finish(mut self) -> Result<(), EngineError> {
        if let Some(undo) = self.undo.take() {
            self.pos.undo(self.mv, undo);
        }
        let key_after = self.pos.key();
        if key_after != self.key_before {
            return Err(EngineError::InvariantViolation {
                detail: format!(
                    "undoing {:?} left key {key_after:#018x}, expected {:#018x}",
                    self.mv, self.key_before
                ),
            });
        }
        Ok(())
    }
}

impl<P: Rules> Deref for Applied<'_, P> {
    type Target = P;

    fn deref(&self) -> &P {
        self.pos
    }
}

impl<P: Rules> DerefMut for Applied<'_, P> {
    fn deref_mut(&mut self) -> &mut P {
        self.pos
    }
}

impl<P: Rules> Drop for Applied<'_, P> {
    fn drop(&mut self) {
        if let Some(undo) = self.undo.take() {
            self.pos.undo(self.mv, undo);
        }
    }
}

// =============================================================================
// cozy-chess adapter
// =============================================================================

/// Piece values used only for MVV-LVA ordering.
const ORDER_VALUES: [i32; 6] = [100, 320, 330, 500, 900, 2000];

impl Rules for Board {
    type Move = Move;
    type Undo = Board;

    fn side_to_move(&self) -> Color {
        Board::side_to_move(self)
    }

    fn legal_moves_into(&self, out: &mut Vec<Move>) {
        out.clear();
        self.generate_moves(|moves| {
            out.extend(moves);
            false
        });
    }

    fn status(&self) -> Status {
        if !has_legal_moves(self) {
            return if self.checkers().is_empty() {
                Status::Stalemate
            } else {
                Status::Checkmate {
                    winner: !Board::side_to_move(self),
                }
            };
        }
        match draw_by_rule(self) {
            Some(reason) => Status::Draw(reason),
            None => Status::Ongoing,
        }
    }

    fn apply(&mut self, mv: Move) -> Board {
        let before = self.clone();
        self.play_unchecked(mv);
        before
    }

    fn undo(&mut self, _mv: Move, undo: Board) {
        *self = undo;
    }

    fn key(&self) -> u64 {
        self.hash()
    }

    fn move_class(&self, mv: Move) -> MoveClass {
        let attacker = self.piece_on(mv.from);
        let victim = if self.colors(!Board::side_to_move(self)).has(mv.to) {
            self.piece_on(mv.to)
        } else if is_en_passant(self, mv) {
            Some(Piece::Pawn)
        } else {
            None
        };
        if let (Some(victim), Some(attacker)) = (victim, attacker) {
            return MoveClass::Capture {
                gain: ORDER_VALUES[victim as usize] * 10 - ORDER_VALUES[attacker as usize],
            };
        }

        let mut child = self.clone();
        child.play_unchecked(mv);
        if child.checkers().is_empty() {
            MoveClass::Quiet
        } else {
            MoveClass::Check
        }
    }
}

pub fn has_legal_moves(board: &Board) -> bool {
    let mut any = false;
    board.generate_moves(|_| {
        any = true;
        true
    });
    any
}

/// Draws that do not depend on the move list.
pub fn draw_by_rule(board: &Board) -> Option<DrawReason> {
    if board.halfmove_clock() >= 100 {
        Some(DrawReason::FiftyMove)
    } else if insufficient_material(board) {
        Some(DrawReason::InsufficientMaterial)
    } else {
        None
    }
}

/// No pawns, rooks or queens, and at most one minor piece on the board.
fn insufficient_material(board: &Board) -> bool {
    let heavy = board.pieces(Piece::Pawn) | board.pieces(Piece::Rook) | board.pieces(Piece::Queen);
    if !heavy.is_empty() {
        return false;
    }
    (board.pieces(Piece::Knight) | board.pieces(Piece::Bishop)).len() <= 1
}

pub(crate) fn is_en_passant(board: &Board, mv: Move) -> bool {
    board.piece_on(mv.from) == Some(Piece::Pawn)
        && mv.from.file() != mv.to.file()
        && !board.occupied().has(mv.to)
}

/// cozy-chess encodes castling as the king capturing its own rook.
pub fn is_castle(board: &Board, mv: Move) -> bool {
    board.piece_on(mv.from) == Some(Piece::King)
        && board.colors(Board::side_to_move(board)).has(mv.to)
}

fn castle_destination(mv: Move) -> Square {
    let file = if (mv.to.file() as usize) > (mv.from.file() as usize) {
        File::G
    } else {
        File::C
    };
    Square::new(file, mv.from.rank())
}

// =============================================================================
// UCI move text
// =============================================================================

/// Formats a move in UCI notation, with castling as the king's two-square step.
pub fn move_to_uci(board: &Board, mv: Move) -> String {
    if is_castle(board, mv) {
        return format!("{}{}", mv.from, castle_destination(mv));
    }
    mv.to_string()
}

/// Resolves UCI text against the legal moves of `board`.
///
/// Castling is accepted both as the king's step (`e1g1`) and as king takes
/// rook (`e1h1`).
pub fn parse_uci_move(board: &Board, text: &str) -> Option<Move> {
    let text = text.trim();
    if !text.is_ascii() || !(4..=5).contains(&text.len()) {
        return None;
    }
    let from: Square = text[0..2].parse().ok()?;
    let to: Square = text[2..4].parse().ok()?;
    let promotion = match text.as_bytes().get(4) {
        None => None,
        Some(b'n') | Some(b'N') => Some(Piece::Knight),
        Some(b'b') | Some(b'B') => Some(Piece::Bishop),
        Some(b'r') | Some(b'R') => Some(Piece::Rook),
        Some(b'q') | Some(b'Q') => Some(Piece::Queen),
        Some(_) => return None,
    };

    Rules::legal_moves(board).into_iter().find(|&mv| {
        mv.from == from
            && mv.promotion == promotion
            && (mv.to == to || (is_castle(board, mv) && castle_destination(mv) == to))
    })
}

#[cfg(test)]
#[path = "rules_tests.rs"]
mod rules_tests;
