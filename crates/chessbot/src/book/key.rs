//! Position keys and move codes for opening books.
//!
//! Keys are Polyglot hashes, so `.bin` books written by other tools can be
//! read directly. The Random64 values come from shakmaty's Polyglot table.
//! Polyglot XORs the turn value when White is to move, and counts the
//! en-passant file only when a pawn of the side to move stands next to the
//! pawn that just made the double step. Move counters never participate.
//!
//! Moves use the polyglot 16-bit layout: to-square in bits 0-5, from-square
//! in bits 6-11 (file in the low three bits of each), promotion piece in bits
//! 12-14.

use cozy_chess::{Board, Color, File, Move, Piece, Rank, Square};
use shakmaty::zobrist::{Zobrist64, ZobristValue};
use shakmaty::{CastlingSide, Role};

use crate::eval::adjacent_files;

/// Key of `board` for book lookups.
pub fn book_key(board: &Board) -> u64 {
    let mut key = Zobrist64::default();

    for color in Color::ALL {
        for piece in Piece::ALL {
            let polyglot_piece = shakmaty::Piece {
                color: polyglot_color(color),
                role: polyglot_role(piece),
            };
            for sq in board.colors(color) & board.pieces(piece) {
                key ^= Zobrist64::zobrist_for_piece(shakmaty::Square::new(sq as u32), polyglot_piece);
            }
        }
    }

    for color in Color::ALL {
        let rights = board.castle_rights(color);
        if rights.short.is_some() {
            key ^= Zobrist64::zobrist_for_castling_right(polyglot_color(color), CastlingSide::KingSide);
        }
        if rights.long.is_some() {
            key ^= Zobrist64::zobrist_for_castling_right(polyglot_color(color), CastlingSide::QueenSide);
        }
    }

    if let Some(file) = hashed_en_passant(board) {
        key ^= Zobrist64::zobrist_for_en_passant_file(shakmaty::File::new(file as u32));
    }

    if board.side_to_move() == Color::White {
        key ^= Zobrist64::zobrist_for_white_turn();
    }

    key.0
}

/// The en-passant file, if a pawn of the side to move could reach it.
/// Pins and checks are not considered.
fn hashed_en_passant(board: &Board) -> Option<File> {
    let file = board.en_passant()?;
    let mover = board.side_to_move();
    let rank = match mover {
        Color::White => Rank::Fifth,
        Color::Black => Rank::Fourth,
    };
    let pawns = board.colors(mover) & board.pieces(Piece::Pawn);
    let beside = adjacent_files(file) & rank.bitboard();
    (!(pawns & beside).is_empty()).then_some(file)
}

fn polyglot_color(color: Color) -> shakmaty::Color {
    match color {
        Color::White => shakmaty::Color::White,
        Color::Black => shakmaty::Color::Black,
    }
}

fn polyglot_role(piece: Piece) -> Role {
    match piece {
        Piece::Pawn => Role::Pawn,
        Piece::Knight => Role::Knight,
        Piece::Bishop => Role::Bishop,
        Piece::Rook => Role::Rook,
        Piece::Queen => Role::Queen,
        Piece::King => Role::King,
    }
}

pub fn encode_move(mv: Move) -> u16 {
    let promotion: u16 = match mv.promotion {
        Some(Piece::Knight) => 1,
        Some(Piece::Bishop) => 2,
        Some(Piece::Rook) => 3,
        Some(Piece::Queen) => 4,
        _ => 0,
    };
    mv.to as u16 | (mv.from as u16) << 6 | promotion << 12
}

/// Find the legal move a book code stands for.
pub fn decode_move(code: u16, legal: &[Move]) -> Option<Move> {
    let to = Square::index(usize::from(code & 0x3f));
    let from = Square::index(usize::from((code >> 6) & 0x3f));
    let promotion = match (code >> 12) & 0x7 {
        0 => None,
        1 => Some(Piece::Knight),
        2 => Some(Piece::Bishop),
        3 => Some(Piece::Rook),
        4 => Some(Piece::Queen),
        _ => return None,
    };
    legal
        .iter()
        .copied()
        .find(|mv| mv.from == from && mv.to == to && mv.promotion == promotion)
}

#[cfg(test)]
#[path = "key_tests.rs"]
mod key_tests;
