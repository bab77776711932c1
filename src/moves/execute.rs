//! Make and undo. `make` pushes a reversible-state record and applies the
//! move by dispatching on its kind; `undo` pops the record and inverts.
//! `make` followed by `undo` is the identity on every observable field,
//! both Zobrist keys included.

use crate::board::{
    Board, CASTLE_BK, CASTLE_BQ, CASTLE_WK, CASTLE_WQ, Color, HistoryEntry, Piece,
};
use crate::hash::zobrist::{xor_castling_delta, zobrist_keys};
use crate::moves::types::{
    MK_CASTLE_BK, MK_CASTLE_BQ, MK_CASTLE_WK, MK_CASTLE_WQ, MK_CAPTURE, MK_CAPTURE_PROMOTION,
    MK_EN_PASSANT, MK_NULL, MK_PAWN_DOUBLE, MK_PROMOTION, MK_QUIET, Move,
};

/// Castle kind -> (king from, king to, rook from, rook to).
#[inline(always)]
fn castle_squares(kind: u32) -> (u8, u8, u8, u8) {
    match kind {
        MK_CASTLE_WK => (60, 62, 63, 61), // e1 g1 h1 f1
        MK_CASTLE_WQ => (60, 58, 56, 59), // e1 c1 a1 d1
        MK_CASTLE_BK => (4, 6, 7, 5),     // e8 g8 h8 f8
        MK_CASTLE_BQ => (4, 2, 0, 3),     // e8 c8 a8 d8
        _ => unreachable!("not a castle kind"),
    }
}

/// Castling right lost when a rook leaves or is captured on `sq`.
#[inline(always)]
fn rook_home_right(color: Color, sq: u8) -> u8 {
    match (color, sq) {
        (Color::White, 56) => CASTLE_WQ, // a1
        (Color::White, 63) => CASTLE_WK, // h1
        (Color::Black, 0) => CASTLE_BQ,  // a8
        (Color::Black, 7) => CASTLE_BK,  // h8
        _ => 0,
    }
}

pub fn make(board: &mut Board, mv: Move) {
    let keys = zobrist_keys();
    let us = board.side_to_move;
    let them = us.opposite();
    let from = mv.from().index();
    let to = mv.to().index();

    board.push_history(HistoryEntry {
        mv,
        castling: board.castling_rights,
        ep_square: board.ep_square,
        key: board.key,
        pawn_key: board.pawn_key,
        fifty: board.fifty,
    });

    // side-to-move term flips on both keys
    board.key ^= keys.side_to_move;
    board.pawn_key ^= keys.side_to_move;

    // the old en-passant file leaves the key; a double push below may put
    // a new one in
    if let Some(ep) = board.ep_square.take() {
        board.key ^= keys.ep_file[ep.file() as usize];
    }

    match mv.kind() {
        MK_QUIET => {
            board.move_piece(us, mv.piece(), from, to);
        }
        MK_CAPTURE => {
            board.remove_piece(them, mv.captured(), to);
            board.move_piece(us, mv.piece(), from, to);
        }
        MK_EN_PASSANT => {
            board.remove_piece(them, Piece::Pawn, mv.ep_square().index());
            board.move_piece(us, Piece::Pawn, from, to);
        }
        MK_PAWN_DOUBLE => {
            board.move_piece(us, Piece::Pawn, from, to);
            let ep = mv.ep_square();
            board.ep_square = Some(ep);
            board.key ^= keys.ep_file[ep.file() as usize];
        }
        MK_PROMOTION => {
            board.remove_piece(us, Piece::Pawn, from);
            board.add_piece(us, mv.promotion().unwrap(), to);
        }
        MK_CAPTURE_PROMOTION => {
            board.remove_piece(them, mv.captured(), to);
            board.remove_piece(us, Piece::Pawn, from);
            board.add_piece(us, mv.promotion().unwrap(), to);
        }
        MK_CASTLE_WK | MK_CASTLE_WQ | MK_CASTLE_BK | MK_CASTLE_BQ => {
            let (king_from, king_to, rook_from, rook_to) = castle_squares(mv.kind());
            board.move_piece(us, Piece::King, king_from, king_to);
            board.move_piece(us, Piece::Rook, rook_from, rook_to);
        }
        MK_NULL => {}
        k => unreachable!("unknown move kind {}", k),
    }

    // castling rights: king moves clear both, rook moves from a home square
    // clear that side, and capturing a rook on its home square clears the
    // opponent's side
    let mut lost = 0u8;
    if !mv.is_null() {
        if mv.piece() == Piece::King {
            lost |= match us {
                Color::White => CASTLE_WK | CASTLE_WQ,
                Color::Black => CASTLE_BK | CASTLE_BQ,
            };
        }
        if mv.piece() == Piece::Rook {
            lost |= rook_home_right(us, from);
        }
        if mv.is_capture() && !mv.is_en_passant() && mv.captured() == Piece::Rook {
            lost |= rook_home_right(them, to);
        }
    }
    if lost != 0 {
        let new_rights = board.castling_rights & !lost;
        if new_rights != board.castling_rights {
            xor_castling_delta(&mut board.key, keys, board.castling_rights, new_rights);
            board.castling_rights = new_rights;
        }
    }

    if !mv.is_null() && (mv.piece() == Piece::Pawn || mv.is_capture()) {
        board.fifty = 0;
    } else {
        board.fifty = board.fifty.saturating_add(1);
    }

    if us == Color::Black {
        board.fullmove_number += 1;
    }
    board.ply += 1;
    board.side_to_move = them;

    #[cfg(debug_assertions)]
    board.assert_keys();
}

pub fn undo(board: &mut Board) {
    let Some(entry) = board.pop_history() else {
        return;
    };
    let mv = entry.mv;
    let them = board.side_to_move;
    let us = them.opposite();

    // restore scalar state wholesale, keys included
    board.side_to_move = us;
    board.castling_rights = entry.castling;
    board.ep_square = entry.ep_square;
    board.key = entry.key;
    board.pawn_key = entry.pawn_key;
    board.fifty = entry.fifty;
    board.ply -= 1;
    if us == Color::Black {
        board.fullmove_number -= 1;
    }

    let from = mv.from().index();
    let to = mv.to().index();

    match mv.kind() {
        MK_QUIET | MK_PAWN_DOUBLE => {
            board.move_piece_undo(us, mv.piece(), to, from);
        }
        MK_CAPTURE => {
            board.move_piece_undo(us, mv.piece(), to, from);
            board.add_piece_undo(them, mv.captured(), to);
        }
        MK_EN_PASSANT => {
            board.move_piece_undo(us, Piece::Pawn, to, from);
            board.add_piece_undo(them, Piece::Pawn, mv.ep_square().index());
        }
        MK_PROMOTION => {
            board.remove_piece_undo(us, mv.promotion().unwrap(), to);
            board.add_piece_undo(us, Piece::Pawn, from);
        }
        MK_CAPTURE_PROMOTION => {
            board.remove_piece_undo(us, mv.promotion().unwrap(), to);
            board.add_piece_undo(us, Piece::Pawn, from);
            board.add_piece_undo(them, mv.captured(), to);
        }
        MK_CASTLE_WK | MK_CASTLE_WQ | MK_CASTLE_BK | MK_CASTLE_BQ => {
            let (king_from, king_to, rook_from, rook_to) = castle_squares(mv.kind());
            board.move_piece_undo(us, Piece::King, king_to, king_from);
            board.move_piece_undo(us, Piece::Rook, rook_to, rook_from);
        }
        MK_NULL => {}
        k => unreachable!("unknown move kind {}", k),
    }

    #[cfg(debug_assertions)]
    board.assert_keys();
}

/// Null move: flips the side to move and clears the en-passant square
/// through the regular make path.
#[inline]
pub fn make_null(board: &mut Board) {
    make(board, Move::NULL);
}

#[inline]
pub fn undo_null(board: &mut Board) {
    undo(board);
}
