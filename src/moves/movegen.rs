//! Pseudo-legal move generation, split into the phases the staged picker
//! consumes: quiets, captures (with promotions and en-passant), and legal
//! check evasions.
//!
//! The generators append to the caller's buffer without clearing it. The
//! emitted moves still pass through [`pseudo_legal`] before being searched;
//! the evasion generator is the exception and emits only moves that resolve
//! the check modulo pins.

use crate::bitboard::{self, BitboardExt, pop_lsb};
use crate::board::{Board, Color, Piece};
use crate::moves::attacks::{from_to_path, king_attacks, knight_attacks, pawn_attacks};
use crate::moves::magic;
use crate::moves::square_control::{checkers, find_pins, in_check, is_square_attacked_occ, pseudo_legal};
use crate::moves::types::{
    MK_CASTLE_BK, MK_CASTLE_BQ, MK_CASTLE_WK, MK_CASTLE_WQ, Move, MoveBuffer, MoveList,
};
use crate::square::Square;

const PROMOS: [Piece; 4] = [Piece::Queen, Piece::Rook, Piece::Bishop, Piece::Knight];

/// Pawn geometry per color: start/promotion source ranks and push deltas.
/// White pushes toward lower indices in the top-down square layout.
struct PawnGeometry {
    double_rank: u64,
    promo_from_rank: u64,
    promo_rank: u64,
}

#[inline(always)]
fn pawn_geometry(color: Color) -> PawnGeometry {
    match color {
        Color::White => PawnGeometry {
            double_rank: bitboard::RANK_2,
            promo_from_rank: bitboard::RANK_7,
            promo_rank: bitboard::RANK_8,
        },
        Color::Black => PawnGeometry {
            double_rank: bitboard::RANK_7,
            promo_from_rank: bitboard::RANK_2,
            promo_rank: bitboard::RANK_1,
        },
    }
}

#[inline(always)]
fn push_one(color: Color, bb: u64) -> u64 {
    match color {
        Color::White => bitboard::north(bb),
        Color::Black => bitboard::south(bb),
    }
}

/// Square the pawn came from, given its push destination.
#[inline(always)]
fn push_origin(color: Color, to: u8) -> u8 {
    match color {
        Color::White => to + 8,
        Color::Black => to - 8,
    }
}

// ---- quiet moves ----

pub fn gen_quiet(board: &Board, out: &mut impl MoveBuffer) {
    let us = board.side_to_move;
    let empty = !board.occupied();
    let geometry = pawn_geometry(us);
    let pawns = board.bb(us, Piece::Pawn);

    // pawn single pushes, promotions excluded
    let mut single = push_one(us, pawns) & empty & !geometry.promo_rank;
    while single != 0 {
        let to = pop_lsb(&mut single);
        out.push(Move::quiet(
            Piece::Pawn,
            Square::from_index(push_origin(us, to)),
            Square::from_index(to),
        ));
    }

    // pawn double pushes
    let mut double = push_one(us, push_one(us, pawns & geometry.double_rank) & empty) & empty;
    while double != 0 {
        let to = pop_lsb(&mut double);
        let skipped = push_origin(us, to);
        out.push(Move::pawn_double(
            Square::from_index(push_origin(us, skipped)),
            Square::from_index(to),
            Square::from_index(skipped),
        ));
    }

    gen_piece_moves(board, empty, false, out);

    // castling: flag set and intermediate squares empty; the attack tests
    // run in the pseudo-legal check
    let occ = board.occupied();
    match us {
        Color::White => {
            if board.has_kingside_castle(Color::White) && occ & ((1u64 << 61) | (1u64 << 62)) == 0 {
                out.push(Move::castle(MK_CASTLE_WK, Square::E1, Square::G1));
            }
            if board.has_queenside_castle(Color::White)
                && occ & ((1u64 << 57) | (1u64 << 58) | (1u64 << 59)) == 0
            {
                out.push(Move::castle(MK_CASTLE_WQ, Square::E1, Square::C1));
            }
        }
        Color::Black => {
            if board.has_kingside_castle(Color::Black) && occ & ((1u64 << 5) | (1u64 << 6)) == 0 {
                out.push(Move::castle(MK_CASTLE_BK, Square::E8, Square::G8));
            }
            if board.has_queenside_castle(Color::Black)
                && occ & ((1u64 << 1) | (1u64 << 2) | (1u64 << 3)) == 0
            {
                out.push(Move::castle(MK_CASTLE_BQ, Square::E8, Square::C8));
            }
        }
    }
}

// ---- captures, promotions, en-passant ----

pub fn gen_captures(board: &Board, out: &mut impl MoveBuffer) {
    let us = board.side_to_move;
    let them = us.opposite();
    let geometry = pawn_geometry(us);
    let pawns = board.bb(us, Piece::Pawn);
    let empty = !board.occupied();
    // the enemy king is never a capture target
    let targets = board.occupancy(them) & !board.bb(them, Piece::King);

    // pawn captures from non-promoting ranks
    let mut attackers = pawns & !geometry.promo_from_rank;
    while attackers != 0 {
        let from = pop_lsb(&mut attackers);
        let mut hits = pawn_attacks(us, from) & targets;
        while hits != 0 {
            let to = pop_lsb(&mut hits);
            let captured = board.piece_of(them, Square::from_index(to)).unwrap();
            out.push(Move::capture(
                Piece::Pawn,
                captured,
                Square::from_index(from),
                Square::from_index(to),
            ));
        }
    }

    // promotion pushes
    let mut promo_push = push_one(us, pawns & geometry.promo_from_rank) & empty;
    while promo_push != 0 {
        let to = pop_lsb(&mut promo_push);
        let from = Square::from_index(push_origin(us, to));
        for promo in PROMOS {
            out.push(Move::promote(from, Square::from_index(to), promo));
        }
    }

    // promotion captures
    let mut promo_attackers = pawns & geometry.promo_from_rank;
    while promo_attackers != 0 {
        let from = pop_lsb(&mut promo_attackers);
        let mut hits = pawn_attacks(us, from) & targets & geometry.promo_rank;
        while hits != 0 {
            let to = pop_lsb(&mut hits);
            let captured = board.piece_of(them, Square::from_index(to)).unwrap();
            for promo in PROMOS {
                out.push(Move::capture_promotion(
                    captured,
                    Square::from_index(from),
                    Square::from_index(to),
                    promo,
                ));
            }
        }
    }

    // en-passant: legal-square match, capturing pawn present
    if let Some(ep) = board.ep_square {
        let victim = push_origin(us, ep.index());
        if board.bb(them, Piece::Pawn) & (1u64 << victim) != 0 {
            let mut candidates = pawn_attacks(them, ep.index()) & pawns;
            while candidates != 0 {
                let from = pop_lsb(&mut candidates);
                out.push(Move::en_passant(
                    Square::from_index(from),
                    ep,
                    Square::from_index(victim),
                ));
            }
        }
    }

    gen_piece_moves(board, targets, true, out);
}

/// Knight, bishop, rook, queen and king moves into `targets`; `captures`
/// selects whether the targets are enemy pieces or empty squares.
fn gen_piece_moves(board: &Board, targets: u64, captures: bool, out: &mut impl MoveBuffer) {
    let us = board.side_to_move;
    let them = us.opposite();
    let occ = board.occupied();
    let t = magic::tables();

    for piece in [Piece::Knight, Piece::Bishop, Piece::Rook, Piece::Queen, Piece::King] {
        let mut movers = board.bb(us, piece);
        while movers != 0 {
            let from = pop_lsb(&mut movers);
            let reach = match piece {
                Piece::Knight => knight_attacks(from),
                Piece::Bishop => t.bishop.attacks(from as usize, occ),
                Piece::Rook => t.rook.attacks(from as usize, occ),
                Piece::Queen => t.queen_attacks(from as usize, occ),
                Piece::King => king_attacks(from),
                Piece::Pawn => unreachable!(),
            };
            let mut hits = reach & targets;
            while hits != 0 {
                let to = pop_lsb(&mut hits);
                let mv = if captures {
                    let captured = board.piece_of(them, Square::from_index(to)).unwrap();
                    Move::capture(piece, captured, Square::from_index(from), Square::from_index(to))
                } else {
                    Move::quiet(piece, Square::from_index(from), Square::from_index(to))
                };
                out.push(mv);
            }
        }
    }
}

// ---- check evasions ----

/// Pieces of `color` that attack `sq` under occupancy `occ`.
fn attackers_to(board: &Board, sq: u8, color: Color, occ: u64) -> u64 {
    let t = magic::tables();
    let queens = board.bb(color, Piece::Queen);
    (pawn_attacks(color.opposite(), sq) & board.bb(color, Piece::Pawn))
        | (knight_attacks(sq) & board.bb(color, Piece::Knight))
        | (king_attacks(sq) & board.bb(color, Piece::King))
        | (t.rook.attacks(sq as usize, occ) & (board.bb(color, Piece::Rook) | queens))
        | (t.bishop.attacks(sq as usize, occ) & (board.bb(color, Piece::Bishop) | queens))
}

/// Evasions while in check, in the order king moves, checker captures,
/// interpositions. Under double check only king moves come out. Pins are
/// the one legality concern left to the pseudo-legal test.
pub fn gen_check_evasions(board: &Board, out: &mut impl MoveBuffer) {
    let us = board.side_to_move;
    let them = us.opposite();
    let king_sq = board.king_square(us);
    let king_bb = king_sq.bb();
    let occ = board.occupied();
    let check = checkers(board, us);
    debug_assert!(check != 0, "evasion generation requires a check");

    // (a) king steps to squares that stay safe with the king lifted off
    let occ_no_king = occ & !king_bb;
    let mut steps = king_attacks(king_sq.index()) & !board.occupancy(us);
    while steps != 0 {
        let to = pop_lsb(&mut steps);
        if is_square_attacked_occ(board, to, them, occ_no_king) {
            continue;
        }
        match board.piece_of(them, Square::from_index(to)) {
            Some(Piece::King) => {}
            Some(captured) => out.push(Move::capture(
                Piece::King,
                captured,
                king_sq,
                Square::from_index(to),
            )),
            None => out.push(Move::quiet(Piece::King, king_sq, Square::from_index(to))),
        }
    }

    if check.more_than_one() {
        return;
    }

    let checker_sq = check.lsb();
    let checker = board
        .piece_of(them, Square::from_index(checker_sq))
        .expect("checker stands on its square");
    let geometry = pawn_geometry(us);

    // (b) capture the checker with anything but the king
    let mut takers = attackers_to(board, checker_sq, us, occ) & !king_bb;
    while takers != 0 {
        let from = pop_lsb(&mut takers);
        let piece = board.piece_of(us, Square::from_index(from)).unwrap();
        if piece == Piece::Pawn && (1u64 << checker_sq) & geometry.promo_rank != 0 {
            for promo in PROMOS {
                out.push(Move::capture_promotion(
                    checker,
                    Square::from_index(from),
                    Square::from_index(checker_sq),
                    promo,
                ));
            }
        } else {
            out.push(Move::capture(
                piece,
                checker,
                Square::from_index(from),
                Square::from_index(checker_sq),
            ));
        }
    }

    // en-passant removes the checker when the checker is the pawn that
    // just double-pushed
    if let Some(ep) = board.ep_square {
        if checker == Piece::Pawn && push_origin(us, ep.index()) == checker_sq {
            let mut candidates = pawn_attacks(them, ep.index()) & board.bb(us, Piece::Pawn);
            while candidates != 0 {
                let from = pop_lsb(&mut candidates);
                out.push(Move::en_passant(
                    Square::from_index(from),
                    ep,
                    Square::from_index(checker_sq),
                ));
            }
        }
    }

    // (c) interpose on the line between king and a checking slider
    if !matches!(checker, Piece::Bishop | Piece::Rook | Piece::Queen) {
        return;
    }
    let t = magic::tables();
    let mut gaps = from_to_path(king_sq.index(), checker_sq);
    while gaps != 0 {
        let to = pop_lsb(&mut gaps);
        let to_sq = Square::from_index(to);
        let to_bb = 1u64 << to;

        // knights and sliders that reach the gap square
        let mut blockers = (knight_attacks(to) & board.bb(us, Piece::Knight))
            | (t.rook.attacks(to as usize, occ)
                & (board.bb(us, Piece::Rook) | board.bb(us, Piece::Queen)))
            | (t.bishop.attacks(to as usize, occ)
                & (board.bb(us, Piece::Bishop) | board.bb(us, Piece::Queen)));
        while blockers != 0 {
            let from = pop_lsb(&mut blockers);
            let piece = board.piece_of(us, Square::from_index(from)).unwrap();
            out.push(Move::quiet(piece, Square::from_index(from), to_sq));
        }

        // pawn single push onto the gap; the origin square only exists
        // when the gap is not on the mover's own back ranks
        let origin = match us {
            Color::White if to <= 55 => Some(to + 8),
            Color::Black if to >= 8 => Some(to - 8),
            _ => None,
        };
        let Some(origin) = origin else { continue };
        if board.bb(us, Piece::Pawn) & (1u64 << origin) != 0 {
            if to_bb & geometry.promo_rank != 0 {
                for promo in PROMOS {
                    out.push(Move::promote(Square::from_index(origin), to_sq, promo));
                }
            } else {
                out.push(Move::quiet(Piece::Pawn, Square::from_index(origin), to_sq));
            }
        } else if board.occupied() & (1u64 << origin) == 0 {
            // pawn double push onto the gap, skipped square empty
            let double_origin = match us {
                Color::White if origin <= 55 => Some(origin + 8),
                Color::Black if origin >= 8 => Some(origin - 8),
                _ => None,
            };
            if let Some(double_origin) = double_origin {
                if (1u64 << double_origin) & geometry.double_rank & board.bb(us, Piece::Pawn) != 0
                {
                    out.push(Move::pawn_double(
                        Square::from_index(double_origin),
                        to_sq,
                        Square::from_index(origin),
                    ));
                }
            }
        }
    }
}

// ---- fully legal generation (perft, UCI move matching, game status) ----

pub fn generate_legal(board: &Board, out: &mut impl MoveBuffer) {
    out.clear();
    let pins = find_pins(board);
    let mut raw = MoveList::new();
    if in_check(board, board.side_to_move) {
        gen_check_evasions(board, &mut raw);
    } else {
        gen_captures(board, &mut raw);
        gen_quiet(board, &mut raw);
    }
    for &mv in raw.iter() {
        if pseudo_legal(board, pins, mv) {
            out.push(mv);
        }
    }
}
