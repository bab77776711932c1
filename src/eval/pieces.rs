//! Piece-wise evaluation walk: mobility, threats, king-zone pressure and
//! the piece-specific bonuses and penalties.

use super::S;
use super::params::*;
use crate::bitboard::{self, file_bb, pop_lsb};
use crate::board::{Board, Color, Piece};
use crate::moves::attacks::{king_attacks, knight_attacks};
use crate::moves::magic;

/// Cross-term state collected during the walk and consumed by the king
/// safety evaluation.
pub(crate) struct EvalInfo {
    /// Squares attacked by each side's pawns.
    pub pawn_attacks: [u64; 2],
    /// 3x3 zone around each king.
    pub king_zone: [u64; 2],
    /// Attackers of the *opponent* king zone, per attacking side.
    pub king_attack_count: [i32; 2],
    pub king_attack_value: [i32; 2],
}

impl EvalInfo {
    pub fn new(board: &Board) -> Self {
        let mut pawn_atk = [0u64; 2];
        for color in [Color::White, Color::Black] {
            let pawns = board.bb(color, Piece::Pawn);
            pawn_atk[color as usize] = match color {
                Color::White => bitboard::north_east(pawns) | bitboard::north_west(pawns),
                Color::Black => bitboard::south_east(pawns) | bitboard::south_west(pawns),
            };
        }
        let zone = |color: Color| {
            let k = board.king_square(color);
            king_attacks(k.index()) | k.bb()
        };
        EvalInfo {
            pawn_attacks: pawn_atk,
            king_zone: [zone(Color::White), zone(Color::Black)],
            king_attack_count: [0; 2],
            king_attack_value: [0; 2],
        }
    }
}

/// Evaluate all non-pawn, non-king pieces of `color`. Returns the score
/// from that side's view and records king-zone pressure in `info`.
pub(crate) fn eval_pieces(board: &Board, color: Color, info: &mut EvalInfo) -> S {
    let us = color as usize;
    let them_color = color.opposite();
    let them = them_color as usize;
    let occ = board.occupied();
    let t = magic::tables();
    let mut score = S::ZERO;

    // mobility counts squares not held by our pieces and not covered by
    // enemy pawns
    let mobility_area = !board.occupancy(color) & !info.pawn_attacks[them];
    let enemy_zone = info.king_zone[them];
    let enemy_pawns = board.bb(them_color, Piece::Pawn);
    let our_pawns = board.bb(color, Piece::Pawn);

    // squares the enemy defends with pawns do not count as threats
    let undefended = board.occupancy(them_color) & !info.pawn_attacks[them];

    // pawn attacks on pieces
    let pawn_hits = info.pawn_attacks[us] & board.occupancy(them_color);
    score += P_PAWN_ATK_KNIGHT * (pawn_hits & board.bb(them_color, Piece::Knight)).count_ones() as i32;
    score += P_PAWN_ATK_BISHOP * (pawn_hits & board.bb(them_color, Piece::Bishop)).count_ones() as i32;
    score += P_PAWN_ATK_ROOK * (pawn_hits & board.bb(them_color, Piece::Rook)).count_ones() as i32;
    score += P_PAWN_ATK_QUEEN * (pawn_hits & board.bb(them_color, Piece::Queen)).count_ones() as i32;

    for piece in [Piece::Knight, Piece::Bishop, Piece::Rook, Piece::Queen] {
        let mut movers = board.bb(color, piece);
        while movers != 0 {
            let sq = pop_lsb(&mut movers);
            let attacks = match piece {
                Piece::Knight => knight_attacks(sq),
                Piece::Bishop => t.bishop.attacks(sq as usize, occ),
                Piece::Rook => t.rook.attacks(sq as usize, occ),
                Piece::Queen => t.queen_attacks(sq as usize, occ),
                _ => unreachable!(),
            };

            // mobility
            let reach = (attacks & mobility_area).count_ones() as i32;
            score += match piece {
                Piece::Knight => B_KNIGHT_MOBILITY * reach,
                Piece::Bishop => B_BISHOP_MOBILITY * reach,
                Piece::Rook => B_ROOK_MOBILITY * reach,
                Piece::Queen => B_QUEEN_MOBILITY * reach,
                _ => unreachable!(),
            };

            // threats against undefended pieces
            let hits = attacks & undefended;
            score += B_THREAT_PAWN * (hits & enemy_pawns).count_ones() as i32;
            score += B_THREAT_KNIGHT * (hits & board.bb(them_color, Piece::Knight)).count_ones() as i32;
            score += B_THREAT_BISHOP * (hits & board.bb(them_color, Piece::Bishop)).count_ones() as i32;
            score += B_THREAT_ROOK * (hits & board.bb(them_color, Piece::Rook)).count_ones() as i32;
            score += B_THREAT_QUEEN * (hits & board.bb(them_color, Piece::Queen)).count_ones() as i32;

            // king-zone pressure feeds the safety formula
            if attacks & enemy_zone != 0 {
                info.king_attack_count[us] += 1;
                info.king_attack_value[us] += match piece {
                    Piece::Knight => KING_ATTACK_KNIGHT,
                    Piece::Bishop => KING_ATTACK_BISHOP,
                    Piece::Rook => KING_ATTACK_ROOK,
                    Piece::Queen => KING_ATTACK_QUEEN,
                    _ => unreachable!(),
                };
            }

            match piece {
                Piece::Bishop => {
                    // own pawns on the bishop's square color blunt it
                    let bishop_color_squares = if (1u64 << sq) & bitboard::LIGHT_SQUARES != 0 {
                        bitboard::LIGHT_SQUARES
                    } else {
                        bitboard::DARK_SQUARES
                    };
                    score -= P_PAWN_BISHOP_SQ
                        * (our_pawns & bishop_color_squares).count_ones() as i32;

                    // trapped on a7/h7 (a2/h2 for black) behind a pawn duo
                    if trapped_bishop(board, color, sq) {
                        score -= P_TRAPPED_BISHOP;
                    }
                }
                Piece::Rook => {
                    let file = file_bb(sq & 7);
                    if file & our_pawns == 0 {
                        if file & enemy_pawns == 0 {
                            score += B_ROOK_FULL_OPEN;
                        } else {
                            score += B_ROOK_SEMI_OPEN;
                        }
                    }
                    if on_seventh(color, sq) && seventh_matters(board, color) {
                        score += B_ROOK_RANK7;
                    }
                    if trapped_rook(board, color, sq) {
                        score -= P_TRAPPED_ROOK;
                    }
                }
                Piece::Queen => {
                    if on_seventh(color, sq) && seventh_matters(board, color) {
                        score += B_ROOK_RANK7;
                    }
                }
                Piece::Knight => {}
                _ => unreachable!(),
            }
        }
    }

    // a minor parked in front of an undeveloped center pawn jams the
    // whole opening setup
    let home_pawns = match color {
        Color::White => our_pawns & bitboard::RANK_2 & (file_bb(3) | file_bb(4)),
        Color::Black => our_pawns & bitboard::RANK_7 & (file_bb(3) | file_bb(4)),
    };
    let blockers = match color {
        Color::White => bitboard::north(home_pawns),
        Color::Black => bitboard::south(home_pawns),
    };
    let minors = board.bb(color, Piece::Knight) | board.bb(color, Piece::Bishop);
    score -= P_MINOR_BLOCKS_PAWN * (blockers & minors).count_ones() as i32;

    score
}

/// Relative seventh rank for the attacking side.
#[inline]
fn on_seventh(color: Color, sq: u8) -> bool {
    match color {
        Color::White => (1u64 << sq) & bitboard::RANK_7 != 0,
        Color::Black => (1u64 << sq) & bitboard::RANK_2 != 0,
    }
}

/// A rook or queen on the seventh only earns its keep against pawns on
/// that rank or a king cut off behind it.
fn seventh_matters(board: &Board, color: Color) -> bool {
    let them = color.opposite();
    let (their_back, their_seventh) = match color {
        Color::White => (bitboard::RANK_8, bitboard::RANK_7),
        Color::Black => (bitboard::RANK_1, bitboard::RANK_2),
    };
    board.bb(them, Piece::Pawn) & their_seventh != 0
        || board.king_square(them).bb() & their_back != 0
}

/// The classic a7/h7 trap: bishop bites on granite when the b6/g6 pawn is
/// defended. Square indices are (bishop, near guard, far guard).
fn trapped_bishop(board: &Board, color: Color, sq: u8) -> bool {
    let enemy_pawns = board.bb(color.opposite(), Piece::Pawn);
    let traps: [(u8, u8, u8); 2] = match color {
        Color::White => [(8, 17, 10), (15, 22, 13)],  // a7/b6/c7, h7/g6/f7
        Color::Black => [(48, 41, 50), (55, 46, 53)], // a2/b3/c2, h2/g3/f2
    };
    traps.iter().any(|&(bishop, guard1, guard2)| {
        sq == bishop && enemy_pawns & (1u64 << guard1) != 0 && enemy_pawns & (1u64 << guard2) != 0
    })
}

/// Rook shut in by its own uncastled king in the corner.
fn trapped_rook(board: &Board, color: Color, sq: u8) -> bool {
    if board.has_kingside_castle(color) || board.has_queenside_castle(color) {
        return false;
    }
    let king_file = board.king_square(color).file();
    let king_on_back = match color {
        Color::White => board.king_square(color).bb() & bitboard::RANK_1 != 0,
        Color::Black => board.king_square(color).bb() & bitboard::RANK_8 != 0,
    };
    if !king_on_back {
        return false;
    }
    let rook_on_back = match color {
        Color::White => (1u64 << sq) & bitboard::RANK_1 != 0,
        Color::Black => (1u64 << sq) & bitboard::RANK_8 != 0,
    };
    let rook_file = sq & 7;
    rook_on_back
        && ((king_file >= 4 && rook_file > king_file) || (king_file < 4 && rook_file < king_file))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn score_of(fen: &str, color: Color) -> S {
        let board: Board = fen.parse().unwrap();
        let mut info = EvalInfo::new(&board);
        eval_pieces(&board, color, &mut info)
    }

    #[test]
    fn open_file_rook_outscores_closed_one() {
        let open = score_of("4k3/8/8/8/8/8/4P3/R3K3 w - - 0 1", Color::White);
        let closed = score_of("4k3/8/8/8/8/8/P7/R3K3 w - - 0 1", Color::White);
        assert!(open.op > closed.op);
    }

    #[test]
    fn centralized_knight_has_more_mobility_value() {
        let central = score_of("4k3/8/8/8/3N4/8/8/4K3 w - - 0 1", Color::White);
        let cornered = score_of("4k3/8/8/8/8/8/8/N3K3 w - - 0 1", Color::White);
        assert!(central.op > cornered.op);
    }

    #[test]
    fn king_zone_pressure_is_recorded() {
        let board: Board = "4k3/4r3/8/8/8/8/8/4K3 w - - 0 1".parse().unwrap();
        let mut info = EvalInfo::new(&board);
        let _ = eval_pieces(&board, Color::Black, &mut info);
        assert_eq!(info.king_attack_count[Color::Black as usize], 1);
        assert_eq!(info.king_attack_value[Color::Black as usize], KING_ATTACK_ROOK);
    }

    #[test]
    fn trapped_bishop_detected() {
        // bishop on a7 locked in by the b6/c7 pawn chain
        let trapped = score_of("4k3/B1p5/1p6/8/8/8/8/4K3 w - - 0 1", Color::White);
        let free = score_of("4k3/B7/8/8/8/8/8/4K3 w - - 0 1", Color::White);
        assert!(trapped.op < free.op);
    }
}
