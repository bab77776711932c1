//! King safety: the attacker-pressure formula fed by the piece walk, the
//! pawn shield and storm in front of the king, and king-pawn proximity
//! for the endgame.

use super::S;
use super::params::*;
use super::pieces::EvalInfo;
use crate::bitboard::{self, file_bb, pop_lsb};
use crate::board::{Board, Color, Piece};
use crate::moves::attacks::{north_moves, south_moves};

/// Pressure against `color`'s king from the recorded zone attacks.
/// Only charged when the attacker still has a queen plus at least one
/// other piece and more than one attacker reached the zone.
pub(crate) fn eval_king_pressure(board: &Board, color: Color, info: &EvalInfo) -> S {
    let attacker = color.opposite();
    let a = attacker as usize;

    let danger_material = board.count(attacker, Piece::Queen) >= 1
        && (board.count(attacker, Piece::Rook)
            + board.count(attacker, Piece::Bishop)
            + board.count(attacker, Piece::Knight))
            >= 1;
    if !danger_material || info.king_attack_count[a] <= 1 {
        return S::ZERO;
    }

    let attack =
        info.king_attack_value[a] * B_KING_ATTACK * KING_ATTACK_MULTI * info.king_attack_count[a]
            / 100;
    -S::new(attack, attack >> 3)
}

/// Shield and storm on the king's file and its neighbors.
pub(crate) fn eval_king_shelter(board: &Board, color: Color) -> S {
    let king = board.king_square(color);
    let them = color.opposite();
    let our_pawns = board.bb(color, Piece::Pawn);
    let their_pawns = board.bb(them, Piece::Pawn);
    let mut score = S::ZERO;

    let king_file = king.file();
    let low_file = king_file.saturating_sub(1);
    let high_file = (king_file + 1).min(7);

    // squares in front of the king, from its own view
    let front = match color {
        Color::White => north_moves(king.index()) | king.bb(),
        Color::Black => south_moves(king.index()) | king.bb(),
    };
    let front_ranks = bitboard::east(front) | front | bitboard::west(front);

    for file in low_file..=high_file {
        // missing shield pawn on this file
        if file_bb(file) & front_ranks & our_pawns == 0 {
            score -= P_PAWN_SHIELD;
        }
        // enemy pawns marching at the king
        let mut stormers = file_bb(file) & front_ranks & their_pawns;
        while stormers != 0 {
            let sq = pop_lsb(&mut stormers);
            let steps = king.distance(crate::square::Square::from_index(sq)) as i32;
            if steps <= 3 {
                score -= P_PAWN_STORM * (4 - steps);
            }
        }
    }
    score
}

/// Endgame tether: the king should stay near its own pawns.
pub(crate) fn eval_king_proximity(board: &Board, color: Color) -> S {
    let pawns = board.bb(color, Piece::Pawn);
    if pawns == 0 {
        return S::ZERO;
    }
    let king = board.king_square(color);
    let mut best = 8i32;
    let mut iter = pawns;
    while iter != 0 {
        let sq = pop_lsb(&mut iter);
        best = best.min(king.distance(crate::square::Square::from_index(sq)) as i32);
    }
    B_PAWN_PROXIMITY * (4 - best)
}
