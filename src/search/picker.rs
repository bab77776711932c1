//! Staged move picker.
//!
//! Yields moves in phases, generating each batch only when the previous
//! one runs dry: transposition move, winning captures by SEE, killers,
//! counter-moves, remaining quiets by cutoff-rate history, losing captures
//! last. An early beta cutoff means the later phases are never generated.
//!
//! In check the picker switches to the evasion generator and orders the
//! (already check-resolving) moves in one scored batch. The caller remains
//! responsible for the pseudo-legality test on every yielded move.

use crate::board::Board;
use crate::moves::movegen::{gen_captures, gen_check_evasions, gen_quiet};
use crate::moves::types::Move;
use crate::search::history::MoveOrder;
use crate::search::see::see;
use arrayvec::ArrayVec;

const TT_SCORE: i32 = 1 << 30;
const CAPTURE_SCORE: i32 = 1 << 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    TtMove,
    GenCaptures,
    GoodCaptures,
    Killer(usize),
    Counter(usize),
    GenQuiets,
    Quiets,
    BadCaptures,
    GenEvasions,
    Evasions,
    Done,
}

type ScoredMoves = ArrayVec<(Move, i32), 256>;

/// Selection-sort over a scored buffer: each call extracts the best
/// remaining entry. Cheap because cutoffs usually stop after a few picks.
fn pick_best(moves: &mut ScoredMoves, next: &mut usize) -> Option<Move> {
    if *next >= moves.len() {
        return None;
    }
    let mut best = *next;
    for i in (*next + 1)..moves.len() {
        if moves[i].1 > moves[best].1 {
            best = i;
        }
    }
    moves.swap(*next, best);
    let mv = moves[*next].0;
    *next += 1;
    Some(mv)
}

pub struct MovePicker {
    stage: Stage,
    tt_move: Option<Move>,
    killers: [Option<Move>; 2],
    counters: [Option<Move>; 2],
    captures_only: bool,

    good_captures: ScoredMoves,
    bad_captures: ScoredMoves,
    quiets: ScoredMoves,
    good_next: usize,
    bad_next: usize,
    quiet_next: usize,
}

impl MovePicker {
    /// Full picker for main-search nodes.
    pub fn new(
        in_check: bool,
        tt_move: Option<Move>,
        killers: [Option<Move>; 2],
        counters: [Option<Move>; 2],
    ) -> Self {
        MovePicker {
            stage: if in_check { Stage::GenEvasions } else { Stage::TtMove },
            tt_move,
            killers,
            counters,
            captures_only: false,
            good_captures: ScoredMoves::new(),
            bad_captures: ScoredMoves::new(),
            quiets: ScoredMoves::new(),
            good_next: 0,
            bad_next: 0,
            quiet_next: 0,
        }
    }

    /// Captures-only picker for quiescence and ProbCut; switches to full
    /// evasions when the side to move is in check.
    pub fn captures(in_check: bool) -> Self {
        MovePicker {
            stage: if in_check { Stage::GenEvasions } else { Stage::GenCaptures },
            tt_move: None,
            killers: [None, None],
            counters: [None, None],
            captures_only: true,
            good_captures: ScoredMoves::new(),
            bad_captures: ScoredMoves::new(),
            quiets: ScoredMoves::new(),
            good_next: 0,
            bad_next: 0,
            quiet_next: 0,
        }
    }

    #[inline]
    fn is_tt(&self, mv: Move) -> bool {
        self.tt_move == Some(mv)
    }

    #[inline]
    fn is_special_quiet(&self, mv: Move) -> bool {
        self.is_tt(mv)
            || self.killers.contains(&Some(mv))
            || self.counters.contains(&Some(mv))
    }

    pub fn next(&mut self, board: &Board, order: &MoveOrder) -> Option<Move> {
        let us = board.side_to_move;
        loop {
            match self.stage {
                Stage::TtMove => {
                    self.stage = Stage::GenCaptures;
                    if let Some(mv) = self.tt_move {
                        return Some(mv);
                    }
                }

                Stage::GenCaptures => {
                    let mut generated: ArrayVec<Move, 128> = ArrayVec::new();
                    gen_captures(board, &mut generated);
                    for &mv in generated.iter() {
                        if self.is_tt(mv) {
                            continue;
                        }
                        let exchange = see(board, mv);
                        if exchange >= 0 {
                            self.good_captures.push((mv, CAPTURE_SCORE + exchange));
                        } else {
                            self.bad_captures.push((mv, exchange));
                        }
                    }
                    self.stage = Stage::GoodCaptures;
                }

                Stage::GoodCaptures => {
                    if let Some(mv) = pick_best(&mut self.good_captures, &mut self.good_next) {
                        return Some(mv);
                    }
                    self.stage = if self.captures_only {
                        Stage::BadCaptures
                    } else {
                        Stage::Killer(0)
                    };
                }

                Stage::Killer(i) => {
                    self.stage = if i == 0 { Stage::Killer(1) } else { Stage::Counter(0) };
                    if let Some(k) = self.killers[i] {
                        if k.is_quiet() && !self.is_tt(k) && (i == 0 || self.killers[0] != Some(k))
                        {
                            return Some(k);
                        }
                    }
                }

                Stage::Counter(i) => {
                    self.stage = if i == 0 { Stage::Counter(1) } else { Stage::GenQuiets };
                    if let Some(c) = self.counters[i] {
                        let duplicate = self.is_tt(c)
                            || self.killers.contains(&Some(c))
                            || (i == 1 && self.counters[0] == Some(c));
                        if c.is_quiet() && !duplicate {
                            return Some(c);
                        }
                    }
                }

                Stage::GenQuiets => {
                    let mut generated: ArrayVec<Move, 256> = ArrayVec::new();
                    gen_quiet(board, &mut generated);
                    for &mv in generated.iter() {
                        if self.is_special_quiet(mv) {
                            continue;
                        }
                        self.quiets.push((mv, order.cutoff_percent(us, mv)));
                    }
                    self.stage = Stage::Quiets;
                }

                Stage::Quiets => {
                    if let Some(mv) = pick_best(&mut self.quiets, &mut self.quiet_next) {
                        return Some(mv);
                    }
                    self.stage = Stage::BadCaptures;
                }

                Stage::BadCaptures => {
                    if let Some(mv) = pick_best(&mut self.bad_captures, &mut self.bad_next) {
                        return Some(mv);
                    }
                    self.stage = Stage::Done;
                }

                Stage::GenEvasions => {
                    // one scored batch: the evasion generator already
                    // restricted the moves to check resolutions
                    let mut generated: ArrayVec<Move, 128> = ArrayVec::new();
                    gen_check_evasions(board, &mut generated);
                    for &mv in generated.iter() {
                        let score = if self.is_tt(mv) {
                            TT_SCORE
                        } else if mv.is_capture() || mv.is_promotion() {
                            CAPTURE_SCORE + see(board, mv)
                        } else {
                            order.cutoff_percent(us, mv)
                        };
                        self.good_captures.push((mv, score));
                    }
                    self.stage = Stage::Evasions;
                }

                Stage::Evasions => {
                    if let Some(mv) = pick_best(&mut self.good_captures, &mut self.good_next) {
                        return Some(mv);
                    }
                    self.stage = Stage::Done;
                }

                Stage::Done => return None,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::moves::movegen::generate_legal;
    use crate::moves::square_control::{find_pins, in_check, pseudo_legal};
    use crate::moves::types::MoveList;
    use std::str::FromStr;

    fn picker_moves(board: &Board, picker: &mut MovePicker) -> Vec<Move> {
        let order = MoveOrder::new();
        let pins = find_pins(board);
        let mut out = Vec::new();
        while let Some(mv) = picker.next(board, &order) {
            if pseudo_legal(board, pins, mv) {
                out.push(mv);
            }
        }
        out
    }

    #[test]
    fn yields_exactly_the_legal_moves() {
        for fen in [
            "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1",
            "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1",
            "4k3/8/8/3pP3/8/8/8/4K3 w - d6 0 2",
            // in check
            "4k3/8/8/8/8/8/4r3/4K3 w - - 0 1",
        ] {
            let board: Board = fen.parse().unwrap();
            let mut legal = MoveList::new();
            generate_legal(&board, &mut legal);

            let mut picker =
                MovePicker::new(in_check(&board, board.side_to_move), None, [None, None], [None, None]);
            let picked = picker_moves(&board, &mut picker);

            assert_eq!(picked.len(), legal.len(), "count mismatch in {}", fen);
            for mv in &picked {
                assert!(legal.contains(mv), "picker invented {} in {}", mv, fen);
            }
            let mut dedup = picked.clone();
            dedup.sort_by_key(|m| m.raw());
            dedup.dedup();
            assert_eq!(dedup.len(), picked.len(), "duplicate moves in {}", fen);
        }
    }

    #[test]
    fn tt_move_comes_first() {
        let board = Board::new();
        let mut legal = MoveList::new();
        generate_legal(&board, &mut legal);
        let tt_move = *legal.iter().find(|m| m.to_uci() == "e2e4").unwrap();

        let mut picker = MovePicker::new(false, Some(tt_move), [None, None], [None, None]);
        let picked = picker_moves(&board, &mut picker);
        assert_eq!(picked[0], tt_move);
        assert_eq!(picked.iter().filter(|&&m| m == tt_move).count(), 1);
    }

    #[test]
    fn winning_captures_precede_losing_ones() {
        // QxP is losing (defended), NxP is winning
        let board: Board = "3r4/8/8/8/3p4/5N2/8/3QK3 w - - 0 1".parse().unwrap();
        let mut picker = MovePicker::new(false, None, [None, None], [None, None]);
        let picked = picker_moves(&board, &mut picker);

        let nxp = picked.iter().position(|m| m.to_uci() == "f3d4").unwrap();
        let qxp = picked.iter().position(|m| m.to_uci() == "d1d4").unwrap();
        assert!(nxp < qxp, "winning capture should come before the losing one");
        // the losing capture comes after every quiet move
        let last_quiet = picked.iter().rposition(|m| m.is_quiet()).unwrap();
        assert!(qxp > last_quiet);
    }

    #[test]
    fn killers_precede_ordinary_quiets() {
        let board = Board::new();
        let mut legal = MoveList::new();
        generate_legal(&board, &mut legal);
        let killer = *legal.iter().find(|m| m.to_uci() == "b1c3").unwrap();

        let mut picker = MovePicker::new(false, None, [Some(killer), None], [None, None]);
        let picked = picker_moves(&board, &mut picker);
        let killer_pos = picked.iter().position(|&m| m == killer).unwrap();
        // no captures in the start position, so the killer leads
        assert_eq!(killer_pos, 0);
        assert_eq!(picked.iter().filter(|&&m| m == killer).count(), 1);
    }

    #[test]
    fn captures_only_mode_stays_tactical() {
        let board: Board =
            "r1bqkb1r/pppp1ppp/2n2n2/4p3/2B1P3/5N2/PPPP1PPP/RNBQK2R w KQkq - 4 4".parse().unwrap();
        let mut picker = MovePicker::captures(false);
        let picked = picker_moves(&board, &mut picker);
        assert!(!picked.is_empty());
        assert!(picked.iter().all(|m| m.is_capture() || m.is_promotion()));
    }
}
