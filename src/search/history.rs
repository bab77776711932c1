//! Quiet-move ordering state: killers, beta-cutoff-rate history counters
//! and counter-moves. All of it is per worker; threads never share these.

use crate::board::{Color, Piece};
use crate::moves::types::Move;
use crate::search::MAX_PLY;

/// A move had "bad history" when it was searched but cut off less often
/// than this percentage.
const BAD_HISTORY_PERCENT: u32 = 60;

/// Margin credited to never-searched moves so they are not pruned early.
const UNSEARCHED_MARGIN: i32 = 100;

pub struct MoveOrder {
    /// Times a quiet move to (color, piece, to-square) was searched.
    search_count: [[[u32; 64]; 6]; 2],
    /// Times it produced a beta cutoff.
    cutoff_count: [[[u32; 64]; 6]; 2],
    /// Two killer slots per ply and color.
    killers: [[[Option<Move>; 2]; 2]; MAX_PLY],
    /// Two best replies recorded against (prev-color, prev-piece, prev-to).
    counters: [[[[Option<Move>; 2]; 64]; 6]; 2],
}

impl Default for MoveOrder {
    fn default() -> Self {
        Self::new()
    }
}

impl MoveOrder {
    pub fn new() -> Self {
        MoveOrder {
            search_count: [[[0; 64]; 6]; 2],
            cutoff_count: [[[0; 64]; 6]; 2],
            killers: [[[None; 2]; 2]; MAX_PLY],
            counters: [[[[None; 2]; 64]; 6]; 2],
        }
    }

    /// Re-zero everything; called on `ucinewgame`.
    pub fn clear(&mut self) {
        *self = MoveOrder::new();
    }

    #[inline(always)]
    fn slot(&self, color: Color, mv: Move) -> (usize, usize, usize) {
        (color as usize, mv.piece() as usize, mv.to().index() as usize)
    }

    /// Bookkeeping after a beta cutoff on a quiet move: count the cutoff
    /// move as searched-and-cut, every other tried quiet as searched only,
    /// promote the killer slot, and record the counter-move against the
    /// opponent move that preceded it.
    pub fn save_beta_cutoff(
        &mut self,
        color: Color,
        ply: usize,
        best: Move,
        tried_quiets: &[Move],
        previous: Option<Move>,
    ) {
        let (c, p, t) = self.slot(color, best);
        self.search_count[c][p][t] += 1;
        self.cutoff_count[c][p][t] += 1;

        let killers = &mut self.killers[ply][color as usize];
        if killers[0] != Some(best) {
            killers[1] = killers[0];
            killers[0] = Some(best);
        }

        for &tried in tried_quiets {
            if tried == best {
                continue;
            }
            let (c, p, t) = self.slot(color, tried);
            self.search_count[c][p][t] += 1;
        }

        if let Some(prev) = previous {
            if !prev.is_null() {
                let slot = &mut self.counters[color.opposite() as usize][prev.piece() as usize]
                    [prev.to().index() as usize];
                if slot[0] != Some(best) {
                    slot[1] = slot[0];
                    slot[0] = Some(best);
                }
            }
        }
    }

    #[inline(always)]
    pub fn killers(&self, color: Color, ply: usize) -> [Option<Move>; 2] {
        self.killers[ply][color as usize]
    }

    #[inline(always)]
    pub fn is_killer(&self, color: Color, ply: usize, mv: Move) -> bool {
        let k = &self.killers[ply][color as usize];
        k[0] == Some(mv) || k[1] == Some(mv)
    }

    /// The two recorded replies to the opponent's previous move.
    #[inline(always)]
    pub fn counter_moves(&self, prev_color: Color, previous: Option<Move>) -> [Option<Move>; 2] {
        match previous {
            Some(prev) if !prev.is_null() => {
                self.counters[prev_color as usize][prev.piece() as usize]
                    [prev.to().index() as usize]
            }
            _ => [None, None],
        }
    }

    #[inline(always)]
    pub fn is_counter_move(&self, prev_color: Color, previous: Option<Move>, mv: Move) -> bool {
        let c = self.counter_moves(prev_color, previous);
        c[0] == Some(mv) || c[1] == Some(mv)
    }

    /// Beta-cutoff percentage for ordering; unsearched moves score zero.
    #[inline(always)]
    pub fn cutoff_percent(&self, color: Color, mv: Move) -> i32 {
        let (c, p, t) = self.slot(color, mv);
        let searched = self.search_count[c][p][t];
        if searched == 0 {
            0
        } else {
            (self.cutoff_count[c][p][t] * 100 / searched) as i32
        }
    }

    /// Futility margin contribution: unsearched moves get the benefit of
    /// the doubt.
    #[inline(always)]
    pub fn pruning_margin(&self, color: Color, mv: Move) -> i32 {
        let (c, p, t) = self.slot(color, mv);
        let searched = self.search_count[c][p][t];
        if searched == 0 {
            UNSEARCHED_MARGIN
        } else {
            (self.cutoff_count[c][p][t] * 100 / searched) as i32
        }
    }

    #[inline(always)]
    pub fn has_bad_history(&self, color: Color, mv: Move) -> bool {
        let (c, p, t) = self.slot(color, mv);
        let searched = self.search_count[c][p][t];
        searched != 0 && self.cutoff_count[c][p][t] * 100 / searched < BAD_HISTORY_PERCENT
    }
}

// Keep the board wiring honest: piece indices feed straight into arrays.
const _: () = assert!(Piece::King as usize == 5);
