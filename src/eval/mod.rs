//! Position evaluation.
//!
//! Every term carries an (opening, endgame) pair and the final value
//! interpolates linearly by the material phase. The classical pipeline
//! walks material, cached pawn structure, pieces, king safety and passed
//! pawns; an optional quantized network replaces the whole pipeline while
//! keeping the same side-relative, draw-scaled score conventions.

pub mod king;
pub mod material;
pub mod nnue;
pub mod params;
pub mod pawns;
pub mod pieces;
pub mod psqt;

use crate::bitboard::pop_lsb;
use crate::board::{ALL_PIECES, Board, Color};
use crate::moves::types::Move;
use crate::search::MAX_EVAL;
use material::{NO_DRAW_ADJUST, PHASE_MAX};
use pawns::PawnHashTable;
use std::sync::Arc;

/// Tapered score pair: opening and endgame weights.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct S {
    pub op: i32,
    pub eg: i32,
}

impl S {
    pub const ZERO: S = S::new(0, 0);

    #[inline(always)]
    pub const fn new(op: i32, eg: i32) -> S {
        S { op, eg }
    }

    /// Interpolate by phase: 0 = opening, 48 = endgame.
    #[inline(always)]
    pub fn taper(self, phase: i32) -> i32 {
        (self.op * (PHASE_MAX - phase) + self.eg * phase) / PHASE_MAX
    }
}

impl std::ops::Add for S {
    type Output = S;
    #[inline(always)]
    fn add(self, rhs: S) -> S {
        S::new(self.op + rhs.op, self.eg + rhs.eg)
    }
}

impl std::ops::AddAssign for S {
    #[inline(always)]
    fn add_assign(&mut self, rhs: S) {
        self.op += rhs.op;
        self.eg += rhs.eg;
    }
}

impl std::ops::Sub for S {
    type Output = S;
    #[inline(always)]
    fn sub(self, rhs: S) -> S {
        S::new(self.op - rhs.op, self.eg - rhs.eg)
    }
}

impl std::ops::SubAssign for S {
    #[inline(always)]
    fn sub_assign(&mut self, rhs: S) {
        self.op -= rhs.op;
        self.eg -= rhs.eg;
    }
}

impl std::ops::Neg for S {
    type Output = S;
    #[inline(always)]
    fn neg(self) -> S {
        S::new(-self.op, -self.eg)
    }
}

impl std::ops::Mul<i32> for S {
    type Output = S;
    #[inline(always)]
    fn mul(self, rhs: i32) -> S {
        S::new(self.op * rhs, self.eg * rhs)
    }
}

enum Backend {
    Classical,
    Network(nnue::NnueState),
}

/// Per-worker evaluator: owns the pawn hash and, when a network is loaded,
/// the incremental accumulator stack.
pub struct Evaluator {
    pawn_table: PawnHashTable,
    backend: Backend,
}

impl Evaluator {
    pub fn classical() -> Self {
        Evaluator {
            pawn_table: PawnHashTable::new(),
            backend: Backend::Classical,
        }
    }

    pub fn with_network(net: Arc<nnue::Network>) -> Self {
        Evaluator {
            pawn_table: PawnHashTable::new(),
            backend: Backend::Network(nnue::NnueState::new(net)),
        }
    }

    pub fn is_network(&self) -> bool {
        matches!(self.backend, Backend::Network(_))
    }

    pub fn new_game(&mut self) {
        self.pawn_table.clear();
    }

    /// Prime incremental state at the search root.
    pub fn reset(&mut self, board: &Board) {
        if let Backend::Network(state) = &mut self.backend {
            state.refresh(board);
        }
    }

    /// Track a made move (call right after `make`).
    #[inline]
    pub fn push(&mut self, board_after: &Board, mv: Move) {
        if let Backend::Network(state) = &mut self.backend {
            state.push(board_after, mv);
        }
    }

    /// Track an undone move (call right after `undo`).
    #[inline]
    pub fn pop(&mut self) {
        if let Backend::Network(state) = &mut self.backend {
            state.pop();
        }
    }

    /// Side-relative score, draw-scaled and clamped into the eval band.
    pub fn evaluate(&mut self, board: &Board, alpha: i32, beta: i32) -> i32 {
        let raw = match &mut self.backend {
            Backend::Classical => classical_eval(board, &mut self.pawn_table, alpha, beta),
            Backend::Network(state) => state.evaluate(board),
        };
        let factor = material::draw_factor(board);
        let scaled = if factor == NO_DRAW_ADJUST { raw } else { raw * factor / 64 };
        scaled.clamp(-MAX_EVAL, MAX_EVAL)
    }
}

fn classical_eval(board: &Board, pawn_table: &mut PawnHashTable, alpha: i32, beta: i32) -> i32 {
    let phase = material::phase(board);
    let side_sign = if board.side_to_move == Color::White { 1 } else { -1 };

    let mut total = material::material(board);

    // piece-square tables
    for color in [Color::White, Color::Black] {
        let mut side = S::ZERO;
        for piece in ALL_PIECES {
            let mut bb = board.bb(color, piece);
            while bb != 0 {
                let sq = pop_lsb(&mut bb);
                side += psqt::PSQT[piece as usize][psqt::psqt_index(color, sq)];
            }
        }
        match color {
            Color::White => total += side,
            Color::Black => total -= side,
        }
    }

    // pawn structure from the hash
    let pawn_entry = pawn_table.probe(board);
    total += pawn_entry.score[Color::White as usize] - pawn_entry.score[Color::Black as usize];

    // lazy exit: when material, placement and pawns already land far
    // outside the window the fine-grained terms cannot bring it back
    let coarse = total.taper(phase) * side_sign + params::B_TEMPO;
    if coarse - params::LAZY_MARGIN >= beta || coarse + params::LAZY_MARGIN <= alpha {
        return coarse;
    }

    // piece activity and king-zone pressure
    let mut info = pieces::EvalInfo::new(board);
    total += pieces::eval_pieces(board, Color::White, &mut info);
    total -= pieces::eval_pieces(board, Color::Black, &mut info);

    total += king::eval_king_pressure(board, Color::White, &info);
    total -= king::eval_king_pressure(board, Color::Black, &info);
    total += king::eval_king_shelter(board, Color::White);
    total -= king::eval_king_shelter(board, Color::Black);
    total += king::eval_king_proximity(board, Color::White);
    total -= king::eval_king_proximity(board, Color::Black);

    // passed pawns, using the passer sets cached in the pawn entry
    total += pawns::eval_passers(board, Color::White, pawn_entry.passers[0]);
    total -= pawns::eval_passers(board, Color::Black, pawn_entry.passers[1]);

    total.taper(phase) * side_sign + params::B_TEMPO
}
