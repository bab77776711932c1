//! Quantized feed-forward evaluator over halfkp features.
//!
//! Features are (own-king square, piece, square) triples, mirrored for the
//! opposite perspective. The 256-wide first layer is maintained
//! incrementally alongside make/undo; king moves refresh the affected
//! perspective wholesale. Inference is 512 -> 32 -> 32 -> 1 with 8-bit
//! weights, 32-bit biases and a clipped ReLU between layers. The inner
//! loops are plain scalar code; only the integer results matter.

use crate::board::{Board, Color, Piece};
use crate::moves::types::Move;
use crate::search::MAX_PLY;
use std::sync::Arc;

pub const NNUE_VERSION: u32 = 0x7AF3_2F16;
const HEADER_HASH: u32 = 0x3E5A_A6EE;
const HEADER_LEN: u32 = 177;
const TRANSFORMER_HASH: u32 = 0x5D69_D7B8;
const NETWORK_HASH: u32 = 0x6333_7156;

pub const FILE_SIZE: usize = 21_022_697;

const HALF_DIMS: usize = 256;
const PS_END: usize = 10 * 64 + 1;
const FT_IN_DIMS: usize = 64 * PS_END;
const TRANSFORMER_START: usize = 3 * 4 + HEADER_LEN as usize;
const NETWORK_START: usize = TRANSFORMER_START + 4 + 2 * HALF_DIMS + 2 * HALF_DIMS * FT_IN_DIMS;

const HIDDEN: usize = 32;
const FT_OUT: usize = 2 * HALF_DIMS;
const SHIFT: i32 = 6;
const FV_SCALE: i32 = 16;

/// Per-perspective feature offsets: `[perspective][color][piece]`, kings
/// excluded (they index the table, they are not features).
const PIECE_OFFSET: [[[usize; 5]; 2]; 2] = {
    const W: [usize; 5] = [1, 129, 257, 385, 513]; // P N B R Q as "friendly"
    const B: [usize; 5] = [65, 193, 321, 449, 577]; // P N B R Q as "enemy"
    [[W, B], [B, W]]
};

pub struct Network {
    ft_bias: Vec<i16>,
    ft_weights: Vec<i16>,
    h1_bias: Vec<i32>,
    h1_weights: Vec<i8>,
    h2_bias: Vec<i32>,
    h2_weights: Vec<i8>,
    out_bias: i32,
    out_weights: Vec<i8>,
}

fn read_u32(bytes: &[u8], at: usize) -> u32 {
    u32::from_le_bytes(bytes[at..at + 4].try_into().unwrap())
}

impl Network {
    /// Load and verify a weights file. The magic version, the two header
    /// words and both section markers must all match before any weight is
    /// accepted.
    pub fn load(path: &str) -> Result<Arc<Network>, String> {
        let bytes = std::fs::read(path).map_err(|e| format!("cannot read {:?}: {}", path, e))?;
        Self::from_bytes(&bytes)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Arc<Network>, String> {
        if bytes.len() != FILE_SIZE {
            return Err(format!(
                "network file has {} bytes, expected {}",
                bytes.len(),
                FILE_SIZE
            ));
        }
        if read_u32(bytes, 0) != NNUE_VERSION {
            return Err("bad network version magic".to_string());
        }
        if read_u32(bytes, 4) != HEADER_HASH || read_u32(bytes, 8) != HEADER_LEN {
            return Err("bad network header".to_string());
        }
        if read_u32(bytes, TRANSFORMER_START) != TRANSFORMER_HASH {
            return Err("bad feature-transformer marker".to_string());
        }
        if read_u32(bytes, NETWORK_START) != NETWORK_HASH {
            return Err("bad network-section marker".to_string());
        }

        let mut at = TRANSFORMER_START + 4;
        let mut read_i16s = |count: usize, at: &mut usize| -> Vec<i16> {
            let mut out = Vec::with_capacity(count);
            for _ in 0..count {
                out.push(i16::from_le_bytes(bytes[*at..*at + 2].try_into().unwrap()));
                *at += 2;
            }
            out
        };
        let ft_bias = read_i16s(HALF_DIMS, &mut at);
        let ft_weights = read_i16s(HALF_DIMS * FT_IN_DIMS, &mut at);
        debug_assert_eq!(at, NETWORK_START);

        let mut at = NETWORK_START + 4;
        let mut read_i32s = |count: usize, at: &mut usize| -> Vec<i32> {
            let mut out = Vec::with_capacity(count);
            for _ in 0..count {
                out.push(i32::from_le_bytes(bytes[*at..*at + 4].try_into().unwrap()));
                *at += 4;
            }
            out
        };
        let read_i8s = |count: usize, at: &mut usize| -> Vec<i8> {
            let out = bytes[*at..*at + count].iter().map(|&b| b as i8).collect();
            *at += count;
            out
        };

        let h1_bias = read_i32s(HIDDEN, &mut at);
        let h1_weights = read_i8s(HIDDEN * FT_OUT, &mut at);
        let h2_bias = read_i32s(HIDDEN, &mut at);
        let h2_weights = read_i8s(HIDDEN * HIDDEN, &mut at);
        let out_bias = read_i32s(1, &mut at)[0];
        let out_weights = read_i8s(HIDDEN, &mut at);

        if at != bytes.len() {
            return Err("trailing bytes after network weights".to_string());
        }

        Ok(Arc::new(Network {
            ft_bias,
            ft_weights,
            h1_bias,
            h1_weights,
            h2_bias,
            h2_weights,
            out_bias,
            out_weights,
        }))
    }
}

/// Feature index for one piece from one perspective.
///
/// The trained weights use the bottom-up square numbering, so board
/// squares are flipped vertically first; the black perspective mirrors
/// once more.
#[inline]
fn feature_index(perspective: Color, king_sq: u8, color: Color, piece: Piece, sq: u8) -> usize {
    debug_assert!(piece != Piece::King);
    let orient = |s: u8| -> usize {
        let sf = (s ^ 56) as usize;
        match perspective {
            Color::White => sf,
            Color::Black => sf ^ 0x3F,
        }
    };
    orient(sq) + PIECE_OFFSET[perspective as usize][color as usize][piece as usize]
        + PS_END * orient(king_sq)
}

#[derive(Clone)]
struct Accumulator {
    values: [[i16; HALF_DIMS]; 2],
}

impl Accumulator {
    fn zero() -> Self {
        Accumulator {
            values: [[0; HALF_DIMS]; 2],
        }
    }
}

/// Incremental evaluator state: one accumulator per search ply.
pub struct NnueState {
    net: Arc<Network>,
    stack: Vec<Accumulator>,
    top: usize,
}

impl NnueState {
    pub fn new(net: Arc<Network>) -> Self {
        NnueState {
            net,
            stack: vec![Accumulator::zero(); MAX_PLY + 2],
            top: 0,
        }
    }

    fn refresh_perspective(&mut self, board: &Board, slot: usize, perspective: Color) {
        let king_sq = board.king_square(perspective).index();
        let mut acc = [0i32; HALF_DIMS];
        for (i, v) in acc.iter_mut().enumerate() {
            *v = self.net.ft_bias[i] as i32;
        }
        for color in [Color::White, Color::Black] {
            for piece in [Piece::Pawn, Piece::Knight, Piece::Bishop, Piece::Rook, Piece::Queen] {
                let mut bb = board.bb(color, piece);
                while bb != 0 {
                    let sq = crate::bitboard::pop_lsb(&mut bb);
                    let index = feature_index(perspective, king_sq, color, piece, sq);
                    let weights = &self.net.ft_weights[index * HALF_DIMS..(index + 1) * HALF_DIMS];
                    for (v, &w) in acc.iter_mut().zip(weights) {
                        *v += w as i32;
                    }
                }
            }
        }
        for (v, &a) in self.stack[slot].values[perspective as usize].iter_mut().zip(&acc) {
            *v = a as i16;
        }
    }

    /// Rebuild both accumulators from scratch; used at the root and after
    /// king moves.
    pub fn refresh(&mut self, board: &Board) {
        self.top = 0;
        self.refresh_perspective(board, 0, Color::White);
        self.refresh_perspective(board, 0, Color::Black);
    }

    fn apply_delta(
        &mut self,
        slot: usize,
        perspective: Color,
        king_sq: u8,
        removed: &[(Color, Piece, u8)],
        added: &[(Color, Piece, u8)],
    ) {
        let (lower, upper) = self.stack.split_at_mut(slot);
        let parent = &lower[lower.len() - 1].values[perspective as usize];
        let child = &mut upper[0].values[perspective as usize];
        child.copy_from_slice(parent);

        for &(color, piece, sq) in removed {
            let index = feature_index(perspective, king_sq, color, piece, sq);
            let weights = &self.net.ft_weights[index * HALF_DIMS..(index + 1) * HALF_DIMS];
            for (v, &w) in child.iter_mut().zip(weights) {
                *v -= w;
            }
        }
        for &(color, piece, sq) in added {
            let index = feature_index(perspective, king_sq, color, piece, sq);
            let weights = &self.net.ft_weights[index * HALF_DIMS..(index + 1) * HALF_DIMS];
            for (v, &w) in child.iter_mut().zip(weights) {
                *v += w;
            }
        }
    }

    /// Advance one ply for a move that was just made. `board` is the
    /// position after the move.
    pub fn push(&mut self, board: &Board, mv: Move) {
        let slot = self.top + 1;
        debug_assert!(slot < self.stack.len());

        if mv.is_null() {
            let parent = self.stack[self.top].clone();
            self.stack[slot] = parent;
            self.top = slot;
            return;
        }

        let mover = board.side_to_move.opposite();
        if mv.piece() == Piece::King {
            // the king square keys every own-perspective feature; a full
            // rebuild of both sides is the simple sound option
            self.refresh_perspective(board, slot, Color::White);
            self.refresh_perspective(board, slot, Color::Black);
            self.top = slot;
            return;
        }

        let mut removed: arrayvec::ArrayVec<(Color, Piece, u8), 3> = arrayvec::ArrayVec::new();
        let mut added: arrayvec::ArrayVec<(Color, Piece, u8), 3> = arrayvec::ArrayVec::new();

        removed.push((mover, mv.piece(), mv.from().index()));
        match mv.promotion() {
            Some(promo) => added.push((mover, promo, mv.to().index())),
            None => added.push((mover, mv.piece(), mv.to().index())),
        }
        if mv.is_en_passant() {
            removed.push((mover.opposite(), Piece::Pawn, mv.ep_square().index()));
        } else if mv.is_capture() {
            removed.push((mover.opposite(), mv.captured(), mv.to().index()));
        }

        for perspective in [Color::White, Color::Black] {
            let king_sq = board.king_square(perspective).index();
            self.apply_delta(slot, perspective, king_sq, &removed, &added);
        }
        self.top = slot;
    }

    pub fn pop(&mut self) {
        debug_assert!(self.top > 0);
        self.top -= 1;
    }

    /// Forward pass from the side to move's perspective.
    pub fn evaluate(&mut self, board: &Board) -> i32 {
        let stm = board.side_to_move;
        let acc = &self.stack[self.top];

        let mut input = [0i32; FT_OUT];
        for (half, &perspective) in [stm, stm.opposite()].iter().enumerate() {
            let values = &acc.values[perspective as usize];
            for (i, &v) in values.iter().enumerate() {
                input[half * HALF_DIMS + i] = (v as i32).clamp(0, 127);
            }
        }

        let mut h1 = [0i32; HIDDEN];
        for (i, out) in h1.iter_mut().enumerate() {
            let mut sum = self.net.h1_bias[i];
            let row = &self.net.h1_weights[i * FT_OUT..(i + 1) * FT_OUT];
            for (&w, &x) in row.iter().zip(&input) {
                sum += w as i32 * x;
            }
            *out = (sum >> SHIFT).clamp(0, 127);
        }

        let mut h2 = [0i32; HIDDEN];
        for (i, out) in h2.iter_mut().enumerate() {
            let mut sum = self.net.h2_bias[i];
            let row = &self.net.h2_weights[i * HIDDEN..(i + 1) * HIDDEN];
            for (&w, &x) in row.iter().zip(&h1) {
                sum += w as i32 * x;
            }
            *out = (sum >> SHIFT).clamp(0, 127);
        }

        let mut sum = self.net.out_bias;
        for (&w, &x) in self.net.out_weights.iter().zip(&h2) {
            sum += w as i32 * x;
        }
        sum / FV_SCALE
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::moves::execute::{make, undo};
    use crate::moves::movegen::generate_legal;
    use crate::moves::types::MoveList;

    /// Synthetic network with valid framing; weights are position-derived
    /// noise so accumulator bugs change the output.
    fn fake_network_bytes() -> Vec<u8> {
        let mut bytes = vec![0u8; FILE_SIZE];
        bytes[0..4].copy_from_slice(&NNUE_VERSION.to_le_bytes());
        bytes[4..8].copy_from_slice(&HEADER_HASH.to_le_bytes());
        bytes[8..12].copy_from_slice(&HEADER_LEN.to_le_bytes());
        bytes[TRANSFORMER_START..TRANSFORMER_START + 4]
            .copy_from_slice(&TRANSFORMER_HASH.to_le_bytes());
        bytes[NETWORK_START..NETWORK_START + 4].copy_from_slice(&NETWORK_HASH.to_le_bytes());
        // small deterministic weights over the feature transformer
        let mut at = TRANSFORMER_START + 4;
        for i in 0..HALF_DIMS {
            let v = (i as i16 % 7) - 3;
            bytes[at..at + 2].copy_from_slice(&v.to_le_bytes());
            at += 2;
        }
        for i in 0..(HALF_DIMS * FT_IN_DIMS) {
            let v = ((i * 2654435761usize) % 9) as i16 - 4;
            bytes[at..at + 2].copy_from_slice(&v.to_le_bytes());
            at += 2;
        }
        // hidden and output sections
        let mut at = NETWORK_START + 4;
        for i in 0..HIDDEN {
            bytes[at..at + 4].copy_from_slice(&(i as i32 - 16).to_le_bytes());
            at += 4;
        }
        for i in 0..(HIDDEN * FT_OUT) {
            bytes[at] = (((i * 31) % 11) as i32 - 5) as i8 as u8;
            at += 1;
        }
        for i in 0..HIDDEN {
            bytes[at..at + 4].copy_from_slice(&(8 - i as i32).to_le_bytes());
            at += 4;
        }
        for i in 0..(HIDDEN * HIDDEN) {
            bytes[at] = (((i * 17) % 7) as i32 - 3) as i8 as u8;
            at += 1;
        }
        bytes[at..at + 4].copy_from_slice(&40i32.to_le_bytes());
        at += 4;
        for i in 0..HIDDEN {
            bytes[at] = ((i as i32 % 5) - 2) as i8 as u8;
            at += 1;
        }
        bytes
    }

    #[test]
    fn loader_rejects_wrong_size() {
        assert!(Network::from_bytes(&[0u8; 128]).is_err());
    }

    #[test]
    fn loader_rejects_bad_version() {
        let mut bytes = fake_network_bytes();
        bytes[0] ^= 0xFF;
        assert!(Network::from_bytes(&bytes).is_err());
    }

    #[test]
    fn loader_rejects_bad_section_markers() {
        let mut bytes = fake_network_bytes();
        bytes[TRANSFORMER_START] ^= 0x01;
        assert!(Network::from_bytes(&bytes).is_err());

        let mut bytes = fake_network_bytes();
        bytes[NETWORK_START] ^= 0x01;
        assert!(Network::from_bytes(&bytes).is_err());
    }

    #[test]
    fn loader_accepts_well_formed_file() {
        assert!(Network::from_bytes(&fake_network_bytes()).is_ok());
    }

    #[test]
    fn incremental_updates_match_full_refresh() {
        let net = Network::from_bytes(&fake_network_bytes()).unwrap();
        let mut board: Board =
            "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1"
                .parse()
                .unwrap();

        let mut incremental = NnueState::new(net.clone());
        incremental.refresh(&board);

        let mut moves = MoveList::new();
        generate_legal(&board, &mut moves);
        for &mv in moves.iter().take(12) {
            make(&mut board, mv);
            incremental.push(&board, mv);

            let mut fresh = NnueState::new(net.clone());
            fresh.refresh(&board);
            assert_eq!(
                incremental.evaluate(&board),
                fresh.evaluate(&board),
                "incremental drift after {}",
                mv
            );

            incremental.pop();
            undo(&mut board);
        }
    }

    #[test]
    fn null_move_flips_only_the_perspective() {
        let net = Network::from_bytes(&fake_network_bytes()).unwrap();
        let mut board = Board::new();
        let mut state = NnueState::new(net);
        state.refresh(&board);
        let before = state.evaluate(&board);

        crate::moves::execute::make_null(&mut board);
        state.push(&board, Move::NULL);
        let mut fresh = NnueState::new(state.net.clone());
        fresh.refresh(&board);
        assert_eq!(state.evaluate(&board), fresh.evaluate(&board));
        state.pop();
        crate::moves::execute::undo_null(&mut board);
        assert_eq!(state.evaluate(&board), before);
    }
}
