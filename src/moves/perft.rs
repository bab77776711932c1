//! Perft: exhaustive legal-move counting for move-generator validation.

use crate::board::Board;
use crate::moves::execute::{make, undo};
use crate::moves::movegen::generate_legal;
use crate::moves::types::{Move, MoveList};

pub fn perft(board: &mut Board, depth: u32) -> u64 {
    if depth == 0 {
        return 1;
    }
    let mut moves = MoveList::new();
    generate_legal(board, &mut moves);
    if depth == 1 {
        return moves.len() as u64;
    }
    let mut nodes = 0;
    for &mv in moves.iter() {
        make(board, mv);
        nodes += perft(board, depth - 1);
        undo(board);
    }
    nodes
}

/// Per-root-move node counts, for diffing against a reference engine.
pub fn perft_divide(board: &mut Board, depth: u32) -> Vec<(Move, u64)> {
    let mut moves = MoveList::new();
    generate_legal(board, &mut moves);
    let mut results = Vec::with_capacity(moves.len());
    for &mv in moves.iter() {
        make(board, mv);
        let nodes = if depth <= 1 { 1 } else { perft(board, depth - 1) };
        undo(board);
        results.push((mv, nodes));
    }
    results
}
