//! Zobrist key invariants: the incrementally maintained keys must always
//! equal the from-scratch XOR composition, along any move sequence.

use std::str::FromStr;
use talon::board::Board;
use talon::moves::execute::{make, make_null, undo, undo_null};
use talon::moves::movegen::generate_legal;
use talon::moves::types::MoveList;

fn assert_keys_fresh(board: &Board) {
    assert_eq!(board.key, board.compute_key_full(), "full key drifted");
    assert_eq!(board.pawn_key, board.compute_pawn_key_full(), "pawn key drifted");
}

/// Walk every line to `depth`, checking both keys at every node.
fn walk(board: &mut Board, depth: u32) {
    assert_keys_fresh(board);
    if depth == 0 {
        return;
    }
    let mut moves = MoveList::new();
    generate_legal(board, &mut moves);
    for &mv in moves.iter() {
        make(board, mv);
        walk(board, depth - 1);
        undo(board);
        assert_keys_fresh(board);
    }
}

#[test]
fn keys_stay_consistent_over_full_tree() {
    for fen in [
        "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1",
        "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1",
        "n1n5/PPPk4/8/8/8/8/4Kppp/5N1N b - - 0 1",
        "4k3/8/8/3pP3/8/8/8/4K3 w - d6 0 2",
    ] {
        let mut board = Board::from_str(fen).unwrap();
        walk(&mut board, 3);
    }
}

#[test]
fn transpositions_share_a_key() {
    // Nf3/Nc3 then knights back, via two different orders
    let mut a = Board::new();
    for text in ["g1f3", "b8c6", "b1c3"] {
        let mv = find(&a, text);
        make(&mut a, mv);
    }
    let mut b = Board::new();
    for text in ["b1c3", "b8c6", "g1f3"] {
        let mv = find(&b, text);
        make(&mut b, mv);
    }
    assert_eq!(a.key, b.key);
    assert_eq!(a.pawn_key, b.pawn_key);
}

#[test]
fn en_passant_file_toggles_the_key() {
    let mut board = Board::new();
    let e4 = find(&board, "e2e4");
    make(&mut board, e4);
    let with_ep = board.key;

    // the same structure without the en-passant right hashes differently
    let mut quiet: Board =
        "rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b KQkq - 0 1".parse().unwrap();
    quiet.refresh_keys();
    assert_ne!(with_ep, quiet.key);
}

#[test]
fn castling_rights_change_rehashes() {
    let mut board: Board = "4k3/8/8/8/8/8/8/4K2R w K - 0 1".parse().unwrap();
    let before = board.key;
    let mv = find(&board, "h1h2");
    make(&mut board, mv);
    undo(&mut board);
    assert_eq!(board.key, before);

    make(&mut board, mv);
    // rook lifted: the kingside right is gone and the key knows
    let mut stripped: Board = "4k3/8/8/8/8/8/7R/4K3 b - - 1 1".parse().unwrap();
    stripped.refresh_keys();
    assert_eq!(board.key, stripped.key);
}

#[test]
fn null_move_only_flips_side_terms() {
    let mut board: Board =
        "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1".parse().unwrap();
    let key = board.key;
    let pawn_key = board.pawn_key;
    make_null(&mut board);
    assert_keys_fresh(&board);
    assert_ne!(board.key, key);
    assert_ne!(board.pawn_key, pawn_key);
    undo_null(&mut board);
    assert_eq!(board.key, key);
    assert_eq!(board.pawn_key, pawn_key);
}

#[test]
fn pawn_key_ignores_piece_shuffles() {
    let mut board = Board::new();
    let pawn_key = board.pawn_key;
    for text in ["g1f3", "g8f6", "f3g1", "f6g8"] {
        let mv = find(&board, text);
        make(&mut board, mv);
    }
    // side to move is back to white and no pawn moved
    assert_eq!(board.pawn_key, pawn_key);
}

fn find(board: &Board, text: &str) -> talon::moves::types::Move {
    let mut moves = MoveList::new();
    generate_legal(board, &mut moves);
    *moves
        .iter()
        .find(|m| m.to_uci() == text)
        .unwrap_or_else(|| panic!("move {} not legal in {}", text, board.to_fen()))
}
