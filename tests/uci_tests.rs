//! Protocol-level behavior through the public parsing helpers and the
//! engine option surface.

use std::str::FromStr;
use talon::board::Board;
use talon::engine::Engine;
use talon::moves::movegen::generate_legal;
use talon::moves::types::MoveList;
use talon::search::time::SearchLimits;
use talon::uci::{parse_go, parse_position, parse_uci_move};

#[test]
fn position_with_full_game_prefix() {
    let board = parse_position(&[
        "startpos", "moves", "e2e4", "c7c5", "g1f3", "d7d6", "d2d4", "c5d4", "f3d4",
    ])
    .unwrap();
    assert_eq!(
        board.to_fen(),
        "rnbqkbnr/pp2pppp/3p4/8/3NP3/8/PPP2PPP/RNBQKB1R b KQkq - 0 4"
    );
    // replay resets the search ply while keeping the game history
    assert_eq!(board.ply, 0);
    assert_eq!(board.histply(), 7);
}

#[test]
fn position_errors_leave_caller_in_charge() {
    assert!(parse_position(&[]).is_err());
    assert!(parse_position(&["fen", "not", "a", "fen"]).is_err());
    assert!(parse_position(&["startpos", "moves", "e2e4", "e2e4"]).is_err());
}

#[test]
fn castling_and_en_passant_moves_replay() {
    let board = parse_position(&[
        "fen",
        "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R",
        "w",
        "KQkq",
        "-",
        "moves",
        "e1g1",
    ])
    .unwrap();
    assert!(board.to_fen().contains("R4RK1"));

    let board = parse_position(&[
        "fen", "4k3/8/8/8/2p5/8/3P4/4K3", "w", "-", "-", "moves", "d2d4", "c4d3",
    ])
    .unwrap();
    // en passant happened: both pawns are accounted for
    assert_eq!(board.to_fen(), "4k3/8/8/8/8/3p4/8/4K3 w - - 0 2");
}

#[test]
fn go_depth_produces_a_legal_bestmove() {
    let mut engine = Engine::new();
    let board = parse_position(&["startpos", "moves", "e2e4"]).unwrap();
    let reference = board.clone();
    let limits = parse_go(&["depth", "5"]);
    let report = engine.prepare_search(board, limits).run(&|_| {});

    let mut legal = MoveList::new();
    generate_legal(&reference, &mut legal);
    let best = report.best_move.expect("bestmove is mandatory");
    assert!(legal.contains(&best), "{} not legal", best.to_uci());
}

#[test]
fn movetime_limits_are_respected_roughly() {
    let mut engine = Engine::new();
    let limits = parse_go(&["movetime", "120"]);
    let start = std::time::Instant::now();
    let report = engine.prepare_search(Board::new(), limits).run(&|_| {});
    let elapsed = start.elapsed();
    assert!(report.best_move.is_some());
    // generous ceiling: the hard deadline plus scheduling slack
    assert!(elapsed.as_millis() < 2_000, "took {:?}", elapsed);
}

#[test]
fn option_clamps_match_the_interface_contract() {
    let mut engine = Engine::new();
    assert_eq!(engine.set_hash_mb(4), Ok(8));
    assert_eq!(engine.set_hash_mb(100_000), Ok(65_536));
    assert_eq!(engine.set_threads(0), 1);
    assert_eq!(engine.set_threads(10_000), 256);
}

#[test]
fn bad_eval_file_keeps_classical_evaluation() {
    let mut engine = Engine::new();
    assert!(engine.set_eval_file("/no/such/net.nnue").is_err());
    // the engine still searches
    let report = engine
        .prepare_search(
            Board::from_str("4k3/8/8/8/8/8/8/4K2R w K - 0 1").unwrap(),
            SearchLimits {
                depth: Some(4),
                ..Default::default()
            },
        )
        .run(&|_| {});
    assert!(report.best_move.is_some());
}

#[test]
fn uci_move_matching_rejects_illegal_strings() {
    let board = Board::new();
    assert!(parse_uci_move(&board, "e2e4").is_some());
    assert!(parse_uci_move(&board, "e2e5").is_none());
    assert!(parse_uci_move(&board, "a1a1").is_none());
    assert!(parse_uci_move(&board, "junk").is_none());
}
