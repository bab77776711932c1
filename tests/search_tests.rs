//! Search behavior: mates, stalemate avoidance, repetition draws, bound
//! semantics of stored transposition entries, and the literal end-to-end
//! scenarios from the interface contract.

use std::str::FromStr;
use talon::board::Board;
use talon::engine::{Engine, SearchReport};
use talon::moves::movegen::generate_legal;
use talon::moves::types::MoveList;
use talon::search::time::SearchLimits;
use talon::search::{MATE_VALUE, is_mate_score};
use talon::uci::parse_position;

fn search_depth(fen: &str, depth: i32) -> SearchReport {
    let mut engine = Engine::new();
    let board = Board::from_str(fen).unwrap();
    let limits = SearchLimits {
        depth: Some(depth),
        ..Default::default()
    };
    engine.prepare_search(board, limits).run(&|_| {})
}

fn is_legal_in(fen: &str, mv: &str) -> bool {
    let board = Board::from_str(fen).unwrap();
    let mut moves = MoveList::new();
    generate_legal(&board, &mut moves);
    moves.iter().any(|m| m.to_uci() == mv)
}

#[test]
fn mate_in_one_with_the_queen() {
    let report = search_depth("7k/8/8/8/8/8/6Q1/7K w - - 0 1", 2);
    assert_eq!(report.score, MATE_VALUE - 1, "mate-in-1 is a mate score at distance 1");
    assert_eq!(report.best_move.map(|m| m.to_uci()), Some("g2g7".to_string()));
}

#[test]
fn mate_in_two_ladder() {
    // two rooks ladder the king: 1.Rb7+ Ka8? no - use a clean KRR mate
    let report = search_depth("6k1/8/8/8/8/8/R7/1R4K1 w - - 0 1", 6);
    assert!(is_mate_score(report.score), "score {} should be mating", report.score);
    assert!(report.score > 0);
}

#[test]
fn losing_side_sees_the_mate_coming() {
    // cornered against KQ+K: best defense is mated in five plies
    let report = search_depth("6k1/8/5K2/8/8/8/8/7Q b - - 0 1", 6);
    assert_eq!(report.score, -(MATE_VALUE - 5), "got {}", report.score);
}

#[test]
fn stalemate_defense_holds_the_draw() {
    // KP vs K with the defender in front: best play is a dead draw
    let report = search_depth("3k4/3P4/3K4/8/8/8/8/8 w - - 0 1", 8);
    assert_eq!(report.score, 0);
    assert!(report.best_move.is_some());
}

#[test]
fn black_converts_the_protected_passer() {
    // the defended d2 pawn boxes the king in: black promotes and mates;
    // shallow iterations already see the decisive score
    let report = search_depth("8/8/8/8/8/3k4/3p4/3K4 b - - 0 1", 12);
    assert!(
        report.score > 800 || (is_mate_score(report.score) && report.score > 0),
        "black is winning decisively, got {}",
        report.score
    );
}

#[test]
fn second_occurrence_in_window_is_a_search_draw() {
    // after the shuffle the root key occurred once before within the
    // fifty-move window; the engine's contracted rule calls any line
    // that repeats it drawn
    let board = parse_position(&[
        "fen", "4k3/8/8/8/8/8/8/4KR2", "w", "-", "-", "0", "1", "moves", "f1f2", "e8d8", "f2f1",
        "d8e8",
    ])
    .unwrap();
    assert!(board.is_repetition());
    assert_eq!(board.repetition_count(), 2);

    // the rook side still wins by simply not repeating
    let mut engine = Engine::new();
    let limits = SearchLimits {
        depth: Some(6),
        ..Default::default()
    };
    let report = engine.prepare_search(board, limits).run(&|_| {});
    assert!(report.score > 200, "white avoids the repetition, got {}", report.score);
}

#[test]
fn tt_root_entry_matches_the_search_result() {
    // single worker: the exact entry written at the root must agree with
    // the score the search returned
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, AtomicU64};
    use talon::eval::Evaluator;
    use talon::search::context::SearchContext;
    use talon::search::search::search_root;
    use talon::search::time::TimeControl;
    use talon::search::tt::{BOUND_EXACT, TranspositionTable};

    let mut board =
        Board::from_str("r1bqkbnr/pppp1ppp/2n5/4p3/2B1P3/5N2/PPPP1PPP/RNBQK2R w KQkq - 3 3")
            .unwrap();
    let tt = Arc::new(TranspositionTable::new(16));
    let mut ctx = SearchContext::new(
        tt.clone(),
        Arc::new(AtomicBool::new(false)),
        Arc::new(AtomicU64::new(0)),
        None,
        Evaluator::classical(),
        TimeControl::unlimited(),
        0,
    );

    let (score, _mv) = search_root(&mut board, &mut ctx, 6).expect("search completes");
    let hit = tt.probe(board.key).expect("root entry stored");
    assert_eq!(hit.bound, BOUND_EXACT, "full-window root result is exact");
    assert_eq!(hit.score, score, "stored score matches the returned one");
    // internal iterative reduction may have shaved a ply off the stored
    // depth on the first visit
    assert!(hit.depth >= 5);
}

#[test]
fn scenario_one_startpos_after_e4() {
    let board = parse_position(&["startpos", "moves", "e2e4"]).unwrap();
    let fen = board.to_fen();
    let mut engine = Engine::new();
    let limits = SearchLimits {
        depth: Some(6),
        ..Default::default()
    };
    let report = engine.prepare_search(board, limits).run(&|_| {});
    let best = report.best_move.expect("a legal reply exists").to_uci();
    assert!(is_legal_in(&fen, &best), "{} must be legal after 1.e4", best);
    assert!(
        report.score.abs() <= 100,
        "near-balanced opening, got {}",
        report.score
    );
}

#[test]
fn scenario_two_kr_vs_k_is_winning() {
    let report = search_depth("4k3/8/8/8/8/8/8/4K2R w K - 0 1", 8);
    assert!(report.score > 200, "a rook up must not look drawn, got {}", report.score);
    assert!(report.best_move.is_some());
}

#[test]
fn scenario_four_tt_cleared_between_games() {
    let mut engine = Engine::new();
    let limits = SearchLimits {
        movetime: Some(100),
        ..Default::default()
    };
    let first = engine.prepare_search(Board::new(), limits).run(&|_| {});
    assert!(first.best_move.is_some());

    // ucinewgame wipes the table; the second search must complete on its
    // own feet
    engine.new_game();
    let second = engine.prepare_search(Board::new(), limits).run(&|_| {});
    assert!(second.best_move.is_some());
}

#[test]
fn scenario_five_threads_report_one_bestmove() {
    use std::cell::Cell;

    let mut engine = Engine::new();
    engine.set_threads(4);
    let limits = SearchLimits {
        depth: Some(8),
        ..Default::default()
    };
    let posts = Cell::new(0usize);
    let report = engine.prepare_search(Board::new(), limits).run(&|_| {
        posts.set(posts.get() + 1);
    });
    assert!(posts.get() >= 1, "iteration reports published");
    assert!(report.best_move.is_some(), "exactly one final report with a bestmove");
    assert!(report.nodes > 0, "reported nodes sum the workers' counts");
}

#[test]
fn hundred_move_rule_scores_zero_in_search() {
    // the clock already ran out: every continuation is a draw
    let report = search_depth("4k3/8/8/8/8/8/4R3/4K3 b - - 100 80", 2);
    assert_eq!(report.score, 0, "root past the rule is drawn everywhere");
}
