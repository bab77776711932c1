//! Evaluation invariants from the outside: color symmetry, material
//! dominance, draw scaling, and agreement between search and evaluation
//! sign conventions.

use std::str::FromStr;
use talon::board::{ALL_PIECES, Board, Color};
use talon::eval::Evaluator;
use talon::search::MAX_SCORE;

fn evaluate(fen: &str) -> i32 {
    let board = Board::from_str(fen).unwrap();
    Evaluator::classical().evaluate(&board, -MAX_SCORE, MAX_SCORE)
}

/// Vertically mirror a FEN and swap the colors; castling rights and the
/// side to move travel along. En-passant-free positions only.
fn color_flipped(fen: &str) -> String {
    let fields: Vec<&str> = fen.split_whitespace().collect();
    let placement: Vec<String> = fields[0]
        .split('/')
        .rev()
        .map(|rank| {
            rank.chars()
                .map(|c| {
                    if c.is_ascii_alphabetic() {
                        if c.is_ascii_uppercase() {
                            c.to_ascii_lowercase()
                        } else {
                            c.to_ascii_uppercase()
                        }
                    } else {
                        c
                    }
                })
                .collect()
        })
        .collect();
    let side = if fields[1] == "w" { "b" } else { "w" };
    let castling: String = if fields[2] == "-" {
        "-".to_string()
    } else {
        let mut swapped: Vec<char> = fields[2]
            .chars()
            .map(|c| {
                if c.is_ascii_uppercase() {
                    c.to_ascii_lowercase()
                } else {
                    c.to_ascii_uppercase()
                }
            })
            .collect();
        // canonical KQkq ordering
        swapped.sort_by_key(|&c| match c {
            'K' => 0,
            'Q' => 1,
            'k' => 2,
            'q' => 3,
            _ => 4,
        });
        swapped.into_iter().collect()
    };
    format!("{} {} {} - 0 1", placement.join("/"), side, castling)
}

#[test]
fn mirrored_positions_evaluate_identically() {
    for fen in [
        "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1",
        "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1",
        "r1bqkb1r/pppp1ppp/2n2n2/4p3/2B1P3/5N2/PPPP1PPP/RNBQK2R w KQkq - 4 4",
        "8/2p5/3p4/KP5r/1R3p1k/8/4P1P1/8 w - - 0 1",
        "4k3/8/8/8/8/8/8/4K2R w K - 0 1",
        "6k1/pp3ppp/8/8/8/8/PPP3PP/5RK1 w - - 0 1",
    ] {
        assert_eq!(
            evaluate(fen),
            evaluate(&color_flipped(fen)),
            "asymmetric evaluation for {}",
            fen
        );
    }
}

#[test]
fn extra_material_wins_the_eval() {
    let up_a_rook = evaluate("4k3/8/8/8/8/8/8/R3K3 w - - 0 1");
    assert!(up_a_rook > 500, "rook up scores {}", up_a_rook);

    let up_a_pawn = evaluate("4k3/8/8/8/8/8/4P3/4K3 w - - 0 1");
    assert!(up_a_pawn > 0 && up_a_pawn < up_a_rook);
}

#[test]
fn side_to_move_perspective() {
    let fen_white = "4k3/8/8/8/8/8/8/Q3K3 w - - 0 1";
    let fen_black = "4k3/8/8/8/8/8/8/Q3K3 b - - 0 1";
    let from_white = evaluate(fen_white);
    let from_black = evaluate(fen_black);
    assert!(from_white > 0);
    assert!(from_black < 0);
}

#[test]
fn opposite_bishop_ending_is_damped() {
    // same material, but the opposite-colored bishops drag the score in
    let lively = evaluate("4k3/4pp2/8/8/8/2B5/4PP2/4K3 w - - 0 1");
    let damped = evaluate("4k1b1/4pp2/8/8/8/2B5/4PP2/4K3 w - - 0 1");
    // a whole bishop up vs the drawish bishop ending: the extra piece
    // scores far above the damped near-equal one
    assert!(lively > damped + 300, "lively {} damped {}", lively, damped);
}

#[test]
fn eval_stays_in_band_everywhere() {
    for fen in [
        "QQQQQQQQ/QQQQQQQ1/8/8/8/k7/8/K7 w - - 0 1",
        "qqqqqqqq/qqqqqqq1/8/8/8/K7/8/k7 b - - 0 1",
        "4k3/8/8/8/8/8/8/4K3 w - - 0 1",
    ] {
        let score = evaluate(fen);
        assert!(score.abs() <= talon::search::MAX_EVAL);
    }
}

#[test]
fn piece_counts_survive_evaluation() {
    // evaluation must never mutate the position
    let board = Board::from_str("r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1").unwrap();
    let before: Vec<u8> = ALL_PIECES
        .iter()
        .flat_map(|&p| [board.count(Color::White, p), board.count(Color::Black, p)])
        .collect();
    let _ = Evaluator::classical().evaluate(&board, -MAX_SCORE, MAX_SCORE);
    let after: Vec<u8> = ALL_PIECES
        .iter()
        .flat_map(|&p| [board.count(Color::White, p), board.count(Color::Black, p)])
        .collect();
    assert_eq!(before, after);
}
