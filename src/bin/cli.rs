use std::io;
use std::str::FromStr;
use std::time::Instant;

use talon::board::Board;
use talon::engine::Engine;
use talon::moves::perft::{perft, perft_divide};
use talon::search::time::SearchLimits;
use talon::uci::{ENGINE_NAME, ENGINE_VERSION, uci_loop, uci_loop_from};

const START_FEN: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

const BENCH_POSITIONS: &[&str] = &[
    START_FEN,
    "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1",
    "8/2p5/3p4/KP5r/1R3p1k/8/4P1P1/8 w - - 0 1",
    "r4rk1/1pp1qppp/p1np1n2/2b1p1B1/2B1P1b1/P1NP1N2/1PP1QPPP/R4RK1 w - - 0 10",
    "rnbq1k1r/pp1Pbppp/2p5/8/2B5/8/PPP1NnPP/RNBQK2R w KQ - 1 8",
];

fn main() {
    let args: Vec<String> = std::env::args().skip(1).collect();

    #[cfg(feature = "cli")]
    talon::logger::init_logging("logs/talon.log", "info");

    match args.first().map(String::as_str) {
        Some("perft") => run_perft(&args[1..]),
        Some("bench") => run_bench(&args[1..]),
        Some("--syzygy") => {
            // a bad tablebase path given on the command line is fatal,
            // unlike the setoption form which merely disables probing
            let Some(path) = args.get(1) else {
                eprintln!("--syzygy needs a path");
                std::process::exit(2);
            };
            let mut engine = Engine::new();
            if let Err(reason) = engine.set_syzygy_path(path) {
                eprintln!("tablebase initialization failed: {}", reason);
                std::process::exit(2);
            }
            uci_loop_from(io::stdin().lock(), engine);
        }
        _ => uci_loop(io::stdin().lock()),
    }
}

/// `talon perft <depth> [fen]`: node counts per depth with a divide at
/// the final one.
fn run_perft(args: &[String]) {
    let depth: u32 = args.first().and_then(|d| d.parse().ok()).unwrap_or(5);
    let fen = if args.len() > 1 { args[1..].join(" ") } else { START_FEN.to_string() };

    let mut board = match Board::from_str(&fen) {
        Ok(b) => b,
        Err(reason) => {
            eprintln!("bad FEN: {}", reason);
            std::process::exit(1);
        }
    };

    println!("perft {} of {}", depth, fen);

    #[cfg(feature = "cli")]
    let bar = indicatif::ProgressBar::new(depth as u64);

    for d in 1..=depth {
        let start = Instant::now();
        let nodes = perft(&mut board, d);
        let elapsed = start.elapsed().as_secs_f64().max(1e-9);
        #[cfg(feature = "cli")]
        bar.inc(1);
        println!(
            "depth {:2}  nodes {:>14}  nps {:>10.0}",
            d,
            nodes,
            nodes as f64 / elapsed
        );
    }
    #[cfg(feature = "cli")]
    bar.finish_and_clear();

    for (mv, nodes) in perft_divide(&mut board, depth) {
        println!("{}: {}", mv.to_uci(), nodes);
    }
}

/// `talon bench [depth]`: fixed positions at fixed depth, one node total.
fn run_bench(args: &[String]) {
    let depth: i32 = args.first().and_then(|d| d.parse().ok()).unwrap_or(10);
    let mut engine = Engine::new();
    let mut total_nodes = 0u64;
    let start = Instant::now();

    for fen in BENCH_POSITIONS {
        let board = Board::from_str(fen).expect("bench positions are valid");
        let limits = SearchLimits {
            depth: Some(depth),
            ..Default::default()
        };
        let report = engine.prepare_search(board, limits).run(&|_| {});
        println!(
            "{:<70} depth {:2} nodes {:>10}",
            fen, report.depth, report.nodes
        );
        total_nodes += report.nodes;
        engine.new_game();
    }

    let elapsed = start.elapsed().as_secs_f64().max(1e-9);
    println!(
        "{} {} bench: {} nodes, {:.0} nps",
        ENGINE_NAME,
        ENGINE_VERSION,
        total_nodes,
        total_nodes as f64 / elapsed
    );
}
