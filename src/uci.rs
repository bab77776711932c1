//! UCI front-end: line-oriented protocol over stdin/stdout.
//!
//! Malformed commands are ignored with an `info string` note; unknown
//! tokens are skipped. The search runs on its own thread so `stop` and
//! `ponderhit` stay responsive; a `bestmove` always comes out, falling
//! back to any legal move when the search was cut short.

use crate::board::Board;
use crate::engine::{Engine, IterationReport, MAX_THREADS, MIN_THREADS};
use crate::moves::execute::make;
use crate::moves::movegen::generate_legal;
use crate::moves::types::{Move, MoveList};
use crate::search::time::SearchLimits;
use crate::search::tt::TranspositionTable;
use crate::search::{MATE_VALUE, is_mate_score};
use std::io::BufRead;
use std::thread::JoinHandle;

pub const ENGINE_NAME: &str = "Talon";
pub const ENGINE_VERSION: &str = env!("CARGO_PKG_VERSION");
pub const ENGINE_AUTHOR: &str = "the Talon authors";

pub struct UciState {
    engine: Engine,
    board: Board,
    search_thread: Option<JoinHandle<()>>,
}

impl Default for UciState {
    fn default() -> Self {
        Self::new()
    }
}

impl UciState {
    pub fn new() -> Self {
        Self::with_engine(Engine::new())
    }

    /// Wrap a preconfigured engine (e.g. tablebases wired up from the
    /// command line).
    pub fn with_engine(engine: Engine) -> Self {
        UciState {
            engine,
            board: Board::new(),
            search_thread: None,
        }
    }

    fn join_search(&mut self) {
        if let Some(handle) = self.search_thread.take() {
            let _ = handle.join();
        }
    }

    fn stop_search(&mut self) {
        if self.search_thread.is_some() {
            self.engine.abort();
            self.join_search();
        }
    }
}

/// Render a score for `info` output: centipawns, or moves-to-mate.
pub fn format_score(score: i32) -> String {
    if is_mate_score(score) {
        let moves = (MATE_VALUE - score.abs() + 1) / 2;
        if score > 0 {
            format!("mate {}", moves)
        } else {
            format!("mate -{}", moves)
        }
    } else {
        format!("cp {}", score)
    }
}

fn post_iteration(report: &IterationReport) {
    let pv: Vec<String> = report.pv.iter().map(|m| m.to_uci()).collect();
    println!(
        "info depth {} score {} nodes {} nps {} time {} pv {}",
        report.depth,
        format_score(report.score),
        report.nodes,
        report.nps,
        report.elapsed.as_millis(),
        pv.join(" ")
    );
}

/// Match a long-algebraic move string against the legal moves.
pub fn parse_uci_move(board: &Board, text: &str) -> Option<Move> {
    let mut legal = MoveList::new();
    generate_legal(board, &mut legal);
    legal.iter().copied().find(|mv| mv.to_uci() == text)
}

/// Parse a `position` command into a board, replaying any move list.
pub fn parse_position(args: &[&str]) -> Result<Board, String> {
    let mut board;
    let mut rest = args;

    match rest.first() {
        Some(&"startpos") => {
            board = Board::new();
            rest = &rest[1..];
        }
        Some(&"fen") => {
            let end = rest.iter().position(|&t| t == "moves").unwrap_or(rest.len());
            let fen = rest[1..end].join(" ");
            board = fen.parse()?;
            rest = &rest[end..];
        }
        _ => return Err("position needs startpos or fen".to_string()),
    }

    if rest.first() == Some(&"moves") {
        for text in &rest[1..] {
            let mv = parse_uci_move(&board, text)
                .ok_or_else(|| format!("illegal move {:?} in position command", text))?;
            make(&mut board, mv);
        }
    }
    board.ply = 0;
    Ok(board)
}

/// Parse the `go` token stream. Unknown tokens are skipped.
pub fn parse_go(args: &[&str]) -> SearchLimits {
    let mut limits = SearchLimits::default();
    let mut iter = args.iter().peekable();
    while let Some(&token) = iter.next() {
        let mut number = |slot: &mut Option<u64>| {
            if let Some(&&value) = iter.peek() {
                if let Ok(parsed) = value.parse::<u64>() {
                    *slot = Some(parsed);
                    iter.next();
                }
            }
        };
        match token {
            "depth" => {
                let mut v = None;
                number(&mut v);
                limits.depth = v.map(|d| d as i32);
            }
            "movetime" => number(&mut limits.movetime),
            "wtime" => number(&mut limits.wtime),
            "btime" => number(&mut limits.btime),
            "winc" => {
                let mut v = None;
                number(&mut v);
                limits.winc = v.unwrap_or(0);
            }
            "binc" => {
                let mut v = None;
                number(&mut v);
                limits.binc = v.unwrap_or(0);
            }
            "movestogo" => number(&mut limits.movestogo),
            "infinite" => limits.infinite = true,
            "ponder" => limits.ponder = true,
            _ => {}
        }
    }
    limits
}

fn handle_setoption(state: &mut UciState, line: &str) {
    // setoption name <name...> value <value...>
    let Some(name_at) = line.find("name ") else {
        return;
    };
    let after_name = &line[name_at + 5..];
    let (name, value) = match after_name.find(" value ") {
        Some(at) => (&after_name[..at], after_name[at + 7..].trim()),
        None => (after_name.trim(), ""),
    };

    match name.trim().to_ascii_lowercase().as_str() {
        "hash" => match value.parse::<usize>() {
            Ok(mb) => match state.engine.set_hash_mb(mb) {
                Ok(actual) => println!("info string Hash set to {} MB", actual),
                Err(reason) => println!("info string {}", reason),
            },
            Err(_) => println!("info string bad Hash value {:?}", value),
        },
        "threads" => {
            // "auto" sizes the pool to the machine
            let requested = if value.eq_ignore_ascii_case("auto") {
                Some(num_cpus::get())
            } else {
                value.parse::<usize>().ok()
            };
            match requested {
                Some(n) => println!("info string Threads set to {}", state.engine.set_threads(n)),
                None => println!("info string bad Threads value {:?}", value),
            }
        }
        "syzygypath" => match state.engine.set_syzygy_path(value) {
            Ok(()) => println!("info string SyzygyPath set to {}", value),
            Err(reason) => println!("info string tablebases disabled: {}", reason),
        },
        "evalfile" => match state.engine.set_eval_file(value) {
            Ok(()) => println!("info string network loaded from {}", value),
            Err(reason) => println!("info string network rejected: {}", reason),
        },
        _ => {}
    }
}

fn handle_go(state: &mut UciState, args: &[&str]) {
    state.stop_search();
    let limits = parse_go(args);
    let job = state.engine.prepare_search(state.board.clone(), limits);
    state.search_thread = Some(std::thread::spawn(move || {
        let report = job.run(&|iteration| post_iteration(&iteration));
        match report.best_move {
            Some(best) => match report.ponder {
                Some(ponder) => println!("bestmove {} ponder {}", best.to_uci(), ponder.to_uci()),
                None => println!("bestmove {}", best.to_uci()),
            },
            None => println!("bestmove 0000"),
        }
    }));
}

/// The blocking protocol loop; returns on `quit` or closed input.
pub fn uci_loop(input: impl BufRead) {
    uci_loop_from(input, Engine::new());
}

pub fn uci_loop_from(input: impl BufRead, engine: Engine) {
    let mut state = UciState::with_engine(engine);

    println!("id name {} {}", ENGINE_NAME, ENGINE_VERSION);
    println!("id author {}", ENGINE_AUTHOR);
    println!(
        "option name Hash type spin default {} min {} max {}",
        state.engine.options().hash_mb,
        TranspositionTable::MIN_SIZE_MB,
        TranspositionTable::MAX_SIZE_MB
    );
    println!(
        "option name Threads type spin default {} min {} max {}",
        state.engine.options().threads,
        MIN_THREADS,
        MAX_THREADS
    );
    println!("option name SyzygyPath type string default <empty>");
    println!("option name EvalFile type string default <empty>");
    println!("option name Ponder type check default false");
    println!("uciok");

    for line in input.lines() {
        let Ok(line) = line else { break };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let tokens: Vec<&str> = line.split_whitespace().collect();

        match tokens[0] {
            "uci" => {
                println!("id name {} {}", ENGINE_NAME, ENGINE_VERSION);
                println!("id author {}", ENGINE_AUTHOR);
                println!("uciok");
            }
            "isready" => println!("readyok"),
            "ucinewgame" => {
                state.stop_search();
                state.engine.new_game();
                state.board = Board::new();
            }
            "setoption" => {
                handle_setoption(&mut state, line);
            }
            "position" => match parse_position(&tokens[1..]) {
                Ok(board) => state.board = board,
                Err(reason) => println!("info string {}", reason),
            },
            "go" => handle_go(&mut state, &tokens[1..]),
            "stop" => state.stop_search(),
            "ponderhit" => state.engine.ponderhit(),
            "fen" => println!("{}", state.board.to_fen()),
            "d" => {
                println!("{}", state.board.to_fen());
                println!("status: {:?}", crate::status::position_status(&state.board));
            }
            "quit" => {
                state.stop_search();
                return;
            }
            // unknown tokens are ignored; the protocol keeps flowing
            _ => {}
        }
    }
    state.stop_search();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::Color;

    #[test]
    fn position_startpos_with_moves() {
        let board = parse_position(&["startpos", "moves", "e2e4", "e7e5", "g1f3"]).unwrap();
        assert_eq!(board.side_to_move, Color::Black);
        assert_eq!(
            board.to_fen(),
            "rnbqkbnr/pppp1ppp/8/4p3/4P3/5N2/PPPP1PPP/RNBQKB1R b KQkq - 1 2"
        );
    }

    #[test]
    fn position_fen_with_moves() {
        let board =
            parse_position(&["fen", "4k3/8/8/8/8/8/8/4K2R", "w", "K", "-", "moves", "e1g1"])
                .unwrap();
        assert_eq!(board.to_fen(), "4k3/8/8/8/8/8/8/5RK1 b - - 1 1");
    }

    #[test]
    fn illegal_replay_move_is_an_error() {
        assert!(parse_position(&["startpos", "moves", "e2e5"]).is_err());
        assert!(parse_position(&["startpos", "moves", "zzzz"]).is_err());
    }

    #[test]
    fn go_parsing_covers_the_clock_forms() {
        let limits = parse_go(&["wtime", "30000", "btime", "25000", "winc", "100", "movestogo", "12"]);
        assert_eq!(limits.wtime, Some(30000));
        assert_eq!(limits.btime, Some(25000));
        assert_eq!(limits.winc, 100);
        assert_eq!(limits.movestogo, Some(12));

        let limits = parse_go(&["depth", "9"]);
        assert_eq!(limits.depth, Some(9));

        let limits = parse_go(&["infinite"]);
        assert!(limits.infinite);

        // unknown tokens are skipped without derailing the rest
        let limits = parse_go(&["searchmoves", "e2e4", "movetime", "150"]);
        assert_eq!(limits.movetime, Some(150));
    }

    #[test]
    fn promotion_moves_parse() {
        let board: Board = "4k3/P7/8/8/8/8/8/4K3 w - - 0 1".parse().unwrap();
        let mv = parse_uci_move(&board, "a7a8q").unwrap();
        assert_eq!(mv.promotion(), Some(crate::board::Piece::Queen));
        let mv = parse_uci_move(&board, "a7a8n").unwrap();
        assert_eq!(mv.promotion(), Some(crate::board::Piece::Knight));
    }

    #[test]
    fn score_formatting() {
        assert_eq!(format_score(35), "cp 35");
        assert_eq!(format_score(MATE_VALUE - 1), "mate 1");
        assert_eq!(format_score(MATE_VALUE - 4), "mate 2");
        assert_eq!(format_score(-(MATE_VALUE - 2)), "mate -1");
    }
}
