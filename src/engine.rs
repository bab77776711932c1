//! Long-lived engine value: owns the shared transposition table, the
//! abort flag, the option set and the evaluation backend, and drives the
//! "lazy SMP" search. Workers share the table and nothing else; helpers
//! run a skewed depth schedule and the main worker owns time control and
//! the final report.

use crate::board::Board;
use crate::eval::{Evaluator, nnue};
use crate::moves::movegen::generate_legal;
use crate::moves::types::{Move, MoveList};
use crate::search::context::SearchContext;
use crate::search::history::MoveOrder;
use crate::search::search::search_root;
use crate::search::time::{SearchLimits, TimeControl};
use crate::search::tt::TranspositionTable;
use crate::search::{MATE_VALUE, MAX_DEPTH, is_mate_score};
use crate::tablebase::{self, TablebaseProbe};
use std::sync::{Arc, Mutex};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

/// Killer/history/counter-move tables persist across the searches of one
/// game; workers borrow a table from this pool and return it when done.
/// `ucinewgame` empties the pool, which re-zeroes them.
type OrderPool = Arc<Mutex<Vec<Box<MoveOrder>>>>;

fn pool_take(pool: &OrderPool) -> Box<MoveOrder> {
    pool.lock().unwrap().pop().unwrap_or_default()
}

fn pool_put(pool: &OrderPool, order: Box<MoveOrder>) {
    pool.lock().unwrap().push(order);
}

pub const MIN_THREADS: usize = 1;
pub const MAX_THREADS: usize = 256;

/// Score drop between iterations that buys the search more soft time.
const SCORE_DROP_EXTENSION: i32 = 30;

#[derive(Debug, Clone)]
pub struct EngineOptions {
    pub hash_mb: usize,
    pub threads: usize,
    pub syzygy_path: Option<String>,
    pub eval_file: Option<String>,
}

impl Default for EngineOptions {
    fn default() -> Self {
        EngineOptions {
            hash_mb: 64,
            threads: 1,
            syzygy_path: None,
            eval_file: None,
        }
    }
}

/// Published after each completed depth.
pub struct IterationReport {
    pub depth: i32,
    pub score: i32,
    pub nodes: u64,
    pub nps: u64,
    pub elapsed: Duration,
    pub tbhits: u64,
    pub pv: Vec<Move>,
}

pub struct SearchReport {
    pub best_move: Option<Move>,
    pub ponder: Option<Move>,
    pub score: i32,
    pub depth: i32,
    pub nodes: u64,
    pub tbhits: u64,
    pub elapsed: Duration,
}

pub struct Engine {
    tt: Arc<TranspositionTable>,
    abort: Arc<AtomicBool>,
    /// Held high while a ponder/infinite search must keep its result back.
    hold: Arc<AtomicBool>,
    searching: Arc<AtomicBool>,
    options: EngineOptions,
    network: Option<Arc<nnue::Network>>,
    tablebase: Option<Arc<dyn TablebaseProbe>>,
    order_pool: OrderPool,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

impl Engine {
    pub fn new() -> Self {
        let options = EngineOptions::default();
        Engine {
            tt: Arc::new(TranspositionTable::new(options.hash_mb)),
            abort: Arc::new(AtomicBool::new(false)),
            hold: Arc::new(AtomicBool::new(false)),
            searching: Arc::new(AtomicBool::new(false)),
            options,
            network: None,
            tablebase: None,
            order_pool: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn options(&self) -> &EngineOptions {
        &self.options
    }

    pub fn is_searching(&self) -> bool {
        self.searching.load(Ordering::Relaxed)
    }

    /// Resize the table. Refused while the pool is searching: the workers
    /// hold references into the old allocation.
    pub fn set_hash_mb(&mut self, mb: usize) -> Result<usize, String> {
        if self.is_searching() {
            return Err("hash resize refused while a search is running".to_string());
        }
        let clamped = mb.clamp(TranspositionTable::MIN_SIZE_MB, TranspositionTable::MAX_SIZE_MB);
        self.tt = Arc::new(TranspositionTable::new(clamped));
        self.options.hash_mb = clamped;
        Ok(clamped)
    }

    pub fn set_threads(&mut self, threads: usize) -> usize {
        let clamped = threads.clamp(MIN_THREADS, MAX_THREADS);
        self.options.threads = clamped;
        clamped
    }

    /// Point the tablebase collaborator at `path`. A failed init disables
    /// probing and reports why.
    pub fn set_syzygy_path(&mut self, path: &str) -> Result<(), String> {
        self.options.syzygy_path = Some(path.to_string());
        match tablebase::init(path) {
            Ok(tb) => {
                self.tablebase = Some(tb);
                Ok(())
            }
            Err(reason) => {
                self.tablebase = None;
                Err(reason)
            }
        }
    }

    /// Load a network evaluator; on failure the classical evaluation
    /// stays in place.
    pub fn set_eval_file(&mut self, path: &str) -> Result<(), String> {
        let net = nnue::Network::load(path)?;
        self.options.eval_file = Some(path.to_string());
        self.network = Some(net);
        tracing::info!(path, "network evaluator loaded");
        Ok(())
    }

    /// `ucinewgame`: clear the table and re-zero the pooled killer and
    /// history tables.
    pub fn new_game(&mut self) {
        self.tt.clear();
        self.order_pool.lock().unwrap().clear();
    }

    pub fn abort(&self) {
        self.hold.store(false, Ordering::Relaxed);
        self.abort.store(true, Ordering::Relaxed);
    }

    /// `ponderhit`: the held search converts to a normal one.
    pub fn ponderhit(&self) {
        self.hold.store(false, Ordering::Relaxed);
    }

    /// Snapshot everything a search needs. The job is meant to run on its
    /// own thread; `stop` aborts it from this side.
    pub fn prepare_search(&mut self, board: Board, limits: SearchLimits) -> SearchJob {
        self.abort.store(false, Ordering::Relaxed);
        self.hold
            .store(limits.infinite || limits.ponder, Ordering::Relaxed);
        self.searching.store(true, Ordering::Relaxed);
        self.tt.new_search();
        SearchJob {
            board,
            limits,
            threads: self.options.threads,
            tt: self.tt.clone(),
            abort: self.abort.clone(),
            hold: self.hold.clone(),
            searching: self.searching.clone(),
            network: self.network.clone(),
            tablebase: self.tablebase.clone(),
            order_pool: self.order_pool.clone(),
        }
    }
}

pub struct SearchJob {
    board: Board,
    limits: SearchLimits,
    threads: usize,
    tt: Arc<TranspositionTable>,
    abort: Arc<AtomicBool>,
    hold: Arc<AtomicBool>,
    searching: Arc<AtomicBool>,
    network: Option<Arc<nnue::Network>>,
    tablebase: Option<Arc<dyn TablebaseProbe>>,
    order_pool: OrderPool,
}

impl SearchJob {
    fn evaluator(&self) -> Evaluator {
        match &self.network {
            Some(net) => Evaluator::with_network(net.clone()),
            None => Evaluator::classical(),
        }
    }

    /// Run to completion, publishing one report per finished depth.
    /// Always produces a best move when the position has any legal move.
    pub fn run(mut self, post: &dyn Fn(IterationReport)) -> SearchReport {
        let time = TimeControl::allocate(&self.limits, self.board.side_to_move);
        let shared_nodes = Arc::new(AtomicU64::new(0));
        let max_depth = self.limits.depth.unwrap_or(MAX_DEPTH).clamp(1, MAX_DEPTH);

        let mut legal = MoveList::new();
        generate_legal(&self.board, &mut legal);
        if legal.is_empty() {
            self.searching.store(false, Ordering::Relaxed);
            return SearchReport {
                best_move: None,
                ponder: None,
                score: if crate::moves::square_control::in_check(
                    &self.board,
                    self.board.side_to_move,
                ) {
                    -MATE_VALUE
                } else {
                    0
                },
                depth: 0,
                nodes: 0,
                tbhits: 0,
                elapsed: time.elapsed(),
            };
        }
        // the fallback guarantees a bestmove even if depth 1 is cut short
        let fallback = legal[0];

        let mut main_ctx = SearchContext::new(
            self.tt.clone(),
            self.abort.clone(),
            shared_nodes.clone(),
            self.tablebase.clone(),
            self.evaluator(),
            time,
            0,
        );
        main_ctx.order = pool_take(&self.order_pool);

        let mut best_move = fallback;
        let mut best_score = 0;
        let mut best_depth = 0;
        let mut ponder = None;

        std::thread::scope(|scope| {
            // helpers: private state, shared table, staggered depths
            for id in 1..self.threads {
                let mut helper_ctx = SearchContext::new(
                    self.tt.clone(),
                    self.abort.clone(),
                    shared_nodes.clone(),
                    self.tablebase.clone(),
                    self.evaluator(),
                    time,
                    id,
                );
                helper_ctx.order = pool_take(&self.order_pool);
                let mut helper_board = self.board.clone();
                let pool = self.order_pool.clone();
                scope.spawn(move || {
                    let start = 1 + (id as i32 & 1);
                    let mut depth = start;
                    while depth <= max_depth && !helper_ctx.aborted() {
                        let _ = search_root(&mut helper_board, &mut helper_ctx, depth);
                        // odd workers take every depth, the rest leapfrog
                        depth += if id >= 2 && (depth + id as i32) % 3 == 0 { 2 } else { 1 };
                    }
                    helper_ctx.flush_nodes();
                    pool_put(&pool, std::mem::take(&mut helper_ctx.order));
                });
            }

            // main worker: iterative deepening with time control
            let mut last_iteration = Duration::ZERO;
            for depth in 1..=max_depth {
                if depth > 1 && !main_ctx.time.iteration_fits(last_iteration) {
                    break;
                }
                let iteration_start = std::time::Instant::now();
                let Some((score, mv)) = search_root(&mut self.board, &mut main_ctx, depth) else {
                    break;
                };
                last_iteration = iteration_start.elapsed();

                // losing ground buys thinking time
                if depth > 1 && score + SCORE_DROP_EXTENSION < best_score {
                    main_ctx.time.extend_soft();
                }

                best_move = mv;
                best_score = score;
                best_depth = depth;
                let pv: Vec<Move> = main_ctx.pv.best_line().to_vec();
                ponder = pv.get(1).copied();

                let elapsed = main_ctx.time.elapsed();
                let nodes = shared_nodes.load(Ordering::Relaxed);
                let nps = (nodes as f64 / elapsed.as_secs_f64().max(1e-6)) as u64;
                post(IterationReport {
                    depth,
                    score,
                    nodes,
                    nps,
                    elapsed,
                    tbhits: main_ctx.tbhits,
                    pv,
                });

                if is_mate_score(score) {
                    break;
                }
                if main_ctx.time.soft_expired() {
                    break;
                }
            }

            // infinite or ponder searches sit on their result until the
            // GUI releases them
            while self.hold.load(Ordering::Relaxed) && !self.abort.load(Ordering::Relaxed) {
                std::thread::sleep(Duration::from_millis(5));
            }

            self.abort.store(true, Ordering::Relaxed);
        });

        main_ctx.flush_nodes();
        pool_put(&self.order_pool, std::mem::take(&mut main_ctx.order));
        self.searching.store(false, Ordering::Relaxed);

        tracing::debug!(
            depth = best_depth,
            score = best_score,
            nodes = shared_nodes.load(Ordering::Relaxed),
            threads = self.threads,
            "search finished"
        );

        SearchReport {
            best_move: Some(best_move),
            ponder,
            score: best_score,
            depth: best_depth,
            nodes: shared_nodes.load(Ordering::Relaxed),
            tbhits: main_ctx.tbhits,
            elapsed: main_ctx.time.elapsed(),
        }
    }
}
