//! Per-worker search state. Workers share the transposition table and the
//! abort flag; everything else here is private to one thread.

use crate::eval::Evaluator;
use crate::moves::types::Move;
use crate::search::history::MoveOrder;
use crate::search::time::TimeControl;
use crate::search::tt::TranspositionTable;
use crate::search::{MAX_PLY, MAX_SCORE};
use crate::tablebase::TablebaseProbe;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

/// Abort-flag and clock polling interval, as a node-count mask.
pub const TIME_CHECK_MASK: u64 = 4095;

/// Triangular principal-variation table indexed by ply.
pub struct PvTable {
    line: Vec<[Move; MAX_PLY]>,
    size: [usize; MAX_PLY],
}

impl Default for PvTable {
    fn default() -> Self {
        Self::new()
    }
}

impl PvTable {
    pub fn new() -> Self {
        PvTable {
            line: vec![[Move::NULL; MAX_PLY]; MAX_PLY],
            size: [0; MAX_PLY],
        }
    }

    /// Called on node entry: the line at this ply starts empty.
    #[inline(always)]
    pub fn enter(&mut self, ply: usize) {
        self.size[ply] = ply;
    }

    /// A move improved alpha: it heads this ply's line, followed by the
    /// child's line.
    pub fn update(&mut self, ply: usize, mv: Move) {
        self.line[ply][ply] = mv;
        let child_size = if ply + 1 < MAX_PLY { self.size[ply + 1] } else { ply + 1 };
        let (head, tail) = self.line.split_at_mut(ply + 1);
        for i in (ply + 1)..child_size {
            head[ply][i] = tail[0][i];
        }
        self.size[ply] = child_size.max(ply + 1);
    }

    pub fn best_line(&self) -> &[Move] {
        &self.line[0][..self.size[0]]
    }

    pub fn clear(&mut self) {
        self.size = [0; MAX_PLY];
    }
}

pub struct SearchContext {
    pub tt: Arc<TranspositionTable>,
    pub abort: Arc<AtomicBool>,
    /// Node total across all workers, for reporting.
    pub shared_nodes: Arc<AtomicU64>,
    pub tb: Option<Arc<dyn TablebaseProbe>>,
    pub time: TimeControl,
    pub eval: Evaluator,
    pub order: Box<MoveOrder>,
    pub pv: Box<PvTable>,
    pub eval_stack: [i32; MAX_PLY],

    pub nodes: u64,
    pub tbhits: u64,
    /// Nodes already flushed into `shared_nodes`.
    flushed_nodes: u64,

    pub root_best: Option<Move>,
    pub root_score: i32,
    pub completed_depth: i32,

    pub stopped: bool,
    pub is_main: bool,
    pub thread_id: usize,
}

impl SearchContext {
    pub fn new(
        tt: Arc<TranspositionTable>,
        abort: Arc<AtomicBool>,
        shared_nodes: Arc<AtomicU64>,
        tb: Option<Arc<dyn TablebaseProbe>>,
        eval: Evaluator,
        time: TimeControl,
        thread_id: usize,
    ) -> Self {
        SearchContext {
            tt,
            abort,
            shared_nodes,
            tb,
            time,
            eval,
            order: Box::new(MoveOrder::new()),
            pv: Box::new(PvTable::new()),
            eval_stack: [0; MAX_PLY],
            nodes: 0,
            tbhits: 0,
            flushed_nodes: 0,
            root_best: None,
            root_score: -MAX_SCORE,
            completed_depth: 0,
            stopped: false,
            is_main: thread_id == 0,
            thread_id,
        }
    }

    /// Node-mask poll: observe the abort flag; the main worker also
    /// enforces the hard deadline for everyone.
    #[inline]
    pub fn check_abort(&mut self) {
        if self.stopped {
            return;
        }
        if self.nodes & TIME_CHECK_MASK == 0 {
            self.flush_nodes();
            if self.abort.load(Ordering::Relaxed) {
                self.stopped = true;
            } else if self.is_main && self.time.hard_expired() {
                self.abort.store(true, Ordering::Relaxed);
                self.stopped = true;
            }
        }
    }

    #[inline(always)]
    pub fn aborted(&self) -> bool {
        self.stopped
    }

    /// Publish the locally counted nodes into the shared total.
    pub fn flush_nodes(&mut self) {
        let delta = self.nodes - self.flushed_nodes;
        if delta > 0 {
            self.shared_nodes.fetch_add(delta, Ordering::Relaxed);
            self.flushed_nodes = self.nodes;
        }
    }
}
