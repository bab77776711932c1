//! Search limits and the soft/hard deadline controller.
//!
//! The soft deadline gates starting another iterative-deepening iteration;
//! the hard deadline is polled inside the search on the node-count mask and
//! forces an abort.

use crate::board::Color;
use std::time::{Duration, Instant};

/// Limits derived from a `go` command.
#[derive(Debug, Clone, Copy, Default)]
pub struct SearchLimits {
    pub depth: Option<i32>,
    pub movetime: Option<u64>,
    pub wtime: Option<u64>,
    pub btime: Option<u64>,
    pub winc: u64,
    pub binc: u64,
    pub movestogo: Option<u64>,
    pub infinite: bool,
    pub ponder: bool,
}

#[derive(Debug, Clone, Copy)]
pub struct TimeControl {
    pub start: Instant,
    soft: Option<Duration>,
    hard: Option<Duration>,
}

impl TimeControl {
    pub fn unlimited() -> Self {
        TimeControl {
            start: Instant::now(),
            soft: None,
            hard: None,
        }
    }

    pub fn fixed(duration: Duration) -> Self {
        TimeControl {
            start: Instant::now(),
            soft: Some(duration),
            hard: Some(duration),
        }
    }

    /// Derive deadlines from the limits for the side to move.
    ///
    /// Clock allocation reserves a safety buffer, spreads the remainder
    /// over the expected number of moves and keeps a hard ceiling well
    /// under the remaining time, so a single move can never flag us.
    pub fn allocate(limits: &SearchLimits, side: Color) -> Self {
        if limits.infinite || limits.ponder {
            return TimeControl::unlimited();
        }
        if let Some(ms) = limits.movetime {
            return TimeControl::fixed(Duration::from_millis(ms));
        }

        let (time, inc) = match side {
            Color::White => (limits.wtime, limits.winc),
            Color::Black => (limits.btime, limits.binc),
        };
        let Some(time) = time else {
            return TimeControl::unlimited();
        };

        let buffer = (time * 15 / 100).min(500);
        let usable = time.saturating_sub(buffer);

        let mut normal = if let Some(mtg) = limits.movestogo {
            usable / mtg.max(2) + inc * 3 / 4
        } else if usable > 5000 {
            usable / 40 + inc * 9 / 10
        } else if usable > 2000 {
            usable / 30 + inc * 3 / 4
        } else if usable > 500 {
            usable / 20 + inc / 2
        } else {
            inc / 2 + 20
        };
        normal = normal.min(usable).max(10.min(usable));

        let hard = (normal * 4).min(usable.saturating_sub(usable / 10)).max(normal);

        TimeControl {
            start: Instant::now(),
            soft: Some(Duration::from_millis(normal)),
            hard: Some(Duration::from_millis(hard)),
        }
    }

    #[inline(always)]
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    /// Checked between iterations: starting a new depth past this point
    /// is not worth it.
    #[inline]
    pub fn soft_expired(&self) -> bool {
        self.soft.is_some_and(|soft| self.start.elapsed() >= soft)
    }

    /// Checked at the node mask: the search must unwind now.
    #[inline]
    pub fn hard_expired(&self) -> bool {
        self.hard.is_some_and(|hard| self.start.elapsed() >= hard)
    }

    /// Stretch the soft deadline (score dropped between iterations),
    /// staying inside the hard one.
    pub fn extend_soft(&mut self) {
        if let (Some(soft), Some(hard)) = (self.soft, self.hard) {
            self.soft = Some((soft * 7 / 4).min(hard));
        }
    }

    /// Predicts whether another iteration fits: assumes it costs about
    /// three times the previous one.
    pub fn iteration_fits(&self, last_iteration: Duration) -> bool {
        match self.soft {
            None => true,
            Some(soft) => self.start.elapsed() + last_iteration * 3 <= soft,
        }
    }
}
