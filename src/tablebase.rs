//! Endgame-tablebase collaborator contract.
//!
//! The engine only consumes the probe interface; an actual Syzygy backend
//! is an external concern. `init` validates the configured path and, since
//! no backend is compiled in, reports failure so the caller disables
//! probing and searches on without it.

use crate::board::Board;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Wdl {
    Win,
    Draw,
    Loss,
}

pub trait TablebaseProbe: Send + Sync {
    /// Largest piece count covered by the loaded tables.
    fn max_pieces(&self) -> u32;

    /// Win/draw/loss from the side to move's view, or None when the
    /// position is not covered.
    fn probe_wdl(&self, board: &Board) -> Option<Wdl>;
}

/// Initialize the collaborator for `path`. Errors disable probing; the
/// search itself never fails on their account.
pub fn init(path: &str) -> Result<Arc<dyn TablebaseProbe>, String> {
    if path.trim().is_empty() || path == "<empty>" {
        return Err("no tablebase path configured".to_string());
    }
    if !std::path::Path::new(path).is_dir() {
        return Err(format!("tablebase path {:?} is not a directory", path));
    }
    Err("no tablebase backend compiled in, probing disabled".to_string())
}
