//! Game-status classification for adjudication and the CLI. The search
//! uses its own, stricter draw rules; these are the FIDE-flavored ones.

use crate::board::Board;
use crate::moves::movegen::generate_legal;
use crate::moves::square_control::in_check;
use crate::moves::types::MoveList;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameStatus {
    InPlay,
    DrawFivefold,
    DrawSeventyFiveMove,
    DrawThreefold,
    DrawFiftyMove,
    DrawDeadPosition,
    Stalemate,
    Checkmate,
}

pub fn is_draw_by_threefold(board: &Board) -> bool {
    board.repetition_count() >= 3
}

pub fn is_draw_by_fifty_move(board: &Board) -> bool {
    board.fifty >= 100
}

/// Status of the current position, automatic draws first, then claimable
/// ones, then the move-based outcomes.
pub fn position_status(board: &Board) -> GameStatus {
    if board.repetition_count() >= 5 {
        return GameStatus::DrawFivefold;
    }
    if board.fifty >= 150 {
        return GameStatus::DrawSeventyFiveMove;
    }
    if board.insufficient_material() {
        return GameStatus::DrawDeadPosition;
    }
    if is_draw_by_threefold(board) {
        return GameStatus::DrawThreefold;
    }
    if is_draw_by_fifty_move(board) {
        return GameStatus::DrawFiftyMove;
    }

    let mut legal = MoveList::new();
    generate_legal(board, &mut legal);
    if legal.is_empty() {
        if in_check(board, board.side_to_move) {
            GameStatus::Checkmate
        } else {
            GameStatus::Stalemate
        }
    } else {
        GameStatus::InPlay
    }
}
