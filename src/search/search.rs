//! Principal-variation alpha-beta search with null-move pruning, razoring,
//! static null-move pruning, ProbCut, internal iterative reduction, check
//! and singular extensions, move-count and futility pruning, late-move
//! reductions and a quiescence tail.
//!
//! Scores are side-relative. An abort unwinds with 0 everywhere; callers
//! discard results from an aborted iteration.

use crate::board::{Board, Piece};
use crate::moves::execute;
use crate::moves::square_control::{find_pins, gives_check, in_check, pseudo_legal};
use crate::moves::types::Move;
use crate::search::context::SearchContext;
use crate::search::picker::MovePicker;
use crate::search::see::see;
use crate::search::tt::{BOUND_EXACT, BOUND_LOWER, BOUND_UPPER};
use crate::search::{
    EGTB_WIN, MATE_VALUE, MAX_DEPTH, MAX_PLY, MAX_SCORE, is_mate_score, score_from_tt, score_to_tt,
};
use crate::tablebase::Wdl;
use arrayvec::ArrayVec;
use once_cell::sync::Lazy;

const RAZOR_DEPTH: i32 = 6;
const RAZOR_MARGIN: [i32; 6] = [0, 250, 500, 750, 1000, 1250];

const STAT_NULL_DEPTH: i32 = 4;
const STAT_NULL_MARGIN: [i32; 4] = [0, 80, 160, 320];

const PROBCUT_DEPTH: i32 = 5;
const PROBCUT_MARGIN: i32 = 100;

/// log-log reduction table indexed by (depth, move index).
static LMR_TABLE: Lazy<[[i32; 64]; 64]> = Lazy::new(|| {
    let mut table = [[0i32; 64]; 64];
    for (depth, row) in table.iter_mut().enumerate().skip(1) {
        for (moves, cell) in row.iter_mut().enumerate().skip(1) {
            let value = 0.5 + (depth as f64).ln() * (moves as f64).ln() / 2.25;
            *cell = value as i32;
        }
    }
    table
});

#[inline(always)]
fn lmr_reduction(depth: i32, move_count: i32) -> i32 {
    LMR_TABLE[depth.clamp(0, 63) as usize][move_count.clamp(0, 63) as usize]
}

/// Make/undo wrappers keep the incremental evaluator in step.
#[inline(always)]
fn make_move(board: &mut Board, ctx: &mut SearchContext, mv: Move) {
    execute::make(board, mv);
    ctx.eval.push(board, mv);
}

#[inline(always)]
fn undo_move(board: &mut Board, ctx: &mut SearchContext) {
    execute::undo(board);
    ctx.eval.pop();
}

/// Quiescence: resolve captures (and full evasions while in check) until
/// the position quiets down, standing pat on the static eval otherwise.
pub fn quiesce(
    board: &mut Board,
    ctx: &mut SearchContext,
    incheck: bool,
    mut alpha: i32,
    beta: i32,
) -> i32 {
    ctx.nodes += 1;
    ctx.check_abort();
    if ctx.aborted() {
        return 0;
    }

    let ply = board.ply as usize;
    if ply >= MAX_PLY {
        return ctx.eval.evaluate(board, alpha, beta);
    }
    if board.is_draw() {
        return 0;
    }

    let mut best = -MAX_SCORE;
    if !incheck {
        // stand pat: the side to move always has a quiet option
        best = ctx.eval.evaluate(board, alpha, beta);
        if best >= beta {
            return best;
        }
        if best > alpha {
            alpha = best;
        }
    }

    let pins = find_pins(board);
    let mut picker = MovePicker::captures(incheck);
    while let Some(mv) = picker.next(board, &ctx.order) {
        // losing captures cannot rescue a quiet position
        if !incheck && !mv.is_promotion() && see(board, mv) < 0 {
            continue;
        }
        if !pseudo_legal(board, pins, mv) {
            continue;
        }

        let child_incheck = gives_check(board, mv);
        make_move(board, ctx, mv);
        let score = -quiesce(board, ctx, child_incheck, -beta, -alpha);
        undo_move(board, ctx);
        if ctx.aborted() {
            return 0;
        }

        if score > best {
            best = score;
            if score > alpha {
                alpha = score;
                if score >= beta {
                    return score;
                }
            }
        }
    }

    if incheck && best == -MAX_SCORE {
        return -MATE_VALUE + ply as i32;
    }
    best
}

/// Recursive PV search. `exclude` turns the node into a singular-move
/// verification: the excluded move is skipped, the table is neither
/// trusted for cutoffs nor written, and whole-node pruning is off.
#[allow(clippy::too_many_arguments)]
pub fn search(
    board: &mut Board,
    ctx: &mut SearchContext,
    incheck: bool,
    mut alpha: i32,
    mut beta: i32,
    mut depth: i32,
    exclude: Option<Move>,
) -> i32 {
    debug_assert!(alpha < beta);
    debug_assert!(depth <= MAX_DEPTH);

    if depth <= 0 {
        return quiesce(board, ctx, incheck, alpha, beta);
    }

    let ply = board.ply as usize;
    let pv_node = beta - alpha != 1;
    let root = ply == 0;
    let singular_search = exclude.is_some();

    if ply >= MAX_PLY {
        return ctx.eval.evaluate(board, alpha, beta);
    }

    ctx.pv.enter(ply);
    ctx.nodes += 1;

    if !root {
        if board.is_draw() {
            return 0;
        }
        // mate-distance pruning: no line from here can beat a mate
        // already found closer to the root
        alpha = alpha.max(-MATE_VALUE + ply as i32);
        beta = beta.min(MATE_VALUE - ply as i32);
        if alpha >= beta {
            return alpha;
        }
    }

    ctx.check_abort();
    if ctx.aborted() {
        return 0;
    }

    // transposition probe: score cutoff on sufficient depth at non-PV
    // nodes, move hint everywhere
    let mut tt_move = None;
    let mut tt_hit = None;
    if let Some(hit) = ctx.tt.probe(board.key) {
        tt_move = hit.mv;
        if !pv_node && !singular_search && hit.depth >= depth {
            let score = score_from_tt(hit.score, ply);
            match hit.bound {
                BOUND_EXACT => return score,
                BOUND_LOWER if score >= beta => return score,
                BOUND_UPPER if score <= alpha => return score,
                _ => {}
            }
        }
        tt_hit = Some(hit);
    }

    // endgame tablebase probe
    if !pv_node && !root && !singular_search {
        if let Some(tb) = ctx.tb.clone() {
            if board.occupied().count_ones() <= tb.max_pieces() {
                if let Some(wdl) = tb.probe_wdl(board) {
                    ctx.tbhits += 1;
                    let (score, bound) = match wdl {
                        Wdl::Win => (EGTB_WIN - ply as i32, BOUND_LOWER),
                        Wdl::Loss => (-EGTB_WIN + ply as i32, BOUND_UPPER),
                        Wdl::Draw => (0, BOUND_EXACT),
                    };
                    if bound == BOUND_EXACT
                        || (bound == BOUND_LOWER && score >= beta)
                        || (bound == BOUND_UPPER && score < alpha)
                    {
                        ctx.tt.store(board.key, None, score_to_tt(score, ply), depth, bound);
                        return score;
                    }
                }
            }
        }
    }

    // static eval feeds the pruning decisions and the improving flag
    let eval_score = ctx.eval.evaluate(board, alpha, beta);
    ctx.eval_stack[ply] = eval_score;
    let improving = ply > 1 && ctx.eval_stack[ply] > ctx.eval_stack[ply - 2];

    if !pv_node && !incheck && !singular_search {
        // razoring: hopeless eval at low depth resolves tactically or not
        // at all
        if depth < RAZOR_DEPTH && eval_score + RAZOR_MARGIN[depth as usize] < alpha {
            let razor_alpha = alpha - RAZOR_MARGIN[depth as usize];
            let score = quiesce(board, ctx, false, razor_alpha, razor_alpha + 1);
            if ctx.aborted() {
                return 0;
            }
            if score < razor_alpha {
                return score;
            }
        }

        // static null move: eval is so far above beta that even a margin
        // cannot drag it back
        if depth < STAT_NULL_DEPTH && eval_score - STAT_NULL_MARGIN[depth as usize] >= beta {
            return eval_score - STAT_NULL_MARGIN[depth as usize];
        }

        // null move: hand over the move and still hold beta
        if depth >= 2
            && eval_score >= beta
            && board.has_non_pawn_material(board.side_to_move)
            && !board.last_was_null()
        {
            let null_depth = depth - 4 - (depth - 2) / 4 - ((eval_score - beta) / 200).min(3);
            make_move(board, ctx, Move::NULL);
            let score = -search(board, ctx, false, -beta, -beta + 1, null_depth, None);
            undo_move(board, ctx);
            if ctx.aborted() {
                return 0;
            }
            if score >= beta {
                // a mate found with a free tempo for the opponent is not
                // to be trusted
                return if is_mate_score(score) { beta } else { score };
            }
        }

        // ProbCut: a good capture clearing beta by a margin at reduced
        // depth is enough to ignore the node
        if depth >= PROBCUT_DEPTH && !is_mate_score(beta) {
            let beta_cut = beta + PROBCUT_MARGIN;
            let pins = find_pins(board);
            let mut picker = MovePicker::captures(false);
            while let Some(mv) = picker.next(board, &ctx.order) {
                if mv.is_quiet() || eval_score + see(board, mv) < beta_cut {
                    continue;
                }
                if !pseudo_legal(board, pins, mv) {
                    continue;
                }
                let child_incheck = gives_check(board, mv);
                make_move(board, ctx, mv);
                let score =
                    -search(board, ctx, child_incheck, -beta_cut, -beta_cut + 1, depth - 4, None);
                undo_move(board, ctx);
                if ctx.aborted() {
                    return 0;
                }
                if score >= beta_cut {
                    return score;
                }
            }
        }
    }

    // internal iterative reduction: no table move means the node is cheap
    // to come back to
    if depth > 3 && tt_move.is_none() && !incheck {
        depth -= 1;
    }

    let us = board.side_to_move;
    let pins = find_pins(board);
    let previous = board.last_move();

    let mut picker = MovePicker::new(
        incheck,
        tt_move,
        ctx.order.killers(us, ply),
        ctx.order.counter_moves(us.opposite(), previous),
    );

    let mut best_score = -MAX_SCORE;
    let mut best_move = None;
    let mut move_count = 0i32;
    let mut tried_quiets: ArrayVec<Move, 128> = ArrayVec::new();

    while let Some(mv) = picker.next(board, &ctx.order) {
        if exclude == Some(mv) {
            continue;
        }
        if !pseudo_legal(board, pins, mv) {
            continue;
        }
        move_count += 1;

        let child_gives_check = gives_check(board, mv);
        let mut extension = 0;
        let mut reduction = 0;

        // checking moves that do not lose material get a full extra ply
        if child_gives_check && (depth < 4 || see(board, mv) >= 0) {
            extension = 1;
        }

        // singular extension: the table move stands far above its
        // siblings when a reduced search without it fails low
        if pv_node
            && !root
            && depth >= 8
            && extension == 0
            && tt_move == Some(mv)
            && !singular_search
        {
            if let Some(hit) = &tt_hit {
                let tt_score = score_from_tt(hit.score, ply);
                if hit.bound != BOUND_UPPER
                    && hit.depth >= depth - 3
                    && !is_mate_score(tt_score)
                {
                    let reduced_beta = tt_score - 4 * depth;
                    let score = search(
                        board,
                        ctx,
                        incheck,
                        reduced_beta - 1,
                        reduced_beta,
                        depth / 2,
                        Some(mv),
                    );
                    if ctx.aborted() {
                        return 0;
                    }
                    if score < reduced_beta {
                        extension = 1;
                    }
                }
            }
        }

        // quiet-move pruning and reductions; killers and counters are
        // exempt, they earned their ordering slot
        if extension == 0
            && move_count > 1
            && mv.is_quiet()
            && !ctx.order.is_killer(us, ply, mv)
            && !ctx.order.is_counter_move(us.opposite(), previous, mv)
        {
            let bad_history = ctx.order.has_bad_history(us, mv);

            // move-count pruning
            if !pv_node && !singular_search && bad_history && depth < 8 && !incheck {
                let mut threshold = 4 + depth * 2;
                if !improving {
                    threshold -= 3;
                }
                if move_count > threshold {
                    continue;
                }
            }

            // futility: the eval plus a history-scaled margin cannot reach
            // alpha
            if depth < 5 && (!pv_node || !incheck) {
                let margin = depth * (50 + ctx.order.pruning_margin(us, mv));
                if eval_score + margin < alpha {
                    continue;
                }
            }

            // late move reductions
            if move_count > 3 && depth > 2 {
                reduction = lmr_reduction(depth, move_count);
                if !pv_node && !singular_search {
                    if bad_history
                        || !improving
                        || (incheck && mv.piece() == Piece::King)
                    {
                        reduction += 1;
                    }
                    if tt_move.is_some_and(|tm| !tm.is_quiet()) {
                        reduction += 1;
                    }
                } else if reduction > 0 && !bad_history {
                    reduction -= 1;
                }
            }
        }

        if mv.is_quiet() && tried_quiets.len() < tried_quiets.capacity() {
            tried_quiets.push(mv);
        }

        make_move(board, ctx, mv);
        let mut score;
        if move_count == 1 {
            score = -search(
                board,
                ctx,
                child_gives_check,
                -beta,
                -alpha,
                depth - 1 + extension,
                None,
            );
        } else {
            // zero-window scout, possibly reduced
            score = -search(
                board,
                ctx,
                child_gives_check,
                -alpha - 1,
                -alpha,
                depth - 1 + extension - reduction,
                None,
            );
            if !ctx.aborted() && score > alpha && reduction > 0 {
                score = -search(
                    board,
                    ctx,
                    child_gives_check,
                    -alpha - 1,
                    -alpha,
                    depth - 1 + extension,
                    None,
                );
            }
            if !ctx.aborted() && score > alpha && score < beta {
                score = -search(
                    board,
                    ctx,
                    child_gives_check,
                    -beta,
                    -alpha,
                    depth - 1 + extension,
                    None,
                );
            }
        }
        undo_move(board, ctx);
        if ctx.aborted() {
            return 0;
        }

        if score > best_score {
            if score > alpha {
                ctx.pv.update(ply, mv);
                if root {
                    ctx.root_best = Some(mv);
                    ctx.root_score = score;
                }
                alpha = score;
                best_move = Some(mv);
                if score >= beta {
                    if !singular_search {
                        if mv.is_quiet() {
                            ctx.order.save_beta_cutoff(us, ply, mv, &tried_quiets, previous);
                        }
                        ctx.tt.store(
                            board.key,
                            Some(mv),
                            score_to_tt(score, ply),
                            depth,
                            BOUND_LOWER,
                        );
                    }
                    return score;
                }
            }
            best_score = score;
        }
    }

    if singular_search {
        // only the excluded move was playable: report a fail-low so the
        // caller extends it
        if best_score == -MAX_SCORE {
            return beta - 1;
        }
        return best_score;
    }

    if best_score == -MAX_SCORE {
        // no legal move at all
        return if incheck { -MATE_VALUE + ply as i32 } else { 0 };
    }

    let bound = if best_move.is_some() { BOUND_EXACT } else { BOUND_UPPER };
    ctx.tt.store(board.key, best_move, score_to_tt(best_score, ply), depth, bound);

    best_score
}

/// One full-window root search at the given depth. Returns None when the
/// iteration was aborted midway and its result must be discarded.
pub fn search_root(board: &mut Board, ctx: &mut SearchContext, depth: i32) -> Option<(i32, Move)> {
    board.ply = 0;
    ctx.pv.clear();
    ctx.eval.reset(board);

    let incheck = in_check(board, board.side_to_move);
    let score = search(board, ctx, incheck, -MAX_SCORE, MAX_SCORE, depth, None);
    ctx.flush_nodes();

    if ctx.aborted() {
        return None;
    }
    ctx.completed_depth = depth;
    ctx.root_best.map(|mv| (score, mv))
}
