//! Material accounting: tapering phase, the material term itself, and the
//! draw-scaling factor derived from recognized material patterns.

use super::S;
use super::params::{B_BISHOP_PAIR, SCORE_BISHOP, SCORE_KNIGHT, SCORE_PAWN, SCORE_QUEEN, SCORE_ROOK};
use crate::bitboard::{BitboardExt, DARK_SQUARES, LIGHT_SQUARES};
use crate::board::{Board, Color, Piece};
use crate::square::Square;

/// Game phase: 0 at full material (opening), 48 with none left (endgame).
/// Base 48 = 2Q*8 + 4R*4 + 4B*2 + 4N*2.
pub const PHASE_MAX: i32 = 48;

/// No reduction; draw factors scale the final score by `factor / 64`.
pub const NO_DRAW_ADJUST: i32 = 64;

pub fn phase(board: &Board) -> i32 {
    let mut phase = PHASE_MAX;
    for color in [Color::White, Color::Black] {
        phase -= board.count(color, Piece::Queen) as i32 * 8;
        phase -= board.count(color, Piece::Rook) as i32 * 4;
        phase -= (board.count(color, Piece::Bishop) + board.count(color, Piece::Knight)) as i32 * 2;
    }
    phase.clamp(0, PHASE_MAX)
}

/// Plain material with the bishop-pair bonus, from White's view.
pub fn material(board: &Board) -> S {
    let mut total = S::ZERO;
    for color in [Color::White, Color::Black] {
        let mut side = SCORE_PAWN * board.count(color, Piece::Pawn) as i32
            + SCORE_KNIGHT * board.count(color, Piece::Knight) as i32
            + SCORE_BISHOP * board.count(color, Piece::Bishop) as i32
            + SCORE_ROOK * board.count(color, Piece::Rook) as i32
            + SCORE_QUEEN * board.count(color, Piece::Queen) as i32;
        if board.count(color, Piece::Bishop) >= 2 {
            side += B_BISHOP_PAIR;
        }
        match color {
            Color::White => total += side,
            Color::Black => total -= side,
        }
    }
    total
}

struct Counts {
    p: [i32; 2],
    n: [i32; 2],
    b: [i32; 2],
    r: [i32; 2],
    q: [i32; 2],
}

impl Counts {
    fn of(board: &Board) -> Self {
        let get = |c: Color, p: Piece| board.count(c, p) as i32;
        Counts {
            p: [get(Color::White, Piece::Pawn), get(Color::Black, Piece::Pawn)],
            n: [get(Color::White, Piece::Knight), get(Color::Black, Piece::Knight)],
            b: [get(Color::White, Piece::Bishop), get(Color::Black, Piece::Bishop)],
            r: [get(Color::White, Piece::Rook), get(Color::Black, Piece::Rook)],
            q: [get(Color::White, Piece::Queen), get(Color::Black, Piece::Queen)],
        }
    }

    fn minors(&self, c: usize) -> i32 {
        self.n[c] + self.b[c]
    }

    fn majors(&self, c: usize) -> i32 {
        self.r[c] + self.q[c]
    }
}

/// Draw factor in [0, 64]: recognized drawish material patterns shrink the
/// final score, 0 meaning dead drawn.
pub fn draw_factor(board: &Board) -> i32 {
    let c = Counts::of(board);
    const W: usize = 0;
    const B: usize = 1;

    // same-count bishop endings: opposite-colored bishops are the
    // drawiest, then same-colored, then multiple bishops
    if c.majors(W) == 0
        && c.majors(B) == 0
        && c.n[W] == 0
        && c.n[B] == 0
        && c.b[W] != 0
        && c.b[W] == c.b[B]
        && (c.p[W] - c.p[B]).abs() <= 2
    {
        if c.b[W] == 1 {
            let wb = board.bb(Color::White, Piece::Bishop);
            let bb = board.bb(Color::Black, Piece::Bishop);
            let opposite = (wb & LIGHT_SQUARES != 0) != (bb & LIGHT_SQUARES != 0);
            return if opposite { 8 } else { 16 };
        }
        return 32;
    }

    // with real pawn mass the score stands as is
    if c.p[W] > 2 || c.p[B] > 2 {
        return NO_DRAW_ADJUST;
    }

    let w_mat = c.minors(W) + c.majors(W) + c.p[W];
    let b_mat = c.minors(B) + c.majors(B) + c.p[B];
    if w_mat == 0 && b_mat == 0 {
        return 0; // bare kings
    }

    if c.p[W] == 0 && c.p[B] == 0 {
        if c.majors(W) == 0 && c.majors(B) == 0 {
            // two minors against one cannot usually be converted
            if (c.minors(W) == 2 && c.minors(B) == 1) || (c.minors(B) == 2 && c.minors(W) == 1) {
                return 8;
            }
            return NO_DRAW_ADJUST;
        }
        let rook_only = |s: usize| c.r[s] == 1 && c.q[s] == 0;
        if (rook_only(W) && c.minors(B) == 2 && c.majors(B) == 0)
            || (rook_only(B) && c.minors(W) == 2 && c.majors(W) == 0)
        {
            return 8;
        }
        if (rook_only(W) && c.minors(W) == 1 && rook_only(B) && c.minors(B) == 0)
            || (rook_only(B) && c.minors(B) == 1 && rook_only(W) && c.minors(W) == 0)
        {
            return 8;
        }
        if (rook_only(W) && c.minors(W) == 0 && c.minors(B) == 1 && c.majors(B) == 0)
            || (rook_only(B) && c.minors(B) == 0 && c.minors(W) == 1 && c.majors(W) == 0)
        {
            return 8;
        }
        if rook_only(W) && c.minors(W) == 0 && rook_only(B) && c.minors(B) == 0 {
            return 0;
        }
        return NO_DRAW_ADJUST;
    }

    // endgames with at most two pawns a side
    let lone_minor = |s: usize| c.minors(s) == 1 && c.majors(s) == 0;
    if (lone_minor(W) && c.p[W] == 0 && b_mat == c.p[B] && c.p[B] == 1)
        || (lone_minor(B) && c.p[B] == 0 && w_mat == c.p[W] && c.p[W] == 1)
    {
        return 0; // minor vs pawn
    }
    let rook_vs_light = |s: usize, o: usize| {
        c.r[s] == 1 && c.q[s] == 0 && c.minors(s) == 0 && c.p[s] == 0
            && c.majors(o) == 0 && c.minors(o) == 1 && c.p[o] < 2
    };
    if rook_vs_light(W, B) || rook_vs_light(B, W) {
        return 32;
    }
    if kbp_wrong_bishop_draw(board, &c) {
        return 0;
    }

    NO_DRAW_ADJUST
}

/// KBP vs K with a rook-file pawn whose promotion corner is the wrong
/// color for the bishop, and the defending king in reach: dead draw.
fn kbp_wrong_bishop_draw(board: &Board, c: &Counts) -> bool {
    let strong = if c.b[0] == 1 && c.n[0] == 0 && c.majors(0) == 0 && c.p[0] == 1 {
        Color::White
    } else if c.b[1] == 1 && c.n[1] == 0 && c.majors(1) == 0 && c.p[1] == 1 {
        Color::Black
    } else {
        return false;
    };
    let weak = strong.opposite();
    let weak_idx = weak as usize;
    let all_weak = c.p[weak_idx] + c.minors(weak_idx) + c.majors(weak_idx);
    if all_weak != 0 {
        return false;
    }

    let pawn_sq = board.bb(strong, Piece::Pawn).lsb();
    let file = pawn_sq & 7;
    if file != 0 && file != 7 {
        return false;
    }

    let promo_sq = match strong {
        Color::White => file,      // rank 8
        Color::Black => 56 + file, // rank 1
    };
    let promo = Square::from_index(promo_sq);
    let bishop_sq = Square::from_index(board.bb(strong, Piece::Bishop).lsb());
    let promo_color = if promo.bb() & DARK_SQUARES != 0 { 1 } else { 0 };
    let bishop_color = if bishop_sq.bb() & DARK_SQUARES != 0 { 1 } else { 0 };
    if promo_color == bishop_color {
        return false;
    }

    // defending king must beat both the pawn and the attacking king to
    // the corner
    let mut pawn_dist = Square::from_index(pawn_sq).distance(promo) as i32;
    if board.side_to_move == strong {
        pawn_dist -= 1;
    }
    let weak_king = board.king_square(weak);
    let strong_king = board.king_square(strong);
    weak_king.distance(promo) as i32 <= pawn_dist
        && weak_king.distance(promo) < strong_king.distance(promo)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn factor(fen: &str) -> i32 {
        draw_factor(&fen.parse::<Board>().unwrap())
    }

    #[test]
    fn phase_spans_opening_to_endgame() {
        assert_eq!(phase(&Board::new()), 0);
        assert_eq!(phase(&"4k3/8/8/8/8/8/8/4K3 w - - 0 1".parse().unwrap()), PHASE_MAX);
        let rook_ending: Board = "4k3/8/8/8/8/8/8/R3K3 w - - 0 1".parse().unwrap();
        assert_eq!(phase(&rook_ending), PHASE_MAX - 4);
    }

    #[test]
    fn bare_kings_are_dead_drawn() {
        assert_eq!(factor("4k3/8/8/8/8/8/8/4K3 w - - 0 1"), 0);
    }

    #[test]
    fn opposite_bishops_scale_down_hard() {
        // light-squared vs dark-squared bishop, one pawn each
        assert_eq!(factor("4k3/4p3/8/8/2b5/2B5/4P3/4K3 w - - 0 1"), 8);
    }

    #[test]
    fn same_colored_bishops_scale_less() {
        // both bishops live on light squares
        let f = factor("4k3/4p3/8/8/8/1b6/B3P3/4K3 w - - 0 1");
        assert_eq!(f, 16);
    }

    #[test]
    fn rook_vs_rook_is_drawn() {
        assert_eq!(factor("4k3/8/8/8/8/8/r7/R3K3 w - - 0 1"), 0);
    }

    #[test]
    fn normal_middlegames_are_untouched() {
        assert_eq!(factor(&Board::new().to_fen()), NO_DRAW_ADJUST);
    }

    #[test]
    fn wrong_rook_pawn_bishop_is_drawn() {
        // dark-squared bishop on a3 cannot cover the light a8 corner and
        // the defending king already sits there
        assert_eq!(factor("k7/8/P7/8/8/B7/8/4K3 w - - 0 1"), 0);
    }

    #[test]
    fn right_bishop_keeps_winning_chances() {
        // light-squared bishop on c4 matches the a8 corner
        assert_eq!(factor("k7/8/P7/8/2B5/8/8/4K3 w - - 0 1"), NO_DRAW_ADJUST);
    }
}
