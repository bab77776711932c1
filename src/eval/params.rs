//! Evaluation weights. Every term is an (opening, endgame) pair and the
//! final contribution interpolates by game phase.

use super::S;

pub const SCORE_PAWN: S = S::new(164, 223);
pub const SCORE_KNIGHT: S = S::new(687, 786);
pub const SCORE_BISHOP: S = S::new(743, 794);
pub const SCORE_ROOK: S = S::new(1040, 1462);
pub const SCORE_QUEEN: S = S::new(2375, 2323);

pub const B_BISHOP_PAIR: S = S::new(64, 118);
pub const B_TEMPO: i32 = 24;

// pawn structure
pub const P_DOUBLED: S = S::new(42, 12);
pub const P_ISOLATED: S = S::new(16, 22);
pub const P_ISOLATED_OPEN: S = S::new(24, 38);
pub const P_WEAK: S = S::new(22, 9);
pub const B_CANDIDATE: S = S::new(7, 16);
pub const B_PAWN_SPACE: S = S::new(3, 4);
pub const B_CONNECTED: [S; 6] = [
    S::new(29, 0),
    S::new(38, 0),
    S::new(38, 19),
    S::new(14, 4),
    S::new(70, 38),
    S::new(88, 51),
];

// passed pawns, indexed by relative rank 2..=6
pub const B_PASSED: [S; 5] = [
    S::new(-11, 13),
    S::new(-3, 64),
    S::new(31, 121),
    S::new(131, 186),
    S::new(333, 332),
];
pub const B_UNBLOCKED: [S; 5] = [
    S::new(0, -3),
    S::new(12, 31),
    S::new(20, 73),
    S::new(2, 190),
    S::new(43, 263),
];
pub const P_KING_FAR_OWN: S = S::new(10, 30);
pub const B_KING_FAR_OPP: S = S::new(-16, 44);

// pieces
pub const B_KNIGHT_MOBILITY: S = S::new(22, 11);
pub const B_BISHOP_MOBILITY: S = S::new(14, 12);
pub const B_ROOK_MOBILITY: S = S::new(2, 14);
pub const B_QUEEN_MOBILITY: S = S::new(6, 14);
pub const B_ROOK_SEMI_OPEN: S = S::new(57, 0);
pub const B_ROOK_FULL_OPEN: S = S::new(100, 0);
pub const B_ROOK_RANK7: S = S::new(46, 88);
pub const P_PAWN_BISHOP_SQ: S = S::new(13, 13);
pub const P_TRAPPED_BISHOP: S = S::new(180, 260);
pub const P_TRAPPED_ROOK: S = S::new(90, 0);
pub const P_MINOR_BLOCKS_PAWN: S = S::new(40, 10);

// threats
pub const P_PAWN_ATK_KNIGHT: S = S::new(123, 66);
pub const P_PAWN_ATK_BISHOP: S = S::new(94, 140);
pub const P_PAWN_ATK_ROOK: S = S::new(97, 44);
pub const P_PAWN_ATK_QUEEN: S = S::new(77, 0);
pub const B_THREAT_PAWN: S = S::new(11, 55);
pub const B_THREAT_KNIGHT: S = S::new(25, 80);
pub const B_THREAT_BISHOP: S = S::new(28, 81);
pub const B_THREAT_ROOK: S = S::new(5, 58);
pub const B_THREAT_QUEEN: S = S::new(75, 91);

// king safety
pub const KING_ATTACK_KNIGHT: i32 = 6;
pub const KING_ATTACK_BISHOP: i32 = 5;
pub const KING_ATTACK_ROOK: i32 = 4;
pub const KING_ATTACK_QUEEN: i32 = 1;
pub const KING_ATTACK_MULTI: i32 = 6;
pub const B_KING_ATTACK: i32 = 51;
pub const P_PAWN_SHIELD: S = S::new(10, 32);
pub const P_PAWN_STORM: S = S::new(11, 0);
pub const B_PAWN_PROXIMITY: S = S::new(0, 12);

// piece-square table builders: per-piece rank and file weights, combined
// per square at startup
pub const PST_P_RANK: S = S::new(7, -1);
pub const PST_P_FILE: [S; 4] = [S::new(-14, 27), S::new(27, 24), S::new(19, 23), S::new(30, 3)];

pub const PST_N_RANK: [S; 8] = [
    S::new(-28, -32),
    S::new(9, 6),
    S::new(16, 33),
    S::new(61, 60),
    S::new(47, 75),
    S::new(66, 27),
    S::new(53, 37),
    S::new(-103, 27),
];
pub const PST_N_FILE: [S; 4] =
    [S::new(-11, 11), S::new(30, 29), S::new(32, 40), S::new(48, 80)];

pub const PST_B_RANK: [S; 8] = [
    S::new(17, 3),
    S::new(42, 16),
    S::new(54, 44),
    S::new(49, 60),
    S::new(43, 76),
    S::new(94, 55),
    S::new(-20, 89),
    S::new(14, 60),
];
pub const PST_B_FILE: [S; 4] = [S::new(18, 21), S::new(54, 54), S::new(43, 59), S::new(43, 75)];

pub const PST_R_RANK: [S; 8] = [
    S::new(34, -1),
    S::new(-25, 11),
    S::new(-39, 28),
    S::new(-20, 57),
    S::new(57, 44),
    S::new(96, 38),
    S::new(50, 53),
    S::new(19, 95),
];
pub const PST_R_FILE: [S; 4] = [S::new(4, 53), S::new(5, 44), S::new(45, 28), S::new(48, 13)];

pub const PST_Q_RANK: [S; 8] = [
    S::new(58, -29),
    S::new(81, -2),
    S::new(44, 79),
    S::new(-4, 139),
    S::new(-3, 137),
    S::new(9, 132),
    S::new(-54, 155),
    S::new(10, 110),
];
pub const PST_Q_FILE: [S; 8] = [
    S::new(36, 49),
    S::new(25, 61),
    S::new(44, 47),
    S::new(35, 84),
    S::new(35, 87),
    S::new(21, 94),
    S::new(49, 88),
    S::new(59, 61),
];

pub const PST_K_RANK: [S; 8] = [
    S::new(25, -72),
    S::new(-2, -7),
    S::new(-24, 15),
    S::new(-29, 40),
    S::new(-27, 101),
    S::new(33, 145),
    S::new(4, 126),
    S::new(15, -32),
];
pub const PST_K_FILE: [S; 8] = [
    S::new(-39, -11),
    S::new(75, 25),
    S::new(46, 54),
    S::new(-99, 85),
    S::new(7, 55),
    S::new(-57, 72),
    S::new(75, 27),
    S::new(-15, -33),
];

/// Evaluation margin for the lazy alpha/beta exits.
pub const LAZY_MARGIN: i32 = 400;
