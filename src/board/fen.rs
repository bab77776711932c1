//! Forsyth-Edwards Notation parsing and serialization.
//!
//! Standard 6-field form: placement (rank 8 first), side to move, castling
//! rights, en-passant target, halfmove clock, fullmove number. The last two
//! fields are optional on input and default to "0 1".

use super::fen_tables::{CHAR_TO_PC, PC_TO_CHAR, pc_index};
use super::{Board, CASTLE_BK, CASTLE_BQ, CASTLE_WK, CASTLE_WQ, Color, Piece};
use crate::square::Square;
use std::str::FromStr;

impl Board {
    /// Drop any claimed right whose king or rook is not on its home
    /// square. Make/undo rely on that invariant: a set right implies the
    /// castle is physically playable once the path clears.
    fn sanitize_castling_rights(&mut self) {
        use crate::square::Square;
        let white_king_home = self.bb(Color::White, Piece::King) & Square::E1.bb() != 0;
        let black_king_home = self.bb(Color::Black, Piece::King) & Square::E8.bb() != 0;
        let white_h_rook_home = self.bb(Color::White, Piece::Rook) & Square::H1.bb() != 0;
        let white_a_rook_home = self.bb(Color::White, Piece::Rook) & Square::A1.bb() != 0;
        let black_h_rook_home = self.bb(Color::Black, Piece::Rook) & Square::H8.bb() != 0;
        let black_a_rook_home = self.bb(Color::Black, Piece::Rook) & Square::A8.bb() != 0;

        if !white_king_home {
            self.castling_rights &= !(CASTLE_WK | CASTLE_WQ);
        }
        if !black_king_home {
            self.castling_rights &= !(CASTLE_BK | CASTLE_BQ);
        }
        if !white_h_rook_home {
            self.castling_rights &= !CASTLE_WK;
        }
        if !white_a_rook_home {
            self.castling_rights &= !CASTLE_WQ;
        }
        if !black_h_rook_home {
            self.castling_rights &= !CASTLE_BK;
        }
        if !black_a_rook_home {
            self.castling_rights &= !CASTLE_BQ;
        }
    }

    /// Replace the whole position with the one described by `fen`.
    /// On error the board is left in an unspecified but valid-to-drop state;
    /// callers are expected to discard it.
    pub fn set_fen(&mut self, fen: &str) -> Result<(), String> {
        let mut fields = fen.split_whitespace();

        let placement = fields.next().ok_or("empty FEN")?;
        let side = fields.next().ok_or("FEN missing side to move")?;
        let castling = fields.next().ok_or("FEN missing castling rights")?;
        let en_passant = fields.next().ok_or("FEN missing en-passant field")?;
        let halfmove = fields.next().unwrap_or("0");
        let fullmove = fields.next().unwrap_or("1");

        *self = Board::new_empty();

        // Placement walks ranks 8..1, which is square index order.
        let mut sq: u8 = 0;
        for rank in placement.split('/') {
            let rank_start = sq;
            for c in rank.chars() {
                if let Some(skip) = c.to_digit(10) {
                    if !(1..=8).contains(&skip) {
                        return Err(format!("bad skip count {:?} in FEN", c));
                    }
                    sq += skip as u8;
                } else {
                    let (color, piece) = CHAR_TO_PC
                        .get(c as usize)
                        .copied()
                        .flatten()
                        .ok_or_else(|| format!("unknown piece glyph {:?}", c))?;
                    if sq >= 64 {
                        return Err("FEN placement overflows the board".to_string());
                    }
                    self.add_piece(color, piece, sq);
                    sq += 1;
                }
            }
            if sq - rank_start != 8 {
                return Err(format!("FEN rank {:?} does not span 8 files", rank));
            }
        }
        if sq != 64 {
            return Err("FEN placement does not cover 64 squares".to_string());
        }

        self.side_to_move = match side {
            "w" => Color::White,
            "b" => Color::Black,
            _ => return Err(format!("bad side-to-move field {:?}", side)),
        };

        self.castling_rights = 0;
        if castling != "-" {
            for c in castling.chars() {
                self.castling_rights |= match c {
                    'K' => CASTLE_WK,
                    'Q' => CASTLE_WQ,
                    'k' => CASTLE_BK,
                    'q' => CASTLE_BQ,
                    _ => return Err(format!("bad castling field {:?}", castling)),
                };
            }
        }
        self.sanitize_castling_rights();

        self.ep_square = match en_passant {
            "-" => None,
            s => {
                let sq = Square::from_str(s)?;
                // only ranks 3 and 6 are ever valid targets
                if sq.rank() != 2 && sq.rank() != 5 {
                    return Err(format!("bad en-passant target {:?}", s));
                }
                Some(sq)
            }
        };

        self.fifty = halfmove
            .parse::<u8>()
            .map_err(|_| format!("bad halfmove clock {:?}", halfmove))?;
        self.fullmove_number = fullmove
            .parse::<u32>()
            .map_err(|_| format!("bad fullmove number {:?}", fullmove))?;

        if self.bb(Color::White, Piece::King).count_ones() != 1
            || self.bb(Color::Black, Piece::King).count_ones() != 1
        {
            return Err("FEN must place exactly one king per side".to_string());
        }

        self.refresh_keys();
        self.clear_history();
        self.ply = 0;
        Ok(())
    }

    pub fn to_fen(&self) -> String {
        let mut out = String::with_capacity(90);

        for rank in 0..8u8 {
            let mut empty_run = 0;
            for file in 0..8u8 {
                let sq = Square::from_file_rank(file, rank);
                match self.piece_at(sq) {
                    Some((color, piece)) => {
                        if empty_run > 0 {
                            out.push((b'0' + empty_run) as char);
                            empty_run = 0;
                        }
                        out.push(PC_TO_CHAR[pc_index(color, piece)] as char);
                    }
                    None => empty_run += 1,
                }
            }
            if empty_run > 0 {
                out.push((b'0' + empty_run) as char);
            }
            if rank != 7 {
                out.push('/');
            }
        }

        out.push(' ');
        out.push(match self.side_to_move {
            Color::White => 'w',
            Color::Black => 'b',
        });

        out.push(' ');
        if self.castling_rights == 0 {
            out.push('-');
        } else {
            if self.has_castling(CASTLE_WK) {
                out.push('K');
            }
            if self.has_castling(CASTLE_WQ) {
                out.push('Q');
            }
            if self.has_castling(CASTLE_BK) {
                out.push('k');
            }
            if self.has_castling(CASTLE_BQ) {
                out.push('q');
            }
        }

        out.push(' ');
        match self.ep_square {
            Some(sq) => out.push_str(&sq.to_string()),
            None => out.push('-'),
        }

        out.push_str(&format!(" {} {}", self.fifty, self.fullmove_number));
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const START: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";
    const KIWIPETE: &str = "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1";

    #[test]
    fn round_trips() {
        for fen in [
            START,
            KIWIPETE,
            "8/2p5/3p4/KP5r/1R3p1k/8/4P1P1/8 w - - 0 1",
            "4k3/8/8/3pP3/8/8/8/4K3 w - d6 0 2",
        ] {
            let board: Board = fen.parse().unwrap();
            board.validate().unwrap();
            assert_eq!(board.to_fen(), fen);
        }
    }

    #[test]
    fn keys_match_scratch_composition() {
        let board: Board = KIWIPETE.parse().unwrap();
        assert_eq!(board.key, board.compute_key_full());
        assert_eq!(board.pawn_key, board.compute_pawn_key_full());
    }

    #[test]
    fn short_fen_defaults_clocks() {
        let board: Board = "4k3/8/8/8/8/8/8/4K2R w K -".parse().unwrap();
        assert_eq!(board.fifty, 0);
        assert_eq!(board.fullmove_number, 1);
        assert!(board.has_kingside_castle(Color::White));
    }

    #[test]
    fn phantom_castling_rights_are_dropped() {
        // queenside right claimed with no a1 rook
        let board: Board = "4k3/8/8/8/8/8/8/4K2R w KQ - 0 1".parse().unwrap();
        assert!(board.has_kingside_castle(Color::White));
        assert!(!board.has_queenside_castle(Color::White));
        // king off its home square loses both
        let board: Board = "4k3/8/8/8/8/8/8/R2K3R w KQ - 0 1".parse().unwrap();
        assert_eq!(board.castling_rights, 0);
    }

    #[test]
    fn rejects_malformed_fens() {
        assert!("".parse::<Board>().is_err());
        assert!("rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP w KQkq - 0 1".parse::<Board>().is_err());
        assert!("9/8/8/8/8/8/8/8 w - - 0 1".parse::<Board>().is_err());
        assert!("rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR x KQkq - 0 1".parse::<Board>().is_err());
        // two white kings
        assert!("4k3/8/8/8/8/8/8/3KK3 w - - 0 1".parse::<Board>().is_err());
        // en-passant target on an impossible rank
        assert!("4k3/8/8/8/8/8/8/4K3 w - e4 0 1".parse::<Board>().is_err());
    }
}
