//! Magic-multiplier sliding-piece attack tables.
//!
//! For each square a relevant-blockers mask selects the occupancy bits that
//! matter; multiplying the masked occupancy by a per-square magic constant
//! and right-shifting produces an index into a precomputed attack table.
//! Magics are found at startup by a deterministic random search.

pub mod attacks;
pub mod search;
pub mod structs;

pub use structs::{MagicEntry, MagicTable, MagicTables};

use once_cell::sync::Lazy;
use rand::{SeedableRng, rngs::StdRng};

/// Seed for the startup magic search. Fixed so every run (and every worker
/// thread) sees identical tables.
const MAGIC_SEED: u64 = 1;

static TABLES: Lazy<MagicTables> = Lazy::new(|| {
    #[cfg(feature = "load_magic")]
    if let Some(tables) = load_snapshot() {
        return tables;
    }
    let start = std::time::Instant::now();
    let mut rng = StdRng::seed_from_u64(MAGIC_SEED);
    let tables =
        generate_magic_tables(&mut rng).expect("magic search converges for the fixed seed");
    tracing::debug!(elapsed_ms = start.elapsed().as_millis() as u64, "magic tables generated");
    tables
});

/// Optional startup shortcut: read a previously serialized table set from
/// `TALON_MAGIC_PATH` instead of re-running the search. Any problem falls
/// back to generation.
#[cfg(feature = "load_magic")]
fn load_snapshot() -> Option<MagicTables> {
    let path = std::env::var("TALON_MAGIC_PATH").ok()?;
    let bytes = std::fs::read(path).ok()?;
    MagicTables::from_bytes(&bytes).ok()
}

/// Process-wide tables, built on first use.
#[inline]
pub fn tables() -> &'static MagicTables {
    &TABLES
}

pub fn generate_magic_tables(rng: &mut StdRng) -> Result<MagicTables, String> {
    Ok(MagicTables {
        rook: build_slider_table(rng, attacks::rook_mask, attacks::rook_attacks_scan)?,
        bishop: build_slider_table(rng, attacks::bishop_mask, attacks::bishop_attacks_scan)?,
    })
}

fn build_slider_table(
    rng: &mut StdRng,
    mask_fn: fn(u8) -> u64,
    attack_fn: fn(u8, u64) -> u64,
) -> Result<MagicTable, String> {
    let mut entries = Vec::with_capacity(64);
    for sq in 0..64u8 {
        let mask = mask_fn(sq);
        let bits = mask.count_ones();
        let shift = 64 - bits;

        // Every subset of the mask, paired with its true attack set.
        let blockers = attacks::blocker_subsets(mask);
        let reference: Vec<u64> = blockers.iter().map(|&b| attack_fn(sq, b)).collect();

        let (magic, table) = search::find_magic(&blockers, &reference, shift, rng)
            .map_err(|e| format!("square {}: {}", sq, e))?;

        entries.push(MagicEntry {
            magic,
            shift,
            mask,
            table,
        });
    }
    Ok(MagicTable { entries })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rook_lookup_matches_scan() {
        let t = tables();
        let sq = 27u8; // d4
        let blockers = (1u64 << 19) | (1u64 << 35) | (1u64 << 24);
        assert_eq!(
            t.rook.attacks(sq as usize, blockers),
            attacks::rook_attacks_scan(sq, blockers)
        );
    }

    #[test]
    fn bishop_lookup_matches_scan() {
        let t = tables();
        let sq = 27u8;
        let blockers = (1u64 << 41) | (1u64 << 13);
        assert_eq!(
            t.bishop.attacks(sq as usize, blockers),
            attacks::bishop_attacks_scan(sq, blockers)
        );
    }

    #[test]
    fn queen_is_rook_union_bishop() {
        let t = tables();
        for sq in [0usize, 7, 28, 36, 63] {
            let blockers = 0x0042_0010_0800_2400u64;
            assert_eq!(
                t.queen_attacks(sq, blockers),
                t.rook.attacks(sq, blockers) | t.bishop.attacks(sq, blockers)
            );
        }
    }

    #[test]
    fn exhaustive_against_scan_on_one_square() {
        let t = tables();
        let sq = 36u8; // e4 area
        let mask = attacks::rook_mask(sq);
        for &blockers in &attacks::blocker_subsets(mask) {
            assert_eq!(
                t.rook.attacks(sq as usize, blockers),
                attacks::rook_attacks_scan(sq, blockers)
            );
        }
    }
}
