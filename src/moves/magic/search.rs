//! Random search for magic multipliers.
//!
//! A candidate is accepted when hashing every blocker subset produces no
//! index collision between subsets with different attack sets ("constructive
//! collisions" between equal attack sets are fine and shrink nothing).

use rand::RngCore;

const MAX_ATTEMPTS: u32 = 1_000_000;

/// Sparse 64-bit candidate: AND of three random words keeps the popcount
/// low, which empirically makes valid magics far more likely.
#[inline(always)]
pub fn random_sparse_u64<R: RngCore>(rng: &mut R) -> u64 {
    rng.next_u64() & rng.next_u64() & rng.next_u64()
}

/// Try to fill an attack table with the candidate magic. Returns the table
/// on success, None on any destructive collision.
fn try_fill(blockers: &[u64], reference: &[u64], magic: u64, shift: u32) -> Option<Box<[u64]>> {
    let size = 1usize << (64 - shift);
    let mut table = vec![0u64; size];
    let mut used = vec![false; size];

    for (&blocker, &attack) in blockers.iter().zip(reference) {
        let index = (blocker.wrapping_mul(magic) >> shift) as usize;
        if used[index] {
            if table[index] != attack {
                return None;
            }
        } else {
            used[index] = true;
            table[index] = attack;
        }
    }
    Some(table.into_boxed_slice())
}

/// Search for a magic satisfying the hashing property, returning it with
/// its filled attack table.
pub fn find_magic<R: RngCore>(
    blockers: &[u64],
    reference: &[u64],
    shift: u32,
    rng: &mut R,
) -> Result<(u64, Box<[u64]>), String> {
    debug_assert_eq!(blockers.len(), reference.len());
    for _ in 0..MAX_ATTEMPTS {
        let magic = random_sparse_u64(rng);
        // quick rejection: the high bits of the hashed full mask should be
        // dense enough, otherwise collisions are almost certain
        if (blockers[blockers.len() - 1].wrapping_mul(magic) >> 56).count_ones() < 6 {
            continue;
        }
        if let Some(table) = try_fill(blockers, reference, magic, shift) {
            return Ok((magic, table));
        }
    }
    Err(format!("no valid magic after {} attempts", MAX_ATTEMPTS))
}
