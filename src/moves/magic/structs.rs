use serde::{Deserialize, Serialize};

/// One square's magic data: hash multiplier, shift, relevant-blockers mask
/// and the attack table indexed by `(blockers & mask) * magic >> shift`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MagicEntry {
    pub magic: u64,
    pub shift: u32,
    pub mask: u64,
    pub table: Box<[u64]>,
}

/// Per-square magic entries for one slider kind (rook or bishop).
#[derive(Debug, Serialize, Deserialize)]
pub struct MagicTable {
    pub entries: Vec<MagicEntry>,
}

impl MagicTable {
    #[inline(always)]
    pub fn attacks(&self, square: usize, blockers: u64) -> u64 {
        let entry = &self.entries[square];
        let index = ((blockers & entry.mask).wrapping_mul(entry.magic) >> entry.shift) as usize;
        entry.table[index]
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MagicTables {
    pub rook: MagicTable,
    pub bishop: MagicTable,
}

impl MagicTables {
    /// Queen attacks as the union of the rook and bishop lookups.
    #[inline(always)]
    pub fn queen_attacks(&self, square: usize, blockers: u64) -> u64 {
        self.rook.attacks(square, blockers) | self.bishop.attacks(square, blockers)
    }

    /// Serialize to bytes, for embedding precomputed tables.
    pub fn to_bytes(&self) -> Result<Vec<u8>, String> {
        bincode::serialize(self).map_err(|e| e.to_string())
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, String> {
        bincode::deserialize(bytes).map_err(|e| e.to_string())
    }
}
