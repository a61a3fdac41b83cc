//! Hash indexer: maps a key's hash to slots in the grid or shard array.
//!
//! Hashes are the `u64` produced by the map's `BuildHasher`. Both engines
//! first fold it to a 32-bit hash code, then reduce the code modulo the
//! dimension length. The arithmetic is unsigned, so an index is never
//! negative; the modulo keeps it below the length.

use crate::error::{Error, Result};
use core::fmt;

/// Folds a 64-bit hash into the 32-bit hash code used to pick slots.
///
/// Mixing the high half into the low half keeps slot selection from
/// depending only on the low bits, which a sharded map's backing tables
/// use again for their own bucket selection.
#[inline]
pub fn hash_code(hash: u64) -> u32 {
    ((hash >> 32) ^ hash) as u32
}

/// Reduces `hash` to an index in `[0, len)`.
///
/// `len` must be non-zero; every dimension is validated at construction.
#[inline]
pub fn slot_index(hash: u64, len: usize) -> usize {
    debug_assert!(len > 0, "slot dimension must be non-zero");
    (hash % len as u64) as usize
}

/// Dimensions of a bucket grid: `outer` rows of `inner` chain heads each.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GridShape {
    pub outer: usize,
    pub inner: usize,
}

impl GridShape {
    pub(crate) fn new(outer: usize, inner: usize) -> Self {
        debug_assert!(outer > 0 && inner > 0);
        Self { outer, inner }
    }

    /// Total number of chain heads.
    pub fn slots(&self) -> usize {
        self.outer * self.inner
    }

    /// Cell addressed by `hash`.
    ///
    /// `x` takes the hash code modulo the outer dimension and `y` takes the
    /// quotient modulo the inner one, so two hashes share a cell only when
    /// their codes agree modulo `outer * inner`.
    #[inline]
    pub fn index(&self, hash: u64) -> Index2d {
        let code = u64::from(hash_code(hash));
        let x = slot_index(code, self.outer);
        let y = slot_index(code / self.outer as u64, self.inner);
        Index2d { x, y }
    }

    /// Validates a caller-supplied cell against this shape.
    pub fn check(&self, x: usize, y: usize) -> Result<Index2d> {
        if x >= self.outer {
            return Err(Error::IndexOutOfRange {
                index: x,
                len: self.outer,
            });
        }
        if y >= self.inner {
            return Err(Error::IndexOutOfRange {
                index: y,
                len: self.inner,
            });
        }
        Ok(Index2d { x, y })
    }
}

/// A cell of the bucket grid. Computed per operation, never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Index2d {
    pub x: usize,
    pub y: usize,
}

impl fmt::Display for Index2d {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Occupancy snapshot of a map's slots, for comparing layouts under load.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LayoutStats {
    /// Addressable slots (grid cells or shards).
    pub slots: usize,
    /// Slots holding at least one entry.
    pub occupied_slots: usize,
    /// Entries in the fullest slot: longest chain or largest shard.
    pub largest_slot: usize,
    pub len: usize,
}

impl LayoutStats {
    /// Mean entries per occupied slot; 0.0 for an empty map.
    pub fn mean_occupancy(&self) -> f64 {
        if self.occupied_slots == 0 {
            0.0
        } else {
            self.len as f64 / self.occupied_slots as f64
        }
    }
}
