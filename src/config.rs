//! Construction-time parameters.
//!
//! Capacity and load factor are the only external configuration of either
//! engine. They are validated once, when the map is built, and never change
//! afterwards: neither engine resizes.

use crate::error::{Error, Result};
use crate::index::GridShape;

/// Default outer dimension of a [`BucketGridMap`](crate::BucketGridMap).
pub const DEFAULT_GRID_CAPACITY: usize = 2557;

/// Default shard count of a [`ShardedMap`](crate::ShardedMap).
pub const DEFAULT_SHARDED_CAPACITY: usize = 1067;

pub const DEFAULT_LOAD_FACTOR: f32 = 0.75;

/// Inner grid dimension as a percentage of the outer one.
pub(crate) const INNER_CAPACITY_PERCENT: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MapConfig {
    pub capacity: usize,
    pub load_factor: f32,
}

impl MapConfig {
    pub const fn new(capacity: usize, load_factor: f32) -> Self {
        Self {
            capacity,
            load_factor,
        }
    }

    pub const fn grid_default() -> Self {
        Self::new(DEFAULT_GRID_CAPACITY, DEFAULT_LOAD_FACTOR)
    }

    pub const fn sharded_default() -> Self {
        Self::new(DEFAULT_SHARDED_CAPACITY, DEFAULT_LOAD_FACTOR)
    }

    pub const fn with_capacity(self, capacity: usize) -> Self {
        Self { capacity, ..self }
    }

    pub const fn with_load_factor(self, load_factor: f32) -> Self {
        Self {
            load_factor,
            ..self
        }
    }

    /// Checks `capacity > 0` and `load_factor` in `(0.0, 1.0]`. NaN is rejected.
    pub fn validate(&self) -> Result<()> {
        if self.capacity == 0 {
            return Err(Error::InvalidCapacity(self.capacity));
        }
        if !(self.load_factor > 0.0 && self.load_factor <= 1.0) {
            return Err(Error::InvalidLoadFactor(self.load_factor));
        }
        Ok(())
    }

    /// Inner grid dimension: 10% of the capacity, at least 1.
    pub(crate) fn inner_capacity(&self) -> usize {
        let (hundreds, rest) = (self.capacity / 100, self.capacity % 100);
        (hundreds * INNER_CAPACITY_PERCENT + rest * INNER_CAPACITY_PERCENT / 100).max(1)
    }

    /// Grid shape for this capacity, or `InvalidCapacity` when the number of
    /// cells does not fit in a `usize`.
    pub(crate) fn grid_shape(&self) -> Result<GridShape> {
        let inner = self.inner_capacity();
        self.capacity
            .checked_mul(inner)
            .ok_or(Error::InvalidCapacity(self.capacity))?;
        Ok(GridShape::new(self.capacity, inner))
    }

    /// Allocates `len` slots filled by `fill`. An allocation that is too
    /// large or fails is reported as `InvalidCapacity`.
    pub(crate) fn alloc_slots<T>(&self, len: usize, fill: impl FnMut() -> T) -> Result<Box<[T]>> {
        let mut slots = Vec::new();
        slots
            .try_reserve_exact(len)
            .map_err(|_| Error::InvalidCapacity(self.capacity))?;
        slots.resize_with(len, fill);
        Ok(slots.into_boxed_slice())
    }

    /// Entries a lazily created shard holds before it has to grow: half the
    /// configured capacity scaled by the load factor, at least 1.
    pub(crate) fn shard_capacity(&self) -> usize {
        let half = (self.capacity / 2) as f64;
        ((half * f64::from(self.load_factor)).ceil() as usize).max(1)
    }
}
