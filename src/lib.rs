//! gridmap: fixed-capacity hash maps that trade bucket layouts against a
//! conventional hash map.
//!
//! Internal Design:
//!
//! Summary
//! - Goal: two from-scratch associative arrays with the same key-value
//!   contract, so their layouts can be compared under load.
//! - Engines:
//!   - BucketGridMap<K, V, S>: a fixed `outer x inner` grid of collision
//!     chains. A key's hash code selects the cell; the cell's chain is a
//!     doubly-linked list threaded through a `SlotMap` arena.
//!   - ShardedMap<K, V, S>: a fixed array of lazily created `hashbrown`
//!     maps. A key's hash code selects the shard; the shard does the rest.
//!   - ConcurrentShardedMap<K, V, S>: the sharded layout with one `RwLock`
//!     per shard, usable from many threads through `&self`.
//! - Shared pieces: `index` (hash code -> slot), `chain` (arena-backed
//!   chains and their integrity check), `map` (the `Map` trait and
//!   `MapWrapper`), `config` (capacity and load factor).
//!
//! Constraints
//! - Fixed capacity: neither engine resizes or rehashes. The load factor is
//!   validated and kept, and only sizes the shards a ShardedMap creates.
//! - Indices are unsigned: a 64-bit hash is folded to a 32-bit hash code
//!   and reduced modulo the dimension, so no slot index is ever negative.
//! - Chain nodes are owned by the arena; a grid cell stores only the key of
//!   its chain head. `previous` links are back-references used for O(1)
//!   unlinking, never for ownership. No `unsafe` in the crate.
//! - BucketGridMap keeps its size in an `AtomicUsize` so `len` can be read
//!   through a shared reference while other threads hold one too.
//!   Mutation takes `&mut self`, so chain splicing cannot race.
//! - ShardedMap recounts its shards for `len`; it has no counter of its own.
//!
//! Semantics worth knowing
//! - `is_empty()` is `len() == 0` and `clear()` resets the size to zero on
//!   every map.
//! - Iteration is unordered across slots. Within one grid cell, entries come
//!   newest first because new keys are pushed at the chain head; updating an
//!   existing key keeps its position.
//! - `check_invariants()` on BucketGridMap walks every chain and reports the
//!   first broken link, shared node, misplaced node or size mismatch.
//!
//! Notes and non-goals
//! - No persistence, no transactions, no growth.
//! - BucketGridMap and ShardedMap are `Send + Sync` when their parts are;
//!   concurrent mutation needs external locking or ConcurrentShardedMap.

pub mod bucket_grid_map;
pub mod chain;
pub mod concurrent_sharded_map;
pub mod config;
pub mod error;
pub mod index;
pub mod map;
pub mod sharded_map;

#[cfg(test)]
mod bucket_grid_map_proptest;

// Public surface
pub use bucket_grid_map::BucketGridMap;
pub use chain::InvariantViolation;
pub use concurrent_sharded_map::ConcurrentShardedMap;
pub use config::MapConfig;
pub use error::{Error, Result};
pub use index::{GridShape, Index2d, LayoutStats};
pub use map::{Map, MapWrapper, TwoDimensionalMap};
pub use sharded_map::ShardedMap;
