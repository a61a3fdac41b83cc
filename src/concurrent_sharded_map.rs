//! ConcurrentShardedMap: the sharded layout behind per-shard locks.
//!
//! Every shard slot is an `RwLock<Option<HashMap>>`. Lazy creation happens
//! under the slot's write lock, so two writers racing into an absent shard
//! create it exactly once. Operations on different shards never contend.
//! `len` and `entries` visit the shards one at a time and are snapshots, not
//! linearizable views of the whole map.

use crate::config::MapConfig;
use crate::error::Result;
use crate::index::{self, LayoutStats};
use crate::sharded_map::new_shard;
use core::borrow::Borrow;
use core::hash::{BuildHasher, Hash};
use hashbrown::HashMap;
use std::collections::hash_map::RandomState;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

type Shard<K, V, S> = RwLock<Option<HashMap<K, V, S>>>;

pub struct ConcurrentShardedMap<K, V, S = RandomState> {
    hasher: S,
    config: MapConfig,
    shards: Box<[Shard<K, V, S>]>,
}

impl<K, V> ConcurrentShardedMap<K, V>
where
    K: Eq + Hash,
{
    pub fn new() -> Self {
        Self::with_hasher(RandomState::new())
    }

    pub fn try_with_capacity(capacity: usize) -> Result<Self> {
        Self::try_with_config(MapConfig::sharded_default().with_capacity(capacity))
    }

    pub fn try_with_config(config: MapConfig) -> Result<Self> {
        Self::try_with_config_and_hasher(config, RandomState::new())
    }
}

impl<K, V> Default for ConcurrentShardedMap<K, V>
where
    K: Eq + Hash,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V, S> ConcurrentShardedMap<K, V, S>
where
    K: Eq + Hash,
    S: BuildHasher + Clone,
{
    pub fn with_hasher(hasher: S) -> Self {
        let config = MapConfig::sharded_default();
        let shards = (0..config.capacity).map(|_| RwLock::new(None)).collect();
        Self::build(config, shards, hasher)
    }

    /// A shard array too large to allocate is `Error::InvalidCapacity`.
    pub fn try_with_config_and_hasher(config: MapConfig, hasher: S) -> Result<Self> {
        config.validate()?;
        let shards = config.alloc_slots(config.capacity, || RwLock::new(None))?;
        Ok(Self::build(config, shards, hasher))
    }

    fn build(config: MapConfig, shards: Box<[Shard<K, V, S>]>, hasher: S) -> Self {
        tracing::debug!(
            shards = config.capacity,
            shard_capacity = config.shard_capacity(),
            "created concurrent sharded map"
        );
        Self {
            hasher,
            config,
            shards,
        }
    }

    pub fn shard_index<Q>(&self, q: &Q) -> usize
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash,
    {
        let code = index::hash_code(self.hasher.hash_one(q));
        index::slot_index(u64::from(code), self.shards.len())
    }

    /// Returns a clone of the value for `q`.
    pub fn get<Q>(&self, q: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
        V: Clone,
    {
        self.get_with(q, V::clone)
    }

    /// Runs `f` on the value for `q` while its shard is read-locked.
    pub fn get_with<Q, R>(&self, q: &Q, f: impl FnOnce(&V) -> R) -> Option<R>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        let shard = self.read(self.shard_index(q));
        shard.as_ref()?.get(q).map(f)
    }

    pub fn contains_key<Q>(&self, q: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.read(self.shard_index(q))
            .as_ref()
            .is_some_and(|shard| shard.contains_key(q))
    }

    /// Inserts or updates `key`. Creating an absent shard is a
    /// check-and-set under the shard's write lock.
    pub fn put(&self, key: K, value: V) -> Option<V> {
        let i = self.shard_index(&key);
        let mut slot = self.write(i);
        let shard = slot.get_or_insert_with(|| {
            new_shard(i, self.config.shard_capacity(), self.hasher.clone())
        });
        shard.insert(key, value)
    }

    pub fn remove<Q>(&self, q: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.write(self.shard_index(q)).as_mut()?.remove(q)
    }
}

impl<K, V, S> ConcurrentShardedMap<K, V, S> {
    // Poison is ignored: each critical section is one hashbrown call, and
    // hashbrown keeps its table consistent if a user Hash/Eq panics.
    fn read(&self, i: usize) -> RwLockReadGuard<'_, Option<HashMap<K, V, S>>> {
        self.shards[i].read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self, i: usize) -> RwLockWriteGuard<'_, Option<HashMap<K, V, S>>> {
        self.shards[i].write().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn shard_count(&self) -> usize {
        self.shards.len()
    }

    pub fn capacity(&self) -> usize {
        self.config.capacity
    }

    pub fn live_shards(&self) -> usize {
        (0..self.shards.len())
            .filter(|&i| self.read(i).is_some())
            .count()
    }

    pub fn len(&self) -> usize {
        (0..self.shards.len())
            .map(|i| self.read(i).as_ref().map_or(0, HashMap::len))
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        (0..self.shards.len()).all(|i| self.read(i).as_ref().map_or(true, HashMap::is_empty))
    }

    /// Discards every shard, one lock at a time.
    pub fn clear(&self) {
        for i in 0..self.shards.len() {
            *self.write(i) = None;
        }
        tracing::debug!("cleared concurrent sharded map");
    }

    /// Cloned snapshot of every entry.
    pub fn entries(&self) -> Vec<(K, V)>
    where
        K: Clone,
        V: Clone,
    {
        let mut out = Vec::new();
        for i in 0..self.shards.len() {
            if let Some(shard) = self.read(i).as_ref() {
                out.extend(shard.iter().map(|(k, v)| (k.clone(), v.clone())));
            }
        }
        out
    }

    pub fn stats(&self) -> LayoutStats {
        let mut stats = LayoutStats {
            slots: self.shards.len(),
            ..LayoutStats::default()
        };
        for i in 0..self.shards.len() {
            let n = self.read(i).as_ref().map_or(0, HashMap::len);
            if n > 0 {
                stats.occupied_slots += 1;
                stats.largest_slot = stats.largest_slot.max(n);
                stats.len += n;
            }
        }
        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    #[test]
    fn put_get_remove() {
        let m: ConcurrentShardedMap<String, u32> = ConcurrentShardedMap::new();
        assert!(m.is_empty());
        assert_eq!(m.put("a".to_string(), 1), None);
        assert_eq!(m.put("a".to_string(), 2), Some(1));
        assert_eq!(m.get("a"), Some(2));
        assert_eq!(m.get_with("a", |v| v * 10), Some(20));
        assert!(m.contains_key("a"));
        assert_eq!(m.len(), 1);
        assert_eq!(m.remove("a"), Some(2));
        assert_eq!(m.remove("a"), None);
        assert!(m.is_empty());
    }

    #[test]
    fn absent_shard_is_not_created_by_reads() {
        let m: ConcurrentShardedMap<u32, u32> = ConcurrentShardedMap::try_with_capacity(4).unwrap();
        assert_eq!(m.get(&1), None);
        assert_eq!(m.remove(&1), None);
        assert_eq!(m.live_shards(), 0);
        m.put(1, 1);
        assert_eq!(m.live_shards(), 1);
    }

    #[test]
    fn clear_discards_everything() {
        let m: ConcurrentShardedMap<u32, u32> = ConcurrentShardedMap::try_with_capacity(4).unwrap();
        for i in 0..10 {
            m.put(i, i);
        }
        assert_eq!(m.len(), 10);
        assert_eq!(m.entries().len(), 10);
        assert_eq!(m.stats().len, 10);
        m.clear();
        assert_eq!(m.live_shards(), 0);
        assert_eq!(m.get(&3), None);
        assert!(m.is_empty());
    }

    #[test]
    fn oversized_capacity_is_an_error() {
        assert_eq!(
            ConcurrentShardedMap::<u64, u64>::try_with_capacity(usize::MAX).err(),
            Some(Error::InvalidCapacity(usize::MAX))
        );
    }

    #[test]
    fn is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<ConcurrentShardedMap<String, u64>>();
    }
}
