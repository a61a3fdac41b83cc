//! ShardedMap: fixed array of lazily created `hashbrown` maps.
//!
//! A key's hash code picks one shard; the shard is an ordinary hash map that
//! does the rest. Shards start out absent and are created on the first
//! `put` that lands in them. The shard array never changes length, so a key
//! always resolves to the same shard.

use crate::config::MapConfig;
use crate::error::{Error, Result};
use crate::index::{self, LayoutStats};
use core::borrow::Borrow;
use core::fmt;
use core::hash::{BuildHasher, Hash};
use hashbrown::HashMap;
use std::collections::hash_map::RandomState;

pub struct ShardedMap<K, V, S = RandomState> {
    hasher: S,
    config: MapConfig,
    shards: Box<[Option<HashMap<K, V, S>>]>,
}

impl<K, V> ShardedMap<K, V>
where
    K: Eq + Hash,
{
    pub fn new() -> Self {
        Self::with_hasher(RandomState::new())
    }

    pub fn try_with_capacity(capacity: usize) -> Result<Self> {
        Self::try_with_config(MapConfig::sharded_default().with_capacity(capacity))
    }

    pub fn try_with_load_factor(load_factor: f32) -> Result<Self> {
        Self::try_with_config(MapConfig::sharded_default().with_load_factor(load_factor))
    }

    pub fn try_with_config(config: MapConfig) -> Result<Self> {
        Self::try_with_config_and_hasher(config, RandomState::new())
    }
}

impl<K, V> Default for ShardedMap<K, V>
where
    K: Eq + Hash,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V, S> ShardedMap<K, V, S>
where
    K: Eq + Hash,
    S: BuildHasher + Clone,
{
    pub fn with_hasher(hasher: S) -> Self {
        let config = MapConfig::sharded_default();
        let shards = (0..config.capacity).map(|_| None).collect();
        Self::build(config, shards, hasher)
    }

    /// Validates `config`; `config.capacity` is the shard count. A shard
    /// array too large to allocate is `Error::InvalidCapacity`.
    pub fn try_with_config_and_hasher(config: MapConfig, hasher: S) -> Result<Self> {
        config.validate()?;
        let shards = config.alloc_slots(config.capacity, || None)?;
        Ok(Self::build(config, shards, hasher))
    }

    fn build(config: MapConfig, shards: Box<[Option<HashMap<K, V, S>>]>, hasher: S) -> Self {
        tracing::debug!(
            shards = config.capacity,
            shard_capacity = config.shard_capacity(),
            load_factor = config.load_factor,
            "created sharded map"
        );
        Self {
            hasher,
            config,
            shards,
        }
    }

    /// Shard that `q` belongs to. Independent of the map's contents.
    pub fn shard_index<Q>(&self, q: &Q) -> usize
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash,
    {
        let code = index::hash_code(self.hasher.hash_one(q));
        index::slot_index(u64::from(code), self.shards.len())
    }

    #[inline]
    fn shard_for<Q>(&self, q: &Q) -> Option<&HashMap<K, V, S>>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash,
    {
        self.shards[self.shard_index(q)].as_ref()
    }

    pub fn get<Q>(&self, q: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.shard_for(q)?.get(q)
    }

    pub fn get_mut<Q>(&mut self, q: &Q) -> Option<&mut V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        let i = self.shard_index(q);
        self.shards[i].as_mut()?.get_mut(q)
    }

    pub fn contains_key<Q>(&self, q: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.shard_for(q).is_some_and(|shard| shard.contains_key(q))
    }

    /// Inserts or updates `key`, creating its shard if this is the first key
    /// to land there.
    pub fn put(&mut self, key: K, value: V) -> Option<V> {
        let i = self.shard_index(&key);
        let capacity = self.config.shard_capacity();
        let hasher = &self.hasher;
        let shard = self.shards[i].get_or_insert_with(|| new_shard(i, capacity, hasher.clone()));
        shard.insert(key, value)
    }

    pub fn remove<Q>(&mut self, q: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.remove_entry(q).map(|(_, v)| v)
    }

    pub fn remove_entry<Q>(&mut self, q: &Q) -> Option<(K, V)>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        let i = self.shard_index(q);
        self.shards[i].as_mut()?.remove_entry(q)
    }
}

impl<K, V, S> ShardedMap<K, V, S> {
    pub fn shard_count(&self) -> usize {
        self.shards.len()
    }
    pub fn capacity(&self) -> usize {
        self.config.capacity
    }
    pub fn load_factor(&self) -> f32 {
        self.config.load_factor
    }
    pub fn hasher(&self) -> &S {
        &self.hasher
    }

    /// The shard at `index`, or `None` if nothing has landed there yet.
    pub fn shard(&self, index: usize) -> Result<Option<&HashMap<K, V, S>>> {
        self.shards
            .get(index)
            .map(Option::as_ref)
            .ok_or(Error::IndexOutOfRange {
                index,
                len: self.shards.len(),
            })
    }

    /// Number of shards created so far.
    pub fn live_shards(&self) -> usize {
        self.shards.iter().flatten().count()
    }

    /// Recounts every present shard.
    pub fn len(&self) -> usize {
        self.shards.iter().flatten().map(HashMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.shards.iter().flatten().all(HashMap::is_empty)
    }

    /// Discards every shard wholesale.
    pub fn clear(&mut self) {
        let discarded = self.len();
        self.shards.iter_mut().for_each(|shard| *shard = None);
        tracing::debug!(discarded, "cleared sharded map");
    }

    pub fn iter(&self) -> Iter<'_, K, V, S> {
        Iter {
            shards: self.shards.iter(),
            current: None,
            remaining: self.len(),
        }
    }

    pub fn entries(&self) -> Vec<(&K, &V)> {
        self.iter().collect()
    }

    pub fn keys(&self) -> Vec<&K> {
        self.iter().map(|(k, _)| k).collect()
    }

    pub fn values(&self) -> Vec<&V> {
        self.iter().map(|(_, v)| v).collect()
    }

    pub fn contains_value(&self, value: &V) -> bool
    where
        V: PartialEq,
    {
        self.iter().any(|(_, v)| v == value)
    }

    pub fn stats(&self) -> LayoutStats {
        let mut stats = LayoutStats {
            slots: self.shards.len(),
            ..LayoutStats::default()
        };
        for shard in self.shards.iter().flatten().filter(|s| !s.is_empty()) {
            stats.occupied_slots += 1;
            stats.largest_slot = stats.largest_slot.max(shard.len());
            stats.len += shard.len();
        }
        stats
    }
}

/// A shard pre-sized for `capacity` entries. When a table that large cannot
/// be allocated the shard starts empty and grows on demand.
pub(crate) fn new_shard<K, V, S>(index: usize, capacity: usize, hasher: S) -> HashMap<K, V, S>
where
    K: Eq + Hash,
    S: BuildHasher,
{
    let mut shard = HashMap::with_hasher(hasher);
    match shard.try_reserve(capacity) {
        Ok(()) => tracing::trace!(shard = index, capacity, "created shard"),
        Err(_) => {
            tracing::debug!(shard = index, capacity, "created shard without pre-sizing")
        }
    }
    shard
}

/// Iterator over the entries of a `ShardedMap`, shard by shard.
pub struct Iter<'a, K, V, S> {
    shards: core::slice::Iter<'a, Option<HashMap<K, V, S>>>,
    current: Option<hashbrown::hash_map::Iter<'a, K, V>>,
    remaining: usize,
}

impl<'a, K, V, S> Iterator for Iter<'a, K, V, S> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(entry) = self.current.as_mut().and_then(Iterator::next) {
                self.remaining -= 1;
                return Some(entry);
            }
            let shard = self.shards.next()?;
            self.current = shard.as_ref().map(HashMap::iter);
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<'a, K, V, S> ExactSizeIterator for Iter<'a, K, V, S> {}

impl<'a, K, V, S> IntoIterator for &'a ShardedMap<K, V, S> {
    type Item = (&'a K, &'a V);
    type IntoIter = Iter<'a, K, V, S>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<K, V, S> Extend<(K, V)> for ShardedMap<K, V, S>
where
    K: Eq + Hash,
    S: BuildHasher + Clone,
{
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (k, v) in iter {
            self.put(k, v);
        }
    }
}

impl<K, V, S> FromIterator<(K, V)> for ShardedMap<K, V, S>
where
    K: Eq + Hash,
    S: BuildHasher + Clone + Default,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut m = Self::with_hasher(S::default());
        m.extend(iter);
        m
    }
}

/// Maps are equal when they hold the same entries, regardless of layout.
impl<K, V, S> PartialEq for ShardedMap<K, V, S>
where
    K: Eq + Hash,
    V: PartialEq,
    S: BuildHasher + Clone,
{
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.iter().all(|(k, v)| other.get(k) == Some(v))
    }
}

impl<K, V, S> Eq for ShardedMap<K, V, S>
where
    K: Eq + Hash,
    V: Eq,
    S: BuildHasher + Clone,
{
}

impl<K, V, S> fmt::Debug for ShardedMap<K, V, S>
where
    K: fmt::Debug,
    V: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}
