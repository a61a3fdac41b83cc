//! BucketGridMap: fixed two-dimensional grid of collision chains.
//!
//! The grid is `outer x inner` chain heads stored row-major in one boxed
//! slice; the nodes themselves live in a `SlotMap` arena (see `chain`).
//! A key's hash picks the cell, and the cell's chain is walked by equality.
//! The grid never grows: capacity and load factor are fixed at construction.

use crate::chain::{self, Arena, Chain, InvariantViolation, Links, NodeKey};
use crate::config::MapConfig;
use crate::error::Result;
use crate::index::{GridShape, Index2d, LayoutStats};
use core::borrow::Borrow;
use core::fmt;
use core::hash::{BuildHasher, Hash};
use core::sync::atomic::{AtomicUsize, Ordering};
use slotmap::SecondaryMap;
use std::collections::hash_map::RandomState;

pub struct BucketGridMap<K, V, S = RandomState> {
    hasher: S,
    config: MapConfig,
    shape: GridShape,
    heads: Box<[Option<NodeKey>]>,
    nodes: Arena<K, V>,
    // Maintained on insert/remove; never recounted.
    size: AtomicUsize,
}

impl<K, V> BucketGridMap<K, V>
where
    K: Eq + Hash,
{
    pub fn new() -> Self {
        Self::with_hasher(RandomState::new())
    }

    pub fn try_with_capacity(capacity: usize) -> Result<Self> {
        Self::try_with_config(MapConfig::grid_default().with_capacity(capacity))
    }

    pub fn try_with_load_factor(load_factor: f32) -> Result<Self> {
        Self::try_with_config(MapConfig::grid_default().with_load_factor(load_factor))
    }

    pub fn try_with_config(config: MapConfig) -> Result<Self> {
        Self::try_with_config_and_hasher(config, RandomState::new())
    }
}

impl<K, V> Default for BucketGridMap<K, V>
where
    K: Eq + Hash,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V, S> BucketGridMap<K, V, S>
where
    K: Eq + Hash,
    S: BuildHasher,
{
    pub fn with_hasher(hasher: S) -> Self {
        let config = MapConfig::grid_default();
        let shape = GridShape::new(config.capacity, config.inner_capacity());
        let heads = vec![None; shape.slots()].into_boxed_slice();
        Self::build(config, shape, heads, hasher)
    }

    /// Validates `config` and allocates the full grid up front. A grid too
    /// large to address or allocate is `Error::InvalidCapacity`.
    pub fn try_with_config_and_hasher(config: MapConfig, hasher: S) -> Result<Self> {
        config.validate()?;
        let shape = config.grid_shape()?;
        let heads = config.alloc_slots(shape.slots(), || None)?;
        Ok(Self::build(config, shape, heads, hasher))
    }

    fn build(
        config: MapConfig,
        shape: GridShape,
        heads: Box<[Option<NodeKey>]>,
        hasher: S,
    ) -> Self {
        tracing::debug!(
            outer = shape.outer,
            inner = shape.inner,
            load_factor = config.load_factor,
            "created bucket grid map"
        );
        Self {
            hasher,
            config,
            shape,
            heads,
            nodes: Arena::with_key(),
            size: AtomicUsize::new(0),
        }
    }

    #[inline]
    fn make_hash<Q>(&self, q: &Q) -> u64
    where
        Q: ?Sized + Hash,
    {
        self.hasher.hash_one(q)
    }

    #[inline]
    fn slot(&self, index: Index2d) -> usize {
        debug_assert!(index.x < self.shape.outer && index.y < self.shape.inner);
        index.x * self.shape.inner + index.y
    }

    /// Grid cell that `q` hashes to. Independent of the map's contents.
    pub fn index_of<Q>(&self, q: &Q) -> Index2d
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash,
    {
        self.shape.index(self.make_hash(q))
    }

    pub fn shape(&self) -> GridShape {
        self.shape
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

    pub fn len(&self) -> usize {
        self.size.load(Ordering::Relaxed)
    }
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get<Q>(&self, q: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        let head = self.heads[self.slot(self.index_of(q))];
        let k = chain::find(&self.nodes, head, q)?;
        self.nodes.get(k).map(|n| &n.value)
    }

    pub fn get_mut<Q>(&mut self, q: &Q) -> Option<&mut V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        let head = self.heads[self.slot(self.index_of(q))];
        let k = chain::find(&self.nodes, head, q)?;
        self.nodes.get_mut(k).map(|n| &mut n.value)
    }

    pub fn contains_key<Q>(&self, q: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        let head = self.heads[self.slot(self.index_of(q))];
        chain::find(&self.nodes, head, q).is_some()
    }

    /// Inserts or updates `key`.
    ///
    /// An existing entry keeps its node and position in the chain and gets
    /// the new value; the old value is returned. A new key is linked in as
    /// the head of its cell's chain.
    pub fn put(&mut self, key: K, value: V) -> Option<V> {
        let slot = self.slot(self.index_of(&key));
        if let Some(k) = chain::find(&self.nodes, self.heads[slot], &key) {
            return Some(core::mem::replace(&mut self.nodes[k].value, value));
        }
        chain::push_front(&mut self.nodes, &mut self.heads[slot], key, value);
        self.size.fetch_add(1, Ordering::Relaxed);
        None
    }

    pub fn remove<Q>(&mut self, q: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.remove_entry(q).map(|(_, v)| v)
    }

    /// Unlinks the entry for `q` and returns the owned key and value.
    pub fn remove_entry<Q>(&mut self, q: &Q) -> Option<(K, V)>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        let slot = self.slot(self.index_of(q));
        let k = chain::find(&self.nodes, self.heads[slot], q)?;
        let entry = chain::unlink(&mut self.nodes, &mut self.heads[slot], k)?;
        self.size.fetch_sub(1, Ordering::Relaxed);
        Some(entry)
    }

    /// Entries in the chain at cell `(x, y)`, newest first.
    pub fn chain(&self, x: usize, y: usize) -> Result<Chain<'_, K, V>> {
        let index = self.shape.check(x, y)?;
        Ok(Chain::new(&self.nodes, self.heads[self.slot(index)]))
    }

    pub fn stats(&self) -> LayoutStats {
        let mut stats = LayoutStats {
            slots: self.shape.slots(),
            len: self.len(),
            ..LayoutStats::default()
        };
        for &head in self.heads.iter().filter(|h| h.is_some()) {
            let n = Links::new(&self.nodes, head).count();
            stats.occupied_slots += 1;
            stats.largest_slot = stats.largest_slot.max(n);
        }
        stats
    }

    /// Walks every chain and verifies the structural invariants: links
    /// agree in both directions, every node is reachable from exactly one
    /// cell (the one its key hashes to), and the size counter matches.
    pub fn check_invariants(&self) -> core::result::Result<(), InvariantViolation> {
        let mut seen = SecondaryMap::with_capacity(self.nodes.len());
        let mut reachable = 0;
        for x in 0..self.shape.outer {
            for y in 0..self.shape.inner {
                let cell = Index2d { x, y };
                let head = self.heads[self.slot(cell)];
                reachable +=
                    chain::check_chain(&self.nodes, head, cell, &mut seen, |k| self.index_of(k))?;
            }
        }
        let counted = self.len();
        if counted != reachable {
            return Err(InvariantViolation::SizeMismatch { counted, reachable });
        }
        if self.nodes.len() != reachable {
            return Err(InvariantViolation::Orphaned {
                orphaned: self.nodes.len() - reachable,
            });
        }
        Ok(())
    }
}

impl<K, V, S> BucketGridMap<K, V, S> {
    /// Visits every cell of the grid and walks its chain.
    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter {
            nodes: &self.nodes,
            heads: self.heads.iter(),
            links: Links::new(&self.nodes, None),
            remaining: self.nodes.len(),
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

    /// Drops every entry and resets the size counter.
    pub fn clear(&mut self) {
        let discarded = self.nodes.len();
        self.heads.fill(None);
        self.nodes.clear();
        self.size.store(0, Ordering::Relaxed);
        tracing::debug!(discarded, "cleared bucket grid map");
    }
}

/// Iterator over the entries of a `BucketGridMap`: cells in row-major
/// order, each chain newest first.
pub struct Iter<'a, K, V> {
    nodes: &'a Arena<K, V>,
    heads: core::slice::Iter<'a, Option<NodeKey>>,
    links: Links<'a, K, V>,
    remaining: usize,
}

impl<'a, K, V> Iterator for Iter<'a, K, V> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some((_, node)) = self.links.next() {
                self.remaining -= 1;
                return Some((&node.key, &node.value));
            }
            let &head = self.heads.next()?;
            self.links = Links::new(self.nodes, head);
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<'a, K, V> ExactSizeIterator for Iter<'a, K, V> {}

impl<'a, K, V, S> IntoIterator for &'a BucketGridMap<K, V, S> {
    type Item = (&'a K, &'a V);
    type IntoIter = Iter<'a, K, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<K, V, S> Extend<(K, V)> for BucketGridMap<K, V, S>
where
    K: Eq + Hash,
    S: BuildHasher,
{
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (k, v) in iter {
            self.put(k, v);
        }
    }
}

impl<K, V, S> FromIterator<(K, V)> for BucketGridMap<K, V, S>
where
    K: Eq + Hash,
    S: BuildHasher + Default,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut m = Self::with_hasher(S::default());
        m.extend(iter);
        m
    }
}

/// Maps are equal when they hold the same entries, regardless of layout.
impl<K, V, S> PartialEq for BucketGridMap<K, V, S>
where
    K: Eq + Hash,
    V: PartialEq,
    S: BuildHasher,
{
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.iter().all(|(k, v)| other.get(k) == Some(v))
    }
}

impl<K, V, S> Eq for BucketGridMap<K, V, S>
where
    K: Eq + Hash,
    V: Eq,
    S: BuildHasher,
{
}

impl<K, V, S> fmt::Debug for BucketGridMap<K, V, S>
where
    K: fmt::Debug,
    V: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}
