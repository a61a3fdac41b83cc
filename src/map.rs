//! The key-value contract shared by every engine, and a delegating wrapper.
//!
//! `Map` is object safe so a harness can drive any implementation (ours or
//! the standard library's) through `&mut dyn Map<K, V>`.

use crate::bucket_grid_map::BucketGridMap;
use crate::config::MapConfig;
use crate::error::Result;
use crate::sharded_map::ShardedMap;
use core::hash::{BuildHasher, Hash};
use std::collections::hash_map::RandomState;
use std::collections::{BTreeMap, HashMap};

pub trait Map<K, V> {
    fn get(&self, key: &K) -> Option<&V>;

    /// Inserts or updates; returns the previous value for `key`.
    fn put(&mut self, key: K, value: V) -> Option<V>;

    fn remove(&mut self, key: &K) -> Option<V>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn clear(&mut self);

    fn contains_key(&self, key: &K) -> bool {
        self.get(key).is_some()
    }

    /// Materialized, unordered snapshot of every entry.
    fn entries(&self) -> Vec<(&K, &V)>;

    fn keys<'a>(&'a self) -> Vec<&'a K>
    where
        V: 'a,
    {
        self.entries().into_iter().map(|(k, _)| k).collect()
    }

    fn values<'a>(&'a self) -> Vec<&'a V>
    where
        K: 'a,
    {
        self.entries().into_iter().map(|(_, v)| v).collect()
    }
}

impl<K, V, S> Map<K, V> for BucketGridMap<K, V, S>
where
    K: Eq + Hash,
    S: BuildHasher,
{
    fn get(&self, key: &K) -> Option<&V> {
        BucketGridMap::get(self, key)
    }
    fn put(&mut self, key: K, value: V) -> Option<V> {
        BucketGridMap::put(self, key, value)
    }
    fn remove(&mut self, key: &K) -> Option<V> {
        BucketGridMap::remove(self, key)
    }
    fn len(&self) -> usize {
        BucketGridMap::len(self)
    }
    fn is_empty(&self) -> bool {
        BucketGridMap::is_empty(self)
    }
    fn clear(&mut self) {
        BucketGridMap::clear(self)
    }
    fn contains_key(&self, key: &K) -> bool {
        BucketGridMap::contains_key(self, key)
    }
    fn entries(&self) -> Vec<(&K, &V)> {
        BucketGridMap::entries(self)
    }
}

impl<K, V, S> Map<K, V> for ShardedMap<K, V, S>
where
    K: Eq + Hash,
    S: BuildHasher + Clone,
{
    fn get(&self, key: &K) -> Option<&V> {
        ShardedMap::get(self, key)
    }
    fn put(&mut self, key: K, value: V) -> Option<V> {
        ShardedMap::put(self, key, value)
    }
    fn remove(&mut self, key: &K) -> Option<V> {
        ShardedMap::remove(self, key)
    }
    fn len(&self) -> usize {
        ShardedMap::len(self)
    }
    fn is_empty(&self) -> bool {
        ShardedMap::is_empty(self)
    }
    fn clear(&mut self) {
        ShardedMap::clear(self)
    }
    fn contains_key(&self, key: &K) -> bool {
        ShardedMap::contains_key(self, key)
    }
    fn entries(&self) -> Vec<(&K, &V)> {
        ShardedMap::entries(self)
    }
}

impl<K, V, S> Map<K, V> for HashMap<K, V, S>
where
    K: Eq + Hash,
    S: BuildHasher,
{
    fn get(&self, key: &K) -> Option<&V> {
        HashMap::get(self, key)
    }
    fn put(&mut self, key: K, value: V) -> Option<V> {
        self.insert(key, value)
    }
    fn remove(&mut self, key: &K) -> Option<V> {
        HashMap::remove(self, key)
    }
    fn len(&self) -> usize {
        HashMap::len(self)
    }
    fn clear(&mut self) {
        HashMap::clear(self)
    }
    fn entries(&self) -> Vec<(&K, &V)> {
        self.iter().collect()
    }
}

impl<K, V, S> Map<K, V> for hashbrown::HashMap<K, V, S>
where
    K: Eq + Hash,
    S: BuildHasher,
{
    fn get(&self, key: &K) -> Option<&V> {
        hashbrown::HashMap::get(self, key)
    }
    fn put(&mut self, key: K, value: V) -> Option<V> {
        self.insert(key, value)
    }
    fn remove(&mut self, key: &K) -> Option<V> {
        hashbrown::HashMap::remove(self, key)
    }
    fn len(&self) -> usize {
        hashbrown::HashMap::len(self)
    }
    fn clear(&mut self) {
        hashbrown::HashMap::clear(self)
    }
    fn entries(&self) -> Vec<(&K, &V)> {
        self.iter().collect()
    }
}

impl<K, V> Map<K, V> for BTreeMap<K, V>
where
    K: Ord,
{
    fn get(&self, key: &K) -> Option<&V> {
        BTreeMap::get(self, key)
    }
    fn put(&mut self, key: K, value: V) -> Option<V> {
        self.insert(key, value)
    }
    fn remove(&mut self, key: &K) -> Option<V> {
        BTreeMap::remove(self, key)
    }
    fn len(&self) -> usize {
        BTreeMap::len(self)
    }
    fn clear(&mut self) {
        BTreeMap::clear(self)
    }
    fn entries(&self) -> Vec<(&K, &V)> {
        self.iter().collect()
    }
}

impl<K, V, M> Map<K, V> for Box<M>
where
    M: Map<K, V> + ?Sized,
{
    fn get(&self, key: &K) -> Option<&V> {
        (**self).get(key)
    }
    fn put(&mut self, key: K, value: V) -> Option<V> {
        (**self).put(key, value)
    }
    fn remove(&mut self, key: &K) -> Option<V> {
        (**self).remove(key)
    }
    fn len(&self) -> usize {
        (**self).len()
    }
    fn is_empty(&self) -> bool {
        (**self).is_empty()
    }
    fn clear(&mut self) {
        (**self).clear()
    }
    fn contains_key(&self, key: &K) -> bool {
        (**self).contains_key(key)
    }
    fn entries(&self) -> Vec<(&K, &V)> {
        (**self).entries()
    }
}

/// Forwards the `Map` contract to the map it holds.
///
/// The wrapped instance is fixed for the wrapper's lifetime and is only
/// reachable through `Map` operations or a shared reference; equality,
/// hashing and `Debug` are those of the wrapped map.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct MapWrapper<M> {
    map: M,
}

impl<M> MapWrapper<M> {
    pub fn wrap(map: M) -> Self {
        Self { map }
    }

    pub fn get_ref(&self) -> &M {
        &self.map
    }

    pub fn into_inner(self) -> M {
        self.map
    }
}

impl<M: core::fmt::Debug> core::fmt::Debug for MapWrapper<M> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        self.map.fmt(f)
    }
}

impl<K, V, M> Map<K, V> for MapWrapper<M>
where
    M: Map<K, V>,
{
    fn get(&self, key: &K) -> Option<&V> {
        self.map.get(key)
    }
    fn put(&mut self, key: K, value: V) -> Option<V> {
        self.map.put(key, value)
    }
    fn remove(&mut self, key: &K) -> Option<V> {
        self.map.remove(key)
    }
    fn len(&self) -> usize {
        self.map.len()
    }
    fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
    fn clear(&mut self) {
        self.map.clear()
    }
    fn contains_key(&self, key: &K) -> bool {
        self.map.contains_key(key)
    }
    fn entries(&self) -> Vec<(&K, &V)> {
        self.map.entries()
    }
}

/// A `ShardedMap` seen only through the `Map` contract.
pub type TwoDimensionalMap<K, V, S = RandomState> = MapWrapper<ShardedMap<K, V, S>>;

impl<K, V> MapWrapper<ShardedMap<K, V>>
where
    K: Eq + Hash,
{
    pub fn using_sharded_map() -> Self {
        Self::wrap(ShardedMap::new())
    }

    pub fn try_using_sharded_map_with_capacity(capacity: usize) -> Result<Self> {
        ShardedMap::try_with_capacity(capacity).map(Self::wrap)
    }

    pub fn try_using_sharded_map_with_load_factor(load_factor: f32) -> Result<Self> {
        ShardedMap::try_with_load_factor(load_factor).map(Self::wrap)
    }

    pub fn try_using_sharded_map_with_config(config: MapConfig) -> Result<Self> {
        ShardedMap::try_with_config(config).map(Self::wrap)
    }
}
