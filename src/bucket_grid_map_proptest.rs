#![cfg(test)]

// Property tests for BucketGridMap kept inside the crate so the chain
// integrity check can run after every operation.

use crate::bucket_grid_map::BucketGridMap;
use crate::config::MapConfig;
use proptest::prelude::*;
use proptest::test_runner::TestCaseError;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use std::hash::{BuildHasher, Hasher};

// Key newtype with Borrow<str> to exercise borrowed lookup.
#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
struct Key(String);
impl fmt::Debug for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}
impl std::borrow::Borrow<str> for Key {
    fn borrow(&self) -> &str {
        &self.0
    }
}

// Pool-indexed operations so failing cases shrink toward earlier keys.
#[derive(Clone, Debug)]
enum OpI {
    Put(usize, i32),
    Remove(usize),
    Get(usize),
    Contains(String),
    Mutate(usize, i32),
    Iterate,
    Clear,
}

fn key_from(pool: &[String], i: usize) -> Key {
    Key(pool[i].clone())
}

fn arb_scenario() -> impl Strategy<Value = (Vec<String>, Vec<OpI>)> {
    proptest::collection::vec("[a-z]{0,5}", 1..=12).prop_flat_map(|pool| {
        let idxs: Vec<usize> = (0..pool.len()).collect();
        let idx = proptest::sample::select(idxs);
        let contains_pool = proptest::sample::select(pool.clone());
        let op = prop_oneof![
            4 => (idx.clone(), any::<i32>()).prop_map(|(i, v)| OpI::Put(i, v)),
            2 => idx.clone().prop_map(OpI::Remove),
            2 => idx.clone().prop_map(OpI::Get),
            1 => prop_oneof![contains_pool, "[a-z]{0,5}".prop_map(|s| s)].prop_map(OpI::Contains),
            1 => (idx.clone(), any::<i32>()).prop_map(|(i, d)| OpI::Mutate(i, d)),
            1 => Just(OpI::Iterate),
            1 => Just(OpI::Clear),
        ];
        proptest::collection::vec(op, 1..80).prop_map(move |ops| (pool.clone(), ops))
    })
}

fn run_scenario<S: BuildHasher>(
    mut sut: BucketGridMap<Key, i32, S>,
    pool: &[String],
    ops: Vec<OpI>,
) -> Result<(), TestCaseError> {
    let mut model: HashMap<Key, i32> = HashMap::new();
    for op in ops {
        match op {
            OpI::Put(i, v) => {
                let k = key_from(pool, i);
                prop_assert_eq!(sut.put(k.clone(), v), model.insert(k, v));
            }
            OpI::Remove(i) => {
                let k = key_from(pool, i);
                prop_assert_eq!(sut.remove_entry(&k), model.remove_entry(&k));
            }
            OpI::Get(i) => {
                let k = key_from(pool, i);
                prop_assert_eq!(sut.get(&k), model.get(&k));
                prop_assert_eq!(sut.contains_key(&k), model.contains_key(&k));
            }
            OpI::Contains(s) => {
                let has_model = model.keys().any(|k| k.0 == s);
                prop_assert_eq!(sut.contains_key(s.as_str()), has_model);
            }
            OpI::Mutate(i, d) => {
                let k = key_from(pool, i);
                if let Some(v) = sut.get_mut(&k) {
                    *v = v.saturating_add(d);
                }
                if let Some(v) = model.get_mut(&k) {
                    *v = v.saturating_add(d);
                }
            }
            OpI::Iterate => {
                let s: BTreeMap<_, _> = sut.iter().map(|(k, v)| (k.clone(), *v)).collect();
                let m: BTreeMap<_, _> = model.iter().map(|(k, v)| (k.clone(), *v)).collect();
                prop_assert_eq!(sut.iter().len(), model.len());
                prop_assert_eq!(s, m);
            }
            OpI::Clear => {
                sut.clear();
                model.clear();
            }
        }

        prop_assert_eq!(sut.len(), model.len());
        prop_assert_eq!(sut.is_empty(), model.is_empty());
        if let Err(violation) = sut.check_invariants() {
            return Err(TestCaseError::fail(violation.to_string()));
        }
    }
    Ok(())
}

// Constant hasher: every key lands in cell (0, 0), so the whole map is one chain.
#[derive(Clone, Default)]
struct ConstBuildHasher;
struct ConstHasher;
impl BuildHasher for ConstBuildHasher {
    type Hasher = ConstHasher;
    fn build_hasher(&self) -> Self::Hasher {
        ConstHasher
    }
}
impl Hasher for ConstHasher {
    fn write(&mut self, _bytes: &[u8]) {}
    fn finish(&self) -> u64 {
        0
    }
}

// Property: State-machine equivalence against std::collections::HashMap.
// Invariants exercised across random operation sequences:
// - `put` returns the previous value exactly when the model had one.
// - `remove_entry` hands back the owned pair the model held.
// - `iter` yields each live entry once; its exact length matches.
// - After every op the chains are consistent and the size counter agrees.
proptest! {
    #![proptest_config(ProptestConfig { cases: 64, .. ProptestConfig::default() })]
    #[test]
    fn prop_state_machine((pool, ops) in arb_scenario()) {
        run_scenario(BucketGridMap::new(), &pool, ops)?;
    }

    #[test]
    fn prop_state_machine_with_collisions((pool, ops) in arb_scenario()) {
        run_scenario(BucketGridMap::with_hasher(ConstBuildHasher), &pool, ops)?;
    }

    #[test]
    fn prop_state_machine_tiny_grid((pool, ops) in arb_scenario(), capacity in 1usize..12) {
        let config = MapConfig::grid_default().with_capacity(capacity);
        let sut = BucketGridMap::<Key, i32>::try_with_config(config)
            .map_err(|e| TestCaseError::fail(e.to_string()))?;
        run_scenario(sut, &pool, ops)?;
    }
}

// Property: every key occupies exactly the cell `index_of` names.
proptest! {
    #![proptest_config(ProptestConfig { cases: 64, .. ProptestConfig::default() })]
    #[test]
    fn prop_keys_live_in_their_cell(keys in proptest::collection::btree_set(any::<i64>(), 0..200)) {
        let config = MapConfig::grid_default().with_capacity(31);
        let mut m: BucketGridMap<i64, ()> = BucketGridMap::try_with_config(config)
            .map_err(|e| TestCaseError::fail(e.to_string()))?;
        for &k in &keys {
            m.put(k, ());
        }
        let shape = m.shape();
        let mut found = BTreeSet::new();
        for x in 0..shape.outer {
            for y in 0..shape.inner {
                for (k, _) in m.chain(x, y).map_err(|e| TestCaseError::fail(e.to_string()))? {
                    let cell = m.index_of(k);
                    prop_assert_eq!((cell.x, cell.y), (x, y));
                    prop_assert!(found.insert(*k));
                }
            }
        }
        prop_assert_eq!(found, keys);
    }
}
