use rustc_hash::FxHashMap;
use std::hash::Hash;

/// Entry map with a second scratch map for sweeping
///
/// `sweep` drains the live map into the scratch map, keeping only entries
/// that pass the predicate, then swaps the two. The live map is never
/// mutated while it is being iterated.
#[derive(Debug)]
pub struct SwapBuffer<K, V> {
    live: FxHashMap<K, V>,
    scratch: FxHashMap<K, V>,
}

impl<K, V> Default for SwapBuffer<K, V> {
    fn default() -> Self {
        Self {
            live: FxHashMap::default(),
            scratch: FxHashMap::default(),
        }
    }
}

impl<K: Eq + Hash, V> SwapBuffer<K, V> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &K) -> Option<&V> {
        self.live.get(key)
    }

    pub fn contains_key(&self, key: &K) -> bool {
        self.live.contains_key(key)
    }

    pub fn insert(&mut self, key: K, value: V) -> Option<V> {
        self.live.insert(key, value)
    }

    pub fn remove(&mut self, key: &K) -> Option<V> {
        self.live.remove(key)
    }

    pub fn len(&self) -> usize {
        self.live.len()
    }

    pub fn is_empty(&self) -> bool {
        self.live.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&K, &V)> {
        self.live.iter()
    }

    /// Remove every entry
    pub fn take_all(&mut self) -> Vec<(K, V)> {
        self.live.drain().collect()
    }

    /// Keep entries for which `keep` returns true, returning the rest
    pub fn sweep<F>(&mut self, mut keep: F) -> Vec<(K, V)>
    where
        F: FnMut(&K, &V) -> bool,
    {
        debug_assert!(self.scratch.is_empty());

        let mut rejected = Vec::new();
        for (key, value) in self.live.drain() {
            if keep(&key, &value) {
                self.scratch.insert(key, value);
            } else {
                rejected.push((key, value));
            }
        }

        std::mem::swap(&mut self.live, &mut self.scratch);
        self.scratch.clear();
        rejected
    }
}
