/// Key/handle pairs captured before a reload boundary
///
/// A handle of `None` stands for an entry whose object did not make it
/// across the boundary at all; such entries are discarded on restore.
#[derive(Debug, Clone)]
pub struct CacheSnapshot<K, V> {
    entries: Vec<(K, Option<V>)>,
}

impl<K, V> Default for CacheSnapshot<K, V> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

impl<K, V> CacheSnapshot<K, V> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, key: K, handle: Option<V>) {
        self.entries.push((key, handle));
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.entries.iter().map(|(key, _)| key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&K, Option<&V>)> {
        self.entries.iter().map(|(key, handle)| (key, handle.as_ref()))
    }

    pub fn into_entries(self) -> Vec<(K, Option<V>)> {
        self.entries
    }
}

impl<K, V> FromIterator<(K, Option<V>)> for CacheSnapshot<K, V> {
    fn from_iter<I: IntoIterator<Item = (K, Option<V>)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}
