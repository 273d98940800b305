use serde::Serialize;
use std::ops::AddAssign;

/// Counters kept by a cache over its lifetime
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheStats {
    /// Handle already held the requested entry
    pub fast_paths: u64,
    pub hits: u64,
    pub misses: u64,
    /// Cached entries found invalid on lookup
    pub stale_evictions: u64,
    pub constructed: u64,
    pub construction_failures: u64,
    /// Handles cleared while their entry stayed cached
    pub soft_releases: u64,
    pub disposed: u64,
    pub disposal_faults: u64,
    /// Entries removed by cleanup sweeps
    pub swept: u64,
    /// Entries dropped without disposal after a reload
    pub dropped_after_reload: u64,
}

impl AddAssign for CacheStats {
    fn add_assign(&mut self, other: Self) {
        self.fast_paths += other.fast_paths;
        self.hits += other.hits;
        self.misses += other.misses;
        self.stale_evictions += other.stale_evictions;
        self.constructed += other.constructed;
        self.construction_failures += other.construction_failures;
        self.soft_releases += other.soft_releases;
        self.disposed += other.disposed;
        self.disposal_faults += other.disposal_faults;
        self.swept += other.swept;
        self.dropped_after_reload += other.dropped_after_reload;
    }
}
