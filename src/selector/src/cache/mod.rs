//! Selector configuration and compiled selector caches

pub mod compiled;
pub mod snapshot;

pub use compiled::CompiledSelectorCache;
pub use snapshot::{ConfigurationSnapshotCache, Snapshot};

/// Cache statistics
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Compiled selector lookups served from an initialized entry
    pub hits: usize,
    /// Compiled selector lookups that had to wait for or perform a compilation
    pub misses: usize,
    /// Compilations actually performed
    pub compilations: usize,
    /// Compiled entries dropped to stay within capacity
    pub evictions: usize,
    /// Compiled entries currently held
    pub entries: usize,
    /// Maximum compiled entries
    pub capacity: usize,
    /// Round-trips made to the configuration store by the snapshot cache
    pub store_reads: usize,
}

impl CacheStats {
    /// Calculate compiled cache hit rate
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}
