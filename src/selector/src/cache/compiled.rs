//! Compile-once cache of executable selectors

use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::debug;

use super::CacheStats;
use crate::compiler::SelectorCompiler;
use crate::error::Result;
use crate::expression::Selector;
use crate::types::SelectorConfiguration;

/// Per-configuration slot; concurrent callers wait on the same cell
type Slot = Arc<OnceCell<Arc<dyn Selector>>>;

/// Loading cache from configuration value to compiled selector
///
/// Each distinct configuration value is compiled at most once while its
/// entry is retained. Callers asking for the same cold key wait on the
/// single in-flight compilation; other keys proceed independently. A failed
/// compilation leaves no entry behind. Entries beyond `capacity` are
/// dropped in batches and simply recompiled on their next use.
///
/// Eviction and invalidation may drop a slot whose compilation is still in
/// flight; a caller arriving after that compiles again. The capacity check
/// is not atomic with insertion, so concurrent misses can briefly push the
/// entry count past `capacity`.
pub struct CompiledSelectorCache {
    compiler: SelectorCompiler,
    entries: DashMap<SelectorConfiguration, Slot>,
    capacity: usize,
    stats: DashMap<&'static str, usize>,
}

impl CompiledSelectorCache {
    pub fn new(compiler: SelectorCompiler, capacity: usize) -> Self {
        Self {
            compiler,
            entries: DashMap::new(),
            capacity: capacity.max(1),
            stats: DashMap::new(),
        }
    }

    /// Fetch the compiled selector for `config`, compiling it on first use
    pub async fn get(&self, config: &SelectorConfiguration) -> Result<Arc<dyn Selector>> {
        let slot = self.slot_for(config);

        if let Some(selector) = slot.get() {
            self.increment_stat("hits");
            return Ok(selector.clone());
        }
        self.increment_stat("misses");

        let compiled = slot
            .get_or_try_init(|| async {
                self.increment_stat("compilations");
                self.compiler.compile(config)
            })
            .await;

        match compiled {
            Ok(selector) => Ok(selector.clone()),
            Err(e) => {
                self.entries.remove_if(config, |_, existing| {
                    Arc::ptr_eq(existing, &slot) && existing.get().is_none()
                });
                Err(e)
            }
        }
    }

    /// Drop every compiled selector
    pub fn invalidate_all(&self) {
        self.entries.clear();
        debug!("Compiled selector cache cleared");
    }

    /// Whether a compiled selector is currently held for `config`
    pub fn contains(&self, config: &SelectorConfiguration) -> bool {
        self.entries
            .get(config)
            .map(|slot| slot.initialized())
            .unwrap_or(false)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.get_stat("hits"),
            misses: self.get_stat("misses"),
            compilations: self.get_stat("compilations"),
            evictions: self.get_stat("evictions"),
            entries: self.entries.len(),
            capacity: self.capacity,
            store_reads: 0,
        }
    }

    fn slot_for(&self, config: &SelectorConfiguration) -> Slot {
        if let Some(slot) = self.entries.get(config) {
            return slot.clone();
        }

        if self.entries.len() >= self.capacity {
            self.evict();
        }

        self.entries
            .entry(config.clone())
            .or_insert_with(|| Arc::new(OnceCell::new()))
            .clone()
    }

    /// Remove roughly a tenth of the entries
    fn evict(&self) {
        let to_remove = (self.capacity / 10).max(1);
        let mut removed = 0;

        self.entries.retain(|_, _| {
            if removed < to_remove {
                removed += 1;
                false
            } else {
                true
            }
        });

        for _ in 0..removed {
            self.increment_stat("evictions");
        }
        debug!("Evicted {} compiled selectors", removed);
    }

    fn increment_stat(&self, key: &'static str) {
        self.stats
            .entry(key)
            .and_modify(|count| *count += 1)
            .or_insert(1);
    }

    fn get_stat(&self, key: &'static str) -> usize {
        self.stats.get(key).map(|v| *v).unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SelectorError;
    use crate::expression::{ExpressionError, MapVariableSource, PredicateLanguage, VariableSource};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    struct Always;

    impl Selector for Always {
        fn evaluate(&self, _variables: &dyn VariableSource) -> std::result::Result<bool, ExpressionError> {
            Ok(true)
        }
    }

    /// Slow language that counts compilations
    #[derive(Default)]
    struct CountingLanguage {
        compiled: AtomicUsize,
    }

    impl PredicateLanguage for CountingLanguage {
        fn compile(&self, _expression: &str) -> std::result::Result<Arc<dyn Selector>, ExpressionError> {
            self.compiled.fetch_add(1, Ordering::SeqCst);
            std::thread::sleep(Duration::from_millis(20));
            Ok(Arc::new(Always))
        }
    }

    fn counting_cache(capacity: usize) -> (Arc<CountingLanguage>, CompiledSelectorCache) {
        let language = Arc::new(CountingLanguage::default());
        let compiler = SelectorCompiler::new(language.clone(), language.clone());
        (language, CompiledSelectorCache::new(compiler, capacity))
    }

    #[tokio::test]
    async fn test_compiles_once_per_value() {
        let (language, cache) = counting_cache(100);
        let config = SelectorConfiguration::csel("a", "true");

        for _ in 0..5 {
            let selector = cache.get(&config).await.unwrap();
            assert!(selector.evaluate(&MapVariableSource::new()).unwrap());
        }

        assert_eq!(language.compiled.load(Ordering::SeqCst), 1);
        let stats = cache.stats();
        assert_eq!(stats.compilations, 1);
        assert_eq!(stats.hits, 4);
        assert_eq!(stats.misses, 1);
    }

    #[tokio::test]
    async fn test_changed_value_is_recompiled() {
        let (language, cache) = counting_cache(100);

        cache.get(&SelectorConfiguration::csel("a", "true")).await.unwrap();
        cache.get(&SelectorConfiguration::csel("a", "false")).await.unwrap();

        assert_eq!(language.compiled.load(Ordering::SeqCst), 2);
        assert_eq!(cache.len(), 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 8)]
    async fn test_concurrent_callers_share_compilation() {
        let (language, cache) = counting_cache(100);
        let cache = Arc::new(cache);
        let config = SelectorConfiguration::jexl("shared", "true");

        let mut handles = Vec::new();
        for _ in 0..16 {
            let cache = cache.clone();
            let config = config.clone();
            handles.push(tokio::spawn(async move { cache.get(&config).await.is_ok() }));
        }

        for handle in handles {
            assert!(handle.await.unwrap());
        }
        assert_eq!(language.compiled.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_invalid_type_leaves_no_entry() {
        let (_, cache) = counting_cache(100);
        let config = SelectorConfiguration::new("bad", "unsupported", "true");

        let result = cache.get(&config).await;
        assert!(matches!(result, Err(SelectorError::InvalidSelectorType(_))));
        assert!(cache.is_empty());
        assert!(!cache.contains(&config));

        // Retrying fails the same way rather than hitting a poisoned entry
        assert!(matches!(
            cache.get(&config).await,
            Err(SelectorError::InvalidSelectorType(_))
        ));
    }

    #[tokio::test]
    async fn test_invalidate_all() {
        let (language, cache) = counting_cache(100);
        let config = SelectorConfiguration::csel("a", "true");

        cache.get(&config).await.unwrap();
        cache.invalidate_all();
        cache.invalidate_all();
        assert!(cache.is_empty());

        cache.get(&config).await.unwrap();
        assert_eq!(language.compiled.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_capacity_eviction() {
        let (_, cache) = counting_cache(10);

        for i in 0..25 {
            let config = SelectorConfiguration::csel(format!("s{}", i), "true");
            cache.get(&config).await.unwrap();
        }

        assert!(cache.len() <= 10);
        assert!(cache.stats().evictions > 0);
    }
}
