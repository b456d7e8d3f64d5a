//! Selector manager
//!
//! Facade over the configuration store, the security system and both
//! selector caches.
//!
//! ```text
//! evaluate(config, vars)     → CompiledSelectorCache → Selector::evaluate
//! browse_active(repos, fmts) → SecuritySystem → role closure → privileges
//!                                → content selector names → snapshot filter
//! change event               → invalidate snapshot + compiled selectors
//! ```

pub mod active;
pub mod config;

pub use active::ActiveSelectorResolver;
pub use config::ManagerConfig;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::cache::{CacheStats, CompiledSelectorCache, ConfigurationSnapshotCache, Snapshot};
use crate::compiler::SelectorCompiler;
use crate::error::{Result, SelectorError};
use crate::events::SelectorConfigurationEvent;
use crate::expression::VariableSource;
use crate::security::SecuritySystem;
use crate::store::SelectorConfigurationStore;
use crate::types::{EntityId, SelectorConfiguration, SelectorType};

/// Manager lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LifecycleState {
    New,
    Started,
    Stopped,
}

/// Content selector manager
///
/// # Thread Safety
///
/// All operations take `&self` and may be called concurrently; share the
/// manager with `Arc`.
pub struct SelectorManager {
    store: Arc<dyn SelectorConfigurationStore>,
    security: Arc<dyn SecuritySystem>,
    snapshot: ConfigurationSnapshotCache,
    compiled: CompiledSelectorCache,
    config: ManagerConfig,
    state: RwLock<LifecycleState>,
}

impl SelectorManager {
    /// Create a manager with default configuration and predicate languages
    pub fn new(
        store: Arc<dyn SelectorConfigurationStore>,
        security: Arc<dyn SecuritySystem>,
    ) -> Self {
        Self::with_config(store, security, ManagerConfig::default())
    }

    pub fn with_config(
        store: Arc<dyn SelectorConfigurationStore>,
        security: Arc<dyn SecuritySystem>,
        config: ManagerConfig,
    ) -> Self {
        Self::with_compiler(store, security, config, SelectorCompiler::default())
    }

    /// Create a manager with caller supplied predicate languages
    pub fn with_compiler(
        store: Arc<dyn SelectorConfigurationStore>,
        security: Arc<dyn SecuritySystem>,
        config: ManagerConfig,
        compiler: SelectorCompiler,
    ) -> Self {
        Self {
            snapshot: ConfigurationSnapshotCache::new(store.clone()),
            compiled: CompiledSelectorCache::new(compiler, config.compiled_cache_capacity),
            store,
            security,
            config,
            state: RwLock::new(LifecycleState::New),
        }
    }

    pub fn start(&self) {
        let mut state = self.state.write();
        if *state != LifecycleState::Started {
            *state = LifecycleState::Started;
            info!(
                "SelectorManager started (cache_capacity={}, authorization_source={})",
                self.config.compiled_cache_capacity, self.config.authorization_source
            );
        }
    }

    /// Stop the manager and drop both caches
    pub fn stop(&self) {
        let mut state = self.state.write();
        if *state == LifecycleState::Started {
            *state = LifecycleState::Stopped;
            drop(state);
            self.invalidate();
            info!("SelectorManager stopped");
        }
    }

    pub fn state(&self) -> LifecycleState {
        *self.state.read()
    }

    pub fn config(&self) -> &ManagerConfig {
        &self.config
    }

    fn ensure_started(&self) -> Result<()> {
        match self.state() {
            LifecycleState::Started => Ok(()),
            state => Err(SelectorError::NotStarted(state)),
        }
    }

    /// Every stored configuration, served from the snapshot cache
    pub async fn browse(&self) -> Result<Snapshot> {
        self.ensure_started()?;
        self.snapshot.browse().await
    }

    /// Stored configurations of type "jexl"
    pub async fn browse_jexl(&self) -> Result<Vec<SelectorConfiguration>> {
        let snapshot = self.browse().await?;
        Ok(snapshot
            .iter()
            .filter(|config| config.selector_type == SelectorType::JEXL)
            .cloned()
            .collect())
    }

    pub async fn read(&self, id: &EntityId) -> Result<Option<SelectorConfiguration>> {
        self.ensure_started()?;
        self.store.read(id).await
    }

    /// Create a configuration; caches refresh once the store's change event arrives
    pub async fn create(&self, configuration: SelectorConfiguration) -> Result<SelectorConfiguration> {
        self.ensure_started()?;
        self.store.create(configuration).await
    }

    pub async fn update(&self, configuration: SelectorConfiguration) -> Result<()> {
        self.ensure_started()?;
        self.store.update(configuration).await
    }

    pub async fn delete(&self, configuration: &SelectorConfiguration) -> Result<()> {
        self.ensure_started()?;
        self.store.delete(configuration).await
    }

    /// Evaluate a selector configuration against caller supplied variables
    ///
    /// # Errors
    ///
    /// - [`SelectorError::InvalidSelectorType`] for an unsupported type tag
    /// - [`SelectorError::Evaluation`] when the selector cannot be built or
    ///   fails while executing
    pub async fn evaluate(
        &self,
        configuration: &SelectorConfiguration,
        variables: &dyn VariableSource,
    ) -> Result<bool> {
        self.ensure_started()?;

        let selector = self.compiled.get(configuration).await?;

        selector
            .evaluate(variables)
            .map_err(|e| SelectorError::evaluation(&configuration.name, e))
    }

    /// Configurations whose content selector is granted to the current user
    /// for the requested repositories and formats, in snapshot order
    ///
    /// Authorization lookup failures never surface here; they narrow the
    /// result instead, down to an empty list.
    pub async fn browse_active(
        &self,
        repository_names: &[String],
        formats: &[String],
    ) -> Result<Vec<SelectorConfiguration>> {
        self.ensure_started()?;

        let resolver =
            ActiveSelectorResolver::new(self.security.as_ref(), &self.config.authorization_source);
        let names = resolver
            .active_selector_names(repository_names, formats)
            .await;

        if names.is_empty() {
            return Ok(Vec::new());
        }

        let snapshot = self.snapshot.browse().await?;
        Ok(ActiveSelectorResolver::filter(&snapshot, &names))
    }

    /// Handle a configuration change notification
    pub fn on_configuration_event(&self, event: &SelectorConfigurationEvent) {
        debug!(
            "Selector configuration {:?}: {}",
            event.kind, event.configuration.name
        );
        self.invalidate();
    }

    /// Drop the configuration snapshot and every compiled selector
    pub fn invalidate(&self) {
        self.snapshot.invalidate();
        self.compiled.invalidate_all();
    }

    /// Reclaim memory held by the configuration snapshot
    pub fn release_snapshot(&self) {
        self.snapshot.release();
    }

    /// Consume change events from `events` until the channel closes or the
    /// manager is dropped
    pub fn subscribe(
        self: &Arc<Self>,
        mut events: broadcast::Receiver<SelectorConfigurationEvent>,
    ) -> JoinHandle<()> {
        let weak = Arc::downgrade(self);

        tokio::spawn(async move {
            loop {
                let received = events.recv().await;
                let Some(manager) = weak.upgrade() else {
                    break;
                };

                match received {
                    Ok(event) => manager.on_configuration_event(&event),
                    Err(RecvError::Lagged(skipped)) => {
                        warn!("Missed {} selector configuration events, invalidating caches", skipped);
                        manager.invalidate();
                    }
                    Err(RecvError::Closed) => break,
                }
            }
            debug!("Selector configuration event subscription ended");
        })
    }

    /// Compiled selector and snapshot cache statistics
    pub fn cache_stats(&self) -> CacheStats {
        CacheStats {
            store_reads: self.snapshot.store_reads(),
            ..self.compiled.stats()
        }
    }

    /// Whether a compiled selector is currently cached for `configuration`
    pub fn is_compiled(&self, configuration: &SelectorConfiguration) -> bool {
        self.compiled.contains(configuration)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expression::MapVariableSource;
    use crate::security::InMemorySecuritySystem;
    use crate::store::InMemorySelectorConfigurationStore;

    fn manager() -> SelectorManager {
        SelectorManager::new(
            Arc::new(InMemorySelectorConfigurationStore::new()),
            Arc::new(InMemorySecuritySystem::new()),
        )
    }

    #[tokio::test]
    async fn test_operations_require_start() {
        let manager = manager();
        assert_eq!(manager.state(), LifecycleState::New);

        let result = manager.browse().await;
        assert!(matches!(result, Err(SelectorError::NotStarted(LifecycleState::New))));

        let config = SelectorConfiguration::csel("a", "true");
        let result = manager.evaluate(&config, &MapVariableSource::new()).await;
        assert!(matches!(result, Err(SelectorError::NotStarted(_))));

        manager.start();
        assert!(manager.browse().await.is_ok());

        manager.stop();
        assert_eq!(manager.state(), LifecycleState::Stopped);
        assert!(matches!(
            manager.browse_active(&[], &[]).await,
            Err(SelectorError::NotStarted(LifecycleState::Stopped))
        ));
    }

    #[tokio::test]
    async fn test_stop_clears_caches() {
        let manager = manager();
        manager.start();

        let config = SelectorConfiguration::csel("a", "true");
        assert!(manager.evaluate(&config, &MapVariableSource::new()).await.unwrap());
        assert!(manager.is_compiled(&config));

        manager.stop();
        assert!(!manager.is_compiled(&config));
    }

    #[tokio::test]
    async fn test_execution_error_is_wrapped_with_name() {
        let manager = manager();
        manager.start();

        let config = SelectorConfiguration::csel("needs-format", "format == 'maven2'");
        match manager.evaluate(&config, &MapVariableSource::new()).await {
            Err(SelectorError::Evaluation { name, .. }) => assert_eq!(name, "needs-format"),
            other => panic!("Expected Evaluation error, got {:?}", other),
        }
    }
}
