//! Selector configuration storage

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::{broadcast, RwLock};
use tracing::debug;

use crate::error::{Result, SelectorError};
use crate::events::{self, SelectorConfigurationEvent};
use crate::types::{EntityId, SelectorConfiguration};

/// Persistent store of selector configurations
///
/// Implementations are expected to publish a [`SelectorConfigurationEvent`]
/// for every successful create, update and delete.
#[async_trait]
pub trait SelectorConfigurationStore: Send + Sync {
    /// All configurations, in store order
    async fn browse(&self) -> Result<Vec<SelectorConfiguration>>;

    /// Get a configuration by ID
    async fn read(&self, id: &EntityId) -> Result<Option<SelectorConfiguration>>;

    async fn create(&self, configuration: SelectorConfiguration) -> Result<SelectorConfiguration>;

    async fn update(&self, configuration: SelectorConfiguration) -> Result<()>;

    async fn delete(&self, configuration: &SelectorConfiguration) -> Result<()>;
}

/// Insertion ordered in-memory store that broadcasts change events
pub struct InMemorySelectorConfigurationStore {
    configurations: RwLock<Vec<SelectorConfiguration>>,
    events: broadcast::Sender<SelectorConfigurationEvent>,
    browse_count: AtomicUsize,
}

impl InMemorySelectorConfigurationStore {
    pub fn new() -> Self {
        let (events, _) = events::channel();
        Self::with_events(events)
    }

    /// Publish change events on an existing channel
    pub fn with_events(events: broadcast::Sender<SelectorConfigurationEvent>) -> Self {
        Self {
            configurations: RwLock::new(Vec::new()),
            events,
            browse_count: AtomicUsize::new(0),
        }
    }

    /// New receiver for this store's change events
    pub fn subscribe(&self) -> broadcast::Receiver<SelectorConfigurationEvent> {
        self.events.subscribe()
    }

    /// Number of `browse` round-trips served
    pub fn browse_count(&self) -> usize {
        self.browse_count.load(Ordering::Relaxed)
    }

    fn publish(&self, event: SelectorConfigurationEvent) {
        // No receivers is fine; nobody is caching yet
        if self.events.send(event).is_err() {
            debug!("No subscribers for selector configuration event");
        }
    }
}

impl Default for InMemorySelectorConfigurationStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SelectorConfigurationStore for InMemorySelectorConfigurationStore {
    async fn browse(&self) -> Result<Vec<SelectorConfiguration>> {
        self.browse_count.fetch_add(1, Ordering::Relaxed);
        Ok(self.configurations.read().await.clone())
    }

    async fn read(&self, id: &EntityId) -> Result<Option<SelectorConfiguration>> {
        let configurations = self.configurations.read().await;
        Ok(configurations
            .iter()
            .find(|c| c.id.as_ref() == Some(id))
            .cloned())
    }

    async fn create(&self, mut configuration: SelectorConfiguration) -> Result<SelectorConfiguration> {
        let mut configurations = self.configurations.write().await;

        if configurations.iter().any(|c| c.name == configuration.name) {
            return Err(SelectorError::DuplicateName(configuration.name));
        }

        if configuration.id.is_none() {
            configuration.id = Some(EntityId::random());
        }
        configurations.push(configuration.clone());
        drop(configurations);

        self.publish(SelectorConfigurationEvent::created(configuration.clone()));
        Ok(configuration)
    }

    async fn update(&self, configuration: SelectorConfiguration) -> Result<()> {
        let id = configuration
            .id
            .clone()
            .ok_or_else(|| SelectorError::NotFound(configuration.name.clone()))?;

        let mut configurations = self.configurations.write().await;

        if configurations
            .iter()
            .any(|c| c.name == configuration.name && c.id.as_ref() != Some(&id))
        {
            return Err(SelectorError::DuplicateName(configuration.name));
        }

        let existing = configurations
            .iter_mut()
            .find(|c| c.id.as_ref() == Some(&id))
            .ok_or_else(|| SelectorError::NotFound(id.to_string()))?;
        *existing = configuration.clone();
        drop(configurations);

        self.publish(SelectorConfigurationEvent::updated(configuration));
        Ok(())
    }

    async fn delete(&self, configuration: &SelectorConfiguration) -> Result<()> {
        let id = configuration
            .id
            .as_ref()
            .ok_or_else(|| SelectorError::NotFound(configuration.name.clone()))?;

        let mut configurations = self.configurations.write().await;
        let position = configurations
            .iter()
            .position(|c| c.id.as_ref() == Some(id))
            .ok_or_else(|| SelectorError::NotFound(id.to_string()))?;
        let removed = configurations.remove(position);
        drop(configurations);

        self.publish(SelectorConfigurationEvent::deleted(removed));
        Ok(())
    }
}
