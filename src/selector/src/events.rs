//! Selector configuration change notifications

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::types::SelectorConfiguration;

/// Default capacity of a configuration event channel
pub const DEFAULT_CHANNEL_CAPACITY: usize = 256;

/// Kind of configuration change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    Created,
    Updated,
    Deleted,
}

/// Emitted by a configuration store after a successful mutation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectorConfigurationEvent {
    pub kind: EventKind,
    pub configuration: SelectorConfiguration,
}

impl SelectorConfigurationEvent {
    pub fn new(kind: EventKind, configuration: SelectorConfiguration) -> Self {
        Self {
            kind,
            configuration,
        }
    }

    pub fn created(configuration: SelectorConfiguration) -> Self {
        Self::new(EventKind::Created, configuration)
    }

    pub fn updated(configuration: SelectorConfiguration) -> Self {
        Self::new(EventKind::Updated, configuration)
    }

    pub fn deleted(configuration: SelectorConfiguration) -> Self {
        Self::new(EventKind::Deleted, configuration)
    }
}

/// Create a configuration event channel
pub fn channel() -> (
    broadcast::Sender<SelectorConfigurationEvent>,
    broadcast::Receiver<SelectorConfigurationEvent>,
) {
    broadcast::channel(DEFAULT_CHANNEL_CAPACITY)
}
