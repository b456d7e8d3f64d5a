//! Selector manager configuration

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::security::DEFAULT_SOURCE;

/// Environment variable overriding [`ManagerConfig::compiled_cache_capacity`]
pub const ENV_CACHE_CAPACITY: &str = "SELECTOR_CACHE_CAPACITY";

/// Environment variable overriding [`ManagerConfig::authorization_source`]
pub const ENV_AUTHZ_SOURCE: &str = "SELECTOR_AUTHZ_SOURCE";

/// Selector manager configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ManagerConfig {
    /// Maximum number of compiled selectors retained
    pub compiled_cache_capacity: usize,

    /// Source tag used to obtain the authorization manager
    pub authorization_source: String,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            compiled_cache_capacity: 10_000,
            authorization_source: DEFAULT_SOURCE.to_string(),
        }
    }
}

impl ManagerConfig {
    /// Defaults overlaid with `SELECTOR_*` environment variables
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Defaults overlaid with values from `lookup`
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(raw) = lookup(ENV_CACHE_CAPACITY) {
            match raw.trim().parse::<usize>() {
                Ok(capacity) if capacity > 0 => config.compiled_cache_capacity = capacity,
                _ => warn!("Ignoring invalid {}={:?}", ENV_CACHE_CAPACITY, raw),
            }
        }

        if let Some(source) = lookup(ENV_AUTHZ_SOURCE) {
            if !source.trim().is_empty() {
                config.authorization_source = source.trim().to_string();
            }
        }

        config
    }
}
