//! # Content Selector Engine
//!
//! Gates visibility of repository content through named content selectors:
//! stored boolean expressions over per-request variables such as `path`,
//! `format` or coordinate fields.
//!
//! ## Features
//!
//! - **Configuration snapshot cache** in front of the selector store, with
//!   single-flight population and wholesale invalidation on change events
//! - **Compile-once selector cache** keyed by configuration value
//! - **Role closure** over nested roles, tolerant of missing roles and cycles
//! - **Active selector resolution** for the current user from
//!   repository content selector privileges
//!
//! ## Example
//!
//! ```rust
//! use content_selector::{
//!     InMemorySecuritySystem, InMemorySelectorConfigurationStore, MapVariableSource,
//!     SelectorConfiguration, SelectorManager,
//! };
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = Arc::new(InMemorySelectorConfigurationStore::new());
//!     let security = Arc::new(InMemorySecuritySystem::new());
//!
//!     let manager = Arc::new(SelectorManager::new(store.clone(), security));
//!     manager.subscribe(store.subscribe());
//!     manager.start();
//!
//!     let config = manager
//!         .create(SelectorConfiguration::csel("maven-only", "format == 'maven2'"))
//!         .await?;
//!
//!     let vars = MapVariableSource::new().with("format", "maven2");
//!     assert!(manager.evaluate(&config, &vars).await?);
//!
//!     Ok(())
//! }
//! ```

pub mod cache;
pub mod compiler;
pub mod error;
pub mod events;
pub mod expression;
pub mod manager;
pub mod security;
pub mod store;
pub mod types;

// Re-export commonly used types
pub use cache::{CacheStats, Snapshot};
pub use compiler::SelectorCompiler;
pub use error::{Result, SelectorError};
pub use events::{EventKind, SelectorConfigurationEvent};
pub use expression::{
    CelLanguage, ExpressionError, MapVariableSource, PredicateLanguage, Selector, VariableSource,
};
pub use manager::{LifecycleState, ManagerConfig, SelectorManager};
pub use security::{
    AuthorizationManager, InMemorySecuritySystem, PrivilegeMatcher, RepositorySelector,
    SecurityError, SecuritySystem,
};
pub use store::{InMemorySelectorConfigurationStore, SelectorConfigurationStore};
pub use types::{EntityId, Privilege, Role, RoleIdentifier, SelectorConfiguration, SelectorType, User};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
