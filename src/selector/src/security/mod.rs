//! Security collaborators consumed by the selector engine
//!
//! The engine never stores users, roles or privileges itself. It asks a
//! [`SecuritySystem`] for the current user and an [`AuthorizationManager`],
//! then walks roles and privileges through that manager.

pub mod memory;
pub mod privilege;
pub mod roles;

pub use memory::InMemorySecuritySystem;
pub use privilege::{PrivilegeMatcher, RepositorySelector};
pub use roles::RoleClosureResolver;

use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

use crate::types::{Privilege, Role, User};

/// Source tag of the default user and authorization realm
pub const DEFAULT_SOURCE: &str = "default";

/// Security collaborator errors
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SecurityError {
    #[error("No authorization manager for source: {0}")]
    NoSuchAuthorizationManager(String),

    #[error("User not found: {0}")]
    UserNotFound(String),

    #[error("Role not found: {0}")]
    RoleNotFound(String),

    #[error("Privilege not found: {0}")]
    PrivilegeNotFound(String),

    #[error("Invalid repository selector: {0}")]
    InvalidRepositorySelector(String),
}

/// Entry point to the security subsystem
#[async_trait]
pub trait SecuritySystem: Send + Sync {
    /// The authenticated caller, `None` when the request is anonymous
    async fn current_user(&self) -> Result<Option<User>, SecurityError>;

    /// Authorization manager for the given source
    async fn authorization_manager(
        &self,
        source: &str,
    ) -> Result<Arc<dyn AuthorizationManager>, SecurityError>;
}

/// Role and privilege lookups
#[async_trait]
pub trait AuthorizationManager: Send + Sync {
    async fn get_role(&self, role_id: &str) -> Result<Role, SecurityError>;

    async fn get_privilege(&self, privilege_id: &str) -> Result<Privilege, SecurityError>;
}
