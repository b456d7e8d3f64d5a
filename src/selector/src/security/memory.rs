//! In-memory security system for embedding and tests

use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use super::{AuthorizationManager, SecurityError, SecuritySystem, DEFAULT_SOURCE};
use crate::types::{Privilege, Role, User};

/// Users, roles and privileges held in memory
///
/// Only the [`DEFAULT_SOURCE`] authorization source is registered initially.
/// The current user is whatever was last passed to
/// [`set_current_user`](Self::set_current_user).
pub struct InMemorySecuritySystem {
    realm: Arc<InMemoryRealm>,
    sources: RwLock<HashSet<String>>,
    users: RwLock<HashMap<String, User>>,
    current_user: RwLock<Option<String>>,
}

#[derive(Default)]
struct InMemoryRealm {
    roles: RwLock<HashMap<String, Role>>,
    privileges: RwLock<HashMap<String, Privilege>>,
    role_lookups: AtomicUsize,
    privilege_lookups: AtomicUsize,
}

impl InMemorySecuritySystem {
    pub fn new() -> Self {
        let mut sources = HashSet::new();
        sources.insert(DEFAULT_SOURCE.to_string());

        Self {
            realm: Arc::new(InMemoryRealm::default()),
            sources: RwLock::new(sources),
            users: RwLock::new(HashMap::new()),
            current_user: RwLock::new(None),
        }
    }

    pub fn add_user(&self, user: User) {
        self.users.write().insert(user.user_id.clone(), user);
    }

    pub fn add_role(&self, role: Role) {
        self.realm.roles.write().insert(role.role_id.clone(), role);
    }

    pub fn add_privilege(&self, privilege: Privilege) {
        self.realm.privileges.write().insert(privilege.id.clone(), privilege);
    }

    pub fn remove_role(&self, role_id: &str) {
        self.realm.roles.write().remove(role_id);
    }

    pub fn remove_privilege(&self, privilege_id: &str) {
        self.realm.privileges.write().remove(privilege_id);
    }

    /// Authenticate as `user_id`, or clear the caller with `None`
    pub fn set_current_user(&self, user_id: Option<&str>) {
        *self.current_user.write() = user_id.map(str::to_string);
    }

    pub fn register_source(&self, source: impl Into<String>) {
        self.sources.write().insert(source.into());
    }

    pub fn unregister_source(&self, source: &str) {
        self.sources.write().remove(source);
    }

    /// The authorization manager of the default source
    pub fn default_manager(&self) -> Arc<dyn AuthorizationManager> {
        self.realm.clone()
    }

    /// Number of role lookups served so far
    pub fn role_lookups(&self) -> usize {
        self.realm.role_lookups.load(Ordering::Relaxed)
    }

    /// Number of privilege lookups served so far
    pub fn privilege_lookups(&self) -> usize {
        self.realm.privilege_lookups.load(Ordering::Relaxed)
    }
}

impl Default for InMemorySecuritySystem {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SecuritySystem for InMemorySecuritySystem {
    async fn current_user(&self) -> Result<Option<User>, SecurityError> {
        let Some(user_id) = self.current_user.read().clone() else {
            return Ok(None);
        };

        self.users
            .read()
            .get(&user_id)
            .cloned()
            .map(Some)
            .ok_or(SecurityError::UserNotFound(user_id))
    }

    async fn authorization_manager(
        &self,
        source: &str,
    ) -> Result<Arc<dyn AuthorizationManager>, SecurityError> {
        if self.sources.read().contains(source) {
            Ok(self.realm.clone())
        } else {
            Err(SecurityError::NoSuchAuthorizationManager(source.to_string()))
        }
    }
}

#[async_trait]
impl AuthorizationManager for InMemoryRealm {
    async fn get_role(&self, role_id: &str) -> Result<Role, SecurityError> {
        self.role_lookups.fetch_add(1, Ordering::Relaxed);
        self.roles
            .read()
            .get(role_id)
            .cloned()
            .ok_or_else(|| SecurityError::RoleNotFound(role_id.to_string()))
    }

    async fn get_privilege(&self, privilege_id: &str) -> Result<Privilege, SecurityError> {
        self.privilege_lookups.fetch_add(1, Ordering::Relaxed);
        self.privileges
            .read()
            .get(privilege_id)
            .cloned()
            .ok_or_else(|| SecurityError::PrivilegeNotFound(privilege_id.to_string()))
    }
}
