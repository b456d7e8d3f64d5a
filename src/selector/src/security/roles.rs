//! Transitive closure over nested roles

use std::collections::HashSet;
use tracing::{debug, warn};

use super::AuthorizationManager;
use crate::types::Role;

/// Computes every role reachable from a set of seed roles
///
/// Traversal is depth first in the order identifiers are supplied. Each
/// role id is looked up at most once, which keeps the walk finite even if
/// the role graph contains a cycle. Roles that cannot be found are logged
/// and skipped; the remaining reachable roles are still returned.
pub struct RoleClosureResolver<'a> {
    authorization: &'a dyn AuthorizationManager,
}

impl<'a> RoleClosureResolver<'a> {
    pub fn new(authorization: &'a dyn AuthorizationManager) -> Self {
        Self { authorization }
    }

    /// Resolve the closure of `seed_role_ids`
    pub async fn resolve(&self, seed_role_ids: &[String]) -> Vec<Role> {
        let mut visited: HashSet<String> = HashSet::new();
        let mut roles = Vec::new();

        // Reverse so the first seed is visited first
        let mut pending: Vec<String> = seed_role_ids.iter().rev().cloned().collect();

        while let Some(role_id) = pending.pop() {
            if !visited.insert(role_id.clone()) {
                continue;
            }

            match self.authorization.get_role(&role_id).await {
                Ok(role) => {
                    pending.extend(
                        role.roles
                            .iter()
                            .rev()
                            .filter(|nested| !visited.contains(*nested))
                            .cloned(),
                    );
                    roles.push(role);
                }
                Err(e) => {
                    warn!("Unable to find role for role_id={}, continuing role search: {}", role_id, e);
                }
            }
        }

        debug!("Resolved {} roles from {} seed roles", roles.len(), seed_role_ids.len());
        roles
    }
}
