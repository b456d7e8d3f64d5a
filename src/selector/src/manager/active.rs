//! Resolution of the content selectors active for the current caller

use std::collections::HashSet;
use tracing::{debug, warn};

use crate::security::{PrivilegeMatcher, RoleClosureResolver, SecuritySystem};
use crate::types::SelectorConfiguration;

/// Walks current user → role closure → privileges → content selector names
///
/// Every authorization lookup failure degrades to fewer (possibly zero)
/// names; nothing is ever granted on a failure.
pub struct ActiveSelectorResolver<'a> {
    security: &'a dyn SecuritySystem,
    authorization_source: &'a str,
}

impl<'a> ActiveSelectorResolver<'a> {
    pub fn new(security: &'a dyn SecuritySystem, authorization_source: &'a str) -> Self {
        Self {
            security,
            authorization_source,
        }
    }

    /// Names of content selectors granted to the current user for the
    /// requested repositories and formats
    pub async fn active_selector_names(
        &self,
        repository_names: &[String],
        formats: &[String],
    ) -> HashSet<String> {
        let authorization = match self
            .security
            .authorization_manager(self.authorization_source)
            .await
        {
            Ok(manager) => manager,
            Err(e) => {
                warn!("Unable to load active content selectors: {}", e);
                return HashSet::new();
            }
        };

        let user = match self.security.current_user().await {
            Ok(Some(user)) => user,
            Ok(None) => {
                debug!("No current user, no active content selectors");
                return HashSet::new();
            }
            Err(e) => {
                warn!("Unable to load active content selectors: {}", e);
                return HashSet::new();
            }
        };

        let authorization = authorization.as_ref();
        let roles = RoleClosureResolver::new(authorization)
            .resolve(&user.role_ids())
            .await;

        let mut seen = HashSet::new();
        let privilege_ids: Vec<&String> = roles
            .iter()
            .flat_map(|role| role.privileges.iter())
            .filter(|id| seen.insert(*id))
            .collect();

        let lookups = privilege_ids.into_iter().map(|id| async move {
            (id, authorization.get_privilege(id).await)
        });
        let privileges = futures::future::join_all(lookups).await;

        let matcher = PrivilegeMatcher::new(repository_names, formats);
        let names: HashSet<String> = privileges
            .into_iter()
            .filter_map(|(id, result)| match result {
                Ok(privilege) => Some(privilege),
                Err(e) => {
                    warn!("Unable to find privilege for id={}, continuing to check privileges: {}", id, e);
                    None
                }
            })
            .filter_map(|privilege| matcher.content_selector(&privilege))
            .collect();

        debug!(
            "User {} has {} active content selectors from {} roles",
            user.user_id,
            names.len(),
            roles.len()
        );
        names
    }

    /// Keep the configurations named in `names`, in snapshot order
    pub fn filter(
        snapshot: &[SelectorConfiguration],
        names: &HashSet<String>,
    ) -> Vec<SelectorConfiguration> {
        snapshot
            .iter()
            .filter(|config| names.contains(&config.name))
            .cloned()
            .collect()
    }
}
