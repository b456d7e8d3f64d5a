//! Repository content selector privileges

use std::fmt;
use tracing::warn;

use super::SecurityError;
use crate::types::Privilege;

/// Privilege type granting content selector access to repositories
pub const REPOSITORY_CONTENT_SELECTOR_TYPE: &str = "repository-content-selector";

/// Privilege property holding the encoded repository selector
pub const P_REPOSITORY: &str = "repository";

/// Privilege property holding the content selector name
pub const P_CONTENT_SELECTOR: &str = "contentSelector";

const ALL: &str = "*";
const ALL_OF_FORMAT_PREFIX: &str = "*-";

/// Parsed `(format, repository name)` pair of a privilege
///
/// String forms:
/// - `*` matches every repository of every format
/// - `*-<format>` matches every repository of one format
/// - anything else names a single repository
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RepositorySelector {
    name: String,
    format: String,
}

impl RepositorySelector {
    /// Every repository, every format
    pub fn all() -> Self {
        Self::from_name_and_format(ALL, ALL)
    }

    /// Build from explicit parts; `*` is the wildcard for either
    pub fn from_name_and_format(name: impl Into<String>, format: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            format: format.into(),
        }
    }

    /// Parse the string form stored on a privilege
    pub fn from_selector(selector: &str) -> Result<Self, SecurityError> {
        if selector.is_empty() {
            return Err(SecurityError::InvalidRepositorySelector(selector.to_string()));
        }

        if selector == ALL {
            return Ok(Self::all());
        }

        if let Some(format) = selector.strip_prefix(ALL_OF_FORMAT_PREFIX) {
            if format.is_empty() {
                return Err(SecurityError::InvalidRepositorySelector(selector.to_string()));
            }
            return Ok(Self::from_name_and_format(ALL, format));
        }

        Ok(Self::from_name_and_format(selector, ALL))
    }

    /// Render back to the stored string form
    pub fn to_selector(&self) -> String {
        match (self.is_all_repositories(), self.is_all_formats()) {
            (true, true) => ALL.to_string(),
            (true, false) => format!("{}{}", ALL_OF_FORMAT_PREFIX, self.format),
            (false, _) => self.name.clone(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn format(&self) -> &str {
        &self.format
    }

    pub fn is_all_repositories(&self) -> bool {
        self.name == ALL
    }

    pub fn is_all_formats(&self) -> bool {
        self.format == ALL
    }
}

impl fmt::Display for RepositorySelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_selector())
    }
}

/// Decides whether a privilege grants content selector access to a
/// requested set of repositories and formats
#[derive(Debug, Clone, Copy)]
pub struct PrivilegeMatcher<'a> {
    repository_names: &'a [String],
    formats: &'a [String],
}

impl<'a> PrivilegeMatcher<'a> {
    pub fn new(repository_names: &'a [String], formats: &'a [String]) -> Self {
        Self {
            repository_names,
            formats,
        }
    }

    /// True when `privilege` is a repository content selector privilege whose
    /// repository selector covers the requested scope
    ///
    /// An all-repositories privilege matches on format alone (its own format,
    /// or all formats). A single-repository privilege matches on name alone,
    /// whatever format it declares.
    pub fn matches(&self, privilege: &Privilege) -> bool {
        let Some(selector) = privilege.property(P_REPOSITORY) else {
            return false;
        };

        let repository_selector = match RepositorySelector::from_selector(selector) {
            Ok(parsed) => parsed,
            Err(e) => {
                warn!("Ignoring privilege id={}: {}", privilege.id, e);
                return false;
            }
        };

        self.matches_selector(&privilege.privilege_type, &repository_selector)
    }

    /// Matching rule on an already parsed repository selector
    pub fn matches_selector(&self, privilege_type: &str, selector: &RepositorySelector) -> bool {
        let is_repository_content_selector = privilege_type == REPOSITORY_CONTENT_SELECTOR_TYPE;
        let matches_format =
            self.formats.iter().any(|f| f == selector.format()) || selector.is_all_formats();
        let matches_repository_name = self.repository_names.iter().any(|n| n == selector.name());

        let is_matching_format =
            is_repository_content_selector && matches_format && selector.is_all_repositories();
        let is_matching_repository = is_repository_content_selector && matches_repository_name;

        is_matching_format || is_matching_repository
    }

    /// Content selector name of a matching privilege
    pub fn content_selector(&self, privilege: &Privilege) -> Option<String> {
        if !self.matches(privilege) {
            return None;
        }
        privilege.property(P_CONTENT_SELECTOR).map(str::to_string)
    }
}
