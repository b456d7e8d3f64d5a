//! Core selector and security types

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use uuid::Uuid;

/// Attribute key holding the predicate source of a selector configuration
pub const EXPRESSION_ATTRIBUTE: &str = "expression";

/// Opaque entity identifier assigned by the configuration store
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(String);

impl EntityId {
    /// Wrap an existing identifier
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generate a fresh random identifier
    pub fn random() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Supported predicate languages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SelectorType {
    /// Full expression language
    Jexl,
    /// Restricted content selector expression language
    Csel,
}

impl SelectorType {
    pub const JEXL: &'static str = "jexl";
    pub const CSEL: &'static str = "csel";

    /// Resolve a stored type tag, `None` for unsupported languages
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            Self::JEXL => Some(Self::Jexl),
            Self::CSEL => Some(Self::Csel),
            _ => None,
        }
    }

    pub fn as_tag(&self) -> &'static str {
        match self {
            Self::Jexl => Self::JEXL,
            Self::Csel => Self::CSEL,
        }
    }
}

impl fmt::Display for SelectorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_tag())
    }
}

/// Stored selector configuration
///
/// Equality and hashing are value based so a configuration can key the
/// compiled selector cache directly. The type tag is kept as the raw stored
/// string; unsupported tags are only rejected when the selector is compiled.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SelectorConfiguration {
    /// Store identity, absent until the configuration has been created
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<EntityId>,

    /// Unique selector name
    pub name: String,

    /// Predicate language tag (e.g. "jexl", "csel")
    #[serde(rename = "type")]
    pub selector_type: String,

    #[serde(default)]
    pub description: String,

    /// Language specific attributes, notably "expression"
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
}

impl SelectorConfiguration {
    /// Create a configuration with the given type tag and expression
    pub fn new(
        name: impl Into<String>,
        selector_type: impl Into<String>,
        expression: impl Into<String>,
    ) -> Self {
        let mut attributes = BTreeMap::new();
        attributes.insert(EXPRESSION_ATTRIBUTE.to_string(), expression.into());

        Self {
            id: None,
            name: name.into(),
            selector_type: selector_type.into(),
            description: String::new(),
            attributes,
        }
    }

    /// Shorthand for a "jexl" configuration
    pub fn jexl(name: impl Into<String>, expression: impl Into<String>) -> Self {
        Self::new(name, SelectorType::JEXL, expression)
    }

    /// Shorthand for a "csel" configuration
    pub fn csel(name: impl Into<String>, expression: impl Into<String>) -> Self {
        Self::new(name, SelectorType::CSEL, expression)
    }

    pub fn with_id(mut self, id: EntityId) -> Self {
        self.id = Some(id);
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// The predicate source, if present
    pub fn expression(&self) -> Option<&str> {
        self.attributes.get(EXPRESSION_ATTRIBUTE).map(String::as_str)
    }

    /// The parsed predicate language, `None` when the tag is unsupported
    pub fn parsed_type(&self) -> Option<SelectorType> {
        SelectorType::from_tag(&self.selector_type)
    }
}

/// Reference to a role held by a user, qualified by its source
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RoleIdentifier {
    pub source: String,
    pub role_id: String,
}

impl RoleIdentifier {
    pub fn new(source: impl Into<String>, role_id: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            role_id: role_id.into(),
        }
    }
}

/// Authenticated user and the roles assigned to it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub user_id: String,
    pub source: String,
    #[serde(default)]
    pub roles: Vec<RoleIdentifier>,
}

impl User {
    pub fn new(user_id: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            source: source.into(),
            roles: Vec::new(),
        }
    }

    /// Assign a role from the user's own source
    pub fn with_role(mut self, role_id: impl Into<String>) -> Self {
        let source = self.source.clone();
        self.roles.push(RoleIdentifier::new(source, role_id));
        self
    }

    /// Identifiers of the assigned roles, in assignment order
    pub fn role_ids(&self) -> Vec<String> {
        self.roles.iter().map(|r| r.role_id.clone()).collect()
    }
}

/// Role with its granted privileges and nested roles
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    pub role_id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Privilege identifiers granted directly by this role
    #[serde(default)]
    pub privileges: Vec<String>,
    /// Identifiers of roles contained in this role
    #[serde(default)]
    pub roles: Vec<String>,
}

impl Role {
    pub fn new(role_id: impl Into<String>) -> Self {
        let role_id = role_id.into();
        Self {
            name: role_id.clone(),
            role_id,
            description: String::new(),
            privileges: Vec::new(),
            roles: Vec::new(),
        }
    }

    pub fn with_privilege(mut self, privilege_id: impl Into<String>) -> Self {
        self.privileges.push(privilege_id.into());
        self
    }

    pub fn with_nested_role(mut self, role_id: impl Into<String>) -> Self {
        self.roles.push(role_id.into());
        self
    }
}

/// Privilege with a type tag and descriptor specific properties
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Privilege {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub privilege_type: String,
    #[serde(default)]
    pub properties: HashMap<String, String>,
}

impl Privilege {
    pub fn new(id: impl Into<String>, privilege_type: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            privilege_type: privilege_type.into(),
            properties: HashMap::new(),
        }
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    pub fn property(&self, key: &str) -> Option<&str> {
        self.properties.get(key).map(String::as_str)
    }
}
