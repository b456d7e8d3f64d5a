//! Predicate capability contracts and the CEL-backed language adapter
//!
//! A [`Selector`] is anything that can answer a boolean question about a
//! [`VariableSource`]. Concrete predicate languages plug in through
//! [`PredicateLanguage`], which turns expression source into a `Selector`.

pub mod cel;
pub mod error;

pub use cel::{CelLanguage, CelSelector};
pub use error::ExpressionError;

use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Named values supplied by the caller for a single evaluation
pub trait VariableSource: Send + Sync {
    /// Names of every variable this source can resolve
    fn variable_names(&self) -> Vec<String>;

    /// Look up a variable by name
    fn get(&self, name: &str) -> Option<Value>;
}

/// Compiled, stateless predicate
pub trait Selector: Send + Sync {
    fn evaluate(&self, variables: &dyn VariableSource) -> Result<bool, ExpressionError>;
}

/// Constructor for selectors of one predicate language
pub trait PredicateLanguage: Send + Sync {
    /// Parse `expression` into an executable selector
    fn compile(&self, expression: &str) -> Result<Arc<dyn Selector>, ExpressionError>;
}

/// Map backed variable source
#[derive(Debug, Clone, Default)]
pub struct MapVariableSource {
    variables: BTreeMap<String, Value>,
}

impl MapVariableSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a variable (builder style)
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(name, value);
        self
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.variables.insert(name.into(), value.into());
    }
}

impl VariableSource for MapVariableSource {
    fn variable_names(&self) -> Vec<String> {
        self.variables.keys().cloned().collect()
    }

    fn get(&self, name: &str) -> Option<Value> {
        self.variables.get(name).cloned()
    }
}
