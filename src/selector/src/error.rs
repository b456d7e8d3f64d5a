//! Error types for the content selector engine

use thiserror::Error;

use crate::expression::ExpressionError;
use crate::manager::LifecycleState;
use crate::security::SecurityError;

/// Content selector engine errors
#[derive(Debug, Error)]
pub enum SelectorError {
    /// Configuration names a predicate language this engine cannot compile
    #[error("Invalid selector type encountered: {0}")]
    InvalidSelectorType(String),

    /// Selector could not be built or raised while evaluating
    #[error("Selector '{name}' evaluation in error: {source}")]
    Evaluation {
        /// Name of the selector configuration
        name: String,
        /// Underlying expression failure
        #[source]
        source: ExpressionError,
    },

    /// Operation invoked outside of the started state
    #[error("Selector manager is not started (state: {0:?})")]
    NotStarted(LifecycleState),

    /// Selector configuration not found
    #[error("Selector configuration not found: {0}")]
    NotFound(String),

    /// A selector configuration with this name already exists
    #[error("Selector configuration name already in use: {0}")]
    DuplicateName(String),

    /// Configuration store failure
    #[error("Store error: {0}")]
    Store(String),

    /// Security collaborator failure
    #[error("Security error: {0}")]
    Security(#[from] SecurityError),
}

impl SelectorError {
    /// Wrap an expression failure with the name of the selector it belongs to
    pub fn evaluation(name: impl Into<String>, source: ExpressionError) -> Self {
        Self::Evaluation {
            name: name.into(),
            source,
        }
    }
}

/// Result type for content selector operations
pub type Result<T> = std::result::Result<T, SelectorError>;
