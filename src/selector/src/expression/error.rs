//! Error types for predicate compilation and execution

use thiserror::Error;

/// Predicate language errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExpressionError {
    #[error("expression compilation failed: {0}")]
    Compilation(String),

    #[error("expression evaluation failed: {0}")]
    Evaluation(String),

    #[error("configuration has no expression attribute")]
    MissingExpression,

    #[error("expression did not return boolean result")]
    NonBooleanResult,
}
