//! Builds executable selectors from stored configurations

use std::sync::Arc;
use tracing::debug;

use crate::error::{Result, SelectorError};
use crate::expression::{CelLanguage, ExpressionError, PredicateLanguage, Selector};
use crate::types::{SelectorConfiguration, SelectorType};

/// Dispatches a configuration to the predicate language named by its type tag
#[derive(Clone)]
pub struct SelectorCompiler {
    jexl: Arc<dyn PredicateLanguage>,
    csel: Arc<dyn PredicateLanguage>,
}

impl SelectorCompiler {
    /// Create a compiler with one backend per supported language
    pub fn new(jexl: Arc<dyn PredicateLanguage>, csel: Arc<dyn PredicateLanguage>) -> Self {
        Self { jexl, csel }
    }

    /// Compile a configuration
    ///
    /// # Errors
    ///
    /// - [`SelectorError::InvalidSelectorType`] when the type tag is unsupported
    /// - [`SelectorError::Evaluation`] when the expression is missing or does not parse
    pub fn compile(&self, config: &SelectorConfiguration) -> Result<Arc<dyn Selector>> {
        let selector_type = config
            .parsed_type()
            .ok_or_else(|| SelectorError::InvalidSelectorType(config.selector_type.clone()))?;

        let language = match selector_type {
            SelectorType::Jexl => &self.jexl,
            SelectorType::Csel => &self.csel,
        };

        let expression = config
            .expression()
            .ok_or_else(|| SelectorError::evaluation(&config.name, ExpressionError::MissingExpression))?;

        debug!("Compiling selector '{}' (type={})", config.name, selector_type);

        language
            .compile(expression)
            .map_err(|e| SelectorError::evaluation(&config.name, e))
    }
}

impl Default for SelectorCompiler {
    fn default() -> Self {
        let cel: Arc<dyn PredicateLanguage> = Arc::new(CelLanguage::new());
        Self::new(cel.clone(), cel)
    }
}

impl std::fmt::Debug for SelectorCompiler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SelectorCompiler").finish_non_exhaustive()
    }
}
