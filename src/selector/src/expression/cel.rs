//! CEL (Common Expression Language) adapter for selector expressions

use cel_interpreter::objects::Value as CelValue;
use cel_interpreter::{Context, Program};
use serde_json::{Map, Value};
use std::sync::Arc;

use super::{ExpressionError, PredicateLanguage, Selector, VariableSource};

/// Predicate language backed by `cel-interpreter`
///
/// Dotted variable names such as `coordinate.groupId` are folded into nested
/// maps so they can be addressed with CEL member access.
#[derive(Debug, Clone, Copy, Default)]
pub struct CelLanguage;

impl CelLanguage {
    pub fn new() -> Self {
        Self
    }
}

impl PredicateLanguage for CelLanguage {
    fn compile(&self, expression: &str) -> Result<Arc<dyn Selector>, ExpressionError> {
        Ok(Arc::new(CelSelector::compile(expression)?))
    }
}

/// Compiled CEL program
pub struct CelSelector {
    source: String,
    program: Program,
}

impl CelSelector {
    pub fn compile(expression: &str) -> Result<Self, ExpressionError> {
        let program = Program::compile(expression)
            .map_err(|e| ExpressionError::Compilation(format!("{:?}", e)))?;

        Ok(Self {
            source: expression.to_string(),
            program,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }
}

impl Selector for CelSelector {
    fn evaluate(&self, variables: &dyn VariableSource) -> Result<bool, ExpressionError> {
        let mut context = Context::default();

        for (name, value) in nest_variables(variables)? {
            context
                .add_variable(name, value)
                .map_err(|e| ExpressionError::Evaluation(e.to_string()))?;
        }

        match self.program.execute(&context) {
            Ok(CelValue::Bool(b)) => Ok(b),
            Ok(_) => Err(ExpressionError::NonBooleanResult),
            Err(e) => Err(ExpressionError::Evaluation(format!("{:?}", e))),
        }
    }
}

impl std::fmt::Debug for CelSelector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CelSelector").field("source", &self.source).finish()
    }
}

/// Fold `a.b.c` style names into nested objects
///
/// A name that is both a value and a parent of another name (`coordinate`
/// and `coordinate.groupId`) cannot be represented and is rejected.
fn nest_variables(variables: &dyn VariableSource) -> Result<Map<String, Value>, ExpressionError> {
    let mut root = Map::new();

    for name in variables.variable_names() {
        if let Some(value) = variables.get(&name) {
            let path: Vec<&str> = name.split('.').collect();
            insert_nested(&mut root, &name, &path, value)?;
        }
    }

    Ok(root)
}

fn insert_nested(
    map: &mut Map<String, Value>,
    name: &str,
    path: &[&str],
    value: Value,
) -> Result<(), ExpressionError> {
    match path {
        [] => Ok(()),
        [leaf] => {
            if map.contains_key(*leaf) {
                return Err(conflicting_variable(name));
            }
            map.insert(leaf.to_string(), value);
            Ok(())
        }
        [head, rest @ ..] => {
            let entry = map
                .entry(head.to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            match entry {
                Value::Object(child) => insert_nested(child, name, rest, value),
                _ => Err(conflicting_variable(name)),
            }
        }
    }
}

fn conflicting_variable(name: &str) -> ExpressionError {
    ExpressionError::Evaluation(format!(
        "Variable '{}' conflicts with another variable on the same path",
        name
    ))
}
