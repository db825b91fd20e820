//! Expression evaluation for `:eval` and `:if`.
//!
//! The interpreter only sees the [`Evaluator`] trait, so tests and embedders
//! can swap in their own evaluator. The default one is backed by `evalexpr`,
//! which has no access to the file system or the process.

use crate::env::{Value, Variables};
use evalexpr::{ContextWithMutableVariables, HashMapContext, Value as ExprValue};
use log::debug;
use thiserror::Error;

#[derive(Debug, Error)]
#[error("{0}")]
pub struct EvalError(pub String);

/// Capability to evaluate a boolean or value expression.
pub trait Evaluator {
    /// Evaluate `expression` with `vars` visible by name (without `$`).
    fn evaluate(&self, expression: &str, vars: &Variables) -> Result<Value, EvalError>;
}

/// Default evaluator backed by `evalexpr`.
#[derive(Debug, Default, Clone, Copy)]
pub struct ExprEvaluator;

impl Evaluator for ExprEvaluator {
    fn evaluate(&self, expression: &str, vars: &Variables) -> Result<Value, EvalError> {
        let mut context = HashMapContext::new();
        for (name, value) in vars {
            if let Err(e) = context.set_value(name.clone(), to_expr_value(value)) {
                debug!("variable {name} not bound for evaluation: {e}");
            }
        }
        evalexpr::eval_with_context(expression, &context)
            .map(from_expr_value)
            .map_err(|e| EvalError(e.to_string()))
    }
}

fn to_expr_value(value: &Value) -> ExprValue {
    match value {
        Value::Str(s) => ExprValue::String(s.clone()),
        Value::Int(n) => ExprValue::Int(*n),
        Value::Float(x) => ExprValue::Float(*x),
        Value::Bool(b) => ExprValue::Boolean(*b),
        Value::Empty => ExprValue::Empty,
    }
}

fn from_expr_value(value: ExprValue) -> Value {
    match value {
        ExprValue::String(s) => Value::Str(s),
        ExprValue::Int(n) => Value::Int(n),
        ExprValue::Float(x) => Value::Float(x),
        ExprValue::Boolean(b) => Value::Bool(b),
        ExprValue::Empty => Value::Empty,
        tuple @ ExprValue::Tuple(_) => Value::Str(tuple.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eval(expr: &str) -> Result<Value, EvalError> {
        ExprEvaluator.evaluate(expr, &Variables::new())
    }

    #[test]
    fn arithmetic() {
        assert_eq!(eval("(1+1)").unwrap(), Value::Int(2));
        assert_eq!(eval("7 / 2.0").unwrap(), Value::Float(3.5));
    }

    #[test]
    fn comparisons() {
        assert_eq!(eval("\"a\" == \"a\"").unwrap(), Value::Bool(true));
        assert_eq!(eval("3 < 2").unwrap(), Value::Bool(false));
    }

    #[test]
    fn variables_are_visible_by_name() {
        let mut vars = Variables::new();
        vars.insert("folderIndex".into(), Value::Int(2));
        vars.insert("count".into(), Value::Int(5));
        vars.insert("name".into(), Value::from("docs"));
        let value = ExprEvaluator
            .evaluate("folderIndex < count && name == \"docs\"", &vars)
            .unwrap();
        assert_eq!(value, Value::Bool(true));
    }

    #[test]
    fn numeric_looking_strings_stay_strings() {
        let mut vars = Variables::new();
        vars.insert("v".into(), Value::from("007"));
        assert_eq!(ExprEvaluator.evaluate("v == \"007\"", &vars).unwrap(), Value::Bool(true));
        assert_eq!(ExprEvaluator.evaluate("v == 7", &vars).unwrap(), Value::Bool(false));
    }

    #[test]
    fn odd_variable_names_do_not_break_evaluation() {
        let mut vars = Variables::new();
        vars.insert("not-an-identifier".into(), Value::from("x"));
        vars.insert("ok".into(), Value::Int(1));
        assert_eq!(ExprEvaluator.evaluate("ok + 1", &vars).unwrap(), Value::Int(2));
    }

    #[test]
    fn invalid_expression_is_an_error() {
        assert!(eval("1 +").is_err());
        assert!(eval("undefined_name > 1").is_err());
    }
}
