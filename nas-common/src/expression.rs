//! Dynamic expression capability
//!
//! `required` and `hidden` rules may be expression strings evaluated against
//! the full response. No expression language ships with this crate: callers
//! plug one in through [`ExpressionEngine`]. Whatever the engine returns,
//! [`evaluate_condition`] only ever yields a boolean. Failures and
//! non-boolean results become `false` and are reported as `tracing` events
//! under this module's target.

use serde_json::Value;
use thiserror::Error;
use tracing::{debug, error};

use crate::form::Response;

/// Errors an expression engine may report
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExpressionError {
    #[error("failed to compile expression: {0}")]
    Compile(String),

    #[error("failed to evaluate expression: {0}")]
    Evaluate(String),

    #[error("no expression engine configured")]
    Unavailable,
}

/// Evaluates an expression string against a response
pub trait ExpressionEngine: Send + Sync {
    /// Raw result of evaluating `expression` with `response` as context
    fn evaluate(&self, expression: &str, response: &Response) -> Result<Value, ExpressionError>;
}

impl<F> ExpressionEngine for F
where
    F: Fn(&str, &Response) -> Result<Value, ExpressionError> + Send + Sync,
{
    fn evaluate(&self, expression: &str, response: &Response) -> Result<Value, ExpressionError> {
        self(expression, response)
    }
}

/// Engine used when no expression language is configured
///
/// Every expression fails, so dynamic rules evaluate to `false`.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoExpressions;

impl ExpressionEngine for NoExpressions {
    fn evaluate(&self, _expression: &str, _response: &Response) -> Result<Value, ExpressionError> {
        Err(ExpressionError::Unavailable)
    }
}

/// Evaluate `expression` as a condition
///
/// Never fails: errors, non-boolean results and an undefined (`null`)
/// result all yield `false`.
pub fn evaluate_condition(
    engine: &dyn ExpressionEngine,
    expression: &str,
    response: &Response,
) -> bool {
    let result = match engine.evaluate(expression, response) {
        Ok(value) => value,
        Err(e) => {
            error!(expression, error = %e, "Failed to evaluate expression");
            return false;
        }
    };

    debug!(expression, result = %result, "Evaluated expression");

    match result {
        Value::Bool(flag) => flag,
        Value::Null => false,
        other => {
            error!(expression, result = %other, "Expression did not evaluate to a boolean value");
            false
        }
    }
}
