//! Error kinds produced while lexing, parsing, or evaluating an expression.
//!
//! There is no structured error hierarchy exposed across the evaluator's
//! public boundary — callers see human-readable strings (`Display`).
//! Internally we keep a typed enum (`thiserror`) so the evaluator itself
//! can match on error shape where that's useful (e.g. deciding whether a
//! missing variable should abort evaluation or be preserved verbatim).

use thiserror::Error;

/// Everything that can go wrong while parsing or evaluating an expression.
#[derive(Debug, Clone, Error)]
pub enum EvalError {
    #[error("Expression error at: {0}")]
    Parse(String),

    #[error("Undefined variable: {0}")]
    UnresolvedVariable(String),

    #[error("Undefined function: {0}")]
    UndefinedFunction(String),

    #[error("Can't convert '{value}' to a {target}")]
    Conversion { value: String, target: &'static str },

    #[error("Too few arguments provided for function {0}")]
    TooFewArguments(String),

    #[error("Too many arguments provided for function {0}")]
    TooManyArguments(String),

    #[error("Error calling function {name} with arguments {args}: {source}")]
    FunctionBody {
        name: String,
        args: String,
        source: Box<EvalError>,
    },

    #[error("Division by zero")]
    DivisionByZero,

    #[error("{0}")]
    Arithmetic(String),
}

impl EvalError {
    pub fn conversion(value: impl Into<String>, target: &'static str) -> Self {
        EvalError::Conversion {
            value: value.into(),
            target,
        }
    }

    pub fn wrap_function(
        name: impl Into<String>,
        args: impl Into<String>,
        source: EvalError,
    ) -> Self {
        EvalError::FunctionBody {
            name: name.into(),
            args: args.into(),
            source: Box::new(source),
        }
    }
}

impl From<EvalError> for String {
    fn from(e: EvalError) -> Self {
        e.to_string()
    }
}
