//! Function signature descriptors shared between the registry and the
//! evaluator.
//!
//! A function declares what *kind* of value each parameter expects,
//! plus a name, an optional default, and an optional variadic tail —
//! the registry's invocation contract needs named optional parameters
//! alongside plain arity checks.

use crate::value::Value;

/// The kind of value a parameter expects. Mirrors the coercion table:
/// the registry doesn't enforce this at call time (the function body
/// coerces explicitly via `Value::to_*`), it's metadata for `listing()`.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ArgKind {
    Number,
    Text,
    Logical,
    Date,
    Any,
}

impl ArgKind {
    pub fn parse(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "number" => Self::Number,
            "text" => Self::Text,
            "logical" => Self::Logical,
            "date" => Self::Date,
            "" | "_" | "any" => Self::Any,
            other => panic!("Unknown arg kind '{other}'"),
        }
    }
}

/// One parameter in a function's signature.
#[derive(Clone, Debug)]
pub struct ParamSpec {
    pub name: &'static str,
    pub kind: ArgKind,
    /// `Some(default)` marks this parameter optional.
    pub default: Option<Value>,
}

impl ParamSpec {
    pub const fn required(name: &'static str, kind: ArgKind) -> Self {
        ParamSpec {
            name,
            kind,
            default: None,
        }
    }

    pub fn optional(name: &'static str, kind: ArgKind, default: Value) -> Self {
        ParamSpec {
            name,
            kind,
            default: Some(default),
        }
    }

    pub fn is_optional(&self) -> bool {
        self.default.is_some()
    }
}

/// Full declared signature of a registered function: an ordered list of
/// named parameters (required first, then optional-with-defaults), plus
/// an optional trailing variadic tail.
#[derive(Clone, Debug, Default)]
pub struct Signature {
    pub params: Vec<ParamSpec>,
    pub variadic: Option<&'static str>,
}

impl Signature {
    pub fn new(params: Vec<ParamSpec>) -> Self {
        Signature {
            params,
            variadic: None,
        }
    }

    pub fn with_variadic(mut self, name: &'static str) -> Self {
        self.variadic = Some(name);
        self
    }

    pub fn min_args(&self) -> usize {
        self.params.iter().filter(|p| !p.is_optional()).count()
    }

    pub fn max_args(&self) -> Option<usize> {
        if self.variadic.is_some() {
            None
        } else {
            Some(self.params.len())
        }
    }
}
