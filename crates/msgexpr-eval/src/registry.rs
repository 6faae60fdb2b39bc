//! Function registry: case-insensitive name → callable, with an
//! explicit `Signature` carrying the invocation contract (required
//! params, optional params with defaults, at most one variadic tail).
//!
//! Each function declares its signature explicitly at registration
//! rather than deriving it via reflection.

use std::collections::HashMap;
use std::sync::Arc;

use once_cell::sync::Lazy;

use msgexpr_common::{EvalError, Signature, Value};

use crate::context::Context;

pub trait Function: Send + Sync {
    fn name(&self) -> &'static str;
    fn signature(&self) -> &Signature;
    fn doc(&self) -> &'static str;
    fn call(&self, ctx: &Context, args: Vec<Value>) -> Result<Value, EvalError>;
}

#[derive(Debug, Clone)]
pub struct ParamInfo {
    pub name: String,
    pub optional: bool,
    pub vararg: bool,
}

#[derive(Debug, Clone)]
pub struct FunctionInfo {
    pub name: String,
    pub description: String,
    pub params: Vec<ParamInfo>,
}

pub struct Registry {
    functions: HashMap<String, Arc<dyn Function>>,
}

impl Registry {
    pub fn new(functions: Vec<Arc<dyn Function>>) -> Self {
        let mut map = HashMap::with_capacity(functions.len());
        for f in functions {
            map.insert(f.name().to_ascii_lowercase(), f);
        }
        Registry { functions: map }
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn Function>> {
        self.functions.get(name.to_ascii_lowercase().as_str())
    }

    /// Applies the invocation contract and calls the function,
    /// wrapping any error the body raises with the call site.
    pub fn invoke(&self, ctx: &Context, name: &str, args: Vec<Value>) -> Result<Value, EvalError> {
        let func = self
            .get(name)
            .ok_or_else(|| EvalError::UndefinedFunction(name.to_string()))?;
        let sig = func.signature();

        if args.len() < sig.min_args() {
            return Err(EvalError::TooFewArguments(name.to_string()));
        }
        if let Some(max) = sig.max_args() {
            if args.len() > max {
                return Err(EvalError::TooManyArguments(name.to_string()));
            }
        }

        let pretty = args
            .iter()
            .map(|v| format!("{v:?}"))
            .collect::<Vec<_>>()
            .join(", ");

        let mut iter = args.into_iter();
        let mut final_args = Vec::with_capacity(sig.params.len());
        for p in &sig.params {
            match iter.next() {
                Some(v) => final_args.push(v),
                None => final_args.push(
                    p.default
                        .clone()
                        .expect("optional parameter always carries a default"),
                ),
            }
        }
        final_args.extend(iter);

        func.call(ctx, final_args)
            .map_err(|e| EvalError::wrap_function(name, pretty, e))
    }

    /// Sorted A-Z listing of every registered function's name, docstring,
    /// and parameter metadata.
    pub fn listing(&self) -> Vec<FunctionInfo> {
        let mut out: Vec<FunctionInfo> = self
            .functions
            .values()
            .map(|f| {
                let sig = f.signature();
                let mut params: Vec<ParamInfo> = sig
                    .params
                    .iter()
                    .map(|p| ParamInfo {
                        name: p.name.to_string(),
                        optional: p.is_optional(),
                        vararg: false,
                    })
                    .collect();
                if let Some(variadic) = sig.variadic {
                    params.push(ParamInfo {
                        name: variadic.to_string(),
                        optional: false,
                        vararg: true,
                    });
                }
                FunctionInfo {
                    name: f.name().to_ascii_uppercase(),
                    description: f.doc().trim().to_string(),
                    params,
                }
            })
            .collect();
        out.sort_by(|a, b| a.name.cmp(&b.name));
        out
    }
}

/// The registry every `evaluate_expression`/`evaluate_template` call uses
/// unless the caller supplies its own: the full standard function
/// library, registered once at startup and read-only thereafter.
pub fn default_registry() -> &'static Registry {
    static REGISTRY: Lazy<Registry> = Lazy::new(|| Registry::new(crate::builtins::all_functions()));
    &REGISTRY
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builtins;

    fn registry() -> Registry {
        Registry::new(builtins::all_functions())
    }

    #[test]
    fn listing_is_sorted_a_to_z() {
        let listing = registry().listing();
        let mut sorted = listing.clone().into_iter().map(|f| f.name).collect::<Vec<_>>();
        let mut expected = sorted.clone();
        expected.sort();
        assert_eq!(sorted, expected);
        sorted.dedup();
        assert_eq!(sorted.len(), listing.len(), "function names must be unique");
    }

    #[test]
    fn unknown_function_is_an_error() {
        let ctx = crate::context::Context::now_in(chrono_tz::UTC, crate::dates::DateStyle::DayFirst);
        let reg = registry();
        assert!(matches!(
            reg.invoke(&ctx, "NOPE", vec![]),
            Err(EvalError::UndefinedFunction(_))
        ));
    }
}
