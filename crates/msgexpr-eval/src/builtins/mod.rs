//! The standard function library: one [`SimpleFn`] descriptor per
//! function, grouped by category module. Each descriptor is a small DSL
//! table entry (name, doc, signature, and a plain `fn` body) rather than
//! a hand-rolled struct per function — the systems-language substitute
//! for the source's reflection-derived registration.

mod custom;
mod datetime;
mod logical;
mod math;
mod text;

use std::sync::Arc;

use msgexpr_common::{EvalError, Signature, Value};

use crate::context::Context;
use crate::registry::Function;

/// A registered function: name, docstring, declared signature, and a
/// plain function pointer for the body. No per-function struct/impl
/// boilerplate is needed since the shape is identical across the whole
/// catalogue.
pub struct SimpleFn {
    name: &'static str,
    doc: &'static str,
    sig: Signature,
    call: fn(&Context, Vec<Value>) -> Result<Value, EvalError>,
}

impl Function for SimpleFn {
    fn name(&self) -> &'static str {
        self.name
    }

    fn signature(&self) -> &Signature {
        &self.sig
    }

    fn doc(&self) -> &'static str {
        self.doc
    }

    fn call(&self, ctx: &Context, args: Vec<Value>) -> Result<Value, EvalError> {
        (self.call)(ctx, args)
    }
}

/// The full catalogue of standard functions, plus the `EPOCH` addition.
pub fn all_functions() -> Vec<Arc<dyn Function>> {
    let mut out: Vec<SimpleFn> = Vec::new();
    out.extend(text::functions());
    out.extend(datetime::functions());
    out.extend(math::functions());
    out.extend(logical::functions());
    out.extend(custom::functions());
    out.into_iter().map(|f| Arc::new(f) as Arc<dyn Function>).collect()
}
