pub mod builtins;
pub mod context;
pub mod dates;
pub mod evaluator;
pub mod registry;
pub mod template;
pub mod utils;

pub use context::Context;
pub use dates::{DateParser, DateStyle};
pub use evaluator::{evaluate_expression, evaluate_expression_with, Strategy};
pub use registry::{default_registry, Function, FunctionInfo, ParamInfo, Registry};
pub use template::{evaluate_template, evaluate_template_with};

pub use msgexpr_common::{
    format_decimal, to_same, ArgKind, Container, DateParseMode, EvalError, ParamSpec, Signature,
    Value, ValueCtx,
};
pub use msgexpr_parse::{parse, BinOp, Expr, Path};
