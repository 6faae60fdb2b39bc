pub mod error;
pub mod function;
pub mod value;

pub use error::EvalError;
pub use function::{ArgKind, ParamSpec, Signature};
pub use value::{format_decimal, to_same, Container, DateParseMode, Value, ValueCtx};
