pub mod parser;
pub mod tokenizer;
pub mod types;

pub use parser::{parse, BinOp, Expr, Path};
pub use tokenizer::{Associativity, Token, TokenKind, Tokenizer};
pub use types::ParseError;

pub use msgexpr_common::{ArgKind, EvalError, ParamSpec, Signature, Value};
