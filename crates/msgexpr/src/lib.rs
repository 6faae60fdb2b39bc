//! Meta crate that re-exports the message-expression building blocks with
//! sensible defaults: parse and evaluate spreadsheet-style `@`-expressions
//! and templates. Downstream users can depend on this crate alone while
//! keeping access to the underlying crates for deeper integration.

pub use msgexpr_common as common;
pub use msgexpr_eval as eval;
pub use msgexpr_parse as parse;

pub use msgexpr_common::{
    format_decimal, to_same, ArgKind, Container, DateParseMode, EvalError, ParamSpec, Signature,
    Value, ValueCtx,
};
pub use msgexpr_eval::{
    default_registry, evaluate_expression, evaluate_expression_with, evaluate_template,
    evaluate_template_with, Context, DateParser, DateStyle, Function, FunctionInfo, ParamInfo,
    Registry, Strategy,
};
pub use msgexpr_parse::{parse as parse_expression, BinOp, Expr, Path};

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ctx() -> Context {
        let now = chrono_tz::UTC
            .from_local_datetime(
                &chrono::NaiveDate::from_ymd_opt(2015, 8, 14)
                    .unwrap()
                    .and_hms_opt(0, 0, 0)
                    .unwrap(),
            )
            .unwrap();
        Context::new(now, chrono_tz::UTC, DateStyle::DayFirst)
    }

    #[test]
    fn evaluates_a_simple_expression_through_the_facade() {
        let c = ctx();
        let v = evaluate_expression("1 + 2 * 3", &c).unwrap();
        assert_eq!(v, Value::Dec(rust_decimal::Decimal::from(7)));
    }

    #[test]
    fn renders_a_template_through_the_facade() {
        let mut c = ctx();
        c.set("name", Value::Str("Rowan".into()));
        let (out, errs) = evaluate_template("Hi @name!", &c);
        assert_eq!(out, "Hi Rowan!");
        assert!(errs.is_empty());
    }
}
