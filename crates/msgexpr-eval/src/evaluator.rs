//! Tree-walking evaluator: operator semantics over the `Value`
//! coercion table, plus the two evaluation strategies threaded through
//! the walk as a plain enum rather than a trait object — there is only
//! ever one of two behaviors, so a generic "visitor" abstraction would
//! be pure ceremony here.

use std::cmp::Ordering;

use msgexpr_common::{to_same, EvalError, Value};
use msgexpr_parse::{parse, BinOp, Expr};

use crate::context::Context;
use crate::registry::{default_registry, Registry};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// Undefined names are errors; the default.
    Complete,
    /// Undefined names are preserved verbatim (as canonical source text)
    /// so the template can be re-evaluated later in a richer context.
    ResolveAvailable,
}

/// The result of walking one (sub)expression. `Pending` only ever
/// appears under `Strategy::ResolveAvailable` — under `Complete` an
/// unresolved name aborts the walk with `Err` immediately.
pub(crate) enum Eval {
    Value(Value),
    Pending(String),
}

impl Eval {
    /// The text this node contributes to an enclosing pending rewrite:
    /// a resolved value's quoted `repr`, or a pending node's own stored
    /// canonical source.
    fn text(&self, ctx: &Context) -> Result<String, EvalError> {
        match self {
            Eval::Value(v) => v.repr(ctx),
            Eval::Pending(s) => Ok(s.clone()),
        }
    }
}

fn op_symbol(op: BinOp) -> &'static str {
    match op {
        BinOp::Eq => "=",
        BinOp::Ne => "<>",
        BinOp::Lt => "<",
        BinOp::Le => "<=",
        BinOp::Gt => ">",
        BinOp::Ge => ">=",
        BinOp::Concat => "&",
        BinOp::Add => "+",
        BinOp::Sub => "-",
        BinOp::Mul => "*",
        BinOp::Div => "/",
        BinOp::Pow => "^",
    }
}

/// Evaluates the public, standalone entry point: `source` is parsed and
/// evaluated under `Strategy::Complete` against the default builtin
/// registry, raising on any error.
pub fn evaluate_expression(source: &str, ctx: &Context) -> Result<Value, EvalError> {
    evaluate_expression_with(source, ctx, default_registry())
}

/// As `evaluate_expression`, against a caller-supplied function registry.
pub fn evaluate_expression_with(
    source: &str,
    ctx: &Context,
    registry: &Registry,
) -> Result<Value, EvalError> {
    let expr = parse(source)?;
    match eval(&expr, ctx, registry, Strategy::Complete)? {
        Eval::Value(v) => Ok(v),
        Eval::Pending(_) => unreachable!("Strategy::Complete never produces a pending result"),
    }
}

pub(crate) fn eval(
    expr: &Expr,
    ctx: &Context,
    registry: &Registry,
    strategy: Strategy,
) -> Result<Eval, EvalError> {
    match expr {
        Expr::Literal(v) => Ok(Eval::Value(v.clone())),

        Expr::Ident(path) => match ctx.resolve(&path.original) {
            Ok(v) => Ok(Eval::Value(v)),
            Err(e) => match strategy {
                Strategy::Complete => Err(e),
                Strategy::ResolveAvailable => Ok(Eval::Pending(path.original.clone())),
            },
        },

        Expr::Unary { expr } => {
            let inner = eval(expr, ctx, registry, strategy)?;
            match inner {
                Eval::Pending(text) => Ok(Eval::Pending(format!("-{text}"))),
                Eval::Value(v) => {
                    let d = v.to_dec(ctx)?;
                    Ok(Eval::Value(Value::Dec(-d)))
                }
            }
        }

        Expr::Binary { op, left, right } => {
            let left = eval(left, ctx, registry, strategy)?;
            let right = eval(right, ctx, registry, strategy)?;
            match (&left, &right) {
                (Eval::Pending(_), _) | (_, Eval::Pending(_)) => {
                    let text = format!("{}{}{}", left.text(ctx)?, op_symbol(*op), right.text(ctx)?);
                    Ok(Eval::Pending(text))
                }
                (Eval::Value(l), Eval::Value(r)) => {
                    Ok(Eval::Value(apply_binop(*op, l.clone(), r.clone(), ctx)?))
                }
            }
        }

        Expr::Call { name, args } => {
            let mut evaluated = Vec::with_capacity(args.len());
            for a in args {
                evaluated.push(eval(a, ctx, registry, strategy)?);
            }
            if evaluated.iter().any(|e| matches!(e, Eval::Pending(_))) {
                let mut parts = Vec::with_capacity(evaluated.len());
                for e in &evaluated {
                    parts.push(e.text(ctx)?);
                }
                return Ok(Eval::Pending(format!("{name}({})", parts.join(","))));
            }
            let values: Vec<Value> = evaluated
                .into_iter()
                .map(|e| match e {
                    Eval::Value(v) => v,
                    Eval::Pending(_) => unreachable!("checked above"),
                })
                .collect();
            Ok(Eval::Value(registry.invoke(ctx, name, values)?))
        }
    }
}

fn apply_binop(op: BinOp, l: Value, r: Value, ctx: &Context) -> Result<Value, EvalError> {
    match op {
        BinOp::Concat => Ok(Value::Str(format!(
            "{}{}",
            l.to_display_string(ctx)?,
            r.to_display_string(ctx)?
        ))),
        BinOp::Add | BinOp::Sub | BinOp::Mul | BinOp::Div | BinOp::Pow => {
            let a = l.to_dec(ctx)?;
            let b = r.to_dec(ctx)?;
            let result = match op {
                BinOp::Add => a + b,
                BinOp::Sub => a - b,
                BinOp::Mul => a * b,
                BinOp::Div => {
                    if b.is_zero() {
                        return Err(EvalError::DivisionByZero);
                    }
                    a / b
                }
                BinOp::Pow => crate::utils::decimal_pow(a, b)
                    .ok_or_else(|| EvalError::Arithmetic(format!("Can't raise {a} to the power of {b}")))?,
                _ => unreachable!(),
            };
            Ok(Value::Dec(result))
        }
        BinOp::Eq | BinOp::Ne | BinOp::Lt | BinOp::Le | BinOp::Gt | BinOp::Ge => {
            let (a, b) = to_same(&l, &r, ctx)?;
            let ordering = match (&a, &b) {
                (Value::Dec(x), Value::Dec(y)) => x.partial_cmp(y),
                (Value::DateTime(x), Value::DateTime(y)) => x.partial_cmp(y),
                (Value::Str(x), Value::Str(y)) => x.partial_cmp(y),
                _ => None,
            };
            Ok(Value::Bool(compare(op, ordering)))
        }
    }
}

fn compare(op: BinOp, ordering: Option<Ordering>) -> bool {
    match (op, ordering) {
        (BinOp::Eq, Some(Ordering::Equal)) => true,
        (BinOp::Eq, _) => false,
        (BinOp::Ne, Some(Ordering::Equal)) => false,
        (BinOp::Ne, _) => true,
        (BinOp::Lt, Some(Ordering::Less)) => true,
        (BinOp::Lt, _) => false,
        (BinOp::Le, Some(o)) => o != Ordering::Greater,
        (BinOp::Le, None) => false,
        (BinOp::Gt, Some(Ordering::Greater)) => true,
        (BinOp::Gt, _) => false,
        (BinOp::Ge, Some(o)) => o != Ordering::Less,
        (BinOp::Ge, None) => false,
        _ => unreachable!("non-comparison operator reached compare()"),
    }
}

/// Whether `text` reads as a bare dotted identifier chain rather than a
/// compound expression — used to decide whether a top-level pending
/// rewrite needs its `@(...)` wrapper or can stay a bare `@ident`.
pub(crate) fn is_bare_ident(text: &str) -> bool {
    let mut chars = text.chars();
    match chars.next() {
        Some(c) if c.is_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_alphanumeric() || c == '_' || c == '.')
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dates::DateStyle;
    use chrono::{NaiveDate, TimeZone};

    fn ctx() -> Context {
        let now = chrono_tz::Africa::Kigali
            .from_local_datetime(
                &NaiveDate::from_ymd_opt(2015, 8, 14)
                    .unwrap()
                    .and_hms_opt(10, 38, 30)
                    .unwrap(),
            )
            .unwrap();
        Context::new(now, chrono_tz::Africa::Kigali, DateStyle::DayFirst)
    }

    #[test]
    fn arithmetic_is_decimal() {
        let c = ctx();
        let v = evaluate_expression("2 + 3", &c).unwrap();
        assert_eq!(v, Value::Dec(rust_decimal::Decimal::from(5)));
    }

    #[test]
    fn division_by_zero_errors() {
        let c = ctx();
        assert!(matches!(
            evaluate_expression("1 / 0", &c),
            Err(EvalError::DivisionByZero)
        ));
    }

    #[test]
    fn concat_coerces_to_string() {
        let c = ctx();
        let v = evaluate_expression(r#""x" & 1"#, &c).unwrap();
        assert_eq!(v, Value::Str("x1".into()));
    }

    #[test]
    fn unresolved_variable_errors_under_complete() {
        let c = ctx();
        assert!(evaluate_expression("missing", &c).is_err());
    }

    #[test]
    fn resolve_available_preserves_unresolved_compound_expression() {
        let mut c = ctx();
        c.set("foo", Value::Dec(rust_decimal::Decimal::from(5)));
        c.set("bar", Value::Str("x".into()));
        let expr = parse("foo + contact.name + bar").unwrap();
        let result = eval(&expr, &c, default_registry(), Strategy::ResolveAvailable).unwrap();
        match result {
            Eval::Pending(text) => assert_eq!(text, "5+contact.name+\"x\""),
            Eval::Value(_) => panic!("expected pending result"),
        }
    }

    #[test]
    fn is_bare_ident_recognizes_dotted_chains() {
        assert!(is_bare_ident("contact.name"));
        assert!(!is_bare_ident("5+contact.name"));
    }

    #[test]
    fn comparison_across_date_and_datetime_takes_midnight() {
        let c = ctx();
        let v = evaluate_expression(r#""14-08-2015" = "14-08-2015 00:00""#, &c).unwrap();
        assert_eq!(v, Value::Bool(true));
    }
}
