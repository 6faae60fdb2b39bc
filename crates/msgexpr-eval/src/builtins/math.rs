//! Math functions.

use rand::Rng;
use rust_decimal::Decimal;

use msgexpr_common::{ArgKind, EvalError, ParamSpec, Signature, Value};

use crate::utils::{decimal_pow, decimal_round, decimal_truncate};

use super::SimpleFn;

pub(super) fn functions() -> Vec<SimpleFn> {
    vec![
        SimpleFn {
            name: "ABS",
            doc: "Returns the absolute value of a number",
            sig: Signature::new(vec![ParamSpec::required("number", ArgKind::Number)]),
            call: |ctx, args| Ok(Value::Dec(args[0].to_dec(ctx)?.abs())),
        },
        SimpleFn {
            name: "AVERAGE",
            doc: "Returns the average (arithmetic mean) of all numbers",
            sig: Signature::new(vec![ParamSpec::required("number", ArgKind::Number)]).with_variadic("more_numbers"),
            call: |ctx, args| {
                let mut sum = Decimal::ZERO;
                for a in &args {
                    sum += a.to_dec(ctx)?;
                }
                Ok(Value::Dec(sum / Decimal::from(args.len() as i64)))
            },
        },
        SimpleFn {
            name: "EXP",
            doc: "Returns e raised to the power of a number",
            sig: Signature::new(vec![ParamSpec::required("number", ArgKind::Number)]),
            call: |ctx, args| {
                let n = args[0].to_dec(ctx)?;
                let n_f = rust_decimal::prelude::ToPrimitive::to_f64(&n)
                    .ok_or_else(|| EvalError::Arithmetic(format!("{n} is out of range for EXP")))?;
                Decimal::from_f64_retain(n_f.exp())
                    .map(Value::Dec)
                    .ok_or_else(|| EvalError::Arithmetic("EXP result out of range".into()))
            },
        },
        SimpleFn {
            name: "INT",
            doc: "Rounds a number down to the nearest integer",
            sig: Signature::new(vec![ParamSpec::required("number", ArgKind::Number)]),
            call: |ctx, args| Ok(Value::Dec(args[0].to_dec(ctx)?.floor())),
        },
        SimpleFn {
            name: "MAX",
            doc: "Returns the largest of the values",
            sig: Signature::new(vec![ParamSpec::required("number", ArgKind::Number)]).with_variadic("more_numbers"),
            call: |ctx, args| {
                let mut best = args[0].to_dec(ctx)?;
                for a in &args[1..] {
                    best = best.max(a.to_dec(ctx)?);
                }
                Ok(Value::Dec(best))
            },
        },
        SimpleFn {
            name: "MIN",
            doc: "Returns the smallest of the values",
            sig: Signature::new(vec![ParamSpec::required("number", ArgKind::Number)]).with_variadic("more_numbers"),
            call: |ctx, args| {
                let mut best = args[0].to_dec(ctx)?;
                for a in &args[1..] {
                    best = best.min(a.to_dec(ctx)?);
                }
                Ok(Value::Dec(best))
            },
        },
        SimpleFn {
            name: "MOD",
            doc: "Returns the remainder after a number is divided by a divisor",
            sig: Signature::new(vec![
                ParamSpec::required("number", ArgKind::Number),
                ParamSpec::required("divisor", ArgKind::Number),
            ]),
            call: |ctx, args| {
                let number = args[0].to_dec(ctx)?;
                let divisor = args[1].to_dec(ctx)?;
                if divisor.is_zero() {
                    return Err(EvalError::DivisionByZero);
                }
                Ok(Value::Dec(number % divisor))
            },
        },
        SimpleFn {
            name: "POWER",
            doc: "Returns the result of a number raised to a power",
            sig: Signature::new(vec![
                ParamSpec::required("number", ArgKind::Number),
                ParamSpec::required("power", ArgKind::Number),
            ]),
            call: |ctx, args| {
                let base = args[0].to_dec(ctx)?;
                let exp = args[1].to_dec(ctx)?;
                decimal_pow(base, exp)
                    .map(Value::Dec)
                    .ok_or_else(|| EvalError::Arithmetic(format!("{base}^{exp} is undefined")))
            },
        },
        SimpleFn {
            name: "RAND",
            doc: "Returns a random number between 0 and 1",
            sig: Signature::new(vec![]),
            call: |_ctx, _args| {
                let n: f64 = rand::thread_rng().gen();
                Decimal::from_f64_retain(n)
                    .map(Value::Dec)
                    .ok_or_else(|| EvalError::Arithmetic("RAND result out of range".into()))
            },
        },
        SimpleFn {
            name: "RANDBETWEEN",
            doc: "Returns a random integer number in the given range",
            sig: Signature::new(vec![
                ParamSpec::required("bottom", ArgKind::Number),
                ParamSpec::required("top", ArgKind::Number),
            ]),
            call: |ctx, args| {
                let bottom = args[0].to_int(ctx)?;
                let top = args[1].to_int(ctx)?;
                if bottom > top {
                    return Err(EvalError::Arithmetic(format!(
                        "RANDBETWEEN: bottom {bottom} is greater than top {top}"
                    )));
                }
                Ok(Value::Int(rand::thread_rng().gen_range(bottom..=top)))
            },
        },
        SimpleFn {
            name: "ROUND",
            doc: "Rounds a number to a specified number of digits",
            sig: Signature::new(vec![
                ParamSpec::required("number", ArgKind::Number),
                ParamSpec::optional("num_digits", ArgKind::Number, Value::Int(0)),
            ]),
            call: |ctx, args| {
                let number = args[0].to_dec(ctx)?;
                let digits = args[1].to_int(ctx)?;
                Ok(Value::Dec(decimal_round(number, digits as i32)))
            },
        },
        SimpleFn {
            name: "ROUNDDOWN",
            doc: "Rounds a number down, toward zero",
            sig: Signature::new(vec![
                ParamSpec::required("number", ArgKind::Number),
                ParamSpec::optional("num_digits", ArgKind::Number, Value::Int(0)),
            ]),
            call: |ctx, args| {
                let number = args[0].to_dec(ctx)?;
                let digits = args[1].to_int(ctx)?;
                Ok(Value::Dec(decimal_truncate(number, digits as i32)))
            },
        },
        SimpleFn {
            name: "ROUNDUP",
            doc: "Rounds a number up, away from zero",
            sig: Signature::new(vec![
                ParamSpec::required("number", ArgKind::Number),
                ParamSpec::optional("num_digits", ArgKind::Number, Value::Int(0)),
            ]),
            call: |ctx, args| {
                let number = args[0].to_dec(ctx)?;
                let digits = args[1].to_int(ctx)?;
                let down = decimal_truncate(number, digits as i32);
                if down == number {
                    return Ok(Value::Dec(down));
                }
                let step = decimal_pow_step(digits as i32);
                Ok(Value::Dec(if number.is_sign_negative() { down - step } else { down + step }))
            },
        },
        SimpleFn {
            name: "SUM",
            doc: "Returns the sum of all numbers",
            sig: Signature::new(vec![ParamSpec::required("number", ArgKind::Number)]).with_variadic("more_numbers"),
            call: |ctx, args| {
                let mut sum = Decimal::ZERO;
                for a in &args {
                    sum += a.to_dec(ctx)?;
                }
                Ok(Value::Dec(sum))
            },
        },
        SimpleFn {
            name: "TRUNC",
            doc: "Truncates a number to an integer by removing its fractional part",
            sig: Signature::new(vec![ParamSpec::required("number", ArgKind::Number)]),
            call: |ctx, args| Ok(Value::Dec(decimal_truncate(args[0].to_dec(ctx)?, 0))),
        },
    ]
}

/// The smallest positive decimal step at `num_digits` fractional places,
/// used to push `ROUNDUP`'s truncated value one step further out.
fn decimal_pow_step(num_digits: i32) -> Decimal {
    if num_digits >= 0 {
        let mut step = Decimal::ONE;
        for _ in 0..num_digits {
            step /= Decimal::TEN;
        }
        step
    } else {
        let mut step = Decimal::ONE;
        for _ in 0..(-num_digits) {
            step *= Decimal::TEN;
        }
        step
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Context;
    use crate::dates::DateStyle;
    use chrono::{NaiveDate, TimeZone};
    use std::str::FromStr;

    fn ctx() -> Context {
        let now = chrono_tz::UTC.from_local_datetime(
            &NaiveDate::from_ymd_opt(2015, 8, 14).unwrap().and_hms_opt(0, 0, 0).unwrap(),
        ).unwrap();
        Context::new(now, chrono_tz::UTC, DateStyle::DayFirst)
    }

    fn call(name: &str, args: Vec<Value>) -> Result<Value, EvalError> {
        let c = ctx();
        let reg = crate::registry::Registry::new(super::super::all_functions());
        reg.invoke(&c, name, args)
    }

    fn dec(s: &str) -> Value {
        Value::Dec(Decimal::from_str(s).unwrap())
    }

    #[test]
    fn average_and_sum() {
        assert_eq!(call("SUM", vec![dec("1"), dec("2"), dec("3")]).unwrap(), dec("6"));
        assert_eq!(call("AVERAGE", vec![dec("1"), dec("2"), dec("3")]).unwrap(), dec("2"));
    }

    #[test]
    fn mod_and_division_by_zero() {
        assert_eq!(call("MOD", vec![dec("7"), dec("3")]).unwrap(), dec("1"));
        assert!(call("MOD", vec![dec("7"), dec("0")]).is_err());
    }

    #[test]
    fn round_half_up_variants() {
        assert_eq!(call("ROUND", vec![dec("2.5"), Value::Int(0)]).unwrap(), dec("3"));
        assert_eq!(call("ROUNDDOWN", vec![dec("2.99"), Value::Int(1)]).unwrap(), dec("2.9"));
        assert_eq!(call("ROUNDUP", vec![dec("2.01"), Value::Int(1)]).unwrap(), dec("2.1"));
        assert_eq!(call("ROUNDUP", vec![dec("-2.01"), Value::Int(1)]).unwrap(), dec("-2.1"));
    }

    #[test]
    fn max_min_abs_int() {
        assert_eq!(call("MAX", vec![dec("1"), dec("9"), dec("4")]).unwrap(), dec("9"));
        assert_eq!(call("MIN", vec![dec("1"), dec("9"), dec("4")]).unwrap(), dec("1"));
        assert_eq!(call("ABS", vec![dec("-5")]).unwrap(), dec("5"));
        assert_eq!(call("INT", vec![dec("4.7")]).unwrap(), dec("4"));
    }

    #[test]
    fn randbetween_stays_in_range() {
        let v = call("RANDBETWEEN", vec![Value::Int(1), Value::Int(1)]).unwrap();
        assert_eq!(v, Value::Int(1));
    }

    #[test]
    fn power_matches_decimal_pow() {
        assert_eq!(call("POWER", vec![dec("2"), dec("3")]).unwrap(), dec("8"));
    }
}
