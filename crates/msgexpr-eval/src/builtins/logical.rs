//! Logical functions.

use msgexpr_common::{ArgKind, ParamSpec, Signature, Value};

use super::SimpleFn;

pub(super) fn functions() -> Vec<SimpleFn> {
    vec![
        SimpleFn {
            name: "AND",
            doc: "Returns TRUE if and only if all arguments are TRUE",
            sig: Signature::new(vec![ParamSpec::required("logical", ArgKind::Logical)]).with_variadic("more_logicals"),
            call: |ctx, args| {
                for a in &args {
                    if !a.to_bool(ctx)? {
                        return Ok(Value::Bool(false));
                    }
                }
                Ok(Value::Bool(true))
            },
        },
        SimpleFn {
            name: "FALSE",
            doc: "Returns the logical value FALSE",
            sig: Signature::new(vec![]),
            call: |_ctx, _args| Ok(Value::Bool(false)),
        },
        SimpleFn {
            name: "IF",
            doc: "Returns one value if the condition is TRUE and another if it is FALSE",
            sig: Signature::new(vec![
                ParamSpec::required("logical_test", ArgKind::Logical),
                ParamSpec::optional("value_if_true", ArgKind::Any, Value::Int(0)),
                ParamSpec::optional("value_if_false", ArgKind::Any, Value::Bool(false)),
            ]),
            call: |ctx, args| {
                if args[0].to_bool(ctx)? {
                    Ok(args[1].clone())
                } else {
                    Ok(args[2].clone())
                }
            },
        },
        SimpleFn {
            name: "OR",
            doc: "Returns TRUE if any argument is TRUE",
            sig: Signature::new(vec![ParamSpec::required("logical", ArgKind::Logical)]).with_variadic("more_logicals"),
            call: |ctx, args| {
                for a in &args {
                    if a.to_bool(ctx)? {
                        return Ok(Value::Bool(true));
                    }
                }
                Ok(Value::Bool(false))
            },
        },
        SimpleFn {
            name: "TRUE",
            doc: "Returns the logical value TRUE",
            sig: Signature::new(vec![]),
            call: |_ctx, _args| Ok(Value::Bool(true)),
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Context;
    use crate::dates::DateStyle;
    use chrono::{NaiveDate, TimeZone};

    fn ctx() -> Context {
        let now = chrono_tz::UTC.from_local_datetime(
            &NaiveDate::from_ymd_opt(2015, 8, 14).unwrap().and_hms_opt(0, 0, 0).unwrap(),
        ).unwrap();
        Context::new(now, chrono_tz::UTC, DateStyle::DayFirst)
    }

    fn call(name: &str, args: Vec<Value>) -> Result<Value, msgexpr_common::EvalError> {
        let c = ctx();
        let reg = crate::registry::Registry::new(super::super::all_functions());
        reg.invoke(&c, name, args)
    }

    #[test]
    fn and_or_short_circuit_semantics() {
        assert_eq!(call("AND", vec![Value::Bool(true), Value::Bool(true)]).unwrap(), Value::Bool(true));
        assert_eq!(call("AND", vec![Value::Bool(true), Value::Bool(false)]).unwrap(), Value::Bool(false));
        assert_eq!(call("OR", vec![Value::Bool(false), Value::Bool(true)]).unwrap(), Value::Bool(true));
    }

    #[test]
    fn if_picks_branch_by_condition() {
        assert_eq!(
            call("IF", vec![Value::Bool(true), Value::Str("yes".into()), Value::Str("no".into())]).unwrap(),
            Value::Str("yes".into())
        );
        assert_eq!(
            call("IF", vec![Value::Bool(false), Value::Str("yes".into()), Value::Str("no".into())]).unwrap(),
            Value::Str("no".into())
        );
    }

    #[test]
    fn true_false_constants() {
        assert_eq!(call("TRUE", vec![]).unwrap(), Value::Bool(true));
        assert_eq!(call("FALSE", vec![]).unwrap(), Value::Bool(false));
    }
}
