//! Text functions.

use msgexpr_common::{ArgKind, EvalError, ParamSpec, Signature, Value};
use rust_decimal::RoundingStrategy;

use crate::context::Context;

use super::SimpleFn;

pub(super) fn functions() -> Vec<SimpleFn> {
    vec![
        SimpleFn {
            name: "CHAR",
            doc: "Returns the character specified by a number",
            sig: Signature::new(vec![ParamSpec::required("number", ArgKind::Number)]),
            call: |ctx, args| {
                let code = args[0].to_int(ctx)?;
                char::from_u32(code as u32)
                    .map(|c| Value::Str(c.to_string()))
                    .ok_or_else(|| EvalError::Arithmetic(format!("{code} is not a valid character code")))
            },
        },
        SimpleFn {
            name: "CLEAN",
            doc: "Removes all non-printable characters from a text string",
            sig: Signature::new(vec![ParamSpec::required("text", ArgKind::Text)]),
            call: |ctx, args| {
                let text = args[0].to_display_string(ctx)?;
                Ok(Value::Str(text.chars().filter(|c| !c.is_control()).collect()))
            },
        },
        SimpleFn {
            name: "CODE",
            doc: "Returns a numeric code for the first character in a text string",
            sig: Signature::new(vec![ParamSpec::required("text", ArgKind::Text)]),
            call: |ctx, args| {
                let text = args[0].to_display_string(ctx)?;
                let code = text.chars().next().map(|c| c as i64).unwrap_or(0);
                Ok(Value::Int(code))
            },
        },
        SimpleFn {
            name: "CONCATENATE",
            doc: "Joins text strings into one text string",
            sig: Signature::new(vec![ParamSpec::required("text", ArgKind::Text)]).with_variadic("more_text"),
            call: |ctx, args| {
                let mut out = String::new();
                for a in &args {
                    out.push_str(&a.to_display_string(ctx)?);
                }
                Ok(Value::Str(out))
            },
        },
        SimpleFn {
            name: "FIXED",
            doc: "Formats a number with a fixed number of decimal places",
            sig: Signature::new(vec![
                ParamSpec::required("number", ArgKind::Number),
                ParamSpec::optional("decimals", ArgKind::Number, Value::Int(2)),
                ParamSpec::optional("no_commas", ArgKind::Logical, Value::Bool(false)),
            ]),
            call: |ctx, args| {
                let number = args[0].to_dec(ctx)?;
                let decimals = args[1].to_int(ctx)?;
                let no_commas = args[2].to_bool(ctx)?;
                Ok(Value::Str(format_fixed(number, decimals, no_commas)))
            },
        },
        SimpleFn {
            name: "LEFT",
            doc: "Returns the leftmost characters from a text string",
            sig: Signature::new(vec![
                ParamSpec::required("text", ArgKind::Text),
                ParamSpec::optional("num_chars", ArgKind::Number, Value::Int(1)),
            ]),
            call: |ctx, args| {
                let text = args[0].to_display_string(ctx)?;
                let n = args[1].to_int(ctx)?.max(0) as usize;
                Ok(Value::Str(text.chars().take(n).collect()))
            },
        },
        SimpleFn {
            name: "LEN",
            doc: "Returns the number of characters in a text string",
            sig: Signature::new(vec![ParamSpec::required("text", ArgKind::Text)]),
            call: |ctx, args| Ok(Value::Int(args[0].to_display_string(ctx)?.chars().count() as i64)),
        },
        SimpleFn {
            name: "LOWER",
            doc: "Converts a text string to lowercase",
            sig: Signature::new(vec![ParamSpec::required("text", ArgKind::Text)]),
            call: |ctx, args| Ok(Value::Str(args[0].to_display_string(ctx)?.to_lowercase())),
        },
        SimpleFn {
            name: "PROPER",
            doc: "Capitalizes the first letter of every word in a text string",
            sig: Signature::new(vec![ParamSpec::required("text", ArgKind::Text)]),
            call: |ctx, args| Ok(Value::Str(proper_case(&args[0].to_display_string(ctx)?))),
        },
        SimpleFn {
            name: "REPT",
            doc: "Repeats text a given number of times",
            sig: Signature::new(vec![
                ParamSpec::required("text", ArgKind::Text),
                ParamSpec::required("number_times", ArgKind::Number),
            ]),
            call: |ctx, args| {
                let text = args[0].to_display_string(ctx)?;
                let n = args[1].to_int(ctx)?.max(0) as usize;
                Ok(Value::Str(text.repeat(n)))
            },
        },
        SimpleFn {
            name: "RIGHT",
            doc: "Returns the rightmost characters from a text string",
            sig: Signature::new(vec![
                ParamSpec::required("text", ArgKind::Text),
                ParamSpec::optional("num_chars", ArgKind::Number, Value::Int(1)),
            ]),
            call: |ctx, args| {
                let text = args[0].to_display_string(ctx)?;
                let n = args[1].to_int(ctx)?.max(0) as usize;
                let chars: Vec<char> = text.chars().collect();
                let start = chars.len().saturating_sub(n);
                Ok(Value::Str(chars[start..].iter().collect()))
            },
        },
        SimpleFn {
            name: "SUBSTITUTE",
            doc: "Substitutes new text for old text in a text string",
            sig: Signature::new(vec![
                ParamSpec::required("text", ArgKind::Text),
                ParamSpec::required("old_text", ArgKind::Text),
                ParamSpec::required("new_text", ArgKind::Text),
                ParamSpec::optional("instance", ArgKind::Number, Value::Int(-1)),
            ]),
            call: |ctx, args| {
                let text = args[0].to_display_string(ctx)?;
                let old = args[1].to_display_string(ctx)?;
                let new = args[2].to_display_string(ctx)?;
                let instance = args[3].to_int(ctx)?;
                Ok(Value::Str(substitute(&text, &old, &new, instance)))
            },
        },
        SimpleFn {
            name: "UNICHAR",
            doc: "Returns the unicode character referenced by a number",
            sig: Signature::new(vec![ParamSpec::required("number", ArgKind::Number)]),
            call: |ctx, args| {
                let code = args[0].to_int(ctx)?;
                char::from_u32(code as u32)
                    .map(|c| Value::Str(c.to_string()))
                    .ok_or_else(|| EvalError::Arithmetic(format!("{code} is not a valid character code")))
            },
        },
        SimpleFn {
            name: "UNICODE",
            doc: "Returns the unicode number for the first character in a text string",
            sig: Signature::new(vec![ParamSpec::required("text", ArgKind::Text)]),
            call: |ctx, args| {
                let text = args[0].to_display_string(ctx)?;
                let code = text.chars().next().map(|c| c as i64).unwrap_or(0);
                Ok(Value::Int(code))
            },
        },
        SimpleFn {
            name: "UPPER",
            doc: "Converts a text string to uppercase",
            sig: Signature::new(vec![ParamSpec::required("text", ArgKind::Text)]),
            call: |ctx, args| Ok(Value::Str(args[0].to_display_string(ctx)?.to_uppercase())),
        },
    ]
}

fn proper_case(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut start_of_word = true;
    for c in text.chars() {
        if c.is_alphabetic() {
            if start_of_word {
                out.extend(c.to_uppercase());
            } else {
                out.extend(c.to_lowercase());
            }
            start_of_word = false;
        } else {
            out.push(c);
            start_of_word = true;
        }
    }
    out
}

/// Replaces every occurrence of `old` with `new` when `instance < 0`,
/// otherwise only the `instance`-th (1-based) occurrence.
fn substitute(text: &str, old: &str, new: &str, instance: i64) -> String {
    if old.is_empty() {
        return text.to_string();
    }
    if instance < 0 {
        return text.replace(old, new);
    }
    let target = instance.max(1) as usize;
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    let mut count = 0usize;
    loop {
        match rest.find(old) {
            Some(idx) => {
                count += 1;
                out.push_str(&rest[..idx]);
                if count == target {
                    out.push_str(new);
                } else {
                    out.push_str(old);
                }
                rest = &rest[idx + old.len()..];
            }
            None => {
                out.push_str(rest);
                break;
            }
        }
    }
    out
}

fn format_fixed(value: rust_decimal::Decimal, decimals: i64, no_commas: bool) -> String {
    let scale = decimals.max(0) as u32;
    let rounded = value.round_dp_with_strategy(scale, RoundingStrategy::MidpointAwayFromZero);
    let s = rounded.to_string();
    if no_commas {
        return s;
    }
    let (sign, rest) = match s.strip_prefix('-') {
        Some(r) => ("-", r),
        None => ("", s.as_str()),
    };
    let (int_part, frac_part) = match rest.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (rest, None),
    };
    let grouped = group_thousands(int_part);
    match frac_part {
        Some(f) => format!("{sign}{grouped}.{f}"),
        None => format!("{sign}{grouped}"),
    }
}

fn group_thousands(digits: &str) -> String {
    let len = digits.len();
    if len <= 3 {
        return digits.to_string();
    }
    let first_group = len % 3;
    let first_group = if first_group == 0 { 3 } else { first_group };
    let mut out = String::with_capacity(len + len / 3);
    out.push_str(&digits[..first_group]);
    let mut i = first_group;
    while i < len {
        out.push(',');
        out.push_str(&digits[i..i + 3]);
        i += 3;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dates::DateStyle;
    use chrono::{NaiveDate, TimeZone};

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

    #[test]
    fn fixed_rounds_and_formats() {
        let v = call("FIXED", vec![Value::Dec("1234.5678".parse().unwrap()), Value::Int(1), Value::Bool(true)]).unwrap();
        assert_eq!(v, Value::Str("1234.6".into()));
    }

    #[test]
    fn fixed_default_decimals_adds_commas() {
        let v = call("FIXED", vec![Value::Dec("1234567.891".parse().unwrap())]).unwrap();
        assert_eq!(v, Value::Str("1,234,567.89".into()));
    }

    #[test]
    fn substitute_replaces_nth_instance_only() {
        let v = call(
            "SUBSTITUTE",
            vec![
                Value::Str("a-b-c-b".into()),
                Value::Str("b".into()),
                Value::Str("X".into()),
                Value::Int(2),
            ],
        )
        .unwrap();
        assert_eq!(v, Value::Str("a-b-c-X".into()));
    }

    #[test]
    fn proper_capitalizes_each_word() {
        let v = call("PROPER", vec![Value::Str("hello WORLD".into())]).unwrap();
        assert_eq!(v, Value::Str("Hello World".into()));
    }

    #[test]
    fn left_right_slice_by_chars() {
        assert_eq!(call("LEFT", vec![Value::Str("hello".into()), Value::Int(2)]).unwrap(), Value::Str("he".into()));
        assert_eq!(call("RIGHT", vec![Value::Str("hello".into()), Value::Int(2)]).unwrap(), Value::Str("lo".into()));
    }

    #[test]
    fn concatenate_joins_coerced_args() {
        let v = call("CONCATENATE", vec![Value::Str("a".into()), Value::Int(1), Value::Bool(true)]).unwrap();
        assert_eq!(v, Value::Str("a1TRUE".into()));
    }
}
