//! The locale-grown "custom" functions that aren't part of Excel's
//! catalogue, plus `EPOCH`: word splitting/slicing,
//! phone-number read-back, percent/location/date formatting, and
//! regex-group extraction.

use regex::RegexBuilder;
use rust_decimal::Decimal;

use msgexpr_common::{ArgKind, EvalError, ParamSpec, Signature, Value};

use crate::context::Context;
use crate::utils::tokenize;

use super::SimpleFn;

pub(super) fn functions() -> Vec<SimpleFn> {
    vec![
        SimpleFn {
            name: "FIELD",
            doc: "Reference a field in a string separated by a delimiter",
            sig: Signature::new(vec![
                ParamSpec::required("text", ArgKind::Text),
                ParamSpec::required("index", ArgKind::Number),
                ParamSpec::optional("delimiter", ArgKind::Text, Value::Str(" ".into())),
            ]),
            call: |ctx, args| {
                let text = args[0].to_display_string(ctx)?;
                let index = args[1].to_int(ctx)?;
                let delimiter = args[2].to_display_string(ctx)?;
                if index < 1 {
                    return Err(EvalError::Arithmetic("Field index cannot be less than 1".into()));
                }
                let splits: Vec<&str> = text
                    .split(delimiter.as_str())
                    .filter(|f| *f != delimiter && !f.trim().is_empty())
                    .collect();
                let idx = index as usize;
                Ok(Value::Str(splits.get(idx - 1).map(|s| s.to_string()).unwrap_or_default()))
            },
        },
        SimpleFn {
            name: "FIRST_WORD",
            doc: "Returns the first word in the given text string",
            sig: Signature::new(vec![ParamSpec::required("text", ArgKind::Text)]),
            call: |ctx, args| {
                let text = args[0].to_display_string(ctx)?;
                Ok(Value::Str(words_of(&text, false).into_iter().next().unwrap_or_default()))
            },
        },
        SimpleFn {
            name: "PERCENT",
            doc: "Formats a number as a percentage",
            sig: Signature::new(vec![ParamSpec::required("number", ArgKind::Number)]),
            call: |ctx, args| {
                let n = args[0].to_dec(ctx)? * Decimal::ONE_HUNDRED;
                let rounded = crate::utils::decimal_round(n, 0);
                Ok(Value::Str(format!("{rounded}%")))
            },
        },
        SimpleFn {
            name: "EPOCH",
            doc: "Converts the given date to the number of seconds since January 1st, 1970 UTC",
            sig: Signature::new(vec![ParamSpec::required("datetime", ArgKind::Date)]),
            call: |ctx, args| {
                let dt = args[0].to_datetime(ctx)?;
                let secs = Decimal::from(dt.timestamp());
                let nanos = Decimal::from(dt.timestamp_subsec_nanos()) / Decimal::from(1_000_000_000i64);
                Ok(Value::Dec(secs + nanos))
            },
        },
        SimpleFn {
            name: "READ_DIGITS",
            doc: "Formats digits in text for reading in TTS",
            sig: Signature::new(vec![ParamSpec::required("text", ArgKind::Text)]),
            call: |ctx, args| {
                let text = args[0].to_display_string(ctx)?;
                Ok(Value::Str(read_digits(text.trim())))
            },
        },
        SimpleFn {
            name: "REMOVE_FIRST_WORD",
            doc: "Removes the first word from the given text string",
            sig: Signature::new(vec![ParamSpec::required("text", ArgKind::Text)]),
            call: |ctx, args| {
                let text = args[0].to_display_string(ctx)?;
                Ok(Value::Str(remove_first_word(&text)))
            },
        },
        SimpleFn {
            name: "WORD",
            doc: "Extracts the nth word from the given text string",
            sig: Signature::new(vec![
                ParamSpec::required("text", ArgKind::Text),
                ParamSpec::required("number", ArgKind::Number),
                ParamSpec::optional("by_spaces", ArgKind::Logical, Value::Bool(false)),
            ]),
            call: |ctx, args| {
                let text = args[0].to_display_string(ctx)?;
                let number = args[1].to_int(ctx)?;
                let by_spaces = args[2].to_bool(ctx)?;
                word_slice(&text, number, number + 1, by_spaces)
            },
        },
        SimpleFn {
            name: "WORD_COUNT",
            doc: "Returns the number of words in the given text string",
            sig: Signature::new(vec![
                ParamSpec::required("text", ArgKind::Text),
                ParamSpec::optional("by_spaces", ArgKind::Logical, Value::Bool(false)),
            ]),
            call: |ctx, args| {
                let text = args[0].to_display_string(ctx)?;
                let by_spaces = args[1].to_bool(ctx)?;
                Ok(Value::Int(words_of(&text, by_spaces).len() as i64))
            },
        },
        SimpleFn {
            name: "WORD_SLICE",
            doc: "Extracts a substring spanning from start up to but not-including stop",
            sig: Signature::new(vec![
                ParamSpec::required("text", ArgKind::Text),
                ParamSpec::required("start", ArgKind::Number),
                ParamSpec::optional("stop", ArgKind::Number, Value::Int(0)),
                ParamSpec::optional("by_spaces", ArgKind::Logical, Value::Bool(false)),
            ]),
            call: |ctx, args| {
                let text = args[0].to_display_string(ctx)?;
                let start = args[1].to_int(ctx)?;
                let stop = args[2].to_int(ctx)?;
                let by_spaces = args[3].to_bool(ctx)?;
                word_slice(&text, start, stop, by_spaces)
            },
        },
        SimpleFn {
            name: "FORMAT_DATE",
            doc: "Formats a date value using the context's configured date format",
            sig: Signature::new(vec![ParamSpec::required("text", ArgKind::Date)]),
            call: |ctx, args| {
                let dt = args[0].to_datetime(ctx)?.with_timezone(&ctx.zone_value());
                Ok(Value::Str(dt.format(&ctx.get_date_format(true)).to_string()))
            },
        },
        SimpleFn {
            name: "FORMAT_LOCATION",
            doc: "Takes an administrative boundary path and returns the name of its leaf boundary",
            sig: Signature::new(vec![ParamSpec::required("text", ArgKind::Text)]),
            call: |ctx, args| {
                let text = args[0].to_display_string(ctx)?;
                Ok(Value::Str(text.rsplit('>').next().unwrap_or("").trim().to_string()))
            },
        },
        SimpleFn {
            name: "REGEX_GROUP",
            doc: "Matches text against a regular expression and returns the value of the given group",
            sig: Signature::new(vec![
                ParamSpec::required("text", ArgKind::Text),
                ParamSpec::required("pattern", ArgKind::Text),
                ParamSpec::optional("group_num", ArgKind::Number, Value::Int(0)),
            ]),
            call: |ctx, args| {
                let text = args[0].to_display_string(ctx)?;
                let pattern = args[1].to_display_string(ctx)?;
                let group_num = args[2].to_int(ctx)?;
                regex_group(&text, &pattern, group_num)
            },
        },
    ]
}

/// Splits text into words. When `by_spaces` is set, words are whitespace
/// runs; otherwise (the default, kept for backwards compatibility with
/// every other word function) punctuation like `-`/`.` also splits, e.g.
/// `"01-02-2014"` becomes three words.
fn words_of(text: &str, by_spaces: bool) -> Vec<String> {
    if by_spaces {
        text.split_whitespace().map(|s| s.to_string()).collect()
    } else {
        tokenize(text)
    }
}

fn word_slice(text: &str, start: i64, stop: i64, by_spaces: bool) -> Result<Value, EvalError> {
    if start == 0 {
        return Err(EvalError::Arithmetic("Start word cannot be zero".into()));
    }
    let start = if start > 0 { start - 1 } else { start };
    let stop = if stop == 0 {
        None
    } else if stop > 0 {
        Some(stop - 1)
    } else {
        Some(stop)
    };

    let words = words_of(text, by_spaces);
    let len = words.len() as i64;
    let start_idx = normalize_index(len, start);
    let stop_idx = match stop {
        Some(s) => normalize_index(len, s),
        None => len as usize,
    };
    if start_idx >= stop_idx {
        return Ok(Value::Str(String::new()));
    }
    Ok(Value::Str(words[start_idx..stop_idx].join(" ")))
}

/// Python slice-index normalization: negative indices count from the
/// end (clamped at 0), positive indices clamp at `len`.
fn normalize_index(len: i64, idx: i64) -> usize {
    let resolved = if idx < 0 { (len + idx).max(0) } else { idx.min(len) };
    resolved as usize
}

fn remove_first_word(text: &str) -> String {
    let trimmed = text.trim_start();
    let first = words_of(trimmed, false).into_iter().next().unwrap_or_default();
    if first.is_empty() {
        return String::new();
    }
    let first_len = first.chars().count();
    let rest: String = trimmed.chars().skip(first_len).collect();
    rest.trim_start().to_string()
}

fn read_digits(text: &str) -> String {
    if text.is_empty() {
        return String::new();
    }
    let text = text.strip_prefix('+').unwrap_or(text);
    let digits: Vec<char> = text.chars().collect();
    let len = digits.len();

    if len == 9 {
        let a: String = digits[0..3].iter().map(|c| c.to_string()).collect::<Vec<_>>().join(" ");
        let b: String = digits[3..5].iter().map(|c| c.to_string()).collect::<Vec<_>>().join(" ");
        let c: String = digits[5..9].iter().map(|c| c.to_string()).collect::<Vec<_>>().join(" ");
        return format!("{a} , {b} , {c}");
    }

    if len % 3 == 0 && len > 3 {
        return chunk_join(&digits, 3);
    }
    if len % 4 == 0 {
        return chunk_join(&digits, 4);
    }
    digits.iter().map(|c| c.to_string()).collect::<Vec<_>>().join(",")
}

/// Groups `digits` into `size`-digit chunks joined by `,`, then spells
/// every character of that joined string (digits and commas alike)
/// space-separated, e.g. `["123","456"]` -> `"123,456"` -> `"1 2 3 , 4 5 6"`.
fn chunk_join(digits: &[char], size: usize) -> String {
    let joined: String = digits
        .chunks(size)
        .map(|chunk| chunk.iter().collect::<String>())
        .collect::<Vec<_>>()
        .join(",");
    joined.chars().map(|c| c.to_string()).collect::<Vec<_>>().join(" ")
}

fn regex_group(text: &str, pattern: &str, group_num: i64) -> Result<Value, EvalError> {
    let re = RegexBuilder::new(pattern)
        .case_insensitive(true)
        .multi_line(true)
        .unicode(true)
        .build()
        .map_err(|e| EvalError::Arithmetic(format!("Invalid pattern: {e}")))?;

    let caps = match re.captures(text) {
        Some(c) => c,
        None => return Ok(Value::Str(String::new())),
    };

    if group_num < 0 || group_num as usize >= caps.len() {
        return Err(EvalError::Arithmetic(format!("No such matching group {group_num}")));
    }
    Ok(Value::Str(caps.get(group_num as usize).map(|m| m.as_str()).unwrap_or("").to_string()))
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
    fn field_extracts_by_delimiter() {
        let v = call(
            "FIELD",
            vec![Value::Str("a,b,c".into()), Value::Int(2), Value::Str(",".into())],
        )
        .unwrap();
        assert_eq!(v, Value::Str("b".into()));
    }

    #[test]
    fn word_and_word_count_split_on_punctuation_by_default() {
        assert_eq!(
            call("WORD", vec![Value::Str("01-02-2014".into()), Value::Int(2)]).unwrap(),
            Value::Str("02".into())
        );
        assert_eq!(
            call("WORD_COUNT", vec![Value::Str("01-02-2014".into())]).unwrap(),
            Value::Int(3)
        );
    }

    #[test]
    fn word_slice_handles_negative_and_open_stop() {
        let v = call(
            "WORD_SLICE",
            vec![Value::Str("the quick brown fox".into()), Value::Int(2), Value::Int(0)],
        )
        .unwrap();
        assert_eq!(v, Value::Str("quick brown fox".into()));

        let v = call(
            "WORD_SLICE",
            vec![Value::Str("the quick brown fox".into()), Value::Int(-2), Value::Int(0)],
        )
        .unwrap();
        assert_eq!(v, Value::Str("brown fox".into()));
    }

    #[test]
    fn first_word_and_remove_first_word() {
        assert_eq!(call("FIRST_WORD", vec![Value::Str("hello world".into())]).unwrap(), Value::Str("hello".into()));
        assert_eq!(
            call("REMOVE_FIRST_WORD", vec![Value::Str("hello world".into())]).unwrap(),
            Value::Str("world".into())
        );
    }

    #[test]
    fn percent_rounds_to_nearest_integer() {
        assert_eq!(call("PERCENT", vec![Value::Str("0.754".into())]).unwrap(), Value::Str("75%".into()));
    }

    #[test]
    fn read_digits_chunks_by_triplets_or_quads() {
        assert_eq!(call("READ_DIGITS", vec![Value::Str("123456".into())]).unwrap(), Value::Str("1 2 3 , 4 5 6".into()));
        assert_eq!(call("READ_DIGITS", vec![Value::Str("1234".into())]).unwrap(), Value::Str("1 2 3 4".into()));
        assert_eq!(
            call("READ_DIGITS", vec![Value::Str("1234567890123456".into())]).unwrap(),
            Value::Str("1 2 3 4 , 5 6 7 8 , 9 0 1 2 , 3 4 5 6".into())
        );
    }

    #[test]
    fn format_location_takes_the_leaf_boundary() {
        assert_eq!(
            call("FORMAT_LOCATION", vec![Value::Str("Rwanda > Kigali > Gasabo".into())]).unwrap(),
            Value::Str("Gasabo".into())
        );
    }

    #[test]
    fn regex_group_extracts_the_requested_group() {
        let v = call(
            "REGEX_GROUP",
            vec![
                Value::Str("+27821234567".into()),
                Value::Str(r"(\d+)-(\d+)".into()),
                Value::Int(2),
            ],
        );
        // no match in this input -> empty string, not an error
        assert_eq!(v.unwrap(), Value::Str(String::new()));

        let v = call(
            "REGEX_GROUP",
            vec![
                Value::Str("host:8080".into()),
                Value::Str(r"(\w+):(\d+)".into()),
                Value::Int(2),
            ],
        )
        .unwrap();
        assert_eq!(v, Value::Str("8080".into()));
    }

    #[test]
    fn epoch_converts_to_unix_seconds() {
        let v = call("EPOCH", vec![Value::Str("01-01-1970 00:00".into())]).unwrap();
        match v {
            Value::Dec(d) => assert_eq!(d, Decimal::ZERO),
            other => panic!("expected decimal, got {other:?}"),
        }
    }
}
