//! The runtime value model: a closed set of value kinds plus the total
//! coercion table between them.
//!
//! Coercion is parameterized over a small context trait (`ValueCtx`)
//! instead of being hard-wired to a concrete `Context` type, so this
//! crate doesn't need to depend on the date parser or the evaluator —
//! mirrors the way the original Python implementation threads a duck-typed
//! `ctx` argument through every `conversions.to_*` function.

use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveTime, TimeZone};
use chrono_tz::Tz;
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;

use crate::error::EvalError;

/// Which shape of temporal value a string should be parsed as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DateParseMode {
    Date,
    DateTime,
    Time,
    Auto,
}

/// Everything `Value`'s conversions need from the outside world: the
/// context's timezone, its date-rendering style, and a way to ask the
/// evaluator's date parser to interpret a free-form string.
pub trait ValueCtx {
    /// Timezone new `DateTime`s are anchored in when a source value carries none.
    fn zone(&self) -> Tz;

    /// `strftime`-style format string for dates, e.g. `"%d-%m-%Y"` or `"%m-%d-%Y"`.
    /// When `include_time` is set, a ` %H:%M` suffix is appended.
    fn date_format(&self, include_time: bool) -> String;

    /// Hands a string to the context's configured date parser. Returns
    /// `None` if nothing in `mode` could be recovered from `text`.
    fn parse_date_like(&self, text: &str, mode: DateParseMode) -> Option<Value>;
}

/// A runtime value. Immutable once produced.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Value {
    Bool(bool),
    Int(i64),
    Dec(Decimal),
    Str(String),
    Date(NaiveDate),
    Time(NaiveTime),
    DateTime(DateTime<Tz>),
    Container(Container),
}

/// An ordered, case-insensitively-keyed mapping from names to values,
/// with an optional scalar "default" surfaced by the keys `*` and
/// `__default__` and used whenever the container appears in a scalar
/// position.
#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Container {
    entries: Vec<(String, Value)>,
    default: Option<Box<Value>>,
}

impl PartialEq for Container {
    fn eq(&self, other: &Self) -> bool {
        self.default == other.default
            && self.entries.len() == other.entries.len()
            && self
                .entries
                .iter()
                .zip(other.entries.iter())
                .all(|(a, b)| a.0.eq_ignore_ascii_case(&b.0) && a.1 == b.1)
    }
}

impl Container {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_default(value: Value) -> Self {
        Container {
            entries: Vec::new(),
            default: Some(Box::new(value)),
        }
    }

    pub fn set_default(&mut self, value: Value) {
        self.default = Some(Box::new(value));
    }

    pub fn insert(&mut self, key: impl Into<String>, value: Value) {
        let key = key.into();
        if let Some(slot) = self
            .entries
            .iter_mut()
            .find(|(k, _)| k.eq_ignore_ascii_case(&key))
        {
            slot.1 = value;
        } else {
            self.entries.push((key, value));
        }
    }

    /// Case-insensitive lookup. `*` and `__default__` resolve to the
    /// container's distinguished default, bypassing regular entries.
    pub fn get(&self, key: &str) -> Option<&Value> {
        if key == "*" || key.eq_ignore_ascii_case("__default__") {
            return self.default.as_deref();
        }
        self.entries
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v)
    }

    pub fn default_value(&self) -> Option<&Value> {
        self.default.as_deref()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty() && self.default.is_none()
    }

    /// The value used when this container appears where a scalar is
    /// expected: the default if present, otherwise a sorted `key: value`
    /// rendering of every entry.
    pub fn as_scalar(&self, ctx: &dyn ValueCtx) -> Result<Value, EvalError> {
        if let Some(d) = &self.default {
            return Ok((**d).clone());
        }
        let mut keys: Vec<&str> = self.entries.iter().map(|(k, _)| k.as_str()).collect();
        keys.sort_unstable();
        let mut lines = Vec::with_capacity(keys.len());
        for k in keys {
            let v = self.get(k).expect("key came from entries");
            lines.push(format!("{k}: {}", v.to_display_string(ctx)?));
        }
        Ok(Value::Str(lines.join("\n")))
    }
}

impl Value {
    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::Bool(_) => "boolean",
            Value::Int(_) => "integer",
            Value::Dec(_) => "decimal",
            Value::Str(_) => "string",
            Value::Date(_) => "date",
            Value::Time(_) => "time",
            Value::DateTime(_) => "datetime",
            Value::Container(_) => "container",
        }
    }

    /// If this is a container, collapse it to its scalar form first (the
    /// default, or a sorted rendering). Otherwise returns a clone of self.
    fn scalarize(&self, ctx: &dyn ValueCtx) -> Result<Value, EvalError> {
        match self {
            Value::Container(c) => c.as_scalar(ctx),
            other => Ok(other.clone()),
        }
    }

    pub fn to_bool(&self, ctx: &dyn ValueCtx) -> Result<bool, EvalError> {
        let v = self.scalarize(ctx)?;
        match v {
            Value::Bool(b) => Ok(b),
            Value::Int(i) => Ok(i != 0),
            Value::Dec(d) => Ok(!d.is_zero()),
            Value::Str(s) => match s.to_ascii_lowercase().as_str() {
                "true" => Ok(true),
                "false" => Ok(false),
                _ => Err(EvalError::conversion(s, "boolean")),
            },
            Value::Date(_) | Value::Time(_) | Value::DateTime(_) => Ok(true),
            Value::Container(_) => unreachable!("scalarized above"),
        }
    }

    pub fn to_int(&self, ctx: &dyn ValueCtx) -> Result<i64, EvalError> {
        let v = self.scalarize(ctx)?;
        match v {
            Value::Bool(b) => Ok(if b { 1 } else { 0 }),
            Value::Int(i) => Ok(i),
            Value::Dec(d) => d
                .round_dp_with_strategy(0, rust_decimal::RoundingStrategy::MidpointAwayFromZero)
                .to_i64()
                .ok_or_else(|| EvalError::conversion(d.to_string(), "integer")),
            Value::Str(ref s) => s
                .trim()
                .parse::<i64>()
                .map_err(|_| EvalError::conversion(s.clone(), "integer")),
            other => Err(EvalError::conversion(format!("{other:?}"), "integer")),
        }
    }

    pub fn to_dec(&self, ctx: &dyn ValueCtx) -> Result<Decimal, EvalError> {
        let v = self.scalarize(ctx)?;
        match v {
            Value::Bool(b) => Ok(if b { Decimal::ONE } else { Decimal::ZERO }),
            Value::Int(i) => Ok(Decimal::from(i)),
            Value::Dec(d) => Ok(d),
            Value::Str(ref s) => s
                .trim()
                .parse::<Decimal>()
                .map_err(|_| EvalError::conversion(s.clone(), "decimal")),
            other => Err(EvalError::conversion(format!("{other:?}"), "decimal")),
        }
    }

    /// The canonical string form from the coercion table: the one
    /// every non-container `Value` has exactly one of.
    pub fn to_display_string(&self, ctx: &dyn ValueCtx) -> Result<String, EvalError> {
        match self {
            Value::Bool(b) => Ok(if *b { "TRUE".into() } else { "FALSE".into() }),
            Value::Int(i) => Ok(i.to_string()),
            Value::Dec(d) => Ok(format_decimal(*d)),
            Value::Str(s) => Ok(s.clone()),
            Value::Date(d) => Ok(format!("{}", d.format(&ctx.date_format(false)))),
            Value::Time(t) => Ok(format!("{}", t.format("%H:%M"))),
            Value::DateTime(dt) => Ok(dt.to_rfc3339()),
            Value::Container(c) => Ok(c.as_scalar(ctx)?.to_display_string(ctx)?),
        }
    }

    pub fn to_date(&self, ctx: &dyn ValueCtx) -> Result<NaiveDate, EvalError> {
        let v = self.scalarize(ctx)?;
        match v {
            Value::Date(d) => Ok(d),
            Value::DateTime(dt) => Ok(dt.naive_local().date()),
            Value::Str(ref s) => match ctx.parse_date_like(s, DateParseMode::Auto) {
                Some(Value::Date(d)) => Ok(d),
                Some(Value::DateTime(dt)) => Ok(dt.naive_local().date()),
                _ => Err(EvalError::conversion(s.clone(), "date")),
            },
            other => Err(EvalError::conversion(format!("{other:?}"), "date")),
        }
    }

    pub fn to_datetime(&self, ctx: &dyn ValueCtx) -> Result<DateTime<Tz>, EvalError> {
        let v = self.scalarize(ctx)?;
        match v {
            Value::DateTime(dt) => Ok(dt.with_timezone(&ctx.zone())),
            Value::Date(d) => {
                let midnight = d.and_hms_opt(0, 0, 0).expect("midnight is valid");
                Ok(ctx
                    .zone()
                    .from_local_datetime(&midnight)
                    .single()
                    .unwrap_or_else(|| ctx.zone().from_utc_datetime(&midnight)))
            }
            Value::Str(ref s) => match ctx.parse_date_like(s, DateParseMode::Auto) {
                Some(Value::DateTime(dt)) => Ok(dt.with_timezone(&ctx.zone())),
                Some(Value::Date(d)) => {
                    let midnight = d.and_hms_opt(0, 0, 0).expect("midnight is valid");
                    Ok(ctx
                        .zone()
                        .from_local_datetime(&midnight)
                        .single()
                        .unwrap_or_else(|| ctx.zone().from_utc_datetime(&midnight)))
                }
                _ => Err(EvalError::conversion(s.clone(), "datetime")),
            },
            other => Err(EvalError::conversion(format!("{other:?}"), "datetime")),
        }
    }

    pub fn to_time(&self, ctx: &dyn ValueCtx) -> Result<NaiveTime, EvalError> {
        let v = self.scalarize(ctx)?;
        match v {
            Value::Time(t) => Ok(t),
            Value::DateTime(dt) => Ok(dt.with_timezone(&ctx.zone()).naive_local().time()),
            Value::Str(ref s) => match ctx.parse_date_like(s, DateParseMode::Time) {
                Some(Value::Time(t)) => Ok(t),
                _ => Err(EvalError::conversion(s.clone(), "time")),
            },
            other => Err(EvalError::conversion(format!("{other:?}"), "time")),
        }
    }

    /// Canonical quoted form used when re-emitting unresolved expressions
    /// (`RESOLVE_AVAILABLE`): strings/dates/times are wrapped in double
    /// quotes with internal quotes doubled; everything else is its plain
    /// display string.
    pub fn repr(&self, ctx: &dyn ValueCtx) -> Result<String, EvalError> {
        match self {
            Value::Str(_) | Value::Date(_) | Value::Time(_) | Value::DateTime(_) => {
                let s = self.to_display_string(ctx)?;
                Ok(format!("\"{}\"", s.replace('"', "\"\"")))
            }
            other => other.to_display_string(ctx),
        }
    }
}

/// Normalizes a decimal's trailing fractional zeros and renders without
/// scientific notation, e.g. `2.0 -> "2"`, `0.4440000 -> "0.444"`.
pub fn format_decimal(d: Decimal) -> String {
    d.normalize().to_string()
}

/// `to_same(a, b)`: coerce two mismatched-kind values to a shared
/// kind for comparison/concatenation. Tries decimal, then date/datetime,
/// then string; first success wins.
pub fn to_same(a: &Value, b: &Value, ctx: &dyn ValueCtx) -> Result<(Value, Value), EvalError> {
    if let (Ok(da), Ok(db)) = (a.to_dec(ctx), b.to_dec(ctx)) {
        return Ok((Value::Dec(da), Value::Dec(db)));
    }
    if let (Ok(ta), Ok(tb)) = (a.to_datetime(ctx), b.to_datetime(ctx)) {
        return Ok((Value::DateTime(ta), Value::DateTime(tb)));
    }
    Ok((
        Value::Str(a.to_display_string(ctx)?),
        Value::Str(b.to_display_string(ctx)?),
    ))
}

impl fmt::Display for DateParseMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?}")
    }
}
