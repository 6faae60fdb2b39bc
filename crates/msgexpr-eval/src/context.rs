//! The hierarchical variable store: case-insensitive dotted-path
//! lookup over a tree of `Value`s, plus the ambient zone/date-style/now
//! that both the value coercion table and the date parser read from.

use chrono::{DateTime, TimeZone};
use chrono_tz::Tz;

use msgexpr_common::{Container, DateParseMode, EvalError, Value, ValueCtx};

use crate::dates::{DateParser, DateStyle};

/// Caller-supplied variable store plus the zone/date-style/now every
/// evaluation reads coercions against.
pub struct Context {
    vars: Container,
    zone: Tz,
    date_style: DateStyle,
    now: DateTime<Tz>,
}

impl Context {
    pub fn new(now: DateTime<Tz>, zone: Tz, date_style: DateStyle) -> Self {
        Context {
            vars: Container::new(),
            zone,
            date_style,
            now,
        }
    }

    /// Convenience constructor anchored to the current wall-clock instant.
    pub fn now_in(zone: Tz, date_style: DateStyle) -> Self {
        Context::new(chrono::Utc::now().with_timezone(&zone), zone, date_style)
    }

    pub fn set(&mut self, key: impl Into<String>, value: Value) {
        self.vars.insert(key, value);
    }

    pub fn now(&self) -> DateTime<Tz> {
        self.now
    }

    pub fn zone_value(&self) -> Tz {
        self.zone
    }

    pub fn date_style(&self) -> DateStyle {
        self.date_style
    }

    /// A date parser configured with this context's (now, zone, date-style).
    pub fn get_date_parser(&self) -> DateParser {
        DateParser::new(self.now.naive_local(), self.zone, self.date_style)
    }

    /// `strftime` format string for dates under this context's date style,
    /// with an optional ` HH:mm` suffix.
    pub fn get_date_format(&self, include_time: bool) -> String {
        let base = match self.date_style {
            DateStyle::DayFirst => "%d-%m-%Y",
            DateStyle::MonthFirst => "%m-%d-%Y",
        };
        if include_time {
            format!("{base} %H:%M")
        } else {
            base.to_string()
        }
    }

    /// Resolves a dotted identifier chain against the variable tree
    /// Case-insensitive segment lookup, a container left at the
    /// end of the path collapses to its default or a sorted rendering,
    /// and descending into a non-container with path remaining is an error.
    pub fn resolve(&self, original: &str) -> Result<Value, EvalError> {
        let mut segments = original.split('.').map(|s| s.to_ascii_lowercase());
        let first = segments.next().ok_or_else(|| EvalError::UnresolvedVariable(original.to_string()))?;

        let mut current: &Value = self
            .vars
            .get(&first)
            .ok_or_else(|| EvalError::UnresolvedVariable(original.to_string()))?;

        for seg in segments {
            match current {
                Value::Container(c) => {
                    current = c
                        .get(&seg)
                        .ok_or_else(|| EvalError::UnresolvedVariable(original.to_string()))?;
                }
                _ => return Err(EvalError::UnresolvedVariable(original.to_string())),
            }
        }

        match current {
            Value::Container(c) => c.as_scalar(self),
            other => Ok(other.clone()),
        }
    }
}

impl ValueCtx for Context {
    fn zone(&self) -> Tz {
        self.zone
    }

    fn date_format(&self, include_time: bool) -> String {
        self.get_date_format(include_time)
    }

    fn parse_date_like(&self, text: &str, mode: DateParseMode) -> Option<Value> {
        self.get_date_parser().parse_located(text, mode).map(|(v, _)| v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

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
    fn resolves_nested_dotted_path_case_insensitively() {
        let mut c = ctx();
        let mut contact = Container::new();
        contact.insert("Name", Value::Str("Rowan".into()));
        c.set("contact", Value::Container(contact));
        assert_eq!(c.resolve("CONTACT.name").unwrap(), Value::Str("Rowan".into()));
    }

    #[test]
    fn missing_leaf_is_an_error() {
        let c = ctx();
        assert!(c.resolve("missing").is_err());
    }

    #[test]
    fn descending_into_scalar_is_an_error() {
        let mut c = ctx();
        c.set("age", Value::Int(30));
        assert!(c.resolve("age.sub").is_err());
    }

    #[test]
    fn container_without_default_renders_sorted() {
        let mut c = ctx();
        let mut fields = Container::new();
        fields.insert("b", Value::Str("2".into()));
        fields.insert("a", Value::Str("1".into()));
        c.set("fields", Value::Container(fields));
        assert_eq!(c.resolve("fields").unwrap(), Value::Str("a: 1\nb: 2".into()));
    }

    #[test]
    fn container_with_default_surfaces_default() {
        let mut c = ctx();
        let mut contact = Container::with_default(Value::Str("Rowan".into()));
        contact.insert("name", Value::Str("Rowan".into()));
        c.set("contact", Value::Container(contact));
        assert_eq!(c.resolve("contact").unwrap(), Value::Str("Rowan".into()));
    }

    #[test]
    fn date_format_follows_date_style() {
        let c = ctx();
        assert_eq!(c.get_date_format(false), "%d-%m-%Y");
        assert_eq!(c.get_date_format(true), "%d-%m-%Y %H:%M");
    }
}
