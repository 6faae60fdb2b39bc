//! Flexible free-form date/time parser.
//!
//! Tokenizes a string into maximal digit- or letter-runs, classifies each
//! token into the set of components it could plausibly represent, then
//! tries component-sequence hypotheses (day-first vs month-first) until
//! one produces a real date/time/datetime. Grounded on the same two-pass
//! tokenize-then-hypothesize design as the source's `DateLexer`/`DateParser`.

use std::collections::HashMap;

use chrono::{Datelike, NaiveDate, NaiveDateTime, NaiveTime, TimeZone};
use chrono_tz::Tz;
use once_cell::sync::Lazy;

use msgexpr_common::{DateParseMode, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DateStyle {
    DayFirst,
    MonthFirst,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Component {
    Year,
    Month,
    Day,
    Hour,
    Minute,
    HourAndMinute,
    Second,
    Nano,
    AmPm,
    Offset,
}

const AM: i64 = 0;
const PM: i64 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TokenKind {
    Numeric,
    Alphabetic,
}

struct LexToken<'a> {
    kind: TokenKind,
    text: &'a str,
    start: usize,
    end: usize,
}

fn lex(text: &str) -> Vec<LexToken<'_>> {
    let mut tokens = Vec::new();
    let mut state: Option<TokenKind> = None;
    let mut start = 0usize;
    for (i, c) in text.char_indices() {
        let cur = if c.is_alphabetic() {
            Some(TokenKind::Alphabetic)
        } else if c.is_ascii_digit() {
            Some(TokenKind::Numeric)
        } else {
            None
        };
        if cur != state {
            if let Some(kind) = state {
                tokens.push(LexToken { kind, text: &text[start..i], start, end: i });
            }
            if cur.is_some() {
                start = i;
            }
            state = cur;
        }
    }
    if let Some(kind) = state {
        tokens.push(LexToken { kind, text: &text[start..], start, end: text.len() });
    }
    tokens
}

static MONTHS_BY_ALIAS: Lazy<HashMap<&'static str, u32>> = Lazy::new(|| {
    let raw = include_str!("../resources/month_aliases.txt");
    let mut map = HashMap::new();
    for (i, line) in raw.lines().filter(|l| !l.trim().is_empty()).enumerate() {
        let month = (i + 1) as u32;
        for alias in line.split(',') {
            let alias = alias.trim();
            if !alias.is_empty() {
                map.insert(alias, month);
            }
        }
    }
    map
});

type Possibilities = HashMap<Component, i64>;

fn token_possibilities(tok: &LexToken, mode: DateParseMode) -> Possibilities {
    let mut p = Possibilities::new();
    match tok.kind {
        TokenKind::Numeric => {
            let Ok(as_int) = tok.text.parse::<i64>() else {
                return p;
            };
            let len = tok.text.len();
            if mode != DateParseMode::Time {
                if (1..=9999).contains(&as_int) && (len == 2 || len == 4) {
                    p.insert(Component::Year, as_int);
                }
                if (1..=12).contains(&as_int) {
                    p.insert(Component::Month, as_int);
                }
                if (1..=31).contains(&as_int) {
                    p.insert(Component::Day, as_int);
                }
            }
            if mode != DateParseMode::Date {
                if (0..=23).contains(&as_int) {
                    p.insert(Component::Hour, as_int);
                }
                if (0..=59).contains(&as_int) {
                    p.insert(Component::Minute, as_int);
                    p.insert(Component::Second, as_int);
                }
                if len == 3 || len == 6 || len == 9 {
                    let nano = match len {
                        3 => as_int * 1_000_000,
                        6 => as_int * 1_000,
                        _ => as_int,
                    };
                    p.insert(Component::Nano, nano);
                }
                if len == 4 {
                    let hour = as_int / 100;
                    let minute = as_int - hour * 100;
                    if (1..=24).contains(&hour) && (1..=59).contains(&minute) {
                        p.insert(Component::HourAndMinute, as_int);
                    }
                }
            }
        }
        TokenKind::Alphabetic => {
            let lower = tok.text.to_lowercase();
            if mode != DateParseMode::Time {
                if let Some(&month) = MONTHS_BY_ALIAS.get(lower.as_str()) {
                    p.insert(Component::Month, month as i64);
                }
            }
            if mode != DateParseMode::Date {
                if lower == "am" {
                    p.insert(Component::AmPm, AM);
                } else if lower == "pm" {
                    p.insert(Component::AmPm, PM);
                }
                if lower == "z" {
                    p.insert(Component::Offset, 0);
                }
            }
        }
    }
    p
}

fn date_sequences(style: DateStyle) -> [&'static [Component]; 6] {
    use Component::*;
    match style {
        DateStyle::DayFirst => [
            &[Day, Month, Year],
            &[Month, Day, Year],
            &[Year, Month, Day],
            &[Day, Month],
            &[Month, Day],
            &[Month, Year],
        ],
        DateStyle::MonthFirst => [
            &[Month, Day, Year],
            &[Day, Month, Year],
            &[Year, Month, Day],
            &[Month, Day],
            &[Day, Month],
            &[Month, Year],
        ],
    }
}

const TIME_SEQUENCES: [&[Component]; 7] = {
    use Component::*;
    [
        &[HourAndMinute],
        &[Hour, Minute],
        &[Hour, Minute, AmPm],
        &[Hour, Minute, Second],
        &[Hour, Minute, Second, AmPm],
        &[Hour, Minute, Second, Nano],
        &[Hour, Minute, Second, Nano, Offset],
    ]
};

fn possible_sequences(mode: DateParseMode, length: usize, style: DateStyle) -> Vec<Vec<Component>> {
    let mut out = Vec::new();
    let dates = date_sequences(style);

    if matches!(mode, DateParseMode::Date | DateParseMode::Auto) {
        out.extend(dates.iter().filter(|s| s.len() == length).map(|s| s.to_vec()));
    }
    if mode == DateParseMode::Time {
        out.extend(TIME_SEQUENCES.iter().filter(|s| s.len() == length).map(|s| s.to_vec()));
    }
    if matches!(mode, DateParseMode::DateTime | DateParseMode::Auto) {
        for d in dates.iter() {
            for t in TIME_SEQUENCES.iter() {
                if d.len() + t.len() == length {
                    let mut combined = d.to_vec();
                    combined.extend_from_slice(t);
                    out.push(combined);
                }
            }
        }
    }
    out
}

/// Expands a 2-digit year to an absolute year, shifting by a century
/// toward `current_year` whenever the naive expansion lands 50+ years away.
fn year_from_2digits(short_year: i64, current_year: i32) -> i32 {
    if short_year >= 100 {
        return short_year as i32;
    }
    let mut year = short_year as i32 + (current_year - current_year.rem_euclid(100));
    if (year - current_year).abs() >= 50 {
        year += if year < current_year { 100 } else { -100 };
    }
    year
}

enum Parsed {
    Date(NaiveDate),
    Time(NaiveTime),
    DateTime(NaiveDateTime, Option<i32>),
}

fn make_result(values: &Possibilities, now_year: i32) -> Option<Parsed> {
    let mut date: Option<NaiveDate> = None;
    let mut time: Option<NaiveTime> = None;

    if let Some(&month) = values.get(&Component::Month) {
        let year = values
            .get(&Component::Year)
            .map(|&y| year_from_2digits(y, now_year))
            .unwrap_or(now_year);
        let day = values.get(&Component::Day).copied().unwrap_or(1);
        date = Some(NaiveDate::from_ymd_opt(year, month as u32, day as u32)?);
    }

    let has_hm = values.contains_key(&Component::Hour) && values.contains_key(&Component::Minute);
    if has_hm || values.contains_key(&Component::HourAndMinute) {
        let (mut hour, minute, second, nano) = if let Some(&combined) = values.get(&Component::HourAndMinute) {
            (combined / 100, combined % 100, 0i64, 0i64)
        } else {
            (
                values[&Component::Hour],
                values[&Component::Minute],
                values.get(&Component::Second).copied().unwrap_or(0),
                values.get(&Component::Nano).copied().unwrap_or(0),
            )
        };

        if let Some(&ampm) = values.get(&Component::AmPm) {
            if (1..=12).contains(&hour) {
                if ampm == PM {
                    if hour != 12 {
                        hour += 12;
                    }
                } else if hour == 12 {
                    hour = 0;
                }
            }
        }

        time = Some(NaiveTime::from_hms_nano_opt(
            hour as u32,
            minute as u32,
            second as u32,
            nano as u32,
        )?);
    }

    let offset = values.get(&Component::Offset).map(|&o| o as i32);

    match (date, time) {
        (Some(d), Some(t)) => Some(Parsed::DateTime(d.and_time(t), offset)),
        (Some(d), None) => Some(Parsed::Date(d)),
        (None, Some(t)) => Some(Parsed::Time(t)),
        (None, None) => None,
    }
}

/// A parser bound to a particular "now", default zone, and day/month
/// ordering policy — exactly what `Context::get_date_parser()` hands out.
pub struct DateParser {
    pub now: NaiveDateTime,
    pub zone: Tz,
    pub date_style: DateStyle,
}

impl DateParser {
    pub fn new(now: NaiveDateTime, zone: Tz, date_style: DateStyle) -> Self {
        DateParser { now, zone, date_style }
    }

    /// Parses `text` under `mode`, returning the value and the byte range
    /// of the tokens that contributed to it.
    pub fn parse_located(&self, text: &str, mode: DateParseMode) -> Option<(Value, std::ops::Range<usize>)> {
        if text.trim().is_empty() {
            return None;
        }
        let tokens = lex(text);

        let mut possibilities = Vec::new();
        let mut start_pos: Option<usize> = None;
        let mut end_pos = 0usize;
        for tok in &tokens {
            let p = token_possibilities(tok, mode);
            if !p.is_empty() {
                if start_pos.is_none() {
                    start_pos = Some(tok.start);
                }
                end_pos = end_pos.max(tok.end);
                possibilities.push(p);
            }
        }

        let sequences = possible_sequences(mode, possibilities.len(), self.date_style);

        'seq: for seq in &sequences {
            let mut values = Possibilities::new();
            for (i, component) in seq.iter().enumerate() {
                match possibilities[i].get(component) {
                    Some(&v) => {
                        values.insert(*component, v);
                    }
                    None => continue 'seq,
                }
            }
            if let Some(parsed) = make_result(&values, self.now.year()) {
                let value = self.to_value(parsed);
                let range = start_pos.unwrap_or(0)..end_pos;
                return Some((value, range));
            }
        }
        None
    }

    fn to_value(&self, parsed: Parsed) -> Value {
        match parsed {
            Parsed::Date(d) => Value::Date(d),
            Parsed::Time(t) => Value::Time(t),
            Parsed::DateTime(naive, offset_secs) => {
                let dt = match offset_secs {
                    Some(secs) => {
                        let fixed = chrono::FixedOffset::east_opt(secs).unwrap_or_else(|| chrono::FixedOffset::east_opt(0).unwrap());
                        fixed
                            .from_local_datetime(&naive)
                            .single()
                            .unwrap_or_else(|| fixed.from_utc_datetime(&naive))
                            .with_timezone(&chrono_tz::UTC)
                    }
                    None => self
                        .zone
                        .from_local_datetime(&naive)
                        .single()
                        .unwrap_or_else(|| self.zone.from_utc_datetime(&naive)),
                };
                Value::DateTime(dt)
            }
        }
    }

    /// Parses `text` under `mode`, discarding the byte range `parse_located`
    /// tracks for embedded-date use cases.
    pub fn parse(&self, text: &str, mode: DateParseMode) -> Option<Value> {
        self.parse_located(text, mode).map(|(v, _)| v)
    }

    pub fn auto(&self, text: &str) -> Option<Value> {
        self.parse_located(text, DateParseMode::Auto).map(|(v, _)| v)
    }

    pub fn time(&self, text: &str) -> Option<Value> {
        self.parse_located(text, DateParseMode::Time).map(|(v, _)| v)
    }
}
