//! Free functions shared across builtins: decimal power/rounding helpers,
//! word tokenization, URL quoting, and JSON-date round-tripping.

use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};
use once_cell::sync::Lazy;
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use regex::Regex;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

/// Raises `base` to `exp`. Integer exponents within `i64` range are
/// computed by repeated decimal multiplication so small-integer powers
/// (the overwhelmingly common case, e.g. `^2`) don't round-trip through
/// binary floating point. Anything else falls back to `f64::powf`.
pub fn decimal_pow(base: Decimal, exp: Decimal) -> Option<Decimal> {
    if exp.fract().is_zero() {
        if let Some(n) = exp.to_i64() {
            if (-128..=128).contains(&n) {
                return Some(decimal_pow_int(base, n));
            }
        }
    }
    let base_f = base.to_f64()?;
    let exp_f = exp.to_f64()?;
    Decimal::from_f64_retain(base_f.powf(exp_f))
}

fn decimal_pow_int(base: Decimal, exp: i64) -> Decimal {
    if exp == 0 {
        return Decimal::ONE;
    }
    let negative = exp < 0;
    let mut n = exp.unsigned_abs();
    let mut result = Decimal::ONE;
    let mut cur = base;
    while n > 0 {
        if n & 1 == 1 {
            result *= cur;
        }
        cur *= cur;
        n >>= 1;
    }
    if negative {
        Decimal::ONE / result
    } else {
        result
    }
}

/// Half-up rounding with support for negative `num_digits` (rounding to
/// tens, hundreds, …). Mirrors `ROUND`/`ROUNDUP`/`ROUNDDOWN`'s shared core.
pub fn decimal_round(number: Decimal, num_digits: i32) -> Decimal {
    use rust_decimal::RoundingStrategy;

    if num_digits >= 0 {
        number.round_dp_with_strategy(num_digits as u32, RoundingStrategy::MidpointAwayFromZero)
    } else {
        let exp = decimal_pow_int(Decimal::TEN, -num_digits as i64);
        let scaled = (number / exp).round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero);
        scaled * exp
    }
}

/// Rounds strictly toward zero, to `num_digits` fractional places.
pub fn decimal_truncate(number: Decimal, num_digits: i32) -> Decimal {
    if num_digits >= 0 {
        number.trunc_with_scale(num_digits as u32)
    } else {
        let exp = decimal_pow_int(Decimal::TEN, -num_digits as i64);
        (number / exp).trunc() * exp
    }
}

/// Everything outside the unreserved set (`A-Za-z0-9_.-~`) plus `/`,
/// which `quote`'s default `safe='/'` leaves untouched.
const QUERY_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'_')
    .remove(b'.')
    .remove(b'-')
    .remove(b'~')
    .remove(b'/');

/// Percent-encodes text for embedding in a URL query string.
pub fn urlquote(text: &str) -> String {
    utf8_percent_encode(text, QUERY_ENCODE_SET).to_string()
}

static WORD_TOKEN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[\p{M}\p{L}\p{N}_']+|\p{S}").expect("valid word-token regex"));

/// Splits text into maximal runs of marks/letters/digits/`_`/`'`; every
/// other symbol character becomes its own one-character token.
/// Whitespace and punctuation between tokens is discarded.
pub fn tokenize(text: &str) -> Vec<String> {
    WORD_TOKEN_RE
        .find_iter(text)
        .map(|m| m.as_str().to_string())
        .collect()
}

const JSON_DATE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3fZ";

/// Parses the fixed `YYYY-MM-DDTHH:MM:SS.mmmZ` millisecond-precision
/// UTC shape used for JSON round-tripping. Any other shape fails.
pub fn parse_json_date(value: &str) -> Option<DateTime<Utc>> {
    let naive = NaiveDateTime::parse_from_str(value, JSON_DATE_FORMAT).ok()?;
    Some(DateTime::<Utc>::from_naive_utc_and_offset(naive, Utc))
}

/// Formats a UTC instant in the JSON round-trip shape, millisecond
/// precision.
pub fn format_json_date(value: DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Millis, true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn decimal_pow_small_integer_exponent_is_exact() {
        let base = Decimal::from_str("1.1").unwrap();
        let got = decimal_pow(base, Decimal::from(2)).unwrap();
        assert_eq!(got, Decimal::from_str("1.21").unwrap());
    }

    #[test]
    fn decimal_pow_negative_integer_exponent() {
        let base = Decimal::from(2);
        let got = decimal_pow(base, Decimal::from(-1)).unwrap();
        assert_eq!(got, Decimal::from_str("0.5").unwrap());
    }

    #[test]
    fn decimal_round_negative_digits_rounds_to_tens() {
        let got = decimal_round(Decimal::from(125), -1);
        assert_eq!(got, Decimal::from(130));
    }

    #[test]
    fn tokenize_splits_symbols_individually() {
        let toks = tokenize("01-02-2014!");
        assert_eq!(toks, vec!["01", "02", "2014"]);
    }

    #[test]
    fn json_date_round_trip() {
        let dt = parse_json_date("2014-10-03T09:41:12.790Z").unwrap();
        assert_eq!(format_json_date(dt), "2014-10-03T09:41:12.790Z");
    }

    #[test]
    fn json_date_rejects_other_shapes() {
        assert!(parse_json_date("2014-10-03").is_none());
    }

    #[test]
    fn urlquote_keeps_slash_safe_and_encodes_bang() {
        assert_eq!(urlquote("?!=Jow&Flow"), "%3F%21%3DJow%26Flow");
        assert_eq!(urlquote("a/b"), "a/b");
    }
}
