//! Property-based tests for the universal properties listed in the
//! expression language's test matrix: decimal/date round-tripping,
//! case-insensitivity of identifiers and function names, `@`-free
//! templates passing through unchanged, and `RESOLVE_AVAILABLE`'s
//! idempotence once every variable becomes available.

use chrono::{NaiveDate, TimeZone};
use proptest::prelude::*;
use rust_decimal::Decimal;

use msgexpr_eval::{evaluate_expression, evaluate_template, evaluate_template_with, Context, DateStyle, Strategy};
use msgexpr_common::Value;

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

proptest! {
    /// `to_value(to_string(v)) == v` for decimals: formatting a decimal
    /// and parsing it back through the arithmetic literal path recovers
    /// the same normalized value.
    #[test]
    fn decimal_round_trips_through_display_string(mantissa in -1_000_000_000_000i64..=1_000_000_000_000i64, scale in 0u32..=8) {
        let c = ctx();
        let original = Decimal::new(mantissa, scale);
        let rendered = msgexpr_common::format_decimal(original);
        let parsed = evaluate_expression(&rendered, &c).unwrap();
        prop_assert_eq!(parsed, Value::Dec(original.normalize()));
    }

    /// `date_parser.auto(format_with_style(d, style))` recovers `d`,
    /// for both day-first and month-first context styles, as long as
    /// the formatted text carries an unambiguous 4-digit year.
    #[test]
    fn date_round_trips_through_either_style(
        year in 1950i32..=2050,
        month in 1u32..=12,
        day in 1u32..=28,
        day_first in any::<bool>(),
    ) {
        let style = if day_first { DateStyle::DayFirst } else { DateStyle::MonthFirst };
        let mut c = ctx();
        let date = NaiveDate::from_ymd_opt(year, month, day).unwrap();
        // Rebuild context with the style under test; `now` only needs to be
        // present for filling defaults, the 4-digit year here removes any
        // ambiguity the date parser would otherwise need `now` to resolve.
        c = Context::new(c.now(), c.zone_value(), style);
        let formatted = date.format(&c.get_date_format(false)).to_string();
        let parsed = c.get_date_parser().auto(&formatted).unwrap();
        prop_assert_eq!(parsed, Value::Date(date));
    }

    /// Replacing a function name by the same name in a different casing
    /// produces the same result.
    #[test]
    fn function_name_case_insensitivity(upper in any::<bool>()) {
        let c = ctx();
        let name = if upper { "UPPER" } else { "upper" };
        let source = format!(r#"{name}("hi")"#);
        let v = evaluate_expression(&source, &c).unwrap();
        prop_assert_eq!(v, Value::Str("HI".into()));
    }

    /// Replacing an identifier's casing doesn't change the resolved value.
    #[test]
    fn identifier_case_insensitivity(variant in prop_oneof![
        Just("contact.name"), Just("CONTACT.NAME"), Just("Contact.Name"), Just("cOnTaCt.nAmE")
    ]) {
        let mut c = ctx();
        let mut contact = msgexpr_common::Container::new();
        contact.insert("name", Value::Str("Rowan".into()));
        c.set("contact", Value::Container(contact));
        let v = evaluate_expression(variant, &c).unwrap();
        prop_assert_eq!(v, Value::Str("Rowan".into()));
    }

    /// Any template containing no `@` passes through evaluate_template
    /// completely unchanged, with no errors.
    #[test]
    fn at_free_templates_round_trip(text in "[^@]{0,64}") {
        let c = ctx();
        let (out, errs) = evaluate_template(&text, &c);
        prop_assert_eq!(out, text);
        prop_assert!(errs.is_empty());
    }

    /// Once every variable a RESOLVE_AVAILABLE rewrite referenced is
    /// bound, re-evaluating the rewritten output under a full context
    /// reaches the same value as evaluating the original directly.
    #[test]
    fn resolve_available_is_idempotent_once_bound(n in -1000i64..=1000) {
        let mut partial = ctx();
        partial.set("foo", Value::Dec(Decimal::from(n)));
        let (pending, errs) = evaluate_template_with(
            "@(foo + contact.age)",
            &partial,
            msgexpr_eval::default_registry(),
            false,
            Strategy::ResolveAvailable,
        );
        prop_assert!(errs.is_empty());

        let mut full = ctx();
        full.set("foo", Value::Dec(Decimal::from(n)));
        let mut contact = msgexpr_common::Container::new();
        contact.insert("age", Value::Int(5));
        full.set("contact", Value::Container(contact));

        let (direct, direct_errs) = evaluate_template("@(foo + contact.age)", &full);
        prop_assert!(direct_errs.is_empty());

        let (resolved, resolved_errs) = evaluate_template(&pending, &full);
        prop_assert!(resolved_errs.is_empty());
        prop_assert_eq!(resolved, direct);
    }
}
