//! Date/time functions.

use chrono::{Datelike, Months, NaiveDate, NaiveTime, Timelike};

use msgexpr_common::{ArgKind, EvalError, ParamSpec, Signature, Value};

use crate::context::Context;

use super::SimpleFn;

pub(super) fn functions() -> Vec<SimpleFn> {
    vec![
        SimpleFn {
            name: "DATE",
            doc: "Defines a date value",
            sig: Signature::new(vec![
                ParamSpec::required("year", ArgKind::Number),
                ParamSpec::required("month", ArgKind::Number),
                ParamSpec::required("day", ArgKind::Number),
            ]),
            call: |ctx, args| {
                let year = args[0].to_int(ctx)?;
                let month = args[1].to_int(ctx)?;
                let day = args[2].to_int(ctx)?;
                NaiveDate::from_ymd_opt(year as i32, month as u32, day as u32)
                    .map(Value::Date)
                    .ok_or_else(|| EvalError::Arithmetic(format!("{year}-{month}-{day} is not a valid date")))
            },
        },
        SimpleFn {
            name: "DATEDIF",
            doc: "Calculates the number of days, months, or years between two dates",
            sig: Signature::new(vec![
                ParamSpec::required("start_date", ArgKind::Date),
                ParamSpec::required("end_date", ArgKind::Date),
                ParamSpec::required("unit", ArgKind::Text),
            ]),
            call: |ctx, args| {
                let start = args[0].to_date(ctx)?;
                let end = args[1].to_date(ctx)?;
                let unit = args[2].to_display_string(ctx)?;
                datedif(start, end, &unit).map(Value::Int)
            },
        },
        SimpleFn {
            name: "DATEVALUE",
            doc: "Converts text to a date value",
            sig: Signature::new(vec![ParamSpec::required("text", ArgKind::Text)]),
            call: |ctx, args| Ok(Value::Date(args[0].to_date(ctx)?)),
        },
        SimpleFn {
            name: "DAY",
            doc: "Returns the day of the month of a date value",
            sig: Signature::new(vec![ParamSpec::required("date", ArgKind::Date)]),
            call: |ctx, args| Ok(Value::Int(args[0].to_date(ctx)?.day() as i64)),
        },
        SimpleFn {
            name: "DAYS",
            doc: "Returns the number of days between two dates",
            sig: Signature::new(vec![
                ParamSpec::required("end_date", ArgKind::Date),
                ParamSpec::required("start_date", ArgKind::Date),
            ]),
            call: |ctx, args| {
                let end = args[0].to_date(ctx)?;
                let start = args[1].to_date(ctx)?;
                Ok(Value::Int((end - start).num_days()))
            },
        },
        SimpleFn {
            name: "EDATE",
            doc: "Moves a date by the given number of months",
            sig: Signature::new(vec![
                ParamSpec::required("date", ArgKind::Date),
                ParamSpec::required("months", ArgKind::Number),
            ]),
            call: |ctx, args| {
                let date = args[0].to_date(ctx)?;
                let months = args[1].to_int(ctx)?;
                let shifted = if months >= 0 {
                    date.checked_add_months(Months::new(months as u32))
                } else {
                    date.checked_sub_months(Months::new((-months) as u32))
                };
                shifted
                    .map(Value::Date)
                    .ok_or_else(|| EvalError::Arithmetic(format!("Can't shift {date} by {months} months")))
            },
        },
        SimpleFn {
            name: "HOUR",
            doc: "Returns the hour of a datetime value",
            sig: Signature::new(vec![ParamSpec::required("datetime", ArgKind::Date)]),
            call: |ctx, args| Ok(Value::Int(extract_time(ctx, &args[0])?.hour() as i64)),
        },
        SimpleFn {
            name: "MINUTE",
            doc: "Returns the minute of a datetime value",
            sig: Signature::new(vec![ParamSpec::required("datetime", ArgKind::Date)]),
            call: |ctx, args| Ok(Value::Int(extract_time(ctx, &args[0])?.minute() as i64)),
        },
        SimpleFn {
            name: "MONTH",
            doc: "Returns the month of a date value",
            sig: Signature::new(vec![ParamSpec::required("date", ArgKind::Date)]),
            call: |ctx, args| Ok(Value::Int(args[0].to_date(ctx)?.month() as i64)),
        },
        SimpleFn {
            name: "NOW",
            doc: "Returns the current date and time",
            sig: Signature::new(vec![]),
            call: |ctx, _args| Ok(Value::DateTime(ctx.now())),
        },
        SimpleFn {
            name: "SECOND",
            doc: "Returns the second of a datetime value",
            sig: Signature::new(vec![ParamSpec::required("datetime", ArgKind::Date)]),
            call: |ctx, args| Ok(Value::Int(extract_time(ctx, &args[0])?.second() as i64)),
        },
        SimpleFn {
            name: "TIME",
            doc: "Defines a time value",
            sig: Signature::new(vec![
                ParamSpec::required("hours", ArgKind::Number),
                ParamSpec::required("minutes", ArgKind::Number),
                ParamSpec::required("seconds", ArgKind::Number),
            ]),
            call: |ctx, args| {
                let h = args[0].to_int(ctx)?;
                let m = args[1].to_int(ctx)?;
                let s = args[2].to_int(ctx)?;
                NaiveTime::from_hms_opt(h as u32, m as u32, s as u32)
                    .map(Value::Time)
                    .ok_or_else(|| EvalError::Arithmetic(format!("{h}:{m}:{s} is not a valid time")))
            },
        },
        SimpleFn {
            name: "TIMEVALUE",
            doc: "Converts text to a time value",
            sig: Signature::new(vec![ParamSpec::required("text", ArgKind::Text)]),
            call: |ctx, args| Ok(Value::Time(args[0].to_time(ctx)?)),
        },
        SimpleFn {
            name: "TODAY",
            doc: "Returns the current date",
            sig: Signature::new(vec![]),
            call: |ctx, _args| Ok(Value::Date(ctx.now().date_naive())),
        },
        SimpleFn {
            name: "WEEKDAY",
            doc: "Returns the day of the week of a date (Sunday = 1 .. Saturday = 7)",
            sig: Signature::new(vec![ParamSpec::required("date", ArgKind::Date)]),
            call: |ctx, args| {
                let date = args[0].to_date(ctx)?;
                Ok(Value::Int(date.weekday().num_days_from_sunday() as i64 + 1))
            },
        },
        SimpleFn {
            name: "YEAR",
            doc: "Returns the year of a date value",
            sig: Signature::new(vec![ParamSpec::required("date", ArgKind::Date)]),
            call: |ctx, args| Ok(Value::Int(args[0].to_date(ctx)?.year() as i64)),
        },
    ]
}

/// `HOUR`/`MINUTE`/`SECOND` accept both bare times (`"03:55"`) and full
/// datetimes (`"01-02-2014 03:55"`): try the narrower time parse first,
/// falling back to a full datetime and taking its time-of-day.
fn extract_time(ctx: &Context, v: &Value) -> Result<NaiveTime, EvalError> {
    if let Ok(t) = v.to_time(ctx) {
        return Ok(t);
    }
    Ok(v.to_datetime(ctx)?.naive_local().time())
}

/// `DATEDIF`: the six Excel-compatible units. `yd` preserves the
/// source's "replace year on start date" approach — the open question
/// its edge case — including Feb-29: when the
/// start date is Feb 29 and the aligned year isn't a leap year, this
/// falls back to Feb 28 rather than erroring.
fn datedif(start: NaiveDate, end: NaiveDate, unit: &str) -> Result<i64, EvalError> {
    if start > end {
        return Err(EvalError::Arithmetic(
            "DATEDIF: start_date must not be after end_date".into(),
        ));
    }
    match unit.to_ascii_lowercase().as_str() {
        "y" => {
            let mut y = end.year() - start.year();
            if (end.month(), end.day()) < (start.month(), start.day()) {
                y -= 1;
            }
            Ok(y as i64)
        }
        "m" => {
            let mut m = (end.year() - start.year()) * 12 + (end.month() as i32 - start.month() as i32);
            if end.day() < start.day() {
                m -= 1;
            }
            Ok(m as i64)
        }
        "d" => Ok((end - start).num_days()),
        "md" => Ok(month_day_diff(start, end) as i64),
        "ym" => {
            let mut ym = end.month() as i32 - start.month() as i32;
            if end.day() < start.day() {
                ym -= 1;
            }
            if ym < 0 {
                ym += 12;
            }
            Ok(ym as i64)
        }
        "yd" => {
            let aligned_start = align_year(start, end.year());
            Ok((end - aligned_start).num_days())
        }
        other => Err(EvalError::Arithmetic(format!("Invalid DATEDIF unit '{other}'"))),
    }
}

fn month_day_diff(start: NaiveDate, end: NaiveDate) -> i32 {
    if end.day() >= start.day() {
        end.day() as i32 - start.day() as i32
    } else {
        let prev_month_last_day = (end.with_day(1).expect("day 1 always valid") - chrono::Duration::days(1)).day();
        prev_month_last_day as i32 + end.day() as i32 - start.day() as i32
    }
}

/// Replaces `start`'s year with `target_year`, falling back to the year
/// before it (and, for a Feb-29 start with no matching leap year in
/// either, Feb 28) until a valid date results.
fn align_year(start: NaiveDate, target_year: i32) -> NaiveDate {
    for year in [target_year, target_year - 1] {
        if let Some(d) = NaiveDate::from_ymd_opt(year, start.month(), start.day()) {
            return d;
        }
    }
    NaiveDate::from_ymd_opt(target_year, 2, 28).expect("Feb 28 always valid")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dates::DateStyle;
    use chrono::TimeZone;

    fn ctx() -> Context {
        let now = chrono_tz::Africa::Kigali
            .from_local_datetime(
                &NaiveDate::from_ymd_opt(2015, 8, 14).unwrap().and_hms_opt(10, 38, 30).unwrap(),
            )
            .unwrap();
        Context::new(now, chrono_tz::Africa::Kigali, DateStyle::DayFirst)
    }

    fn call(name: &str, args: Vec<Value>) -> Result<Value, EvalError> {
        let c = ctx();
        let reg = crate::registry::Registry::new(super::super::all_functions());
        reg.invoke(&c, name, args)
    }

    fn d(y: i32, m: u32, day: u32) -> Value {
        Value::Date(NaiveDate::from_ymd_opt(y, m, day).unwrap())
    }

    #[test]
    fn datedif_years() {
        let v = call("DATEDIF", vec![d(1981, 5, 28), d(2015, 11, 23), Value::Str("y".into())]).unwrap();
        assert_eq!(v, Value::Int(34));
    }

    #[test]
    fn datedif_months() {
        let v = call("DATEDIF", vec![d(2014, 9, 20), d(2015, 11, 23), Value::Str("m".into())]).unwrap();
        assert_eq!(v, Value::Int(14));
    }

    #[test]
    fn datedif_days() {
        let v = call("DATEDIF", vec![d(2001, 6, 1), d(2002, 8, 15), Value::Str("d".into())]).unwrap();
        assert_eq!(v, Value::Int(440));
    }

    #[test]
    fn datedif_yd_ignores_years() {
        let v = call("DATEDIF", vec![d(2001, 6, 1), d(2002, 8, 15), Value::Str("YD".into())]).unwrap();
        assert_eq!(v, Value::Int(75));
    }

    #[test]
    fn datedif_ym_ignores_years() {
        let v = call("DATEDIF", vec![d(2001, 6, 1), d(2002, 8, 15), Value::Str("YM".into())]).unwrap();
        assert_eq!(v, Value::Int(2));
    }

    #[test]
    fn datedif_md_borrows_from_previous_month() {
        let v = call("DATEDIF", vec![d(2001, 6, 16), d(2002, 8, 15), Value::Str("mD".into())]).unwrap();
        assert_eq!(v, Value::Int(30));
    }

    #[test]
    fn datedif_feb29_start_falls_back_to_feb28() {
        // start Feb 29 2016 (leap), end in a non-leap-aligned year for "yd".
        let v = call(
            "DATEDIF",
            vec![d(2016, 2, 29), d(2017, 3, 1), Value::Str("yd".into())],
        )
        .unwrap();
        // aligned start becomes 2017-02-28 (2017 isn't leap); 1 day to Mar 1.
        assert_eq!(v, Value::Int(1));
    }

    #[test]
    fn edate_clamps_to_end_of_month() {
        let v = call("EDATE", vec![d(2013, 3, 2), Value::Int(1)]).unwrap();
        assert_eq!(v, d(2013, 4, 2));
        let v = call("EDATE", vec![Value::Str("01-02-2014".into()), Value::Int(-2)]).unwrap();
        assert_eq!(v, d(2013, 12, 1));
    }

    #[test]
    fn weekday_sunday_is_one() {
        let v = call("WEEKDAY", vec![d(2015, 8, 16)]).unwrap();
        assert_eq!(v, Value::Int(1));
        let v = call("WEEKDAY", vec![d(2015, 8, 15)]).unwrap();
        assert_eq!(v, Value::Int(7));
    }

    #[test]
    fn hour_parses_embedded_time() {
        let v = call("HOUR", vec![Value::Str("01-02-2014 03:55".into())]).unwrap();
        assert_eq!(v, Value::Int(3));
    }

    #[test]
    fn today_and_now_use_context_clock() {
        assert_eq!(call("TODAY", vec![]).unwrap(), d(2015, 8, 14));
        assert!(matches!(call("NOW", vec![]).unwrap(), Value::DateTime(_)));
    }
}
