// ABOUTME: Datetime, date, time, and duration value construction and arithmetic
// A datetime dictionary stores its canonical ISO-8601 rendering under `iso`;
// arithmetic re-parses through chrono. Calendar components of durations
// (months) are applied calendar-wise, fixed components as exact seconds.

use super::{typed, TYPE_DATE, TYPE_DATETIME, TYPE_DURATION, TYPE_TIME};
use crate::error::{codes, Error};
use crate::token::{DatetimeLit, DurationLit};
use crate::value::Value;
use chrono::{
    DateTime, Datelike, Duration as ChronoDuration, FixedOffset, NaiveDate, NaiveDateTime,
    NaiveTime,
};

pub fn date_value(date: NaiveDate) -> Value {
    typed(
        TYPE_DATE,
        vec![("iso", Value::str(date.format("%Y-%m-%d").to_string()))],
    )
}

pub fn time_value(time: NaiveTime) -> Value {
    typed(
        TYPE_TIME,
        vec![("iso", Value::str(time.format("%H:%M:%S").to_string()))],
    )
}

pub fn datetime_value(datetime: NaiveDateTime, offset_minutes: Option<i32>) -> Value {
    let iso = match offset_minutes {
        Some(0) => datetime.format("%Y-%m-%dT%H:%M:%SZ").to_string(),
        Some(minutes) => {
            let offset =
                FixedOffset::east_opt(minutes * 60).unwrap_or_else(|| FixedOffset::east_opt(0).unwrap());
            DateTime::<FixedOffset>::from_naive_utc_and_offset(datetime - offset, offset)
                .format("%Y-%m-%dT%H:%M:%S%:z")
                .to_string()
        }
        None => datetime.format("%Y-%m-%dT%H:%M:%S").to_string(),
    };
    typed(TYPE_DATETIME, vec![("iso", Value::str(iso))])
}

pub fn from_literal(lit: &DatetimeLit) -> Value {
    match (lit.date, lit.time) {
        (Some(date), Some(time)) => datetime_value(date.and_time(time), lit.offset_minutes),
        (Some(date), None) => date_value(date),
        (None, Some(time)) => time_value(time),
        (None, None) => Value::Null,
    }
}

pub fn duration_value(months: i64, seconds: i64) -> Value {
    typed(
        TYPE_DURATION,
        vec![
            ("months", Value::Int(months)),
            ("seconds", Value::Int(seconds)),
        ],
    )
}

pub fn duration_from_literal(lit: &DurationLit) -> Value {
    let sign = if lit.negative { -1 } else { 1 };
    duration_value(sign * lit.months, sign * lit.seconds)
}

/// Parse the `iso` field of a datetime-family dictionary back into parts.
pub fn parse_parts(value: &Value) -> Option<(Option<NaiveDate>, Option<NaiveTime>)> {
    let tag = value.type_marker()?;
    let iso = value.get_key("iso")?;
    let iso = iso.as_str()?.to_string();
    match tag.as_str() {
        TYPE_DATE => NaiveDate::parse_from_str(&iso, "%Y-%m-%d")
            .ok()
            .map(|d| (Some(d), None)),
        TYPE_TIME => NaiveTime::parse_from_str(&iso, "%H:%M:%S")
            .ok()
            .map(|t| (None, Some(t))),
        TYPE_DATETIME => parse_naive_datetime(&iso).map(|dt| (Some(dt.date()), Some(dt.time()))),
        _ => None,
    }
}

fn parse_naive_datetime(iso: &str) -> Option<NaiveDateTime> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(iso) {
        return Some(dt.naive_utc());
    }
    NaiveDateTime::parse_from_str(iso, "%Y-%m-%dT%H:%M:%S").ok()
}

pub fn duration_parts(value: &Value) -> Option<(i64, i64)> {
    let months = value.get_key("months")?.as_int()?;
    let seconds = value.get_key("seconds")?.as_int()?;
    Some((months, seconds))
}

/// Combine a date-kind value with a time-kind value into a composite.
/// Combining like kinds is ambiguous and errors.
pub fn combine(left: &Value, right: &Value) -> Result<Value, Error> {
    let left_parts = parse_parts(left);
    let right_parts = parse_parts(right);
    match (left_parts, right_parts) {
        (Some((Some(date), None)), Some((None, Some(time))))
        | (Some((None, Some(time))), Some((Some(date), None))) => {
            Ok(datetime_value(date.and_time(time), None))
        }
        _ => Err(Error::operator(
            codes::OP_DATETIME_COMBINE,
            format!(
                "cannot combine {} with {}",
                left.type_name(),
                right.type_name()
            ),
        )),
    }
}

/// Shift a datetime-family value by a duration. Months move the calendar
/// date; seconds shift the instant.
pub fn shift(value: &Value, months: i64, seconds: i64) -> Result<Value, Error> {
    let tag = value.type_marker().unwrap_or_default();
    let (date, time) = parse_parts(value).ok_or_else(|| {
        Error::format(codes::FMT_DATETIME, "malformed datetime value")
    })?;
    match tag.as_str() {
        TYPE_DATE => {
            let date = date.unwrap();
            let shifted = add_months(date, months) + ChronoDuration::seconds(seconds);
            Ok(date_value(shifted))
        }
        TYPE_TIME => {
            let time = time.unwrap();
            let base = NaiveDate::from_ymd_opt(2000, 1, 1).unwrap().and_time(time);
            let shifted = base + ChronoDuration::seconds(seconds);
            Ok(time_value(shifted.time()))
        }
        _ => {
            let datetime = date.unwrap().and_time(time.unwrap());
            let shifted =
                add_months(datetime.date(), months).and_time(datetime.time())
                    + ChronoDuration::seconds(seconds);
            Ok(datetime_value(shifted, None))
        }
    }
}

/// Difference between two datetime-family values of the same kind.
pub fn difference(left: &Value, right: &Value) -> Result<Value, Error> {
    let lhs = parse_parts(left);
    let rhs = parse_parts(right);
    let (lhs, rhs) = match (lhs, rhs) {
        (Some(l), Some(r)) => (l, r),
        _ => {
            return Err(Error::format(codes::FMT_DATETIME, "malformed datetime value"))
        }
    };
    let base = NaiveDate::from_ymd_opt(2000, 1, 1).unwrap();
    let to_instant = |(date, time): (Option<NaiveDate>, Option<NaiveTime>)| {
        date.unwrap_or(base)
            .and_time(time.unwrap_or_else(|| NaiveTime::from_hms_opt(0, 0, 0).unwrap()))
    };
    let seconds = (to_instant(lhs) - to_instant(rhs)).num_seconds();
    Ok(duration_value(0, seconds))
}

fn add_months(date: NaiveDate, months: i64) -> NaiveDate {
    if months == 0 {
        return date;
    }
    let total = date.year() as i64 * 12 + date.month0() as i64 + months;
    let year = total.div_euclid(12) as i32;
    let month = (total.rem_euclid(12) + 1) as u32;
    let day = date.day();
    // Clamp to the shorter month's last day.
    (1..=day)
        .rev()
        .find_map(|d| NaiveDate::from_ymd_opt(year, month, d))
        .unwrap_or(date)
}

/// Ordering key for the natural sort: seconds since epoch, with date-only
/// values sorting at midnight.
pub fn sort_key(value: &Value) -> Option<i64> {
    let (date, time) = parse_parts(value)?;
    let base = NaiveDate::from_ymd_opt(2000, 1, 1).unwrap();
    let instant = date
        .unwrap_or(base)
        .and_time(time.unwrap_or_else(|| NaiveTime::from_hms_opt(0, 0, 0).unwrap()));
    Some(instant.and_utc().timestamp())
}

/// Compact rendering like `1h30m` or `-2d4h`.
pub fn format_duration(value: &Value) -> String {
    let Some((months, seconds)) = duration_parts(value) else {
        return "0s".to_string();
    };
    let negative = months < 0 || seconds < 0;
    let months = months.abs();
    let mut seconds = seconds.abs();
    let mut out = String::new();
    if negative {
        out.push('-');
    }
    let years = months / 12;
    let rem_months = months % 12;
    if years > 0 {
        out.push_str(&format!("{years}y"));
    }
    if rem_months > 0 {
        out.push_str(&format!("{rem_months}mo"));
    }
    for (unit, label) in [(604_800, "w"), (86_400, "d"), (3_600, "h"), (60, "m")] {
        let count = seconds / unit;
        if count > 0 {
            out.push_str(&format!("{count}{label}"));
            seconds %= unit;
        }
    }
    if seconds > 0 || out.is_empty() || out == "-" {
        out.push_str(&format!("{seconds}s"));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_date_prints_iso() {
        assert_eq!(date_value(date(2024, 1, 15)).to_string(), "2024-01-15");
    }

    #[test]
    fn test_combine_date_and_time() {
        let d = date_value(date(2024, 1, 15));
        let t = time_value(NaiveTime::from_hms_opt(9, 30, 0).unwrap());
        let combined = combine(&d, &t).unwrap();
        assert_eq!(combined.to_string(), "2024-01-15T09:30:00");
        // Order does not matter.
        let combined = combine(&t, &d).unwrap();
        assert_eq!(combined.to_string(), "2024-01-15T09:30:00");
    }

    #[test]
    fn test_combine_like_kinds_errors() {
        let a = date_value(date(2024, 1, 1));
        let b = date_value(date(2024, 2, 1));
        let err = combine(&a, &b).unwrap_err();
        assert_eq!(err.code, "OP-0003");
        assert!(!err.class.is_catchable());
    }

    #[test]
    fn test_shift_by_calendar_months_clamps() {
        let jan31 = date_value(date(2024, 1, 31));
        let shifted = shift(&jan31, 1, 0).unwrap();
        assert_eq!(shifted.to_string(), "2024-02-29");
    }

    #[test]
    fn test_difference_yields_seconds() {
        let a = date_value(date(2024, 1, 2));
        let b = date_value(date(2024, 1, 1));
        let diff = difference(&a, &b).unwrap();
        assert_eq!(diff.get_key("seconds"), Some(Value::Int(86_400)));
    }

    #[test]
    fn test_duration_formatting() {
        assert_eq!(format_duration(&duration_value(0, 5_400)), "1h30m");
        assert_eq!(format_duration(&duration_value(14, 0)), "1y2mo");
        assert_eq!(format_duration(&duration_value(0, -86_400)), "-1d");
        assert_eq!(format_duration(&duration_value(0, 0)), "0s");
    }
}
