// ABOUTME: Datetime, date, time, and duration method tables

use super::{want_exact, want_int, want_str};
use crate::error::{codes, Error};
use crate::types::{self, datetime};
use crate::value::Value;
use chrono::{Datelike, NaiveDate, NaiveTime, Timelike};

pub(super) fn try_invoke(
    receiver: &Value,
    method: &str,
    args: &[Value],
) -> Option<Result<Value, Error>> {
    if types::is_typed(receiver, types::TYPE_DURATION) {
        return Some(dispatch_duration(receiver, method, args));
    }
    Some(dispatch_datetime(receiver, method, args))
}

fn parts(receiver: &Value) -> Result<(Option<NaiveDate>, Option<NaiveTime>), Error> {
    datetime::parse_parts(receiver)
        .ok_or_else(|| Error::format(codes::FMT_DATETIME, "malformed datetime value"))
}

fn dispatch_datetime(receiver: &Value, method: &str, args: &[Value]) -> Result<Value, Error> {
    let (date, time) = parts(receiver)?;
    let need_date = || {
        date.ok_or_else(|| {
            Error::type_error(format!("{method}: {} has no date part", receiver.type_name()))
        })
    };
    let need_time = || {
        time.ok_or_else(|| {
            Error::type_error(format!("{method}: {} has no time part", receiver.type_name()))
        })
    };
    match method {
        "year" => {
            want_exact(method, args, 0)?;
            Ok(Value::Int(need_date()?.year() as i64))
        }
        "month" => {
            want_exact(method, args, 0)?;
            Ok(Value::Int(need_date()?.month() as i64))
        }
        "day" => {
            want_exact(method, args, 0)?;
            Ok(Value::Int(need_date()?.day() as i64))
        }
        "weekday" => {
            want_exact(method, args, 0)?;
            // Monday is 1, Sunday is 7.
            Ok(Value::Int(
                need_date()?.weekday().number_from_monday() as i64
            ))
        }
        "hour" => {
            want_exact(method, args, 0)?;
            Ok(Value::Int(need_time()?.hour() as i64))
        }
        "minute" => {
            want_exact(method, args, 0)?;
            Ok(Value::Int(need_time()?.minute() as i64))
        }
        "second" => {
            want_exact(method, args, 0)?;
            Ok(Value::Int(need_time()?.second() as i64))
        }
        "format" => {
            let pattern = want_str(method, args, 0)?;
            let base = NaiveDate::from_ymd_opt(2000, 1, 1).unwrap();
            let instant = date
                .unwrap_or(base)
                .and_time(time.unwrap_or_else(|| NaiveTime::from_hms_opt(0, 0, 0).unwrap()));
            Ok(Value::str(instant.format(pattern).to_string()))
        }
        "date" => {
            want_exact(method, args, 0)?;
            Ok(datetime::date_value(need_date()?))
        }
        "time" => {
            want_exact(method, args, 0)?;
            Ok(datetime::time_value(need_time()?))
        }
        "addDays" => {
            let days = want_int(method, args, 0)?;
            datetime::shift(receiver, 0, days * 86_400)
        }
        "addMonths" => {
            let months = want_int(method, args, 0)?;
            datetime::shift(receiver, months, 0)
        }
        "addYears" => {
            let years = want_int(method, args, 0)?;
            datetime::shift(receiver, years * 12, 0)
        }
        "unix" => {
            want_exact(method, args, 0)?;
            let base = NaiveDate::from_ymd_opt(1970, 1, 1).unwrap();
            let instant = date
                .unwrap_or(base)
                .and_time(time.unwrap_or_else(|| NaiveTime::from_hms_opt(0, 0, 0).unwrap()));
            Ok(Value::Int(instant.and_utc().timestamp()))
        }
        "iso" => {
            want_exact(method, args, 0)?;
            Ok(receiver.get_key("iso").unwrap_or(Value::Null))
        }
        _ => Err(Error::unknown_method(&receiver.type_name(), method)),
    }
}

fn dispatch_duration(receiver: &Value, method: &str, args: &[Value]) -> Result<Value, Error> {
    let (months, seconds) = datetime::duration_parts(receiver)
        .ok_or_else(|| Error::format(codes::FMT_DATETIME, "malformed duration value"))?;
    match method {
        "days" => {
            want_exact(method, args, 0)?;
            Ok(Value::Int(seconds / 86_400))
        }
        "hours" => {
            want_exact(method, args, 0)?;
            Ok(Value::Int(seconds / 3_600))
        }
        "minutes" => {
            want_exact(method, args, 0)?;
            Ok(Value::Int(seconds / 60))
        }
        "seconds" => {
            want_exact(method, args, 0)?;
            Ok(Value::Int(seconds))
        }
        "months" => {
            want_exact(method, args, 0)?;
            Ok(Value::Int(months))
        }
        "humanize" => {
            want_exact(method, args, 0)?;
            Ok(Value::str(humanize(months, seconds)))
        }
        _ => Err(Error::unknown_method("duration", method)),
    }
}

fn humanize(months: i64, seconds: i64) -> String {
    let negative = months < 0 || seconds < 0;
    let months = months.abs();
    let seconds = seconds.abs();
    let phrase = if months >= 12 {
        let years = months / 12;
        format!("{years} year{}", plural(years))
    } else if months > 0 {
        format!("{months} month{}", plural(months))
    } else if seconds >= 86_400 {
        let days = seconds / 86_400;
        format!("{days} day{}", plural(days))
    } else if seconds >= 3_600 {
        let hours = seconds / 3_600;
        format!("{hours} hour{}", plural(hours))
    } else if seconds >= 60 {
        let minutes = seconds / 60;
        format!("{minutes} minute{}", plural(minutes))
    } else {
        format!("{seconds} second{}", plural(seconds))
    };
    if negative {
        format!("{phrase} ago")
    } else {
        phrase
    }
}

fn plural(n: i64) -> &'static str {
    if n == 1 {
        ""
    } else {
        "s"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> Value {
        datetime::date_value(NaiveDate::from_ymd_opt(y, m, d).unwrap())
    }

    #[test]
    fn test_date_accessors() {
        let d = date(2024, 3, 9);
        assert_eq!(
            dispatch_datetime(&d, "year", &[]).unwrap(),
            Value::Int(2024)
        );
        assert_eq!(dispatch_datetime(&d, "month", &[]).unwrap(), Value::Int(3));
        // 2024-03-09 was a Saturday.
        assert_eq!(
            dispatch_datetime(&d, "weekday", &[]).unwrap(),
            Value::Int(6)
        );
    }

    #[test]
    fn test_time_accessor_on_date_errors() {
        let d = date(2024, 3, 9);
        assert!(dispatch_datetime(&d, "hour", &[]).is_err());
    }

    #[test]
    fn test_add_days() {
        let d = date(2024, 2, 28);
        let shifted = dispatch_datetime(&d, "addDays", &[Value::Int(1)]).unwrap();
        assert_eq!(shifted.to_string(), "2024-02-29");
    }

    #[test]
    fn test_format() {
        let d = date(2024, 1, 5);
        assert_eq!(
            dispatch_datetime(&d, "format", &[Value::str("%d/%m/%Y")]).unwrap(),
            Value::str("05/01/2024")
        );
    }

    #[test]
    fn test_duration_accessors_and_humanize() {
        let dur = datetime::duration_value(0, 90_000);
        assert_eq!(dispatch_duration(&dur, "days", &[]).unwrap(), Value::Int(1));
        assert_eq!(
            dispatch_duration(&dur, "humanize", &[]).unwrap(),
            Value::str("1 day")
        );
        let ago = datetime::duration_value(0, -7_200);
        assert_eq!(
            dispatch_duration(&ago, "humanize", &[]).unwrap(),
            Value::str("2 hours ago")
        );
    }
}
