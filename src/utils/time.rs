use anyhow::{anyhow, Result};
use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime, Timelike};

/// Parse a local time-of-day. Accepts "HH:MM", "HH:MM:SS", API values
/// carrying a zone suffix such as "05:12 (PKT)", and 12-hour "01:05 PM".
pub fn parse_time_of_day(s: &str) -> Result<NaiveTime> {
    if let Ok(h24) = to_24h(s) {
        return NaiveTime::parse_from_str(&h24, "%H:%M")
            .map_err(|e| anyhow!("Bad time '{}': {}", s, e));
    }
    let trimmed = s.split_whitespace().next().unwrap_or("");
    NaiveTime::parse_from_str(trimmed, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(trimmed, "%H:%M:%S"))
        .map_err(|e| anyhow!("Bad time '{}': {}", s, e))
}

/// 13:05 -> "01:05 PM"
pub fn to_12h(t: NaiveTime) -> String {
    t.format("%I:%M %p").to_string()
}

/// "01:05 PM" -> "13:05"
pub fn to_24h(s: &str) -> Result<String> {
    let normalized = s.trim().to_uppercase();
    let t = NaiveTime::parse_from_str(&normalized, "%I:%M %p")
        .map_err(|e| anyhow!("Bad 12-hour time '{}': {}", s, e))?;
    Ok(t.format("%H:%M").to_string())
}

/// Pin a time-of-day to a concrete local date.
pub fn on_date(date: NaiveDate, time: NaiveTime) -> NaiveDateTime {
    date.and_time(time.with_nanosecond(0).unwrap_or(time))
}

/// Time left until `target`. A negative difference means the clock crossed a
/// day boundary between the two reads, so a day is added.
pub fn remaining(now: NaiveDateTime, target: NaiveDateTime) -> Duration {
    let diff = target - now;
    if diff < Duration::zero() {
        diff + Duration::days(1)
    } else {
        diff
    }
}

pub fn remaining_seconds(now: NaiveDateTime, target: NaiveDateTime) -> i64 {
    remaining(now, target).num_seconds()
}

/// Zero-padded "HH:MM:SS". Negative durations render as "00:00:00".
pub fn format_hms(d: Duration) -> String {
    let secs = d.num_seconds().max(0);
    format!(
        "{:02}:{:02}:{:02}",
        secs / 3600,
        (secs % 3600) / 60,
        secs % 60
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(h: u32, m: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 3, 14)
            .unwrap()
            .and_hms_opt(h, m, s)
            .unwrap()
    }

    #[test]
    fn converts_between_clock_formats() {
        let t = |h, m| NaiveTime::from_hms_opt(h, m, 0).unwrap();
        assert_eq!(to_12h(t(13, 5)), "01:05 PM");
        assert_eq!(to_12h(t(0, 30)), "12:30 AM");
        assert_eq!(to_12h(t(12, 0)), "12:00 PM");
        assert_eq!(to_24h("01:05 PM").unwrap(), "13:05");
        assert_eq!(to_24h("12:30 am").unwrap(), "00:30");
    }

    #[test]
    fn twelve_hour_round_trip_keeps_hour_and_minute() {
        for h in 0..24 {
            for m in [0, 1, 29, 59] {
                let original = format!("{:02}:{:02}", h, m);
                let parsed = parse_time_of_day(&original).unwrap();
                let back = to_24h(&to_12h(parsed)).unwrap();
                assert_eq!(back, original);
            }
        }
    }

    #[test]
    fn parses_api_times_with_zone_suffix() {
        let t = parse_time_of_day("05:12 (PKT)").unwrap();
        assert_eq!(t, NaiveTime::from_hms_opt(5, 12, 0).unwrap());
        assert!(parse_time_of_day("5 o'clock").is_err());
        assert_eq!(
            parse_time_of_day("01:05 PM").unwrap(),
            NaiveTime::from_hms_opt(13, 5, 0).unwrap()
        );
    }

    #[test]
    fn formats_remaining_duration() {
        let now = at(10, 0, 0);
        let target = at(11, 2, 3);
        assert_eq!(format_hms(remaining(now, target)), "01:02:03");
        assert_eq!(remaining_seconds(now, target), 3723);
    }

    #[test]
    fn remaining_wraps_across_midnight() {
        let now = at(23, 59, 30);
        let target = at(0, 0, 30);
        assert_eq!(remaining_seconds(now, target), 60);
    }

    #[test]
    fn negative_duration_formats_as_zero() {
        assert_eq!(format_hms(Duration::seconds(-5)), "00:00:00");
    }
}
