//! Parsing of user-facing time, period, and day strings.
//!
//! This is the validating layer in front of the layout engine: anything that
//! gets through here is a well-formed period (`start < end`) on a known day
//! key. The engine itself never sees raw text.

use std::collections::BTreeSet;

use anyhow::anyhow;
use regex::Regex;

use crate::layout::Period;

/// Canonical weekday keys in grid order.
pub const WEEKDAY_KEYS: [&str; 7] = ["M", "T", "W", "R", "F", "S", "U"];

/// Parses `"9:05"`, `"09:05"`, `"1:30pm"` into minutes of the day.
pub fn parse_minutes(raw: &str) -> anyhow::Result<u16> {
    let re = Regex::new(r"^(?P<h>\d{1,2}):(?P<m>\d{2})\s*(?P<ap>[ap]m)?$")
        .map_err(|e| anyhow!("internal regex compile failure: {e}"))?;

    let text = raw.trim().to_ascii_lowercase();
    let caps = re
        .captures(&text)
        .ok_or_else(|| anyhow!("invalid time: {raw}"))?;

    let hour: u16 = caps["h"].parse()?;
    let minute: u16 = caps["m"].parse()?;
    if minute >= 60 {
        return Err(anyhow!("invalid minute in time: {raw}"));
    }

    let hour = match caps.name("ap").map(|m| m.as_str()) {
        Some("am") if hour == 12 => 0,
        Some("pm") if hour < 12 => hour + 12,
        Some(_) | None => hour,
    };
    if hour >= 24 {
        return Err(anyhow!("invalid hour in time: {raw}"));
    }

    Ok(hour * 60 + minute)
}

/// Parses `"09:05-09:55"` (or am/pm forms) into a [`Period`].
pub fn parse_period(raw: &str) -> anyhow::Result<Period> {
    let (start_raw, end_raw) = raw
        .split_once('-')
        .ok_or_else(|| anyhow!("expected START-END period, got: {raw}"))?;

    let start = parse_minutes(start_raw)?;
    let end = parse_minutes(end_raw)?;
    if start >= end {
        return Err(anyhow!("period must end after it starts: {raw}"));
    }

    Ok(Period::new(start, end))
}

/// Parses a compact day string like `"MWF"` into a day-key set.
///
/// `R` is Thursday, `S` Saturday, `U` Sunday, per the registrar convention.
pub fn parse_days(raw: &str) -> anyhow::Result<BTreeSet<String>> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(anyhow!("day string cannot be empty"));
    }

    let mut days = BTreeSet::new();
    for ch in trimmed.chars() {
        let key = ch.to_ascii_uppercase().to_string();
        if !WEEKDAY_KEYS.contains(&key.as_str()) {
            return Err(anyhow!("unknown day letter '{ch}' in: {raw}"));
        }
        days.insert(key);
    }
    Ok(days)
}

/// Formats minutes-of-day back to `"HH:MM"` for display.
pub fn format_minutes(minutes: u16) -> String {
    format!("{:02}:{:02}", minutes / 60, minutes % 60)
}

/// Human-readable `"09:05-09:55"` form of a period.
pub fn format_period(period: Period) -> String {
    format!(
        "{}-{}",
        format_minutes(period.start),
        format_minutes(period.end)
    )
}

#[cfg(test)]
mod tests {
    use super::{format_period, parse_days, parse_minutes, parse_period};

    #[test]
    fn parses_plain_and_meridiem_times() {
        assert_eq!(parse_minutes("9:05").expect("time"), 545);
        assert_eq!(parse_minutes("09:05").expect("time"), 545);
        assert_eq!(parse_minutes("1:30pm").expect("time"), 810);
        assert_eq!(parse_minutes("12:00am").expect("time"), 0);
        assert_eq!(parse_minutes("12:15 PM").expect("time"), 735);
    }

    #[test]
    fn rejects_malformed_times() {
        assert!(parse_minutes("25:00").is_err());
        assert!(parse_minutes("9:61").is_err());
        assert!(parse_minutes("noon").is_err());
    }

    #[test]
    fn parses_periods_and_round_trips_display() {
        let period = parse_period("09:05-09:55").expect("period");
        assert_eq!((period.start, period.end), (545, 595));
        assert_eq!(format_period(period), "09:05-09:55");
    }

    #[test]
    fn rejects_inverted_or_empty_periods() {
        assert!(parse_period("10:00-09:00").is_err());
        assert!(parse_period("10:00-10:00").is_err());
        assert!(parse_period("10:00").is_err());
    }

    #[test]
    fn parses_day_strings() {
        let days = parse_days("mwf").expect("days");
        assert_eq!(
            days.into_iter().collect::<Vec<_>>(),
            vec!["F".to_string(), "M".to_string(), "W".to_string()]
        );
        assert!(parse_days("MXZ").is_err());
        assert!(parse_days("").is_err());
    }
}
