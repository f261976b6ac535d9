//! Date-expression parsing for sync window boundaries.
//!
//! Accepts RFC 3339 timestamps, a handful of common absolute formats, and
//! relative expressions such as `yesterday` or `3 days ago`. Naive inputs
//! are interpreted as UTC. Relative expressions resolve against an instant
//! supplied by the caller so the resolver stays deterministic under test.

use anyhow::{Result, anyhow};
use chrono::{DateTime, Duration, Months, NaiveDate, NaiveDateTime, Utc};

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%d/%m/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M:%S",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d/%m/%Y", "%m/%d/%Y", "%Y/%m/%d"];

pub fn parse_date_expr(expr: &str, now: DateTime<Utc>) -> Result<DateTime<Utc>> {
    let trimmed = expr.trim();
    if trimmed.is_empty() {
        return Err(anyhow!("Date expression cannot be empty"));
    }

    match trimmed.to_ascii_lowercase().as_str() {
        "now" => return Ok(now),
        "today" => return Ok(start_of_day(now)),
        "yesterday" => return Ok(start_of_day(now) - Duration::days(1)),
        _ => {}
    }

    if let Some(resolved) = parse_relative(trimmed, now)? {
        return Ok(resolved);
    }

    if let Ok(parsed) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(parsed.with_timezone(&Utc));
    }
    for fmt in DATETIME_FORMATS {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(trimmed, fmt) {
            return Ok(parsed.and_utc());
        }
    }
    for fmt in DATE_FORMATS {
        if let Ok(parsed) = NaiveDate::parse_from_str(trimmed, fmt) {
            if let Some(midnight) = parsed.and_hms_opt(0, 0, 0) {
                return Ok(midnight.and_utc());
            }
        }
    }

    Err(anyhow!("Failed to parse '{trimmed}' as a date expression"))
}

/// Parse `<count> <unit> ago` expressions, e.g. `2 weeks ago`.
fn parse_relative(expr: &str, now: DateTime<Utc>) -> Result<Option<DateTime<Utc>>> {
    let lowered = expr.to_ascii_lowercase();
    let mut parts = lowered.split_whitespace();
    let (Some(count), Some(unit), Some("ago"), None) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return Ok(None);
    };
    let count: i64 = count
        .parse()
        .map_err(|_| anyhow!("Invalid count '{count}' in relative date expression '{expr}'"))?;
    if count < 0 {
        return Err(anyhow!("Relative date count must not be negative: '{expr}'"));
    }

    let resolved = match unit.trim_end_matches('s') {
        "minute" => now - Duration::minutes(count),
        "hour" => now - Duration::hours(count),
        "day" => now - Duration::days(count),
        "week" => now - Duration::weeks(count),
        "month" => {
            let months = u32::try_from(count)
                .map_err(|_| anyhow!("Relative month count out of range: '{expr}'"))?;
            now.checked_sub_months(Months::new(months))
                .ok_or_else(|| anyhow!("Relative month count out of range: '{expr}'"))?
        }
        other => return Err(anyhow!("Unknown unit '{other}' in date expression '{expr}'")),
    };
    Ok(Some(resolved))
}

fn start_of_day(instant: DateTime<Utc>) -> DateTime<Utc> {
    instant
        .date_naive()
        .and_hms_opt(0, 0, 0)
        .unwrap_or_else(|| instant.naive_utc())
        .and_utc()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2023, 6, 15, 10, 30, 0).unwrap()
    }

    #[test]
    fn parses_plain_dates_as_utc_midnight() {
        let parsed = parse_date_expr("2023-01-01", fixed_now()).unwrap();
        assert_eq!(parsed, Utc.with_ymd_and_hms(2023, 1, 1, 0, 0, 0).unwrap());
    }

    #[test]
    fn parses_rfc3339_with_offset() {
        let parsed = parse_date_expr("2023-06-01T12:00:00+02:00", fixed_now()).unwrap();
        assert_eq!(parsed, Utc.with_ymd_and_hms(2023, 6, 1, 10, 0, 0).unwrap());
    }

    #[test]
    fn parses_datetime_without_zone_as_utc() {
        let parsed = parse_date_expr("2023-06-01 12:00:00", fixed_now()).unwrap();
        assert_eq!(parsed, Utc.with_ymd_and_hms(2023, 6, 1, 12, 0, 0).unwrap());
    }

    #[test]
    fn resolves_relative_expressions_against_supplied_instant() {
        let now = fixed_now();
        assert_eq!(parse_date_expr("now", now).unwrap(), now);
        assert_eq!(
            parse_date_expr("yesterday", now).unwrap(),
            Utc.with_ymd_and_hms(2023, 6, 14, 0, 0, 0).unwrap()
        );
        assert_eq!(
            parse_date_expr("3 days ago", now).unwrap(),
            Utc.with_ymd_and_hms(2023, 6, 12, 10, 30, 0).unwrap()
        );
        assert_eq!(
            parse_date_expr("2 weeks ago", now).unwrap(),
            Utc.with_ymd_and_hms(2023, 6, 1, 10, 30, 0).unwrap()
        );
        assert_eq!(
            parse_date_expr("1 month ago", now).unwrap(),
            Utc.with_ymd_and_hms(2023, 5, 15, 10, 30, 0).unwrap()
        );
    }

    #[test]
    fn singular_units_are_accepted() {
        let now = fixed_now();
        assert_eq!(
            parse_date_expr("1 day ago", now).unwrap(),
            now - Duration::days(1)
        );
    }

    #[test]
    fn rejects_unparseable_input() {
        assert!(parse_date_expr("not-a-date", fixed_now()).is_err());
        assert!(parse_date_expr("", fixed_now()).is_err());
        assert!(parse_date_expr("five days ago", fixed_now()).is_err());
        assert!(parse_date_expr("3 fortnights ago", fixed_now()).is_err());
    }
}
