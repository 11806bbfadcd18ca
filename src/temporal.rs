//! Date/time validation and repair.
//!
//! Pure functions, no I/O. Everything downstream of extraction funnels its
//! date and time strings through here: completion services emit times like
//! "5pm", "17.30", "00025", and dates like "20-11-17" or "today", and the
//! pipeline must not fail on any of them. Repairs are best-effort with
//! explicit defaults; the caller learns via a flag when a date fell back.

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime, Weekday};

use crate::types::TimeRangeQuery;

/// Default event length when no end time or duration is given.
pub const DEFAULT_DURATION_MINUTES: i64 = 60;

/// Time used when a start time is missing or unsalvageable.
pub const FALLBACK_TIME: &str = "12:00";

/// Observed five-digit inputs with fixed repairs. These came from production
/// traffic and don't follow the general pad-and-split rule; kept as an
/// explicit finite table rather than generalized.
const FIVE_DIGIT_TIME_FIXES: &[(&str, &str)] = &[("00025", "20:00"), ("00011", "11:00")];

// ============================================================================
// Validation
// ============================================================================

/// Strict `YYYY-MM-DD` check with a round-trip test: parsing then
/// re-formatting must reproduce the input (rejects "2025-1-5").
pub fn is_valid_date(s: &str) -> bool {
    match NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        Ok(d) => d.format("%Y-%m-%d").to_string() == s,
        Err(_) => false,
    }
}

/// Strict `HH:MM`, hours 0–23, minutes 0–59.
pub fn is_valid_time(s: &str) -> bool {
    let bytes = s.as_bytes();
    if bytes.len() != 5 || bytes[2] != b':' {
        return false;
    }
    let (h, m) = (&s[..2], &s[3..]);
    match (h.parse::<u32>(), m.parse::<u32>()) {
        (Ok(h), Ok(m)) => h <= 23 && m <= 59,
        _ => false,
    }
}

// ============================================================================
// Date repair
// ============================================================================

/// Resolve or repair a date string. Returns the cleaned `YYYY-MM-DD` date and
/// whether the fallback default (`current_date`) was used.
pub fn clean_date_string(s: &str, current_date: NaiveDate) -> (String, bool) {
    let trimmed = s.trim();
    let lowered = trimmed.to_lowercase();

    match lowered.as_str() {
        "today" | "tonight" => return (current_date.format("%Y-%m-%d").to_string(), false),
        "tomorrow" => {
            let d = current_date + Duration::days(1);
            return (d.format("%Y-%m-%d").to_string(), false);
        }
        "yesterday" => {
            let d = current_date - Duration::days(1);
            return (d.format("%Y-%m-%d").to_string(), false);
        }
        _ => {}
    }

    if is_valid_date(trimmed) {
        return (trimmed.to_string(), false);
    }

    let parts: Vec<&str> = trimmed.split('-').collect();

    // Bare numeric day-range "D1-D2": interpret as the start day of that
    // range in the current year/month ("5-9" → the 5th).
    if parts.len() == 2 {
        if let (Ok(d1), Ok(d2)) = (parts[0].parse::<u32>(), parts[1].parse::<u32>()) {
            if (1..=31).contains(&d1) && (1..=31).contains(&d2) && d1 < d2 {
                if let Some(date) =
                    NaiveDate::from_ymd_opt(current_date.year(), current_date.month(), d1)
                {
                    return (date.format("%Y-%m-%d").to_string(), false);
                }
            }
        }
    }

    // Three-part date whose first segment is a truncated year ("20-11-17",
    // "202-11-17"): substitute the current year, keep month/day.
    if parts.len() == 3 {
        let first = parts[0];
        let truncated_year =
            !first.is_empty() && first.len() < 4 && first.chars().all(|c| c.is_ascii_digit());
        if truncated_year {
            if let (Ok(month), Ok(day)) = (parts[1].parse::<u32>(), parts[2].parse::<u32>()) {
                if let Some(date) = NaiveDate::from_ymd_opt(current_date.year(), month, day) {
                    return (date.format("%Y-%m-%d").to_string(), false);
                }
            }
        }
    }

    // Best-effort salvage across common alternate formats.
    for fmt in ["%Y/%m/%d", "%d/%m/%Y", "%d-%m-%Y", "%m/%d/%Y", "%Y.%m.%d"] {
        if let Ok(date) = NaiveDate::parse_from_str(trimmed, fmt) {
            return (date.format("%Y-%m-%d").to_string(), false);
        }
    }

    log::debug!("clean_date_string: unsalvageable {:?}, defaulting to today", s);
    (current_date.format("%Y-%m-%d").to_string(), true)
}

// ============================================================================
// Time repair
// ============================================================================

/// Repair a time string to `HH:MM` 24-hour form.
///
/// Handles "5pm", "5:30 PM", "17.30", bare numerics ("930" → "09:30",
/// "45" → "00:45"), and the fixed five-digit lookup cases. Empty or
/// unparsable input defaults to 12:00. Idempotent for already-valid input.
pub fn clean_time_string(s: &str) -> String {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return FALLBACK_TIME.to_string();
    }

    for (raw, fixed) in FIVE_DIGIT_TIME_FIXES {
        if trimmed == *raw {
            return (*fixed).to_string();
        }
    }

    let lowered = trimmed.to_lowercase();
    let is_pm = lowered.contains("pm");
    let is_am = lowered.contains("am");

    // Keep digits and colons only; "17.30"/"17,30" normalize to a colon.
    let cleaned: String = lowered
        .chars()
        .map(|c| if c == '.' || c == ',' { ':' } else { c })
        .filter(|c| c.is_ascii_digit() || *c == ':')
        .collect();

    if cleaned.is_empty() {
        return FALLBACK_TIME.to_string();
    }

    let (hour, minute) = if let Some((h, m)) = cleaned.split_once(':') {
        let hour = h.parse::<u32>().unwrap_or(12);
        let minute = m.parse::<u32>().unwrap_or(0);
        (hour, minute)
    } else {
        // Pure numeric. Two digits under 60 read as minutes past hour zero;
        // anything else pads to 4 digits and splits HHMM.
        if cleaned.len() == 2 {
            if let Ok(v) = cleaned.parse::<u32>() {
                if v < 60 && !is_am && !is_pm {
                    return format!("00:{:02}", v);
                }
            }
        }
        let digits = if cleaned.len() > 4 {
            cleaned[cleaned.len() - 4..].to_string()
        } else {
            format!("{:0>4}", cleaned)
        };
        let hour = digits[..2].parse::<u32>().unwrap_or(12);
        let minute = digits[2..].parse::<u32>().unwrap_or(0);
        // "5pm"/"11am" style: the number is an hour, not an HHMM block.
        if (is_am || is_pm) && cleaned.len() <= 2 {
            (cleaned.parse::<u32>().unwrap_or(12), 0)
        } else {
            (hour, minute)
        }
    };

    let mut hour = hour.min(23);
    let minute = minute.min(59);

    if is_pm && hour < 12 {
        hour += 12;
    }
    if is_am && hour == 12 {
        hour = 0;
    }

    format!("{:02}:{:02}", hour, minute)
}

// ============================================================================
// Duration arithmetic
// ============================================================================

/// Minutes described by a phrase like "2 hours", "90 min", "break of 5
/// minutes". The first integer wins; hour units multiply by 60; no integer
/// defaults to 60 minutes.
pub fn parse_duration_minutes(phrase: &str) -> i64 {
    let lowered = phrase.to_lowercase();
    let digits: String = {
        let mut out = String::new();
        let mut seen = false;
        for c in lowered.chars() {
            if c.is_ascii_digit() {
                out.push(c);
                seen = true;
            } else if seen {
                break;
            }
        }
        out
    };

    let amount = digits.parse::<i64>().unwrap_or(DEFAULT_DURATION_MINUTES);
    if digits.is_empty() {
        return DEFAULT_DURATION_MINUTES;
    }

    if lowered.contains("hour") || lowered.contains("hr") {
        amount * 60
    } else {
        amount
    }
}

/// Add a duration phrase to an `HH:MM` start time, wrapping past midnight.
pub fn calculate_end_time_from_duration(start: &str, duration_phrase: &str) -> String {
    let minutes = parse_duration_minutes(duration_phrase);
    add_minutes_wrapping(start, minutes)
}

/// `start + minutes` on a 24-hour clock, wrapping at midnight.
pub fn add_minutes_wrapping(start: &str, minutes: i64) -> String {
    let start = clean_time_string(start);
    let (h, m) = (
        start[..2].parse::<i64>().unwrap_or(0),
        start[3..].parse::<i64>().unwrap_or(0),
    );
    let total = (h * 60 + m + minutes).rem_euclid(24 * 60);
    format!("{:02}:{:02}", total / 60, total % 60)
}

// ============================================================================
// Start/end resolution
// ============================================================================

/// Resolve a draft's date/start/end into concrete datetimes.
///
/// `date` and `start` must already be valid (clean them first); if either is
/// not, this is unrecoverable and both results are absent. A missing or
/// invalid `end` is derived from `duration` (or the 60-minute default). An
/// end at or before the start is forced to start + 60 minutes; an end that
/// crosses midnight lands on the next day, so the returned end is always
/// strictly after the returned start.
pub fn parse_start_end_datetime(
    date: &str,
    start: &str,
    end: Option<&str>,
    duration: Option<&str>,
) -> Option<(NaiveDateTime, NaiveDateTime)> {
    if !is_valid_date(date) || !is_valid_time(start) {
        return None;
    }
    let day = NaiveDate::parse_from_str(date, "%Y-%m-%d").ok()?;
    let start_time = NaiveTime::parse_from_str(start, "%H:%M").ok()?;
    let start_dt = day.and_time(start_time);

    let (end_str, derived) = match end {
        Some(e) if is_valid_time(e) => (e.to_string(), false),
        _ => (
            match duration {
                Some(d) => calculate_end_time_from_duration(start, d),
                None => add_minutes_wrapping(start, DEFAULT_DURATION_MINUTES),
            },
            true,
        ),
    };

    let end_time = NaiveTime::parse_from_str(&end_str, "%H:%M").ok()?;
    let mut end_dt = day.and_time(end_time);
    if end_dt <= start_dt {
        if derived && end_time < start_time {
            // Derived end wrapped past midnight: same clock time, next day.
            end_dt += Duration::days(1);
        } else {
            // Stated end at or before the start: force a one-hour window.
            end_dt = start_dt + Duration::minutes(DEFAULT_DURATION_MINUTES);
        }
    }

    Some((start_dt, end_dt))
}

// ============================================================================
// Named ranges
// ============================================================================

/// Resolve a named range ("today", "next week", "next 3 days") to an
/// inclusive day-aligned window. Weeks start Monday. Unrecognized names
/// default to today.
pub fn calculate_time_range(range_name: &str, current_date: NaiveDate) -> TimeRangeQuery {
    let lowered = range_name.trim().to_lowercase();

    let (start, end, description) = match lowered.as_str() {
        "yesterday" => {
            let d = current_date - Duration::days(1);
            (d, d, format!("yesterday ({})", d))
        }
        "tomorrow" => {
            let d = current_date + Duration::days(1);
            (d, d, format!("tomorrow ({})", d))
        }
        "this week" => {
            let monday = week_start(current_date);
            let sunday = monday + Duration::days(6);
            (monday, sunday, format!("this week ({} to {})", monday, sunday))
        }
        "next week" => {
            let monday = week_start(current_date) + Duration::days(7);
            let sunday = monday + Duration::days(6);
            (monday, sunday, format!("next week ({} to {})", monday, sunday))
        }
        _ => {
            if let Some(n) = parse_next_n_days(&lowered) {
                let end = current_date + Duration::days(n - 1);
                (
                    current_date,
                    end,
                    format!("the next {} days ({} to {})", n, current_date, end),
                )
            } else {
                // "today" and anything unrecognized.
                (
                    current_date,
                    current_date,
                    format!("today ({})", current_date),
                )
            }
        }
    };

    TimeRangeQuery {
        name: lowered,
        window_start: start,
        window_end: end,
        human_description: description,
    }
}

fn parse_next_n_days(s: &str) -> Option<i64> {
    let rest = s.strip_prefix("next")?.trim();
    let (num, unit) = rest.split_once(' ')?;
    if !unit.trim().starts_with("day") {
        return None;
    }
    let n = num.trim().parse::<i64>().ok()?;
    (n > 0).then_some(n)
}

/// Monday of the week containing `d`.
pub fn week_start(d: NaiveDate) -> NaiveDate {
    d - Duration::days(d.weekday().num_days_from_monday() as i64)
}

/// The next weekday strictly after `from`, skipping Saturday and Sunday.
/// Used as the default date for drafts with no usable date at all.
pub fn next_weekday(from: NaiveDate) -> NaiveDate {
    let mut d = from + Duration::days(1);
    while matches!(d.weekday(), Weekday::Sat | Weekday::Sun) {
        d += Duration::days(1);
    }
    d
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    // --- validation ---

    #[test]
    fn test_is_valid_date() {
        assert!(is_valid_date("2025-11-16"));
        assert!(!is_valid_date("2025-1-5")); // round-trip rejects non-padded
        assert!(!is_valid_date("2025-13-01"));
        assert!(!is_valid_date("16-11-2025"));
        assert!(!is_valid_date("tomorrow"));
        assert!(!is_valid_date(""));
    }

    #[test]
    fn test_is_valid_time() {
        assert!(is_valid_time("00:00"));
        assert!(is_valid_time("23:59"));
        assert!(is_valid_time("09:30"));
        assert!(!is_valid_time("24:00"));
        assert!(!is_valid_time("12:60"));
        assert!(!is_valid_time("9:30"));
        assert!(!is_valid_time("0930"));
        assert!(!is_valid_time(""));
    }

    // --- date repair ---

    #[test]
    fn test_clean_date_relative_words() {
        let today = date("2025-11-16");
        assert_eq!(clean_date_string("today", today), ("2025-11-16".into(), false));
        assert_eq!(
            clean_date_string("Tomorrow", today),
            ("2025-11-17".into(), false)
        );
    }

    #[test]
    fn test_clean_date_valid_passthrough() {
        let today = date("2025-11-16");
        assert_eq!(
            clean_date_string("2025-12-01", today),
            ("2025-12-01".into(), false)
        );
    }

    #[test]
    fn test_clean_date_day_range() {
        let today = date("2025-11-16");
        // "5-9" means the 5th through the 9th; the range starts on the 5th.
        assert_eq!(clean_date_string("5-9", today), ("2025-11-05".into(), false));
    }

    #[test]
    fn test_clean_date_day_range_rejects_inverted() {
        // "20-17" is not a valid day range (20 > 17); with current date
        // 2025-11-17 it falls back to the current date.
        let today = date("2025-11-17");
        assert_eq!(
            clean_date_string("20-17", today),
            ("2025-11-17".into(), true)
        );
    }

    #[test]
    fn test_clean_date_truncated_year() {
        let today = date("2025-11-16");
        assert_eq!(
            clean_date_string("20-11-17", today),
            ("2025-11-17".into(), false)
        );
        assert_eq!(
            clean_date_string("202-12-05", today),
            ("2025-12-05".into(), false)
        );
    }

    #[test]
    fn test_clean_date_alternate_formats() {
        let today = date("2025-11-16");
        assert_eq!(
            clean_date_string("2025/11/20", today),
            ("2025-11-20".into(), false)
        );
        assert_eq!(
            clean_date_string("20/11/2025", today),
            ("2025-11-20".into(), false)
        );
    }

    #[test]
    fn test_clean_date_fallback_flag() {
        let today = date("2025-11-16");
        let (cleaned, fell_back) = clean_date_string("garbage", today);
        assert_eq!(cleaned, "2025-11-16");
        assert!(fell_back);
    }

    // --- time repair ---

    #[test]
    fn test_clean_time_idempotent_on_valid() {
        for t in ["00:00", "09:30", "17:45", "23:59"] {
            assert_eq!(clean_time_string(t), t);
        }
    }

    #[test]
    fn test_clean_time_am_pm() {
        assert_eq!(clean_time_string("5pm"), "17:00");
        assert_eq!(clean_time_string("5:30 PM"), "17:30");
        assert_eq!(clean_time_string("12am"), "00:00");
        assert_eq!(clean_time_string("12pm"), "12:00");
        assert_eq!(clean_time_string("11am"), "11:00");
    }

    #[test]
    fn test_clean_time_numeric_padding() {
        assert_eq!(clean_time_string("930"), "09:30");
        assert_eq!(clean_time_string("1430"), "14:30");
        assert_eq!(clean_time_string("9"), "00:09");
    }

    #[test]
    fn test_clean_time_two_digit_minutes() {
        // A 2-digit numeric under 60 reads as minutes past hour zero.
        assert_eq!(clean_time_string("45"), "00:45");
        assert_eq!(clean_time_string("05"), "00:05");
        // 60+ can't be minutes; pads and clamps instead.
        assert_eq!(clean_time_string("75"), "00:59");
    }

    #[test]
    fn test_clean_time_five_digit_lookup() {
        // Fixed production repairs, not a general rule.
        assert_eq!(clean_time_string("00025"), "20:00");
        assert_eq!(clean_time_string("00011"), "11:00");
    }

    #[test]
    fn test_clean_time_clamping() {
        assert_eq!(clean_time_string("25:99"), "23:59");
        assert_eq!(clean_time_string("17.30"), "17:30");
    }

    #[test]
    fn test_clean_time_unparsable_defaults() {
        assert_eq!(clean_time_string(""), "12:00");
        assert_eq!(clean_time_string("noonish"), "12:00");
    }

    // --- durations ---

    #[test]
    fn test_duration_parsing() {
        assert_eq!(parse_duration_minutes("2 hours"), 120);
        assert_eq!(parse_duration_minutes("1 hr"), 60);
        assert_eq!(parse_duration_minutes("90 minutes"), 90);
        assert_eq!(parse_duration_minutes("break of 5 minutes"), 5);
        assert_eq!(parse_duration_minutes("15 min"), 15);
        assert_eq!(parse_duration_minutes("a while"), 60);
    }

    #[test]
    fn test_end_time_from_duration() {
        assert_eq!(calculate_end_time_from_duration("09:00", "2 hours"), "11:00");
        assert_eq!(calculate_end_time_from_duration("09:00", "45 min"), "09:45");
        // No integer → 60-minute default.
        assert_eq!(calculate_end_time_from_duration("09:00", "some time"), "10:00");
    }

    #[test]
    fn test_end_time_wraps_midnight() {
        assert_eq!(calculate_end_time_from_duration("23:30", "1 hour"), "00:30");
        assert_eq!(add_minutes_wrapping("23:59", 2), "00:01");
    }

    // --- start/end resolution ---

    #[test]
    fn test_parse_start_end_basic() {
        let (s, e) =
            parse_start_end_datetime("2025-11-16", "15:30", Some("18:00"), None).unwrap();
        assert_eq!(s.to_string(), "2025-11-16 15:30:00");
        assert_eq!(e.to_string(), "2025-11-16 18:00:00");
    }

    #[test]
    fn test_parse_start_end_derives_from_duration() {
        let (s, e) =
            parse_start_end_datetime("2025-11-16", "09:00", None, Some("2 hours")).unwrap();
        assert_eq!(e - s, Duration::hours(2));
    }

    #[test]
    fn test_parse_start_end_default_hour() {
        let (s, e) = parse_start_end_datetime("2025-11-16", "09:00", None, None).unwrap();
        assert_eq!(e - s, Duration::minutes(60));
    }

    #[test]
    fn test_parse_start_end_forces_end_after_start() {
        let (s, e) =
            parse_start_end_datetime("2025-11-16", "15:00", Some("14:00"), None).unwrap();
        assert!(e > s);
        assert_eq!(e - s, Duration::minutes(60));
    }

    #[test]
    fn test_parse_start_end_wrap_crosses_midnight() {
        let (s, e) =
            parse_start_end_datetime("2025-11-16", "23:30", None, Some("1 hour")).unwrap();
        assert!(e > s);
        assert_eq!(e.date(), date("2025-11-17"));
    }

    #[test]
    fn test_parse_start_end_invalid_inputs_absent() {
        assert!(parse_start_end_datetime("garbage", "09:00", None, None).is_none());
        assert!(parse_start_end_datetime("2025-11-16", "9am", None, None).is_none());
    }

    // --- named ranges ---

    #[test]
    fn test_time_range_today_tomorrow() {
        let today = date("2025-11-16"); // a Sunday
        let r = calculate_time_range("today", today);
        assert_eq!(r.window_start, today);
        assert_eq!(r.window_end, today);

        let r = calculate_time_range("tomorrow", today);
        assert_eq!(r.window_start, date("2025-11-17"));
    }

    #[test]
    fn test_time_range_weeks_monday_start() {
        let sunday = date("2025-11-16");
        let r = calculate_time_range("this week", sunday);
        assert_eq!(r.window_start, date("2025-11-10"));
        assert_eq!(r.window_end, date("2025-11-16"));

        let r = calculate_time_range("next week", sunday);
        assert_eq!(r.window_start, date("2025-11-17"));
        assert_eq!(r.window_end, date("2025-11-23"));
    }

    #[test]
    fn test_time_range_next_n_days() {
        let today = date("2025-11-16");
        let r = calculate_time_range("next 3 days", today);
        assert_eq!(r.window_start, today);
        assert_eq!(r.window_end, date("2025-11-18"));
    }

    #[test]
    fn test_time_range_unknown_defaults_today() {
        let today = date("2025-11-16");
        let r = calculate_time_range("fortnight", today);
        assert_eq!(r.window_start, today);
        assert_eq!(r.window_end, today);
    }

    // --- helpers ---

    #[test]
    fn test_next_weekday_skips_weekend() {
        // Friday → Monday
        assert_eq!(next_weekday(date("2025-11-14")), date("2025-11-17"));
        // Sunday → Monday
        assert_eq!(next_weekday(date("2025-11-16")), date("2025-11-17"));
        // Monday → Tuesday
        assert_eq!(next_weekday(date("2025-11-17")), date("2025-11-18"));
    }
}
