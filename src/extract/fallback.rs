//! Deterministic rule-based extraction — the terminal strategy.
//!
//! Guaranteed to produce at least one draft for any input, including empty
//! and non-English text, so the cascade above it can never fail. Time ranges
//! are pulled by regex; everything left over becomes the title; missing
//! pieces default from the request's current date/time.

use chrono::{NaiveDate, NaiveTime};
use regex::Regex;

use crate::temporal::{add_minutes_wrapping, parse_duration_minutes};
use crate::types::EventDraft;

/// `HH(:MM)?(am|pm)? - HH(:MM)?(am|pm)?`
fn time_range_re() -> Regex {
    Regex::new(r"(?i)(\d{1,2})(?::(\d{2}))?\s*(am|pm)?\s*-\s*(\d{1,2})(?::(\d{2}))?\s*(am|pm)?")
        .unwrap()
}

/// "break of 5 minutes", "break of 1 hour"
fn break_re() -> Regex {
    Regex::new(r"(?i)break\s+of\s+(\d+)\s*(minutes?|mins?|hours?|hrs?)").unwrap()
}

/// Leading action verbs stripped from derived titles.
fn action_verb_re() -> Regex {
    Regex::new(r"(?i)^(?:please\s+)?(?:create|add|schedule|book|make|plan|set\s+up|new)\s+(?:an?\s+)?(?:event\s+)?(?:for\s+)?")
        .unwrap()
}

/// Convert a matched clock reading to 24-hour form.
///
/// Bare hours 1–7 with no am/pm marker read as afternoon/evening — "3:30-6"
/// almost always means 15:30–18:00 in scheduling text, while 8–12 stay as
/// written.
fn to_24h(hour: u32, minute: u32, ampm: Option<&str>) -> String {
    let mut h = hour.min(23);
    let m = minute.min(59);
    match ampm.map(|s| s.to_lowercase()) {
        Some(ref s) if s == "pm" => {
            if h < 12 {
                h += 12;
            }
        }
        Some(ref s) if s == "am" => {
            if h == 12 {
                h = 0;
            }
        }
        _ => {
            if (1..=7).contains(&h) {
                h += 12;
            }
        }
    }
    format!("{:02}:{:02}", h, m)
}

struct RangeMatch {
    start: String,
    end: String,
    span: (usize, usize),
}

fn find_ranges(text: &str) -> Vec<RangeMatch> {
    time_range_re()
        .captures_iter(text)
        .filter_map(|cap| {
            let whole = cap.get(0)?;
            let h1: u32 = cap.get(1)?.as_str().parse().ok()?;
            let m1: u32 = cap.get(2).map_or(0, |m| m.as_str().parse().unwrap_or(0));
            let h2: u32 = cap.get(4)?.as_str().parse().ok()?;
            let m2: u32 = cap.get(5).map_or(0, |m| m.as_str().parse().unwrap_or(0));
            let ap1 = cap.get(3).map(|m| m.as_str());
            let ap2 = cap.get(6).map(|m| m.as_str());
            // A marker on the start carries to an unmarked end ("6pm-7:30"),
            // but not the other way: "11-1pm" means 11:00, not 23:00.
            let start = to_24h(h1, m1, ap1);
            let end = to_24h(h2, m2, ap2.or(ap1));
            Some(RangeMatch {
                start,
                end,
                span: (whole.start(), whole.end()),
            })
        })
        .collect()
}

/// Strip action verbs, connectives, and leftover punctuation from a title
/// fragment.
fn clean_title(fragment: &str) -> String {
    let mut title = fragment.trim().to_string();
    title = action_verb_re().replace(&title, "").to_string();

    // Connective phrases that join activities, stranded at the edges once the
    // time ranges are cut out.
    let connective =
        Regex::new(r"(?i)^(?:and\s+then|afterwards?|after\s+that|and|then)\b|\b(?:and\s+then|afterwards?|after\s+that|and|then)$")
            .unwrap();
    loop {
        let stripped = connective.replace_all(title.trim(), "").trim().to_string();
        if stripped == title {
            break;
        }
        title = stripped;
    }

    title
        .trim_matches(|c: char| c.is_whitespace() || c == ',' || c == '.' || c == ';' || c == ':')
        .to_string()
}

/// Always-succeeding extraction. Returns drafts in utterance order, with
/// synthesized break drafts where the text states a break duration.
pub fn extract_fallback(
    raw_text: &str,
    current_date: NaiveDate,
    current_time: NaiveTime,
) -> Vec<EventDraft> {
    let date = current_date.format("%Y-%m-%d").to_string();
    let ranges = find_ranges(raw_text);

    if ranges.is_empty() {
        let start = current_time.format("%H:%M").to_string();
        let end = add_minutes_wrapping(&start, crate::temporal::DEFAULT_DURATION_MINUTES);
        let mut title = clean_title(raw_text);
        if title.is_empty() {
            title = "Event 1".to_string();
        }
        return vec![EventDraft {
            title,
            date,
            start,
            end,
            ..Default::default()
        }];
    }

    let breaker = break_re();
    let mut drafts = Vec::new();

    for (i, range) in ranges.iter().enumerate() {
        // Title text: everything between this range and the next one, plus
        // the text before the first range for the first event.
        let seg_end = ranges
            .get(i + 1)
            .map(|n| n.span.0)
            .unwrap_or(raw_text.len());
        let mut fragment = String::new();
        if i == 0 {
            fragment.push_str(&raw_text[..range.span.0]);
            fragment.push(' ');
        }
        fragment.push_str(&raw_text[range.span.1..seg_end]);

        // A stated break becomes its own draft after this activity.
        let break_minutes = breaker
            .captures(&fragment)
            .and_then(|cap| cap.get(0))
            .map(|m| parse_duration_minutes(m.as_str()));
        if break_minutes.is_some() {
            let stripped = breaker.replace(&fragment, " ").to_string();
            fragment = stripped;
        }

        let mut title = clean_title(&fragment);
        if title.is_empty() {
            title = format!("Event {}", drafts.len() + 1);
        }

        drafts.push(EventDraft {
            title,
            date: date.clone(),
            start: range.start.clone(),
            end: range.end.clone(),
            ..Default::default()
        });

        if let Some(minutes) = break_minutes {
            let break_start = range.end.clone();
            let break_end = add_minutes_wrapping(&break_start, minutes);
            drafts.push(EventDraft {
                title: "Break".to_string(),
                date: date.clone(),
                start: break_start,
                end: break_end,
                ..Default::default()
            });
        }
    }

    drafts
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 11, 16).unwrap()
    }

    fn time() -> NaiveTime {
        NaiveTime::from_hms_opt(14, 0, 0).unwrap()
    }

    #[test]
    fn test_single_range_with_title() {
        let drafts = extract_fallback("schedule gym session 6:00pm-7:30pm", date(), time());
        assert_eq!(drafts.len(), 1);
        assert_eq!(drafts[0].start, "18:00");
        assert_eq!(drafts[0].end, "19:30");
        assert_eq!(drafts[0].title, "gym session");
        assert_eq!(drafts[0].date, "2025-11-16");
    }

    #[test]
    fn test_afternoon_inference_without_ampm() {
        let drafts = extract_fallback("3:30-6:00 study session", date(), time());
        assert_eq!(drafts[0].start, "15:30");
        assert_eq!(drafts[0].end, "18:00");
    }

    #[test]
    fn test_morning_hours_stay_morning() {
        let drafts = extract_fallback("9:00-10:30 standup prep", date(), time());
        assert_eq!(drafts[0].start, "09:00");
        assert_eq!(drafts[0].end, "10:30");
    }

    #[test]
    fn test_ampm_marker_carries_across_range() {
        let drafts = extract_fallback("lunch 11-1pm", date(), time());
        assert_eq!(drafts[0].start, "11:00");
        assert_eq!(drafts[0].end, "13:00");
    }

    #[test]
    fn test_no_time_range_defaults() {
        let drafts = extract_fallback("add team retro", date(), time());
        assert_eq!(drafts.len(), 1);
        assert_eq!(drafts[0].title, "team retro");
        assert_eq!(drafts[0].start, "14:00");
        assert_eq!(drafts[0].end, "15:00");
        assert_eq!(drafts[0].date, "2025-11-16");
    }

    #[test]
    fn test_empty_input_still_produces_draft() {
        let drafts = extract_fallback("", date(), time());
        assert_eq!(drafts.len(), 1);
        assert_eq!(drafts[0].title, "Event 1");
        assert!(crate::temporal::is_valid_time(&drafts[0].start));
    }

    #[test]
    fn test_multi_event_with_break_synthesis() {
        // Two activities joined by a stated break between them.
        let drafts = extract_fallback(
            "3:30-6:00 grinding programming for uni and break of 5 minutes afterwards 6:05-6:50 let's grind even more",
            date(),
            time(),
        );
        assert_eq!(drafts.len(), 3);

        assert_eq!(drafts[0].start, "15:30");
        assert_eq!(drafts[0].end, "18:00");
        assert!(drafts[0].title.contains("uni"));

        assert!(drafts[1].title.to_lowercase().contains("break"));
        assert_eq!(drafts[1].start, "18:00");
        assert_eq!(drafts[1].end, "18:05");

        assert_eq!(drafts[2].start, "18:05");
        assert_eq!(drafts[2].end, "18:50");
        assert!(drafts[2].title.contains("more"));
    }

    #[test]
    fn test_sequential_events_without_break() {
        let drafts = extract_fallback("9:00-10:00 planning and then 10:00-11:00 review", date(), time());
        assert_eq!(drafts.len(), 2);
        assert_eq!(drafts[0].title, "planning");
        assert_eq!(drafts[1].title, "review");
    }

    #[test]
    fn test_action_verb_stripping() {
        assert_eq!(clean_title("create an event for coffee with Sam"), "coffee with Sam");
        assert_eq!(clean_title("schedule dentist"), "dentist");
        assert_eq!(clean_title("Please add standup"), "standup");
    }

    #[test]
    fn test_break_duration_in_hours() {
        let drafts = extract_fallback("1:00-2:00 deep work and break of 1 hour 3:00-4:00 more work", date(), time());
        assert_eq!(drafts.len(), 3);
        assert_eq!(drafts[1].start, "14:00");
        assert_eq!(drafts[1].end, "15:00");
    }
}
