//! Diagnostic reporter for unrecoverable extractions.
//!
//! When the whole cascade (repair included) cannot produce a usable draft,
//! the user gets a structured explanation of what was missing and how to
//! rephrase, instead of a generic failure. Diagnosis itself never fails.

use serde::{Deserialize, Serialize};

use crate::temporal::{is_valid_date, is_valid_time};
use crate::types::EventDraft;

/// Structured account of why an extraction could not be completed.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Diagnosis {
    pub missing_fields: Vec<String>,
    pub issue_description: String,
    pub specific_missing_details: Vec<String>,
    pub how_to_fix: String,
}

fn field_detail(field: &str) -> &'static str {
    match field {
        "title" => "what the event is about",
        "date" => "which day it should happen (a date, or a word like tomorrow)",
        "start" => "what time it starts",
        "end" => "what time it ends, or how long it lasts",
        _ => "that detail",
    }
}

/// Inspect the best draft the cascade produced (if any) against the raw
/// text and describe the gap.
pub fn diagnose(best_draft: Option<&EventDraft>, raw_text: &str) -> Diagnosis {
    let mut missing = Vec::new();

    match best_draft {
        Some(draft) => {
            if draft.title.trim().is_empty() {
                missing.push("title".to_string());
            }
            if !is_valid_date(&draft.date) {
                missing.push("date".to_string());
            }
            if !is_valid_time(&draft.start) {
                missing.push("start".to_string());
            }
            if !is_valid_time(&draft.end) {
                missing.push("end".to_string());
            }
        }
        None => {
            for field in ["title", "date", "start", "end"] {
                missing.push(field.to_string());
            }
        }
    }

    let issue_description = if raw_text.trim().is_empty() {
        "The message was empty, so there was nothing to build an event from.".to_string()
    } else if missing.is_empty() {
        // Reachable when the caller diagnoses a failure unrelated to the
        // draft's fields, e.g. a provider rejection after repair.
        "The event details looked complete, but the calendar provider rejected the request."
            .to_string()
    } else if missing.len() == 4 {
        "No event details could be recognized in the message.".to_string()
    } else {
        format!(
            "The message describes an event, but {} {} missing or unreadable.",
            match missing.len() {
                1 => format!("the {}", missing[0]),
                _ => format!("some details ({})", missing.join(", ")),
            },
            if missing.len() == 1 { "is" } else { "are" },
        )
    };

    let specific_missing_details = missing
        .iter()
        .map(|f| field_detail(f).to_string())
        .collect();

    let how_to_fix = if missing.is_empty() {
        "Try again in a moment, or adjust the event time and resend.".to_string()
    } else {
        format!(
            "Rephrase with the missing details, e.g. \"Lunch with Sam tomorrow 12:00-13:00\". \
             Still needed: {}.",
            missing.join(", ")
        )
    };

    Diagnosis {
        missing_fields: missing,
        issue_description,
        specific_missing_details,
        how_to_fix,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_draft_reports_everything_missing() {
        let d = diagnose(None, "asdf qwerty");
        assert_eq!(d.missing_fields, vec!["title", "date", "start", "end"]);
        assert!(d.issue_description.contains("No event details"));
        assert!(d.how_to_fix.contains("Rephrase"));
    }

    #[test]
    fn test_empty_message() {
        let d = diagnose(None, "   ");
        assert!(d.issue_description.contains("empty"));
    }

    #[test]
    fn test_partial_draft_names_the_gap() {
        let draft = EventDraft {
            title: "Lunch".to_string(),
            date: "2025-11-17".to_string(),
            start: "12:00".to_string(),
            end: String::new(),
            ..Default::default()
        };
        let d = diagnose(Some(&draft), "lunch tomorrow at noon");
        assert_eq!(d.missing_fields, vec!["end"]);
        assert!(d.issue_description.contains("end"));
        assert_eq!(d.specific_missing_details.len(), 1);
        assert!(d.specific_missing_details[0].contains("ends"));
    }

    #[test]
    fn test_complete_draft_blames_provider() {
        let draft = EventDraft {
            title: "Lunch".to_string(),
            date: "2025-11-17".to_string(),
            start: "12:00".to_string(),
            end: "13:00".to_string(),
            ..Default::default()
        };
        let d = diagnose(Some(&draft), "lunch tomorrow at noon");
        assert!(d.missing_fields.is_empty());
        assert!(d.issue_description.contains("provider"));
    }

    #[test]
    fn test_serializes_camel_case() {
        let d = diagnose(None, "");
        let json = serde_json::to_string(&d).unwrap();
        assert!(json.contains("missingFields"));
        assert!(json.contains("specificMissingDetails"));
        assert!(json.contains("howToFix"));
    }
}
