//! Parse cascade for completion-service output.
//!
//! Completion output is free text, not guaranteed JSON. Each strategy's raw
//! output runs through this cascade before validity checking:
//! (a) direct parse, (b) fenced code block, (c) first balanced top-level
//! `{...}`/`[...]` span, (d) conservative repairs then re-parse. First
//! success at any sub-step wins.

use serde_json::Value;

use crate::types::EventDraft;

/// Parse one or more drafts out of raw completion text. `None` means the
/// cascade is exhausted and the next strategy should run.
pub fn parse_drafts(response: &str) -> Option<Vec<EventDraft>> {
    let trimmed = response.trim();
    if trimmed.is_empty() {
        return None;
    }

    // (a) direct parse
    if let Some(drafts) = parse_candidate(trimmed) {
        return Some(drafts);
    }

    // (b) fenced code block
    if let Some(block) = extract_fenced_block(response) {
        if let Some(drafts) = parse_candidate(block) {
            return Some(drafts);
        }
    }

    // (c) first balanced top-level span
    if let Some(span) = extract_balanced_span(response) {
        if let Some(drafts) = parse_candidate(span) {
            return Some(drafts);
        }
        // (d) conservative repairs on the extracted span
        if let Some(drafts) = parse_candidate(&repair_json(span)) {
            return Some(drafts);
        }
    }

    // (d) repairs on the whole response, as a last resort
    let repaired = repair_json(trimmed);
    if let Some(span) = extract_balanced_span(&repaired) {
        if let Some(drafts) = parse_candidate(span) {
            return Some(drafts);
        }
    }

    None
}

/// Parse a JSON candidate into drafts. Accepts a single object, an array of
/// objects, or an object wrapping an `events` array (all shapes completion
/// services actually produce).
fn parse_candidate(candidate: &str) -> Option<Vec<EventDraft>> {
    let value: Value = serde_json::from_str(candidate.trim()).ok()?;
    value_to_drafts(value)
}

fn value_to_drafts(value: Value) -> Option<Vec<EventDraft>> {
    match value {
        Value::Array(items) => {
            let drafts: Vec<EventDraft> = items
                .into_iter()
                .filter_map(|v| serde_json::from_value(v).ok())
                .collect();
            (!drafts.is_empty()).then_some(drafts)
        }
        Value::Object(ref map) => {
            if let Some(Value::Array(items)) = map.get("events") {
                let drafts: Vec<EventDraft> = items
                    .iter()
                    .filter_map(|v| serde_json::from_value(v.clone()).ok())
                    .collect();
                return (!drafts.is_empty()).then_some(drafts);
            }
            serde_json::from_value::<EventDraft>(value).ok().map(|d| vec![d])
        }
        _ => None,
    }
}

/// Contents of the first fenced code block (```json or bare ```).
fn extract_fenced_block(response: &str) -> Option<&str> {
    if let Some(start) = response.find("```json") {
        let json_start = start + 7;
        if let Some(end) = response[json_start..].find("```") {
            return Some(response[json_start..json_start + end].trim());
        }
    }
    if let Some(start) = response.find("```") {
        let after_fence = start + 3;
        let nl = response[after_fence..].find('\n')?;
        let json_start = after_fence + nl + 1;
        if let Some(end) = response[json_start..].find("```") {
            return Some(response[json_start..json_start + end].trim());
        }
    }
    None
}

/// First balanced `{...}` or `[...]` span, string-aware.
fn extract_balanced_span(response: &str) -> Option<&str> {
    let open_idx = response.find(['{', '['])?;
    let bytes = response.as_bytes();
    let (open, close) = if bytes[open_idx] == b'{' {
        ('{', '}')
    } else {
        ('[', ']')
    };

    let candidate = &response[open_idx..];
    let mut depth = 0i32;
    let mut in_string = false;
    let mut escape = false;
    for (i, ch) in candidate.char_indices() {
        if escape {
            escape = false;
            continue;
        }
        if ch == '\\' && in_string {
            escape = true;
            continue;
        }
        if ch == '"' {
            in_string = !in_string;
            continue;
        }
        if in_string {
            continue;
        }
        if ch == open {
            depth += 1;
        } else if ch == close {
            depth -= 1;
            if depth == 0 {
                return Some(&candidate[..=i]);
            }
        }
    }
    None
}

/// Conservative JSON repairs: smart quotes, trailing commas, bare keys.
/// Deliberately narrow — anything more aggressive corrupts valid content.
fn repair_json(text: &str) -> String {
    let mut repaired = text
        .replace(['\u{2018}', '\u{2019}'], "'")
        .replace(['\u{201C}', '\u{201D}'], "\"");

    // Trailing commas before a closing brace/bracket.
    let trailing_comma = regex::Regex::new(r",\s*([}\]])").unwrap();
    repaired = trailing_comma.replace_all(&repaired, "$1").to_string();

    // Bare object keys: `{title: ...}` → `{"title": ...}`.
    let bare_key = regex::Regex::new(r#"([{,]\s*)([A-Za-z_][A-Za-z0-9_]*)\s*:"#).unwrap();
    repaired = bare_key.replace_all(&repaired, "$1\"$2\":").to_string();

    repaired
}
