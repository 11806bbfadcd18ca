//! Creation/mutation executor.
//!
//! Validates and repairs a draft, consults the duplicate detector, then
//! performs the store operation with bounded retries. Each retry applies a
//! deterministic fix selected by the attempt index and the failure class, so
//! every attempt's transformation is inspectable. Batches run strictly in
//! input order — synthesized break drafts depend on a predecessor's end time
//! — and never abort on an individual failure.

use chrono::NaiveDate;

use crate::dedup::find_duplicate;
use crate::error::{AssistantError, ErrorKind};
use crate::store::{CalendarStore, EventResource, ResourceDateTime};
use crate::temporal::{
    add_minutes_wrapping, clean_date_string, clean_time_string, is_valid_date, is_valid_time,
    next_weekday, parse_start_end_datetime, DEFAULT_DURATION_MINUTES,
};
use crate::types::{BatchReport, CreationOutcome, EventCategory, EventDraft};

/// Default bound for the creation loop, matching the config default.
pub const MAX_CREATE_ATTEMPTS: u32 = 3;

/// Titles longer than this get truncated by the title fix strategy.
const MAX_TITLE_CHARS: usize = 120;

const DEFAULT_START: &str = "09:00";

// ============================================================================
// Validation / repair
// ============================================================================

/// Infer a category from title keywords.
pub fn infer_category(title: &str) -> EventCategory {
    let lowered = title.to_lowercase();
    let has = |words: &[&str]| words.iter().any(|w| lowered.contains(w));

    if has(&["meeting", "call"]) {
        EventCategory::Meeting
    } else if has(&["workshop", "training", "course"]) {
        EventCategory::Education
    } else if has(&["doctor", "appointment", "medical"]) {
        EventCategory::Health
    } else if has(&["lunch", "dinner", "coffee"]) {
        EventCategory::Personal
    } else {
        EventCategory::General
    }
}

/// Guarantee a usable draft: non-empty title, valid date (next weekday when
/// unsalvageable), valid start (09:00 default), end strictly after start,
/// and an inferred category. Returns the fields that were altered.
pub fn validate_and_fix_event_details(
    draft: &mut EventDraft,
    index: usize,
    current_date: NaiveDate,
) -> Vec<String> {
    let mut adjusted = Vec::new();

    if draft.title.trim().is_empty() {
        draft.title = format!("Event {}", index);
        adjusted.push("title".to_string());
    }

    if !is_valid_date(&draft.date) {
        let (cleaned, fell_back) = clean_date_string(&draft.date, current_date);
        draft.date = if draft.date.trim().is_empty() || fell_back {
            // Nothing salvageable: schedule on the next working day.
            next_weekday(current_date).format("%Y-%m-%d").to_string()
        } else {
            cleaned
        };
        adjusted.push("date".to_string());
    }

    if !is_valid_time(&draft.start) {
        let cleaned = clean_time_string(&draft.start);
        draft.start = if draft.start.trim().is_empty() {
            DEFAULT_START.to_string()
        } else {
            cleaned
        };
        adjusted.push("start".to_string());
    }

    let end_invalid = !is_valid_time(&draft.end);
    let end_cleaned = if end_invalid && !draft.end.trim().is_empty() {
        clean_time_string(&draft.end)
    } else {
        draft.end.clone()
    };
    if !is_valid_time(&end_cleaned) || end_cleaned <= draft.start {
        draft.end = add_minutes_wrapping(&draft.start, DEFAULT_DURATION_MINUTES);
        adjusted.push("end".to_string());
    } else if end_cleaned != draft.end {
        draft.end = end_cleaned;
        adjusted.push("end".to_string());
    }

    if draft.category.is_none() {
        draft.category = Some(infer_category(&draft.title));
    }

    adjusted
}

// ============================================================================
// Fix strategies
// ============================================================================

/// What a store failure message seems to complain about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FailureClass {
    Temporal,
    Title,
    Location,
    Other,
}

fn classify_failure(message: &str) -> FailureClass {
    let lowered = message.to_lowercase();
    if ["time", "date", "start", "end"].iter().any(|w| lowered.contains(w)) {
        FailureClass::Temporal
    } else if ["summary", "title"].iter().any(|w| lowered.contains(w)) {
        FailureClass::Title
    } else if lowered.contains("location") {
        FailureClass::Location
    } else {
        FailureClass::Other
    }
}

/// Deterministic draft transformation applied before a retry attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FixStrategy {
    /// Shift to a neutral mid-morning window on the same date.
    NeutralWindow,
    /// Move to the next weekday, keeping times.
    NextWeekday,
    TruncateTitle,
    DropLocation,
}

impl FixStrategy {
    /// Select a fix from the failure class, falling back to the
    /// attempt-indexed escalation (attempt 2: neutral window; attempt 3:
    /// next weekday).
    fn select(attempt: u32, class: FailureClass) -> FixStrategy {
        match class {
            FailureClass::Title => FixStrategy::TruncateTitle,
            FailureClass::Location => FixStrategy::DropLocation,
            FailureClass::Temporal | FailureClass::Other => {
                if attempt <= 1 {
                    FixStrategy::NeutralWindow
                } else {
                    FixStrategy::NextWeekday
                }
            }
        }
    }

    fn apply(self, draft: &mut EventDraft, current_date: NaiveDate) -> &'static str {
        match self {
            FixStrategy::NeutralWindow => {
                draft.start = "10:00".to_string();
                draft.end = "11:00".to_string();
                "time"
            }
            FixStrategy::NextWeekday => {
                let from = NaiveDate::parse_from_str(&draft.date, "%Y-%m-%d")
                    .unwrap_or(current_date);
                draft.date = next_weekday(from).format("%Y-%m-%d").to_string();
                "date"
            }
            FixStrategy::TruncateTitle => {
                if draft.title.chars().count() > MAX_TITLE_CHARS {
                    draft.title = draft.title.chars().take(MAX_TITLE_CHARS).collect();
                }
                "title"
            }
            FixStrategy::DropLocation => {
                draft.location = None;
                "location"
            }
        }
    }
}

// ============================================================================
// Resource construction
// ============================================================================

/// Build the store payload from a validated draft.
fn build_resource(draft: &EventDraft) -> Option<EventResource> {
    let (start, end) =
        parse_start_end_datetime(&draft.date, &draft.start, Some(&draft.end), None)?;
    Some(EventResource {
        summary: draft.title.clone(),
        description: draft.description.clone(),
        location: draft.location.clone(),
        start: ResourceDateTime {
            date_time: start.format("%Y-%m-%dT%H:%M:%S").to_string(),
            time_zone: None,
        },
        end: ResourceDateTime {
            date_time: end.format("%Y-%m-%dT%H:%M:%S").to_string(),
            time_zone: None,
        },
        recurrence: draft
            .recurrence_rule
            .clone()
            .map(|r| vec![r])
            .unwrap_or_default(),
    })
}

fn failure_outcome(
    draft: &EventDraft,
    kind: ErrorKind,
    attempts: u32,
    adjusted: Vec<String>,
) -> CreationOutcome {
    CreationOutcome {
        success: false,
        event_id: None,
        error_kind: Some(kind),
        attempts_used: attempts,
        title: draft.title.clone(),
        fields_adjusted: adjusted,
    }
}

// ============================================================================
// Creation
// ============================================================================

/// Create one event with duplicate detection and bounded retry-with-repair.
///
/// The draft must already have passed `validate_and_fix_event_details`.
/// A detected duplicate is an idempotent success carrying the existing id.
pub async fn ensure_creation(
    store: &dyn CalendarStore,
    draft: &mut EventDraft,
    current_date: NaiveDate,
    mut adjusted: Vec<String>,
    max_attempts: u32,
) -> CreationOutcome {
    let max_attempts = max_attempts.max(1);
    let Some(resource) = build_resource(draft) else {
        return failure_outcome(draft, ErrorKind::ValidationFailure, 0, adjusted);
    };

    // Duplicate check. A failed check is logged and treated as "no
    // duplicate" — creation availability beats duplicate precision.
    let (start, end) = match parse_start_end_datetime(&draft.date, &draft.start, Some(&draft.end), None)
    {
        Some(pair) => pair,
        None => return failure_outcome(draft, ErrorKind::ValidationFailure, 0, adjusted),
    };
    match find_duplicate(store, &draft.title, start, end).await {
        Ok(Some(dup)) => {
            log::info!(
                "ensure_creation: '{}' already exists as {}, skipping insert",
                draft.title,
                dup.existing_event_id
            );
            return CreationOutcome {
                success: true,
                event_id: Some(dup.existing_event_id),
                error_kind: Some(ErrorKind::DuplicateDetected),
                attempts_used: 0,
                title: draft.title.clone(),
                fields_adjusted: adjusted,
            };
        }
        Ok(None) => {}
        Err(e) => {
            log::warn!("ensure_creation: duplicate check failed, proceeding: {}", e);
        }
    }

    let mut resource = resource;
    let mut last_error: Option<AssistantError> = None;

    for attempt in 1..=max_attempts {
        match store.insert(&resource).await {
            Ok(id) => {
                log::info!(
                    "ensure_creation: created '{}' as {} (attempt {})",
                    draft.title,
                    id,
                    attempt
                );
                return CreationOutcome {
                    success: true,
                    event_id: Some(id),
                    error_kind: None,
                    attempts_used: attempt,
                    title: draft.title.clone(),
                    fields_adjusted: adjusted,
                };
            }
            Err(store_err) => {
                let classified = store_err.classify();
                log::warn!(
                    "ensure_creation: attempt {}/{} failed for '{}': {}",
                    attempt,
                    max_attempts,
                    draft.title,
                    classified
                );

                if !classified.is_retryable() {
                    return failure_outcome(draft, classified.kind(), attempt, adjusted);
                }

                if attempt < max_attempts {
                    let class = classify_failure(&classified.to_string());
                    let fix = FixStrategy::select(attempt, class);
                    let field = fix.apply(draft, current_date);
                    if !adjusted.iter().any(|f| f == field) {
                        adjusted.push(field.to_string());
                    }
                    match build_resource(draft) {
                        Some(r) => resource = r,
                        None => {
                            return failure_outcome(
                                draft,
                                ErrorKind::ValidationFailure,
                                attempt,
                                adjusted,
                            )
                        }
                    }
                }
                last_error = Some(classified);
            }
        }
    }

    let kind = last_error
        .map(|e| e.kind())
        .unwrap_or(ErrorKind::UnknownTechnical);
    failure_outcome(draft, kind, max_attempts, adjusted)
}

/// Create a batch of drafts in strict input order, accumulating one outcome
/// per draft. Individual failures never abort the batch.
pub async fn create_batch(
    store: &dyn CalendarStore,
    drafts: Vec<EventDraft>,
    current_date: NaiveDate,
    max_attempts: u32,
) -> BatchReport {
    let mut outcomes = Vec::with_capacity(drafts.len());

    for (i, mut draft) in drafts.into_iter().enumerate() {
        let adjusted = validate_and_fix_event_details(&mut draft, i + 1, current_date);
        let outcome =
            ensure_creation(store, &mut draft, current_date, adjusted, max_attempts).await;
        outcomes.push(outcome);
    }

    let report = BatchReport::from_outcomes(outcomes);
    log::info!(
        "create_batch: {}/{} created ({:.0}% population)",
        report.succeeded,
        report.total,
        report.population_rate * 100.0
    );
    report
}

// ============================================================================
// Update / delete
// ============================================================================

/// Update an existing event. Requires an explicit event id; its absence is a
/// validation failure, never attempted against the store.
pub async fn update_event(
    store: &dyn CalendarStore,
    draft: &mut EventDraft,
    current_date: NaiveDate,
) -> CreationOutcome {
    let Some(event_id) = draft.event_id.clone() else {
        return failure_outcome(draft, ErrorKind::MissingEventId, 0, vec![]);
    };

    let adjusted = validate_and_fix_event_details(draft, 1, current_date);
    let Some(resource) = build_resource(draft) else {
        return failure_outcome(draft, ErrorKind::ValidationFailure, 0, adjusted);
    };

    match store.update(&event_id, &resource).await {
        Ok(()) => CreationOutcome {
            success: true,
            event_id: Some(event_id),
            error_kind: None,
            attempts_used: 1,
            title: draft.title.clone(),
            fields_adjusted: adjusted,
        },
        Err(e) => failure_outcome(draft, e.classify().kind(), 1, adjusted),
    }
}

/// Delete an event by id. Requires an explicit event id.
pub async fn delete_event(store: &dyn CalendarStore, event_id: Option<&str>) -> CreationOutcome {
    let Some(id) = event_id else {
        return CreationOutcome {
            success: false,
            event_id: None,
            error_kind: Some(ErrorKind::MissingEventId),
            attempts_used: 0,
            title: String::new(),
            fields_adjusted: vec![],
        };
    };

    match store.delete(id).await {
        Ok(()) => CreationOutcome {
            success: true,
            event_id: Some(id.to_string()),
            error_kind: None,
            attempts_used: 1,
            title: String::new(),
            fields_adjusted: vec![],
        },
        Err(e) => CreationOutcome {
            success: false,
            event_id: Some(id.to_string()),
            error_kind: Some(e.classify().kind()),
            attempts_used: 1,
            title: String::new(),
            fields_adjusted: vec![],
        },
    }
}
