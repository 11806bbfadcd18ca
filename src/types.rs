//! Core data model for the extraction → creation pipeline.
//!
//! An `EventDraft` is an in-flight, unpersisted candidate event. Drafts are
//! produced by the extraction cascade, repaired by the temporal normalizer
//! and the executor, read by the duplicate detector, and discarded once a
//! `CreationOutcome` exists. Nothing here owns durable state; the calendar
//! store is the sole system of record.

use serde::{Deserialize, Serialize};

// ============================================================================
// Request envelope
// ============================================================================

/// The operation the caller wants performed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    CreateEvent,
    GetEvent,
    UpdateEvent,
    DeleteEvent,
}

/// What the caller hands us alongside the intent.
///
/// Upstream routing layers sometimes deliver raw text and sometimes a
/// partially-structured field set. Modeled as an explicit tagged variant so
/// nothing downstream has to probe by key presence.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EventPayload {
    RawMessage { text: String },
    PartialFields { draft: EventDraft },
}

// ============================================================================
// EventDraft
// ============================================================================

/// Inferred event category, from title keywords.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventCategory {
    Meeting,
    Education,
    Health,
    Personal,
    General,
}

/// An in-flight candidate calendar event.
///
/// Deserialization is deliberately permissive (every field defaults) because
/// drafts are parsed out of unreliable completion-service output. Validity is
/// enforced later by the normalizer and the executor, not by serde.
///
/// Invariant after repair: `date` is a valid `YYYY-MM-DD` date and, when both
/// times are set, `end` is strictly after `start`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventDraft {
    #[serde(default, alias = "summary")]
    pub title: String,
    /// Calendar date, `YYYY-MM-DD`.
    #[serde(default)]
    pub date: String,
    /// Time of day, `HH:MM` 24-hour.
    #[serde(default, alias = "startTime")]
    pub start: String,
    /// Time of day, `HH:MM` 24-hour.
    #[serde(default, alias = "endTime")]
    pub end: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recurrence_rule: Option<String>,
    /// Set only for update/delete requests.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<EventCategory>,
}

impl EventDraft {
    /// All four required fields present (non-empty). Format validity is the
    /// temporal normalizer's job.
    pub fn is_complete(&self) -> bool {
        !self.title.trim().is_empty()
            && !self.date.trim().is_empty()
            && !self.start.trim().is_empty()
            && !self.end.trim().is_empty()
    }
}

// ============================================================================
// Extraction results
// ============================================================================

/// Which extraction strategy produced a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    Primary,
    Simplified,
    Structured,
    Deterministic,
}

/// Output of the extraction cascade: one or more drafts, in utterance order,
/// tagged with the strategy that produced them.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractionResult {
    /// Never empty. A single-event extraction is a one-element list.
    pub drafts: Vec<EventDraft>,
    pub strategy: StrategyKind,
    /// True when the deterministic fallback produced the result.
    pub used_fallback: bool,
}

impl ExtractionResult {
    pub fn is_multi_event(&self) -> bool {
        self.drafts.len() > 1
    }
}

// ============================================================================
// Windows and duplicate matches
// ============================================================================

/// A named date window resolved against a reference date.
///
/// Day-aligned and inclusive of both boundary days ("today" is a one-day
/// window with `window_start == window_end`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeRangeQuery {
    pub name: String,
    pub window_start: chrono::NaiveDate,
    pub window_end: chrono::NaiveDate,
    pub human_description: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchKind {
    ExactTitle,
    SimilarTitle,
}

/// An existing stored event judged equivalent to a candidate draft.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DuplicateMatch {
    pub existing_event_id: String,
    pub match_kind: MatchKind,
}

// ============================================================================
// Outcomes
// ============================================================================

/// Per-draft result of a create/update/delete attempt.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreationOutcome {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<crate::error::ErrorKind>,
    pub attempts_used: u32,
    /// Title after repair, for itemized batch reporting.
    pub title: String,
    /// Fields the validator or a fix strategy altered before success/failure.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fields_adjusted: Vec<String>,
}

/// Aggregate result for a multi-draft batch. Partial success is always
/// explicit: counts plus one itemized outcome per draft, in input order.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchReport {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub outcomes: Vec<CreationOutcome>,
    /// `succeeded / total`; 0.0 for an empty batch.
    pub population_rate: f64,
}

impl BatchReport {
    pub fn from_outcomes(outcomes: Vec<CreationOutcome>) -> Self {
        let total = outcomes.len();
        let succeeded = outcomes.iter().filter(|o| o.success).count();
        let failed = total - succeeded;
        let population_rate = if total == 0 {
            0.0
        } else {
            succeeded as f64 / total as f64
        };
        BatchReport {
            total,
            succeeded,
            failed,
            outcomes,
            population_rate,
        }
    }
}
