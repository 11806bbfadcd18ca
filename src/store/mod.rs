//! Calendar store collaborator.
//!
//! The sole system of record. The pipeline reads windows of existing events
//! (duplicate detection, "what's on my calendar") and performs
//! insert/update/delete/get. Provider status codes are surfaced as
//! `StoreError` and classified into the assistant taxonomy at the executor
//! boundary — raw transport errors never reach callers.

pub mod google;

pub use google::GoogleCalendarStore;

use async_trait::async_trait;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::AssistantError;

// ============================================================================
// Wire types
// ============================================================================

/// Start/end payload for insert/update. Date-time plus an IANA time zone,
/// matching the Google Calendar v3 shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceDateTime {
    /// Local date-time without offset, `YYYY-MM-DDTHH:MM:SS`.
    pub date_time: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_zone: Option<String>,
}

/// Event payload sent to the store on insert/update.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventResource {
    pub summary: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    pub start: ResourceDateTime,
    pub end: ResourceDateTime,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub recurrence: Vec<String>,
}

/// A normalized event read back from the store.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredEvent {
    pub id: String,
    pub title: String,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("HTTP: {0}")]
    Http(#[from] reqwest::Error),
    #[error("token expired or revoked")]
    AuthExpired,
    #[error("store API error {status}: {message}")]
    Api { status: u16, message: String },
    #[error("JSON: {0}")]
    Json(#[from] serde_json::Error),
}

impl StoreError {
    /// Map a provider failure into the assistant taxonomy.
    pub fn classify(&self) -> AssistantError {
        match self {
            StoreError::AuthExpired => AssistantError::AuthorizationRequired,
            StoreError::Api { status, message } => match *status {
                401 => AssistantError::AuthorizationRequired,
                403 => AssistantError::PermissionDenied,
                404 => AssistantError::NotFound(message.clone()),
                409 => AssistantError::TimeConflict(message.clone()),
                429 => AssistantError::ProviderUnavailable(message.clone()),
                s if s >= 500 => AssistantError::ProviderUnavailable(message.clone()),
                _ => AssistantError::UnknownTechnical(format!("HTTP {}: {}", status, message)),
            },
            StoreError::Http(e) => {
                if e.is_timeout() || e.is_connect() {
                    AssistantError::ProviderUnavailable(e.to_string())
                } else {
                    AssistantError::UnknownTechnical(e.to_string())
                }
            }
            StoreError::Json(e) => AssistantError::UnknownTechnical(e.to_string()),
        }
    }
}

// ============================================================================
// Trait
// ============================================================================

/// Read/write access to the remote calendar.
///
/// The duplicate-check-then-insert sequence built on top of this trait is
/// not atomic: two concurrent requests for the same user can both miss the
/// duplicate check and insert. "At most one duplicate" is best-effort.
#[async_trait]
pub trait CalendarStore: Send + Sync {
    /// Events overlapping the half-open window `[window_start, window_end)`.
    async fn list(
        &self,
        window_start: NaiveDateTime,
        window_end: NaiveDateTime,
    ) -> Result<Vec<StoredEvent>, StoreError>;

    /// Insert a new event; returns its id.
    async fn insert(&self, resource: &EventResource) -> Result<String, StoreError>;

    async fn update(&self, id: &str, resource: &EventResource) -> Result<(), StoreError>;

    async fn delete(&self, id: &str) -> Result<(), StoreError>;

    async fn get(&self, id: &str) -> Result<StoredEvent, StoreError>;
}
