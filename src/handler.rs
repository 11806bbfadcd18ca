//! Request handler: intent routing and user-facing response assembly.
//!
//! One request in, one response out. A request moves through extraction,
//! repair, duplicate check, and store execution; every terminal state maps to
//! a plain-language message. Batches report partial success explicitly with
//! per-item detail.

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::completion::CompletionService;
use crate::config::AssistantConfig;
use crate::diagnose::{diagnose, Diagnosis};
use crate::error::ErrorKind;
use crate::executor::{create_batch, delete_event, update_event};
use crate::extract::extract;
use crate::store::CalendarStore;
use crate::temporal::calculate_time_range;
use crate::types::{BatchReport, EventDraft, EventPayload, Intent};

// ============================================================================
// Envelope
// ============================================================================

/// Inbound request from the routing layer.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventRequest {
    pub intent: Intent,
    pub payload: EventPayload,
    #[serde(default)]
    pub user_id: Option<String>,
    /// Reference "now" for resolving relative dates and times.
    pub current_date: NaiveDate,
    pub current_time: NaiveTime,
}

/// Outbound response. `message_to_user` is always populated; `diagnostics`
/// only when a request could not be fulfilled and the gap is explainable.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventResponse {
    pub message_to_user: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event_id: Option<String>,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diagnostics: Option<Diagnosis>,
}

// ============================================================================
// Messages
// ============================================================================

fn kind_message(kind: ErrorKind) -> &'static str {
    match kind {
        ErrorKind::ExtractionUnparseable => "the request could not be understood",
        ErrorKind::ValidationFailure => "some event details could not be worked out",
        ErrorKind::DuplicateDetected => "an equivalent event already exists",
        ErrorKind::MissingEventId => "no event was specified",
        ErrorKind::AuthorizationRequired => "the calendar connection has expired",
        ErrorKind::PermissionDenied => "calendar access was denied",
        ErrorKind::NotFound => "the event could not be found",
        ErrorKind::TimeConflict => "the time conflicts with an existing event",
        ErrorKind::ProviderUnavailable => "the calendar service is temporarily unavailable",
        ErrorKind::UnknownTechnical => "something went wrong on our end",
    }
}

/// Compose the user message for a creation batch.
fn batch_message(report: &BatchReport, drafts: &[EventDraft]) -> String {
    if report.total == 1 {
        let outcome = &report.outcomes[0];
        return if outcome.success {
            let when = drafts
                .first()
                .map(|d| format!(" on {} from {} to {}", d.date, d.start, d.end))
                .unwrap_or_default();
            if outcome.error_kind == Some(ErrorKind::DuplicateDetected) {
                format!("'{}' is already on your calendar{}.", outcome.title, when)
            } else {
                format!("Created '{}'{}.", outcome.title, when)
            }
        } else {
            let kind = outcome.error_kind.unwrap_or(ErrorKind::UnknownTechnical);
            format!(
                "I couldn't create '{}': {}.",
                outcome.title,
                kind_message(kind)
            )
        };
    }

    let mut message = format!(
        "Created {} of {} events.",
        report.succeeded, report.total
    );
    for outcome in &report.outcomes {
        if outcome.success {
            if outcome.error_kind == Some(ErrorKind::DuplicateDetected) {
                message.push_str(&format!(" '{}' already existed.", outcome.title));
            }
        } else {
            let kind = outcome.error_kind.unwrap_or(ErrorKind::UnknownTechnical);
            message.push_str(&format!(
                " '{}' failed: {}.",
                outcome.title,
                kind_message(kind)
            ));
        }
    }
    message
}

// ============================================================================
// Handler
// ============================================================================

/// Handle one request end to end. Never returns an error; every failure mode
/// becomes a response with `success: false` and an explanation.
pub async fn handle_request(
    completion: &dyn CompletionService,
    store: &dyn CalendarStore,
    config: &AssistantConfig,
    request: EventRequest,
) -> EventResponse {
    log::info!(
        "handle_request: intent {:?} (user {})",
        request.intent,
        request.user_id.as_deref().unwrap_or("anonymous")
    );

    match request.intent {
        Intent::CreateEvent => handle_create(completion, store, config, &request).await,
        Intent::GetEvent => handle_get(store, &request).await,
        Intent::UpdateEvent => handle_update(completion, store, config, &request).await,
        Intent::DeleteEvent => handle_delete(&request, store).await,
    }
}

/// Resolve the payload to drafts: raw text goes through the extraction
/// cascade, partial fields pass straight to repair.
async fn resolve_drafts(
    completion: &dyn CompletionService,
    config: &AssistantConfig,
    request: &EventRequest,
) -> (Vec<EventDraft>, String) {
    match &request.payload {
        EventPayload::RawMessage { text } => {
            let result = extract(
                completion,
                config,
                text,
                request.current_date,
                request.current_time,
            )
            .await;
            (result.drafts, text.clone())
        }
        EventPayload::PartialFields { draft } => (vec![draft.clone()], String::new()),
    }
}

async fn handle_create(
    completion: &dyn CompletionService,
    store: &dyn CalendarStore,
    config: &AssistantConfig,
    request: &EventRequest,
) -> EventResponse {
    let (drafts, raw_text) = resolve_drafts(completion, config, request).await;

    // Repair happens inside the batch; keep the pre-repair drafts only for
    // the message's date/time rendering, which repair preserves or fills.
    let report = create_batch(
        store,
        drafts.clone(),
        request.current_date,
        config.max_create_attempts,
    )
    .await;

    let success = report.failed == 0 && report.total > 0;
    let event_id = report
        .outcomes
        .iter()
        .find(|o| o.success)
        .and_then(|o| o.event_id.clone());
    let diagnostics = if report.succeeded == 0 {
        Some(diagnose(drafts.first(), &raw_text))
    } else {
        None
    };

    EventResponse {
        message_to_user: batch_message(&report, &drafts),
        event_id,
        success,
        diagnostics,
    }
}

async fn handle_get(store: &dyn CalendarStore, request: &EventRequest) -> EventResponse {
    // An explicit event id wins; otherwise the text names a date window.
    if let EventPayload::PartialFields { draft } = &request.payload {
        if let Some(id) = &draft.event_id {
            return match store.get(id).await {
                Ok(event) => EventResponse {
                    message_to_user: format!(
                        "'{}' is scheduled from {} to {}.",
                        event.title,
                        event.start.format("%Y-%m-%d %H:%M"),
                        event.end.format("%H:%M")
                    ),
                    event_id: Some(event.id),
                    success: true,
                    diagnostics: None,
                },
                Err(e) => {
                    let kind = e.classify().kind();
                    EventResponse {
                        message_to_user: format!("I couldn't look that up: {}.", kind_message(kind)),
                        event_id: Some(id.clone()),
                        success: false,
                        diagnostics: None,
                    }
                }
            };
        }
    }

    let text = match &request.payload {
        EventPayload::RawMessage { text } => text.as_str(),
        EventPayload::PartialFields { .. } => "",
    };
    let range = calculate_time_range(text, request.current_date);

    let window_start = range.window_start.and_hms_opt(0, 0, 0);
    let window_end = range
        .window_end
        .succ_opt()
        .and_then(|d| d.and_hms_opt(0, 0, 0));
    let (Some(window_start), Some(window_end)) = (window_start, window_end) else {
        return EventResponse {
            message_to_user: "I couldn't work out which days you meant.".to_string(),
            event_id: None,
            success: false,
            diagnostics: None,
        };
    };

    match store.list(window_start, window_end).await {
        Ok(events) if events.is_empty() => EventResponse {
            message_to_user: format!("You have nothing scheduled {}.", range.human_description),
            event_id: None,
            success: true,
            diagnostics: None,
        },
        Ok(events) => {
            let mut lines = vec![format!(
                "You have {} event(s) {}:",
                events.len(),
                range.human_description
            )];
            for event in &events {
                lines.push(format!(
                    "- {} ({} {}-{})",
                    event.title,
                    event.start.format("%Y-%m-%d"),
                    event.start.format("%H:%M"),
                    event.end.format("%H:%M")
                ));
            }
            EventResponse {
                message_to_user: lines.join("\n"),
                event_id: None,
                success: true,
                diagnostics: None,
            }
        }
        Err(e) => {
            let kind = e.classify().kind();
            EventResponse {
                message_to_user: format!(
                    "I couldn't read your calendar: {}.",
                    kind_message(kind)
                ),
                event_id: None,
                success: false,
                diagnostics: None,
            }
        }
    }
}

async fn handle_update(
    completion: &dyn CompletionService,
    store: &dyn CalendarStore,
    config: &AssistantConfig,
    request: &EventRequest,
) -> EventResponse {
    let (mut drafts, raw_text) = resolve_drafts(completion, config, request).await;
    let Some(draft) = drafts.first_mut() else {
        return EventResponse {
            message_to_user: "I couldn't work out which event to change.".to_string(),
            event_id: None,
            success: false,
            diagnostics: Some(diagnose(None, &raw_text)),
        };
    };

    let outcome = update_event(store, draft, request.current_date).await;
    if outcome.success {
        EventResponse {
            message_to_user: format!("Updated '{}'.", outcome.title),
            event_id: outcome.event_id,
            success: true,
            diagnostics: None,
        }
    } else {
        let kind = outcome.error_kind.unwrap_or(ErrorKind::UnknownTechnical);
        EventResponse {
            message_to_user: format!("I couldn't update the event: {}.", kind_message(kind)),
            event_id: outcome.event_id,
            success: false,
            diagnostics: None,
        }
    }
}

async fn handle_delete(request: &EventRequest, store: &dyn CalendarStore) -> EventResponse {
    let event_id = match &request.payload {
        EventPayload::PartialFields { draft } => draft.event_id.as_deref(),
        EventPayload::RawMessage { .. } => None,
    };

    let outcome = delete_event(store, event_id).await;
    if outcome.success {
        EventResponse {
            message_to_user: "The event has been deleted.".to_string(),
            event_id: outcome.event_id,
            success: true,
            diagnostics: None,
        }
    } else {
        let kind = outcome.error_kind.unwrap_or(ErrorKind::UnknownTechnical);
        EventResponse {
            message_to_user: format!("I couldn't delete the event: {}.", kind_message(kind)),
            event_id: outcome.event_id,
            success: false,
            diagnostics: None,
        }
    }
}
