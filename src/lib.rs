//! Calendar assistant core: natural-language requests in, calendar
//! operations out.
//!
//! The pipeline is a strategy cascade: completion-backed extraction with
//! model rotation, then simplified and strictly-structured prompts, then a
//! deterministic rule-based fallback that always succeeds. Drafts are
//! repaired by the temporal normalizer, screened by the duplicate detector,
//! and executed against a [`store::CalendarStore`] with bounded
//! retry-with-repair. Completion-service outages degrade extraction quality,
//! never availability.

pub mod completion;
pub mod config;
pub mod dedup;
pub mod diagnose;
pub mod error;
pub mod executor;
pub mod extract;
pub mod handler;
pub mod net;
pub mod store;
pub mod temporal;
pub mod types;

pub use completion::{CompletionService, HttpCompletionClient};
pub use config::AssistantConfig;
pub use error::{AssistantError, ErrorKind};
pub use handler::{handle_request, EventRequest, EventResponse};
pub use store::{CalendarStore, GoogleCalendarStore};
pub use types::{EventDraft, EventPayload, Intent};
