//! Error taxonomy for the assistant core.
//!
//! Errors are classified by how the pipeline treats them:
//! - Absorbed: extraction failures never surface (the deterministic fallback
//!   strategy always produces a result)
//! - Retryable: provider outages and generic technical failures
//! - Permanent: auth, permission, and not-found failures surface immediately
//!
//! Raw transport/serde errors are caught and classified at the executor
//! boundary; they never escape to callers.

use thiserror::Error;

/// Terminal error classification, one per taxonomy entry.
///
/// `DuplicateDetected` lives here for reporting symmetry but is not a
/// failure — duplicate creates resolve to the existing event's id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Completion output could not be parsed. Internal only — always
    /// recovered via the deterministic extraction strategy.
    ExtractionUnparseable,
    /// A required field is still missing/invalid after repair.
    ValidationFailure,
    /// An equivalent event already exists (idempotent success).
    DuplicateDetected,
    MissingEventId,
    AuthorizationRequired,
    PermissionDenied,
    NotFound,
    TimeConflict,
    ProviderUnavailable,
    UnknownTechnical,
}

#[derive(Debug, Error)]
pub enum AssistantError {
    #[error("completion output unparseable: {0}")]
    ExtractionUnparseable(String),

    #[error("validation failed for {field}: {reason}")]
    ValidationFailure { field: String, reason: String },

    #[error("event id required for {operation}")]
    MissingEventId { operation: &'static str },

    #[error("calendar authorization required")]
    AuthorizationRequired,

    #[error("calendar access forbidden")]
    PermissionDenied,

    #[error("event not found: {0}")]
    NotFound(String),

    #[error("time conflict reported by calendar store: {0}")]
    TimeConflict(String),

    #[error("calendar store unavailable: {0}")]
    ProviderUnavailable(String),

    #[error("technical error: {0}")]
    UnknownTechnical(String),
}

impl AssistantError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AssistantError::ExtractionUnparseable(_) => ErrorKind::ExtractionUnparseable,
            AssistantError::ValidationFailure { .. } => ErrorKind::ValidationFailure,
            AssistantError::MissingEventId { .. } => ErrorKind::MissingEventId,
            AssistantError::AuthorizationRequired => ErrorKind::AuthorizationRequired,
            AssistantError::PermissionDenied => ErrorKind::PermissionDenied,
            AssistantError::NotFound(_) => ErrorKind::NotFound,
            AssistantError::TimeConflict(_) => ErrorKind::TimeConflict,
            AssistantError::ProviderUnavailable(_) => ErrorKind::ProviderUnavailable,
            AssistantError::UnknownTechnical(_) => ErrorKind::UnknownTechnical,
        }
    }

    /// Whether the creation retry loop may try again after this error.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            AssistantError::ProviderUnavailable(_)
                | AssistantError::TimeConflict(_)
                | AssistantError::UnknownTechnical(_)
        )
    }

    /// Short user-facing explanation for terminal outcomes.
    pub fn user_message(&self) -> String {
        match self {
            AssistantError::ExtractionUnparseable(_) => {
                "I couldn't understand that request.".to_string()
            }
            AssistantError::ValidationFailure { field, .. } => {
                format!("I couldn't work out the event's {}.", field)
            }
            AssistantError::MissingEventId { operation } => {
                format!("I need to know which event to {}.", operation)
            }
            AssistantError::AuthorizationRequired => {
                "Your calendar connection has expired. Please reconnect.".to_string()
            }
            AssistantError::PermissionDenied => {
                "I don't have permission to change that calendar.".to_string()
            }
            AssistantError::NotFound(_) => "I couldn't find that event.".to_string(),
            AssistantError::TimeConflict(_) => {
                "That time conflicts with something already scheduled.".to_string()
            }
            AssistantError::ProviderUnavailable(_) => {
                "The calendar service is temporarily unavailable. Please try again.".to_string()
            }
            AssistantError::UnknownTechnical(_) => {
                "Something went wrong on my end. Please try again.".to_string()
            }
        }
    }
}

impl ErrorKind {
    pub fn is_retryable(self) -> bool {
        matches!(
            self,
            ErrorKind::ProviderUnavailable | ErrorKind::TimeConflict | ErrorKind::UnknownTechnical
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retry_classification() {
        assert!(AssistantError::ProviderUnavailable("503".into()).is_retryable());
        assert!(AssistantError::UnknownTechnical("timeout".into()).is_retryable());
        assert!(!AssistantError::AuthorizationRequired.is_retryable());
        assert!(!AssistantError::PermissionDenied.is_retryable());
        assert!(!AssistantError::NotFound("e1".into()).is_retryable());
    }

    #[test]
    fn test_kind_mapping() {
        let err = AssistantError::MissingEventId {
            operation: "delete",
        };
        assert_eq!(err.kind(), ErrorKind::MissingEventId);
        assert!(!err.kind().is_retryable());
    }

    #[test]
    fn test_user_messages_nonempty() {
        let errs = [
            AssistantError::ExtractionUnparseable("x".into()),
            AssistantError::ValidationFailure {
                field: "date".into(),
                reason: "bad".into(),
            },
            AssistantError::AuthorizationRequired,
            AssistantError::NotFound("e".into()),
            AssistantError::ProviderUnavailable("503".into()),
        ];
        for e in errs {
            assert!(!e.user_message().is_empty());
        }
    }
}
