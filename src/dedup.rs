//! Overlap-based duplicate detection.
//!
//! Before any insert, the store is queried for events whose window overlaps
//! the candidate's padded by ±1 hour; the padding catches near-duplicates
//! shifted by a small amount. A candidate duplicates an existing event iff
//! their normalized titles are equal and their time intervals overlap.
//!
//! Title-only matching deliberately ignores description and location, and
//! may over-match identically-titled back-to-back meetings; overlap is
//! strict, so truly adjacent events (one ends exactly when the next starts)
//! do not match.
//!
//! The check-then-insert sequence is not atomic under concurrent requests
//! for the same user; "at most one duplicate" is best-effort.

use chrono::{Duration, NaiveDateTime};

use crate::store::{CalendarStore, StoreError};
use crate::types::{DuplicateMatch, MatchKind};

/// Hours of padding either side of the candidate window when querying.
const WINDOW_PADDING_HOURS: i64 = 1;

/// Lowercase, strip the articles the/a/an as whole words, collapse
/// whitespace.
pub fn normalize_title(title: &str) -> String {
    title
        .to_lowercase()
        .split_whitespace()
        .filter(|w| !matches!(*w, "the" | "a" | "an"))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Half-open interval overlap.
fn intervals_overlap(
    existing_start: NaiveDateTime,
    existing_end: NaiveDateTime,
    candidate_start: NaiveDateTime,
    candidate_end: NaiveDateTime,
) -> bool {
    existing_start < candidate_end && candidate_start < existing_end
}

/// Look for an existing event equivalent to the candidate.
///
/// Returns the first match in store order. A `None` means the insert may
/// proceed.
pub async fn find_duplicate(
    store: &dyn CalendarStore,
    title: &str,
    candidate_start: NaiveDateTime,
    candidate_end: NaiveDateTime,
) -> Result<Option<DuplicateMatch>, StoreError> {
    let window_start = candidate_start - Duration::hours(WINDOW_PADDING_HOURS);
    let window_end = candidate_end + Duration::hours(WINDOW_PADDING_HOURS);

    let existing = store.list(window_start, window_end).await?;
    let normalized = normalize_title(title);

    for event in &existing {
        if normalize_title(&event.title) != normalized {
            continue;
        }
        if intervals_overlap(event.start, event.end, candidate_start, candidate_end) {
            let match_kind = if event.title.eq_ignore_ascii_case(title) {
                MatchKind::ExactTitle
            } else {
                MatchKind::SimilarTitle
            };
            log::info!(
                "dedup: candidate '{}' matches existing event {} ({:?})",
                title,
                event.id,
                match_kind
            );
            return Ok(Some(DuplicateMatch {
                existing_event_id: event.id.clone(),
                match_kind,
            }));
        }
    }

    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{EventResource, StoredEvent};
    use async_trait::async_trait;
    use chrono::NaiveDate;
    use std::sync::Mutex;

    fn dt(date: &str, time: &str) -> NaiveDateTime {
        NaiveDate::parse_from_str(date, "%Y-%m-%d")
            .unwrap()
            .and_time(chrono::NaiveTime::parse_from_str(time, "%H:%M").unwrap())
    }

    struct FixedStore {
        events: Vec<StoredEvent>,
        last_window: Mutex<Option<(NaiveDateTime, NaiveDateTime)>>,
    }

    impl FixedStore {
        fn with(events: Vec<StoredEvent>) -> Self {
            FixedStore {
                events,
                last_window: Mutex::new(None),
            }
        }
    }

    #[async_trait]
    impl CalendarStore for FixedStore {
        async fn list(
            &self,
            window_start: NaiveDateTime,
            window_end: NaiveDateTime,
        ) -> Result<Vec<StoredEvent>, StoreError> {
            *self.last_window.lock().unwrap() = Some((window_start, window_end));
            Ok(self
                .events
                .iter()
                .filter(|e| e.start < window_end && window_start < e.end)
                .cloned()
                .collect())
        }

        async fn insert(&self, _resource: &EventResource) -> Result<String, StoreError> {
            unreachable!("read-only fixture")
        }

        async fn update(&self, _id: &str, _resource: &EventResource) -> Result<(), StoreError> {
            unreachable!("read-only fixture")
        }

        async fn delete(&self, _id: &str) -> Result<(), StoreError> {
            unreachable!("read-only fixture")
        }

        async fn get(&self, _id: &str) -> Result<StoredEvent, StoreError> {
            unreachable!("read-only fixture")
        }
    }

    fn stored(id: &str, title: &str, start: &str, end: &str) -> StoredEvent {
        StoredEvent {
            id: id.to_string(),
            title: title.to_string(),
            start: dt("2025-11-16", start),
            end: dt("2025-11-16", end),
            description: None,
            location: None,
        }
    }

    #[test]
    fn test_normalize_title() {
        assert_eq!(normalize_title("The Team Meeting"), "team meeting");
        assert_eq!(normalize_title("a catch-up with  An  old friend"), "catch-up with old friend");
        assert_eq!(normalize_title("Lunch"), "lunch");
        // Articles are stripped as whole words only.
        assert_eq!(normalize_title("Analysis Theory"), "analysis theory");
    }

    #[tokio::test]
    async fn test_overlapping_same_title_is_duplicate() {
        let store = FixedStore::with(vec![stored("e1", "Lunch with John", "12:00", "13:00")]);
        let m = find_duplicate(&store, "Lunch with John", dt("2025-11-16", "12:15"), dt("2025-11-16", "13:15"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(m.existing_event_id, "e1");
        assert_eq!(m.match_kind, MatchKind::ExactTitle);
    }

    #[tokio::test]
    async fn test_article_variation_is_similar_match() {
        let store = FixedStore::with(vec![stored("e2", "The Standup", "09:00", "09:15")]);
        let m = find_duplicate(&store, "Standup", dt("2025-11-16", "09:00"), dt("2025-11-16", "09:15"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(m.match_kind, MatchKind::SimilarTitle);
    }

    #[tokio::test]
    async fn test_different_title_not_duplicate() {
        let store = FixedStore::with(vec![stored("e1", "Lunch with John", "12:00", "13:00")]);
        let m = find_duplicate(&store, "Lunch with Jane", dt("2025-11-16", "12:00"), dt("2025-11-16", "13:00"))
            .await
            .unwrap();
        assert!(m.is_none());
    }

    #[tokio::test]
    async fn test_adjacent_events_not_duplicate() {
        // Strict overlap: back-to-back events sharing a title don't match.
        let store = FixedStore::with(vec![stored("e1", "Sync", "10:00", "11:00")]);
        let m = find_duplicate(&store, "Sync", dt("2025-11-16", "11:00"), dt("2025-11-16", "12:00"))
            .await
            .unwrap();
        assert!(m.is_none());
    }

    #[tokio::test]
    async fn test_query_window_padded_one_hour() {
        let store = FixedStore::with(vec![]);
        find_duplicate(&store, "X", dt("2025-11-16", "12:00"), dt("2025-11-16", "13:00"))
            .await
            .unwrap();
        let (ws, we) = store.last_window.lock().unwrap().unwrap();
        assert_eq!(ws, dt("2025-11-16", "11:00"));
        assert_eq!(we, dt("2025-11-16", "14:00"));
    }
}
