//! Google Calendar API v3 implementation of the calendar store.

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use serde::Deserialize;

use super::{CalendarStore, EventResource, StoreError, StoredEvent};
use crate::net::{send_with_retry, RetryPolicy};

const CALENDAR_BASE: &str = "https://www.googleapis.com/calendar/v3/calendars/primary/events";

// ============================================================================
// API response types (deserialized from Google Calendar JSON)
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EventListResponse {
    #[serde(default)]
    items: Vec<GoogleEventRaw>,
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GoogleEventRaw {
    #[serde(default)]
    id: String,
    #[serde(default)]
    summary: Option<String>,
    start: Option<EventDateTimeRaw>,
    end: Option<EventDateTimeRaw>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    location: Option<String>,
    #[serde(default)]
    status: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EventDateTimeRaw {
    date_time: Option<String>,
    date: Option<String>,
}

impl EventDateTimeRaw {
    /// Parse either a full dateTime or an all-day date into a naive local
    /// datetime. All-day dates read as midnight.
    fn to_naive(&self) -> Option<NaiveDateTime> {
        if let Some(ref dt) = self.date_time {
            // Strip any trailing offset; the store returns local times when a
            // timeZone was supplied on insert.
            let trimmed = dt.split(['+', 'Z']).next().unwrap_or(dt);
            if let Ok(parsed) = NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%dT%H:%M:%S") {
                return Some(parsed);
            }
            if let Ok(parsed) = chrono::DateTime::parse_from_rfc3339(dt) {
                return Some(parsed.naive_local());
            }
        }
        if let Some(ref d) = self.date {
            return NaiveDate::parse_from_str(d, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0));
        }
        None
    }
}

fn to_stored(item: GoogleEventRaw) -> Option<StoredEvent> {
    let start = item.start.as_ref().and_then(|s| s.to_naive())?;
    let end = item.end.as_ref().and_then(|e| e.to_naive())?;
    Some(StoredEvent {
        id: item.id,
        title: item.summary.unwrap_or_else(|| "(No title)".to_string()),
        start,
        end,
        description: item.description,
        location: item.location,
    })
}

// ============================================================================
// Store implementation
// ============================================================================

/// Calendar store backed by the user's primary Google calendar.
///
/// Takes a ready access token; token acquisition and refresh belong to the
/// identity layer upstream.
pub struct GoogleCalendarStore {
    client: reqwest::Client,
    access_token: String,
    time_zone: String,
    retry: RetryPolicy,
}

impl GoogleCalendarStore {
    pub fn new(access_token: impl Into<String>, time_zone: impl Into<String>) -> Self {
        GoogleCalendarStore {
            client: reqwest::Client::new(),
            access_token: access_token.into(),
            time_zone: time_zone.into(),
            retry: RetryPolicy::default(),
        }
    }

    async fn check(resp: reqwest::Response) -> Result<reqwest::Response, StoreError> {
        let status = resp.status();
        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Err(StoreError::AuthExpired);
        }
        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            return Err(StoreError::Api {
                status: status.as_u16(),
                message,
            });
        }
        Ok(resp)
    }

    fn with_zone(&self, resource: &EventResource) -> EventResource {
        let mut r = resource.clone();
        if r.start.time_zone.is_none() {
            r.start.time_zone = Some(self.time_zone.clone());
        }
        if r.end.time_zone.is_none() {
            r.end.time_zone = Some(self.time_zone.clone());
        }
        r
    }
}

#[async_trait]
impl CalendarStore for GoogleCalendarStore {
    async fn list(
        &self,
        window_start: NaiveDateTime,
        window_end: NaiveDateTime,
    ) -> Result<Vec<StoredEvent>, StoreError> {
        let time_min = window_start.format("%Y-%m-%dT%H:%M:%SZ").to_string();
        let time_max = window_end.format("%Y-%m-%dT%H:%M:%SZ").to_string();

        let mut all_events = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut request = self
                .client
                .get(CALENDAR_BASE)
                .bearer_auth(&self.access_token)
                .query(&[
                    ("timeMin", time_min.as_str()),
                    ("timeMax", time_max.as_str()),
                    ("singleEvents", "true"),
                    ("orderBy", "startTime"),
                    ("maxResults", "250"),
                ]);
            if let Some(ref token) = page_token {
                request = request.query(&[("pageToken", token.as_str())]);
            }

            let resp = Self::check(send_with_retry(request, &self.retry).await?).await?;
            let body: EventListResponse = resp.json().await?;

            for item in body.items {
                if item.status.as_deref() == Some("cancelled") {
                    continue;
                }
                if let Some(stored) = to_stored(item) {
                    all_events.push(stored);
                }
            }

            page_token = body.next_page_token;
            if page_token.is_none() {
                break;
            }
        }

        Ok(all_events)
    }

    async fn insert(&self, resource: &EventResource) -> Result<String, StoreError> {
        let request = self
            .client
            .post(CALENDAR_BASE)
            .bearer_auth(&self.access_token)
            .json(&self.with_zone(resource));

        let resp = Self::check(send_with_retry(request, &self.retry).await?).await?;
        let body: serde_json::Value = resp.json().await?;
        Ok(body["id"].as_str().unwrap_or_default().to_string())
    }

    async fn update(&self, id: &str, resource: &EventResource) -> Result<(), StoreError> {
        let request = self
            .client
            .put(format!("{}/{}", CALENDAR_BASE, id))
            .bearer_auth(&self.access_token)
            .json(&self.with_zone(resource));

        Self::check(send_with_retry(request, &self.retry).await?).await?;
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<(), StoreError> {
        let request = self
            .client
            .delete(format!("{}/{}", CALENDAR_BASE, id))
            .bearer_auth(&self.access_token);

        Self::check(send_with_retry(request, &self.retry).await?).await?;
        Ok(())
    }

    async fn get(&self, id: &str) -> Result<StoredEvent, StoreError> {
        let request = self
            .client
            .get(format!("{}/{}", CALENDAR_BASE, id))
            .bearer_auth(&self.access_token);

        let resp = Self::check(send_with_retry(request, &self.retry).await?).await?;
        let item: GoogleEventRaw = resp.json().await?;
        to_stored(item).ok_or(StoreError::Api {
            status: 500,
            message: "event missing start/end".to_string(),
        })
    }
}
