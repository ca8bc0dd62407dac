//! Client for the events source (Meetup v2 API).

use anyhow::Result as AnyResult;
use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use super::http::{Auth, HttpClient};
use crate::error::Result;
use crate::models::{Event, RsvpRecord};
use crate::store::EventsSource;

pub const MEETUP_BASE_URL: &str = "https://api.meetup.com";

/// Every v2 listing wraps its items in `results`.
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    #[serde(default = "Vec::new")]
    results: Vec<T>,
}

#[derive(Clone)]
pub struct MeetupClient {
    http: HttpClient,
    group_id: String,
}

impl MeetupClient {
    pub fn new(api_key: &str, group_id: &str) -> AnyResult<Self> {
        Self::with_base_url(MEETUP_BASE_URL, api_key, group_id)
    }

    pub fn with_base_url(base_url: &str, api_key: &str, group_id: &str) -> AnyResult<Self> {
        let http = HttpClient::new(
            "meetup",
            base_url,
            Auth::Query(vec![("key", api_key.to_string())]),
        )?;
        Ok(Self {
            http,
            group_id: group_id.to_string(),
        })
    }
}

#[async_trait]
impl EventsSource for MeetupClient {
    async fn upcoming_events(&self) -> Result<Vec<Event>> {
        let envelope: Envelope<Event> = self
            .http
            .get(
                "/2/events",
                &[("group_id", self.group_id.as_str()), ("status", "upcoming")],
            )
            .await?;
        debug!(group = %self.group_id, count = envelope.results.len(), "Fetched upcoming events");
        Ok(envelope.results)
    }

    async fn rsvps(&self, event_id: &str) -> Result<Vec<RsvpRecord>> {
        let envelope: Envelope<RsvpRecord> = self
            .http
            .get("/2/rsvps", &[("event_id", event_id)])
            .await?;
        debug!(event = %event_id, count = envelope.results.len(), "Fetched RSVPs");
        Ok(envelope.results)
    }
}
