//! Slack announcements.
//!
//! Everything human-readable about a pass is rendered here. The core only
//! hands over [`ReconciliationSummary`] values.

use anyhow::{bail, Result};
use chrono::{FixedOffset, Offset, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use tablekeeper_core::api::{Auth, HttpClient};
use tablekeeper_core::{Config, Event, Player, ReconciliationSummary};

pub const SLACK_BASE_URL: &str = "https://slack.com";

/// Event times are announced in Central European Time
const ANNOUNCE_OFFSET_SECS: i32 = 3600;

const NEW_EVENT_TITLE: &str = "Woohoo! We've got a new event coming up!";
const NEW_RSVP_TITLE: &str = "New RSVP";

const COLOR_YES: &str = "#36a64f";
const COLOR_NO: &str = "#b20000";
const COLOR_NEUTRAL: &str = "#808080";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Attachment {
    pub pretext: String,
    pub color: String,
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title_link: Option<String>,
}

#[derive(Serialize)]
struct PostMessage<'a> {
    channel: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<&'a str>,
    #[serde(skip_serializing_if = "no_attachments")]
    attachments: &'a [Attachment],
    as_user: bool,
}

fn no_attachments(attachments: &&[Attachment]) -> bool {
    attachments.is_empty()
}

#[derive(Deserialize)]
struct SlackResponse {
    ok: bool,
    #[serde(default)]
    error: Option<String>,
}

fn announce_offset() -> FixedOffset {
    FixedOffset::east_opt(ANNOUNCE_OFFSET_SECS).unwrap_or_else(|| Utc.fix())
}

fn names(players: &[Player]) -> String {
    players
        .iter()
        .map(|p| p.name.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

pub fn new_event_attachment(event: &Event) -> Attachment {
    let date = event.formatted_start(announce_offset());
    Attachment {
        pretext: NEW_EVENT_TITLE.to_string(),
        color: COLOR_NEUTRAL.to_string(),
        text: format!("{}\n{}", date, event.venue_name().unwrap_or("Venue TBD")),
        title: Some(event.name.clone()),
        title_link: Some(event.event_url.clone()).filter(|url| !url.is_empty()),
    }
}

fn rsvp_attachment(color: &str, text: String) -> Attachment {
    Attachment {
        pretext: NEW_RSVP_TITLE.to_string(),
        color: color.to_string(),
        text,
        title: None,
        title_link: None,
    }
}

/// One attachment per kind of change: cancellations, new seats, waitlist.
pub fn rsvp_attachments(summary: &ReconciliationSummary) -> Vec<Attachment> {
    let spots = summary.spots_left();
    let waitlist = summary.event_waitlist_count;
    let waitlist_line = if waitlist > 0 {
        format!("\n{} in the waiting list", waitlist)
    } else {
        String::new()
    };

    let mut attachments = Vec::new();
    if !summary.cancelled.is_empty() {
        attachments.push(rsvp_attachment(
            COLOR_NO,
            format!(
                "{} replied no for the {}\n{} spots left{}",
                names(&summary.cancelled),
                summary.event_name,
                spots,
                waitlist_line
            ),
        ));
    }

    let joined: Vec<Player> = summary.joined().cloned().collect();
    if !joined.is_empty() {
        attachments.push(rsvp_attachment(
            COLOR_YES,
            format!(
                "{} replied yes for the {}\n{} spots left{}",
                names(&joined),
                summary.event_name,
                spots,
                waitlist_line
            ),
        ));
    }

    if !summary.waitlisted.is_empty() {
        attachments.push(rsvp_attachment(
            COLOR_NEUTRAL,
            format!(
                "{} joined the waitlist for the {}\n{} in the waitlist",
                names(&summary.waitlisted),
                summary.event_name,
                waitlist
            ),
        ));
    }
    attachments
}

/// Text for the lab channel when writes failed or did not stick.
pub fn problems_text(summary: &ReconciliationSummary) -> Option<String> {
    if summary.failures.is_empty() && summary.unverified.is_empty() {
        return None;
    }
    let mut lines = vec![format!("Trouble updating the board for *{}*:", summary.event_name)];
    for failure in &summary.failures {
        lines.push(format!("• {} failed: {}", failure.action, failure.error));
    }
    for member in &summary.unverified {
        lines.push(format!("• member {} not on the board after update", member));
    }
    Some(lines.join("\n"))
}

pub struct SlackNotifier {
    http: HttpClient,
    announce_channel: String,
    lab_channel: Option<String>,
}

impl SlackNotifier {
    pub fn new(token: &str, config: &Config) -> Result<Self> {
        Self::with_base_url(SLACK_BASE_URL, token, config)
    }

    pub fn with_base_url(base_url: &str, token: &str, config: &Config) -> Result<Self> {
        Ok(Self {
            http: HttpClient::new("slack", base_url, Auth::Bearer(token.to_string()))?,
            announce_channel: config.announce_channel.clone(),
            lab_channel: config.lab_channel.clone(),
        })
    }

    async fn post(&self, channel: &str, text: Option<&str>, attachments: &[Attachment]) -> Result<()> {
        let body = PostMessage {
            channel,
            text,
            attachments,
            as_user: true,
        };
        let response: SlackResponse = self.http.post_json("/api/chat.postMessage", &body).await?;
        if !response.ok {
            bail!(
                "Slack rejected message to {}: {}",
                channel,
                response.error.unwrap_or_else(|| "unknown error".to_string())
            );
        }
        debug!(channel = %channel, "Message posted");
        Ok(())
    }

    pub async fn announce_new_event(&self, event: &Event) -> Result<()> {
        info!(event = %event.name, channel = %self.announce_channel, "Announcing new event");
        self.post(&self.announce_channel, None, &[new_event_attachment(event)])
            .await
    }

    /// Post RSVP changes to the venue's channel, or the announcement channel
    /// when the venue has none.
    pub async fn announce_summary(&self, summary: &ReconciliationSummary) -> Result<()> {
        let attachments = rsvp_attachments(summary);
        if attachments.is_empty() {
            return Ok(());
        }
        let channel = summary
            .channel_hint
            .as_deref()
            .unwrap_or(&self.announce_channel);
        self.post(channel, None, &attachments).await
    }

    /// Message the lab channel. Silently skipped when none is configured.
    pub async fn tell_lab(&self, text: &str) -> Result<()> {
        match &self.lab_channel {
            Some(channel) => self.post(channel, Some(text), &[]).await,
            None => {
                debug!("No lab channel configured, not sending");
                Ok(())
            }
        }
    }
}
