use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, FixedOffset, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Stable numeric member identifier shared by the events source and the
/// board (stored as the bare card description).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MemberId(pub u64);

impl fmt::Display for MemberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for MemberId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse().map(MemberId)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Venue {
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub id: String,
    pub name: String,
    /// Scheduled start, epoch milliseconds
    pub time: i64,
    #[serde(default)]
    pub status: Option<String>,
    /// `None` means unlimited
    #[serde(default)]
    pub rsvp_limit: Option<u32>,
    #[serde(default)]
    pub yes_rsvp_count: u32,
    #[serde(default)]
    pub waitlist_count: u32,
    #[serde(default)]
    pub event_url: String,
    #[serde(default)]
    pub venue: Option<Venue>,
}

impl Event {
    pub fn venue_name(&self) -> Option<&str> {
        self.venue
            .as_ref()
            .map(|v| v.name.as_str())
            .filter(|name| !name.is_empty())
    }

    pub fn start_time(&self) -> Option<DateTime<Utc>> {
        Utc.timestamp_millis_opt(self.time).single()
    }

    /// Start time in the given offset: "Saturday June 16 11:30"
    pub fn formatted_start(&self, offset: FixedOffset) -> String {
        match self.start_time() {
            Some(dt) => dt.with_timezone(&offset).format("%A %B %d %H:%M").to_string(),
            None => "TBD".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum RsvpResponse {
    Yes,
    No,
    Waitlist,
    Other(String),
}

impl From<String> for RsvpResponse {
    fn from(value: String) -> Self {
        match value.to_ascii_lowercase().as_str() {
            "yes" => RsvpResponse::Yes,
            "no" => RsvpResponse::No,
            "waitlist" => RsvpResponse::Waitlist,
            _ => RsvpResponse::Other(value),
        }
    }
}

impl From<RsvpResponse> for String {
    fn from(value: RsvpResponse) -> Self {
        value.to_string()
    }
}

impl fmt::Display for RsvpResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RsvpResponse::Yes => write!(f, "yes"),
            RsvpResponse::No => write!(f, "no"),
            RsvpResponse::Waitlist => write!(f, "waitlist"),
            RsvpResponse::Other(s) => write!(f, "{}", s),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RsvpMember {
    /// Absent when the source sends no id or a non-numeric one
    #[serde(default, deserialize_with = "lenient_member_id")]
    pub member_id: Option<MemberId>,
    #[serde(default)]
    pub name: String,
}

/// One RSVP as reported by the events source. Transient: lives for a single
/// reconciliation pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RsvpRecord {
    #[serde(default)]
    pub member: RsvpMember,
    pub response: RsvpResponse,
}

impl RsvpRecord {
    pub fn new(member_id: u64, name: &str, response: RsvpResponse) -> Self {
        Self {
            member: RsvpMember {
                member_id: Some(MemberId(member_id)),
                name: name.to_string(),
            },
            response,
        }
    }
}

// The source has sent ids both as numbers and as strings
fn lenient_member_id<'de, D>(deserializer: D) -> Result<Option<MemberId>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(value.and_then(|v| match v {
        serde_json::Value::Number(n) => n.as_u64().map(MemberId),
        serde_json::Value::String(s) => s.parse().ok(),
        _ => None,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_meetup_event() {
        let json = r#"{"utc_offset": 7200000, "venue": {"name": "STORG Clubhouse", "city": "Stockholm"},
            "rsvp_limit": 40, "waitlist_count": 0, "event_url": "https://www.example.com/events/24979/",
            "yes_rsvp_count": 38, "name": "STORG Awesome Session!", "id": "24979",
            "time": 1529145000000, "announced": false, "status": "upcoming"}"#;

        let event: Event = serde_json::from_str(json).expect("event should parse");
        assert_eq!(event.id, "24979");
        assert_eq!(event.rsvp_limit, Some(40));
        assert_eq!(event.venue_name(), Some("STORG Clubhouse"));

        let cet = FixedOffset::east_opt(3600).expect("valid offset");
        assert_eq!(event.formatted_start(cet), "Saturday June 16 11:30");
    }

    #[test]
    fn test_event_without_limit_or_venue() {
        let json = r#"{"id": "1", "name": "Open Night", "time": 0}"#;
        let event: Event = serde_json::from_str(json).expect("event should parse");
        assert_eq!(event.rsvp_limit, None);
        assert_eq!(event.venue_name(), None);
    }

    #[test]
    fn test_rsvp_member_id_decoding() {
        let numeric: RsvpRecord =
            serde_json::from_str(r#"{"response": "yes", "member": {"member_id": 208412800, "name": "Rasmus"}}"#)
                .expect("numeric id");
        assert_eq!(numeric.member.member_id, Some(MemberId(208412800)));

        let string: RsvpRecord =
            serde_json::from_str(r#"{"response": "no", "member": {"member_id": " 42 ", "name": "Ann"}}"#)
                .expect("string id");
        assert_eq!(string.member.member_id, Some(MemberId(42)));
        assert_eq!(string.response, RsvpResponse::No);

        let junk: RsvpRecord =
            serde_json::from_str(r#"{"response": "yes", "member": {"member_id": "abc", "name": "Bo"}}"#)
                .expect("junk id still decodes");
        assert_eq!(junk.member.member_id, None);

        let missing: RsvpRecord = serde_json::from_str(r#"{"response": "yes"}"#).expect("no member");
        assert_eq!(missing.member.member_id, None);
    }

    #[test]
    fn test_rsvp_response_values() {
        assert_eq!(RsvpResponse::from("YES".to_string()), RsvpResponse::Yes);
        assert_eq!(RsvpResponse::from("waitlist".to_string()), RsvpResponse::Waitlist);
        assert_eq!(
            RsvpResponse::from("maybe".to_string()),
            RsvpResponse::Other("maybe".to_string())
        );
        assert_eq!(RsvpResponse::Waitlist.to_string(), "waitlist");
    }
}
