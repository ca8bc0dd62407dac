//! Normalization of the events source's RSVP feed.
//!
//! The feed may repeat a member. Records are taken in source order, which
//! the events source returns most-recent-last, so the last record seen for
//! a member wins.

use std::collections::{BTreeMap, HashMap};

use serde::Serialize;
use tracing::{debug, warn};

use crate::error::RosterError;
use crate::models::{Event, MemberId, Player, RsvpRecord, RsvpResponse};

/// Three disjoint sets of members, keyed by member id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RsvpSnapshot {
    pub yes: BTreeMap<MemberId, Player>,
    pub no: BTreeMap<MemberId, Player>,
    pub waitlisted: BTreeMap<MemberId, Player>,
    /// The event's RSVP limit, `None` for unlimited
    pub capacity: Option<u32>,
    /// Records dropped for an unusable member id or response
    pub skipped: usize,
}

impl RsvpSnapshot {
    pub fn build(records: &[RsvpRecord]) -> Self {
        let mut latest: HashMap<MemberId, (Player, &RsvpResponse)> = HashMap::new();
        let mut skipped = 0;

        for record in records {
            let Some(id) = record.member.member_id else {
                let err = RosterError::AmbiguousJoinKey(format!(
                    "RSVP from {:?} has no numeric member id",
                    record.member.name
                ));
                warn!(error = %err, "Skipping RSVP record");
                skipped += 1;
                continue;
            };

            if let RsvpResponse::Other(response) = &record.response {
                warn!(member = %id, response = %response, "Skipping RSVP with unknown response");
                skipped += 1;
                continue;
            }

            let player = Player {
                name: record.member.name.clone(),
                id,
            };
            if let Some((_, previous)) = latest.insert(id, (player, &record.response)) {
                debug!(member = %id, previous = %previous, current = %record.response, "Later RSVP overrides earlier one");
            }
        }

        let mut snapshot = RsvpSnapshot {
            skipped,
            ..Default::default()
        };
        for (id, (player, response)) in latest {
            let set = match response {
                RsvpResponse::Yes => &mut snapshot.yes,
                RsvpResponse::No => &mut snapshot.no,
                RsvpResponse::Waitlist => &mut snapshot.waitlisted,
                RsvpResponse::Other(_) => continue,
            };
            set.insert(id, player);
        }
        snapshot
    }

    pub fn for_event(event: &Event, records: &[RsvpRecord]) -> Self {
        Self::build(records).with_capacity(event.rsvp_limit)
    }

    pub fn with_capacity(mut self, capacity: Option<u32>) -> Self {
        self.capacity = capacity;
        self
    }

    pub fn len(&self) -> usize {
        self.yes.len() + self.no.len() + self.waitlisted.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RsvpMember;

    #[test]
    fn test_partition_by_response() {
        let records = vec![
            RsvpRecord::new(1, "Ann", RsvpResponse::Yes),
            RsvpRecord::new(2, "Bo", RsvpResponse::No),
            RsvpRecord::new(3, "Cy", RsvpResponse::Waitlist),
        ];
        let snapshot = RsvpSnapshot::build(&records);
        assert_eq!(snapshot.yes.keys().copied().collect::<Vec<_>>(), vec![MemberId(1)]);
        assert_eq!(snapshot.no.keys().copied().collect::<Vec<_>>(), vec![MemberId(2)]);
        assert_eq!(snapshot.waitlisted.keys().copied().collect::<Vec<_>>(), vec![MemberId(3)]);
        assert_eq!(snapshot.len(), 3);
        assert_eq!(snapshot.skipped, 0);
    }

    #[test]
    fn test_last_seen_wins() {
        let records = vec![
            RsvpRecord::new(1, "Ann", RsvpResponse::Yes),
            RsvpRecord::new(1, "Ann B", RsvpResponse::No),
        ];
        let snapshot = RsvpSnapshot::build(&records);
        assert!(snapshot.yes.is_empty());
        assert_eq!(snapshot.no[&MemberId(1)].name, "Ann B");

        let reversed: Vec<_> = records.into_iter().rev().collect();
        let snapshot = RsvpSnapshot::build(&reversed);
        assert!(snapshot.no.is_empty());
        assert!(snapshot.yes.contains_key(&MemberId(1)));
    }

    #[test]
    fn test_skips_unusable_records() {
        let records = vec![
            RsvpRecord {
                member: RsvpMember {
                    member_id: None,
                    name: "Ghost".to_string(),
                },
                response: RsvpResponse::Yes,
            },
            RsvpRecord::new(2, "Bo", RsvpResponse::Other("maybe".to_string())),
            RsvpRecord::new(3, "Cy", RsvpResponse::Yes),
        ];
        let snapshot = RsvpSnapshot::build(&records);
        assert_eq!(snapshot.skipped, 2);
        assert_eq!(snapshot.len(), 1);
    }

    #[test]
    fn test_capacity_comes_from_event() {
        let event: Event =
            serde_json::from_str(r#"{"id": "1", "name": "Game Day", "time": 0, "rsvp_limit": 12}"#)
                .expect("event should parse");
        let snapshot = RsvpSnapshot::for_event(&event, &[]);
        assert_eq!(snapshot.capacity, Some(12));
        assert!(snapshot.is_empty());
    }
}
