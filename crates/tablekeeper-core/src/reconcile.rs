//! The diff between a board and an RSVP snapshot.
//!
//! [`reconcile`] is a total, side-effect-free function of its two inputs.
//! Members the feed is silent about are left alone: a partial page from the
//! events source must never read as a cancellation.

use std::fmt;

use serde::{Serialize, Serializer};

use crate::apply::ActionFailure;
use crate::board::BoardState;
use crate::models::{MemberId, Player};
use crate::rsvp::RsvpSnapshot;

/// A corrective write for one member.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Action {
    /// `seated` is false when the member only held a waitlist card
    Cancel { player: Player, seated: bool },
    Seat(Player),
    AddToWaitlist(Player),
    PromoteFromWaitlist(Player),
}

impl Action {
    pub fn player(&self) -> &Player {
        match self {
            Action::Cancel { player, .. }
            | Action::Seat(player)
            | Action::AddToWaitlist(player)
            | Action::PromoteFromWaitlist(player) => player,
        }
    }

    pub fn member(&self) -> MemberId {
        self.player().id
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Action::Cancel { .. } => "Cancel",
            Action::Seat(_) => "Seat",
            Action::AddToWaitlist(_) => "AddToWaitlist",
            Action::PromoteFromWaitlist(_) => "PromoteFromWaitlist",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.kind(), self.member())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpotsLeft {
    Known(u32),
    Unknown,
}

impl fmt::Display for SpotsLeft {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SpotsLeft::Known(n) => write!(f, "{}", n),
            SpotsLeft::Unknown => write!(f, "Unknown"),
        }
    }
}

impl Serialize for SpotsLeft {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            SpotsLeft::Known(n) => serializer.serialize_u32(*n),
            SpotsLeft::Unknown => serializer.serialize_str("unknown"),
        }
    }
}

/// What happened in one pass, handed to the messaging layer. Never
/// formatted here.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReconciliationSummary {
    pub event_name: String,
    pub channel_hint: Option<String>,
    pub seated: Vec<Player>,
    pub cancelled: Vec<Player>,
    pub waitlisted: Vec<Player>,
    pub promoted: Vec<Player>,
    /// RSVP limit of the event, `None` for unlimited
    pub capacity: Option<u32>,
    /// Seated players and GMs once the actions are applied
    pub seated_count: u32,
    /// Waitlist size as reported by the events source
    pub event_waitlist_count: u32,
    pub failures: Vec<ActionFailure>,
    /// Members whose write succeeded but did not show up on re-read
    pub unverified: Vec<MemberId>,
}

impl ReconciliationSummary {
    pub fn spots_left(&self) -> SpotsLeft {
        match self.capacity {
            Some(cap) => SpotsLeft::Known(cap.saturating_sub(self.seated_count)),
            None => SpotsLeft::Unknown,
        }
    }

    pub fn has_changes(&self) -> bool {
        !(self.seated.is_empty()
            && self.cancelled.is_empty()
            && self.waitlisted.is_empty()
            && self.promoted.is_empty())
    }

    /// Players who now hold a seat: new RSVPs and promotions
    pub fn joined(&self) -> impl Iterator<Item = &Player> {
        self.seated.iter().chain(self.promoted.iter())
    }

    /// Take a failed action back out of the announcement and the count.
    pub fn record_failure(&mut self, failure: ActionFailure) {
        let member = failure.action.member();
        let drop_member = |list: &mut Vec<Player>| {
            let before = list.len();
            list.retain(|p| p.id != member);
            list.len() != before
        };
        match &failure.action {
            Action::Cancel { seated, .. } => {
                drop_member(&mut self.cancelled);
                if *seated {
                    self.seated_count += 1;
                }
            }
            Action::Seat(_) => {
                drop_member(&mut self.seated);
                self.seated_count = self.seated_count.saturating_sub(1);
            }
            Action::AddToWaitlist(_) => {
                drop_member(&mut self.waitlisted);
            }
            Action::PromoteFromWaitlist(_) => {
                // Only counted promotions are taken back out
                if drop_member(&mut self.promoted) {
                    self.seated_count = self.seated_count.saturating_sub(1);
                }
            }
        }
        self.failures.push(failure);
    }
}

/// Diff a board against an RSVP snapshot.
///
/// Actions come out as Cancel, then Seat, then AddToWaitlist, then
/// PromoteFromWaitlist, each group in member id order. A member appears in
/// at most one action.
pub fn reconcile(board: &BoardState, snapshot: &RsvpSnapshot) -> (Vec<Action>, ReconciliationSummary) {
    let known_participants = board.participants();
    let known_waitlist = board.waitlist();

    let cancels = snapshot.no.values().filter_map(|player| {
        if known_participants.contains(&player.id) {
            Some(Action::Cancel {
                player: player.clone(),
                seated: true,
            })
        } else if known_waitlist.contains(&player.id) {
            Some(Action::Cancel {
                player: player.clone(),
                seated: false,
            })
        } else {
            None
        }
    });

    let seats = snapshot
        .yes
        .values()
        .filter(|p| !known_participants.contains(&p.id) && !known_waitlist.contains(&p.id))
        .map(|p| Action::Seat(p.clone()));

    let waitlist_adds = snapshot
        .waitlisted
        .values()
        .filter(|p| !known_waitlist.contains(&p.id) && !known_participants.contains(&p.id))
        .map(|p| Action::AddToWaitlist(p.clone()));

    let promotions = snapshot
        .yes
        .values()
        .filter(|p| known_waitlist.contains(&p.id))
        .map(|p| Action::PromoteFromWaitlist(p.clone()));

    let actions: Vec<Action> = cancels
        .chain(seats)
        .chain(waitlist_adds)
        .chain(promotions)
        .collect();

    let mut summary = ReconciliationSummary {
        event_name: board.board.name.clone(),
        capacity: snapshot.capacity,
        seated_count: known_participants.len() as u32,
        ..Default::default()
    };
    for action in &actions {
        match action {
            Action::Cancel { player, seated } => {
                summary.cancelled.push(player.clone());
                if *seated {
                    summary.seated_count = summary.seated_count.saturating_sub(1);
                }
            }
            Action::Seat(player) => {
                summary.seated.push(player.clone());
                summary.seated_count += 1;
            }
            Action::AddToWaitlist(player) => summary.waitlisted.push(player.clone()),
            // A GM elsewhere already holds a seat. Only the stale waitlist
            // marker goes, which is neither news nor a new seat.
            Action::PromoteFromWaitlist(player) if known_participants.contains(&player.id) => {}
            Action::PromoteFromWaitlist(player) => {
                summary.promoted.push(player.clone());
                summary.seated_count += 1;
            }
        }
    }

    (actions, summary)
}
