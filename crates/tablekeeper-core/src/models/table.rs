use std::fmt;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

use super::event::MemberId;

/// Table number as encoded in a list name (`"<N>. <title>"`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TableNumber(pub u32);

impl TableNumber {
    /// Reserved number for the RSVP/waitlist list: players not yet seated at
    /// a numbered table.
    pub const OVERFLOW: TableNumber = TableNumber(9999);

    pub fn is_overflow(&self) -> bool {
        *self == Self::OVERFLOW
    }
}

impl fmt::Display for TableNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A participant. Equality is by member id only, the name is presentation
/// and may change between polls.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Player {
    pub name: String,
    pub id: MemberId,
}

impl Player {
    pub fn new(name: impl Into<String>, id: u64) -> Self {
        Self {
            name: name.into(),
            id: MemberId(id),
        }
    }
}

impl PartialEq for Player {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Player {}

impl Hash for Player {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

/// One seating group on a board.
///
/// Rebuilt from the board on every pass and never carried across passes.
/// `cancelled` holds cards kept on the board for audit; they count for
/// nothing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Table {
    pub number: TableNumber,
    pub title: String,
    pub blurb: String,
    /// `None` means unlimited
    pub max_players: Option<u32>,
    pub players: Vec<Player>,
    pub gm: Option<Player>,
    pub waitlist: Vec<Player>,
    pub cancelled: Vec<Player>,
}

impl Table {
    pub fn new(number: TableNumber, title: impl Into<String>) -> Self {
        Self {
            number,
            title: title.into(),
            blurb: String::new(),
            max_players: None,
            players: Vec::new(),
            gm: None,
            waitlist: Vec::new(),
            cancelled: Vec::new(),
        }
    }

    pub fn overflow(title: impl Into<String>) -> Self {
        Self::new(TableNumber::OVERFLOW, title)
    }

    pub fn is_overflow(&self) -> bool {
        self.number.is_overflow()
    }

    pub fn add_player(&mut self, player: Player) {
        self.players.push(player);
    }

    pub fn player_ids(&self) -> Vec<MemberId> {
        self.players.iter().map(|p| p.id).collect()
    }

    pub fn player_names(&self) -> Vec<&str> {
        self.players.iter().map(|p| p.name.as_str()).collect()
    }

    pub fn is_seated(&self, id: MemberId) -> bool {
        self.players.iter().any(|p| p.id == id)
    }

    pub fn is_gm(&self, id: MemberId) -> bool {
        self.gm.as_ref().is_some_and(|gm| gm.id == id)
    }

    /// Seated players plus the GM
    pub fn participant_ids(&self) -> impl Iterator<Item = MemberId> + '_ {
        self.players.iter().chain(self.gm.iter()).map(|p| p.id)
    }

    pub fn is_full(&self) -> bool {
        self.max_players
            .is_some_and(|max| self.players.len() >= max as usize)
    }

    pub fn seats_left(&self) -> Option<u32> {
        self.max_players
            .map(|max| max.saturating_sub(self.players.len() as u32))
    }

    /// "3 out of 5 max", "3 out of Unknown max" for uncapped tables
    pub fn occupancy_display(&self) -> String {
        match self.max_players {
            Some(max) => format!("{} out of {} max", self.players.len(), max),
            None => format!("{} out of Unknown max", self.players.len()),
        }
    }
}
