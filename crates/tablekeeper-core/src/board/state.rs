use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use crate::models::{BoardRef, MemberId, Player, Table, TableNumber};

/// One roster card as found on the board.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CardEntry {
    pub card_id: String,
    pub list_id: String,
    pub table: TableNumber,
    pub player: Player,
    pub gm: bool,
    pub waitlisted: bool,
    pub cancelled: bool,
}

impl CardEntry {
    pub fn is_active(&self) -> bool {
        !self.cancelled
    }
}

/// Parsed view of one board for a single reconciliation pass.
#[derive(Debug, Clone, Serialize)]
pub struct BoardState {
    pub board: BoardRef,
    pub tables: BTreeMap<TableNumber, Table>,
    cards: Vec<CardEntry>,
    overflow_list_id: Option<String>,
}

impl BoardState {
    pub(crate) fn new(
        board: BoardRef,
        tables: BTreeMap<TableNumber, Table>,
        cards: Vec<CardEntry>,
        overflow_list_id: Option<String>,
    ) -> Self {
        Self {
            board,
            tables,
            cards,
            overflow_list_id,
        }
    }

    /// Seated players and GMs of every table, cancelled cards excluded
    pub fn participants(&self) -> BTreeSet<MemberId> {
        self.tables
            .values()
            .flat_map(|t| t.participant_ids())
            .collect()
    }

    /// Members carrying the waitlist marker, cancelled cards excluded
    pub fn waitlist(&self) -> BTreeSet<MemberId> {
        self.tables
            .values()
            .flat_map(|t| t.waitlist.iter().map(|p| p.id))
            .collect()
    }

    pub fn seated_count(&self) -> usize {
        self.participants().len()
    }

    pub fn cards(&self) -> &[CardEntry] {
        &self.cards
    }

    /// The member's non-cancelled card, if any
    pub fn active_card(&self, member: MemberId) -> Option<&CardEntry> {
        self.cards
            .iter()
            .find(|c| c.player.id == member && c.is_active())
    }

    /// List where new RSVP cards go: the overflow list, or the first list of
    /// a board that has none.
    pub fn overflow_list_id(&self) -> Option<&str> {
        self.overflow_list_id.as_deref()
    }

    pub fn table(&self, number: TableNumber) -> Option<&Table> {
        self.tables.get(&number)
    }

    /// Highest numbered table, ignoring the overflow table
    pub fn last_table_number(&self) -> Option<TableNumber> {
        self.tables.keys().filter(|n| !n.is_overflow()).max().copied()
    }
}
