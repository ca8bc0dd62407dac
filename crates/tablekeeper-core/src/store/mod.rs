//! Seams to the two remote collaborators.
//!
//! The engine only talks to the events source and the board store through
//! these traits. [`crate::api`] provides the HTTP implementations.

#[cfg(test)]
pub(crate) mod memory;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{BoardRef, Event, LabelKind, RawBoard, RsvpRecord};

/// Read side of the events source.
#[async_trait]
pub trait EventsSource: Send + Sync {
    async fn upcoming_events(&self) -> Result<Vec<Event>>;

    /// RSVPs for one event, in source order (most recent last)
    async fn rsvps(&self, event_id: &str) -> Result<Vec<RsvpRecord>>;
}

/// The board store: the durable record of every roster.
#[async_trait]
pub trait BoardStore: Send + Sync {
    /// Drop cached lookups for this board. Called at the start of each pass
    /// so nothing cached survives into the next one.
    fn begin_pass(&self, board_name: &str);

    /// `NotFound` when no board has the name, `AmbiguousJoinKey` when
    /// several do.
    async fn find_board(&self, name: &str) -> Result<BoardRef>;

    /// Open lists with their open cards, in board order
    async fn read_board(&self, board: &BoardRef) -> Result<RawBoard>;

    /// Create a card and return its id
    async fn create_card(
        &self,
        board: &BoardRef,
        list_id: &str,
        name: &str,
        description: &str,
        labels: &[LabelKind],
    ) -> Result<String>;

    async fn add_label(&self, board: &BoardRef, card_id: &str, label: LabelKind) -> Result<()>;

    async fn remove_label(&self, board: &BoardRef, card_id: &str, label: LabelKind) -> Result<()>;

    /// Create a list at the bottom of the board and return its id
    async fn create_list(&self, board: &BoardRef, name: &str) -> Result<String>;

    async fn find_organization(&self, name: &str) -> Result<String>;

    async fn clone_board(
        &self,
        template: &BoardRef,
        new_name: &str,
        organization_id: Option<&str>,
    ) -> Result<BoardRef>;
}
