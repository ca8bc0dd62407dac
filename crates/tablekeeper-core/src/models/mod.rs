//! Data models for events, RSVPs and board tables.
//!
//! This module contains the data structures shared by the parser, the
//! reconciler and the remote clients:
//!
//! - `Event`, `RsvpRecord`: what the events source reports
//! - `Player`, `Table`: the normalized table model of one board
//! - `BoardRef`, `RawList`, `RawCard`: the board store's raw representation

pub mod board;
pub mod event;
pub mod table;

pub use board::{BoardRef, LabelKind, RawBoard, RawCard, RawLabel, RawList};
pub use event::{Event, MemberId, RsvpMember, RsvpRecord, RsvpResponse, Venue};
pub use table::{Player, Table, TableNumber};
