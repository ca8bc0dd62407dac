//! Core library for tablekeeper.
//!
//! Keeps the game tables of an event, materialized as lists and cards on a
//! board store, in sync with the RSVPs reported by the events source.
//!
//! A reconciliation pass for one event is:
//!
//! 1. read the board and parse it into [`BoardState`] ([`board`])
//! 2. normalize the RSVP feed into an [`RsvpSnapshot`] ([`rsvp`])
//! 3. diff the two into an ordered list of [`Action`]s ([`reconcile`])
//! 4. apply the actions idempotently against the board store ([`apply`])
//!
//! [`engine`] drives passes for all upcoming events; [`api`] holds the
//! remote clients for the events source and the board store.

pub mod api;
pub mod apply;
pub mod auth;
pub mod board;
pub mod cache;
pub mod config;
pub mod engine;
pub mod error;
pub mod lookup;
pub mod models;
pub mod reconcile;
pub mod rsvp;
pub mod store;

pub use api::{MeetupClient, TrelloClient};
pub use apply::{add_table, ActionApplier, ActionFailure};
pub use auth::{CredentialStore, Credentials, Secret};
pub use board::{parse_board, serialize_tables, BoardState, ParseError};
pub use cache::AnnouncementLedger;
pub use config::Config;
pub use engine::{CycleStats, Engine, EngineSettings, PassReport};
pub use error::{Result, RosterError};
pub use lookup::EventLookup;
pub use models::{Event, LabelKind, MemberId, Player, RsvpRecord, RsvpResponse, Table, TableNumber};
pub use reconcile::{reconcile, Action, ReconciliationSummary, SpotsLeft};
pub use rsvp::RsvpSnapshot;
pub use store::{BoardStore, EventsSource};
