//! Board state parsing.
//!
//! Turns a board's raw lists and cards into the table model and a
//! participant index, and back. The encoding on the board is:
//!
//! - list name `"<N>. <title>"` for a table, or a name starting with `RSVP` /
//!   `Waitlist` for the overflow table
//! - an `Info` card whose description is `"<blurb>\n\nPlayers: <N>"`
//! - one card per participant, description = bare member id, with `GM`,
//!   `Canceled` and `Waitlist` labels

pub mod parser;
pub mod state;

pub use parser::{decode_info, encode_info, parse_board, parse_tables, serialize_tables, ParseError};
pub use state::{BoardState, CardEntry};
