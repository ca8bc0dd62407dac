//! Error taxonomy for a reconciliation pass.
//!
//! Nothing here is fatal to the process. Each variant is scoped to one event
//! (or one action) and the polling shell decides what to do with repeats.

use thiserror::Error;

use crate::board::ParseError;

pub type Result<T> = std::result::Result<T, RosterError>;

#[derive(Error, Debug)]
pub enum RosterError {
    /// No board (or event) exists for the name. The event is simply new.
    #[error("Not found: {0}")]
    NotFound(String),

    /// The board's list/card encoding is malformed. Aborts this event only.
    #[error(transparent)]
    Parse(#[from] ParseError),

    /// A single write against the board store failed.
    #[error("Remote write failed for {action}: {message}")]
    RemoteWrite { action: String, message: String },

    /// The join key between the two systems is unusable: a board name shared
    /// by several boards, or a member id that is absent or non-numeric.
    #[error("Ambiguous join key: {0}")]
    AmbiguousJoinKey(String),

    /// Transport or API failure while reading from a remote service.
    #[error(transparent)]
    Remote(#[from] anyhow::Error),
}

impl RosterError {
    pub fn remote_write(action: impl ToString, err: impl std::fmt::Display) -> Self {
        RosterError::RemoteWrite {
            action: action.to_string(),
            message: err.to_string(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, RosterError::NotFound(_))
    }
}
