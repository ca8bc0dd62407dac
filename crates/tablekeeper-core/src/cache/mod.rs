//! Caches.
//!
//! - `LookupCache`: in-memory board lookups, scoped to one pass per board
//! - `AnnouncementLedger`: on-disk record of events already announced

pub mod lookup;
pub mod manager;

pub use lookup::{LookupCache, LookupKind};
pub use manager::{AnnouncementLedger, CachedData};
