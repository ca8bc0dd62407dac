//! Remote clients.
//!
//! - `MeetupClient` implements [`crate::store::EventsSource`]
//! - `TrelloClient` implements [`crate::store::BoardStore`]
//!
//! Both authenticate with query-string credentials and retry rate-limited
//! requests with exponential backoff (see [`http`]).

pub mod error;
pub mod http;
pub mod meetup;
pub mod trello;

pub use error::ApiError;
pub use http::{Auth, HttpClient};
pub use meetup::MeetupClient;
pub use trello::TrelloClient;
