//! API secrets.
//!
//! Secrets come from the environment first and the OS keychain second
//! (via keyring). `CredentialStore` manages the keychain entries.

pub mod credentials;

pub use credentials::{CredentialStore, Credentials, Secret};
