use anyhow::{Context, Result};
use keyring::Entry;
use tracing::debug;

const SERVICE_NAME: &str = "tablekeeper";

/// The API secrets, one keychain entry per secret.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Secret {
    MeetupApiKey,
    TrelloApiKey,
    TrelloToken,
    SlackToken,
}

impl Secret {
    pub const ALL: [Secret; 4] = [
        Secret::MeetupApiKey,
        Secret::TrelloApiKey,
        Secret::TrelloToken,
        Secret::SlackToken,
    ];

    /// Environment variable holding the secret
    pub fn env_var(&self) -> &'static str {
        match self {
            Secret::MeetupApiKey => "MEETUP_API_KEY",
            Secret::TrelloApiKey => "TRELLO_API_KEY",
            Secret::TrelloToken => "TRELLO_TOKEN",
            Secret::SlackToken => "SLACK_API_TOKEN",
        }
    }

    /// Keychain account name
    pub fn account(&self) -> &'static str {
        match self {
            Secret::MeetupApiKey => "meetup-api-key",
            Secret::TrelloApiKey => "trello-api-key",
            Secret::TrelloToken => "trello-token",
            Secret::SlackToken => "slack-token",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|s| s.account() == name || s.env_var().eq_ignore_ascii_case(name))
    }
}

pub struct CredentialStore;

impl CredentialStore {
    /// Store a secret in the OS keychain
    pub fn store(secret: Secret, value: &str) -> Result<()> {
        let entry = Entry::new(SERVICE_NAME, secret.account())
            .context("Failed to create keyring entry")?;
        entry
            .set_password(value)
            .context("Failed to store secret in keychain")?;
        Ok(())
    }

    pub fn get(secret: Secret) -> Result<String> {
        let entry = Entry::new(SERVICE_NAME, secret.account())
            .context("Failed to create keyring entry")?;
        entry
            .get_password()
            .with_context(|| format!("No {} in keychain", secret.account()))
    }

    /// Delete a stored secret
    pub fn delete(secret: Secret) -> Result<()> {
        let entry = Entry::new(SERVICE_NAME, secret.account())
            .context("Failed to create keyring entry")?;
        entry
            .delete_credential()
            .context("Failed to delete credential from keychain")?;
        Ok(())
    }
}

#[derive(Clone)]
pub struct Credentials {
    pub meetup_api_key: String,
    pub trello_api_key: String,
    pub trello_token: String,
    pub slack_token: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials").finish_non_exhaustive()
    }
}

impl Credentials {
    /// Each secret from its environment variable, else from the keychain.
    pub fn resolve() -> Result<Self> {
        Self::resolve_with(|key| std::env::var(key).ok(), |secret| CredentialStore::get(secret).ok())
    }

    fn resolve_with(
        env: impl Fn(&str) -> Option<String>,
        keychain: impl Fn(Secret) -> Option<String>,
    ) -> Result<Self> {
        let get = |secret: Secret| -> Result<String> {
            if let Some(value) = env(secret.env_var()).filter(|v| !v.trim().is_empty()) {
                return Ok(value.trim().to_string());
            }
            debug!(secret = secret.account(), "Not in environment, trying keychain");
            keychain(secret).ok_or_else(|| {
                anyhow::anyhow!(
                    "Missing {}: set {} or store it in the keychain",
                    secret.account(),
                    secret.env_var()
                )
            })
        };

        Ok(Self {
            meetup_api_key: get(Secret::MeetupApiKey)?,
            trello_api_key: get(Secret::TrelloApiKey)?,
            trello_token: get(Secret::TrelloToken)?,
            slack_token: get(Secret::SlackToken)?,
        })
    }
}
