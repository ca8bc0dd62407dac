//! Application configuration management.
//!
//! Configuration is stored at `~/.config/tablekeeper/config.json` and can be
//! overridden field by field from the environment.

use std::collections::BTreeMap;
use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Application name used for config/cache directory paths
const APP_NAME: &str = "tablekeeper";

/// Config file name
const CONFIG_FILE: &str = "config.json";

const DEFAULT_TEMPLATE_BOARD: &str = "Meetup Template";

/// Seconds between polling cycles
const DEFAULT_POLL_INTERVAL_SECS: u64 = 600;

/// Events reconciled concurrently within one cycle
const DEFAULT_MAX_CONCURRENT_EVENTS: usize = 4;

const DEFAULT_ANNOUNCE_CHANNEL: &str = "#announcements";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub meetup_group_id: Option<String>,
    /// Organization new boards are created in
    pub trello_team: Option<String>,
    pub template_board: String,
    pub poll_interval_secs: u64,
    pub max_concurrent_events: usize,
    /// Venue name to the channel that hears about its events
    pub venue_channels: BTreeMap<String, String>,
    pub announce_channel: String,
    /// Where pass failures are reported
    pub lab_channel: Option<String>,
    pub dry_run: bool,
}

impl Default for Config {
    fn default() -> Self {
        let venue_channels = [
            ("STORG Clubhouse", "#storg-south"),
            ("STORG Northern Clubhouse", "#storg-north"),
        ]
        .into_iter()
        .map(|(venue, channel)| (venue.to_string(), channel.to_string()))
        .collect();

        Self {
            meetup_group_id: None,
            trello_team: None,
            template_board: DEFAULT_TEMPLATE_BOARD.to_string(),
            poll_interval_secs: DEFAULT_POLL_INTERVAL_SECS,
            max_concurrent_events: DEFAULT_MAX_CONCURRENT_EVENTS,
            venue_channels,
            announce_channel: DEFAULT_ANNOUNCE_CHANNEL.to_string(),
            lab_channel: None,
            dry_run: false,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        if path.exists() {
            let contents = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read config file {}", path.display()))?;
            Ok(serde_json::from_str(&contents)
                .with_context(|| format!("Failed to parse config file {}", path.display()))?)
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self) -> Result<()> {
        let path = Self::config_path()?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    pub fn cache_dir(&self) -> Result<PathBuf> {
        let cache_dir = dirs::cache_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find cache directory"))?;

        let mut path = cache_dir.join(APP_NAME);
        if let Some(ref group) = self.meetup_group_id {
            path = path.join(group);
        }
        Ok(path)
    }

    /// Override fields from the process environment.
    pub fn apply_env(&mut self) {
        self.apply_vars(|key| std::env::var(key).ok());
    }

    fn apply_vars(&mut self, var: impl Fn(&str) -> Option<String>) {
        let var = |key: &str| var(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        if let Some(group) = var("MEETUP_GROUP_ID") {
            self.meetup_group_id = Some(group);
        }
        if let Some(team) = var("TRELLO_TEAM") {
            self.trello_team = Some(team);
        }
        if let Some(template) = var("TRELLO_TEMPLATE_BOARD") {
            self.template_board = template;
        }
        if let Some(raw) = var("CHECK_TIME") {
            match raw.parse::<u64>() {
                Ok(secs) if secs > 0 => self.poll_interval_secs = secs,
                _ => warn!(value = %raw, "Ignoring invalid CHECK_TIME"),
            }
        }
        if let Some(channel) = var("LAB_CHANNEL_ID") {
            self.lab_channel = Some(channel);
        }
        if let Some(channel) = var("ANNOUNCE_CHANNEL") {
            self.announce_channel = channel;
        }
    }

    pub fn channel_for_venue(&self, venue: &str) -> Option<&str> {
        self.venue_channels.get(venue).map(String::as_str)
    }
}
