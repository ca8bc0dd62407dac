use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::models::Event;

const LEDGER_FILE: &str = "announced.json";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CachedData<T> {
    pub data: T,
    pub cached_at: DateTime<Utc>,
}

impl<T> CachedData<T> {
    pub fn new(data: T) -> Self {
        Self {
            data,
            cached_at: Utc::now(),
        }
    }

    pub fn age_minutes(&self) -> i64 {
        let now = Utc::now();
        (now - self.cached_at).num_minutes()
    }
}

/// Ids of events already announced as new, persisted across restarts.
pub struct AnnouncementLedger {
    path: PathBuf,
    announced: CachedData<BTreeSet<String>>,
    fresh: bool,
}

impl AnnouncementLedger {
    pub fn open(cache_dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(cache_dir)
            .with_context(|| format!("Failed to create cache directory {}", cache_dir.display()))?;
        let path = cache_dir.join(LEDGER_FILE);

        if !path.exists() {
            return Ok(Self {
                path,
                announced: CachedData::new(BTreeSet::new()),
                fresh: true,
            });
        }

        let contents = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read ledger file: {}", path.display()))?;
        let announced: CachedData<BTreeSet<String>> = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse ledger file: {}", path.display()))?;
        debug!(
            entries = announced.data.len(),
            age_minutes = announced.age_minutes(),
            "Announcement ledger loaded"
        );

        Ok(Self {
            path,
            announced,
            fresh: false,
        })
    }

    /// No ledger existed on disk. The caller should record the current
    /// events without announcing them.
    pub fn is_fresh(&self) -> bool {
        self.fresh
    }

    pub fn is_announced(&self, event_id: &str) -> bool {
        self.announced.data.contains(event_id)
    }

    /// Returns true if the event was not recorded yet
    pub fn mark_announced(&mut self, event_id: &str) -> bool {
        self.announced.data.insert(event_id.to_string())
    }

    /// Forget events that are no longer upcoming. Returns how many were dropped.
    pub fn prune(&mut self, upcoming: &[Event]) -> usize {
        let live: BTreeSet<&str> = upcoming.iter().map(|e| e.id.as_str()).collect();
        let before = self.announced.data.len();
        self.announced.data.retain(|id| live.contains(id.as_str()));
        before - self.announced.data.len()
    }

    pub fn save(&mut self) -> Result<()> {
        self.announced.cached_at = Utc::now();
        let contents = serde_json::to_string_pretty(&self.announced)?;
        std::fs::write(&self.path, contents)
            .with_context(|| format!("Failed to write ledger file: {}", self.path.display()))?;
        self.fresh = false;
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.announced.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.announced.data.is_empty()
    }
}
