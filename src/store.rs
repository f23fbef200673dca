// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::error::StoreError;

/// Persisted download state for one feed: the set of enclosure URLs whose
/// episodes have been fully written to disk.
///
/// A URL is added only after its file is complete and flushed, and the set
/// only grows, so an interrupted run loses at most the in-flight episode.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProgressRecord {
    #[serde(default)]
    pub downloaded_episodes: HashSet<String>,
    /// When the record was last saved. Informational only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

impl ProgressRecord {
    pub fn is_downloaded(&self, enclosure_url: &str) -> bool {
        self.downloaded_episodes.contains(enclosure_url)
    }

    pub fn mark_downloaded(&mut self, enclosure_url: &str) {
        self.downloaded_episodes.insert(enclosure_url.to_string());
    }

    pub fn downloaded_count(&self) -> usize {
        self.downloaded_episodes.len()
    }
}

/// Reads and writes per-feed progress records.
///
/// Each feed gets its own record file derived from its name, so runs against
/// different feeds never contend.
#[derive(Debug, Clone)]
pub struct ProgressStore {
    base_dir: PathBuf,
}

impl ProgressStore {
    pub fn new(base_dir: &Path) -> Self {
        Self {
            base_dir: base_dir.to_path_buf(),
        }
    }

    /// Path of the progress record for a feed
    pub fn record_path(&self, feed_name: &str) -> PathBuf {
        self.base_dir.join(format!("progress_{feed_name}.json"))
    }

    /// Load the progress record for a feed.
    ///
    /// Tolerant read: an absent, unreadable, or malformed file yields an
    /// empty record. Forward progress matters more than strict validation
    /// here; the worst case is re-downloading episodes.
    pub fn load(&self, feed_name: &str) -> ProgressRecord {
        let path = self.record_path(feed_name);

        match std::fs::read_to_string(&path) {
            Ok(json) => serde_json::from_str(&json).unwrap_or_default(),
            Err(_) => ProgressRecord::default(),
        }
    }

    /// Persist the progress record for a feed, overwriting any prior value.
    ///
    /// Write failures propagate: silently losing dedup state would cause
    /// duplicate downloads on resume.
    pub fn save(&self, feed_name: &str, record: &ProgressRecord) -> Result<(), StoreError> {
        let stamped = ProgressRecord {
            downloaded_episodes: record.downloaded_episodes.clone(),
            updated_at: Some(Utc::now().to_rfc3339()),
        };

        let json = serde_json::to_string_pretty(&stamped)?;
        let path = self.record_path(feed_name);
        std::fs::write(&path, json).map_err(|e| StoreError::WriteFailed { path, source: e })
    }
}
