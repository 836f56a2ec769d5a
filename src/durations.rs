//! Duration entries produced by a scan, and the id → milliseconds table that
//! carries them over to catalog reconciliation.
//!
//! The table lives in a versioned JSON data file so it can be refreshed by a
//! scan (or edited by hand) without touching any code:
//!
//! ```json
//! {
//!   "version": 1,
//!   "generated_at": "2025-01-12T18:03:55Z",
//!   "durations": { "song_2_by_blur.mp3": 122618 }
//! }
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Current duration table file format version.
pub const TABLE_VERSION: u32 = 1;

#[derive(Error, Debug)]
pub enum TableError {
    #[error("IO error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Invalid duration table {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("Unsupported duration table version {found} in {path} (expected {expected})", expected = TABLE_VERSION)]
    Version { path: String, found: u32 },
}

/// One scanned song with its probed duration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DurationEntry {
    /// File name, e.g. `song_2_by_blur.mp3`.
    pub id: String,
    /// Group tag from the parent folder; `None` for flat scans.
    pub group: Option<String>,
    pub duration_ms: u64,
    /// Display form of `duration_ms`, always derived from it.
    pub duration_formatted: String,
}

impl DurationEntry {
    pub fn new(id: impl Into<String>, group: Option<String>, duration_ms: u64) -> Self {
        Self {
            id: id.into(),
            group,
            duration_ms,
            duration_formatted: format_duration(duration_ms),
        }
    }
}

/// Format milliseconds as `M:SS` (minutes unpadded, seconds floored).
pub fn format_duration(duration_ms: u64) -> String {
    let minutes = duration_ms / 60_000;
    let seconds = (duration_ms % 60_000) / 1000;
    format!("{minutes}:{seconds:02}")
}

/// Sort entries by group, then id (byte order, so case-sensitive).
/// Flat entries (no group) sort first.
pub fn sort_entries(entries: &mut [DurationEntry]) {
    entries.sort_by(|a, b| a.group.cmp(&b.group).then_with(|| a.id.cmp(&b.id)));
}

/// Song id → duration in milliseconds.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DurationTable {
    durations: BTreeMap<String, u64>,
}

#[derive(Serialize, Deserialize)]
struct TableFile {
    version: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    generated_at: Option<DateTime<Utc>>,
    durations: BTreeMap<String, u64>,
}

impl DurationTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a table from scan entries.
    ///
    /// Ids must be unique; when a grouped scan finds the same file name in two
    /// folders, the first in (group, id) order wins and the others are
    /// returned as duplicates.
    pub fn from_entries(entries: &[DurationEntry]) -> (Self, Vec<DurationEntry>) {
        let mut sorted = entries.to_vec();
        sort_entries(&mut sorted);

        let mut table = Self::new();
        let mut duplicates = Vec::new();
        for entry in sorted {
            if table.durations.contains_key(&entry.id) {
                log::warn!(
                    "Duplicate id {} in group {}; keeping the first one",
                    entry.id,
                    entry.group.as_deref().unwrap_or("-")
                );
                duplicates.push(entry);
            } else {
                table.durations.insert(entry.id, entry.duration_ms);
            }
        }
        (table, duplicates)
    }

    pub fn insert(&mut self, id: impl Into<String>, duration_ms: u64) -> Option<u64> {
        self.durations.insert(id.into(), duration_ms)
    }

    pub fn get(&self, id: &str) -> Option<u64> {
        self.durations.get(id).copied()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.durations.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.durations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.durations.is_empty()
    }

    /// Iterate in id order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> {
        self.durations.iter().map(|(k, v)| (k.as_str(), *v))
    }

    /// Load a table from its JSON data file.
    pub fn load(path: &Path) -> Result<Self, TableError> {
        let label = path.display().to_string();
        let contents = std::fs::read_to_string(path).map_err(|source| TableError::Io {
            path: label.clone(),
            source,
        })?;
        let file: TableFile = serde_json::from_str(&contents).map_err(|source| TableError::Parse {
            path: label.clone(),
            source,
        })?;
        if file.version != TABLE_VERSION {
            return Err(TableError::Version {
                path: label,
                found: file.version,
            });
        }
        log::info!("Loaded {} durations from {}", file.durations.len(), path.display());
        Ok(Self {
            durations: file.durations,
        })
    }

    /// Write the table to `path`, replacing it atomically.
    pub fn save(&self, path: &Path) -> Result<(), TableError> {
        let file = TableFile {
            version: TABLE_VERSION,
            generated_at: Some(Utc::now()),
            durations: self.durations.clone(),
        };
        let mut json = serde_json::to_string_pretty(&file).map_err(|source| TableError::Parse {
            path: path.display().to_string(),
            source,
        })?;
        json.push('\n');
        crate::atomic::write_atomic(path, json.as_bytes()).map_err(|source| TableError::Io {
            path: path.display().to_string(),
            source,
        })
    }
}

impl FromIterator<(String, u64)> for DurationTable {
    fn from_iter<T: IntoIterator<Item = (String, u64)>>(iter: T) -> Self {
        Self {
            durations: iter.into_iter().collect(),
        }
    }
}
