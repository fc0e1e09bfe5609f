//! Persistent operation history.
//!
//! This module provides the append-only operation log that records every
//! file organization run and backs the rollback functionality. Entries are
//! keyed by monotonically increasing timeline identifiers (`T1`, `T2`, ...)
//! and persisted as a JSON snapshot on every mutation.

use chrono::{Local, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fs;
use std::path::{Path, PathBuf};

/// Errors that can occur while persisting or loading history.
#[derive(Debug)]
pub enum HistoryError {
    /// Failed to write the history file.
    WriteFailed {
        path: PathBuf,
        source: std::io::Error,
    },
    /// Failed to serialize history entries to JSON.
    SerializeFailed { reason: String },
}

impl std::fmt::Display for HistoryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::WriteFailed { path, source } => {
                write!(
                    f,
                    "Failed to write history file {}: {}",
                    path.display(),
                    source
                )
            }
            Self::SerializeFailed { reason } => {
                write!(f, "Failed to serialize history: {}", reason)
            }
        }
    }
}

impl std::error::Error for HistoryError {}

/// Result type for history store operations.
pub type HistoryResult<T> = Result<T, HistoryError>;

/// The kind of operation a history entry records.
///
/// Serialized as the plain snake_case string so that history files remain
/// readable and forward-compatible: strings written by a newer version that
/// this build does not know are preserved through the `Other` variant and
/// round-trip unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum OperationKind {
    /// A standard organize run over a source directory.
    OrganizeFiles,
    /// An organize run with a caller-supplied extension list and target.
    CustomOrganize,
    /// A configuration change. Recorded but not mechanically reversible.
    ConfigChange,
    /// A rollback itself. Never reversible.
    Rollback,
    /// Any operation type this build does not recognize.
    Other(String),
}

impl OperationKind {
    /// Returns the wire name of this operation kind.
    pub fn as_str(&self) -> &str {
        match self {
            Self::OrganizeFiles => "organize_files",
            Self::CustomOrganize => "custom_organize",
            Self::ConfigChange => "config_change",
            Self::Rollback => "rollback",
            Self::Other(name) => name,
        }
    }
}

impl From<String> for OperationKind {
    fn from(value: String) -> Self {
        match value.as_str() {
            "organize_files" => Self::OrganizeFiles,
            "custom_organize" => Self::CustomOrganize,
            "config_change" => Self::ConfigChange,
            "rollback" => Self::Rollback,
            _ => Self::Other(value),
        }
    }
}

impl From<OperationKind> for String {
    fn from(value: OperationKind) -> Self {
        value.as_str().to_string()
    }
}

impl std::fmt::Display for OperationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One recorded file movement, stored as absolute path strings.
///
/// Both fields default to empty when absent so that entries written by older
/// versions (or hand-edited files) still load; reversal skips such pairs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FileMove {
    #[serde(default)]
    pub source: String,
    #[serde(default)]
    pub target: String,
}

impl FileMove {
    /// Creates a file move record from source and target paths.
    pub fn new(source: &Path, target: &Path) -> Self {
        Self {
            source: source.to_string_lossy().to_string(),
            target: target.to_string_lossy().to_string(),
        }
    }
}

/// A single entry in the operation history.
///
/// Entries are immutable once created; they leave the log only by being
/// rolled past during a successful rollback or by age-based cleanup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// Unique timeline identifier in the form `T<N>`. Never reused.
    pub timeline_id: String,
    /// Seconds since the Unix epoch, non-decreasing in creation order.
    pub timestamp: f64,
    /// What kind of operation this entry records.
    pub operation_type: OperationKind,
    /// Informational payload (paths, counts). Not interpreted on rollback.
    #[serde(default)]
    pub operation_data: Map<String, Value>,
    /// File movements in the order they were originally performed.
    #[serde(default)]
    pub files_moved: Vec<FileMove>,
    /// Configuration changes made by this operation, if any.
    #[serde(default)]
    pub config_changes: Map<String, Value>,
    /// Whether this operation can be mechanically undone.
    pub reversible: bool,
    /// Human-readable summary.
    pub description: String,
}

impl HistoryEntry {
    /// Formats the entry's timestamp as local `YYYY-MM-DD HH:MM:SS`.
    pub fn formatted_time(&self) -> String {
        let secs = self.timestamp.trunc() as i64;
        let nanos = (self.timestamp.fract() * 1_000_000_000.0) as u32;
        match Local.timestamp_opt(secs, nanos).single() {
            Some(dt) => dt.format("%Y-%m-%d %H:%M:%S").to_string(),
            None => format!("{}", self.timestamp),
        }
    }
}

/// A not-yet-recorded operation, passed to [`HistoryStore::record_operation`].
///
/// The store assigns the timeline ID and timestamp at record time.
#[derive(Debug, Clone)]
pub struct OperationDraft {
    pub kind: OperationKind,
    pub description: String,
    pub operation_data: Map<String, Value>,
    pub files_moved: Vec<FileMove>,
    pub config_changes: Map<String, Value>,
    pub reversible: bool,
}

impl OperationDraft {
    /// Creates a reversible draft with empty payloads.
    pub fn new(kind: OperationKind, description: impl Into<String>) -> Self {
        Self {
            kind,
            description: description.into(),
            operation_data: Map::new(),
            files_moved: Vec::new(),
            config_changes: Map::new(),
            reversible: true,
        }
    }

    /// Adds a key to the informational payload.
    pub fn with_data(mut self, key: &str, value: Value) -> Self {
        self.operation_data.insert(key.to_string(), value);
        self
    }

    /// Attaches the list of file movements performed by this operation.
    pub fn with_files_moved(mut self, files_moved: Vec<FileMove>) -> Self {
        self.files_moved = files_moved;
        self
    }

    /// Attaches configuration changes made by this operation.
    pub fn with_config_changes(mut self, config_changes: Map<String, Value>) -> Self {
        self.config_changes = config_changes;
        self
    }

    /// Marks the draft as not mechanically undoable.
    pub fn irreversible(mut self) -> Self {
        self.reversible = false;
        self
    }
}

/// Durable, ordered set of [`HistoryEntry`] values.
///
/// The store loads the full history on construction and rewrites the backing
/// JSON file on every mutation. Writes go through a temporary file in the
/// same directory followed by a rename, so a crash mid-write never leaves a
/// truncated history behind. There is no cross-process locking; concurrent
/// writers race with last-writer-wins semantics.
pub struct HistoryStore {
    path: PathBuf,
    entries: Vec<HistoryEntry>,
    next_timeline: u64,
}

impl HistoryStore {
    /// Loads the history store backed by the given file path.
    ///
    /// A missing file yields an empty store. A file that cannot be read or
    /// parsed also yields an empty store, with a warning on stderr — a
    /// damaged history should never prevent the tool from running.
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let entries = match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str::<Vec<HistoryEntry>>(&contents) {
                Ok(entries) => entries,
                Err(e) => {
                    eprintln!(
                        "Warning: could not parse history file {}: {}",
                        path.display(),
                        e
                    );
                    Vec::new()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(e) => {
                eprintln!(
                    "Warning: could not read history file {}: {}",
                    path.display(),
                    e
                );
                Vec::new()
            }
        };

        let next_timeline = Self::next_timeline_from(&entries);
        Self {
            path,
            entries,
            next_timeline,
        }
    }

    /// Returns the path of the backing history file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns all entries in insertion order.
    pub fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }

    /// Returns the number of recorded entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if no operations have been recorded.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Computes the next timeline counter from existing entries.
    ///
    /// Scans the numeric suffix after the `T` prefix of every entry; IDs
    /// that do not parse are ignored. An empty store starts at 1. Gaps left
    /// by rollback or cleanup are expected and never refilled.
    fn next_timeline_from(entries: &[HistoryEntry]) -> u64 {
        entries
            .iter()
            .filter_map(|e| parse_timeline_number(&e.timeline_id))
            .max()
            .map_or(1, |max| max + 1)
    }

    /// Allocates the next timeline ID. IDs are never reused, even after
    /// entries holding them are removed.
    fn allocate_timeline_id(&mut self) -> String {
        let id = format!("T{}", self.next_timeline);
        self.next_timeline += 1;
        id
    }

    /// Records a new operation and persists the store.
    ///
    /// Returns the newly allocated timeline ID. If persisting fails the
    /// error is returned, but the in-memory append is kept: the caller sees
    /// the durability gap, not a lost record.
    pub fn record_operation(&mut self, draft: OperationDraft) -> HistoryResult<String> {
        let timeline_id = self.allocate_timeline_id();
        let entry = HistoryEntry {
            timeline_id: timeline_id.clone(),
            timestamp: now_epoch(),
            operation_type: draft.kind,
            operation_data: draft.operation_data,
            files_moved: draft.files_moved,
            config_changes: draft.config_changes,
            reversible: draft.reversible,
            description: draft.description,
        };

        self.entries.push(entry);
        self.save()?;

        Ok(timeline_id)
    }

    /// Returns entries sorted most recent first, optionally truncated.
    ///
    /// The sort is stable, so entries with equal timestamps keep their
    /// insertion order across repeated calls.
    pub fn get_history(&self, limit: Option<usize>) -> Vec<&HistoryEntry> {
        let mut sorted: Vec<&HistoryEntry> = self.entries.iter().collect();
        sorted.sort_by(|a, b| {
            b.timestamp
                .partial_cmp(&a.timestamp)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        if let Some(limit) = limit {
            sorted.truncate(limit);
        }
        sorted
    }

    /// Returns the entry with the given timeline ID, if any.
    pub fn get_entry_by_timeline(&self, timeline_id: &str) -> Option<&HistoryEntry> {
        self.entries.iter().find(|e| e.timeline_id == timeline_id)
    }

    /// Returns the entry with the greatest timestamp, if any.
    pub fn get_last_entry(&self) -> Option<&HistoryEntry> {
        let mut last: Option<&HistoryEntry> = None;
        for entry in &self.entries {
            match last {
                Some(current) if entry.timestamp <= current.timestamp => {}
                _ => last = Some(entry),
            }
        }
        last
    }

    /// Removes entries older than the given number of days.
    ///
    /// Persists only when something was actually removed. Returns the number
    /// of removed entries.
    pub fn cleanup_old_history(&mut self, days: u64) -> HistoryResult<usize> {
        let cutoff = now_epoch() - days as f64 * 86_400.0;
        let before = self.entries.len();
        self.entries.retain(|e| e.timestamp >= cutoff);
        let removed = before - self.entries.len();

        if removed > 0 {
            self.save()?;
        }
        Ok(removed)
    }

    /// Removes every entry with a timestamp strictly greater than the given
    /// one. Used by the rollback engine after a successful suffix reversal.
    /// Does not persist; the caller decides when to save.
    pub(crate) fn remove_newer_than(&mut self, timestamp: f64) -> usize {
        let before = self.entries.len();
        self.entries.retain(|e| e.timestamp <= timestamp);
        before - self.entries.len()
    }

    /// Removes the entry with the given timeline ID. Does not persist.
    pub(crate) fn remove_by_timeline(&mut self, timeline_id: &str) -> bool {
        let before = self.entries.len();
        self.entries.retain(|e| e.timeline_id != timeline_id);
        self.entries.len() < before
    }

    /// Writes the full store to disk as a pretty-printed JSON snapshot.
    ///
    /// The snapshot is written to a sibling temporary file and renamed over
    /// the target, so readers never observe a partial write.
    pub fn save(&self) -> HistoryResult<()> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            fs::create_dir_all(parent).map_err(|e| HistoryError::WriteFailed {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        let json = serde_json::to_string_pretty(&self.entries).map_err(|e| {
            HistoryError::SerializeFailed {
                reason: e.to_string(),
            }
        })?;

        let tmp_path = self.path.with_extension("json.tmp");
        fs::write(&tmp_path, json).map_err(|e| HistoryError::WriteFailed {
            path: tmp_path.clone(),
            source: e,
        })?;
        fs::rename(&tmp_path, &self.path).map_err(|e| HistoryError::WriteFailed {
            path: self.path.clone(),
            source: e,
        })?;

        Ok(())
    }
}

/// Parses the numeric suffix of a `T<N>` timeline ID.
fn parse_timeline_number(timeline_id: &str) -> Option<u64> {
    timeline_id.strip_prefix('T')?.parse().ok()
}

/// Current wall-clock time as fractional seconds since the Unix epoch.
fn now_epoch() -> f64 {
    Utc::now().timestamp_micros() as f64 / 1_000_000.0
}
