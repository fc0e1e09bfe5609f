//! Point-in-time rollback of recorded operations.
//!
//! Given a target timeline ID, the engine verifies that every later entry is
//! reversible, replays their file moves backwards in reverse chronological
//! order, and retires the reversed entries from the log. Failures are
//! reported as structured errors naming the entries involved; nothing is
//! removed from the log on a failed rollback.

use crate::history::{
    FileMove, HistoryEntry, HistoryError, HistoryStore, OperationDraft, OperationKind,
};
use serde_json::Value;
use std::fs;
use std::path::Path;

/// One entry that could not be reversed, with the reason.
#[derive(Debug)]
pub struct ReversalFailure {
    pub timeline_id: String,
    pub reason: String,
}

/// Why a rollback request was refused or failed.
#[derive(Debug)]
pub enum RollbackError {
    /// No entry with the requested timeline ID exists.
    TimelineNotFound { timeline_id: String },
    /// The targeted (or last) operation is itself not reversible.
    NotReversible { timeline_id: String },
    /// A later non-reversible entry blocks rolling back past it.
    BlockedByLaterEntry { blocking_id: String },
    /// One or more entries failed to reverse. File moves already undone for
    /// other entries stay undone; the log is left untouched.
    ReversalFailed { failures: Vec<ReversalFailure> },
    /// The history is empty.
    NothingToRollback,
    /// The reversal succeeded but the trimmed log could not be persisted.
    SaveFailed(HistoryError),
}

impl std::fmt::Display for RollbackError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::TimelineNotFound { timeline_id } => {
                write!(f, "Timeline {} not found", timeline_id)
            }
            Self::NotReversible { timeline_id } => {
                write!(f, "Operation {} is not reversible", timeline_id)
            }
            Self::BlockedByLaterEntry { blocking_id } => {
                write!(
                    f,
                    "Cannot rollback past non-reversible operation {}",
                    blocking_id
                )
            }
            Self::ReversalFailed { failures } => {
                let details: Vec<String> = failures
                    .iter()
                    .map(|fail| format!("Failed to reverse {}: {}", fail.timeline_id, fail.reason))
                    .collect();
                write!(f, "Rollback failed: {}", details.join("; "))
            }
            Self::NothingToRollback => write!(f, "No operations to rollback"),
            Self::SaveFailed(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for RollbackError {}

/// Restores filesystem state to a recorded point in history.
pub struct RollbackEngine;

impl RollbackEngine {
    /// Checks whether a rollback to the given timeline would be allowed.
    ///
    /// Fails if the entry does not exist, if it is itself non-reversible, or
    /// if any entry recorded after it is non-reversible. The returned error
    /// names the blocking entry so the user knows exactly what is in the way.
    pub fn can_rollback_to(
        store: &HistoryStore,
        timeline_id: &str,
    ) -> Result<(), RollbackError> {
        let target = store.get_entry_by_timeline(timeline_id).ok_or_else(|| {
            RollbackError::TimelineNotFound {
                timeline_id: timeline_id.to_string(),
            }
        })?;

        if !target.reversible {
            return Err(RollbackError::NotReversible {
                timeline_id: timeline_id.to_string(),
            });
        }

        for later in store
            .entries()
            .iter()
            .filter(|e| e.timestamp > target.timestamp)
        {
            if !later.reversible {
                return Err(RollbackError::BlockedByLaterEntry {
                    blocking_id: later.timeline_id.clone(),
                });
            }
        }

        Ok(())
    }

    /// Rolls history back to the given timeline.
    ///
    /// Every entry recorded after the target is reversed, most recent first.
    /// All entries are attempted even if an earlier one fails, so the error
    /// lists every entry that could not be reversed. Only when every
    /// reversal succeeds is the suffix removed from the log, after which a
    /// non-reversible `rollback` record documenting the operation is
    /// appended.
    ///
    /// On failure nothing is removed from the log. Entries already reversed
    /// before the failure keep their restored file positions; no
    /// compensating re-reversal is attempted.
    pub fn rollback_to_timeline(
        store: &mut HistoryStore,
        timeline_id: &str,
    ) -> Result<String, RollbackError> {
        Self::can_rollback_to(store, timeline_id)?;

        // can_rollback_to guarantees the entry exists.
        let target_timestamp = match store.get_entry_by_timeline(timeline_id) {
            Some(entry) => entry.timestamp,
            None => {
                return Err(RollbackError::TimelineNotFound {
                    timeline_id: timeline_id.to_string(),
                });
            }
        };

        let mut to_reverse: Vec<HistoryEntry> = store
            .entries()
            .iter()
            .filter(|e| e.timestamp > target_timestamp)
            .cloned()
            .collect();
        to_reverse.sort_by(|a, b| {
            b.timestamp
                .partial_cmp(&a.timestamp)
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        let mut failures = Vec::new();
        for entry in &to_reverse {
            if let Err(reason) = Self::reverse_operation(entry) {
                failures.push(ReversalFailure {
                    timeline_id: entry.timeline_id.clone(),
                    reason,
                });
            }
        }
        if !failures.is_empty() {
            return Err(RollbackError::ReversalFailed { failures });
        }

        store.remove_newer_than(target_timestamp);
        store.save().map_err(RollbackError::SaveFailed)?;

        store
            .record_operation(
                OperationDraft::new(
                    OperationKind::Rollback,
                    format!("Rolled back to timeline {}", timeline_id),
                )
                .with_data("target_timeline", Value::String(timeline_id.to_string()))
                .irreversible(),
            )
            .map_err(RollbackError::SaveFailed)?;

        Ok(format!(
            "Successfully rolled back to timeline {}",
            timeline_id
        ))
    }

    /// Rolls back only the most recent operation.
    ///
    /// Unlike [`rollback_to_timeline`](Self::rollback_to_timeline), this
    /// removes just that one entry and appends no `rollback` audit record.
    pub fn rollback_last_operation(store: &mut HistoryStore) -> Result<String, RollbackError> {
        let last = store
            .get_last_entry()
            .ok_or(RollbackError::NothingToRollback)?;

        if !last.reversible {
            return Err(RollbackError::NotReversible {
                timeline_id: last.timeline_id.clone(),
            });
        }

        let last = last.clone();
        if let Err(reason) = Self::reverse_operation(&last) {
            return Err(RollbackError::ReversalFailed {
                failures: vec![ReversalFailure {
                    timeline_id: last.timeline_id.clone(),
                    reason,
                }],
            });
        }

        store.remove_by_timeline(&last.timeline_id);
        store.save().map_err(RollbackError::SaveFailed)?;

        Ok(format!(
            "Successfully rolled back operation {}",
            last.timeline_id
        ))
    }

    /// Reverses the effects of one entry, dispatching on its operation kind.
    fn reverse_operation(entry: &HistoryEntry) -> Result<(), String> {
        match &entry.operation_type {
            OperationKind::OrganizeFiles | OperationKind::CustomOrganize => {
                Self::reverse_file_moves(&entry.files_moved)
            }
            // Config changes are recorded but cannot be mechanically
            // reversed; failing loudly here is deliberate.
            OperationKind::ConfigChange => {
                Err("config change reversal requires manual intervention".to_string())
            }
            OperationKind::Rollback => Err("rollback operations cannot be reversed".to_string()),
            OperationKind::Other(name) => Err(format!("unknown operation type: {}", name)),
        }
    }

    /// Moves files back to their original locations, last move first.
    ///
    /// Pairs with a missing path field are skipped, as are pairs whose
    /// target no longer exists on disk (the user may have deleted or moved
    /// the file since). Any actual filesystem error aborts with a reason.
    fn reverse_file_moves(files_moved: &[FileMove]) -> Result<(), String> {
        for file_move in files_moved.iter().rev() {
            if file_move.source.is_empty() || file_move.target.is_empty() {
                continue;
            }

            let target = Path::new(&file_move.target);
            if !target.exists() {
                continue;
            }

            let source = Path::new(&file_move.source);
            if let Some(parent) = source.parent()
                && !parent.as_os_str().is_empty()
                && !parent.exists()
            {
                fs::create_dir_all(parent).map_err(|e| {
                    format!("could not create directory {}: {}", parent.display(), e)
                })?;
            }

            fs::rename(target, source).map_err(|e| {
                format!(
                    "could not move {} back to {}: {}",
                    target.display(),
                    source.display(),
                    e
                )
            })?;
        }

        Ok(())
    }
}
