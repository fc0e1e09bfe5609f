//! File organization engine.
//!
//! Scans a source directory, classifies files by extension, and moves them
//! into the configured per-type target directories. Every successful run is
//! recorded as one operation in the history store so it can be rolled back.

use crate::config::{CompiledFilters, Config, ConfigError};
use crate::file_type::{FileType, TypeMapper};
use crate::history::{FileMove, HistoryError, HistoryStore, OperationDraft, OperationKind};
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};

/// Errors that can occur while organizing a directory.
#[derive(Debug)]
pub enum OrganizeError {
    /// The source directory does not exist or is not a directory.
    InvalidSourceDir { path: PathBuf },
    /// Failed to list the source directory.
    ReadDirFailed {
        path: PathBuf,
        source: std::io::Error,
    },
    /// The filter rules in the configuration did not compile.
    Filter(ConfigError),
    /// The operation completed but recording it to history failed.
    History(HistoryError),
}

impl std::fmt::Display for OrganizeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidSourceDir { path } => {
                write!(f, "Source directory does not exist: {}", path.display())
            }
            Self::ReadDirFailed { path, source } => {
                write!(f, "Failed to read directory {}: {}", path.display(), source)
            }
            Self::Filter(e) => write!(f, "{}", e),
            Self::History(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for OrganizeError {}

/// Result type for organizer operations.
pub type OrganizeResult<T> = Result<T, OrganizeError>;

/// A move the organizer intends to perform.
#[derive(Debug, Clone)]
pub struct PlannedMove {
    /// Current location of the file.
    pub source: PathBuf,
    /// Directory the file will move into. The final filename may gain a
    /// `_N` suffix if it collides with an existing file.
    pub target_dir: PathBuf,
    /// The classification that chose the target directory. `None` for
    /// custom runs, which route by extension instead.
    pub file_type: Option<FileType>,
}

/// What an organize run did.
#[derive(Debug)]
pub struct OrganizeReport {
    /// Successful moves, in the order they were performed.
    pub moved: Vec<FileMove>,
    /// Files that could not be moved, with the reason. These do not abort
    /// the run and are not recorded in history.
    pub failed: Vec<(PathBuf, String)>,
    /// Timeline ID of the recorded operation. `None` when nothing moved or
    /// history recording was disabled.
    pub timeline_id: Option<String>,
}

/// Moves files into per-type target directories.
pub struct Organizer<'a> {
    config: &'a Config,
    mapper: TypeMapper,
    filters: CompiledFilters,
}

impl<'a> Organizer<'a> {
    /// Creates an organizer for the given configuration.
    pub fn new(config: &'a Config) -> OrganizeResult<Self> {
        Ok(Self {
            config,
            mapper: TypeMapper::new(),
            filters: config.compile_filters().map_err(OrganizeError::Filter)?,
        })
    }

    /// Determines which files in the source directory would move where.
    ///
    /// Only regular files directly in the directory are considered. Files
    /// rejected by the filter rules, files with no recognized type, and
    /// types that are not enabled (or not in `allowed`, when given) are
    /// skipped. Entries are returned in filename order so runs are
    /// deterministic.
    pub fn plan(
        &self,
        source_dir: &Path,
        allowed: Option<&[FileType]>,
    ) -> OrganizeResult<Vec<PlannedMove>> {
        if !source_dir.is_dir() {
            return Err(OrganizeError::InvalidSourceDir {
                path: source_dir.to_path_buf(),
            });
        }

        let mut planned = Vec::new();
        for path in self.list_files(source_dir)? {
            if !self.filters.should_include(&path) {
                continue;
            }
            let Some(file_type) = self.mapper.classify(&path) else {
                continue;
            };
            let wanted = match allowed {
                Some(types) => types.contains(&file_type),
                None => self.config.type_enabled(file_type),
            };
            if !wanted {
                continue;
            }

            planned.push(PlannedMove {
                source: path,
                target_dir: self.config.target_for(file_type),
                file_type: Some(file_type),
            });
        }

        Ok(planned)
    }

    /// Organizes the source directory and records the run in history.
    ///
    /// Individual move failures are collected in the report and skipped;
    /// the run continues and only the successful moves are recorded. Pass
    /// `None` for `store` to organize without recording (history disabled).
    pub fn organize(
        &self,
        source_dir: &Path,
        allowed: Option<&[FileType]>,
        store: Option<&mut HistoryStore>,
    ) -> OrganizeResult<OrganizeReport> {
        self.organize_with(source_dir, allowed, store, |_| {})
    }

    /// Like [`organize`](Self::organize), invoking `on_move` after each
    /// attempted move so callers can drive progress reporting.
    pub fn organize_with(
        &self,
        source_dir: &Path,
        allowed: Option<&[FileType]>,
        store: Option<&mut HistoryStore>,
        on_move: impl FnMut(&PlannedMove),
    ) -> OrganizeResult<OrganizeReport> {
        let plan = self.plan(source_dir, allowed)?;
        let (moved, failed) = execute_moves(&plan, on_move);

        let description = format!(
            "Organized {} files from {}",
            moved.len(),
            source_dir.display()
        );
        let timeline_id = self.record(
            store,
            OperationKind::OrganizeFiles,
            description,
            source_dir,
            &moved,
        )?;

        Ok(OrganizeReport {
            moved,
            failed,
            timeline_id,
        })
    }

    /// Organizes only files with the given extensions into one target
    /// directory, recording the run as a `custom_organize` operation.
    ///
    /// Extensions are matched case-insensitively, with or without a leading
    /// dot. Filter rules still apply.
    pub fn organize_custom(
        &self,
        source_dir: &Path,
        extensions: &[String],
        target_dir: &Path,
        store: Option<&mut HistoryStore>,
    ) -> OrganizeResult<OrganizeReport> {
        if !source_dir.is_dir() {
            return Err(OrganizeError::InvalidSourceDir {
                path: source_dir.to_path_buf(),
            });
        }

        let wanted: Vec<String> = extensions
            .iter()
            .map(|ext| ext.trim_start_matches('.').to_lowercase())
            .collect();

        let mut plan = Vec::new();
        for path in self.list_files(source_dir)? {
            if !self.filters.should_include(&path) {
                continue;
            }
            let Some(ext) = path.extension().map(|e| e.to_string_lossy().to_lowercase()) else {
                continue;
            };
            if !wanted.contains(&ext) {
                continue;
            }
            plan.push(PlannedMove {
                source: path,
                target_dir: target_dir.to_path_buf(),
                file_type: None,
            });
        }

        let (moved, failed) = execute_moves(&plan, |_| {});

        let description = format!(
            "Organized {} files matching [{}] into {}",
            moved.len(),
            wanted.join(", "),
            target_dir.display()
        );
        let timeline_id = self.record(
            store,
            OperationKind::CustomOrganize,
            description,
            source_dir,
            &moved,
        )?;

        Ok(OrganizeReport {
            moved,
            failed,
            timeline_id,
        })
    }

    fn list_files(&self, source_dir: &Path) -> OrganizeResult<Vec<PathBuf>> {
        let entries = fs::read_dir(source_dir).map_err(|e| OrganizeError::ReadDirFailed {
            path: source_dir.to_path_buf(),
            source: e,
        })?;

        let mut files: Vec<PathBuf> = entries
            .flatten()
            .filter(|entry| entry.file_type().map(|t| t.is_file()).unwrap_or(false))
            .map(|entry| entry.path())
            .collect();
        files.sort();
        Ok(files)
    }

    fn record(
        &self,
        store: Option<&mut HistoryStore>,
        kind: OperationKind,
        description: String,
        source_dir: &Path,
        moved: &[FileMove],
    ) -> OrganizeResult<Option<String>> {
        let Some(store) = store else {
            return Ok(None);
        };
        if moved.is_empty() {
            return Ok(None);
        }

        let draft = OperationDraft::new(kind, description)
            .with_data(
                "source_dir",
                Value::String(source_dir.to_string_lossy().to_string()),
            )
            .with_data("moved", Value::from(moved.len()))
            .with_files_moved(moved.to_vec());

        store
            .record_operation(draft)
            .map(Some)
            .map_err(OrganizeError::History)
    }
}

/// Performs the planned moves, collecting successes and failures.
fn execute_moves(
    plan: &[PlannedMove],
    mut on_move: impl FnMut(&PlannedMove),
) -> (Vec<FileMove>, Vec<(PathBuf, String)>) {
    let mut moved = Vec::new();
    let mut failed = Vec::new();

    for planned in plan {
        match move_into(&planned.source, &planned.target_dir) {
            Ok(target) => moved.push(FileMove::new(&planned.source, &target)),
            Err(reason) => failed.push((planned.source.clone(), reason)),
        }
        on_move(planned);
    }

    (moved, failed)
}

/// Moves a file into a directory, creating it as needed and resolving
/// filename conflicts by appending `_1`, `_2`, ... before the extension.
fn move_into(source: &Path, target_dir: &Path) -> Result<PathBuf, String> {
    fs::create_dir_all(target_dir)
        .map_err(|e| format!("could not create {}: {}", target_dir.display(), e))?;

    let file_name = source
        .file_name()
        .ok_or_else(|| "file has no name component".to_string())?;

    let mut target = target_dir.join(file_name);
    let mut counter = 1;
    while target.exists() {
        let stem = source
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| "file".to_string());
        let candidate = match source.extension() {
            Some(ext) => format!("{}_{}.{}", stem, counter, ext.to_string_lossy()),
            None => format!("{}_{}", stem, counter),
        };
        target = target_dir.join(candidate);
        counter += 1;
    }

    // rename fails across filesystems; fall back to copy + remove.
    if fs::rename(source, &target).is_err() {
        fs::copy(source, &target).map_err(|e| {
            format!(
                "could not move {} to {}: {}",
                source.display(),
                target.display(),
                e
            )
        })?;
        fs::remove_file(source)
            .map_err(|e| format!("could not remove {}: {}", source.display(), e))?;
    }

    Ok(target)
}
