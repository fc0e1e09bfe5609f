//! sortback - organize files by extension, with history and rollback
//!
//! This library organizes files from a source directory into per-type target
//! directories, records every run in a persistent operation history keyed by
//! timeline IDs, and can roll the filesystem back to any recorded point.

pub mod cli;
pub mod config;
pub mod file_type;
pub mod history;
pub mod organizer;
pub mod output;
pub mod rollback;

pub use config::{Config, ConfigError};
pub use file_type::{FileType, TypeMapper};
pub use history::{FileMove, HistoryEntry, HistoryStore, OperationDraft, OperationKind};
pub use organizer::{OrganizeReport, Organizer};
pub use rollback::{RollbackEngine, RollbackError};

pub use cli::{Cli, run};
