//! Command-line interface for sortback.
//!
//! Parses the command line with clap and dispatches to the organizer,
//! history store, and rollback engine. The history store is constructed
//! once per invocation and passed down to whichever handler needs it.

use crate::config::Config;
use crate::file_type::FileType;
use crate::history::HistoryStore;
use crate::organizer::Organizer;
use crate::output::{self, OutputFormatter};
use crate::rollback::RollbackEngine;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Organize files by extension, with history and rollback.
#[derive(Parser)]
#[command(name = "sortback", version, about)]
pub struct Cli {
    /// Path to a configuration file.
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Organize a directory into the configured target directories.
    Organize {
        /// Directory to organize. Defaults to the configured source_dir.
        dir: Option<PathBuf>,
        /// Only organize these file types (e.g. "pdf,image").
        #[arg(long, value_delimiter = ',')]
        types: Vec<String>,
        /// Show what would move without touching anything.
        #[arg(long)]
        dry_run: bool,
    },
    /// Move files with specific extensions into one target directory.
    Custom {
        /// Directory to organize.
        dir: PathBuf,
        /// Extensions to match (e.g. "log,txt").
        #[arg(long, value_delimiter = ',', required = true)]
        extensions: Vec<String>,
        /// Directory the matching files move into.
        #[arg(long)]
        target: PathBuf,
    },
    /// Show the operation history.
    History {
        /// Number of recent entries to show.
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },
    /// Roll back the last operation, or everything after a timeline point.
    Undo {
        /// Timeline ID (e.g. "T3") to roll back to. Omit to undo only the
        /// most recent operation.
        timeline_id: Option<String>,
    },
    /// Remove history entries older than the retention window.
    Cleanup {
        /// Retention in days. Defaults to the configured auto_cleanup_days.
        #[arg(long)]
        days: Option<u64>,
    },
}

/// Runs the parsed command. Returns an error message for `main` to print.
pub fn run(cli: Cli) -> Result<(), String> {
    let config = Config::load(cli.config.as_deref()).map_err(|e| e.to_string())?;

    match cli.command {
        Command::Organize {
            dir,
            types,
            dry_run,
        } => handle_organize(&config, dir, &types, dry_run),
        Command::Custom {
            dir,
            extensions,
            target,
        } => handle_custom(&config, &dir, &extensions, &target),
        Command::History { limit } => handle_history(&config, limit),
        Command::Undo { timeline_id } => handle_undo(&config, timeline_id.as_deref()),
        Command::Cleanup { days } => handle_cleanup(&config, days),
    }
}

fn open_store(config: &Config) -> Option<HistoryStore> {
    config
        .history
        .enabled
        .then(|| HistoryStore::load(config.history_file_path()))
}

fn parse_types(types: &[String]) -> Result<Option<Vec<FileType>>, String> {
    if types.is_empty() {
        return Ok(None);
    }
    types
        .iter()
        .map(|t| FileType::from_key(t).ok_or_else(|| format!("Unknown file type: {}", t)))
        .collect::<Result<Vec<_>, _>>()
        .map(Some)
}

fn handle_organize(
    config: &Config,
    dir: Option<PathBuf>,
    types: &[String],
    dry_run: bool,
) -> Result<(), String> {
    let source_dir = dir
        .or_else(|| config.paths.source_dir.clone())
        .ok_or_else(|| "No directory given and no source_dir configured".to_string())?;
    let allowed = parse_types(types)?;

    let organizer = Organizer::new(config).map_err(|e| e.to_string())?;

    if dry_run {
        let plan = organizer
            .plan(&source_dir, allowed.as_deref())
            .map_err(|e| e.to_string())?;
        if plan.is_empty() {
            OutputFormatter::plain("No files to organize.");
            return Ok(());
        }
        OutputFormatter::info(&format!("DRY RUN: {}", source_dir.display()));
        for planned in &plan {
            let type_label = planned
                .file_type
                .map(|t| format!(" [{}]", t))
                .unwrap_or_default();
            OutputFormatter::plain(&format!(
                " - {}{} → {}/",
                planned.source.display(),
                type_label,
                planned.target_dir.display()
            ));
        }
        OutputFormatter::success(&format!(
            "Dry run complete. {} files would move; nothing was modified.",
            plan.len()
        ));
        return Ok(());
    }

    OutputFormatter::info(&format!("Organizing: {}", source_dir.display()));

    let plan_len = organizer
        .plan(&source_dir, allowed.as_deref())
        .map_err(|e| e.to_string())?
        .len();
    let progress = OutputFormatter::create_progress_bar(plan_len as u64);

    let mut store = open_store(config);
    let report = organizer
        .organize_with(&source_dir, allowed.as_deref(), store.as_mut(), |planned| {
            progress.set_message(
                planned
                    .source
                    .file_name()
                    .map(|n| n.to_string_lossy().to_string())
                    .unwrap_or_default(),
            );
            progress.inc(1);
        })
        .map_err(|e| e.to_string())?;
    progress.finish_and_clear();

    OutputFormatter::success(&format!("Moved {} files", report.moved.len()));
    for (path, reason) in &report.failed {
        OutputFormatter::error(&format!("{}: {}", path.display(), reason));
    }

    match &report.timeline_id {
        Some(id) => OutputFormatter::plain(&format!(
            "Recorded as {}. Use 'sortback undo' to revert.",
            id
        )),
        None if store.is_none() && !report.moved.is_empty() => {
            OutputFormatter::warning("History is disabled; this run cannot be undone.")
        }
        None => {}
    }

    Ok(())
}

fn handle_custom(
    config: &Config,
    dir: &PathBuf,
    extensions: &[String],
    target: &PathBuf,
) -> Result<(), String> {
    let organizer = Organizer::new(config).map_err(|e| e.to_string())?;
    let mut store = open_store(config);

    let report = organizer
        .organize_custom(dir, extensions, target, store.as_mut())
        .map_err(|e| e.to_string())?;

    OutputFormatter::success(&format!(
        "Moved {} files into {}",
        report.moved.len(),
        target.display()
    ));
    for (path, reason) in &report.failed {
        OutputFormatter::error(&format!("{}: {}", path.display(), reason));
    }
    if let Some(id) = &report.timeline_id {
        OutputFormatter::plain(&format!("Recorded as {}.", id));
    }

    Ok(())
}

fn handle_history(config: &Config, limit: usize) -> Result<(), String> {
    let Some(store) = open_store(config) else {
        return Err("History is disabled in configuration".to_string());
    };

    let entries = store.get_history(Some(limit));
    OutputFormatter::plain(&output::format_history(&entries));
    Ok(())
}

fn handle_undo(config: &Config, timeline_id: Option<&str>) -> Result<(), String> {
    let Some(mut store) = open_store(config) else {
        return Err("History is disabled in configuration".to_string());
    };

    let result = match timeline_id {
        Some(id) => RollbackEngine::rollback_to_timeline(&mut store, id),
        None => RollbackEngine::rollback_last_operation(&mut store),
    };

    match result {
        Ok(message) => {
            OutputFormatter::success(&message);
            Ok(())
        }
        Err(e) => Err(e.to_string()),
    }
}

fn handle_cleanup(config: &Config, days: Option<u64>) -> Result<(), String> {
    let Some(mut store) = open_store(config) else {
        return Err("History is disabled in configuration".to_string());
    };

    let days = days.unwrap_or(config.history.auto_cleanup_days);
    let removed = store
        .cleanup_old_history(days)
        .map_err(|e| e.to_string())?;
    OutputFormatter::success(&format!(
        "Removed {} history entries older than {} days",
        removed, days
    ));
    Ok(())
}
