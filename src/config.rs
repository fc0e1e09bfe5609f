//! TOML configuration for sortback.
//!
//! Configuration covers four concerns: where files come from and go
//! (`[paths]`), which file types are organized (`[types]`), which files are
//! skipped (`[filters]`), and how history behaves (`[history]`).
//!
//! # Configuration File Format
//!
//! ```toml
//! [paths]
//! source_dir = "/home/user/Downloads"
//!
//! [paths.targets]
//! pdf = "/home/user/Documents/PDFs"
//! image = "/home/user/Pictures"
//!
//! [types]
//! archive = true    # extended type, off by default
//! audio = false     # basic type, on by default
//!
//! [filters]
//! enable_hidden_files = false
//!
//! [filters.exclude]
//! filenames = [".DS_Store", "Thumbs.db"]
//! patterns = ["*.part"]
//! extensions = ["tmp"]
//! regex = []
//!
//! [filters.include]
//! patterns = []
//!
//! [history]
//! enabled = true
//! auto_cleanup_days = 30
//! ```

use crate::file_type::FileType;
use glob::Pattern;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

/// Errors that can occur while loading or compiling configuration.
#[derive(Debug, Clone)]
pub enum ConfigError {
    /// Configuration file not found at the specified path.
    ConfigNotFound(PathBuf),
    /// Invalid TOML syntax or structure.
    ConfigInvalid(String),
    /// Invalid glob pattern in the filter rules.
    InvalidGlobPattern(String),
    /// Invalid regex pattern in the filter rules.
    InvalidRegexPattern { pattern: String, reason: String },
    /// IO error while reading configuration.
    IoError(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::ConfigNotFound(path) => {
                write!(f, "Configuration file not found: {}", path.display())
            }
            ConfigError::ConfigInvalid(msg) => write!(f, "Invalid configuration: {}", msg),
            ConfigError::InvalidGlobPattern(pattern) => {
                write!(f, "Invalid glob pattern '{}'", pattern)
            }
            ConfigError::InvalidRegexPattern { pattern, reason } => {
                write!(f, "Invalid regex pattern '{}': {}", pattern, reason)
            }
            ConfigError::IoError(msg) => write!(f, "IO error reading configuration: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub paths: PathsConfig,
    /// Per-type enable overrides, keyed by type name (`"pdf"`, `"archive"`).
    #[serde(default)]
    pub types: HashMap<String, bool>,
    #[serde(default)]
    pub filters: FilterRules,
    #[serde(default)]
    pub history: HistorySettings,
}

/// Source and target directory configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PathsConfig {
    /// Directory organized when none is given on the command line.
    pub source_dir: Option<PathBuf>,
    /// Target directory per file type, keyed by type name. Types without an
    /// entry fall back to built-in defaults under the home directory.
    #[serde(default)]
    pub targets: HashMap<String, PathBuf>,
}

/// History persistence settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistorySettings {
    /// When false, operations are performed but not recorded and the
    /// history/undo commands are unavailable.
    #[serde(default = "default_history_enabled")]
    pub enabled: bool,
    /// Override for the history file location.
    pub file: Option<PathBuf>,
    /// Entries older than this many days are removed by `sortback cleanup`.
    #[serde(default = "default_cleanup_days")]
    pub auto_cleanup_days: u64,
}

fn default_history_enabled() -> bool {
    true
}

fn default_cleanup_days() -> u64 {
    30
}

impl Default for HistorySettings {
    fn default() -> Self {
        Self {
            enabled: true,
            file: None,
            auto_cleanup_days: default_cleanup_days(),
        }
    }
}

/// File filtering rules.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilterRules {
    /// Whether hidden files (starting with ".") are organized.
    #[serde(default)]
    pub enable_hidden_files: bool,
    #[serde(default)]
    pub exclude: ExcludeRules,
    #[serde(default)]
    pub include: IncludeRules,
}

impl Default for FilterRules {
    fn default() -> Self {
        Self {
            enable_hidden_files: false,
            exclude: ExcludeRules::default(),
            include: IncludeRules::default(),
        }
    }
}

/// Rules for excluding files from organization.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExcludeRules {
    /// Exact filenames to skip.
    #[serde(default)]
    pub filenames: Vec<String>,
    /// Glob patterns to skip.
    #[serde(default)]
    pub patterns: Vec<String>,
    /// File extensions to skip (matched case-insensitively).
    #[serde(default)]
    pub extensions: Vec<String>,
    /// Regex patterns to skip, matched against the filename.
    #[serde(default)]
    pub regex: Vec<String>,
}

/// Whitelist rules that override exclusion.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IncludeRules {
    #[serde(default)]
    pub patterns: Vec<String>,
}

impl Config {
    /// Loads configuration with fallback to defaults.
    ///
    /// Lookup order: the explicit path if given, then `.sortbackrc.toml` in
    /// the current directory, then `~/.config/sortback/config.toml`, then
    /// built-in defaults.
    pub fn load(config_path: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = config_path {
            return Self::load_from_file(path);
        }

        let local = PathBuf::from(".sortbackrc.toml");
        if local.exists() {
            return Self::load_from_file(&local);
        }

        if let Ok(home) = std::env::var("HOME") {
            let home_config = PathBuf::from(home)
                .join(".config")
                .join("sortback")
                .join("config.toml");
            if home_config.exists() {
                return Self::load_from_file(&home_config);
            }
        }

        Ok(Self::default())
    }

    fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::ConfigNotFound(path.to_path_buf()));
        }
        let content = fs::read_to_string(path).map_err(|e| ConfigError::IoError(e.to_string()))?;
        toml::from_str(&content).map_err(|e| ConfigError::ConfigInvalid(e.to_string()))
    }

    /// Whether organizing handles this file type.
    ///
    /// Basic types default to enabled, extended types to disabled; either
    /// can be overridden in the `[types]` table.
    pub fn type_enabled(&self, file_type: FileType) -> bool {
        self.types
            .get(file_type.key())
            .copied()
            .unwrap_or_else(|| file_type.is_basic())
    }

    /// Target directory for a file type.
    ///
    /// Falls back to a conventional directory under the user's home when the
    /// configuration has no `[paths.targets]` entry for the type.
    pub fn target_for(&self, file_type: FileType) -> PathBuf {
        if let Some(target) = self.paths.targets.get(file_type.key()) {
            return target.clone();
        }

        let home = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".to_string()));
        match file_type {
            FileType::Pdf => home.join("Documents").join("PDFs"),
            FileType::Image => home.join("Pictures"),
            FileType::Document => home.join("Documents"),
            FileType::Video => home.join("Videos"),
            FileType::Audio => home.join("Music"),
            FileType::Installer => home.join("Downloads").join("Installers"),
            FileType::Archive => home.join("Downloads").join("Archives"),
            FileType::Code => home.join("Documents").join("Code"),
            FileType::Font => home.join("Downloads").join("Fonts"),
            FileType::Ebook => home.join("Documents").join("eBooks"),
        }
    }

    /// Path of the history file, honoring the `[history] file` override.
    pub fn history_file_path(&self) -> PathBuf {
        if let Some(path) = &self.history.file {
            return path.clone();
        }
        let home = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".to_string()));
        home.join(".config").join("sortback").join("history.json")
    }

    /// Compiles the filter rules into matchers ready for use.
    pub fn compile_filters(&self) -> Result<CompiledFilters, ConfigError> {
        CompiledFilters::new(&self.filters)
    }
}

/// Pre-compiled filter rules.
///
/// Glob and regex patterns are parsed once here so that per-file matching
/// never reparses them.
pub struct CompiledFilters {
    enable_hidden_files: bool,
    exclude_filenames: HashSet<String>,
    exclude_extensions: HashSet<String>,
    exclude_patterns: Vec<Pattern>,
    exclude_regexes: Vec<Regex>,
    include_patterns: Vec<Pattern>,
}

impl CompiledFilters {
    fn new(rules: &FilterRules) -> Result<Self, ConfigError> {
        let compile_globs = |patterns: &[String]| -> Result<Vec<Pattern>, ConfigError> {
            patterns
                .iter()
                .map(|p| Pattern::new(p).map_err(|_| ConfigError::InvalidGlobPattern(p.clone())))
                .collect()
        };

        let exclude_regexes = rules
            .exclude
            .regex
            .iter()
            .map(|p| {
                Regex::new(p).map_err(|e| ConfigError::InvalidRegexPattern {
                    pattern: p.clone(),
                    reason: e.to_string(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            enable_hidden_files: rules.enable_hidden_files,
            exclude_filenames: rules.exclude.filenames.iter().cloned().collect(),
            exclude_extensions: rules
                .exclude
                .extensions
                .iter()
                .map(|ext| ext.to_lowercase())
                .collect(),
            exclude_patterns: compile_globs(&rules.exclude.patterns)?,
            exclude_regexes,
            include_patterns: compile_globs(&rules.include.patterns)?,
        })
    }

    /// Whether a file passes the filter rules.
    ///
    /// Include patterns win over everything; after that, hidden files,
    /// exact filenames, extensions, glob patterns, and regex patterns each
    /// exclude in turn.
    pub fn should_include(&self, file_path: &Path) -> bool {
        let file_name = file_path
            .file_name()
            .map(|n| n.to_string_lossy())
            .unwrap_or_default();

        if self
            .include_patterns
            .iter()
            .any(|p| p.matches_path(file_path))
        {
            return true;
        }

        if !self.enable_hidden_files && file_name.starts_with('.') {
            return false;
        }

        if self.exclude_filenames.contains(file_name.as_ref()) {
            return false;
        }

        if let Some(ext) = file_path.extension() {
            let ext = ext.to_string_lossy().to_lowercase();
            if self.exclude_extensions.contains(&ext) {
                return false;
            }
        }

        if self
            .exclude_patterns
            .iter()
            .any(|p| p.matches_path(file_path))
        {
            return false;
        }

        !self.exclude_regexes.iter().any(|r| r.is_match(&file_name))
    }
}
