use config::{Config as ConfigBuilder, ConfigError, File};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf, MAIN_SEPARATOR};
use std::str::FromStr;

use crate::errors::{SearchError, SearchResult};

/// How files that look binary are treated by the plain-text extractor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BinaryFilesMode {
    /// Search the file but only report "binary file matches"
    #[default]
    Binary,
    /// Search the file as if it were text
    Text,
    /// Skip binary files entirely
    WithoutMatch,
}

impl FromStr for BinaryFilesMode {
    type Err = SearchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "binary" => Ok(Self::Binary),
            "text" => Ok(Self::Text),
            "without-match" | "without_match" => Ok(Self::WithoutMatch),
            other => Err(SearchError::config_error(format!(
                "unknown binary-files mode '{}' (expected binary, text or without-match)",
                other
            ))),
        }
    }
}

impl fmt::Display for BinaryFilesMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Binary => "binary",
            Self::Text => "text",
            Self::WithoutMatch => "without-match",
        };
        f.write_str(name)
    }
}

/// Configuration for one search run.
///
/// # Configuration Locations
///
/// Values can be loaded from YAML files, later sources overriding earlier ones:
/// 1. Global `$CONFIG_DIR/polygrep/config.yaml`
/// 2. Local `.polygrep.yaml` in the current directory
/// 3. A file passed via `--config`
///
/// Command-line values are then applied on top with [`SearchConfig::merge_with_cli`].
///
/// ```yaml
/// search_strings: ["invoice"]
/// root_paths: ["./documents"]
/// file_types: ["*.odp", "*.txt"]
/// skip_patterns: ["*.log"]
/// case_sensitive: false
/// fixed: true
/// respect_gitignore: true
/// binary_files: without-match
/// thread_count: 4
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Strings to search for, in order
    #[serde(default)]
    pub search_strings: Vec<String>,

    /// Glob patterns such as `*.pdf`; empty means auto-detect from the roots
    #[serde(default)]
    pub file_types: Vec<String>,

    /// Directories to search
    #[serde(default = "default_root_paths")]
    pub root_paths: Vec<PathBuf>,

    /// Extension globs excluded from auto-detection (e.g. `*.log`)
    #[serde(default)]
    pub skip_patterns: Vec<String>,

    /// Log every (type, root) pair as it is searched
    #[serde(default)]
    pub verbose: bool,

    /// Keep per-file errors quiet (they are still recorded in the output)
    #[serde(default)]
    pub ignore_errors: bool,

    #[serde(default)]
    pub binary_files: BinaryFilesMode,

    #[serde(default)]
    pub case_sensitive: bool,

    /// Treat search strings as literals instead of patterns
    #[serde(default)]
    pub fixed: bool,

    /// Honor the `.gitignore` of the first root that has one
    #[serde(default)]
    pub respect_gitignore: bool,

    /// Report each matching file once per search string, without context
    #[serde(default)]
    pub list_only: bool,

    /// Worker threads per extractor; defaults to the number of CPU cores
    #[serde(default = "default_thread_count")]
    pub thread_count: NonZeroUsize,

    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_root_paths() -> Vec<PathBuf> {
    vec![PathBuf::from(".")]
}

fn default_thread_count() -> NonZeroUsize {
    NonZeroUsize::new(num_cpus::get()).unwrap_or(NonZeroUsize::MIN)
}

fn default_log_level() -> String {
    "warn".to_string()
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            search_strings: Vec::new(),
            file_types: Vec::new(),
            root_paths: default_root_paths(),
            skip_patterns: Vec::new(),
            verbose: false,
            ignore_errors: false,
            binary_files: BinaryFilesMode::default(),
            case_sensitive: false,
            fixed: false,
            respect_gitignore: false,
            list_only: false,
            thread_count: default_thread_count(),
            log_level: default_log_level(),
        }
    }
}

impl SearchConfig {
    /// Creates a configuration for the given strings and roots with default flags
    pub fn new<S, P>(search_strings: impl IntoIterator<Item = S>, roots: impl IntoIterator<Item = P>) -> Self
    where
        S: Into<String>,
        P: Into<PathBuf>,
    {
        Self {
            search_strings: search_strings.into_iter().map(Into::into).collect(),
            root_paths: roots.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    /// Loads configuration from the default locations plus a specific file
    pub fn load_from(config_path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut builder = ConfigBuilder::builder();

        let config_files = [
            dirs::config_dir().map(|p| p.join("polygrep/config.yaml")),
            Some(PathBuf::from(".polygrep.yaml")),
        ];

        for path in config_files.iter().flatten() {
            if path.exists() {
                builder = builder.add_source(File::from(path.as_path()));
            }
        }

        // An explicit file must exist
        if let Some(path) = config_path {
            builder = builder.add_source(File::from(path).required(true));
        }

        builder.build()?.try_deserialize()
    }

    /// Merges CLI arguments with configuration file values
    pub fn merge_with_cli(mut self, cli_config: SearchConfig) -> Self {
        if !cli_config.search_strings.is_empty() {
            self.search_strings = cli_config.search_strings;
        }
        if !cli_config.file_types.is_empty() {
            self.file_types = cli_config.file_types;
        }
        if cli_config.root_paths != default_root_paths() {
            self.root_paths = cli_config.root_paths;
        }
        if !cli_config.skip_patterns.is_empty() {
            self.skip_patterns = cli_config.skip_patterns;
        }
        self.verbose |= cli_config.verbose;
        self.ignore_errors |= cli_config.ignore_errors;
        self.case_sensitive |= cli_config.case_sensitive;
        self.fixed |= cli_config.fixed;
        self.respect_gitignore |= cli_config.respect_gitignore;
        self.list_only |= cli_config.list_only;
        if cli_config.binary_files != BinaryFilesMode::default() {
            self.binary_files = cli_config.binary_files;
        }
        self.thread_count = cli_config.thread_count;
        if cli_config.log_level != default_log_level() {
            self.log_level = cli_config.log_level;
        }
        self
    }

    /// Rejects configurations that cannot start a run
    pub fn validate(&self) -> SearchResult<()> {
        if self.search_strings.is_empty() {
            return Err(SearchError::config_error(
                "at least one search string is required",
            ));
        }
        if self.search_strings.iter().any(|s| s.is_empty()) {
            return Err(SearchError::config_error("search strings must not be empty"));
        }
        if self.root_paths.is_empty() {
            return Err(SearchError::config_error("at least one root path is required"));
        }
        for root in &self.root_paths {
            if !root.is_dir() {
                return Err(SearchError::config_error(format!(
                    "root path is not a directory: {}",
                    root.display()
                )));
            }
        }
        for pattern in self.file_types.iter().chain(&self.skip_patterns) {
            glob::Pattern::new(pattern).map_err(|e| {
                SearchError::config_error(format!("invalid glob '{}': {}", pattern, e))
            })?;
        }
        Ok(())
    }

    /// Root paths with a trailing separator, in configured order
    pub fn normalized_roots(&self) -> Vec<PathBuf> {
        self.root_paths.iter().map(|p| normalize_root(p)).collect()
    }
}

/// Appends a path separator unless the path already ends with one.
pub fn normalize_root(path: &Path) -> PathBuf {
    let mut s = path.as_os_str().to_os_string();
    let ends_with_separator = path
        .to_string_lossy()
        .ends_with(|c: char| c == MAIN_SEPARATOR || c == '/');
    if !ends_with_separator {
        s.push(MAIN_SEPARATOR.to_string());
    }
    PathBuf::from(s)
}
