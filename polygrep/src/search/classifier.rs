use glob::Pattern;
use serde::Serialize;
use std::collections::BTreeSet;
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, trace};

use crate::errors::{SearchError, SearchResult};
use crate::filters::{matches_skip_pattern, walk_root, IgnoreSpec};

/// A normalized, lower-case file-type glob such as `*.pdf`
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct FileType(String);

impl FileType {
    /// Normalizes a configured glob
    pub fn new(glob: impl AsRef<str>) -> Self {
        Self(glob.as_ref().to_lowercase())
    }

    /// Builds `*<ext>` from a dotted extension such as `.PDF`
    pub fn from_extension(dotted_ext: &str) -> Self {
        Self(format!("*{}", dotted_ext.to_lowercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Compiles the glob used to select files by name
    pub fn pattern(&self) -> SearchResult<Pattern> {
        Pattern::new(&self.0)
            .map_err(|e| SearchError::config_error(format!("invalid file type '{}': {}", self.0, e)))
    }
}

impl fmt::Display for FileType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Lower-cased extension of `path` including the leading dot, if any.
///
/// Dotfiles such as `.gitignore` have no extension. Neither does a name with a
/// trailing dot like `notes.`: it yields `None` rather than `"."`, so `*.` is
/// never detected as a type.
pub fn dotted_extension(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|ext| ext.to_str())
        .filter(|ext| !ext.is_empty())
        .map(|ext| format!(".{}", ext.to_lowercase()))
}

/// Collects the file types present under `root`.
///
/// Ignored directories are pruned without being listed, ignored files are
/// skipped, and extensions matching a skip pattern are left out.
pub fn detect_types(
    root: &Path,
    skip_patterns: &[Pattern],
    ignore_spec: Option<Arc<IgnoreSpec>>,
) -> BTreeSet<FileType> {
    let mut file_types = BTreeSet::new();

    for entry in walk_root(root, ignore_spec) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                debug!("Skipping unreadable path under {}: {}", root.display(), e);
                continue;
            }
        };
        if !entry.file_type().is_some_and(|ft| ft.is_file()) {
            continue;
        }
        let Some(ext) = dotted_extension(entry.path()) else {
            continue;
        };
        if matches_skip_pattern(&ext, skip_patterns) {
            trace!("Skipping extension {} of {}", ext, entry.path().display());
            continue;
        }
        file_types.insert(FileType::from_extension(&ext));
    }

    debug!(
        "Detected {} file types under {}",
        file_types.len(),
        root.display()
    );
    file_types
}
