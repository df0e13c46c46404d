//! Path filtering: the run-wide ignore spec, skip patterns and file-type globs.
use glob::{MatchOptions, Pattern};
use ignore::gitignore::{Gitignore, GitignoreBuilder};
use ignore::{DirEntry, Walk, WalkBuilder};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::errors::{SearchError, SearchResult};

const IGNORE_FILE_NAME: &str = ".gitignore";

const CASE_INSENSITIVE: MatchOptions = MatchOptions {
    case_sensitive: false,
    require_literal_separator: false,
    require_literal_leading_dot: false,
};

/// Compiled rules from a single `.gitignore` file.
///
/// Only one ignore file is honored per run: the one in the first root that has
/// it. Paths are always matched relative to whichever root is being walked.
#[derive(Debug, Clone)]
pub struct IgnoreSpec {
    matcher: Gitignore,
    source: PathBuf,
}

impl IgnoreSpec {
    /// Compiles the `.gitignore` of the first root that has one.
    ///
    /// Returns `Ok(None)` when no root carries an ignore file.
    pub fn load(roots: &[PathBuf]) -> SearchResult<Option<Self>> {
        for root in roots {
            let candidate = root.join(IGNORE_FILE_NAME);
            if candidate.is_file() {
                return Self::from_file(root, &candidate).map(Some);
            }
        }
        debug!("No {} found in any root", IGNORE_FILE_NAME);
        Ok(None)
    }

    fn from_file(root: &Path, path: &Path) -> SearchResult<Self> {
        let mut builder = GitignoreBuilder::new(root);
        if let Some(err) = builder.add(path) {
            // Partial errors leave the valid lines in place
            if err.is_io() {
                return Err(SearchError::ignore_file(path, err.to_string()));
            }
            warn!("Skipping invalid rule in {}: {}", path.display(), err);
        }
        let matcher = builder
            .build()
            .map_err(|e| SearchError::ignore_file(path, e.to_string()))?;
        debug!(
            "Loaded {} ignore rules from {}",
            matcher.num_ignores(),
            path.display()
        );
        Ok(Self {
            matcher,
            source: path.to_path_buf(),
        })
    }

    /// Builds a spec from in-memory lines, rooted at `root`
    pub fn from_lines<'a>(
        root: &Path,
        lines: impl IntoIterator<Item = &'a str>,
    ) -> SearchResult<Self> {
        let mut builder = GitignoreBuilder::new(root);
        for line in lines {
            builder
                .add_line(None, line)
                .map_err(|e| SearchError::ignore_file(root, e.to_string()))?;
        }
        let matcher = builder
            .build()
            .map_err(|e| SearchError::ignore_file(root, e.to_string()))?;
        Ok(Self {
            matcher,
            source: root.join(IGNORE_FILE_NAME),
        })
    }

    /// The ignore file these rules came from
    pub fn source(&self) -> &Path {
        &self.source
    }

    /// True if `relative_path` or any of its parent directories is ignored.
    pub fn is_ignored(&self, relative_path: &Path, is_dir: bool) -> bool {
        if relative_path.as_os_str().is_empty() || relative_path.has_root() {
            return false;
        }
        self.matcher
            .matched_path_or_any_parents(relative_path, is_dir)
            .is_ignore()
    }
}

/// True if the dotted extension (e.g. `.log`) matches any skip pattern.
///
/// Both `*.log` and `.log` pattern styles work since `*` also matches nothing.
pub fn matches_skip_pattern(extension: &str, skip_patterns: &[Pattern]) -> bool {
    skip_patterns
        .iter()
        .any(|p| p.matches_with(extension, CASE_INSENSITIVE))
}

/// Compiles skip patterns, lower-casing them first
pub fn compile_patterns(patterns: &[String]) -> SearchResult<Vec<Pattern>> {
    patterns
        .iter()
        .map(|p| {
            Pattern::new(&p.to_lowercase())
                .map_err(|e| SearchError::config_error(format!("invalid glob '{}': {}", p, e)))
        })
        .collect()
}

/// True if the file name matches the type glob, ignoring case.
pub fn matches_file_type(path: &Path, type_glob: &Pattern) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|name| type_glob.matches_with(name, CASE_INSENSITIVE))
}

/// Builds a raw recursive walk over `root` that prunes ignored paths.
///
/// No hidden-file or VCS filtering is applied beyond the given spec, and
/// symlinks are not followed.
pub fn walk_root(root: &Path, ignore_spec: Option<Arc<IgnoreSpec>>) -> Walk {
    let mut builder = WalkBuilder::new(root);
    builder.standard_filters(false).follow_links(false);

    if let Some(spec) = ignore_spec {
        let walk_root = root.to_path_buf();
        builder.filter_entry(move |entry| !is_entry_ignored(&walk_root, entry, &spec));
    }

    builder.build()
}

fn is_entry_ignored(root: &Path, entry: &DirEntry, spec: &IgnoreSpec) -> bool {
    if entry.depth() == 0 {
        return false;
    }
    let relative = entry.path().strip_prefix(root).unwrap_or(entry.path());
    let is_dir = entry.file_type().is_some_and(|ft| ft.is_dir());
    spec.is_ignored(relative, is_dir)
}

/// Best-effort path attached to a traversal error
pub fn walk_error_path(err: &ignore::Error, fallback: &Path) -> PathBuf {
    match err {
        ignore::Error::WithPath { path, .. } => path.clone(),
        ignore::Error::WithDepth { err, .. } | ignore::Error::WithLineNumber { err, .. } => {
            walk_error_path(err, fallback)
        }
        ignore::Error::Loop { child, .. } => child.clone(),
        _ => fallback.to_path_buf(),
    }
}
