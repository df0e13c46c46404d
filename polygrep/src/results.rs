//! Result types produced by a search run.
use serde::Serialize;
use std::fmt;
use std::path::PathBuf;

use crate::search::classifier::FileType;

/// Where inside a file a match was found
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum MatchLocation {
    /// The file as a whole (list-only mode, whole-file readers)
    File,
    /// A binary file matched as raw bytes
    Binary,
    /// A 1-based line of a text file
    Line(usize),
    /// A named entry inside a container such as `content.xml`
    Entry(String),
}

impl fmt::Display for MatchLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::File | Self::Binary => Ok(()),
            Self::Line(n) => write!(f, "{}", n),
            Self::Entry(name) => f.write_str(name),
        }
    }
}

/// A single reported match
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileResult {
    /// The file the match belongs to
    pub path: PathBuf,
    /// The configured search string that matched
    pub search_string: String,
    pub location: MatchLocation,
    /// Byte span of the match within the text unit
    #[serde(skip_serializing_if = "Option::is_none")]
    pub span: Option<(usize, usize)>,
    /// The matching line, or a snippet around the match for larger units
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
}

impl FileResult {
    /// A result carrying only file identity
    pub fn file_only(path: impl Into<PathBuf>, search_string: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            search_string: search_string.into(),
            location: MatchLocation::File,
            span: None,
            context: None,
        }
    }

    /// True if the result carries no position inside the file
    pub fn is_file_only(&self) -> bool {
        matches!(self.location, MatchLocation::File | MatchLocation::Binary)
    }
}

/// Which stage of the run a file-scoped error came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FileErrorKind {
    /// A directory could not be listed
    Enumeration,
    /// A file could not be opened or decoded
    Extraction,
}

/// A failure isolated to one path
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileError {
    pub path: PathBuf,
    pub kind: FileErrorKind,
    pub message: String,
}

impl FileError {
    pub fn new(path: impl Into<PathBuf>, kind: FileErrorKind, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            kind,
            message: message.into(),
        }
    }
}

impl fmt::Display for FileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path.display(), self.message)
    }
}

/// Everything one extractor produced for its (type, root) pair
#[derive(Debug, Clone, Default)]
pub struct ExtractorOutput {
    pub results: Vec<FileResult>,
    pub errors: Vec<FileError>,
    /// Files that were enumerated and handed to the reader
    pub files_searched: usize,
}

/// The complete search results
#[derive(Debug, Clone, Default, Serialize)]
pub struct SearchOutput {
    /// Matches in discovery order of (type, root) pairs
    pub results: Vec<FileResult>,
    /// Isolated per-file failures
    pub errors: Vec<FileError>,
    /// The file types that were dispatched
    pub file_types: Vec<FileType>,
    /// Total number of files handed to an extractor
    pub files_searched: usize,
    /// Number of distinct files with at least one match
    pub files_with_matches: usize,
    /// Total number of results
    pub total_matches: usize,
}

impl SearchOutput {
    /// Creates a new empty search output
    pub fn new() -> Self {
        Default::default()
    }

    /// Appends one extractor's output
    pub fn add_extractor_output(&mut self, output: ExtractorOutput) {
        self.files_searched += output.files_searched;
        if let Some(first) = output.results.first() {
            // Extractor output is sorted by path, so distinct paths are adjacent
            let mut distinct = 1;
            let mut previous = &first.path;
            for result in &output.results[1..] {
                if &result.path != previous {
                    distinct += 1;
                    previous = &result.path;
                }
            }
            self.files_with_matches += distinct;
        }
        self.total_matches += output.results.len();
        self.results.extend(output.results);
        self.errors.extend(output.errors);
    }
}
