//! Format readers turn one file into text units for the matcher.
//!
//! Each extractor family is backed by one [`FormatReader`]. The crate ships the
//! plain-text reader and the zip+XML reader used for OpenDocument and Office
//! Open XML; other formats (PDF, spreadsheets, databases, media metadata) are
//! plugged in by implementing the trait and registering it with the searcher.
//!
//! ```rust,ignore
//! struct PdfReader;
//!
//! impl FormatReader for PdfReader {
//!     fn name(&self) -> &'static str { "pdf" }
//!
//!     fn read(&self, path: &Path, _options: &ReadOptions) -> SearchResult<Document> {
//!         let text = my_pdf_library::extract_text(path)?;
//!         Ok(Document::single(MatchLocation::File, text))
//!     }
//! }
//!
//! let searcher = Searcher::new(config)?.with_reader(ExtractorKind::Pdf, PdfReader);
//! ```
pub mod archive;
pub mod text;

use std::path::Path;

use crate::config::BinaryFilesMode;
use crate::errors::SearchResult;
use crate::results::MatchLocation;

pub use archive::ZipXmlReader;
pub use text::TextReader;

/// Per-run options a reader may need
#[derive(Debug, Clone, Copy, Default)]
pub struct ReadOptions {
    pub binary_files: BinaryFilesMode,
}

/// A piece of text with its position inside the source file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextUnit {
    pub location: MatchLocation,
    pub text: String,
}

impl TextUnit {
    pub fn new(location: MatchLocation, text: impl Into<String>) -> Self {
        Self {
            location,
            text: text.into(),
        }
    }
}

/// Everything a reader extracted from one file
#[derive(Debug, Clone, Default)]
pub struct Document {
    pub units: Vec<TextUnit>,
    /// Raw bytes consumed, for metrics
    pub bytes_read: u64,
}

impl Document {
    pub fn single(location: MatchLocation, text: impl Into<String>) -> Self {
        let text = text.into();
        let bytes_read = text.len() as u64;
        Self {
            units: vec![TextUnit::new(location, text)],
            bytes_read,
        }
    }

    pub fn empty(bytes_read: u64) -> Self {
        Self {
            units: Vec::new(),
            bytes_read,
        }
    }
}

/// Decodes one file into text units.
///
/// Implementations are shared across worker threads. Errors are file-scoped:
/// the caller records them against the path and moves on.
pub trait FormatReader: Send + Sync {
    /// Short name used in logs
    fn name(&self) -> &'static str;

    fn read(&self, path: &Path, options: &ReadOptions) -> SearchResult<Document>;
}

/// Decodes bytes as UTF-8, replacing malformed sequences.
pub(crate) fn decode_lossy(bytes: &[u8], path: &Path, unit: &str) -> String {
    let cow = String::from_utf8_lossy(bytes);
    if let std::borrow::Cow::Owned(_) = cow {
        tracing::debug!("Invalid UTF-8 replaced in {} ({})", path.display(), unit);
    }
    cow.into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_lossy_replaces_invalid_bytes() {
        let text = decode_lossy(b"ok \xff\xfe done", Path::new("a.txt"), "file");
        assert!(text.starts_with("ok "));
        assert!(text.ends_with(" done"));
        assert!(text.contains('\u{FFFD}'));
    }

    #[test]
    fn test_document_single() {
        let doc = Document::single(MatchLocation::File, "abc");
        assert_eq!(doc.units.len(), 1);
        assert_eq!(doc.bytes_read, 3);
        assert!(Document::empty(10).units.is_empty());
    }
}
