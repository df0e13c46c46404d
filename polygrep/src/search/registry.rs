use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use super::classifier::FileType;
use crate::extract::{FormatReader, TextReader, ZipXmlReader};

/// Extractor families, one per kind of container the search understands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ExtractorKind {
    /// Plain text; the fallback for every unrecognized type
    Text,
    /// `.odp`, `.odt`
    OpenDocument,
    /// `.pptx`
    OfficeOpenXml,
    Pdf,
    /// Legacy Word `.doc`
    Doc,
    /// Legacy Excel `.xls`
    Xls,
    Sqlite,
    /// Image metadata and embedded text
    Image,
    /// Audio and video metadata
    Media,
}

impl ExtractorKind {
    /// Every family, in declaration order
    pub const ALL: [ExtractorKind; 9] = [
        Self::Text,
        Self::OpenDocument,
        Self::OfficeOpenXml,
        Self::Pdf,
        Self::Doc,
        Self::Xls,
        Self::Sqlite,
        Self::Image,
        Self::Media,
    ];

    /// Routes a normalized file type to its family; unknown types are text.
    pub fn for_file_type(file_type: &FileType) -> Self {
        match file_type.as_str() {
            "*.doc" => Self::Doc,
            "*.pdf" => Self::Pdf,
            "*.jpeg" | "*.jpg" | "*.png" => Self::Image,
            "*.xls" => Self::Xls,
            "*.odp" | "*.odt" => Self::OpenDocument,
            "*.pptx" => Self::OfficeOpenXml,
            "*.sqlite" => Self::Sqlite,
            "*.mp3" | "*.wav" | "*.flac" | "*.mp4" | "*.avi" | "*.mov" | "*.wmv" => Self::Media,
            _ => Self::Text,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::OpenDocument => "opendocument",
            Self::OfficeOpenXml => "office-open-xml",
            Self::Pdf => "pdf",
            Self::Doc => "doc",
            Self::Xls => "xls",
            Self::Sqlite => "sqlite",
            Self::Image => "image",
            Self::Media => "media",
        }
    }
}

impl fmt::Display for ExtractorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Format readers available to a run, keyed by family
#[derive(Clone)]
pub struct ExtractorRegistry {
    readers: HashMap<ExtractorKind, Arc<dyn FormatReader>>,
}

impl ExtractorRegistry {
    /// A registry with no readers at all
    pub fn empty() -> Self {
        Self {
            readers: HashMap::new(),
        }
    }

    /// The readers shipped with the crate: text and the zip+XML family
    pub fn with_builtin_readers() -> Self {
        let mut registry = Self::empty();
        registry.register(ExtractorKind::Text, TextReader::new());
        registry.register(ExtractorKind::OpenDocument, ZipXmlReader::open_document());
        registry.register(ExtractorKind::OfficeOpenXml, ZipXmlReader::office_open_xml());
        registry
    }

    /// Registers or replaces the reader for a family
    pub fn register<R: FormatReader + 'static>(&mut self, kind: ExtractorKind, reader: R) {
        self.readers.insert(kind, Arc::new(reader));
    }

    pub fn get(&self, kind: ExtractorKind) -> Option<Arc<dyn FormatReader>> {
        self.readers.get(&kind).cloned()
    }

    pub fn contains(&self, kind: ExtractorKind) -> bool {
        self.readers.contains_key(&kind)
    }
}

impl Default for ExtractorRegistry {
    fn default() -> Self {
        Self::with_builtin_readers()
    }
}

impl fmt::Debug for ExtractorRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut kinds: Vec<_> = self.readers.keys().collect();
        kinds.sort();
        f.debug_struct("ExtractorRegistry")
            .field("kinds", &kinds)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::SearchResult;
    use crate::extract::{Document, ReadOptions};
    use std::path::Path;

    struct NullReader;

    impl FormatReader for NullReader {
        fn name(&self) -> &'static str {
            "null"
        }

        fn read(&self, _path: &Path, _options: &ReadOptions) -> SearchResult<Document> {
            Ok(Document::default())
        }
    }

    fn kind(glob: &str) -> ExtractorKind {
        ExtractorKind::for_file_type(&FileType::new(glob))
    }

    #[test]
    fn test_known_types_route_to_their_family() {
        assert_eq!(kind("*.odp"), ExtractorKind::OpenDocument);
        assert_eq!(kind("*.ODT"), ExtractorKind::OpenDocument);
        assert_eq!(kind("*.pptx"), ExtractorKind::OfficeOpenXml);
        assert_eq!(kind("*.pdf"), ExtractorKind::Pdf);
        assert_eq!(kind("*.doc"), ExtractorKind::Doc);
        assert_eq!(kind("*.xls"), ExtractorKind::Xls);
        assert_eq!(kind("*.sqlite"), ExtractorKind::Sqlite);
        assert_eq!(kind("*.JPG"), ExtractorKind::Image);
        assert_eq!(kind("*.png"), ExtractorKind::Image);
        assert_eq!(kind("*.flac"), ExtractorKind::Media);
        assert_eq!(kind("*.wmv"), ExtractorKind::Media);
    }

    #[test]
    fn test_unknown_types_fall_back_to_text() {
        for glob in ["*.txt", "*.rs", "*.docx", "*.weird", "*", "report.*"] {
            assert_eq!(kind(glob), ExtractorKind::Text, "{}", glob);
        }
    }

    #[test]
    fn test_routing_is_deterministic() {
        for _ in 0..10 {
            assert_eq!(kind("*.pdf"), ExtractorKind::Pdf);
            assert_eq!(kind("*.md"), ExtractorKind::Text);
        }
    }

    #[test]
    fn test_builtin_registry() {
        let registry = ExtractorRegistry::default();
        assert!(registry.contains(ExtractorKind::Text));
        assert!(registry.contains(ExtractorKind::OpenDocument));
        assert!(registry.contains(ExtractorKind::OfficeOpenXml));
        assert!(!registry.contains(ExtractorKind::Pdf));
        assert_eq!(
            registry.get(ExtractorKind::OpenDocument).unwrap().name(),
            "opendocument"
        );
    }

    #[test]
    fn test_register_replaces_reader() {
        let mut registry = ExtractorRegistry::empty();
        assert!(registry.get(ExtractorKind::Pdf).is_none());

        registry.register(ExtractorKind::Pdf, NullReader);
        assert_eq!(registry.get(ExtractorKind::Pdf).unwrap().name(), "null");

        registry.register(ExtractorKind::Text, NullReader);
        assert_eq!(registry.get(ExtractorKind::Text).unwrap().name(), "null");
    }

    #[test]
    fn test_all_names_are_distinct() {
        let mut names: Vec<_> = ExtractorKind::ALL.iter().map(|k| k.name()).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), ExtractorKind::ALL.len());
    }
}
