use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use tracing::{trace, warn};
use zip::ZipArchive;

use super::{decode_lossy, Document, FormatReader, ReadOptions, TextUnit};
use crate::errors::{SearchError, SearchResult};
use crate::results::MatchLocation;

const XML_SUFFIX: &str = ".xml";
// Guards against decompression bombs
const MAX_ENTRY_BYTES: u64 = 256 * 1024 * 1024;

/// Reads zip-packaged XML documents: OpenDocument (`.odp`, `.odt`) and
/// Office Open XML (`.pptx`).
///
/// Every archive entry whose name ends in `.xml` becomes one text unit,
/// located by the entry name. The raw XML is matched, markup included.
#[derive(Debug, Clone, Copy)]
pub struct ZipXmlReader {
    name: &'static str,
    max_entry_bytes: u64,
}

impl ZipXmlReader {
    pub fn open_document() -> Self {
        Self {
            name: "opendocument",
            max_entry_bytes: MAX_ENTRY_BYTES,
        }
    }

    pub fn office_open_xml() -> Self {
        Self {
            name: "office-open-xml",
            max_entry_bytes: MAX_ENTRY_BYTES,
        }
    }

    /// Caps how much of each entry is decompressed; the rest is dropped
    pub fn with_max_entry_bytes(mut self, limit: u64) -> Self {
        self.max_entry_bytes = limit;
        self
    }
}

impl FormatReader for ZipXmlReader {
    fn name(&self) -> &'static str {
        self.name
    }

    fn read(&self, path: &Path, _options: &ReadOptions) -> SearchResult<Document> {
        let file = File::open(path).map_err(|e| SearchError::from_io(path, e))?;
        let mut archive = ZipArchive::new(BufReader::new(file))
            .map_err(|e| SearchError::archive_error(path, e))?;

        let mut document = Document::default();
        for index in 0..archive.len() {
            let entry = archive
                .by_index(index)
                .map_err(|e| SearchError::archive_error(path, e))?;
            if entry.is_dir() || !entry.name().ends_with(XML_SUFFIX) {
                continue;
            }

            let name = entry.name().to_string();
            let mut bytes = Vec::new();
            entry
                .take(self.max_entry_bytes.saturating_add(1))
                .read_to_end(&mut bytes)
                .map_err(|e| SearchError::from_io(path, e))?;
            if bytes.len() as u64 > self.max_entry_bytes {
                warn!(
                    "Truncated {}[{}] at {} bytes",
                    path.display(),
                    name,
                    self.max_entry_bytes
                );
                bytes.truncate(self.max_entry_bytes as usize);
            }
            trace!("Read {} bytes from {}[{}]", bytes.len(), path.display(), name);

            document.bytes_read += bytes.len() as u64;
            let text = decode_lossy(&bytes, path, &name);
            document
                .units
                .push(TextUnit::new(MatchLocation::Entry(name), text));
        }

        Ok(document)
    }
}
