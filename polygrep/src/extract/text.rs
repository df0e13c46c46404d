use memmap2::Mmap;
use std::fs::File;
use std::ops::Deref;
use std::path::Path;
use tracing::trace;

use super::{decode_lossy, Document, FormatReader, ReadOptions, TextUnit};
use crate::config::BinaryFilesMode;
use crate::errors::{SearchError, SearchResult};
use crate::results::MatchLocation;

const LARGE_FILE_THRESHOLD: u64 = 10 * 1024 * 1024; // 10MB
const BINARY_CHECK_SIZE: usize = 8192;

enum FileBytes {
    Owned(Vec<u8>),
    Mapped(Mmap),
}

impl Deref for FileBytes {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        match self {
            Self::Owned(bytes) => &bytes[..],
            Self::Mapped(mmap) => &mmap[..],
        }
    }
}

fn read_bytes(path: &Path) -> SearchResult<FileBytes> {
    let file = File::open(path).map_err(|e| SearchError::from_io(path, e))?;
    let size = file
        .metadata()
        .map_err(|e| SearchError::from_io(path, e))?
        .len();

    if size >= LARGE_FILE_THRESHOLD {
        trace!("Memory mapping {} ({} bytes)", path.display(), size);
        let mmap = unsafe { Mmap::map(&file) }.map_err(|e| SearchError::from_io(path, e))?;
        return Ok(FileBytes::Mapped(mmap));
    }

    std::fs::read(path)
        .map(FileBytes::Owned)
        .map_err(|e| SearchError::from_io(path, e))
}

/// True if the leading bytes contain a NUL byte
pub fn looks_binary(bytes: &[u8]) -> bool {
    let head = &bytes[..bytes.len().min(BINARY_CHECK_SIZE)];
    head.contains(&0)
}

/// Default reader: every line of the file is a text unit.
#[derive(Debug, Clone, Copy, Default)]
pub struct TextReader;

impl TextReader {
    pub fn new() -> Self {
        Self
    }
}

impl FormatReader for TextReader {
    fn name(&self) -> &'static str {
        "text"
    }

    fn read(&self, path: &Path, options: &ReadOptions) -> SearchResult<Document> {
        let bytes = read_bytes(path)?;
        let bytes_read = bytes.len() as u64;

        if looks_binary(&bytes) {
            match options.binary_files {
                BinaryFilesMode::WithoutMatch => {
                    trace!("Skipping binary file {}", path.display());
                    return Ok(Document::empty(bytes_read));
                }
                BinaryFilesMode::Binary => {
                    let text = decode_lossy(&bytes, path, "binary");
                    return Ok(Document {
                        units: vec![TextUnit::new(MatchLocation::Binary, text)],
                        bytes_read,
                    });
                }
                BinaryFilesMode::Text => {}
            }
        }

        let text = decode_lossy(&bytes, path, "text");
        let units = text
            .lines()
            .enumerate()
            .map(|(i, line)| TextUnit::new(MatchLocation::Line(i + 1), line))
            .collect();

        Ok(Document { units, bytes_read })
    }
}
