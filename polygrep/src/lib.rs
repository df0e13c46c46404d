pub mod config;
pub mod errors;
pub mod extract;
pub mod filters;
pub mod metrics;
pub mod results;
pub mod search;

pub use config::{BinaryFilesMode, SearchConfig};
pub use errors::{SearchError, SearchResult};
pub use extract::{Document, FormatReader, ReadOptions, TextUnit};
pub use metrics::{MetricsSnapshot, SearchMetrics};
pub use results::{FileError, FileErrorKind, FileResult, MatchLocation, SearchOutput};
pub use search::{search, ExtractorKind, FileType, Searcher};
