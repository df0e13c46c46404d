//! The search pipeline.
//!
//! A [`Searcher`] resolves the file types to search (configured, or detected by
//! [`classifier`]), routes each type to an extractor family through
//! [`registry`], and runs one [`processor::Extractor`] per (type, root) pair.
//! Each extractor walks its root, reads matching files on a worker pool and
//! evaluates every search string with the [`matcher`].
//!
//! ```rust,ignore
//! let config = SearchConfig::new(["approved"], ["./reports"]);
//! let output = Searcher::new(config)?.search();
//! for result in &output.results {
//!     println!("{}: {}", result.path.display(), result.search_string);
//! }
//! ```
pub mod classifier;
pub mod engine;
pub mod matcher;
pub mod processor;
pub mod registry;

pub use classifier::{detect_types, FileType};
pub use engine::{search, Searcher};
pub use matcher::{MatchOptions, PatternMatcher, SearchTerm};
pub use processor::{Extractor, ExtractorContext};
pub use registry::{ExtractorKind, ExtractorRegistry};
