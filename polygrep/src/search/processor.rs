use crossbeam_channel::Sender;
use dashmap::DashSet;
use glob::Pattern;
use rayon::prelude::*;
use ignore::DirEntry;
use rayon::ThreadPoolBuilder;
use std::any::Any;
use std::collections::{BTreeSet, HashSet};
use std::num::NonZeroUsize;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, trace, warn};

use super::classifier::{dotted_extension, FileType};
use super::matcher::PatternMatcher;
use crate::errors::{SearchError, SearchResult};
use crate::extract::{FormatReader, ReadOptions};
use crate::filters::{matches_file_type, walk_error_path, walk_root, IgnoreSpec};
use crate::metrics::SearchMetrics;
use crate::results::{ExtractorOutput, FileError, FileErrorKind, FileResult};

/// Run-wide state shared read-only by every extractor
#[derive(Debug, Clone)]
pub struct ExtractorContext {
    pub matcher: Arc<PatternMatcher>,
    pub ignore_spec: Option<Arc<IgnoreSpec>>,
    pub metrics: SearchMetrics,
    pub read_options: ReadOptions,
    pub ignore_errors: bool,
    pub list_only: bool,
    pub thread_count: NonZeroUsize,
    /// Files already taken by an earlier (type, root) pair of this run
    pub claimed: Arc<DashSet<PathBuf>>,
    /// Dispatched types that have a dedicated reader. A file of one of these
    /// types is only taken by the extractor for exactly that type.
    pub routed_types: Arc<BTreeSet<FileType>>,
}

/// Searches every file of one type under one root.
///
/// Files are processed on a worker pool that lives only for the duration of
/// [`Extractor::search`]. Failures are isolated per file and returned as
/// [`FileError`]s alongside the results.
pub struct Extractor {
    file_type: FileType,
    type_glob: Pattern,
    root: PathBuf,
    reader: Arc<dyn FormatReader>,
    context: Arc<ExtractorContext>,
}

impl Extractor {
    pub fn new(
        file_type: FileType,
        root: impl Into<PathBuf>,
        reader: Arc<dyn FormatReader>,
        context: Arc<ExtractorContext>,
    ) -> SearchResult<Self> {
        let type_glob = file_type.pattern()?;
        Ok(Self {
            file_type,
            type_glob,
            root: root.into(),
            reader,
            context,
        })
    }

    pub fn file_type(&self) -> &FileType {
        &self.file_type
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Enumerates, processes and collects. Never fails as a whole.
    pub fn search(&self) -> ExtractorOutput {
        self.search_entries(walk_root(&self.root, self.context.ignore_spec.clone()))
    }

    fn search_entries<I>(&self, entries: I) -> ExtractorOutput
    where
        I: IntoIterator<Item = Result<DirEntry, ignore::Error>>,
    {
        let metrics = &self.context.metrics;
        metrics.record_extractor_run();

        let (error_tx, error_rx) = crossbeam_channel::unbounded();
        let files = self.enumerate(entries, &error_tx);
        metrics.record_enumerated(files.len() as u64);
        debug!(
            "{} found {} {} files under {}",
            self.reader.name(),
            files.len(),
            self.file_type,
            self.root.display()
        );

        let mut output = ExtractorOutput::default();
        if !files.is_empty() {
            match self.build_pool() {
                Ok(pool) => {
                    output.results = pool.install(|| {
                        files
                            .par_iter()
                            .flat_map_iter(|path| self.process_isolated(path, &error_tx))
                            .collect()
                    });
                    output.files_searched = files.len();
                }
                Err(err) => {
                    let _ = error_tx.send(FileError::new(
                        &self.root,
                        FileErrorKind::Extraction,
                        err.to_string(),
                    ));
                }
            }
        }

        // All senders must be gone before draining
        drop(error_tx);
        output.errors = error_rx.iter().collect();

        output
            .results
            .sort_by(|a, b| (&a.path, &a.location).cmp(&(&b.path, &b.location)));
        output.errors.sort_by(|a, b| a.path.cmp(&b.path));
        self.report_errors(&output.errors);
        output
    }

    fn build_pool(&self) -> SearchResult<rayon::ThreadPool> {
        ThreadPoolBuilder::new()
            .num_threads(self.context.thread_count.get())
            .thread_name(|i| format!("polygrep-worker-{}", i))
            .build()
            .map_err(|e| SearchError::worker_pool(e.to_string()))
    }

    /// Regular files under the root whose name matches the type glob
    fn enumerate<I>(&self, entries: I, error_tx: &Sender<FileError>) -> Vec<PathBuf>
    where
        I: IntoIterator<Item = Result<DirEntry, ignore::Error>>,
    {
        let mut files = Vec::new();
        for entry in entries {
            match entry {
                Ok(entry) => {
                    if !entry.file_type().is_some_and(|ft| ft.is_file())
                        || !matches_file_type(entry.path(), &self.type_glob)
                    {
                        continue;
                    }
                    let path = entry.into_path();
                    if !self.owns(&path) {
                        trace!("{} left to its own extractor", path.display());
                    } else if self.context.claimed.insert(path.clone()) {
                        files.push(path);
                    } else {
                        trace!("{} already searched", path.display());
                    }
                }
                Err(err) => {
                    self.context.metrics.record_enumeration_error();
                    let path = walk_error_path(&err, &self.root);
                    let _ = error_tx.send(FileError::new(
                        path,
                        FileErrorKind::Enumeration,
                        SearchError::from(err).to_string(),
                    ));
                }
            }
        }
        files
    }

    /// False if another extractor of this run is dedicated to the file's type
    fn owns(&self, path: &Path) -> bool {
        match dotted_extension(path) {
            Some(ext) => {
                let own_type = FileType::from_extension(&ext);
                own_type == self.file_type || !self.context.routed_types.contains(&own_type)
            }
            None => true,
        }
    }

    /// Processes one file, turning any error or panic into a FileError
    fn process_isolated(&self, path: &Path, error_tx: &Sender<FileError>) -> Vec<FileResult> {
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| self.process_file(path)));
        let err = match outcome {
            Ok(Ok(results)) => return results,
            Ok(Err(err)) => err,
            Err(payload) => SearchError::extractor_panic(path, panic_message(payload.as_ref())),
        };

        self.context.metrics.record_file_failed();
        let _ = error_tx.send(FileError::new(
            path,
            FileErrorKind::Extraction,
            err.to_string(),
        ));
        Vec::new()
    }

    fn process_file(&self, path: &Path) -> SearchResult<Vec<FileResult>> {
        trace!("Processing {} with {}", path.display(), self.reader.name());
        let document = self.reader.read(path, &self.context.read_options)?;
        self.context
            .metrics
            .record_file_processed(document.units.len() as u64, document.bytes_read);

        let list_only = self.context.list_only;
        let mut results = Vec::new();
        let mut reported = HashSet::new();
        for unit in &document.units {
            for result in self
                .context
                .matcher
                .evaluate(&unit.text, path, &unit.location, list_only)
            {
                // File-level results are reported once per search string
                if result.is_file_only() && !reported.insert(result.search_string.clone()) {
                    continue;
                }
                results.push(result);
            }
        }
        Ok(results)
    }

    fn report_errors(&self, errors: &[FileError]) {
        for error in errors {
            if self.context.ignore_errors {
                debug!("{}", error);
            } else {
                warn!("{}", error);
            }
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
