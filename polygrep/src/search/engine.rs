use glob::Pattern;
use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::classifier::{detect_types, FileType};
use super::matcher::{MatchOptions, PatternMatcher};
use super::processor::{Extractor, ExtractorContext};
use super::registry::{ExtractorKind, ExtractorRegistry};
use crate::config::SearchConfig;
use crate::errors::SearchResult;
use crate::extract::{FormatReader, ReadOptions};
use crate::filters::{compile_patterns, IgnoreSpec};
use crate::metrics::SearchMetrics;
use crate::results::SearchOutput;

/// Dispatches one extractor per (file type, root) pair and aggregates their output.
///
/// Everything that can fail does so in [`Searcher::new`]; once built, a search
/// always completes and carries per-file failures in [`SearchOutput::errors`].
#[derive(Debug)]
pub struct Searcher {
    config: SearchConfig,
    roots: Vec<PathBuf>,
    skip_patterns: Vec<Pattern>,
    ignore_spec: Option<Arc<IgnoreSpec>>,
    matcher: Arc<PatternMatcher>,
    registry: ExtractorRegistry,
    metrics: SearchMetrics,
}

impl Searcher {
    /// Validates the configuration and prepares shared state
    pub fn new(config: SearchConfig) -> SearchResult<Self> {
        config.validate()?;

        let roots = config.normalized_roots();
        let skip_patterns = compile_patterns(&config.skip_patterns)?;
        let ignore_spec = if config.respect_gitignore {
            IgnoreSpec::load(&roots)?.map(Arc::new)
        } else {
            None
        };
        if let Some(spec) = &ignore_spec {
            info!("Using ignore rules from {}", spec.source().display());
        }

        let options = MatchOptions {
            case_sensitive: config.case_sensitive,
            fixed: config.fixed,
        };
        let matcher = Arc::new(PatternMatcher::new(&config.search_strings, options)?);

        Ok(Self {
            config,
            roots,
            skip_patterns,
            ignore_spec,
            matcher,
            registry: ExtractorRegistry::with_builtin_readers(),
            metrics: SearchMetrics::new(),
        })
    }

    /// Plugs a reader for an extractor family, replacing any existing one
    pub fn with_reader<R: FormatReader + 'static>(mut self, kind: ExtractorKind, reader: R) -> Self {
        self.registry.register(kind, reader);
        self
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    /// Counters accumulated by every search run on this searcher
    pub fn metrics(&self) -> &SearchMetrics {
        &self.metrics
    }

    /// The ignore rules in effect, if any
    pub fn ignore_spec(&self) -> Option<&IgnoreSpec> {
        self.ignore_spec.as_deref()
    }

    /// Configured types, or the types detected under every root
    pub fn resolve_file_types(&self) -> BTreeSet<FileType> {
        if !self.config.file_types.is_empty() {
            return self.config.file_types.iter().map(FileType::new).collect();
        }

        let mut file_types = BTreeSet::new();
        for root in &self.roots {
            file_types.extend(detect_types(
                root,
                &self.skip_patterns,
                self.ignore_spec.clone(),
            ));
        }
        debug!("Auto-detected file types: {:?}", file_types);
        file_types
    }

    /// Runs every (type, root) pair in order and returns the aggregate
    pub fn search(&self) -> SearchOutput {
        info!(
            "Starting search for {:?} in {} root(s)",
            self.config.search_strings,
            self.roots.len()
        );

        let file_types = self.resolve_file_types();
        let context = Arc::new(self.extractor_context(&file_types));
        let mut output = SearchOutput::new();

        for file_type in &file_types {
            let kind = ExtractorKind::for_file_type(file_type);
            let Some(reader) = self.registry.get(kind) else {
                warn!("No {} reader registered, skipping {}", kind, file_type);
                continue;
            };

            for root in &self.roots {
                if self.config.verbose {
                    info!("Searching in {} files in {}", file_type, root.display());
                }
                let extractor =
                    match Extractor::new(file_type.clone(), root, reader.clone(), context.clone())
                    {
                        Ok(extractor) => extractor,
                        Err(e) => {
                            warn!("Skipping {} in {}: {}", file_type, root.display(), e);
                            continue;
                        }
                    };
                output.add_extractor_output(extractor.search());
            }
        }

        output.file_types = file_types.into_iter().collect();
        self.metrics.log_stats();
        info!(
            "Search complete. Found {} matches in {} files ({} errors)",
            output.total_matches,
            output.files_with_matches,
            output.errors.len()
        );
        output
    }

    fn extractor_context(&self, file_types: &BTreeSet<FileType>) -> ExtractorContext {
        // Files of these types must not be read as text by a broader glob
        let routed_types = file_types
            .iter()
            .filter(|file_type| {
                let kind = ExtractorKind::for_file_type(file_type);
                kind != ExtractorKind::Text && self.registry.contains(kind)
            })
            .cloned()
            .collect();

        ExtractorContext {
            matcher: self.matcher.clone(),
            ignore_spec: self.ignore_spec.clone(),
            metrics: self.metrics.clone(),
            read_options: ReadOptions {
                binary_files: self.config.binary_files,
            },
            ignore_errors: self.config.ignore_errors,
            list_only: self.config.list_only,
            thread_count: self.config.thread_count,
            claimed: Arc::default(),
            routed_types: Arc::new(routed_types),
        }
    }
}

/// Builds a [`Searcher`] for `config` and runs it once
pub fn search(config: &SearchConfig) -> SearchResult<SearchOutput> {
    Ok(Searcher::new(config.clone())?.search())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::SearchError;
    use crate::extract::Document;
    use crate::results::MatchLocation;
    use std::fs;
    use std::path::Path;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::tempdir;

    #[derive(Clone, Default)]
    struct CountingReader {
        calls: Arc<AtomicUsize>,
    }

    impl FormatReader for CountingReader {
        fn name(&self) -> &'static str {
            "counting"
        }

        fn read(&self, _path: &Path, _options: &ReadOptions) -> SearchResult<Document> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(Document::single(MatchLocation::File, "invoice approved"))
        }
    }

    #[test]
    fn test_search_with_metrics() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("test.txt"), "test line\ntest line 2\n").unwrap();

        let searcher = Searcher::new(SearchConfig::new(["test"], [dir.path()])).unwrap();
        let output = searcher.search();
        assert_eq!(output.files_with_matches, 1);
        assert_eq!(output.total_matches, 2);
        assert_eq!(output.file_types, vec![FileType::new("*.txt")]);

        let stats = searcher.metrics().snapshot();
        assert_eq!(stats.files_processed, 1);
        assert_eq!(stats.extractors_run, 1);
    }

    #[test]
    fn test_resolve_file_types_normalizes_and_dedups() {
        let dir = tempdir().unwrap();
        let mut config = SearchConfig::new(["x"], [dir.path()]);
        config.file_types = vec!["*.PDF".into(), "*.pdf".into(), "*.txt".into()];

        let searcher = Searcher::new(config).unwrap();
        let types: Vec<_> = searcher.resolve_file_types().into_iter().collect();
        assert_eq!(types, vec![FileType::new("*.pdf"), FileType::new("*.txt")]);
    }

    #[test]
    fn test_auto_detect_unions_roots_and_applies_skip() {
        let first = tempdir().unwrap();
        let second = tempdir().unwrap();
        fs::write(first.path().join("a.txt"), "").unwrap();
        fs::write(first.path().join("debug.LOG"), "").unwrap();
        fs::write(second.path().join("b.odp"), "").unwrap();

        let mut config = SearchConfig::new(["x"], [first.path(), second.path()]);
        config.skip_patterns = vec!["*.log".into()];

        let searcher = Searcher::new(config).unwrap();
        let types: Vec<_> = searcher.resolve_file_types().into_iter().collect();
        assert_eq!(types, vec![FileType::new("*.odp"), FileType::new("*.txt")]);
    }

    #[test]
    fn test_unregistered_family_is_skipped() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("scan.pdf"), "approved").unwrap();

        let mut config = SearchConfig::new(["approved"], [dir.path()]);
        config.file_types = vec!["*.pdf".into()];

        let output = search(&config).unwrap();
        assert!(output.results.is_empty());
        assert!(output.errors.is_empty());
        assert_eq!(output.files_searched, 0);
    }

    #[test]
    fn test_with_reader_plugs_external_family() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("scan.pdf"), "%PDF").unwrap();
        fs::write(dir.path().join("notes.txt"), "approved").unwrap();

        let reader = CountingReader::default();
        let calls = reader.calls.clone();
        let mut config = SearchConfig::new(["approved"], [dir.path()]);
        config.file_types = vec!["*.pdf".into()];

        let output = Searcher::new(config)
            .unwrap()
            .with_reader(ExtractorKind::Pdf, reader)
            .search();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(output.results.len(), 1);
        assert_eq!(output.results[0].path, dir.path().join("scan.pdf"));
    }

    #[test]
    fn test_invalid_pattern_fails_before_scanning() {
        let dir = tempdir().unwrap();
        let err = Searcher::new(SearchConfig::new(["fn("], [dir.path()])).unwrap_err();
        assert!(matches!(err, SearchError::InvalidPattern(_)));

        let mut config = SearchConfig::new(["fn("], [dir.path()]);
        config.fixed = true;
        assert!(Searcher::new(config).is_ok());
    }

    #[test]
    fn test_overlapping_roots_report_each_file_once() {
        let dir = tempdir().unwrap();
        fs::create_dir(dir.path().join("nested")).unwrap();
        fs::write(dir.path().join("nested/a.txt"), "needle").unwrap();

        let roots = [dir.path().to_path_buf(), dir.path().join("nested")];
        let config = SearchConfig::new(["needle"], roots);
        let output = search(&config).unwrap();
        assert_eq!(output.total_matches, 1);
        assert_eq!(output.files_searched, 1);
    }

    #[test]
    fn test_generic_type_does_not_shadow_document_type() {
        let dir = tempdir().unwrap();
        let file = fs::File::create(dir.path().join("report.odp")).unwrap();
        let mut writer = zip::ZipWriter::new(file);
        writer
            .start_file("content.xml", zip::write::SimpleFileOptions::default())
            .unwrap();
        std::io::Write::write_all(&mut writer, b"<text:p>budget approved</text:p>").unwrap();
        writer.finish().unwrap();

        let mut config = SearchConfig::new(["approved"], [dir.path()]);
        config.file_types = vec!["*.odp".into()];
        let alone = search(&config).unwrap();

        config.file_types = vec!["*.odp".into(), "*".into()];
        let together = search(&config).unwrap();

        assert_eq!(alone.total_matches, 1);
        assert_eq!(together.results, alone.results);
        assert_eq!(together.files_searched, 1);
    }

    #[test]
    fn test_missing_root_is_a_config_error() {
        let dir = tempdir().unwrap();
        let err = search(&SearchConfig::new(["x"], [dir.path().join("missing")])).unwrap_err();
        assert!(matches!(err, SearchError::ConfigError(_)));
    }
}
