use dashmap::DashMap;
use once_cell::sync::Lazy;
use regex::{Regex, RegexBuilder};
use std::path::Path;
use std::sync::Arc;
use tracing::trace;

use crate::errors::{SearchError, SearchResult};
use crate::results::{FileResult, MatchLocation};

const SIMPLE_PATTERN_THRESHOLD: usize = 32;
const SNIPPET_RADIUS: usize = 60;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey {
    pattern: String,
    options: MatchOptions,
}

static PATTERN_CACHE: Lazy<DashMap<CacheKey, MatchStrategy>> = Lazy::new(DashMap::new);

/// How search strings are interpreted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct MatchOptions {
    pub case_sensitive: bool,
    /// Treat the search string as a literal, even if it contains metacharacters
    pub fixed: bool,
}

/// Strategy for pattern matching
#[derive(Debug, Clone)]
pub enum MatchStrategy {
    Literal(Arc<str>),
    Regex(Arc<Regex>),
}

impl MatchStrategy {
    fn compile(pattern: &str, options: MatchOptions) -> SearchResult<Self> {
        if options.case_sensitive && (options.fixed || is_simple_pattern(pattern)) {
            return Ok(Self::Literal(Arc::from(pattern)));
        }

        let source = if options.fixed {
            regex::escape(pattern)
        } else {
            pattern.to_string()
        };
        let regex = RegexBuilder::new(&source)
            .case_insensitive(!options.case_sensitive)
            .build()
            .map_err(|e| SearchError::invalid_pattern(format!("'{}': {}", pattern, e)))?;
        Ok(Self::Regex(Arc::new(regex)))
    }

    /// Byte span of the first match
    pub fn find(&self, text: &str) -> Option<(usize, usize)> {
        match self {
            Self::Literal(needle) => text
                .find(needle.as_ref())
                .map(|start| (start, start + needle.len())),
            Self::Regex(regex) => regex.find(text).map(|m| (m.start(), m.end())),
        }
    }
}

/// Determines if a pattern reads the same as a regex and as a literal
fn is_simple_pattern(pattern: &str) -> bool {
    pattern.len() < SIMPLE_PATTERN_THRESHOLD
        && !pattern.contains(|c: char| c.is_ascii_punctuation() && c != '_' && c != '-')
}

/// One configured search string, compiled
#[derive(Debug, Clone)]
pub struct SearchTerm {
    text: String,
    strategy: MatchStrategy,
}

impl SearchTerm {
    pub fn new(text: impl Into<String>, options: MatchOptions) -> SearchResult<Self> {
        let text = text.into();
        let key = CacheKey {
            pattern: text.clone(),
            options,
        };
        let strategy = if let Some(entry) = PATTERN_CACHE.get(&key) {
            entry.clone()
        } else {
            let strategy = MatchStrategy::compile(&text, options)?;
            PATTERN_CACHE.insert(key, strategy.clone());
            strategy
        };
        Ok(Self { text, strategy })
    }

    /// The search string as configured
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn strategy(&self) -> &MatchStrategy {
        &self.strategy
    }

    /// Matches one text unit, producing at most one result.
    ///
    /// In list-only mode the result carries only the file identity.
    pub fn evaluate(
        &self,
        text: &str,
        path: &Path,
        location: &MatchLocation,
        list_only: bool,
    ) -> Option<FileResult> {
        let (start, end) = self.strategy.find(text)?;
        trace!(
            "'{}' matched {} at {:?}",
            self.text,
            path.display(),
            location
        );

        if list_only {
            return Some(FileResult::file_only(path, self.text.clone()));
        }
        if matches!(location, MatchLocation::File | MatchLocation::Binary) {
            return Some(FileResult {
                location: location.clone(),
                ..FileResult::file_only(path, self.text.clone())
            });
        }

        let context = match location {
            MatchLocation::Line(_) => text.trim_end_matches(['\r', '\n']).to_string(),
            _ => snippet(text, start, end),
        };
        Some(FileResult {
            path: path.to_path_buf(),
            search_string: self.text.clone(),
            location: location.clone(),
            span: Some((start, end)),
            context: Some(context),
        })
    }
}

/// All search strings of a run, in configured order
#[derive(Debug, Clone)]
pub struct PatternMatcher {
    terms: Vec<SearchTerm>,
}

impl PatternMatcher {
    /// Compiles every search string, failing on the first invalid pattern
    pub fn new<S: AsRef<str>>(search_strings: &[S], options: MatchOptions) -> SearchResult<Self> {
        let terms = search_strings
            .iter()
            .map(|s| SearchTerm::new(s.as_ref(), options))
            .collect::<SearchResult<Vec<_>>>()?;
        Ok(Self { terms })
    }

    pub fn terms(&self) -> &[SearchTerm] {
        &self.terms
    }

    /// Evaluates every search string against one text unit
    pub fn evaluate(
        &self,
        text: &str,
        path: &Path,
        location: &MatchLocation,
        list_only: bool,
    ) -> Vec<FileResult> {
        self.terms
            .iter()
            .filter_map(|term| term.evaluate(text, path, location, list_only))
            .collect()
    }
}

/// Up to `SNIPPET_RADIUS` bytes either side of the match, on char boundaries
fn snippet(text: &str, start: usize, end: usize) -> String {
    let mut from = start.saturating_sub(SNIPPET_RADIUS);
    while !text.is_char_boundary(from) {
        from -= 1;
    }
    let mut to = (end + SNIPPET_RADIUS).min(text.len());
    while !text.is_char_boundary(to) {
        to += 1;
    }
    text[from..to].split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    const INSENSITIVE: MatchOptions = MatchOptions {
        case_sensitive: false,
        fixed: false,
    };

    fn line() -> MatchLocation {
        MatchLocation::Line(3)
    }

    fn is_match(term: &SearchTerm, text: &str) -> bool {
        term.evaluate(text, Path::new("a.txt"), &line(), false).is_some()
    }

    #[test]
    fn test_case_insensitive_matching() {
        let term = SearchTerm::new("Foo", INSENSITIVE).unwrap();
        assert!(is_match(&term, "a foo here"));
        assert!(is_match(&term, "FOO"));
        assert!(is_match(&term, "fOo"));
        assert!(!is_match(&term, "fo o"));
    }

    #[test]
    fn test_case_sensitive_matching() {
        let options = MatchOptions {
            case_sensitive: true,
            fixed: false,
        };
        let term = SearchTerm::new("Foo", options).unwrap();
        assert!(matches!(term.strategy(), MatchStrategy::Literal(_)));
        assert!(is_match(&term, "Foo"));
        assert!(!is_match(&term, "foo"));
    }

    #[test]
    fn test_fixed_treats_metacharacters_literally() {
        let fixed = MatchOptions {
            case_sensitive: false,
            fixed: true,
        };
        let term = SearchTerm::new("a.b", fixed).unwrap();
        assert!(!is_match(&term, "axb"));
        assert!(is_match(&term, "A.B"));

        let pattern = SearchTerm::new("a.b", INSENSITIVE).unwrap();
        assert!(is_match(&pattern, "axb"));
    }

    #[test]
    fn test_fixed_accepts_invalid_regex_syntax() {
        let fixed = MatchOptions {
            case_sensitive: true,
            fixed: true,
        };
        let term = SearchTerm::new("fn(", fixed).unwrap();
        assert!(is_match(&term, "call fn(x)"));

        let err = SearchTerm::new("fn(", INSENSITIVE).unwrap_err();
        assert!(matches!(err, SearchError::InvalidPattern(_)));
    }

    #[test]
    fn test_evaluate_line_result() {
        let term = SearchTerm::new("approved", INSENSITIVE).unwrap();
        let result = term
            .evaluate("budget APPROVED today\n", Path::new("notes.txt"), &line(), false)
            .unwrap();
        assert_eq!(result.path, Path::new("notes.txt"));
        assert_eq!(result.search_string, "approved");
        assert_eq!(result.location, MatchLocation::Line(3));
        assert_eq!(result.span, Some((7, 15)));
        assert_eq!(result.context.as_deref(), Some("budget APPROVED today"));
    }

    #[test]
    fn test_evaluate_entry_result_uses_snippet() {
        let term = SearchTerm::new("approved", INSENSITIVE).unwrap();
        let xml = format!(
            "{}<text:p>budget   approved</text:p>{}",
            "x".repeat(200),
            "y".repeat(200)
        );
        let entry = MatchLocation::Entry("content.xml".to_string());
        let result = term
            .evaluate(&xml, Path::new("report.odp"), &entry, false)
            .unwrap();
        let context = result.context.unwrap();
        assert!(context.contains("budget approved"));
        assert!(context.len() < xml.len());
        assert_eq!(result.location, entry);
    }

    #[test]
    fn test_evaluate_list_only_and_no_match() {
        let term = SearchTerm::new("approved", INSENSITIVE).unwrap();
        let result = term
            .evaluate("approved", Path::new("a.txt"), &line(), true)
            .unwrap();
        assert!(result.is_file_only());
        assert_eq!(result.context, None);

        assert!(term
            .evaluate("rejected", Path::new("a.txt"), &line(), false)
            .is_none());
    }

    #[test]
    fn test_evaluate_whole_file_units_keep_their_location() {
        let term = SearchTerm::new("approved", INSENSITIVE).unwrap();
        let blob = Path::new("blob.dat");
        let binary = term
            .evaluate("\0approved\0", blob, &MatchLocation::Binary, false)
            .unwrap();
        assert_eq!(binary.location, MatchLocation::Binary);
        assert_eq!(binary.context, None);

        let whole = term
            .evaluate("approved", Path::new("scan.pdf"), &MatchLocation::File, false)
            .unwrap();
        assert_eq!(whole.location, MatchLocation::File);

        let listed = term
            .evaluate("approved", blob, &MatchLocation::Binary, true)
            .unwrap();
        assert_eq!(listed.location, MatchLocation::File);
    }

    #[test]
    fn test_snippet_respects_char_boundaries() {
        let text = format!("{}match{}", "é".repeat(50), "ü".repeat(50));
        let start = text.find("match").unwrap();
        let s = snippet(&text, start, start + 5);
        assert!(s.contains("match"));
    }

    #[test]
    fn test_pattern_matcher_evaluates_each_term() {
        let matcher =
            PatternMatcher::new(&["budget", "approved", "missing"], INSENSITIVE).unwrap();
        assert_eq!(matcher.terms().len(), 3);
        let results = matcher.evaluate("Budget approved", Path::new("a.txt"), &line(), false);
        let strings: Vec<_> = results.iter().map(|r| r.search_string.as_str()).collect();
        assert_eq!(strings, vec!["budget", "approved"]);
    }

    #[test]
    fn test_pattern_cache_reuses_compiled_strategy() {
        let unique = format!(
            "cache_probe_{}",
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap()
                .as_nanos()
        );
        let first = SearchTerm::new(unique.clone(), INSENSITIVE).unwrap();
        let second = SearchTerm::new(unique, INSENSITIVE).unwrap();
        match (first.strategy(), second.strategy()) {
            (MatchStrategy::Regex(a), MatchStrategy::Regex(b)) => assert!(Arc::ptr_eq(a, b)),
            _ => panic!("expected regex strategies"),
        }
    }

    #[test]
    fn test_is_simple_pattern() {
        assert!(is_simple_pattern("test"));
        assert!(is_simple_pattern("hello_world"));
        assert!(!is_simple_pattern(r"\btest\w+"));
        assert!(!is_simple_pattern("test.*pattern"));
    }
}
