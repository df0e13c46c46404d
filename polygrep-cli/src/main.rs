use clap::Parser;
use colored::Colorize;
use polygrep::{
    BinaryFilesMode, FileResult, MatchLocation, SearchConfig, SearchError, SearchOutput, Searcher,
};
use std::collections::BTreeSet;
use std::io;
use std::num::NonZeroUsize;
use std::path::PathBuf;
use tracing::debug;
use tracing_subscriber::EnvFilter;

type Result<T> = std::result::Result<T, SearchError>;

/// Search for strings inside text files, office documents and archives
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Strings to search for
    search_strings: Vec<String>,

    /// Directory to search (can be specified multiple times)
    #[arg(short = 'p', long = "path", default_value = ".")]
    paths: Vec<PathBuf>,

    /// File types to search, e.g. "*.pdf" (repeatable or comma separated)
    #[arg(short = 't', long = "type", value_delimiter = ',')]
    file_types: Vec<String>,

    /// Extensions to leave out of auto-detection, e.g. "*.log"
    #[arg(short = 's', long = "skip")]
    skip: Vec<String>,

    /// Log each file type and directory as it is searched
    #[arg(short, long)]
    verbose: bool,

    /// Do not print per-file errors
    #[arg(long)]
    ignore_errors: bool,

    /// How to treat binary files (binary|text|without-match)
    #[arg(long, default_value = "binary")]
    binary_files: BinaryFilesMode,

    /// Match case exactly
    #[arg(short = 'c', long)]
    case_sensitive: bool,

    /// Treat search strings as literal text, not patterns
    #[arg(short = 'F', long)]
    fixed: bool,

    /// Honor the .gitignore of the first root that has one
    #[arg(long)]
    respect_gitignore: bool,

    /// Print only the names of matching files
    #[arg(short = 'l', long = "files-with-matches")]
    files_with_matches: bool,

    /// Number of worker threads per extractor
    #[arg(short = 'j', long)]
    threads: Option<NonZeroUsize>,

    /// Print results as JSON
    #[arg(long)]
    json: bool,

    /// Show only statistics, not matches
    #[arg(long)]
    stats: bool,

    /// Configuration file to load
    #[arg(long)]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "warn")]
    log_level: String,
}

fn main() -> Result<()> {
    run()
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli);

    let file_config = match SearchConfig::load_from(cli.config.as_deref()) {
        Ok(config) => config,
        // An explicit --config that cannot be read is fatal
        Err(e) if cli.config.is_some() => return Err(SearchError::config_error(e.to_string())),
        Err(e) => {
            debug!("Ignoring configuration files: {}", e);
            SearchConfig::default()
        }
    };

    let cli_config = SearchConfig {
        search_strings: cli.search_strings,
        file_types: cli.file_types,
        root_paths: cli.paths,
        skip_patterns: cli.skip,
        verbose: cli.verbose,
        ignore_errors: cli.ignore_errors,
        binary_files: cli.binary_files,
        case_sensitive: cli.case_sensitive,
        fixed: cli.fixed,
        respect_gitignore: cli.respect_gitignore,
        list_only: cli.files_with_matches,
        thread_count: cli.threads.unwrap_or(file_config.thread_count),
        log_level: cli.log_level,
    };
    let config = file_config.merge_with_cli(cli_config);

    let ignore_errors = config.ignore_errors;
    let list_only = config.list_only;
    let searcher = Searcher::new(config)?;
    let output = searcher.search();

    if cli.json {
        let json = serde_json::to_string_pretty(&output).map_err(io::Error::from)?;
        println!("{}", json);
    } else if cli.stats {
        print_stats(&output);
    } else {
        print_results(&output, list_only);
    }

    if !ignore_errors {
        print_errors(&output);
    }
    Ok(())
}

fn init_logging(cli: &Cli) {
    let level = if cli.verbose && cli.log_level == "warn" {
        "info"
    } else {
        cli.log_level.as_str()
    };
    // RUST_LOG takes precedence over the command line
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .init();
}

fn print_results(output: &SearchOutput, list_only: bool) {
    if list_only {
        let paths: BTreeSet<_> = output.results.iter().map(|r| &r.path).collect();
        for path in paths {
            println!("{}", path.display());
        }
        return;
    }

    for result in &output.results {
        print_result(result);
    }
}

fn print_result(result: &FileResult) {
    println!("{}", format_result(result));
}

fn format_result(result: &FileResult) -> String {
    let path = result.path.display().to_string();
    let context = result.context.as_deref().unwrap_or_default();
    match &result.location {
        MatchLocation::Binary => format!("Binary file {} matches", path),
        MatchLocation::File => format!("{}: {}", path.blue(), result.search_string),
        MatchLocation::Line(line) => format!(
            "{}:{}:{}",
            path.blue(),
            line.to_string().green(),
            context
        ),
        MatchLocation::Entry(entry) => format!("{}[{}]: {}", path.blue(), entry.yellow(), context),
    }
}

fn print_stats(output: &SearchOutput) {
    println!(
        "Searched {} files of {} types",
        output.files_searched,
        output.file_types.len()
    );
    println!(
        "Found {} matches in {} files",
        output.total_matches, output.files_with_matches
    );
    if !output.errors.is_empty() {
        println!("{} files could not be searched", output.errors.len());
    }
}

fn print_errors(output: &SearchOutput) {
    for error in &output.errors {
        eprintln!("{} {}", "error:".red(), error);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(location: MatchLocation, context: Option<&str>) -> FileResult {
        FileResult {
            path: PathBuf::from("docs/report.pdf"),
            search_string: "approved".to_string(),
            location,
            span: None,
            context: context.map(String::from),
        }
    }

    #[test]
    fn test_format_result_by_location() {
        colored::control::set_override(false);

        assert_eq!(
            format_result(&result(MatchLocation::File, None)),
            "docs/report.pdf: approved"
        );
        assert_eq!(
            format_result(&result(MatchLocation::Binary, None)),
            "Binary file docs/report.pdf matches"
        );
        assert_eq!(
            format_result(&result(MatchLocation::Line(4), Some("budget approved"))),
            "docs/report.pdf:4:budget approved"
        );
        assert_eq!(
            format_result(&result(
                MatchLocation::Entry("content.xml".to_string()),
                Some("<p>approved</p>")
            )),
            "docs/report.pdf[content.xml]: <p>approved</p>"
        );
    }
}
