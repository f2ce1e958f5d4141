mod report;

use anyhow::{bail, Context};
use clap::Parser;
use rankgrep::{
    search::{search_with, DirectoryWalker},
    CancellationFlag, EncodingMode, LineEndingMode, SearchConfig, SearchError, WalkErrorPolicy,
};
use std::io::{self, IsTerminal, Write};
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

const USAGE_EXIT: u8 = 2;
const CANCELLED_EXIT: u8 = 130;

#[derive(Parser, Debug)]
#[command(name = "rankgrep", author, version, about, long_about = None)]
struct Cli {
    /// Regular expression to search for
    pattern: Option<String>,

    /// Root directory to search in (defaults to the current directory)
    #[arg(short = 'd', long)]
    root: Option<PathBuf>,

    /// File extensions to include (e.g. rs,go,js)
    #[arg(short = 'e', long)]
    extensions: Option<String>,

    /// Patterns to ignore (glob format, relative to the root)
    #[arg(short, long)]
    ignore: Vec<String>,

    /// Number of threads to use
    #[arg(short = 'j', long)]
    threads: Option<NonZeroUsize>,

    /// Configuration file to load on top of the default locations
    #[arg(long)]
    config: Option<PathBuf>,

    /// How to handle invalid UTF-8 sequences (failfast|lossy)
    #[arg(long, default_value = "failfast")]
    encoding: String,

    /// How to treat a trailing carriage return on each line (preserve|trim-cr)
    #[arg(long, default_value = "preserve")]
    line_endings: String,

    /// What to do when a directory cannot be listed (abort|skip)
    #[arg(long, default_value = "abort")]
    on_walk_error: String,

    /// Follow symbolic links
    #[arg(long)]
    follow_links: bool,

    /// Print the report as JSON
    #[arg(long)]
    json: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long)]
    log_level: Option<String>,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let pattern = match cli.pattern.as_deref() {
        Some(p) if !p.is_empty() => p.to_string(),
        _ => {
            eprintln!("Please provide a query to search.");
            return ExitCode::from(USAGE_EXIT);
        }
    };

    match run(cli, pattern) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            if let Some(SearchError::Cancelled) = err.downcast_ref::<SearchError>() {
                eprintln!("Search cancelled");
                return ExitCode::from(CANCELLED_EXIT);
            }
            eprintln!("Error: {:#}", err);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli, pattern: String) -> anyhow::Result<()> {
    let cwd = std::env::current_dir().context("Cannot determine current directory")?;

    let file_config = SearchConfig::load_from(cli.config.as_deref())
        .map_err(|e| SearchError::config_error(e.to_string()))?;

    let config = build_config(&cli, pattern, file_config, &cwd)?;
    init_logging(&config.log_level);
    debug!("Effective configuration: {:?}", config);

    let cancel = CancellationFlag::new();
    install_interrupt_handler(&cancel);

    let walker = DirectoryWalker::from_config(&config);
    let report = search_with(&walker, &config, &cancel)?;

    let stdout = io::stdout();
    let color = stdout.is_terminal();
    let mut out = stdout.lock();
    if cli.json {
        report::write_json(&mut out, &report)?;
    } else {
        report::write_report(&mut out, &report, &config.root_path, color)?;
    }
    out.flush()?;

    if !report.skipped.is_empty() {
        eprintln!("{} file(s) could not be read", report.skipped.len());
    }
    Ok(())
}

/// Merges CLI values over the loaded configuration and anchors the root at
/// `cwd`.
fn build_config(
    cli: &Cli,
    pattern: String,
    file_config: SearchConfig,
    cwd: &Path,
) -> anyhow::Result<SearchConfig> {
    let encoding_mode = match cli.encoding.to_lowercase().as_str() {
        "failfast" => EncodingMode::FailFast,
        "lossy" => EncodingMode::Lossy,
        other => bail!(SearchError::config_error(format!(
            "Unknown encoding mode '{}'",
            other
        ))),
    };

    let line_endings = match cli.line_endings.to_lowercase().as_str() {
        "preserve" => LineEndingMode::Preserve,
        "trim-cr" => LineEndingMode::TrimCr,
        other => bail!(SearchError::config_error(format!(
            "Unknown line ending mode '{}'",
            other
        ))),
    };

    let walk_errors = match cli.on_walk_error.to_lowercase().as_str() {
        "abort" => WalkErrorPolicy::Abort,
        "skip" => WalkErrorPolicy::Skip,
        other => bail!(SearchError::config_error(format!(
            "Unknown walk error policy '{}'",
            other
        ))),
    };

    let file_extensions = cli.extensions.as_ref().map(|e| {
        e.split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
    });

    let thread_count = cli.threads.unwrap_or(file_config.thread_count);

    let cli_config = SearchConfig {
        pattern,
        root_path: cli.root.clone().unwrap_or_else(|| PathBuf::from(".")),
        file_extensions,
        ignore_patterns: cli.ignore.clone(),
        thread_count,
        log_level: cli
            .log_level
            .clone()
            .unwrap_or_else(|| file_config.log_level.clone()),
        encoding_mode,
        line_endings,
        walk_errors,
        follow_links: cli.follow_links,
    };

    let mut config = file_config.merge_with_cli(cli_config);
    config.root_path = if config.root_path == Path::new(".") {
        cwd.to_path_buf()
    } else if config.root_path.is_relative() {
        cwd.join(&config.root_path)
    } else {
        config.root_path
    };
    Ok(config)
}

fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

/// First Ctrl+C asks the search to stop; a second one terminates immediately.
fn install_interrupt_handler(cancel: &CancellationFlag) {
    use signal_hook::consts::SIGINT;

    let flag = cancel.as_atomic();
    let registered = signal_hook::flag::register_conditional_shutdown(
        SIGINT,
        i32::from(CANCELLED_EXIT),
        flag.clone(),
    )
    .and_then(|_| signal_hook::flag::register(SIGINT, flag));

    if let Err(e) = registered {
        warn!("Cannot install interrupt handler: {}", e);
    }
}
