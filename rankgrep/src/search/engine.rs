use rayon::prelude::*;
use std::path::PathBuf;
use tracing::{debug, info, warn};

use super::matcher::PatternMatcher;
use super::processor::FileProcessor;
use super::ranker::rank;
use super::walker::{DirectoryWalker, FileSource};
use crate::cancel::CancellationFlag;
use crate::config::SearchConfig;
use crate::errors::{SearchError, SearchResult};
use crate::metrics::SearchMetrics;
use crate::results::{FileMatch, SearchReport};

const MIN_CHUNK_SIZE: usize = 16;
const MAX_CHUNK_SIZE: usize = 256;

/// Searches every file under `config.root_path` and ranks the matches
pub fn search(config: &SearchConfig) -> SearchResult<SearchReport> {
    search_with(
        &DirectoryWalker::from_config(config),
        config,
        &CancellationFlag::new(),
    )
}

/// Runs a search over the files `source` yields.
///
/// The pattern is compiled before `source` is consulted, so an invalid
/// pattern never touches the filesystem. Files are read on a pool of
/// `config.thread_count` threads; results are gathered in walk order before
/// the stable recency sort, which keeps the output identical to a sequential
/// run.
pub fn search_with<S>(
    source: &S,
    config: &SearchConfig,
    cancel: &CancellationFlag,
) -> SearchResult<SearchReport>
where
    S: FileSource + ?Sized,
{
    info!("Starting search with pattern: {}", config.pattern);

    let matcher = PatternMatcher::new(&config.pattern)?;
    let metrics = SearchMetrics::new();
    let processor = FileProcessor::with_metrics(
        matcher,
        config.encoding_mode,
        config.line_endings,
        metrics.clone(),
    );

    if cancel.is_cancelled() {
        return Err(SearchError::Cancelled);
    }

    let files = source.walk(&config.root_path)?;
    metrics.record_walk(files.len());
    debug!("Found {} files to process", files.len());

    if cancel.is_cancelled() {
        return Err(SearchError::Cancelled);
    }

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(config.thread_count.get())
        .build()
        .map_err(|e| SearchError::config_error(format!("Cannot start worker pool: {}", e)))?;

    let chunk_size =
        (files.len() / config.thread_count.get()).clamp(MIN_CHUNK_SIZE, MAX_CHUNK_SIZE);

    let outcomes: Vec<(PathBuf, SearchResult<Option<FileMatch>>)> = pool.install(|| {
        files
            .par_chunks(chunk_size)
            .flat_map_iter(|chunk| {
                chunk.iter().map(|path| {
                    let outcome = if cancel.is_cancelled() {
                        Err(SearchError::Cancelled)
                    } else {
                        processor.process_file(path)
                    };
                    (path.clone(), outcome)
                })
            })
            .collect()
    });

    let mut report = SearchReport::new();
    for (path, outcome) in outcomes {
        match outcome {
            Ok(file_match) => {
                metrics.record_searched(file_match.is_some());
                report.add_file_result(file_match);
            }
            Err(e) if e.is_per_file() => {
                warn!("Skipping {}: {}", path.display(), e);
                metrics.record_skipped();
                report.add_skipped(path, e.to_string());
            }
            Err(e) => return Err(e),
        }
    }

    rank(&mut report.file_matches);

    metrics.log_stats();
    info!(
        "Search complete. Found {} matches in {} files",
        report.total_matches, report.files_with_matches
    );

    Ok(report)
}
