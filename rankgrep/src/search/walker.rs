use glob::Pattern;
use ignore::WalkBuilder;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, trace, warn};

use crate::config::{SearchConfig, WalkErrorPolicy};
use crate::errors::{SearchError, SearchResult};
use crate::filters::{compile_ignore_patterns, should_include_file};

/// Produces the list of files a search reads.
pub trait FileSource {
    fn walk(&self, root: &Path) -> SearchResult<Vec<PathBuf>>;
}

/// Depth-first recursive walker over a directory tree.
///
/// Entries within each directory are visited in file-name order, so the
/// output is the same on every platform. Only regular files are returned:
/// directories, sockets, FIFOs and devices are never yielded. Symbolic links
/// are skipped unless `follow_links` is set.
#[derive(Debug, Clone, Default)]
pub struct DirectoryWalker {
    follow_links: bool,
    walk_errors: WalkErrorPolicy,
    file_extensions: Option<Vec<String>>,
    ignore_patterns: Vec<Pattern>,
}

impl DirectoryWalker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: &SearchConfig) -> Self {
        Self {
            follow_links: config.follow_links,
            walk_errors: config.walk_errors,
            file_extensions: config.file_extensions.clone(),
            ignore_patterns: compile_ignore_patterns(&config.ignore_patterns),
        }
    }

    pub fn follow_links(mut self, yes: bool) -> Self {
        self.follow_links = yes;
        self
    }

    pub fn walk_errors(mut self, policy: WalkErrorPolicy) -> Self {
        self.walk_errors = policy;
        self
    }

    fn include(&self, root: &Path, path: &Path) -> bool {
        let relative = path.strip_prefix(root).unwrap_or(path);
        should_include_file(relative, &self.file_extensions, &self.ignore_patterns)
    }
}

impl FileSource for DirectoryWalker {
    fn walk(&self, root: &Path) -> SearchResult<Vec<PathBuf>> {
        let metadata = fs::metadata(root).map_err(|e| SearchError::filesystem(root, e))?;
        if !metadata.is_dir() {
            return Err(SearchError::filesystem(
                root,
                io::Error::new(io::ErrorKind::Other, "not a directory"),
            ));
        }
        // A root that cannot be listed is fatal whatever the walk-error policy
        fs::read_dir(root).map_err(|e| SearchError::filesystem(root, e))?;

        debug!("Scanning directory: {}", root.display());

        let mut builder = WalkBuilder::new(root);
        builder
            .standard_filters(false)
            .follow_links(self.follow_links)
            .sort_by_file_name(|a, b| a.cmp(b));

        let mut files = Vec::new();
        for result in builder.build() {
            let entry = match result {
                Ok(entry) => entry,
                Err(err) if self.follow_links && is_dangling_link(&err) => {
                    debug!("Skipping broken symlink: {}", err);
                    continue;
                }
                Err(err) => match self.walk_errors {
                    WalkErrorPolicy::Abort => {
                        return Err(SearchError::filesystem(root, walk_error_to_io(err)));
                    }
                    WalkErrorPolicy::Skip => {
                        warn!("Skipping unreadable entry: {}", err);
                        continue;
                    }
                },
            };

            let Some(file_type) = entry.file_type() else {
                // Only stdin has no file type
                continue;
            };

            if file_type.is_file() {
                if self.include(root, entry.path()) {
                    trace!("Adding file: {}", entry.path().display());
                    files.push(entry.into_path());
                } else {
                    trace!("Filtered out: {}", entry.path().display());
                }
            } else if file_type.is_symlink() {
                debug!("Not following symlink: {}", entry.path().display());
            } else if !file_type.is_dir() {
                debug!("Skipping special file: {}", entry.path().display());
            }
        }

        debug!("Found {} files under {}", files.len(), root.display());
        Ok(files)
    }
}

/// Path an `ignore` error refers to, looking through depth and line wrappers
fn error_path(err: &ignore::Error) -> Option<&Path> {
    match err {
        ignore::Error::WithPath { path, .. } => Some(path.as_path()),
        ignore::Error::WithDepth { err, .. } | ignore::Error::WithLineNumber { err, .. } => {
            error_path(err)
        }
        _ => None,
    }
}

/// A link that exists but whose target does not
fn is_dangling_link(err: &ignore::Error) -> bool {
    let Some(path) = error_path(err) else {
        return false;
    };
    let is_link = fs::symlink_metadata(path)
        .map(|m| m.file_type().is_symlink())
        .unwrap_or(false);
    is_link && fs::metadata(path).is_err()
}

fn walk_error_to_io(err: ignore::Error) -> io::Error {
    let kind = err
        .io_error()
        .map(|e| e.kind())
        .unwrap_or(io::ErrorKind::Other);
    io::Error::new(kind, err.to_string())
}

/// Walks `root` with default options: every regular file, no symlinks,
/// abort on the first listing error.
pub fn walk(root: &Path) -> SearchResult<Vec<PathBuf>> {
    DirectoryWalker::new().walk(root)
}
