use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// One occurrence of the pattern within a file
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MatchEntry {
    /// The exact matched substring
    pub text: String,
    /// 1-based line number, lines delimited by `\n`
    pub line: usize,
    /// 1-based column, counted in characters from the start of the line
    pub column: usize,
    /// Byte offset of the match start within the line
    pub start: usize,
    /// Byte offset one past the match end within the line
    pub end: usize,
}

/// A file with at least one match
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileMatch {
    /// Root-anchored path to the file
    pub path: PathBuf,
    /// Matches in (line, column) order
    pub matches: Vec<MatchEntry>,
    /// Modification time captured from the handle the content was read from
    pub last_modified: SystemTime,
}

impl FileMatch {
    /// Path relative to `root`, falling back to the full path when the file is
    /// not under `root`
    pub fn relative_path(&self, root: &Path) -> &Path {
        self.path.strip_prefix(root).unwrap_or(&self.path)
    }
}

/// A file that could not be read or decoded
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedFile {
    pub path: PathBuf,
    pub reason: String,
}

/// Ranked output of one search
#[derive(Debug, Clone, Default, Serialize)]
pub struct SearchReport {
    /// Matched files, most recently modified first
    pub file_matches: Vec<FileMatch>,
    /// Total number of matches found
    pub total_matches: usize,
    /// Total number of files read and matched, with or without hits
    pub files_searched: usize,
    /// Total number of files with matches
    pub files_with_matches: usize,
    /// Files that could not be read
    pub skipped: Vec<SkippedFile>,
}

impl SearchReport {
    /// Creates a new empty report
    pub fn new() -> Self {
        Default::default()
    }

    /// Records a file that was read and matched. `None` counts as searched
    /// without adding a result.
    pub fn add_file_result(&mut self, file_match: Option<FileMatch>) {
        self.files_searched += 1;
        if let Some(file_match) = file_match {
            if file_match.matches.is_empty() {
                return;
            }
            self.total_matches += file_match.matches.len();
            self.files_with_matches += 1;
            self.file_matches.push(file_match);
        }
    }

    /// Records a file that could not be read
    pub fn add_skipped(&mut self, path: impl Into<PathBuf>, reason: impl Into<String>) {
        self.skipped.push(SkippedFile {
            path: path.into(),
            reason: reason.into(),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.file_matches.is_empty()
    }
}
