use memmap2::Mmap;
use std::borrow::Cow;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::{trace, warn};

use super::matcher::PatternMatcher;
use crate::config::{EncodingMode, LineEndingMode};
use crate::errors::{SearchError, SearchResult};
use crate::metrics::SearchMetrics;
use crate::results::{FileMatch, MatchEntry};

pub(crate) const MMAP_THRESHOLD: u64 = 10 * 1024 * 1024; // 10MB

/// Decodes `bytes` according to `encoding_mode`. Valid UTF-8 is borrowed, so
/// a mapped file is never copied.
fn decode_bytes<'a>(
    bytes: &'a [u8],
    path: &Path,
    encoding_mode: EncodingMode,
) -> SearchResult<Cow<'a, str>> {
    match encoding_mode {
        EncodingMode::FailFast => std::str::from_utf8(bytes)
            .map(Cow::Borrowed)
            .map_err(|e| SearchError::encoding_error(path, e)),
        EncodingMode::Lossy => {
            let text = String::from_utf8_lossy(bytes);
            // Owned means at least one invalid sequence was replaced
            if let Cow::Owned(_) = text {
                warn!("Invalid UTF-8 replaced in file: {}", path.display());
            }
            Ok(text)
        }
    }
}

/// Reads a file and turns its content into a [`FileMatch`]
#[derive(Debug, Clone)]
pub struct FileProcessor {
    matcher: PatternMatcher,
    metrics: SearchMetrics,
    encoding_mode: EncodingMode,
    line_endings: LineEndingMode,
}

impl FileProcessor {
    pub fn new(
        matcher: PatternMatcher,
        encoding_mode: EncodingMode,
        line_endings: LineEndingMode,
    ) -> Self {
        Self::with_metrics(matcher, encoding_mode, line_endings, SearchMetrics::new())
    }

    pub fn with_metrics(
        matcher: PatternMatcher,
        encoding_mode: EncodingMode,
        line_endings: LineEndingMode,
        metrics: SearchMetrics,
    ) -> Self {
        Self {
            matcher,
            metrics,
            encoding_mode,
            line_endings,
        }
    }

    pub fn metrics(&self) -> &SearchMetrics {
        &self.metrics
    }

    /// Processes a file and returns its matches, or `None` when nothing
    /// matched.
    ///
    /// The modification time comes from the same open handle the content is
    /// read through, so ranking never re-stats the file.
    pub fn process_file(&self, path: &Path) -> SearchResult<Option<FileMatch>> {
        trace!("Processing file: {}", path.display());

        let file = File::open(path).map_err(|e| SearchError::from_io(path, e))?;
        let metadata = file.metadata().map_err(|e| SearchError::from_io(path, e))?;
        let last_modified = metadata
            .modified()
            .map_err(|e| SearchError::from_io(path, e))?;

        let size = metadata.len();
        self.metrics.record_read(size);

        let matches = if size >= MMAP_THRESHOLD {
            let mmap = self.map_file(&file, path)?;
            self.match_bytes(&mmap, path)?
        } else {
            let bytes = self.read_buffered(file, path, size)?;
            self.match_bytes(&bytes, path)?
        };

        if matches.is_empty() {
            trace!("No matches in {}", path.display());
            return Ok(None);
        }

        trace!("Found {} matches in {}", matches.len(), path.display());
        Ok(Some(FileMatch {
            path: path.to_path_buf(),
            matches,
            last_modified,
        }))
    }

    fn read_buffered(&self, mut file: File, path: &Path, size: u64) -> SearchResult<Vec<u8>> {
        let mut bytes = Vec::with_capacity(size as usize);
        file.read_to_end(&mut bytes)
            .map_err(|e| SearchError::from_io(path, e))?;
        Ok(bytes)
    }

    fn map_file(&self, file: &File, path: &Path) -> SearchResult<Mmap> {
        // SAFETY: the mapping is only sound while no other process truncates
        // the file. On Unix, touching pages past a new end of file raises
        // SIGBUS and kills the process. The map is dropped as soon as this
        // file has been matched, so the exposure is limited to that window.
        unsafe { Mmap::map(file) }.map_err(|e| SearchError::from_io(path, e))
    }

    fn match_bytes(&self, bytes: &[u8], path: &Path) -> SearchResult<Vec<MatchEntry>> {
        let contents = decode_bytes(bytes, path, self.encoding_mode)?;
        Ok(self.match_lines(&contents))
    }

    /// Splits on `\n` and matches each line. A trailing `\n` yields a final
    /// empty line, which is searched like any other.
    pub fn match_lines(&self, contents: &str) -> Vec<MatchEntry> {
        let mut entries = Vec::new();

        for (index, raw_line) in contents.split('\n').enumerate() {
            let line = match self.line_endings {
                LineEndingMode::Preserve => raw_line,
                LineEndingMode::TrimCr => raw_line.strip_suffix('\r').unwrap_or(raw_line),
            };

            // Columns are counted incrementally from the previous match
            let mut cursor = 0;
            let mut column = 1;
            for (start, end) in self.matcher.find_matches(line) {
                column += line[cursor..start].chars().count();
                cursor = start;
                entries.push(MatchEntry {
                    text: line[start..end].to_string(),
                    line: index + 1,
                    column,
                    start,
                    end,
                });
            }
        }

        entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::{self, File};
    use std::io::Write;
    use tempfile::tempdir;

    fn processor(pattern: &str) -> FileProcessor {
        FileProcessor::new(
            PatternMatcher::new(pattern).unwrap(),
            EncodingMode::FailFast,
            LineEndingMode::Preserve,
        )
    }

    #[test]
    fn test_line_and_column_numbers() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("a.txt");
        fs::write(&file_path, "foo\nbar foo\n").unwrap();

        let result = processor("foo").process_file(&file_path).unwrap().unwrap();
        assert_eq!(result.path, file_path);
        assert_eq!(
            result.matches,
            vec![
                MatchEntry {
                    text: "foo".to_string(),
                    line: 1,
                    column: 1,
                    start: 0,
                    end: 3,
                },
                MatchEntry {
                    text: "foo".to_string(),
                    line: 2,
                    column: 5,
                    start: 4,
                    end: 7,
                },
            ]
        );
        assert_eq!(
            result.last_modified,
            fs::metadata(&file_path).unwrap().modified().unwrap()
        );
    }

    #[test]
    fn test_no_matches_returns_none() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("b.txt");
        fs::write(&file_path, "baz\n").unwrap();

        assert!(processor("foo").process_file(&file_path).unwrap().is_none());
    }

    #[test]
    fn test_multiple_matches_per_line_in_order() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("many.txt");
        let mut file = File::create(&file_path).unwrap();

        let line = "This is a test line with pattern_123 and another pattern_456\n";
        for _ in 0..1000 {
            file.write_all(line.as_bytes()).unwrap();
        }

        let result = processor(r"pattern_\d+")
            .process_file(&file_path)
            .unwrap()
            .unwrap();
        assert_eq!(result.matches.len(), 2000);

        let first = &result.matches[0];
        assert_eq!((first.line, first.column, first.text.as_str()), (1, 26, "pattern_123"));
        let last = &result.matches[1999];
        assert_eq!((last.line, last.column, last.text.as_str()), (1000, 50, "pattern_456"));

        for pair in result.matches.windows(2) {
            assert!(
                (pair[0].line, pair[0].column) < (pair[1].line, pair[1].column),
                "matches must be strictly ordered by (line, column)"
            );
        }
    }

    #[test]
    fn test_column_counts_characters() {
        let p = processor("foo");
        let matches = p.match_lines("ééé foo");
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].column, 5);
        assert_eq!(matches[0].start, 7);
    }

    #[test]
    fn test_carriage_return_preserved_by_default() {
        let p = processor(r"end\r");
        let matches = p.match_lines("the end\r\nno end");
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].text, "end\r");
        assert_eq!(matches[0].line, 1);
    }

    #[test]
    fn test_trim_cr_mode() {
        let p = FileProcessor::new(
            PatternMatcher::new(r"end$").unwrap(),
            EncodingMode::FailFast,
            LineEndingMode::TrimCr,
        );
        let matches = p.match_lines("the end\r\nno end");
        assert_eq!(matches.len(), 2);
        assert_eq!((matches[0].line, matches[0].column), (1, 5));
        assert_eq!((matches[1].line, matches[1].column), (2, 4));
    }

    #[test]
    fn test_trailing_empty_line_is_indexed() {
        let p = processor("^$");
        // "a\n" splits into "a" and a trailing empty line
        let matches = p.match_lines("a\n");
        assert_eq!(matches.len(), 1);
        assert_eq!((matches[0].line, matches[0].column), (2, 1));
    }

    #[test]
    fn test_invalid_utf8_failfast() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("bad.txt");
        fs::write(&file_path, b"foo \xff\xfe bar").unwrap();

        let err = processor("foo").process_file(&file_path).unwrap_err();
        assert!(matches!(err, SearchError::EncodingError { .. }));
        assert!(err.is_per_file());
    }

    #[test]
    fn test_invalid_utf8_lossy() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("bad.txt");
        fs::write(&file_path, b"\xff foo").unwrap();

        let p = FileProcessor::new(
            PatternMatcher::new("foo").unwrap(),
            EncodingMode::Lossy,
            LineEndingMode::Preserve,
        );
        let result = p.process_file(&file_path).unwrap().unwrap();
        assert_eq!(result.matches.len(), 1);
        // The replacement character counts as one column
        assert_eq!(result.matches[0].column, 3);
    }

    #[test]
    fn test_missing_file() {
        let dir = tempdir().unwrap();
        let err = processor("foo")
            .process_file(&dir.path().join("gone.txt"))
            .unwrap_err();
        assert!(matches!(err, SearchError::FileNotFound(_)));
    }

    #[test]
    fn test_metrics_record_reads() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("a.txt");
        fs::write(&file_path, "12345").unwrap();

        let p = processor("3");
        p.process_file(&file_path).unwrap();
        let stats = p.metrics().get_stats();
        assert_eq!(stats.in_memory_reads, 1);
        assert_eq!(stats.bytes_read, 5);
    }

    #[test]
    fn test_long_line_columns() {
        let p = processor("a");
        let line = "a".repeat(200_000);
        let matches = p.match_lines(&line);
        assert_eq!(matches.len(), 200_000);
        assert_eq!(matches[0].column, 1);
        assert_eq!(matches[199_999].column, 200_000);
        assert!(matches.iter().enumerate().all(|(i, m)| m.column == i + 1));

        // Multi-byte characters between matches still count as one column
        let line = "é-a".repeat(50_000);
        let matches = p.match_lines(&line);
        assert_eq!(matches.len(), 50_000);
        assert_eq!((matches[1].column, matches[1].start), (6, 7));
        assert_eq!(matches[49_999].column, 150_000);
    }

    fn write_large_file(path: &Path, tail: &[u8]) {
        let mut file = File::create(path).unwrap();
        file.write_all(b"first needle\n").unwrap();
        let filler = format!("{}\n", "x".repeat(1023));
        for _ in 0..(MMAP_THRESHOLD / 1024) {
            file.write_all(filler.as_bytes()).unwrap();
        }
        file.write_all(tail).unwrap();
    }

    #[test]
    fn test_large_file_is_memory_mapped() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("large.txt");
        write_large_file(&file_path, b"last   needle");
        assert!(fs::metadata(&file_path).unwrap().len() >= MMAP_THRESHOLD);

        let p = processor("needle");
        let result = p.process_file(&file_path).unwrap().unwrap();
        let last_line = MMAP_THRESHOLD as usize / 1024 + 2;
        let positions: Vec<(usize, usize)> =
            result.matches.iter().map(|m| (m.line, m.column)).collect();
        assert_eq!(positions, vec![(1, 7), (last_line, 8)]);

        let stats = p.metrics().get_stats();
        assert_eq!(stats.mmap_reads, 1);
        assert_eq!(stats.in_memory_reads, 0);
    }

    #[test]
    fn test_large_file_invalid_utf8_failfast() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("large_bad.txt");
        write_large_file(&file_path, b"needle \xff");

        let p = processor("needle");
        let err = p.process_file(&file_path).unwrap_err();
        assert!(matches!(err, SearchError::EncodingError { .. }));
        assert_eq!(p.metrics().get_stats().mmap_reads, 1);
    }
}
