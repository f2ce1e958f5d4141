use regex::Regex;
use tracing::debug;

use crate::errors::{SearchError, SearchResult};

/// Compiled search pattern.
///
/// Holds no search position: every call to [`PatternMatcher::find_matches`]
/// starts from the beginning of the line it is given.
#[derive(Debug, Clone)]
pub struct PatternMatcher {
    regex: Regex,
}

impl PatternMatcher {
    /// Compiles `pattern`. Fails with [`SearchError::InvalidPattern`] on bad
    /// syntax or an empty pattern.
    pub fn new(pattern: &str) -> SearchResult<Self> {
        if pattern.is_empty() {
            return Err(SearchError::invalid_pattern("empty pattern"));
        }
        debug!("Compiling regex pattern: {}", pattern);
        let regex = Regex::new(pattern).map_err(|e| SearchError::invalid_pattern(e.to_string()))?;
        Ok(Self { regex })
    }

    /// Finds all non-overlapping matches in `line` as byte ranges, left to
    /// right.
    ///
    /// Each search resumes at the end of the previous match. After an empty
    /// match the cursor steps over one character so the loop always advances.
    pub fn find_matches(&self, line: &str) -> Vec<(usize, usize)> {
        let mut matches = Vec::new();
        let mut offset = 0;

        while offset <= line.len() {
            let Some(m) = self.regex.find_at(line, offset) else {
                break;
            };
            matches.push((m.start(), m.end()));

            offset = if m.is_empty() {
                match line[m.end()..].chars().next() {
                    Some(c) => m.end() + c.len_utf8(),
                    None => break,
                }
            } else {
                m.end()
            };
        }

        matches
    }
}
