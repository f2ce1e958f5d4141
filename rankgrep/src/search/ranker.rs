use crate::results::FileMatch;

/// Orders files by modification time, newest first. The sort is stable, so
/// files with equal timestamps keep their incoming (walk) order.
pub fn rank(file_matches: &mut [FileMatch]) {
    file_matches.sort_by(|a, b| b.last_modified.cmp(&a.last_modified));
}
