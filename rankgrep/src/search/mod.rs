//! Regex content search over a directory tree.
//!
//! A search runs in four steps:
//!
//! 1. **Compile**: the pattern becomes a [`PatternMatcher`]. A bad pattern
//!    fails here, before any file is touched.
//! 2. **Walk**: a [`FileSource`] (normally [`DirectoryWalker`]) lists every
//!    regular file under the root, depth first, in file-name order.
//! 3. **Match**: a [`FileProcessor`] reads each file on a rayon pool, splits it
//!    on `\n` and records every non-overlapping match with its line and
//!    column. Files that cannot be read are skipped, not fatal.
//! 4. **Rank**: matched files are stably sorted by modification time, newest
//!    first.
//!
//! ```rust,no_run
//! use rankgrep::{search, SearchConfig};
//!
//! let report = search(&SearchConfig::new("TODO|FIXME", "."))?;
//! for file in &report.file_matches {
//!     println!("{}: {} matches", file.path.display(), file.matches.len());
//! }
//! # Ok::<(), rankgrep::SearchError>(())
//! ```
pub mod engine;
pub mod matcher;
pub mod processor;
pub mod ranker;
pub mod walker;

pub use engine::{search, search_with};
pub use matcher::PatternMatcher;
pub use processor::FileProcessor;
pub use ranker::rank;
pub use walker::{walk, DirectoryWalker, FileSource};
