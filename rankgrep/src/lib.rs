pub mod cancel;
pub mod config;
pub mod errors;
pub mod filters;
pub mod metrics;
pub mod results;
pub mod search;

pub use cancel::CancellationFlag;
pub use config::{EncodingMode, LineEndingMode, SearchConfig, WalkErrorPolicy};
pub use errors::{SearchError, SearchResult};
pub use results::{FileMatch, MatchEntry, SearchReport, SkippedFile};
pub use search::{search, search_with};
