pub mod config;
pub mod errors;
pub mod filters;
pub mod results;
pub mod search;

pub use config::{MatchMode, SearchConfig, WalkErrorPolicy};
pub use errors::{SearchError, SearchResult};
pub use results::{CollectingReporter, MatchEvent, Reporter, ScanSummary, WriterReporter};
pub use search::{search, search_with_cancel};
