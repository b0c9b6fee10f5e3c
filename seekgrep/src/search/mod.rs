//! The concurrent scanning engine: the walker enumerates candidate files
//! onto a task stream, a fixed pool of workers pulls paths off it, and each
//! worker runs the chunked scanner over one file at a time.

pub mod engine;
pub mod matcher;
pub mod scanner;
pub mod walker;

pub use engine::{search, search_with_cancel};
pub use matcher::PatternMatcher;
pub use scanner::{FileOutcome, FileScanner};
