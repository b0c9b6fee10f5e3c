use memchr::memmem::Finder;
use regex::bytes::Regex;

use crate::config::{MatchMode, SearchConfig};
use crate::errors::{SearchError, SearchResult};

/// Strategy for pattern matching
enum MatchStrategy {
    Literal(Finder<'static>),
    Regex(Regex),
}

/// Finds pattern occurrences inside a byte window.
///
/// Literal mode restarts one byte past each hit, so overlapping occurrences
/// are all found (`"aa"` in `"aaaa"` yields 0, 1, 2). Regex mode returns the
/// engine's non-overlapping spans.
pub struct PatternMatcher {
    strategy: MatchStrategy,
    pattern_len: usize,
}

impl PatternMatcher {
    /// Compiles the pattern from a configuration
    pub fn from_config(config: &SearchConfig) -> SearchResult<Self> {
        Self::new(&config.pattern, config.mode)
    }

    /// Compiles a pattern for the given mode
    pub fn new(pattern: &str, mode: MatchMode) -> SearchResult<Self> {
        if pattern.is_empty() {
            return Err(SearchError::invalid_pattern("pattern must not be empty"));
        }
        let strategy = match mode {
            MatchMode::Literal => {
                MatchStrategy::Literal(Finder::new(pattern.as_bytes()).into_owned())
            }
            MatchMode::Regex => MatchStrategy::Regex(
                Regex::new(pattern).map_err(|e| SearchError::invalid_pattern(e.to_string()))?,
            ),
        };
        Ok(Self {
            strategy,
            pattern_len: pattern.len(),
        })
    }

    /// Suffix length the scanner must retain between chunks so that an
    /// occurrence starting near the end of one window can complete in the
    /// next. Sized from the pattern text; a regex occurrence longer than
    /// this that straddles a boundary is not detectable.
    pub fn boundary_overlap(&self) -> usize {
        self.pattern_len.saturating_sub(1)
    }

    /// All match spans in `window` as half-open `(start, end)` byte ranges,
    /// in increasing start order
    pub fn find_spans(&self, window: &[u8]) -> Vec<(usize, usize)> {
        match &self.strategy {
            MatchStrategy::Literal(finder) => {
                let mut spans = Vec::new();
                let mut from = 0;
                while let Some(idx) = finder.find(&window[from..]) {
                    let start = from + idx;
                    spans.push((start, start + self.pattern_len));
                    from = start + 1;
                }
                spans
            }
            MatchStrategy::Regex(regex) => {
                regex.find_iter(window).map(|m| (m.start(), m.end())).collect()
            }
        }
    }
}
