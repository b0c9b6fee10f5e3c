use std::io::Write;
use std::path::PathBuf;
use std::sync::Mutex;

/// A single pattern occurrence: file path plus the absolute byte offset of
/// the occurrence within that file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchEvent {
    /// The file the occurrence was found in
    pub path: PathBuf,
    /// Byte offset of the occurrence start, relative to the whole file
    pub offset: u64,
}

/// Sink for matches as they are discovered.
///
/// Workers report concurrently, so implementations must make each call one
/// atomic emission. Ordering across files is not guaranteed; within one file
/// events arrive in increasing offset order.
pub trait Reporter: Send + Sync {
    fn report(&self, event: MatchEvent);
}

/// Writes one `<path> matched <offset>` line per event to the wrapped stream
pub struct WriterReporter<W: Write + Send> {
    out: Mutex<W>,
}

impl<W: Write + Send> WriterReporter<W> {
    pub fn new(out: W) -> Self {
        Self {
            out: Mutex::new(out),
        }
    }

    /// Consumes the reporter and returns the wrapped stream
    pub fn into_inner(self) -> W {
        self.out.into_inner().unwrap_or_else(|e| e.into_inner())
    }
}

impl<W: Write + Send> Reporter for WriterReporter<W> {
    fn report(&self, event: MatchEvent) {
        if let Ok(mut out) = self.out.lock() {
            // A closed pipe is not worth failing the scan over
            let _ = writeln!(out, "{} matched {}", event.path.display(), event.offset);
        }
    }
}

/// Buffers events in memory; the sink used by tests and by callers that want
/// the full result set rather than streaming output
#[derive(Debug, Default)]
pub struct CollectingReporter {
    events: Mutex<Vec<MatchEvent>>,
}

impl CollectingReporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of the events reported so far
    pub fn events(&self) -> Vec<MatchEvent> {
        self.events.lock().map(|e| e.clone()).unwrap_or_default()
    }
}

impl Reporter for CollectingReporter {
    fn report(&self, event: MatchEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }
}

/// Aggregate counters for one search run
#[derive(Debug, Clone, Default)]
pub struct ScanSummary {
    /// Files scanned to completion (or to the byte limit)
    pub files_scanned: usize,
    /// Files abandoned by the encoding gate
    pub files_skipped: usize,
    /// Total matches reported across all files
    pub total_matches: usize,
    /// Per-file failures, isolated from the rest of the run
    pub file_errors: Vec<(PathBuf, String)>,
    /// Enumeration failures recorded under the `Skip` policy
    pub walk_errors: Vec<String>,
}

impl ScanSummary {
    /// Creates a new empty summary
    pub fn new() -> Self {
        Default::default()
    }

    /// Merges a worker's partial summary into this one
    pub fn merge(&mut self, other: ScanSummary) {
        self.files_scanned += other.files_scanned;
        self.files_skipped += other.files_skipped;
        self.total_matches += other.total_matches;
        self.file_errors.extend(other.file_errors);
        self.walk_errors.extend(other.walk_errors);
    }

    /// True when any walk or per-file failure was recorded
    pub fn has_errors(&self) -> bool {
        !self.file_errors.is_empty() || !self.walk_errors.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_writer_reporter_line_format() {
        let reporter = WriterReporter::new(Vec::new());
        reporter.report(MatchEvent {
            path: PathBuf::from("a.txt"),
            offset: 2,
        });
        reporter.report(MatchEvent {
            path: PathBuf::from("b/c.txt"),
            offset: 40,
        });

        let out = String::from_utf8(reporter.into_inner()).unwrap();
        assert_eq!(out, "a.txt matched 2\nb/c.txt matched 40\n");
    }

    #[test]
    fn test_collecting_reporter() {
        let reporter = CollectingReporter::new();
        assert!(reporter.events().is_empty());

        let event = MatchEvent {
            path: PathBuf::from("a.txt"),
            offset: 0,
        };
        reporter.report(event.clone());
        assert_eq!(reporter.events(), vec![event]);
    }

    #[test]
    fn test_summary_merge() {
        let mut summary = ScanSummary::new();
        summary.files_scanned = 2;
        summary.total_matches = 3;

        let mut partial = ScanSummary::new();
        partial.files_scanned = 1;
        partial.files_skipped = 1;
        partial.total_matches = 4;
        partial
            .file_errors
            .push((PathBuf::from("bad.txt"), "Permission denied".to_string()));

        summary.merge(partial);
        assert_eq!(summary.files_scanned, 3);
        assert_eq!(summary.files_skipped, 1);
        assert_eq!(summary.total_matches, 7);
        assert_eq!(summary.file_errors.len(), 1);
        assert!(summary.has_errors());
    }

    #[test]
    fn test_empty_summary_has_no_errors() {
        assert!(!ScanSummary::new().has_errors());
    }
}
