use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, trace};

use super::matcher::PatternMatcher;
use crate::errors::{SearchError, SearchResult};
use crate::results::{MatchEvent, Reporter};

/// Extra retained bytes so a UTF-8 sequence split by a read boundary stays
/// intact; no encoded character is longer than four bytes.
const UTF8_MARGIN: usize = 3;

/// Terminal state of one file's scan
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileOutcome {
    /// The file was scanned to the end, or to the configured byte limit
    Scanned { matches: usize },
    /// The file failed the encoding gate and was abandoned
    SkippedBinary,
}

/// Streams one file at a time in fixed-size chunks, retaining a window
/// suffix across reads so occurrences that straddle a chunk boundary are
/// still seen. The window buffer is refilled by shifting the retained
/// suffix to the front in place; it is not reallocated per chunk.
///
/// Carried bytes are searched again in the next window. At most one
/// occurrence can start at a given byte, so re-finds are filtered by
/// tracking the lowest not-yet-reported offset per file.
///
/// Every window must be valid UTF-8 before it is searched, apart from an
/// in-progress multi-byte sequence at its very end. Anything else
/// classifies the file as binary and abandons the scan, as does a file
/// that ends mid-sequence.
pub struct FileScanner<'a> {
    matcher: &'a PatternMatcher,
    buffer_size: usize,
    max_file_bytes: Option<u64>,
}

impl<'a> FileScanner<'a> {
    pub fn new(
        matcher: &'a PatternMatcher,
        buffer_size: usize,
        max_file_bytes: Option<u64>,
    ) -> Self {
        Self {
            matcher,
            buffer_size,
            max_file_bytes,
        }
    }

    /// Scans `path`, reporting every occurrence with its absolute byte
    /// offset. Errors are scoped to this file; the caller decides whether
    /// they affect anything else.
    pub fn scan_file(
        &self,
        path: &Path,
        reporter: &dyn Reporter,
        cancel: &AtomicBool,
    ) -> SearchResult<FileOutcome> {
        trace!("scanning {}", path.display());

        let mut file = File::open(path).map_err(|e| SearchError::from_io(path, e))?;

        let overlap = self.matcher.boundary_overlap();
        let mut window: Vec<u8> = Vec::with_capacity(overlap + UTF8_MARGIN + self.buffer_size);
        // Window layout: carry (suffix of the previous window) + fresh chunk.
        let mut carry_len = 0usize;
        // Absolute file offset of window[0].
        let mut consumed = 0u64;
        // Bytes taken from the file so far, for the byte limit.
        let mut total_read = 0u64;
        // Lowest absolute offset not reported yet.
        let mut next_emit = 0u64;
        let mut incomplete_tail = false;
        let mut matches = 0usize;

        loop {
            if cancel.load(Ordering::Relaxed) {
                trace!("scan of {} cancelled", path.display());
                break;
            }

            let budget = match self.max_file_bytes {
                Some(limit) => limit.saturating_sub(total_read).min(self.buffer_size as u64) as usize,
                None => self.buffer_size,
            };
            if budget == 0 {
                debug!("byte limit reached for {}", path.display());
                break;
            }

            window.resize(carry_len + budget, 0);
            let n = file.read(&mut window[carry_len..])?;
            window.truncate(carry_len + n);
            if n == 0 {
                if incomplete_tail {
                    debug!("skipping binary file {} (truncated sequence)", path.display());
                    return Ok(FileOutcome::SkippedBinary);
                }
                break;
            }
            total_read += n as u64;

            // Encoding gate, before any matching: dangling bytes at the end
            // of the window are an in-progress sequence and complete on the
            // next read; an invalid sequence anywhere else means binary.
            let valid_len = match std::str::from_utf8(&window) {
                Ok(_) => window.len(),
                Err(err) if err.error_len().is_none() => err.valid_up_to(),
                Err(_) => {
                    debug!("skipping binary file {}", path.display());
                    return Ok(FileOutcome::SkippedBinary);
                }
            };
            incomplete_tail = valid_len < window.len();

            for (start, _end) in self.matcher.find_spans(&window) {
                let offset = consumed + start as u64;
                // Starts below next_emit were reported from a previous
                // window (a carried occurrence, possibly since extended by
                // a greedy regex).
                if offset < next_emit {
                    continue;
                }
                next_emit = offset + 1;
                matches += 1;
                reporter.report(MatchEvent {
                    path: path.to_path_buf(),
                    offset,
                });
            }

            // Retain a suffix long enough for a straddling occurrence to
            // complete next window, moved back onto a character boundary.
            let mut cut = window.len().saturating_sub(overlap).min(valid_len);
            while cut > 0 && cut < valid_len && (window[cut] & 0xC0) == 0x80 {
                cut -= 1;
            }

            consumed += cut as u64;
            window.copy_within(cut.., 0);
            let tail = window.len() - cut;
            window.truncate(tail);
            carry_len = tail;
        }

        Ok(FileOutcome::Scanned { matches })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MatchMode;
    use crate::results::CollectingReporter;
    use std::path::PathBuf;
    use tempfile::tempdir;

    fn scan(
        content: &[u8],
        pattern: &str,
        mode: MatchMode,
        buffer_size: usize,
        max_file_bytes: Option<u64>,
    ) -> (FileOutcome, Vec<u64>) {
        let dir = tempdir().unwrap();
        let path = dir.path().join("input.txt");
        std::fs::write(&path, content).unwrap();

        let matcher = PatternMatcher::new(pattern, mode).unwrap();
        let scanner = FileScanner::new(&matcher, buffer_size, max_file_bytes);
        let reporter = CollectingReporter::new();
        let cancel = AtomicBool::new(false);

        let outcome = scanner.scan_file(&path, &reporter, &cancel).unwrap();
        let offsets = reporter.events().iter().map(|e| e.offset).collect();
        (outcome, offsets)
    }

    /// Reference search: every occurrence in the whole content at once,
    /// including overlapping ones.
    fn reference_offsets(content: &[u8], pattern: &[u8]) -> Vec<u64> {
        (0..=content.len().saturating_sub(pattern.len()))
            .filter(|&i| &content[i..i + pattern.len()] == pattern)
            .map(|i| i as u64)
            .collect()
    }

    #[test]
    fn test_match_spanning_chunk_boundary() {
        // 7 bytes, buffer 4: "foo" is split across the two reads.
        let (outcome, offsets) = scan(b"xxfooyy", "foo", MatchMode::Literal, 4, None);
        assert_eq!(outcome, FileOutcome::Scanned { matches: 1 });
        assert_eq!(offsets, vec![2]);
    }

    #[test]
    fn test_overlapping_occurrences_across_chunks() {
        let (outcome, offsets) = scan(b"aaaa", "aa", MatchMode::Literal, 2, None);
        assert_eq!(outcome, FileOutcome::Scanned { matches: 3 });
        assert_eq!(offsets, vec![0, 1, 2]);
    }

    #[test]
    fn test_small_file_matches_reference_search() {
        let content = b"abc abca cabcabc abc";
        let expected = reference_offsets(content, b"abc");
        for buffer_size in [1, 2, 3, 5, 7, 64] {
            let (_, offsets) = scan(content, "abc", MatchMode::Literal, buffer_size, None);
            assert_eq!(offsets, expected, "buffer_size={buffer_size}");
        }
    }

    #[test]
    fn test_regex_straddling_greedy_match_reported_once() {
        let (outcome, offsets) = scan(b"xx1234yy56", r"\d+", MatchMode::Regex, 4, None);
        assert_eq!(outcome, FileOutcome::Scanned { matches: 2 });
        // "1234" straddles the first read boundary; re-finding its extended
        // form in the next window must not report offset 2 again.
        assert_eq!(offsets, vec![2, 8]);
    }

    #[test]
    fn test_binary_file_skipped_despite_literal_hit() {
        let mut content = b"foo".to_vec();
        content.extend_from_slice(&[0xFF, 0xFE, 0x00]);
        let (outcome, offsets) = scan(&content, "foo", MatchMode::Literal, 64, None);
        assert_eq!(outcome, FileOutcome::SkippedBinary);
        assert!(offsets.is_empty());
    }

    #[test]
    fn test_truncated_utf8_tail_is_binary() {
        // "é" is 0xC3 0xA9; drop the continuation byte.
        let (outcome, offsets) = scan(b"ok\xC3", "ok", MatchMode::Literal, 64, None);
        assert_eq!(outcome, FileOutcome::SkippedBinary);
        // The first window was valid on its own, so the hit streamed out
        // before the truncation was visible.
        assert_eq!(offsets, vec![0]);
    }

    #[test]
    fn test_multibyte_char_split_by_read_boundary() {
        // "héllo wörld" with buffer sizes that cut through the two-byte
        // characters; neither a false binary skip nor a missed match.
        let content = "héllo wörld".as_bytes();
        for buffer_size in [1, 2, 3, 4, 5] {
            let (outcome, offsets) = scan(content, "wörld", MatchMode::Literal, buffer_size, None);
            assert_eq!(
                outcome,
                FileOutcome::Scanned { matches: 1 },
                "buffer_size={buffer_size}"
            );
            assert_eq!(offsets, vec![7], "buffer_size={buffer_size}");
        }
    }

    #[test]
    fn test_byte_limit_stops_reading() {
        let (outcome, offsets) = scan(b"foo bar foo", "foo", MatchMode::Literal, 4, Some(6));
        assert_eq!(outcome, FileOutcome::Scanned { matches: 1 });
        assert_eq!(offsets, vec![0]);
    }

    #[test]
    fn test_empty_file() {
        let (outcome, offsets) = scan(b"", "foo", MatchMode::Literal, 4, None);
        assert_eq!(outcome, FileOutcome::Scanned { matches: 0 });
        assert!(offsets.is_empty());
    }

    #[test]
    fn test_pattern_longer_than_buffer() {
        let (outcome, offsets) = scan(b"xxlongpatternxx", "longpattern", MatchMode::Literal, 3, None);
        assert_eq!(outcome, FileOutcome::Scanned { matches: 1 });
        assert_eq!(offsets, vec![2]);
    }

    #[test]
    fn test_missing_file_is_per_file_error() {
        let matcher = PatternMatcher::new("foo", MatchMode::Literal).unwrap();
        let scanner = FileScanner::new(&matcher, 16, None);
        let reporter = CollectingReporter::new();
        let cancel = AtomicBool::new(false);

        let result = scanner.scan_file(&PathBuf::from("does/not/exist"), &reporter, &cancel);
        assert!(matches!(result, Err(SearchError::FileNotFound(_))));
    }

    #[test]
    fn test_cancel_stops_scan() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("input.txt");
        std::fs::write(&path, b"foo foo foo").unwrap();

        let matcher = PatternMatcher::new("foo", MatchMode::Literal).unwrap();
        let scanner = FileScanner::new(&matcher, 4, None);
        let reporter = CollectingReporter::new();
        let cancel = AtomicBool::new(true);

        let outcome = scanner.scan_file(&path, &reporter, &cancel).unwrap();
        assert_eq!(outcome, FileOutcome::Scanned { matches: 0 });
        assert!(reporter.events().is_empty());
    }
}
