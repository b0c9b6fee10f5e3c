use crossbeam_channel::bounded;
use std::path::PathBuf;
use std::sync::atomic::AtomicBool;
use std::thread;
use tracing::{debug, info, warn};

use super::matcher::PatternMatcher;
use super::scanner::{FileOutcome, FileScanner};
use super::walker;
use crate::config::SearchConfig;
use crate::errors::{SearchError, SearchResult};
use crate::filters;
use crate::results::{Reporter, ScanSummary};

/// Runs a search to completion, streaming matches into `reporter`.
/// Returns once the task stream has drained and every worker has exited,
/// so all output has been emitted by then.
pub fn search(config: &SearchConfig, reporter: &dyn Reporter) -> SearchResult<ScanSummary> {
    let cancel = AtomicBool::new(false);
    search_with_cancel(config, reporter, &cancel)
}

/// Like [`search`], with a cooperative cancellation flag checked by the
/// walker per entry and by the scanner between chunks
pub fn search_with_cancel(
    config: &SearchConfig,
    reporter: &dyn Reporter,
    cancel: &AtomicBool,
) -> SearchResult<ScanSummary> {
    // Configuration problems are fatal before any scanning starts.
    let matcher = PatternMatcher::from_config(config)?;
    let excludes = filters::compile_excludes(&config.exclude)?;

    let workers = config.threads.get();
    info!(
        "searching {} root(s) with {} worker(s)",
        config.roots.len(),
        workers
    );

    // Rendezvous channel: the walker hands each path directly to a worker
    // and never runs far ahead of consumption. Dropping the sender closes
    // the stream, and drained workers exit.
    let (tx, rx) = bounded::<PathBuf>(0);

    let (walk_result, partials) = thread::scope(|scope| {
        let matcher = &matcher;
        let buffer_size = config.buffer_size.get();
        let max_file_bytes = config.max_file_bytes;

        let handles: Vec<_> = (0..workers)
            .map(|id| {
                let rx = rx.clone();
                scope.spawn(move || {
                    let scanner = FileScanner::new(matcher, buffer_size, max_file_bytes);
                    let mut local = ScanSummary::new();
                    for path in rx {
                        match scanner.scan_file(&path, reporter, cancel) {
                            Ok(FileOutcome::Scanned { matches }) => {
                                local.files_scanned += 1;
                                local.total_matches += matches;
                            }
                            Ok(FileOutcome::SkippedBinary) => {
                                local.files_skipped += 1;
                            }
                            Err(err) => {
                                // One unreadable file must not take down the
                                // rest of the run.
                                warn!("failed to scan {}: {}", path.display(), err);
                                local.file_errors.push((path, err.to_string()));
                            }
                        }
                    }
                    debug!("worker {id} finished");
                    local
                })
            })
            .collect();
        drop(rx);

        // The walker runs on the owning thread; production and consumption
        // overlap through the channel.
        let walk_result = walker::enumerate(config, &excludes, &tx, cancel);
        drop(tx);

        let partials: Vec<_> = handles
            .into_iter()
            .map(|handle| {
                handle
                    .join()
                    .map_err(|_| SearchError::pool_failure("worker thread panicked"))
            })
            .collect();
        (walk_result, partials)
    });

    let mut summary = ScanSummary::new();
    for partial in partials {
        summary.merge(partial?);
    }
    summary.walk_errors = walk_result?;

    info!(
        "search complete: {} match(es) in {} file(s), {} skipped",
        summary.total_matches, summary.files_scanned, summary.files_skipped
    );
    Ok(summary)
}
