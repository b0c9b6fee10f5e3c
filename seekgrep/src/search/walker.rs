use crossbeam_channel::Sender;
use glob::Pattern;
use ignore::WalkBuilder;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{trace, warn};

use crate::config::{SearchConfig, WalkErrorPolicy};
use crate::errors::{SearchError, SearchResult};
use crate::filters;

/// Enumerates candidate files under every configured root, in the order the
/// roots were given, and pushes each one onto the task stream.
///
/// A root that is not a directory is a single task of its own and bypasses
/// the exclude globs; the user named it explicitly. Directory roots are
/// walked depth-first, one level deep unless `recursive` is set, with plain
/// filesystem semantics (hidden files included, no ignore-file handling).
///
/// Returns the walk failures tolerated under [`WalkErrorPolicy::Skip`];
/// under `Abort` the first failure ends the run.
pub fn enumerate(
    config: &SearchConfig,
    excludes: &[Pattern],
    tasks: &Sender<PathBuf>,
    cancel: &AtomicBool,
) -> SearchResult<Vec<String>> {
    let mut failures = Vec::new();

    for root in &config.roots {
        if cancel.load(Ordering::Relaxed) {
            break;
        }

        let metadata = match std::fs::symlink_metadata(root) {
            Ok(metadata) => metadata,
            Err(err) => match config.walk_errors {
                WalkErrorPolicy::Abort => return Err(SearchError::from_io(root, err)),
                WalkErrorPolicy::Skip => {
                    warn!("cannot read root {}: {}", root.display(), err);
                    failures.push(format!("{}: {}", root.display(), err));
                    continue;
                }
            },
        };

        if !metadata.is_dir() {
            if tasks.send(root.clone()).is_err() {
                // Workers are gone; nothing left to feed.
                return Ok(failures);
            }
            continue;
        }

        let max_depth = if config.recursive { None } else { Some(1) };
        let mut builder = WalkBuilder::new(root);
        builder
            .standard_filters(false)
            .follow_links(false)
            .max_depth(max_depth);
        if !excludes.is_empty() {
            let excludes = excludes.to_vec();
            builder.filter_entry(move |entry| !filters::is_excluded(entry.path(), &excludes));
        }

        for entry in builder.build() {
            if cancel.load(Ordering::Relaxed) {
                return Ok(failures);
            }
            match entry {
                Ok(entry) if entry.file_type().is_some_and(|ft| ft.is_file()) => {
                    trace!("queueing {}", entry.path().display());
                    if tasks.send(entry.into_path()).is_err() {
                        return Ok(failures);
                    }
                }
                Ok(_) => {} // directories and other non-file entries
                Err(err) => match config.walk_errors {
                    WalkErrorPolicy::Abort => return Err(err.into()),
                    WalkErrorPolicy::Skip => {
                        warn!("skipping unreadable entry: {err}");
                        failures.push(err.to_string());
                    }
                },
            }
        }
    }

    Ok(failures)
}
