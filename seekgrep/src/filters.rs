use glob::Pattern;
use std::path::Path;

use crate::errors::{SearchError, SearchResult};

/// Compiles the configured exclude globs, rejecting malformed patterns
/// before any scanning starts
pub fn compile_excludes(patterns: &[String]) -> SearchResult<Vec<Pattern>> {
    patterns
        .iter()
        .map(|p| {
            Pattern::new(p).map_err(|source| SearchError::InvalidGlob {
                pattern: p.clone(),
                source,
            })
        })
        .collect()
}

/// Checks whether a path matches any exclude glob. Both the full normalized
/// path and the bare file name are tested, so `*.md` works without a leading
/// `**/`.
pub fn is_excluded(path: &Path, excludes: &[Pattern]) -> bool {
    if excludes.is_empty() {
        return false;
    }
    let normalized = path.to_string_lossy().replace('\\', "/");
    excludes.iter().any(|pattern| {
        pattern.matches(&normalized)
            || path
                .file_name()
                .and_then(|name| name.to_str())
                .is_some_and(|name| pattern.matches(name))
    })
}
