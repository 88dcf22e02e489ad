//! Empty directory pruning.
//!
//! Step 3 of the post-build pipeline. Conversion leaves directories behind
//! (an `about/` that only held `index.html`), and the renderer may create
//! directories that end up holding nothing. This step removes them.
//!
//! ## Traversal
//!
//! Children are visited before their parent, so a chain of directories that
//! only becomes empty once its leaves are gone is removed in a single pass:
//!
//! ```text
//! build/
//! └── a/            removed third (empty once b/ is gone)
//!     └── b/        removed second
//!         └── c/    removed first
//! ```
//!
//! The build root itself is never removed. Directories matching a protected
//! pattern (see [`crate::config::PruneConfig`]) are kept along with their
//! whole subtree, even when empty.
//!
//! Failures are not fatal: a directory that cannot be read or removed is
//! logged, counted in [`PruneReport::skipped`], and left in place.

use crate::matcher::PathMatcher;
use serde::Serialize;
use std::fs;
use std::io;
use std::path::Path;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PruneReport {
    /// Directories deleted.
    pub removed: usize,
    /// Directories that could not be read or deleted.
    pub skipped: usize,
}

/// Remove every empty, unprotected directory under `build_root`.
pub fn prune(build_root: &Path, protected: &PathMatcher) -> PruneReport {
    let mut report = PruneReport::default();
    prune_children(build_root, build_root, protected, &mut report);
    report
}

/// Prune inside `dir`, then report whether `dir` itself is now empty.
fn prune_children(
    root: &Path,
    dir: &Path,
    protected: &PathMatcher,
    report: &mut PruneReport,
) -> bool {
    let entries = match read_sorted(dir) {
        Ok(entries) => entries,
        Err(e) => {
            warn!(path = %dir.display(), error = %e, "cannot read directory, skipping");
            report.skipped += 1;
            return false;
        }
    };

    let mut remaining = 0;
    for entry in entries {
        let path = entry.path();
        let is_dir = entry.file_type().map(|t| t.is_dir()).unwrap_or(false);
        if !is_dir || protected.is_match_under(root, &path) {
            remaining += 1;
            continue;
        }
        if !prune_children(root, &path, protected, report) {
            remaining += 1;
            continue;
        }
        match fs::remove_dir(&path) {
            Ok(()) => {
                debug!(path = %path.display(), "removed empty directory");
                report.removed += 1;
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "cannot remove directory, skipping");
                report.skipped += 1;
                remaining += 1;
            }
        }
    }
    remaining == 0
}

fn read_sorted(dir: &Path) -> io::Result<Vec<fs::DirEntry>> {
    let mut entries = fs::read_dir(dir)?.collect::<io::Result<Vec<_>>>()?;
    entries.sort_by_key(|e| e.file_name());
    Ok(entries)
}
