//! Asset reconciliation.
//!
//! Step 1 of the post-build pipeline. The renderer skips the themed-content
//! subtree and scattered dynamic sources (`.php` files) because they must
//! reach the output byte-for-byte. This module copies them from the source
//! tree into the build tree after rendering.
//!
//! ## Copy Semantics
//!
//! - Existing destination entries are removed before copying, so a stale
//!   file (or a directory squatting on a file's path) never survives.
//! - Permissions and access/modification times are carried over, so a rerun
//!   produces a byte- and metadata-identical tree.
//! - Scattered files inside the themed-content subtree are skipped by the
//!   second sweep; the subtree copy already handled them.
//!
//! ```text
//! source/                        build/
//! ├── wp/                   ──►  ├── wp/             (whole subtree)
//! │   └── index.php              │   └── index.php
//! └── legacy/                    └── legacy/
//!     ├── contact.php       ──►      └── contact.php  (scattered sweep)
//!     └── contact.html.slim          (rendered by the engine, untouched here)
//! ```
//!
//! Any failure is fatal: a partially reconciled tree must not be deployed.
//! File copies run in parallel with [rayon](https://docs.rs/rayon).

use crate::types::IgnoredAssets;
use filetime::FileTime;
use rayon::prelude::*;
use serde::Serialize;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};
use walkdir::WalkDir;

#[derive(Error, Debug)]
pub enum ReconcileError {
    #[error("Failed to read source tree at {path}: {source}")]
    Walk {
        path: PathBuf,
        source: walkdir::Error,
    },
    #[error("Failed to copy {path}: {source}")]
    Copy { path: PathBuf, source: io::Error },
}

/// Counts of files copied by each sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileReport {
    pub subtree_files: usize,
    pub scattered_files: usize,
}

/// A single planned copy, source and destination both absolute.
#[derive(Debug)]
struct CopyJob {
    from: PathBuf,
    to: PathBuf,
}

/// Copy everything the renderer skipped from `source_root` into `build_root`.
pub fn reconcile(
    source_root: &Path,
    build_root: &Path,
    ignored: &IgnoredAssets,
) -> Result<ReconcileReport, ReconcileError> {
    let subtree_files = copy_content_dir(source_root, build_root, &ignored.content_dir)?;
    let scattered_files = copy_scattered(source_root, build_root, ignored)?;

    info!(
        subtree = subtree_files,
        scattered = scattered_files,
        "reconciled skipped assets"
    );
    Ok(ReconcileReport {
        subtree_files,
        scattered_files,
    })
}

/// Copy the themed-content subtree. A missing subtree copies nothing.
fn copy_content_dir(
    source_root: &Path,
    build_root: &Path,
    content_dir: &Path,
) -> Result<usize, ReconcileError> {
    let from_root = source_root.join(content_dir);
    if !from_root.is_dir() {
        debug!(path = %from_root.display(), "no themed-content subtree in source");
        return Ok(0);
    }
    let to_root = build_root.join(content_dir);

    let mut dirs = Vec::new();
    let mut jobs = Vec::new();
    // Symlinked directories (shared uploads) are copied as real directories.
    for entry in WalkDir::new(&from_root).follow_links(true).sort_by_file_name() {
        let entry = entry.map_err(|e| walk_error(&from_root, e))?;
        let relative = entry
            .path()
            .strip_prefix(&from_root)
            .expect("walkdir entries are under the walk root");
        let job = CopyJob {
            from: entry.path().to_path_buf(),
            to: to_root.join(relative),
        };
        if entry.file_type().is_dir() {
            dirs.push(job);
        } else {
            jobs.push(job);
        }
    }

    // Parents are walked before children, so creating in order never races.
    // A previous run may have left read-only copies; they are opened up here
    // and get their source permissions back below.
    for dir in &dirs {
        ensure_dir(&dir.to)
            .and_then(|()| make_owner_writable(&dir.to))
            .map_err(|source| copy_error(&dir.to, source))?;
    }
    jobs.par_iter().try_for_each(run_job)?;

    // Deepest first: setting a child's times would not bump its parent's,
    // but copying files into a directory would.
    for dir in dirs.iter().rev() {
        copy_metadata(&dir.from, &dir.to).map_err(|source| copy_error(&dir.to, source))?;
    }

    Ok(jobs.len())
}

/// Copy every scattered file that lives outside the themed-content subtree.
fn copy_scattered(
    source_root: &Path,
    build_root: &Path,
    ignored: &IgnoredAssets,
) -> Result<usize, ReconcileError> {
    if ignored.scattered.is_empty() || !source_root.is_dir() {
        return Ok(0);
    }

    let walker = WalkDir::new(source_root)
        .follow_links(true)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| {
            e.path()
                .strip_prefix(source_root)
                .map(|rel| rel.as_os_str().is_empty() || !ignored.in_content_dir(rel))
                .unwrap_or(false)
        });

    let mut jobs = Vec::new();
    for entry in walker {
        let entry = entry.map_err(|e| walk_error(source_root, e))?;
        if entry.file_type().is_dir() {
            continue;
        }
        let relative = entry
            .path()
            .strip_prefix(source_root)
            .expect("walkdir entries are under the walk root");
        if ignored.scattered.is_match(relative) {
            jobs.push(CopyJob {
                from: entry.path().to_path_buf(),
                to: build_root.join(relative),
            });
        }
    }

    jobs.par_iter().try_for_each(run_job)?;
    Ok(jobs.len())
}

fn run_job(job: &CopyJob) -> Result<(), ReconcileError> {
    copy_file(&job.from, &job.to).map_err(|source| copy_error(&job.to, source))?;
    debug!(to = %job.to.display(), "copied");
    Ok(())
}

/// Replace `to` with a copy of `from`, keeping permissions and timestamps.
fn copy_file(from: &Path, to: &Path) -> io::Result<()> {
    if let Some(parent) = to.parent() {
        ensure_dir(parent)?;
    }
    remove_existing(to)?;
    fs::copy(from, to)?;
    copy_metadata(from, to)
}

/// Create `dir` and its parents. An existing directory is success; an
/// existing file in its place is removed first.
///
/// Parallel jobs can share a parent, so another job may remove the file or
/// create the directory between the check and the removal.
fn ensure_dir(dir: &Path) -> io::Result<()> {
    if matches!(fs::symlink_metadata(dir), Ok(meta) if !meta.is_dir()) {
        match fs::remove_file(dir) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(_) if dir.is_dir() => {}
            Err(e) => return Err(e),
        }
    }
    fs::create_dir_all(dir)
}

#[cfg(unix)]
fn make_owner_writable(dir: &Path) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;

    let mut perms = fs::metadata(dir)?.permissions();
    if perms.mode() & 0o200 == 0 {
        perms.set_mode(perms.mode() | 0o200);
        fs::set_permissions(dir, perms)?;
    }
    Ok(())
}

#[cfg(not(unix))]
fn make_owner_writable(dir: &Path) -> io::Result<()> {
    let mut perms = fs::metadata(dir)?.permissions();
    if perms.readonly() {
        #[allow(clippy::permissions_set_readonly_false)]
        perms.set_readonly(false);
        fs::set_permissions(dir, perms)?;
    }
    Ok(())
}

fn remove_existing(path: &Path) -> io::Result<()> {
    match fs::symlink_metadata(path) {
        Ok(meta) if meta.is_dir() => fs::remove_dir_all(path),
        Ok(_) => fs::remove_file(path),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    }
}

fn copy_metadata(from: &Path, to: &Path) -> io::Result<()> {
    let meta = fs::metadata(from)?;
    fs::set_permissions(to, meta.permissions())?;
    filetime::set_file_times(
        to,
        FileTime::from_last_access_time(&meta),
        FileTime::from_last_modification_time(&meta),
    )
}

fn copy_error(path: &Path, source: io::Error) -> ReconcileError {
    ReconcileError::Copy {
        path: path.to_path_buf(),
        source,
    }
}

fn walk_error(root: &Path, source: walkdir::Error) -> ReconcileError {
    ReconcileError::Walk {
        path: source.path().unwrap_or(root).to_path_buf(),
        source,
    }
}
