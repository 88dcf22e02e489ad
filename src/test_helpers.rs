//! Shared test utilities for the sitepress test suite.
//!
//! Provides tree builders and snapshot helpers that work on real temporary
//! directories, so every stage is tested against the filesystem it mutates.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let tmp = TempDir::new().unwrap();
//! let (source, build) = source_and_build(&tmp);
//! write_file(&source, "wp/index.php", "<?php");
//! make_dir(&build, "img/empty");
//!
//! assert_eq!(read_file(&build, "index.html"), "<h1>home</h1>");
//! assert_eq!(empty_dirs(&build), vec!["img/empty"]);
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use walkdir::WalkDir;

// =========================================================================
// Tree builders
// =========================================================================

/// Create `source/` and `build/` directories inside a temp dir.
pub fn source_and_build(tmp: &TempDir) -> (PathBuf, PathBuf) {
    let source = tmp.path().join("source");
    let build = tmp.path().join("build");
    fs::create_dir_all(&source).unwrap();
    fs::create_dir_all(&build).unwrap();
    (source, build)
}

/// Write `content` to `root/relative`, creating parent directories.
pub fn write_file(root: &Path, relative: &str, content: &str) {
    let path = root.join(relative);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

/// Create an (empty) directory chain at `root/relative`.
pub fn make_dir(root: &Path, relative: &str) {
    fs::create_dir_all(root.join(relative)).unwrap();
}

/// Read `root/relative` as a string. Panics with the path on failure.
pub fn read_file(root: &Path, relative: &str) -> String {
    let path = root.join(relative);
    fs::read_to_string(&path).unwrap_or_else(|e| panic!("reading {}: {e}", path.display()))
}

// =========================================================================
// Tree inspection
// =========================================================================

/// One entry of a [`snapshot_tree`]: `None` for directories, file bytes otherwise.
pub type Snapshot = BTreeMap<String, Option<Vec<u8>>>;

/// Every path under `root` (relative, `/`-separated) with its file contents.
pub fn snapshot_tree(root: &Path) -> Snapshot {
    WalkDir::new(root)
        .min_depth(1)
        .into_iter()
        .map(|e| e.unwrap())
        .map(|e| {
            let rel = relative_string(root, e.path());
            let content = e.file_type().is_file().then(|| fs::read(e.path()).unwrap());
            (rel, content)
        })
        .collect()
}

/// All regular files under `root`, relative and sorted.
pub fn files_under(root: &Path) -> Vec<String> {
    snapshot_tree(root)
        .into_iter()
        .filter(|(_, content)| content.is_some())
        .map(|(path, _)| path)
        .collect()
}

/// All directories under `root` (excluding `root`) with no entries, sorted.
pub fn empty_dirs(root: &Path) -> Vec<String> {
    WalkDir::new(root)
        .min_depth(1)
        .into_iter()
        .map(|e| e.unwrap())
        .filter(|e| e.file_type().is_dir())
        .filter(|e| fs::read_dir(e.path()).unwrap().next().is_none())
        .map(|e| relative_string(root, e.path()))
        .collect::<std::collections::BTreeSet<_>>()
        .into_iter()
        .collect()
}

fn relative_string(root: &Path, path: &Path) -> String {
    path.strip_prefix(root)
        .unwrap()
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

/// Whether the current user is actually blocked by a read-only directory.
///
/// Tests that rely on permission failures skip their assertions when run
/// with privileges that bypass directory permissions (e.g. as root in CI
/// containers).
#[cfg(unix)]
pub fn permissions_enforced(read_only_dir: &Path) -> bool {
    let marker = read_only_dir.join(".permission-check");
    match fs::write(&marker, b"") {
        Ok(()) => {
            fs::remove_file(&marker).unwrap();
            false
        }
        Err(_) => true,
    }
}
