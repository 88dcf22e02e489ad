//! Rendered resource discovery.
//!
//! Library callers normally receive the resource list straight from the
//! renderer. The CLI runs after the renderer has exited, so it reconstructs
//! the list from the build tree instead: every file that the renderer could
//! have produced, which means every file not covered by [`IgnoredAssets`].
//!
//! Discovery must run before reconciliation. Once the themed-content subtree
//! is copied in, its files are indistinguishable from rendered output except
//! by the ignore rules, which is exactly what this module applies.

use crate::types::{IgnoredAssets, SiteResource};
use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::WalkDir;

#[derive(Error, Debug)]
pub enum DiscoverError {
    #[error("Build tree not found: {0}")]
    MissingBuildTree(PathBuf),
    #[error("Failed to read build tree at {path}: {source}")]
    Walk {
        path: PathBuf,
        source: walkdir::Error,
    },
}

/// List every rendered file under `build_root`, sorted by path.
pub fn discover(
    build_root: &Path,
    ignored: &IgnoredAssets,
) -> Result<Vec<SiteResource>, DiscoverError> {
    if !build_root.is_dir() {
        return Err(DiscoverError::MissingBuildTree(build_root.to_path_buf()));
    }

    let walker = WalkDir::new(build_root)
        .min_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| {
            e.path()
                .strip_prefix(build_root)
                .map(|rel| !ignored.in_content_dir(rel))
                .unwrap_or(false)
        });

    let mut resources = Vec::new();
    for entry in walker {
        let entry = entry.map_err(|source| DiscoverError::Walk {
            path: source.path().unwrap_or(build_root).to_path_buf(),
            source,
        })?;
        if !entry.file_type().is_file() {
            continue;
        }
        let Ok(relative) = entry.path().strip_prefix(build_root) else {
            continue;
        };
        if ignored.scattered.is_match(relative) {
            continue;
        }
        resources.push(SiteResource::new(logical_path(relative)));
    }
    Ok(resources)
}

/// `/`-separated form of a root-relative path.
fn logical_path(relative: &Path) -> String {
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}
