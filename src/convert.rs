//! HTML-to-template conversion.
//!
//! Step 2 of the post-build pipeline. Every rendered `.html` resource is
//! moved (not copied) under the theme's template root and renamed to the
//! template extension, keeping its relative layout:
//!
//! ```text
//! build/                              build/wp/wp-content/themes/portfolio/templates/
//! ├── index.html            ──►       ├── index.twig
//! ├── about/index.html      ──►       ├── about/index.twig
//! ├── works/detail.html     ──►       ├── works/detail.twig
//! └── sitemap.xml                     (left in place, not HTML)
//! ```
//!
//! After conversion the original `.html` file no longer exists. Directories it
//! leaves behind are cleaned up by [`crate::prune`].
//!
//! ## Reruns
//!
//! A resource whose source is gone but whose destination exists was already
//! converted by an earlier run and is reported as such. A resource with
//! neither a source nor a destination is a fatal error: the renderer promised
//! a file that is not there.
//!
//! ## Collisions
//!
//! Two resources mapping to the same destination are rejected before any file
//! is moved, so a collision never leaves a half-converted tree.

use crate::config::SiteConfig;
use crate::types::SiteResource;
use rayon::prelude::*;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum ConvertError {
    #[error("Failed to create template directory {path}: {source}")]
    CreateDir { path: PathBuf, source: io::Error },
    #[error("Failed to move {from} to {to}: {source}")]
    Move {
        from: PathBuf,
        to: PathBuf,
        source: io::Error,
    },
    #[error("Rendered page {0} is missing from the build tree")]
    SourceMissing(PathBuf),
    #[error("Resources {first} and {second} both convert to {destination}")]
    Collision {
        destination: PathBuf,
        first: String,
        second: String,
    },
}

/// Where converted templates go and what they are called.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateLayout {
    /// Absolute template root inside the build tree.
    pub root: PathBuf,
    /// Extension without the leading dot.
    pub extension: String,
}

impl TemplateLayout {
    pub fn from_config(config: &SiteConfig, build_root: &Path) -> Self {
        Self {
            root: build_root.join(config.theme.template_root()),
            extension: config.theme.template_extension.clone(),
        }
    }

    /// Template destination for `resource`, or `None` if it is not HTML.
    pub fn destination(&self, resource: &SiteResource) -> Option<PathBuf> {
        resource
            .template_stem()
            .map(|stem| self.root.join(format!("{stem}.{}", self.extension)))
    }
}

/// What happened to one HTML resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConversionStatus {
    Moved,
    AlreadyConverted,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Conversion {
    /// Logical path of the source resource.
    pub resource: String,
    pub destination: PathBuf,
    pub status: ConversionStatus,
}

#[derive(Debug)]
struct Plan<'a> {
    resource: &'a SiteResource,
    from: PathBuf,
    to: PathBuf,
}

/// Move every HTML resource in `resources` to its template destination.
///
/// Non-HTML resources are ignored. Results are returned in input order.
pub fn convert_all(
    resources: &[SiteResource],
    build_root: &Path,
    layout: &TemplateLayout,
) -> Result<Vec<Conversion>, ConvertError> {
    let plans = plan(resources, build_root, layout)?;
    plans.par_iter().map(execute).collect()
}

fn plan<'a>(
    resources: &'a [SiteResource],
    build_root: &Path,
    layout: &TemplateLayout,
) -> Result<Vec<Plan<'a>>, ConvertError> {
    let mut claimed: BTreeMap<PathBuf, &str> = BTreeMap::new();
    let mut plans = Vec::new();

    for resource in resources {
        let Some(to) = layout.destination(resource) else {
            continue;
        };
        if let Some(first) = claimed.insert(to.clone(), &resource.path) {
            if first == resource.path {
                continue;
            }
            return Err(ConvertError::Collision {
                destination: to,
                first: first.to_string(),
                second: resource.path.clone(),
            });
        }
        plans.push(Plan {
            resource,
            from: resource.build_path(build_root),
            to,
        });
    }
    Ok(plans)
}

fn execute(plan: &Plan<'_>) -> Result<Conversion, ConvertError> {
    let conversion = |status| Conversion {
        resource: plan.resource.path.clone(),
        destination: plan.to.clone(),
        status,
    };

    if !plan.from.is_file() {
        if plan.to.is_file() {
            debug!(resource = %plan.resource.path, "already converted");
            return Ok(conversion(ConversionStatus::AlreadyConverted));
        }
        return Err(ConvertError::SourceMissing(plan.from.clone()));
    }

    if let Some(parent) = plan.to.parent() {
        fs::create_dir_all(parent).map_err(|source| ConvertError::CreateDir {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    move_file(&plan.from, &plan.to).map_err(|source| ConvertError::Move {
        from: plan.from.clone(),
        to: plan.to.clone(),
        source,
    })?;

    debug!(resource = %plan.resource.path, to = %plan.to.display(), "converted");
    Ok(conversion(ConversionStatus::Moved))
}

/// Rename `from` to `to`, overwriting `to`. Falls back to copy + delete when
/// the two paths are on different filesystems.
fn move_file(from: &Path, to: &Path) -> io::Result<()> {
    match fs::rename(from, to) {
        Err(e) if e.kind() == io::ErrorKind::CrossesDevices => {
            fs::copy(from, to)?;
            fs::remove_file(from)
        }
        other => other,
    }
}
