//! Shared types used across all pipeline stages.
//!
//! [`SiteResource`] is what the renderer hands over; [`IgnoredAssets`] is the
//! part of the source tree the renderer never saw. Both are read by more than
//! one stage, so they live here rather than in any single stage module.

use crate::config::SiteConfig;
use crate::matcher::PathMatcher;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Suffix that makes a resource eligible for template conversion.
pub const HTML_SUFFIX: &str = ".html";

/// Classification of a rendered resource by its file suffix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentKind {
    Html,
    Xml,
    Json,
    Txt,
    /// Images, stylesheets, scripts and anything else passed through.
    Other,
}

impl ContentKind {
    pub fn from_path(path: &str) -> Self {
        match path.rsplit_once('.').map(|(_, ext)| ext) {
            Some("html") => ContentKind::Html,
            Some("xml") => ContentKind::Xml,
            Some("json") => ContentKind::Json,
            Some("txt") => ContentKind::Txt,
            _ => ContentKind::Other,
        }
    }
}

/// A resource produced by the renderer.
///
/// `path` is the logical output path relative to the build root, always
/// `/`-separated (`about/index.html`, `sitemap.xml`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiteResource {
    pub path: String,
    pub kind: ContentKind,
}

impl SiteResource {
    /// Build a resource, classifying it from its suffix.
    pub fn new(path: impl Into<String>) -> Self {
        let path = path.into();
        let kind = ContentKind::from_path(&path);
        Self { path, kind }
    }

    /// Only `.html`-suffixed resources are converted to templates.
    pub fn is_html(&self) -> bool {
        self.path.ends_with(HTML_SUFFIX)
    }

    /// Logical path with the `.html` suffix removed, if it has one.
    pub fn template_stem(&self) -> Option<&str> {
        self.path.strip_suffix(HTML_SUFFIX)
    }

    /// Location of this resource inside `build_root`.
    pub fn build_path(&self, build_root: &Path) -> PathBuf {
        build_root.join(&self.path)
    }
}

/// Paths excluded from the main render pass and copied verbatim instead.
///
/// Both parts are relative to the source and build roots:
/// - `content_dir`: the themed-content subtree, copied as a whole
/// - `scattered`: file patterns matched anywhere outside `content_dir`
#[derive(Debug, Clone, PartialEq)]
pub struct IgnoredAssets {
    pub content_dir: PathBuf,
    pub scattered: PathMatcher,
}

impl IgnoredAssets {
    pub fn from_config(config: &SiteConfig) -> Self {
        Self {
            content_dir: PathBuf::from(&config.theme.content_dir),
            scattered: config.assets.scattered.clone(),
        }
    }

    /// Whether a root-relative path lies inside the themed-content subtree.
    pub fn in_content_dir(&self, relative: &Path) -> bool {
        relative.starts_with(&self.content_dir)
    }

    /// Whether a root-relative path was skipped by the renderer.
    pub fn is_ignored(&self, relative: &Path) -> bool {
        self.in_content_dir(relative) || self.scattered.is_match(relative)
    }
}
