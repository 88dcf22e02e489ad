//! Glob predicates over build-relative paths.
//!
//! Every stage decides inclusion with the same primitive: "does this path
//! match any of these patterns?". [`PathMatcher`] compiles the patterns once
//! into a [`globset::GlobSet`] and keeps the source strings around so the
//! matcher round-trips through `sitepress.toml` unchanged.
//!
//! Patterns use `globset` syntax with `literal_separator` enabled, so `*`
//! never crosses a `/` and `**` is required to reach into subdirectories:
//!
//! ```text
//! wp              matches wp                 (not wp/index.php)
//! **/*.php        matches contact.php, legacy/contact.php
//! **/.git         matches .git, vendor/.git
//! ```

use std::path::Path;

use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use serde::{Deserialize, Deserializer, Serialize, Serializer, de::Error as _};

pub use globset::Error;

/// A set of glob patterns evaluated as a logical OR.
#[derive(Debug, Clone)]
pub struct PathMatcher {
    patterns: Vec<String>,
    set: GlobSet,
}

impl PathMatcher {
    pub fn new<I, S>(patterns: I) -> Result<Self, Error>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let patterns: Vec<String> = patterns.into_iter().map(Into::into).collect();
        let mut builder = GlobSetBuilder::new();
        for pattern in &patterns {
            builder.add(GlobBuilder::new(pattern).literal_separator(true).build()?);
        }
        Ok(Self {
            set: builder.build()?,
            patterns,
        })
    }

    /// A matcher with no patterns. Matches nothing.
    pub fn empty() -> Self {
        Self {
            patterns: Vec::new(),
            set: GlobSet::empty(),
        }
    }

    pub fn is_match<P: AsRef<Path>>(&self, path: P) -> bool {
        self.set.is_match(path)
    }

    /// Match `path` relative to `root`. Paths outside `root` never match.
    pub fn is_match_under(&self, root: &Path, path: &Path) -> bool {
        path.strip_prefix(root)
            .map(|rel| self.is_match(rel))
            .unwrap_or(false)
    }

    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}

impl PartialEq for PathMatcher {
    fn eq(&self, other: &Self) -> bool {
        self.patterns == other.patterns
    }
}

impl Eq for PathMatcher {}

impl Default for PathMatcher {
    fn default() -> Self {
        Self::empty()
    }
}

impl Serialize for PathMatcher {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.patterns.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for PathMatcher {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let patterns = <Vec<String> as Deserialize>::deserialize(deserializer)?;
        PathMatcher::new(patterns).map_err(D::Error::custom)
    }
}
