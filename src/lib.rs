//! # Sitepress
//!
//! Post-build transformer for rendered static sites. A renderer turns a
//! source tree into a build tree; sitepress runs after it and reshapes the
//! build tree into a deployable theme: assets the renderer skipped are copied
//! back, rendered HTML pages become theme templates, and the directories left
//! behind are removed.
//!
//! # Architecture: Three-Step Pipeline
//!
//! ```text
//! 1. Reconcile  source/  →  build/             (copy skipped assets verbatim)
//! 2. Convert    build/   →  build/<templates>  (move *.html → *.<ext>)
//! 3. Prune      build/   →  build/             (remove empty directories)
//! ```
//!
//! The order is fixed. Reconcile has to land theme files before conversion
//! writes templates next to them, and pruning only makes sense once pages
//! have been moved out of their directories. Each step is a free function
//! taking explicit roots so it can be tested against a scratch directory;
//! [`pipeline::PostBuildPipeline`] binds them to a loaded config.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`matcher`] | Glob pattern sets over `/`-separated relative paths |
//! | [`reconcile`] | Step 1: copy the themed content subtree and scattered files |
//! | [`convert`] | Step 2: move rendered pages under the template root |
//! | [`prune`] | Step 3: bottom-up removal of empty, unprotected directories |
//! | [`pipeline`] | Runs the steps in order, streams progress events |
//! | [`resources`] | Enumerates rendered resources in the build tree |
//! | [`config`] | `sitepress.toml` loading, stock defaults, validation |
//! | [`types`] | Shared types: `SiteResource`, `IgnoredAssets` |
//! | [`image`] | `<img>` markup with retina `srcset` and device variants |
//! | [`locale`] | URL of the same page in another locale |
//! | [`page`] | Small template helpers |
//! | [`output`] | CLI output formatting of pipeline results |
//!
//! # Design Decisions
//!
//! ## Paths Are Relative and `/`-Separated
//!
//! Every pattern and every resource path is relative to its tree root and
//! uses `/`, whatever the host platform. Patterns behave the same on every
//! machine and reports diff cleanly across runs.
//!
//! ## Copies Preserve Metadata
//!
//! Reconciled files keep their modification time and permissions. Deploy
//! tools that sync by mtime then see an unchanged theme file as unchanged.
//!
//! ## Collisions Fail Before Anything Moves
//!
//! Two resources mapping to the same template (`a/b.html` and `a//b.html`)
//! abort conversion during planning, so a failed run never leaves a
//! half-converted tree.
//!
//! ## Maud for Markup
//!
//! Image tags are built with [Maud](https://maud.lambda.xyz/). Attribute
//! values are escaped on interpolation, so caller-supplied `alt` text can
//! never break out of the tag.

pub mod config;
pub mod convert;
pub mod image;
pub mod locale;
pub mod matcher;
pub mod output;
pub mod page;
pub mod pipeline;
pub mod prune;
pub mod reconcile;
pub mod resources;
pub mod types;

#[cfg(test)]
pub(crate) mod test_helpers;
