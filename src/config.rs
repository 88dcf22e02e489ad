//! Project configuration module.
//!
//! Handles loading, validating, and merging `sitepress.toml`. Stock defaults
//! describe the usual layout (a `wp` themed-content subtree, `.php` files
//! scattered through the source, Twig templates), and a project file only
//! needs to override what differs.
//!
//! ## Config File Location
//!
//! Place `sitepress.toml` in the project root, next to the `source/` and
//! `build/` directories:
//!
//! ```text
//! project/
//! ├── sitepress.toml
//! ├── locales/
//! │   ├── en.toml
//! │   └── ja.toml
//! ├── source/                  # Pre-build inputs (read-only to sitepress)
//! └── build/                   # Rendered output, transformed in place
//! ```
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! source_dir = "source"
//! build_dir = "build"
//!
//! [theme]
//! name = "portfolio"
//! content_dir = "wp"           # Themed-content subtree, copied verbatim
//! template_extension = "twig"
//! # template_root = "wp/wp-content/themes/portfolio/templates"
//!
//! [assets]
//! scattered = ["**/*.php"]     # Files skipped by the renderer, copied as-is
//!
//! [prune]
//! protected = ["**/.git", "**/.sass-cache", "wp"]
//!
//! [deploy]
//! branch = "staging"
//! staging_url = "https://stg.example.com"
//! production_url = "https://example.com"
//! development_url = "http://localhost:4567"
//!
//! [i18n]
//! default_locale = "en"
//! locales = ["en", "ja"]
//! locales_dir = "locales"
//!
//! [processing]
//! max_processes = 4            # Max parallel workers (omit for auto = CPU cores)
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use crate::matcher::PathMatcher;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// File name looked up in the project root.
pub const CONFIG_FILE: &str = "sitepress.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Project configuration loaded from `sitepress.toml`.
///
/// Passed by value into the pipeline; nothing reads configuration from
/// process-wide state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SiteConfig {
    /// Pre-build source tree, relative to the project root.
    pub source_dir: String,
    /// Rendered build tree, relative to the project root.
    pub build_dir: String,
    pub theme: ThemeConfig,
    pub assets: AssetsConfig,
    pub prune: PruneConfig,
    pub deploy: DeployConfig,
    pub i18n: I18nConfig,
    pub processing: ProcessingConfig,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            source_dir: "source".to_string(),
            build_dir: "build".to_string(),
            theme: ThemeConfig::default(),
            assets: AssetsConfig::default(),
            prune: PruneConfig::default(),
            deploy: DeployConfig::default(),
            i18n: I18nConfig::default(),
            processing: ProcessingConfig::default(),
        }
    }
}

impl SiteConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.theme.name.is_empty() || self.theme.name.contains(['/', '\\']) {
            return Err(ConfigError::Validation(
                "theme.name must be a non-empty single path segment".into(),
            ));
        }
        if !is_relative_path(&self.theme.content_dir) {
            return Err(ConfigError::Validation(
                "theme.content_dir must be a non-empty relative path".into(),
            ));
        }
        if matches!(&self.theme.template_root, Some(root) if !is_relative_path(root)) {
            return Err(ConfigError::Validation(
                "theme.template_root must be a non-empty relative path".into(),
            ));
        }
        let ext = &self.theme.template_extension;
        if ext.is_empty() || ext.starts_with('.') || ext.contains(['/', '\\']) {
            return Err(ConfigError::Validation(
                "theme.template_extension must be a bare extension like \"twig\"".into(),
            ));
        }
        if self.i18n.locales.is_empty() {
            return Err(ConfigError::Validation(
                "i18n.locales must not be empty".into(),
            ));
        }
        if !self.i18n.locales.contains(&self.i18n.default_locale) {
            return Err(ConfigError::Validation(format!(
                "i18n.default_locale \"{}\" is not listed in i18n.locales",
                self.i18n.default_locale
            )));
        }
        if self.deploy.branch.is_empty() {
            return Err(ConfigError::Validation(
                "deploy.branch must not be empty".into(),
            ));
        }
        Ok(())
    }

    pub fn source_path(&self, project_root: &Path) -> PathBuf {
        project_root.join(&self.source_dir)
    }

    pub fn build_path(&self, project_root: &Path) -> PathBuf {
        project_root.join(&self.build_dir)
    }

    /// Base URL of the site for the given environment.
    ///
    /// Development always points at the local preview server. Builds pick
    /// the staging URL when deploying to the staging branch and the
    /// production URL otherwise.
    pub fn site_url(&self, environment: Environment) -> &str {
        match environment {
            Environment::Development => &self.deploy.development_url,
            Environment::Build if self.deploy.branch == STAGING_BRANCH => &self.deploy.staging_url,
            Environment::Build => &self.deploy.production_url,
        }
    }
}

const STAGING_BRANCH: &str = "staging";

fn is_relative_path(path: &str) -> bool {
    !path.is_empty() && Path::new(path).is_relative()
}

/// Where the site is being rendered for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Build,
}

/// Theme layout: where the themed content lives and how templates are named.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ThemeConfig {
    /// Theme directory name under `wp-content/themes/`.
    pub name: String,
    /// Themed-content subtree, relative to both source and build roots.
    pub content_dir: String,
    /// Extension given to converted templates (without the dot).
    pub template_extension: String,
    /// Override for the template root, relative to the build root.
    /// Derived from `content_dir` and `name` when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub template_root: Option<String>,
}

impl Default for ThemeConfig {
    fn default() -> Self {
        Self {
            name: "portfolio".to_string(),
            content_dir: "wp".to_string(),
            template_extension: "twig".to_string(),
            template_root: None,
        }
    }
}

impl ThemeConfig {
    /// Template root relative to the build root.
    ///
    /// Defaults to `<content_dir>/wp-content/themes/<name>/templates`.
    pub fn template_root(&self) -> PathBuf {
        match &self.template_root {
            Some(root) => PathBuf::from(root),
            None => Path::new(&self.content_dir)
                .join("wp-content")
                .join("themes")
                .join(&self.name)
                .join("templates"),
        }
    }
}

/// Files the renderer skips and the reconciler copies verbatim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AssetsConfig {
    /// Patterns for files outside the themed-content subtree.
    pub scattered: PathMatcher,
}

impl Default for AssetsConfig {
    fn default() -> Self {
        Self {
            scattered: PathMatcher::new(["**/*.php"]).expect("default asset patterns must compile"),
        }
    }
}

/// Directories the pruner must keep even when empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PruneConfig {
    pub protected: PathMatcher,
}

impl Default for PruneConfig {
    fn default() -> Self {
        Self {
            protected: PathMatcher::new(["**/.git", "**/.sass-cache", "wp"])
                .expect("default protected patterns must compile"),
        }
    }
}

/// Deployment target selection. Only used to pick a base URL.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DeployConfig {
    pub branch: String,
    pub staging_url: String,
    pub production_url: String,
    pub development_url: String,
}

impl Default for DeployConfig {
    fn default() -> Self {
        Self {
            branch: STAGING_BRANCH.to_string(),
            staging_url: "https://stg.example.com".to_string(),
            production_url: "https://example.com".to_string(),
            development_url: "http://localhost:4567".to_string(),
        }
    }
}

/// Locales the site is rendered in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct I18nConfig {
    /// Locale served from the site root (no `/<locale>/` prefix).
    pub default_locale: String,
    /// All locales, in display order.
    pub locales: Vec<String>,
    /// Directory of `<locale>.toml` translation catalogs.
    pub locales_dir: String,
}

impl Default for I18nConfig {
    fn default() -> Self {
        Self {
            default_locale: "en".to_string(),
            locales: vec!["en".to_string(), "ja".to_string()],
            locales_dir: "locales".to_string(),
        }
    }
}

/// Parallel processing settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessingConfig {
    /// Maximum number of parallel copy/move workers.
    /// When absent or null, defaults to the number of CPU cores.
    /// Values larger than the core count are clamped down.
    pub max_processes: Option<usize>,
}

/// Resolve the effective thread count from config.
///
/// - `None` → use all available cores
/// - `Some(n)` → use `min(n, cores)` (user can constrain down, not up)
pub fn effective_threads(config: &ProcessingConfig) -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    config
        .max_processes
        .map(|n| n.clamp(1, cores))
        .unwrap_or(cores)
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
///
/// This is the canonical representation of all default values, used as the
/// base layer for merging user overrides on top.
pub fn stock_defaults_value() -> toml::Value {
    toml::Value::try_from(SiteConfig::default()).expect("default config must serialize")
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely, so a pattern
///   list in the project file replaces the stock list rather than extending it.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Load `sitepress.toml` from a directory as a raw TOML value.
///
/// Returns `Ok(None)` if the file does not exist.
/// Returns `Err` if the file exists but contains invalid TOML.
pub fn load_raw_config(path: &Path) -> Result<Option<toml::Value>, ConfigError> {
    let config_path = path.join(CONFIG_FILE);
    if !config_path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(&config_path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Merge an optional overlay onto a base value, then deserialize and validate.
pub fn resolve_config(
    base: toml::Value,
    overlay: Option<toml::Value>,
) -> Result<SiteConfig, ConfigError> {
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: SiteConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load config from `sitepress.toml` in the given project root.
///
/// Merges user values on top of stock defaults, rejects unknown keys,
/// and validates the result.
pub fn load_config(root: &Path) -> Result<SiteConfig, ConfigError> {
    let base = stock_defaults_value();
    let overlay = load_raw_config(root)?;
    resolve_config(base, overlay)
}

/// Returns a fully-commented stock `sitepress.toml` with all keys and explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# sitepress configuration
# =======================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults. Unknown keys will cause an error.

# Pre-build inputs. sitepress only ever reads from here.
source_dir = "source"

# Rendered output. Transformed in place after the renderer finishes.
build_dir = "build"

# ---------------------------------------------------------------------------
# Theme
# ---------------------------------------------------------------------------
[theme]
# Theme directory name under <content_dir>/wp-content/themes/.
name = "portfolio"

# Themed-content subtree. Skipped by the renderer and copied verbatim from
# source_dir into build_dir.
content_dir = "wp"

# Rendered .html pages are moved under the template root and renamed to
# this extension.
template_extension = "twig"

# Template root relative to build_dir. Defaults to
# <content_dir>/wp-content/themes/<name>/templates.
# template_root = "wp/wp-content/themes/portfolio/templates"

# ---------------------------------------------------------------------------
# Reconciled assets
# ---------------------------------------------------------------------------
[assets]
# Files outside content_dir that the renderer skips and sitepress copies.
scattered = ["**/*.php"]

# ---------------------------------------------------------------------------
# Empty directory pruning
# ---------------------------------------------------------------------------
[prune]
# Directories (relative to build_dir) that are kept even when empty.
# Their subtrees are never pruned either.
protected = ["**/.git", "**/.sass-cache", "wp"]

# ---------------------------------------------------------------------------
# Deployment
# ---------------------------------------------------------------------------
[deploy]
# Deploying to "staging" selects staging_url, anything else production_url.
branch = "staging"
staging_url = "https://stg.example.com"
production_url = "https://example.com"
development_url = "http://localhost:4567"

# ---------------------------------------------------------------------------
# Localization
# ---------------------------------------------------------------------------
[i18n]
# Locale served from the site root without a /<locale>/ prefix.
default_locale = "en"
locales = ["en", "ja"]
# Directory (relative to the project root) of <locale>.toml catalogs.
locales_dir = "locales"

# ---------------------------------------------------------------------------
# Processing
# ---------------------------------------------------------------------------
[processing]
# Maximum parallel copy/move workers.
# Omit or comment out to auto-detect (= number of CPU cores).
# max_processes = 4
"##
}
