//! Sibling-locale URLs.
//!
//! Pages are rendered once per locale from sources laid out as
//! `<locale>/<page>.html`. A language switcher needs the URL of the *same*
//! page in another locale, whose slug may itself be translated:
//!
//! ```text
//! page id            target   catalog entry            url
//! en/index.html      ja       -                        /ja/
//! ja/index.html      en       -                        /
//! en/about.html      ja       paths.about = "gaiyou"   /ja/gaiyou/
//! ja/works.html      en       (missing)                /works/
//! ```
//!
//! The default locale lives at the site root; every other locale is prefixed
//! with `/<locale>/`. A missing translation never fails the page: the
//! untranslated slug is used instead.
//!
//! ## Catalogs
//!
//! Lookups go through [`TranslationCatalog`]. [`TomlCatalog`] loads one
//! `<locale>.toml` per locale, flattening nested tables to dotted keys:
//!
//! ```toml
//! # locales/ja.toml
//! [paths]
//! about = "gaiyou"
//! ```

use crate::config::I18nConfig;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use thiserror::Error;
use tracing::debug;

/// Page slug that maps to the locale root.
pub const INDEX_SLUG: &str = "index";
/// Catalog namespace holding translated slugs.
pub const PATHS_NAMESPACE: &str = "paths";

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("IO error reading {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("TOML parse error in {path}: {source}")]
    Toml {
        path: String,
        source: toml::de::Error,
    },
}

/// Source of translated strings.
pub trait TranslationCatalog {
    /// Translation of `key` in `locale`, or `None` when it is missing.
    fn translate(&self, key: &str, locale: &str) -> Option<String>;
}

/// Final rewrite applied to every generated URL (asset host, base path...).
pub trait UrlNormalizer {
    fn normalize(&self, path: &str) -> String;
}

/// Leaves paths untouched.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityUrl;

impl UrlNormalizer for IdentityUrl {
    fn normalize(&self, path: &str) -> String {
        path.to_string()
    }
}

/// Prefixes root-relative paths with a base URL (`https://example.com`).
#[derive(Debug, Clone)]
pub struct BaseUrl(pub String);

impl UrlNormalizer for BaseUrl {
    fn normalize(&self, path: &str) -> String {
        format!("{}{}", self.0.trim_end_matches('/'), path)
    }
}

/// Translations keyed by locale, then by dotted key.
#[derive(Debug, Clone, Default)]
pub struct TomlCatalog {
    entries: BTreeMap<String, BTreeMap<String, String>>,
}

impl TomlCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load `<dir>/<locale>.toml` for each locale. Missing files yield an
    /// empty catalog for that locale.
    pub fn load(dir: &Path, locales: &[String]) -> Result<Self, CatalogError> {
        let mut catalog = Self::new();
        for locale in locales {
            let path = dir.join(format!("{locale}.toml"));
            if !path.exists() {
                debug!(path = %path.display(), "no catalog for locale");
                continue;
            }
            let display = path.display().to_string();
            let content = fs::read_to_string(&path).map_err(|source| CatalogError::Io {
                path: display.clone(),
                source,
            })?;
            catalog.add_toml(locale, &content).map_err(|source| CatalogError::Toml {
                path: display,
                source,
            })?;
        }
        Ok(catalog)
    }

    /// Merge a TOML document into `locale`'s entries.
    pub fn add_toml(&mut self, locale: &str, content: &str) -> Result<(), toml::de::Error> {
        let table: toml::Table = toml::from_str(content)?;
        let entries = self.entries.entry(locale.to_string()).or_default();
        flatten("", &table, entries);
        Ok(())
    }

    pub fn insert(&mut self, locale: &str, key: &str, value: &str) {
        self.entries
            .entry(locale.to_string())
            .or_default()
            .insert(key.to_string(), value.to_string());
    }
}

fn flatten(prefix: &str, table: &toml::Table, out: &mut BTreeMap<String, String>) {
    for (key, value) in table {
        let full = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{prefix}.{key}")
        };
        match value {
            toml::Value::Table(inner) => flatten(&full, inner, out),
            toml::Value::String(s) => {
                out.insert(full, s.clone());
            }
            other => {
                out.insert(full, other.to_string());
            }
        }
    }
}

impl TranslationCatalog for TomlCatalog {
    fn translate(&self, key: &str, locale: &str) -> Option<String> {
        self.entries.get(locale)?.get(key).cloned()
    }
}

/// Page id with its leading locale segment and extension removed.
///
/// `en/about.html` → `about`, `en/works/detail.html` → `works/detail`.
/// Everything from the first `.` onwards counts as extension, so
/// `en/index.html.slim` → `index`.
pub fn untranslated_path(page_id: &str) -> &str {
    let rest = page_id
        .split_once('/')
        .map(|(_, rest)| rest)
        .unwrap_or(page_id);
    rest.split_once('.').map(|(stem, _)| stem).unwrap_or(rest)
}

/// URL of the page `page_id` in `target_locale`.
pub fn sibling_locale_url(
    page_id: &str,
    target_locale: &str,
    catalog: &impl TranslationCatalog,
    i18n: &I18nConfig,
    normalizer: &impl UrlNormalizer,
) -> String {
    let untranslated = untranslated_path(page_id);
    let is_default = target_locale == i18n.default_locale;

    let path = if untranslated == INDEX_SLUG {
        locale_root(target_locale, is_default)
    } else {
        let key = format!("{PATHS_NAMESPACE}.{untranslated}");
        let slug = catalog.translate(&key, target_locale).unwrap_or_else(|| {
            debug!(
                key = %key,
                locale = target_locale,
                "missing translation, using untranslated slug"
            );
            untranslated.to_string()
        });
        if is_default {
            format!("/{slug}/")
        } else {
            format!("/{target_locale}/{slug}/")
        }
    };

    normalizer.normalize(&path)
}

fn locale_root(locale: &str, is_default: bool) -> String {
    if is_default {
        "/".to_string()
    } else {
        format!("/{locale}/")
    }
}
