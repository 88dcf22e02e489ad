//! Responsive image markup helpers.
//!
//! Templates reference one image path; these helpers derive the companion
//! assets by filename convention and render the `<img>` elements for them:
//!
//! ```text
//! photo.png      standard
//! photo@2x.png   retina, declared as srcset="photo@2x.png 2x"
//! photo-sp.png   device variant, shown to small screens via class="sp"
//! ```
//!
//! ## Attribute Merging
//!
//! Callers pass an [`Attributes`] map that is merged into the element. Each
//! key the helpers set carries an explicit [`MergePolicy`]: `src` and
//! `srcset` always replace whatever the caller supplied, while `class` is
//! concatenated so a caller's own classes survive alongside `pc` / `sp`.
//!
//! Output is deterministic: `src` first, `srcset` second, then every other
//! attribute in key order. Values are escaped by maud.
//!
//! ## Paths Without an Extension
//!
//! The marker goes before the extension of the final path segment. When
//! that segment has no extension (`photo`, `photo.`, `img.v2/photo`), the
//! marker is appended to the end instead: `photo` → `photo@2x`.

use maud::{Markup, PreEscaped, html};
use std::collections::BTreeMap;

/// Marker inserted before the extension of the retina asset.
pub const RETINA_MARKER: &str = "@2x";
/// Marker inserted before the extension of the small-screen asset.
pub const DEVICE_VARIANT_MARKER: &str = "-sp";
/// Class applied to the desktop element of a device-variant pair.
pub const DESKTOP_CLASS: &str = "pc";
/// Class applied to the mobile element of a device-variant pair.
pub const MOBILE_CLASS: &str = "sp";
/// Suffix appended to the mobile element's `id`.
pub const MOBILE_ID_SUFFIX: &str = "_sp";

/// How an incoming attribute value combines with an existing one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergePolicy {
    /// The incoming value wins.
    Replace,
    /// Existing and incoming values are joined with a single space.
    ConcatenateWithSpace,
}

impl MergePolicy {
    fn apply(self, existing: Option<&str>, incoming: &str) -> String {
        match (self, existing) {
            (MergePolicy::ConcatenateWithSpace, Some(old)) if !old.is_empty() => {
                format!("{old} {incoming}")
            }
            _ => incoming.to_string(),
        }
    }
}

/// HTML attributes keyed by name. Keys are unique.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Attributes(BTreeMap<String, String>);

impl Attributes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style [`insert`](Self::insert) with [`MergePolicy::Replace`].
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(key, value, MergePolicy::Replace);
        self
    }

    /// Set `key`, combining with any existing value according to `policy`.
    pub fn insert(
        &mut self,
        key: impl Into<String>,
        value: impl Into<String>,
        policy: MergePolicy,
    ) {
        let key = key.into();
        let value = value.into();
        let merged = policy.apply(self.0.get(&key).map(String::as_str), &value);
        self.0.insert(key, merged);
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Attributes in render order: `src`, `srcset`, then the rest by key.
    fn render_order(&self) -> impl Iterator<Item = (&str, &str)> {
        const LEADING: [&str; 2] = ["src", "srcset"];
        let leading = LEADING
            .into_iter()
            .filter_map(|k| self.0.get_key_value(k));
        let rest = self.0.iter().filter(|(k, _)| !LEADING.contains(&k.as_str()));
        leading
            .chain(rest)
            .map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Attributes {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut attrs = Attributes::new();
        for (k, v) in iter {
            attrs.insert(k, v, MergePolicy::Replace);
        }
        attrs
    }
}

/// Insert `marker` before the extension of the last path segment, or append
/// it when there is no extension.
pub fn insert_marker(src: &str, marker: &str) -> String {
    let segment_start = src.rfind('/').map(|i| i + 1).unwrap_or(0);
    let extension_dot = src[segment_start..]
        .rfind('.')
        .map(|i| segment_start + i)
        .filter(|&dot| is_extension(&src[dot + 1..]));

    match extension_dot {
        Some(dot) => format!("{}{marker}{}", &src[..dot], &src[dot..]),
        None => format!("{src}{marker}"),
    }
}

fn is_extension(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

pub fn retina_path(src: &str) -> String {
    insert_marker(src, RETINA_MARKER)
}

pub fn device_variant_path(src: &str) -> String {
    insert_marker(src, DEVICE_VARIANT_MARKER)
}

/// `<img>` for `src` with its retina companion declared at 2x density.
pub fn standard_image(src: &str, attrs: &Attributes) -> Markup {
    let mut merged = attrs.clone();
    merged.insert("src", src, MergePolicy::Replace);
    merged.insert(
        "srcset",
        format!("{} 2x", retina_path(src)),
        MergePolicy::Replace,
    );
    render_img(&merged)
}

/// Desktop image (class `pc`) followed by its small-screen variant (class `sp`).
///
/// A caller-supplied `class` is kept on both elements. A caller-supplied `id`
/// gets the `_sp` suffix on the mobile element so the pair never shares an id.
pub fn device_variant_image(src: &str, attrs: &Attributes) -> Markup {
    let mut desktop = attrs.clone();
    desktop.insert("class", DESKTOP_CLASS, MergePolicy::ConcatenateWithSpace);

    let mut mobile = attrs.clone();
    mobile.insert("class", MOBILE_CLASS, MergePolicy::ConcatenateWithSpace);
    if let Some(id) = mobile.get("id").map(str::to_owned) {
        mobile.insert("id", format!("{id}{MOBILE_ID_SUFFIX}"), MergePolicy::Replace);
    }

    html! {
        (standard_image(src, &desktop))
        (standard_image(&device_variant_path(src), &mobile))
    }
}

fn render_img(attrs: &Attributes) -> Markup {
    let mut out = String::from("<img");
    for (key, value) in attrs.render_order() {
        if !is_attribute_name(key) {
            continue;
        }
        out.push(' ');
        out.push_str(key);
        out.push_str("=\"");
        out.push_str(&html! { (value) }.into_string());
        out.push('"');
    }
    out.push('>');
    PreEscaped(out)
}

fn is_attribute_name(key: &str) -> bool {
    !key.is_empty()
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | ':' | '.'))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attrs(pairs: &[(&str, &str)]) -> Attributes {
        pairs.iter().copied().collect()
    }

    // =========================================================================
    // Marker insertion
    // =========================================================================

    #[test]
    fn retina_path_inserts_before_extension() {
        assert_eq!(retina_path("photo.png"), "photo@2x.png");
        assert_eq!(retina_path("img/top/hero.jpg"), "img/top/hero@2x.jpg");
    }

    #[test]
    fn marker_uses_last_extension_only() {
        assert_eq!(retina_path("photo.min.png"), "photo.min@2x.png");
    }

    #[test]
    fn device_variant_path_inserts_sp() {
        assert_eq!(device_variant_path("photo.png"), "photo-sp.png");
    }

    #[test]
    fn no_extension_appends_marker() {
        assert_eq!(retina_path("photo"), "photo@2x");
        assert_eq!(retina_path("photo."), "photo.@2x");
        assert_eq!(device_variant_path("img.v2/photo"), "img.v2/photo-sp");
    }

    #[test]
    fn non_word_extension_appends_marker() {
        assert_eq!(retina_path("photo.we-bp"), "photo.we-bp@2x");
    }

    // =========================================================================
    // Merge policies
    // =========================================================================

    #[test]
    fn replace_overwrites() {
        let mut a = attrs(&[("alt", "old")]);
        a.insert("alt", "new", MergePolicy::Replace);
        assert_eq!(a.get("alt"), Some("new"));
    }

    #[test]
    fn concatenate_joins_with_space() {
        let mut a = attrs(&[("class", "hero")]);
        a.insert("class", "pc", MergePolicy::ConcatenateWithSpace);
        assert_eq!(a.get("class"), Some("hero pc"));
    }

    #[test]
    fn concatenate_without_existing_value_sets() {
        let mut a = Attributes::new();
        a.insert("class", "pc", MergePolicy::ConcatenateWithSpace);
        assert_eq!(a.get("class"), Some("pc"));
    }

    #[test]
    fn concatenate_onto_empty_value_does_not_add_space() {
        let mut a = attrs(&[("class", "")]);
        a.insert("class", "sp", MergePolicy::ConcatenateWithSpace);
        assert_eq!(a.get("class"), Some("sp"));
    }

    // =========================================================================
    // standard_image
    // =========================================================================

    #[test]
    fn standard_image_declares_retina_srcset() {
        let html = standard_image("photo.png", &Attributes::new()).into_string();
        assert_eq!(html, r#"<img src="photo.png" srcset="photo@2x.png 2x">"#);
    }

    #[test]
    fn standard_image_keeps_caller_attributes_in_key_order() {
        let html = standard_image("a.jpg", &attrs(&[("width", "10"), ("alt", "A")])).into_string();
        assert_eq!(
            html,
            r#"<img src="a.jpg" srcset="a@2x.jpg 2x" alt="A" width="10">"#
        );
    }

    #[test]
    fn standard_image_srcset_and_src_cannot_be_overridden() {
        let html = standard_image(
            "a.jpg",
            &attrs(&[("srcset", "evil.jpg 2x"), ("src", "other.jpg")]),
        )
        .into_string();
        assert!(html.contains(r#"srcset="a@2x.jpg 2x""#));
        assert!(html.contains(r#"src="a.jpg""#));
        assert!(!html.contains("evil"));
        assert!(!html.contains("other"));
    }

    #[test]
    fn standard_image_escapes_values() {
        let html = standard_image("a.jpg", &attrs(&[("alt", r#"Tom & "Jerry" <3"#)])).into_string();
        assert!(html.contains("alt=\"Tom &amp; &quot;Jerry&quot; &lt;3\""));
    }

    #[test]
    fn invalid_attribute_names_are_dropped() {
        let bad = attrs(&[("onload=\"x\"", "1"), ("data-id", "7")]);
        let html = standard_image("a.jpg", &bad).into_string();
        assert!(!html.contains("onload"));
        assert!(html.contains(r#"data-id="7""#));
    }

    // =========================================================================
    // device_variant_image
    // =========================================================================

    #[test]
    fn device_variant_renders_desktop_then_mobile() {
        let html = device_variant_image("photo.png", &attrs(&[("id", "hero")])).into_string();
        assert_eq!(
            html,
            concat!(
                r#"<img src="photo.png" srcset="photo@2x.png 2x" class="pc" id="hero">"#,
                r#"<img src="photo-sp.png" srcset="photo-sp@2x.png 2x" class="sp" id="hero_sp">"#,
            )
        );
    }

    #[test]
    fn device_variant_concatenates_caller_class() {
        let html = device_variant_image("a.png", &attrs(&[("class", "fit")])).into_string();
        assert!(html.contains(r#"class="fit pc""#));
        assert!(html.contains(r#"class="fit sp""#));
    }

    #[test]
    fn device_variant_without_id_adds_none() {
        let html = device_variant_image("a.png", &Attributes::new()).into_string();
        assert!(!html.contains("id="));
    }

    #[test]
    fn device_variant_does_not_mutate_caller_attributes() {
        let original = attrs(&[("id", "hero"), ("class", "fit")]);
        let _ = device_variant_image("a.png", &original);
        assert_eq!(original.get("id"), Some("hero"));
        assert_eq!(original.get("class"), Some("fit"));
    }
}
