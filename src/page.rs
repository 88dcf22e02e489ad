//! Small helpers for page templates.

use crate::config::I18nConfig;

/// Whether `path` is the URL of the page currently being rendered.
pub fn is_current_page(current_url: &str, path: &str) -> bool {
    current_url == path
}

/// Replace every line break (`\r\n`, `\r` or `\n`) with `<br>`.
pub fn nl2br(text: &str) -> String {
    text.replace("\r\n", "<br>")
        .replace(['\r', '\n'], "<br>")
}

/// Configured locales other than `current`, in configured order.
pub fn other_locales<'a>(i18n: &'a I18nConfig, current: &str) -> Vec<&'a str> {
    i18n.locales
        .iter()
        .map(String::as_str)
        .filter(|l| *l != current)
        .collect()
}
