use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

// Caps applied by page fetchers before a PageSignals value leaves them.
pub const MAX_TEXT_CONTENT: usize = 5_000;
pub const MAX_HTML_EXCERPT: usize = 10_000;
pub const MAX_INLINE_CSS: usize = 5_000;
pub const MAX_LINKS: usize = 50;
pub const MAX_IMAGES: usize = 20;
pub const MAX_STYLE_SHEETS: usize = 10;

/// Summary of one fetched page. Built once per request and never mutated.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageSignals {
    pub url: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub meta_data: BTreeMap<String, String>,
    #[serde(default)]
    pub text_content: String,
    #[serde(default)]
    pub html_excerpt: String,
    #[serde(default)]
    pub links: Vec<LinkInfo>,
    #[serde(default)]
    pub images: Vec<ImageInfo>,
    #[serde(default)]
    pub style_hints: StyleHints,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkInfo {
    pub text: String,
    pub href: String,
    pub absolute_url: String,
    pub is_external: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageInfo {
    pub src: String,
    pub absolute_url: String,
    #[serde(default)]
    pub alt: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StyleHints {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inline_css: Option<String>,
    #[serde(default)]
    pub external_sheet_urls: Vec<String>,
}

impl PageSignals {
    /// Minimal signals for a URL, used when only the address is known.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_text_content(mut self, text: impl Into<String>) -> Self {
        self.text_content = text.into();
        self
    }

    /// Enforce the fetcher caps on every field. Idempotent.
    pub fn capped(mut self) -> Self {
        self.text_content = truncate_chars(&self.text_content, MAX_TEXT_CONTENT).to_string();
        self.html_excerpt = truncate_chars(&self.html_excerpt, MAX_HTML_EXCERPT).to_string();
        self.links.truncate(MAX_LINKS);
        self.images.truncate(MAX_IMAGES);
        if let Some(css) = self.style_hints.inline_css.as_mut() {
            *css = truncate_chars(css, MAX_INLINE_CSS).to_string();
        }
        self.style_hints.external_sheet_urls.truncate(MAX_STYLE_SHEETS);
        self
    }
}

/// Prefix `https://` when the input has no http(s) scheme.
pub fn normalize_url(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        trimmed.to_string()
    } else {
        format!("https://{trimmed}")
    }
}

/// Keep at most `max` chars from the start of `s`, respecting char boundaries.
pub fn truncate_chars(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_url() {
        assert_eq!(normalize_url("example.com"), "https://example.com");
        assert_eq!(normalize_url("  http://a.io/x "), "http://a.io/x");
        assert_eq!(normalize_url("https://a.io"), "https://a.io");
    }

    #[test]
    fn test_truncate_chars_respects_boundaries() {
        assert_eq!(truncate_chars("héllo", 2), "hé");
        assert_eq!(truncate_chars("abc", 10), "abc");
        assert_eq!(truncate_chars("", 3), "");
    }

    #[test]
    fn test_capped_limits_fields() {
        let mut signals = PageSignals::new("https://a.io").with_text_content("x".repeat(9_000));
        signals.links = vec![LinkInfo::default(); 80];
        signals.style_hints.inline_css = Some("y".repeat(6_000));

        let capped = signals.capped();
        assert_eq!(capped.text_content.len(), MAX_TEXT_CONTENT);
        assert_eq!(capped.links.len(), MAX_LINKS);
        assert_eq!(capped.style_hints.inline_css.unwrap().len(), MAX_INLINE_CSS);
    }
}
