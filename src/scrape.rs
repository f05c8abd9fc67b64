//! Page-fetch and screenshot collaborators.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{redirect::Policy, Client};
use scraper::{ElementRef, Html, Selector};
use url::Url;

use crate::signals::{
    normalize_url, ImageInfo, LinkInfo, PageSignals, StyleHints, MAX_IMAGES, MAX_LINKS,
    MAX_STYLE_SHEETS,
};

/// Bodies past this are cut before parsing; the extracted fields are far smaller.
const MAX_PAGE_BYTES: usize = 5 * 1024 * 1024;

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
(KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

#[derive(Debug, Clone, PartialEq)]
pub enum FetchError {
    InvalidUrl(String),
    Network(String),
    Timeout,
    Status(u16),
}

impl std::fmt::Display for FetchError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FetchError::InvalidUrl(url) => write!(f, "invalid URL: {url}"),
            FetchError::Network(msg) => write!(f, "could not fetch page: {msg}"),
            FetchError::Timeout => write!(f, "page fetch timed out"),
            FetchError::Status(code) => write!(f, "page returned HTTP {code}"),
        }
    }
}

impl std::error::Error for FetchError {}

impl From<reqwest::Error> for FetchError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            FetchError::Timeout
        } else {
            FetchError::Network(e.to_string())
        }
    }
}

/// Turns a URL into capped page signals.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<PageSignals, FetchError>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScreenshotError(pub String);

impl std::fmt::Display for ScreenshotError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "screenshot failed: {}", self.0)
    }
}

impl std::error::Error for ScreenshotError {}

/// Produces a page screenshot as base64 or a data URL.
#[async_trait]
pub trait ScreenshotSource: Send + Sync {
    async fn capture(&self, url: &str) -> Result<String, ScreenshotError>;
}

/// Plain HTTP fetcher. One GET, no retries.
#[derive(Clone)]
pub struct HttpPageFetcher {
    http: Client,
}

impl HttpPageFetcher {
    pub fn new(timeout: Duration) -> Self {
        let http = Client::builder()
            .user_agent(USER_AGENT)
            .redirect(Policy::limited(8))
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| Client::new());
        Self { http }
    }
}

#[async_trait]
impl PageFetcher for HttpPageFetcher {
    async fn fetch(&self, url: &str) -> Result<PageSignals, FetchError> {
        let normalized = normalize_url(url);
        let parsed = Url::parse(&normalized).map_err(|_| FetchError::InvalidUrl(url.to_string()))?;

        log::info!("Fetching {parsed}");
        let resp = self
            .http
            .get(parsed.clone())
            .header(reqwest::header::ACCEPT, "text/html,application/xhtml+xml;q=0.9,*/*;q=0.8")
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }

        let html = read_body(resp, MAX_PAGE_BYTES).await?;
        let signals = extract_signals(&parsed, &html);
        log::debug!(
            "Extracted {} links, {} images from {}",
            signals.links.len(),
            signals.images.len(),
            signals.url
        );
        Ok(signals)
    }
}

/// Read at most `limit` bytes of the body, decoding lossily as UTF-8.
async fn read_body(mut resp: reqwest::Response, limit: usize) -> Result<String, FetchError> {
    if let Some(len) = resp.content_length() {
        if len > limit as u64 {
            log::warn!("Page declares {len} bytes; reading the first {limit}");
        }
    }

    let mut buf: Vec<u8> = Vec::new();
    while let Some(chunk) = resp.chunk().await? {
        let room = limit - buf.len();
        if chunk.len() >= room {
            buf.extend_from_slice(&chunk[..room]);
            break;
        }
        buf.extend_from_slice(&chunk);
    }
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

/// Build capped signals from a document.
pub fn extract_signals(base: &Url, html: &str) -> PageSignals {
    let doc = Html::parse_document(html);
    let meta_data = extract_meta(&doc);

    let title = select(&doc, "title")
        .next()
        .map(|t| collapse_whitespace(&t.text().collect::<String>()))
        .filter(|t| !t.is_empty())
        .or_else(|| meta_data.get("og:title").cloned())
        .unwrap_or_default();

    let description = meta_data
        .get("description")
        .or_else(|| meta_data.get("og:description"))
        .cloned()
        .unwrap_or_default();

    PageSignals {
        url: base.to_string(),
        title,
        description,
        meta_data,
        text_content: extract_text(&doc),
        html_excerpt: html.to_string(),
        links: extract_links(&doc, base),
        images: extract_images(&doc, base),
        style_hints: extract_styles(&doc, base),
    }
    .capped()
}

// Invalid selectors yield nothing.
fn select<'a>(doc: &'a Html, css: &str) -> impl Iterator<Item = ElementRef<'a>> + 'a {
    let selector = Selector::parse(css).ok();
    let matches: Vec<ElementRef<'a>> = match &selector {
        Some(sel) => doc.select(sel).collect(),
        None => Vec::new(),
    };
    matches.into_iter()
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn extract_meta(doc: &Html) -> BTreeMap<String, String> {
    select(doc, "meta")
        .filter_map(|m| {
            let el = m.value();
            let key = el.attr("name").or_else(|| el.attr("property"))?;
            let content = el.attr("content")?;
            Some((key.to_lowercase(), content.trim().to_string()))
        })
        .collect()
}

fn extract_text(doc: &Html) -> String {
    let Some(body) = select(doc, "body").next() else {
        return String::new();
    };

    let mut parts = Vec::new();
    for node in body.descendants() {
        let Some(text) = node.value().as_text() else {
            continue;
        };
        let hidden = node
            .parent()
            .and_then(|p| p.value().as_element().map(|e| e.name()))
            .is_some_and(|name| matches!(name, "script" | "style" | "noscript" | "template"));
        if !hidden {
            parts.push(&**text);
        }
    }
    collapse_whitespace(&parts.join(" "))
}

fn extract_links(doc: &Html, base: &Url) -> Vec<LinkInfo> {
    select(doc, "a[href]")
        .filter_map(|a| {
            let href = a.value().attr("href")?.trim();
            if href.is_empty() || href.starts_with('#') || href.starts_with("javascript:") {
                return None;
            }
            let absolute = base.join(href).ok()?;
            Some(LinkInfo {
                text: collapse_whitespace(&a.text().collect::<String>()),
                href: href.to_string(),
                is_external: absolute.host_str() != base.host_str(),
                absolute_url: absolute.to_string(),
            })
        })
        .take(MAX_LINKS)
        .collect()
}

fn extract_images(doc: &Html, base: &Url) -> Vec<ImageInfo> {
    select(doc, "img[src]")
        .filter_map(|img| {
            let el = img.value();
            let src = el.attr("src")?.trim();
            let absolute = base.join(src).ok()?;
            Some(ImageInfo {
                src: src.to_string(),
                absolute_url: absolute.to_string(),
                alt: el.attr("alt").unwrap_or_default().to_string(),
                width: el.attr("width").map(str::to_string),
                height: el.attr("height").map(str::to_string),
            })
        })
        .take(MAX_IMAGES)
        .collect()
}

fn extract_styles(doc: &Html, base: &Url) -> StyleHints {
    let inline = select(doc, "style")
        .map(|s| s.text().collect::<String>())
        .collect::<Vec<_>>()
        .join("\n");

    let external_sheet_urls = select(doc, "link[rel~=stylesheet][href]")
        .filter_map(|l| base.join(l.value().attr("href")?).ok())
        .map(|u| u.to_string())
        .take(MAX_STYLE_SHEETS)
        .collect();

    StyleHints {
        inline_css: Some(inline.trim().to_string()).filter(|css| !css.is_empty()),
        external_sheet_urls,
    }
}
