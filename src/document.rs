//! Page access
//!
//! A page is read through a [`DocumentSource`], which returns a fresh
//! [`PageSnapshot`] on every call. Extraction functions only ever see a parsed
//! [`PageDocument`], so they can run against fixture markup as easily as
//! against a live page.

use std::future::Future;
use std::path::PathBuf;
use std::sync::OnceLock;
use std::time::Duration;

use encoding_rs::{Encoding, UTF_8};
use regex::bytes::Regex;
use scraper::{Html, Selector};
use url::Url;

use crate::error::{ParserError, Result};

/// One read of a page: the markup and the URL it was served from, if known.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageSnapshot {
    pub url: Option<Url>,
    pub body: String,
}

/// Something that can produce the current state of a page.
pub trait DocumentSource {
    /// Read the page as it is right now.
    fn fetch(&self) -> impl Future<Output = Result<PageSnapshot>> + Send;

    /// Human-readable name for log lines.
    fn describe(&self) -> String;
}

/// A saved HTML file, re-read on every fetch.
#[derive(Debug, Clone)]
pub struct FileSource {
    path: PathBuf,
    url: Option<Url>,
}

impl FileSource {
    /// `url` is the address the page was saved from; it drives relative
    /// image URLs, the filename prefix and page detection.
    pub fn new(path: impl Into<PathBuf>, url: Option<Url>) -> Self {
        Self {
            path: path.into(),
            url,
        }
    }
}

impl DocumentSource for FileSource {
    async fn fetch(&self) -> Result<PageSnapshot> {
        let bytes = tokio::fs::read(&self.path)
            .await
            .map_err(|e| ParserError::io(&self.path, e))?;
        Ok(PageSnapshot {
            url: self.url.clone(),
            body: decode_page(&bytes, None),
        })
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

/// A live page fetched over HTTP.
#[derive(Debug, Clone)]
pub struct HttpSource {
    client: reqwest::Client,
    url: Url,
}

impl HttpSource {
    pub fn new(url: Url, timeout: Duration, user_agent: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()?;
        Ok(Self { client, url })
    }

    pub fn with_client(client: reqwest::Client, url: Url) -> Self {
        Self { client, url }
    }
}

impl DocumentSource for HttpSource {
    async fn fetch(&self) -> Result<PageSnapshot> {
        let response = self.client.get(self.url.clone()).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ParserError::UnexpectedStatus {
                status: status.as_u16(),
                url: self.url.to_string(),
            });
        }
        let final_url = response.url().clone();
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(String::from);
        let bytes = response.bytes().await?;
        Ok(PageSnapshot {
            url: Some(final_url),
            body: decode_page(&bytes, content_type.as_deref()),
        })
    }

    fn describe(&self) -> String {
        self.url.to_string()
    }
}

fn charset_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"(?i)charset\s*=\s*["']?([a-z0-9_.:-]+)"#).expect("charset pattern is valid")
    })
}

const META_SNIFF_LEN: usize = 1024;

fn label_encoding(text: &[u8]) -> Option<&'static Encoding> {
    let label = charset_re().captures(text)?.get(1)?;
    Encoding::for_label(label.as_bytes())
}

/// Decode page bytes to text.
///
/// A byte order mark wins, then the `Content-Type` charset, then a
/// `<meta charset>` or `http-equiv` declaration near the top of the page.
/// Anything else is read as UTF-8 with invalid sequences replaced.
pub fn decode_page(bytes: &[u8], content_type: Option<&str>) -> String {
    let head = &bytes[..bytes.len().min(META_SNIFF_LEN)];
    let encoding = content_type
        .and_then(|ct| label_encoding(ct.as_bytes()))
        .or_else(|| label_encoding(head))
        .unwrap_or(UTF_8);

    // `decode` prefers a BOM over the given encoding.
    let (text, used, had_errors) = encoding.decode(bytes);
    if had_errors {
        tracing::debug!(encoding = used.name(), "page contained undecodable bytes");
    }
    text.into_owned()
}

/// Parsed page handed to the extractors.
pub struct PageDocument {
    html: Html,
    url: Option<Url>,
}

impl PageDocument {
    pub fn parse(body: &str, url: Option<Url>) -> Self {
        Self {
            html: Html::parse_document(body),
            url,
        }
    }

    pub fn from_snapshot(snapshot: &PageSnapshot) -> Self {
        Self::parse(&snapshot.body, snapshot.url.clone())
    }

    pub fn html(&self) -> &Html {
        &self.html
    }

    pub fn url(&self) -> Option<&Url> {
        self.url.as_ref()
    }

    /// Resolve an attribute value against the page URL, as the browser does
    /// for `img.src`. Without a page URL the raw value is returned.
    pub fn resolve(&self, raw: &str) -> String {
        let raw = raw.trim();
        match &self.url {
            Some(base) => base
                .join(raw)
                .map(|u| u.to_string())
                .unwrap_or_else(|_| raw.to_string()),
            None => raw.to_string(),
        }
    }

    /// Whether the selector matches at least one element.
    pub fn has_match(&self, selector_str: &str) -> bool {
        match selector(selector_str) {
            Some(sel) => self.html.select(&sel).next().is_some(),
            None => false,
        }
    }
}

/// Parse a CSS selector, logging instead of failing on bad input.
pub(crate) fn selector(selector_str: &str) -> Option<Selector> {
    match Selector::parse(selector_str) {
        Ok(s) => Some(s),
        Err(e) => {
            tracing::warn!(selector = selector_str, error = %e, "invalid CSS selector");
            None
        }
    }
}
