//! The download seam and its HTTP implementation
//!
//! The crawler only ever talks to a `Downloader`, so tests can substitute a
//! scripted one. The production `HttpDownloader` fetches pages with reqwest
//! and parses links out of the body with scraper, mirroring the usual rules:
//! follow `<a href>`, skip download links and non-navigational schemes,
//! resolve relative hrefs against the final URL after redirects.

use crate::config::UserAgentConfig;
use crate::UrlError;
use async_trait::async_trait;
use reqwest::Client;
use scraper::{Html, Selector};
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// A failure attributable to a single URL during the crawl
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Malformed URL: {0}")]
    Url(#[from] UrlError),

    #[error("HTTP status {0}")]
    Status(u16),

    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Link extraction failed: {0}")]
    Extract(String),
}

/// A successfully downloaded page
///
/// Implementations must be `Send`: documents are handed from the download
/// workers to the extraction workers.
pub trait Document: Send {
    /// Extracts the outgoing links of this page as absolute URL strings
    ///
    /// A single pass is sufficient; callers never extract twice.
    fn extract_links(&self) -> Result<Vec<String>, FetchError>;
}

/// Fetches URLs on behalf of the crawler
#[async_trait]
pub trait Downloader: Send + Sync {
    /// Downloads one URL, returning the page or the failure cause
    async fn fetch(&self, url: &str) -> Result<Box<dyn Document>, FetchError>;
}

/// Builds the HTTP client used by `HttpDownloader`
///
/// The user agent is formatted as `name/version (+contact-url)` so site
/// operators can identify and reach us.
pub fn build_http_client(
    user_agent: &UserAgentConfig,
    timeout_ms: u64,
) -> Result<Client, reqwest::Error> {
    let agent = format!(
        "{}/{} (+{})",
        user_agent.crawler_name, user_agent.crawler_version, user_agent.contact_url
    );

    Client::builder()
        .user_agent(agent)
        .timeout(Duration::from_millis(timeout_ms))
        .connect_timeout(Duration::from_secs(10))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Production downloader backed by reqwest
pub struct HttpDownloader {
    client: Client,
}

impl HttpDownloader {
    /// Creates a downloader with the given identification and timeout
    pub fn new(user_agent: &UserAgentConfig, timeout_ms: u64) -> Result<Self, reqwest::Error> {
        Ok(Self {
            client: build_http_client(user_agent, timeout_ms)?,
        })
    }

    /// Creates a downloader around an existing client
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Downloader for HttpDownloader {
    async fn fetch(&self, url: &str) -> Result<Box<dyn Document>, FetchError> {
        let response = self.client.get(url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }

        // The final URL after redirects is the base for relative links
        let final_url = response.url().clone();
        let content_type = response
            .headers()
            .get("content-type")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_string();
        let body = response.text().await?;

        Ok(Box::new(HttpDocument {
            base: final_url,
            content_type,
            body,
        }))
    }
}

/// A fetched page; the body is parsed lazily on the extraction workers
///
/// `scraper::Html` is not `Send`, so the document carries the raw body and
/// builds the DOM inside `extract_links`.
struct HttpDocument {
    base: Url,
    content_type: String,
    body: String,
}

impl Document for HttpDocument {
    fn extract_links(&self) -> Result<Vec<String>, FetchError> {
        // Non-HTML payloads have no links to follow
        if !self.content_type.is_empty() && !self.content_type.contains("text/html") {
            return Ok(Vec::new());
        }

        let document = Html::parse_document(&self.body);
        let selector = Selector::parse("a[href]")
            .map_err(|e| FetchError::Extract(format!("bad selector: {}", e)))?;

        let mut links = Vec::new();
        for element in document.select(&selector) {
            // Skip if it has the download attribute
            if element.value().attr("download").is_some() {
                continue;
            }

            if let Some(href) = element.value().attr("href") {
                if let Some(absolute) = resolve_link(href, &self.base) {
                    links.push(absolute);
                }
            }
        }

        Ok(links)
    }
}

/// Resolves a link href to an absolute URL string
///
/// Returns None for links that should be excluded:
/// - `javascript:`, `mailto:`, `tel:` and data URIs
/// - hrefs that cannot be resolved against the base
///
/// Fragments are stripped so `/page#a` and `/page#b` dedup to one URL.
fn resolve_link(href: &str, base: &Url) -> Option<String> {
    let trimmed = href.trim();
    if trimmed.is_empty() {
        return None;
    }

    let lower = trimmed.to_lowercase();
    for scheme in ["javascript:", "mailto:", "tel:", "data:"] {
        if lower.starts_with(scheme) {
            return None;
        }
    }

    let mut resolved = base.join(trimmed).ok()?;
    resolved.set_fragment(None);

    match resolved.scheme() {
        "http" | "https" => Some(resolved.to_string()),
        _ => None,
    }
}
