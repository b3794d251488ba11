use serde::Deserialize;

/// Main configuration structure for Kumo
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub crawler: CrawlerConfig,
    #[serde(rename = "user-agent", default)]
    pub user_agent: UserAgentConfig,
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlerConfig {
    /// Number of workers executing page downloads
    #[serde(rename = "download-workers", default = "default_download_workers")]
    pub download_workers: usize,

    /// Number of workers executing link extraction
    #[serde(rename = "extract-workers", default = "default_extract_workers")]
    pub extract_workers: usize,

    /// Maximum concurrent downloads against one host
    #[serde(rename = "max-per-host", default = "default_max_per_host")]
    pub max_per_host: usize,

    /// Per-request timeout in milliseconds
    #[serde(rename = "request-timeout-ms", default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

fn default_download_workers() -> usize {
    16
}

fn default_extract_workers() -> usize {
    8
}

fn default_max_per_host() -> usize {
    4
}

fn default_request_timeout_ms() -> u64 {
    30_000
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            download_workers: default_download_workers(),
            extract_workers: default_extract_workers(),
            max_per_host: default_max_per_host(),
            request_timeout_ms: default_request_timeout_ms(),
        }
    }
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
pub struct UserAgentConfig {
    /// Name of the crawler
    #[serde(rename = "crawler-name", default = "default_crawler_name")]
    pub crawler_name: String,

    /// Version of the crawler
    #[serde(rename = "crawler-version", default = "default_crawler_version")]
    pub crawler_version: String,

    /// URL with information about the crawler
    #[serde(rename = "contact-url", default = "default_contact_url")]
    pub contact_url: String,
}

fn default_crawler_name() -> String {
    "kumo".to_string()
}

fn default_crawler_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

fn default_contact_url() -> String {
    "https://example.com/kumo".to_string()
}

impl Default for UserAgentConfig {
    fn default() -> Self {
        Self {
            crawler_name: default_crawler_name(),
            crawler_version: default_crawler_version(),
            contact_url: default_contact_url(),
        }
    }
}
