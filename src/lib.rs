//! Kumo: a concurrent, depth-bounded web crawler
//!
//! Kumo downloads a seed URL and recursively fetches linked pages up to a
//! fixed depth, bounding the number of simultaneous downloads per host while
//! collecting per-URL failures instead of aborting the whole crawl.

pub mod config;
pub mod crawler;
pub mod state;
pub mod url;

use thiserror::Error;

/// Main error type for Kumo operations
#[derive(Debug, Error)]
pub enum KumoError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("URL error: {0}")]
    Url(#[from] UrlError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("URL has no host component: {0}")]
    MissingHost(String),
}

/// Result type alias for Kumo operations
pub type Result<T> = std::result::Result<T, KumoError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{Crawler, Document, Downloader, FetchError, HttpDownloader};
pub use state::{CrawlResult, CrawlTask};
pub use crate::url::host_of;
