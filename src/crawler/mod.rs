//! Crawler module for concurrent page fetching
//!
//! This module contains the core crawling machinery:
//! - The `Downloader`/`Document` seam and its HTTP implementation
//! - Fixed-size worker pools for downloads and link extraction
//! - Per-host admission control with FIFO fairness
//! - The coordinator tying it all together behind `download`/`close`

mod coordinator;
mod downloader;
mod gate;
mod pool;

pub use coordinator::Crawler;
pub use downloader::{build_http_client, Document, Downloader, FetchError, HttpDownloader};
pub use gate::HostGate;
pub use pool::{Job, WorkerPool};
