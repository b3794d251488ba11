//! State module for tracking crawl progress
//!
//! This module provides the shared bookkeeping for one `download` call:
//!
//! - `TaskLatch`: a dynamic join barrier over a task graph whose final size
//!   is unknown when the crawl starts
//! - `CrawlState`: concurrent visited-set and error-map, plus the latch
//! - `CrawlTask` / `CrawlResult`: the unit of work and the final outcome

mod crawl;
mod latch;

pub use crawl::{CrawlResult, CrawlState, CrawlTask};
pub(crate) use crawl::CompletionGuard;
pub use latch::TaskLatch;
