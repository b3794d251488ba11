//! URL handling module for Kumo
//!
//! Host extraction is the basis for per-host admission control: every URL
//! admitted to the crawl is keyed by its lowercased host component.

mod host;

pub use host::host_of;
