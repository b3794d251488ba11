//! Configuration module for Kumo
//!
//! This module handles loading, parsing, and validating TOML configuration
//! files. Every setting has a default, so a config file is optional; CLI
//! flags may override individual values on top.

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{Config, CrawlerConfig, UserAgentConfig};

// Re-export parser and validation functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash};
pub use validation::{validate, validate_crawler};
