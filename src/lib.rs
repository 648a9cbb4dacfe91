//! Sitemap Shard Indexer: a sharded, polite sitemap crawler
//!
//! This crate discovers pages through each host's sitemap graph, fetches them
//! under a bounded, rate-limited worker pool, and merges independently produced
//! shard artifacts into one deduplicated text index plus a crawl-state ledger.

pub mod config;
pub mod fetch;
pub mod merge;
pub mod output;
pub mod robots;
pub mod shard;
pub mod sitemap;
pub mod state;
pub mod url;

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for crawl and merge runs
#[derive(Debug, Error)]
pub enum CrawlError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("URL error: {0}")]
    Url(#[from] UrlError),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Mandatory input not found: {}", .0.display())]
    MissingInput(PathBuf),

    #[error("Failed to write output {}: {source}", path.display())]
    Output {
        path: PathBuf,
        source: std::io::Error,
    },
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
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum UrlError {
    #[error("Empty URL")]
    Empty,

    #[error("Failed to parse URL '{input}': {reason}")]
    Parse { input: String, reason: String },

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Missing host in URL: {0}")]
    MissingHost(String),
}

/// Result type alias for crawl and merge operations
pub type Result<T> = std::result::Result<T, CrawlError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export commonly used types
pub use config::Config;
pub use merge::{MergeInputs, ShardMergeEngine};
pub use shard::{assign, ShardWorker};
pub use state::{CrawlStateStore, HostState};
pub use url::{canonicalize, stable_hash, CanonicalUrl, DomainEntry};
