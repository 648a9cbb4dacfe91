//! Configuration module
//!
//! This module handles loading, parsing, and validating TOML configuration
//! files, and loading the domain list a crawl run is partitioned from.
//!
//! # Example
//!
//! ```no_run
//! use sitemap_shard_indexer::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("crawler.toml")).unwrap();
//! println!("Shard {} of {}", config.shard.index, config.shard.count);
//! ```

mod domains;
mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{Config, CrawlerConfig, IndexConfig, ShardConfig, StateConfig, UserAgentConfig};

// Re-export parser functions
pub use domains::{load_domain_list, parse_domain_list};
pub use parser::{compute_config_hash, load_config, load_config_with_hash, parse_config};
pub use validation::validate;
