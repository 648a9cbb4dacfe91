//! Sitemap discovery
//!
//! This module handles:
//! - Decoding (optionally gzipped) sitemap documents
//! - Parsing `urlset` and `sitemapindex` documents, with a raw `<loc>` scan
//!   as a tagged fallback for malformed XML
//! - Breadth-first expansion of a host's sitemap graph into candidate pages

mod expander;
mod parser;

pub use expander::{ExpanderOptions, SitemapExpander};
pub use parser::{decode_body, parse_sitemap, SitemapParse};
