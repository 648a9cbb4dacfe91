//! Robots.txt handling module
//!
//! robots.txt is fetched once per host. Its `Sitemap:` lines seed sitemap
//! discovery, and its rules can optionally filter sitemap-discovered pages.

mod parser;

pub use parser::ParsedRobots;

use crate::fetch::{fetch_once, FetchError};
use reqwest::Client;
use std::time::Duration;
use url::Url;

/// Fetches robots.txt for a host origin
///
/// Any failure (unreachable host, error status, timeout) yields a permissive
/// [`ParsedRobots`] with no sitemaps; the host is still crawled.
pub async fn fetch_robots(client: &Client, origin: &Url, timeout: Duration) -> ParsedRobots {
    let robots_url = match origin.join("/robots.txt") {
        Ok(url) => url,
        Err(e) => {
            tracing::warn!("Cannot build robots.txt URL for {}: {}", origin, e);
            return ParsedRobots::allow_all();
        }
    };

    match fetch_once(client, robots_url.as_str(), timeout).await {
        Ok(fetched) => {
            tracing::debug!("Fetched {} ({} bytes)", robots_url, fetched.body.len());
            ParsedRobots::from_content(&fetched.text())
        }
        Err(FetchError::Http { status }) => {
            tracing::debug!("No robots.txt at {} (HTTP {})", robots_url, status);
            ParsedRobots::allow_all()
        }
        Err(e) => {
            tracing::warn!(url = %robots_url, error = %e, "robots.txt unreachable");
            ParsedRobots::allow_all()
        }
    }
}
