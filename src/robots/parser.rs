//! Robots.txt parser implementation
//!
//! This module provides functionality for parsing robots.txt content using the robotstxt crate.

use robotstxt::DefaultMatcher;
use url::Url;

/// Parsed robots.txt data
///
/// This is a wrapper around the robotstxt crate's types, providing a simplified
/// interface for checking if URLs are allowed and listing declared sitemaps.
#[derive(Debug, Clone)]
pub struct ParsedRobots {
    /// Raw robots.txt content (empty string means allow all)
    content: String,
    /// Whether to allow all (true = allow all, false = parse content)
    allow_all: bool,
}

impl ParsedRobots {
    /// Creates a new ParsedRobots from raw robots.txt content
    pub fn from_content(content: &str) -> Self {
        Self {
            content: content.to_string(),
            allow_all: false,
        }
    }

    /// Creates a permissive ParsedRobots that allows everything
    ///
    /// This is used when robots.txt cannot be fetched.
    pub fn allow_all() -> Self {
        Self {
            content: String::new(),
            allow_all: true,
        }
    }

    /// Checks if a URL is allowed for the given user agent
    ///
    /// # Arguments
    ///
    /// * `url` - An absolute URL or a path (e.g., "/page.html")
    /// * `user_agent` - The crawler's product token
    pub fn is_allowed(&self, url: &str, user_agent: &str) -> bool {
        if self.allow_all || self.content.is_empty() {
            return true;
        }

        let mut matcher = DefaultMatcher::default();
        matcher.one_agent_allowed_by_robots(&self.content, user_agent, url)
    }

    /// Lists the `Sitemap:` URLs, resolved against `base`
    ///
    /// The directive is matched case-insensitively and may appear anywhere in
    /// the file. Entries that do not resolve to an http(s) URL are dropped.
    pub fn sitemaps(&self, base: &Url) -> Vec<Url> {
        let mut sitemaps: Vec<Url> = Vec::new();

        for line in self.content.lines() {
            let trimmed = line.trim();
            let Some((key, value)) = trimmed.split_once(':') else {
                continue;
            };
            if !key.trim().eq_ignore_ascii_case("sitemap") {
                continue;
            }

            // Strip trailing comments
            let value = value.split('#').next().unwrap_or("").trim();
            if value.is_empty() {
                continue;
            }

            match base.join(value) {
                Ok(url) if matches!(url.scheme(), "http" | "https") => {
                    if !sitemaps.contains(&url) {
                        sitemaps.push(url);
                    }
                }
                Ok(url) => tracing::debug!("Ignoring non-http sitemap {}", url),
                Err(e) => tracing::debug!("Ignoring unparsable sitemap '{}': {}", value, e),
            }
        }

        sitemaps
    }
}
