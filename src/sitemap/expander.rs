use super::parser::{decode_body, parse_sitemap, SitemapParse};
use crate::config::Config;
use crate::fetch::{fetch_once, retry_with_backoff, FetchError, RetryPolicy};
use crate::robots::ParsedRobots;
use crate::url::{canonicalize, CanonicalUrl, HostFilter};
use reqwest::Client;
use std::collections::{HashSet, VecDeque};
use std::time::Duration;
use url::Url;

/// Traversal limits and politeness settings
#[derive(Debug, Clone)]
pub struct ExpanderOptions {
    /// Stop once this many candidate pages are collected
    pub max_pages: usize,
    /// Stop after fetching this many sitemap documents
    pub max_sitemaps: usize,
    /// Delay between successive sitemap fetches
    pub rate: Duration,
    pub fetch_timeout: Duration,
    pub retry: RetryPolicy,
    /// Product token matched against robots.txt groups
    pub user_agent: String,
}

impl ExpanderOptions {
    /// Sitemap documents are retried once
    pub fn from_config(config: &Config) -> Self {
        Self {
            max_pages: config.crawler.max_pages_per_host,
            max_sitemaps: config.crawler.max_sitemaps_per_host,
            rate: Duration::from_millis(config.crawler.rate_ms),
            fetch_timeout: Duration::from_millis(config.crawler.fetch_timeout_ms),
            retry: RetryPolicy::from_config(&config.crawler).with_retries(1),
            user_agent: config.user_agent.crawler_name.clone(),
        }
    }
}

/// Breadth-first walker over one host's sitemap graph
pub struct SitemapExpander {
    client: Client,
    options: ExpanderOptions,
}

impl SitemapExpander {
    pub fn new(client: Client, options: ExpanderOptions) -> Self {
        Self { client, options }
    }

    /// Seeds for a host: every `Sitemap:` from robots.txt, then `/sitemap.xml`
    pub fn seeds(origin: &Url, robots: &ParsedRobots) -> Vec<Url> {
        let mut seeds = robots.sitemaps(origin);
        if let Ok(fallback) = origin.join("/sitemap.xml") {
            if !seeds.contains(&fallback) {
                seeds.push(fallback);
            }
        }
        seeds
    }

    /// Walks the sitemap graph from `seeds` and returns candidate pages
    ///
    /// Locations ending in `.xml` or `.xml.gz` are queued as further sitemap
    /// documents; everything else is a page, kept when `filter` allows its
    /// host and, if `robots` is given, when robots.txt allows it. Each
    /// sitemap URL is fetched at most once. The homepage is always the first
    /// candidate, whatever the traversal finds.
    pub async fn expand(
        &self,
        homepage: &CanonicalUrl,
        seeds: Vec<Url>,
        filter: &HostFilter,
        robots: Option<&ParsedRobots>,
    ) -> Vec<CanonicalUrl> {
        let mut queue: VecDeque<Url> = seeds.into_iter().collect();
        let mut visited: HashSet<String> = HashSet::new();
        let mut pages: Vec<CanonicalUrl> = Vec::new();
        let mut page_set: HashSet<String> = HashSet::new();
        let mut fetched = 0usize;

        while let Some(sitemap) = queue.pop_front() {
            if pages.len() >= self.options.max_pages {
                break;
            }
            if !visited.insert(sitemap.as_str().to_string()) {
                continue;
            }
            if fetched >= self.options.max_sitemaps {
                tracing::debug!(
                    host = %homepage.host(),
                    "Sitemap limit of {} reached",
                    self.options.max_sitemaps
                );
                break;
            }
            if fetched > 0 {
                tokio::time::sleep(self.options.rate).await;
            }
            fetched += 1;

            let parsed = match self.fetch_sitemap(&sitemap).await {
                Ok(parsed) => parsed,
                Err(e) => {
                    tracing::debug!(sitemap = %sitemap, error = %e, "Sitemap unavailable");
                    continue;
                }
            };

            if let SitemapParse::Failed(reason) = &parsed {
                tracing::debug!(sitemap = %sitemap, "Sitemap unparsable: {}", reason);
                continue;
            }
            tracing::trace!(
                sitemap = %sitemap,
                strategy = parsed.strategy(),
                locs = parsed.locs().len(),
                "Parsed sitemap"
            );

            for loc in parsed.locs() {
                let Ok(resolved) = sitemap.join(loc) else {
                    continue;
                };

                if is_sitemap_url(&resolved) {
                    if !visited.contains(resolved.as_str()) {
                        queue.push_back(resolved);
                    }
                    continue;
                }

                let Ok(page) = canonicalize(resolved.as_str()) else {
                    continue;
                };
                if !filter.allows(page.as_url()) {
                    continue;
                }
                if let Some(robots) = robots {
                    if !robots.is_allowed(page.as_str(), &self.options.user_agent) {
                        tracing::trace!(url = %page, "Disallowed by robots.txt");
                        continue;
                    }
                }

                if page_set.insert(page.as_str().to_string()) {
                    pages.push(page);
                    if pages.len() >= self.options.max_pages {
                        break;
                    }
                }
            }
        }

        if !page_set.contains(homepage.as_str()) {
            pages.insert(0, homepage.clone());
        }

        tracing::debug!(
            host = %homepage.host(),
            sitemaps = fetched,
            candidates = pages.len(),
            "Sitemap expansion finished"
        );
        pages
    }

    async fn fetch_sitemap(&self, url: &Url) -> Result<SitemapParse, FetchError> {
        let fetched = retry_with_backoff(
            &self.options.retry,
            |_| fetch_once(&self.client, url.as_str(), self.options.fetch_timeout),
            FetchError::is_retryable,
        )
        .await?;

        let text = decode_body(url.as_str(), &fetched.content_type, &fetched.body)
            .map_err(|e| FetchError::Body(e.to_string()))?;
        Ok(parse_sitemap(&text))
    }
}

fn is_sitemap_url(url: &Url) -> bool {
    let path = url.path().to_ascii_lowercase();
    path.ends_with(".xml") || path.ends_with(".xml.gz")
}
