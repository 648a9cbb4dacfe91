use serde::Deserialize;

/// Main configuration structure
///
/// Every section and field has a default, so an empty file (or no file at
/// all) yields a usable configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub shard: ShardConfig,
    pub crawler: CrawlerConfig,
    pub state: StateConfig,
    pub index: IndexConfig,
    #[serde(rename = "user-agent")]
    pub user_agent: UserAgentConfig,
}

/// Shard selection
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ShardConfig {
    /// Index of the shard processed by this run
    pub index: u32,

    /// Total number of shards the domain list is split into
    pub count: u32,

    /// Soft cap on the number of domains one shard processes
    #[serde(rename = "max-domains")]
    pub max_domains: usize,
}

impl Default for ShardConfig {
    fn default() -> Self {
        Self {
            index: 0,
            count: 1,
            max_domains: 3000,
        }
    }
}

/// Fetching behavior
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CrawlerConfig {
    /// Number of concurrent fetch workers
    pub concurrency: usize,

    /// Delay before every request and between sitemap fetches (milliseconds)
    #[serde(rename = "rate-ms")]
    pub rate_ms: u64,

    /// Hard timeout for a single fetch attempt (milliseconds)
    #[serde(rename = "fetch-timeout-ms")]
    pub fetch_timeout_ms: u64,

    /// Timeout for the robots.txt request (milliseconds)
    #[serde(rename = "robots-timeout-ms")]
    pub robots_timeout_ms: u64,

    /// Wall-clock budget for one host's whole pipeline (milliseconds)
    #[serde(rename = "host-timeout-ms")]
    pub host_timeout_ms: u64,

    /// Maximum number of candidate pages per host
    #[serde(rename = "max-pages-per-host")]
    pub max_pages_per_host: usize,

    /// Maximum number of sitemap documents fetched per host
    #[serde(rename = "max-sitemaps-per-host")]
    pub max_sitemaps_per_host: usize,

    /// Page records a shard run produces before it stops starting new hosts
    #[serde(rename = "max-total-pages")]
    pub max_total_pages: usize,

    /// Number of retries after the first failed attempt
    pub retries: u32,

    /// Base of the exponential backoff (milliseconds)
    #[serde(rename = "retry-backoff-ms")]
    pub retry_backoff_ms: u64,

    /// Upper bound for a single backoff sleep (milliseconds)
    #[serde(rename = "max-backoff-ms")]
    pub max_backoff_ms: u64,

    /// Reject pages whose title, description or text is empty
    #[serde(rename = "strict-extraction")]
    pub strict_extraction: bool,

    /// Drop sitemap candidates disallowed by robots.txt
    #[serde(rename = "respect-robots")]
    pub respect_robots: bool,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            concurrency: 5,
            rate_ms: 200,
            fetch_timeout_ms: 12_000,
            robots_timeout_ms: 6_000,
            host_timeout_ms: 300_000,
            max_pages_per_host: 10,
            max_sitemaps_per_host: 50,
            max_total_pages: 30_000,
            retries: 2,
            retry_backoff_ms: 600,
            max_backoff_ms: 20_000,
            strict_extraction: true,
            respect_robots: true,
        }
    }
}

/// Re-crawl suppression and ledger bounds
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StateConfig {
    /// Minimum number of days before a host is crawled again
    #[serde(rename = "days-no-check")]
    pub days_no_check: u32,

    /// Cap on remembered page URLs per host
    #[serde(rename = "max-urls-per-host")]
    pub max_urls_per_host: usize,

    /// Ignore the freshness TTL and crawl every assigned host
    pub force: bool,
}

impl Default for StateConfig {
    fn default() -> Self {
        Self {
            days_no_check: 4,
            max_urls_per_host: 10_000,
            force: false,
        }
    }
}

/// Page record limits
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct IndexConfig {
    /// Maximum characters kept in title, description and text
    #[serde(rename = "max-field-chars")]
    pub max_field_chars: usize,

    /// Maximum characters of paragraph text aggregated before truncation
    #[serde(rename = "max-text-chars")]
    pub max_text_chars: usize,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            max_field_chars: 100,
            max_text_chars: 120_000,
        }
    }
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct UserAgentConfig {
    /// Name of the crawler
    #[serde(rename = "crawler-name")]
    pub crawler_name: String,

    /// Version of the crawler
    #[serde(rename = "crawler-version")]
    pub crawler_version: String,

    /// URL with information about the crawler
    #[serde(rename = "contact-url")]
    pub contact_url: String,

    /// Email address for crawler-related contact
    #[serde(rename = "contact-email")]
    pub contact_email: String,
}

impl UserAgentConfig {
    /// Formats the User-Agent header: `Name/Version (+ContactURL; ContactEmail)`
    pub fn header_value(&self) -> String {
        format!(
            "{}/{} (+{}; {})",
            self.crawler_name, self.crawler_version, self.contact_url, self.contact_email
        )
    }
}

impl Default for UserAgentConfig {
    fn default() -> Self {
        Self {
            crawler_name: "SitemapShardIndexer".to_string(),
            crawler_version: env!("CARGO_PKG_VERSION").to_string(),
            contact_url: "https://example.com/crawler".to_string(),
            contact_email: "crawler@example.com".to_string(),
        }
    }
}
