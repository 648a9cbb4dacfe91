use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;

/// Persisted bookkeeping for one host
///
/// Serialized in the ledger as `{ "lastAt": <epoch ms>, "urls": [...] }`,
/// keyed by host. `seen_urls` is kept in insertion order, oldest first, so
/// the cap can drop the oldest entries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostState {
    /// Host key; carried by the ledger map key, not serialized in the entry
    #[serde(skip)]
    pub host: String,

    /// When the host was last processed
    #[serde(
        rename = "lastAt",
        with = "chrono::serde::ts_milliseconds",
        default = "epoch"
    )]
    pub last_crawled_at: DateTime<Utc>,

    /// Page URLs already indexed for this host
    #[serde(rename = "urls", default)]
    pub seen_urls: Vec<String>,
}

fn epoch() -> DateTime<Utc> {
    DateTime::<Utc>::default()
}

impl HostState {
    /// Creates a state for a host that has never been crawled
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            last_crawled_at: epoch(),
            seen_urls: Vec::new(),
        }
    }

    /// Reads one ledger entry leniently
    ///
    /// A missing or non-numeric `lastAt` counts as never crawled and URLs
    /// that are not strings are dropped. Returns `None` when the entry is not
    /// an object.
    pub fn from_value(host: &str, value: &Value) -> Option<Self> {
        let entry = value.as_object()?;

        let last_at_ms = entry
            .get("lastAt")
            .and_then(|v| v.as_i64().or_else(|| v.as_f64().map(|ms| ms as i64)))
            .unwrap_or(0);
        let seen_urls = entry
            .get("urls")
            .and_then(Value::as_array)
            .map(|urls| {
                urls.iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        Some(Self {
            host: host.to_string(),
            last_crawled_at: DateTime::from_timestamp_millis(last_at_ms).unwrap_or_else(epoch),
            seen_urls,
        })
    }

    /// Checks whether the host was crawled within `ttl` of `now`
    ///
    /// Always false when `force` is set.
    pub fn is_fresh(&self, now: DateTime<Utc>, ttl: Duration, force: bool) -> bool {
        !force && now - self.last_crawled_at < ttl
    }

    /// Returns the seen URLs as a lookup set
    pub fn seen_set(&self) -> HashSet<&str> {
        self.seen_urls.iter().map(String::as_str).collect()
    }

    /// Records a completed crawl: advances `last_crawled_at` to `now` and adds
    /// the URLs fetched in this run, capped at `cap` (oldest dropped first)
    pub fn record_crawl<I>(&mut self, now: DateTime<Utc>, fetched: I, cap: usize)
    where
        I: IntoIterator<Item = String>,
    {
        self.last_crawled_at = now;
        self.seen_urls = union_capped(std::mem::take(&mut self.seen_urls), fetched, cap);
    }

    /// Merges another fragment for the same host
    ///
    /// Takes the latest `last_crawled_at` and the union of seen URLs, capped.
    pub fn merge_from(&mut self, other: HostState, cap: usize) {
        self.last_crawled_at = self.last_crawled_at.max(other.last_crawled_at);
        self.seen_urls = union_capped(std::mem::take(&mut self.seen_urls), other.seen_urls, cap);
    }

    /// Re-applies the URL cap (used for legacy entries that exceed it)
    pub fn enforce_cap(&mut self, cap: usize) {
        self.seen_urls = union_capped(std::mem::take(&mut self.seen_urls), Vec::new(), cap);
    }
}

/// Order-preserving union of two URL lists, keeping only the newest `cap`
fn union_capped<I>(existing: Vec<String>, incoming: I, cap: usize) -> Vec<String>
where
    I: IntoIterator<Item = String>,
{
    let mut seen = HashSet::new();
    let mut merged: Vec<String> = existing
        .into_iter()
        .chain(incoming)
        .filter(|url| seen.insert(url.clone()))
        .collect();

    if merged.len() > cap {
        merged.drain(..merged.len() - cap);
    }
    merged
}
