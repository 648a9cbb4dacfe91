//! Fetch pipeline
//!
//! Turns candidate page URLs into [`PageRecord`]s. Candidates already in the
//! host's seen set are dropped up front; the rest are spread across a bounded
//! [`WorkerPool`]. Every attempt waits the fixed rate delay, runs under the
//! fetch timeout, and is retried with backoff unless the rejection cannot
//! change (non-HTML content, incomplete extraction in strict mode).
//!
//! Results are pushed into a shared [`FetchReport`] as they complete, so a
//! caller that abandons the pipeline (per-host timeout) still keeps every
//! record finished before the abort.

use super::{fetch_once, retry_with_backoff, FetchError, PageExtractor, RetryPolicy, WorkerPool};
use crate::config::Config;
use crate::merge::PageRecord;
use crate::url::CanonicalUrl;
use reqwest::Client;
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Pipeline parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineOptions {
    pub concurrency: usize,
    /// Delay before every request
    pub rate: Duration,
    /// Hard timeout for one attempt
    pub fetch_timeout: Duration,
    pub retry: RetryPolicy,
    /// Reject pages with an empty title, description or text
    pub strict: bool,
    pub max_field_chars: usize,
}

impl PipelineOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            concurrency: config.crawler.concurrency,
            rate: Duration::from_millis(config.crawler.rate_ms),
            fetch_timeout: Duration::from_millis(config.crawler.fetch_timeout_ms),
            retry: RetryPolicy::from_config(&config.crawler),
            strict: config.crawler.strict_extraction,
            max_field_chars: config.index.max_field_chars,
        }
    }
}

/// A candidate dropped after its final attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchFailure {
    pub url: String,
    pub error: FetchError,
    pub attempts: u32,
}

/// Outcome of a pipeline run
#[derive(Debug, Clone, Default)]
pub struct FetchReport {
    /// Accepted records, in completion order
    pub records: Vec<PageRecord>,
    /// Dropped candidates
    pub failures: Vec<FetchFailure>,
    /// Candidates handed to the worker pool
    pub submitted: usize,
    /// Candidates excluded because the host had already indexed them
    pub skipped_seen: usize,
}

impl FetchReport {
    /// URLs of the accepted records
    pub fn fetched_urls(&self) -> impl Iterator<Item = &str> {
        self.records.iter().map(|r| r.url.as_str())
    }
}

/// Bounded, rate-limited, retrying fetch-and-extract engine
#[derive(Clone)]
pub struct FetchPipeline {
    client: Client,
    extractor: Arc<dyn PageExtractor>,
    options: PipelineOptions,
    pool: WorkerPool,
}

impl FetchPipeline {
    pub fn new(client: Client, extractor: Arc<dyn PageExtractor>, options: PipelineOptions) -> Self {
        Self {
            client,
            extractor,
            pool: WorkerPool::new(options.concurrency),
            options,
        }
    }

    /// Fetches every candidate not in `seen` and returns the report
    pub async fn fetch_all(&self, candidates: Vec<CanonicalUrl>, seen: &HashSet<&str>) -> FetchReport {
        let report = Arc::new(Mutex::new(FetchReport::default()));
        self.fetch_into(candidates, seen, Arc::clone(&report)).await;

        let mut guard = report.lock().unwrap_or_else(|e| e.into_inner());
        std::mem::take(&mut *guard)
    }

    /// Like [`fetch_all`](Self::fetch_all), pushing results into `report` as
    /// they complete
    pub async fn fetch_into(
        &self,
        candidates: Vec<CanonicalUrl>,
        seen: &HashSet<&str>,
        report: Arc<Mutex<FetchReport>>,
    ) {
        let total = candidates.len();
        let fresh: Vec<CanonicalUrl> = candidates
            .into_iter()
            .filter(|url| !seen.contains(url.as_str()))
            .collect();

        {
            let mut guard = report.lock().unwrap_or_else(|e| e.into_inner());
            guard.skipped_seen += total - fresh.len();
            guard.submitted += fresh.len();
        }

        if fresh.is_empty() {
            return;
        }

        tracing::debug!(
            candidates = fresh.len(),
            skipped_seen = total - fresh.len(),
            "Fetching candidates"
        );

        let pipeline = self.clone();
        self.pool
            .run(fresh, move |url| {
                let pipeline = pipeline.clone();
                let report = Arc::clone(&report);
                async move {
                    let outcome = pipeline.fetch_page(&url).await;
                    record_outcome(&report, &url, outcome);
                }
            })
            .await;
    }

    /// Fetches one page with retries, returning the record or the last error
    /// with the number of attempts made
    async fn fetch_page(&self, url: &CanonicalUrl) -> Result<PageRecord, (FetchError, u32)> {
        let mut attempts = 0;

        let result = retry_with_backoff(
            &self.options.retry,
            |attempt| {
                attempts = attempt;
                self.attempt(url, attempt)
            },
            FetchError::is_retryable,
        )
        .await;

        result.map_err(|e| (e, attempts))
    }

    async fn attempt(&self, url: &CanonicalUrl, attempt: u32) -> Result<PageRecord, FetchError> {
        tokio::time::sleep(self.options.rate).await;
        tracing::trace!(url = %url, attempt, "Fetching page");

        let fetched = fetch_once(&self.client, url.as_str(), self.options.fetch_timeout).await?;
        if !fetched.is_html() {
            return Err(FetchError::NotHtml {
                content_type: fetched.content_type,
            });
        }

        let page = self.extractor.extract(&fetched.text());
        if self.options.strict && !page.is_complete() {
            return Err(FetchError::IncompleteExtraction);
        }

        Ok(PageRecord::build(
            url,
            &page.title,
            &page.description,
            &page.text,
            self.options.max_field_chars,
        ))
    }
}

fn record_outcome(
    report: &Mutex<FetchReport>,
    url: &CanonicalUrl,
    outcome: Result<PageRecord, (FetchError, u32)>,
) {
    let mut guard = report.lock().unwrap_or_else(|e| e.into_inner());
    match outcome {
        Ok(record) => {
            tracing::debug!(
                url = %record.url,
                title_len = record.title.chars().count(),
                description_len = record.description.chars().count(),
                "Kept page"
            );
            guard.records.push(record);
        }
        Err((error, attempts)) => {
            tracing::warn!(url = %url, attempts, error = %error, "Dropped page");
            guard.failures.push(FetchFailure {
                url: url.to_string(),
                error,
                attempts,
            });
        }
    }
}
