//! Shard worker - per-shard crawl orchestration
//!
//! For each assigned host, in list order:
//!
//! 1. **Freshness**: a host crawled within the TTL is skipped without any
//!    network call; its ledger entry is forwarded unchanged.
//! 2. **Discovery**: robots.txt is fetched and its `Sitemap:` lines, plus
//!    `/sitemap.xml`, seed the sitemap expansion.
//! 3. **Fetch**: candidates not yet seen for the host go through the fetch
//!    pipeline.
//! 4. **Record**: `lastAt` advances to the run time and the fetched URLs are
//!    added to the host's seen set.
//!
//! Steps 2 and 3 run under the per-host timeout. A timed-out host keeps the
//! records that completed before the abort. Hosts never affect each other.
//!
//! Once the run has produced `max-total-pages` records, the remaining hosts
//! are deferred: they are not contacted and get no ledger entry, so the next
//! run picks them up.

use super::{assign, output_file_name, state_file_name};
use crate::config::Config;
use crate::fetch::{
    build_http_client, FetchPipeline, FetchReport, HtmlExtractor, PageExtractor, PipelineOptions,
};
use crate::merge::PageRecord;
use crate::output::{ensure_writable_dir, write_json_atomic, ShardStats};
use crate::robots::fetch_robots;
use crate::sitemap::{ExpanderOptions, SitemapExpander};
use crate::state::{now_millis, CrawlStateStore, HostState};
use crate::url::{DomainEntry, HostFilter};
use crate::CrawlError;
use chrono::{DateTime, Utc};
use reqwest::Client;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// How a host's pipeline ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostStatus {
    /// Crawled within the TTL; skipped
    Fresh,
    /// Discovery found nothing the host had not already indexed
    NoCandidates,
    /// The fetch pipeline ran to completion
    Crawled,
    /// Aborted by the per-host timeout
    TimedOut,
}

/// Result of processing one host
#[derive(Debug, Clone)]
pub struct HostRun {
    pub status: HostStatus,
    /// State to write into the shard's fragment
    pub state: HostState,
    pub report: FetchReport,
}

/// Drives one shard: selects its hosts, crawls them, writes its artifacts
pub struct ShardWorker {
    config: Config,
    client: Client,
    expander: SitemapExpander,
    pipeline: FetchPipeline,
}

impl ShardWorker {
    /// Creates a worker using the HTML extractor
    pub fn new(config: Config) -> Result<Self, CrawlError> {
        let extractor = Arc::new(HtmlExtractor::new(config.index.max_text_chars));
        Self::with_extractor(config, extractor)
    }

    /// Creates a worker with a custom page extractor
    pub fn with_extractor(
        config: Config,
        extractor: Arc<dyn PageExtractor>,
    ) -> Result<Self, CrawlError> {
        let client = build_http_client(
            &config.user_agent,
            Duration::from_millis(config.crawler.fetch_timeout_ms),
        )?;

        let expander = SitemapExpander::new(client.clone(), ExpanderOptions::from_config(&config));
        let pipeline = FetchPipeline::new(
            client.clone(),
            extractor,
            PipelineOptions::from_config(&config),
        );

        Ok(Self {
            config,
            client,
            expander,
            pipeline,
        })
    }

    /// Runs the shard over `domains` and writes `shard-output-<i>.json` and
    /// `shard-last-<i>.json` into `artifacts_dir`
    ///
    /// Only failing to write the artifacts is an error, and an unwritable
    /// `artifacts_dir` is reported before any host is contacted. Host and page
    /// level failures are logged and counted.
    pub async fn run(
        &self,
        domains: &[DomainEntry],
        ledger: &CrawlStateStore,
        artifacts_dir: &Path,
    ) -> Result<ShardStats, CrawlError> {
        ensure_writable_dir(artifacts_dir).map_err(|source| CrawlError::Output {
            path: artifacts_dir.to_path_buf(),
            source,
        })?;

        let shard = &self.config.shard;
        let page_budget = self.config.crawler.max_total_pages;
        let assigned = assign(domains, shard.index, shard.count, shard.max_domains);
        let filter = HostFilter::new(assigned.iter().map(|entry| entry.host.clone()));
        let now = now_millis();

        tracing::info!(
            shard = shard.index,
            shards = shard.count,
            hosts = assigned.len(),
            "Starting shard run"
        );

        let mut stats = ShardStats {
            hosts_assigned: assigned.len(),
            ..Default::default()
        };
        let mut records: Vec<PageRecord> = Vec::new();
        let mut fragment = CrawlStateStore::new();

        for (position, entry) in assigned.iter().enumerate() {
            if stats.records >= page_budget {
                stats.hosts_deferred = assigned.len() - position;
                tracing::info!(
                    records = stats.records,
                    deferred = stats.hosts_deferred,
                    "Page budget reached, deferring remaining hosts"
                );
                break;
            }

            let run = self.process_host(entry, ledger, &filter, now).await;

            match run.status {
                HostStatus::Fresh => stats.hosts_fresh += 1,
                HostStatus::NoCandidates => stats.hosts_without_candidates += 1,
                HostStatus::Crawled => stats.hosts_crawled += 1,
                HostStatus::TimedOut => stats.hosts_timed_out += 1,
            }
            stats.candidates += run.report.submitted;
            stats.records += run.report.records.len();
            for failure in &run.report.failures {
                stats.record_failure(failure.error.kind());
            }

            records.extend(run.report.records);
            fragment.insert(run.state);
        }

        let output_path = artifacts_dir.join(output_file_name(shard.index));
        write_json_atomic(&output_path, &records).map_err(|source| CrawlError::Output {
            path: output_path.clone(),
            source,
        })?;
        fragment.save(&artifacts_dir.join(state_file_name(shard.index)))?;

        tracing::info!(
            "Wrote {} records for {} hosts to {}",
            records.len(),
            fragment.len(),
            artifacts_dir.display()
        );
        stats.log_summary(shard.index);
        Ok(stats)
    }

    /// Runs the per-host pipeline for one host
    pub async fn process_host(
        &self,
        entry: &DomainEntry,
        ledger: &CrawlStateStore,
        filter: &HostFilter,
        now: DateTime<Utc>,
    ) -> HostRun {
        let state_config = &self.config.state;
        let mut state = ledger
            .get(&entry.host)
            .cloned()
            .unwrap_or_else(|| HostState::new(entry.host.clone()));

        let ttl = chrono::Duration::days(i64::from(state_config.days_no_check));
        if state.is_fresh(now, ttl, state_config.force) {
            tracing::info!(host = %entry.host, "Recently crawled, skipping");
            return HostRun {
                status: HostStatus::Fresh,
                state,
                report: FetchReport::default(),
            };
        }

        tracing::info!(host = %entry.host, origin = %entry.canonical_origin, "Processing host");

        let report = Arc::new(Mutex::new(FetchReport::default()));
        let host_timeout = Duration::from_millis(self.config.crawler.host_timeout_ms);
        let crawl = self.crawl_host(entry, &state, filter, Arc::clone(&report));

        let status = match tokio::time::timeout(host_timeout, crawl).await {
            Ok(0) => HostStatus::NoCandidates,
            Ok(_) => HostStatus::Crawled,
            Err(_) => {
                tracing::warn!(host = %entry.host, ?host_timeout, "Host timed out");
                HostStatus::TimedOut
            }
        };

        let report = {
            let mut guard = report.lock().unwrap_or_else(|e| e.into_inner());
            std::mem::take(&mut *guard)
        };

        state.record_crawl(
            now,
            report.fetched_urls().map(str::to_string),
            state_config.max_urls_per_host,
        );

        tracing::info!(
            host = %entry.host,
            status = ?status,
            records = report.records.len(),
            failures = report.failures.len(),
            "Host done"
        );

        HostRun {
            status,
            state,
            report,
        }
    }

    /// Discovery and fetch for one host; returns the number of candidates
    /// handed to the fetch pipeline
    async fn crawl_host(
        &self,
        entry: &DomainEntry,
        state: &HostState,
        filter: &HostFilter,
        report: Arc<Mutex<FetchReport>>,
    ) -> usize {
        let (origin, homepage) = match (entry.origin_url(), entry.homepage()) {
            (Ok(origin), Ok(homepage)) => (origin, homepage),
            (Err(e), _) | (_, Err(e)) => {
                tracing::warn!(host = %entry.host, error = %e, "Invalid origin");
                return 0;
            }
        };

        let crawler = &self.config.crawler;
        let robots = fetch_robots(
            &self.client,
            &origin,
            Duration::from_millis(crawler.robots_timeout_ms),
        )
        .await;

        let seeds = SitemapExpander::seeds(&origin, &robots);
        let robots_filter = crawler.respect_robots.then_some(&robots);
        let pages = self
            .expander
            .expand(&homepage, seeds, filter, robots_filter)
            .await;

        let seen = state.seen_set();
        let candidates: Vec<_> = pages
            .into_iter()
            .filter(|url| !seen.contains(url.as_str()))
            .take(crawler.max_pages_per_host)
            .collect();

        if candidates.is_empty() {
            tracing::info!(host = %entry.host, "No new pages");
            return 0;
        }

        let count = candidates.len();
        tracing::debug!(host = %entry.host, candidates = count, "Collected candidates");
        self.pipeline.fetch_into(candidates, &seen, report).await;
        count
    }
}
