//! Integration tests for shard runs
//!
//! These tests use wiremock to create mock HTTP servers and run whole shards
//! end-to-end: robots.txt, sitemap expansion, page fetches, and the artifacts
//! written at the end of the run.

use chrono::Duration as ChronoDuration;
use sitemap_shard_indexer::config::{Config, UserAgentConfig};
use sitemap_shard_indexer::merge::{MergeInputs, PageRecord, ShardMergeEngine};
use sitemap_shard_indexer::shard::{output_file_name, state_file_name, ShardWorker};
use sitemap_shard_indexer::state::{now_millis, CrawlStateStore, HostState};
use sitemap_shard_indexer::url::{stable_hash, DomainEntry};
use sitemap_shard_indexer::CrawlError;
use std::collections::HashSet;
use std::path::Path;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const PAGE: &str = r#"<html><head><title>A page</title>
    <meta name="description" content="Something worth indexing"></head>
    <body><p>First paragraph.</p><p>Second paragraph.</p></body></html>"#;

/// Creates a test configuration with fast timings
fn create_test_config(shard_index: u32, shard_count: u32, retries: u32) -> Config {
    let mut config = Config::default();
    config.shard.index = shard_index;
    config.shard.count = shard_count;
    config.crawler.concurrency = 2;
    config.crawler.rate_ms = 1;
    config.crawler.fetch_timeout_ms = 5_000;
    config.crawler.robots_timeout_ms = 5_000;
    config.crawler.host_timeout_ms = 20_000;
    config.crawler.retries = retries;
    config.crawler.retry_backoff_ms = 1;
    config.crawler.max_backoff_ms = 10;
    config.user_agent = UserAgentConfig {
        crawler_name: "TestBot".to_string(),
        crawler_version: "1.0.0".to_string(),
        contact_url: "https://example.com/contact".to_string(),
        contact_email: "test@example.com".to_string(),
    };
    config
}

fn html_page() -> ResponseTemplate {
    ResponseTemplate::new(200)
        .insert_header("content-type", "text/html; charset=utf-8")
        .set_body_string(PAGE)
}

/// Mounts a 404 for everything not matched by an earlier mock
async fn mount_not_found(server: &MockServer) {
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .mount(server)
        .await;
}

fn read_records(dir: &Path, shard_index: u32) -> Vec<PageRecord> {
    let content = std::fs::read_to_string(dir.join(output_file_name(shard_index)))
        .expect("shard output written");
    serde_json::from_str(&content).expect("shard output is a JSON array")
}

fn read_state(dir: &Path, shard_index: u32) -> CrawlStateStore {
    let content = std::fs::read_to_string(dir.join(state_file_name(shard_index)))
        .expect("shard state written");
    CrawlStateStore::from_json(&content, usize::MAX).expect("shard state is valid")
}

fn urls(records: &[PageRecord]) -> Vec<String> {
    let mut urls: Vec<String> = records.iter().map(|r| r.url.clone()).collect();
    urls.sort();
    urls
}

#[tokio::test]
async fn test_sitemap_page_and_homepage_are_indexed() {
    let server = MockServer::start().await;
    let base = server.uri();

    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(ResponseTemplate::new(200).set_body_string("User-agent: *\nAllow: /"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/sitemap.xml"))
        .respond_with(ResponseTemplate::new(200).set_body_string(format!(
            "<urlset><url><loc>{base}/a</loc></url></urlset>"
        )))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html_page())
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/a"))
        .respond_with(html_page())
        .expect(1)
        .mount(&server)
        .await;

    let artifacts = TempDir::new().unwrap();
    let domains = vec![DomainEntry::parse(&base).unwrap()];
    let worker = ShardWorker::new(create_test_config(0, 1, 2)).unwrap();

    let stats = worker
        .run(&domains, &CrawlStateStore::new(), artifacts.path())
        .await
        .expect("Shard run should succeed");

    let records = read_records(artifacts.path(), 0);
    assert_eq!(urls(&records), vec![format!("{base}/"), format!("{base}/a")]);
    for record in &records {
        assert_eq!(record.id, stable_hash(&record.url));
        assert_eq!(record.title, "A page");
        assert!(record.text.chars().count() <= 100);
    }

    assert_eq!(stats.hosts_crawled, 1);
    assert_eq!(stats.records, 2);

    let state = read_state(artifacts.path(), 0);
    let host = state.get(&domains[0].host).expect("host state recorded");
    let seen: HashSet<&str> = host.seen_urls.iter().map(String::as_str).collect();
    assert!(seen.contains(format!("{base}/").as_str()));
    assert!(seen.contains(format!("{base}/a").as_str()));
}

#[tokio::test]
async fn test_unreachable_sitemap_still_indexes_homepage() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html_page())
        .mount(&server)
        .await;
    mount_not_found(&server).await;

    let artifacts = TempDir::new().unwrap();
    let domains = vec![DomainEntry::parse(&server.uri()).unwrap()];
    let worker = ShardWorker::new(create_test_config(0, 1, 1)).unwrap();

    worker
        .run(&domains, &CrawlStateStore::new(), artifacts.path())
        .await
        .unwrap();

    let records = read_records(artifacts.path(), 0);
    assert_eq!(urls(&records), vec![format!("{}/", server.uri())]);
}

async fn run_flaky_homepage(retries: u32) -> Vec<PageRecord> {
    let server = MockServer::start().await;

    // First two homepage requests fail, later ones succeed
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html_page())
        .mount(&server)
        .await;
    mount_not_found(&server).await;

    let artifacts = TempDir::new().unwrap();
    let domains = vec![DomainEntry::parse(&server.uri()).unwrap()];
    let worker = ShardWorker::new(create_test_config(0, 1, retries)).unwrap();

    worker
        .run(&domains, &CrawlStateStore::new(), artifacts.path())
        .await
        .unwrap();

    read_records(artifacts.path(), 0)
}

#[tokio::test]
async fn test_page_kept_when_retries_cover_failures() {
    let records = run_flaky_homepage(2).await;
    assert_eq!(records.len(), 1);
}

#[tokio::test]
async fn test_page_dropped_when_retries_run_out() {
    let records = run_flaky_homepage(1).await;
    assert!(records.is_empty());
}

#[tokio::test]
async fn test_fresh_host_makes_no_requests() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(html_page())
        .expect(0)
        .mount(&server)
        .await;

    let entry = DomainEntry::parse(&server.uri()).unwrap();
    let mut prior = HostState::new(entry.host.clone());
    prior.last_crawled_at = now_millis() - ChronoDuration::days(1);
    prior.seen_urls = vec![format!("{}/old", server.uri())];
    let ledger: CrawlStateStore = vec![prior.clone()].into_iter().collect();

    let artifacts = TempDir::new().unwrap();
    let worker = ShardWorker::new(create_test_config(0, 1, 2)).unwrap();
    let stats = worker
        .run(&[entry.clone()], &ledger, artifacts.path())
        .await
        .unwrap();

    assert_eq!(stats.hosts_fresh, 1);
    assert!(read_records(artifacts.path(), 0).is_empty());

    // The skipped host's state is forwarded unchanged
    let state = read_state(artifacts.path(), 0);
    assert_eq!(state.get(&entry.host), Some(&prior));
}

#[tokio::test]
async fn test_force_recrawls_fresh_host() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html_page())
        .expect(1)
        .mount(&server)
        .await;
    mount_not_found(&server).await;

    let entry = DomainEntry::parse(&server.uri()).unwrap();
    let mut prior = HostState::new(entry.host.clone());
    prior.last_crawled_at = now_millis();
    let ledger: CrawlStateStore = vec![prior].into_iter().collect();

    let mut config = create_test_config(0, 1, 0);
    config.state.force = true;

    let artifacts = TempDir::new().unwrap();
    ShardWorker::new(config)
        .unwrap()
        .run(&[entry], &ledger, artifacts.path())
        .await
        .unwrap();

    assert_eq!(read_records(artifacts.path(), 0).len(), 1);
}

#[tokio::test]
async fn test_shards_cover_every_host_once_and_merge() {
    let mut servers = Vec::new();
    for _ in 0..4 {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(html_page())
            .expect(1)
            .mount(&server)
            .await;
        mount_not_found(&server).await;
        servers.push(server);
    }

    let domains: Vec<DomainEntry> = servers
        .iter()
        .map(|s| DomainEntry::parse(&s.uri()).unwrap())
        .collect();

    let artifacts = TempDir::new().unwrap();
    let shard_count = 3;
    for shard_index in 0..shard_count {
        let worker = ShardWorker::new(create_test_config(shard_index, shard_count, 0)).unwrap();
        worker
            .run(&domains, &CrawlStateStore::new(), artifacts.path())
            .await
            .unwrap();
    }

    let site = TempDir::new().unwrap();
    let index = site.path().join("index.json");
    let state = site.path().join("last_indexed.json");

    let inputs = MergeInputs::discover(artifacts.path(), &index, &state).unwrap();
    assert_eq!(inputs.output_files.len(), shard_count as usize);

    let stats = ShardMergeEngine::new(100, 10_000)
        .merge(&inputs, &index, &state)
        .unwrap();

    assert_eq!(stats.merged_records, domains.len());
    assert_eq!(stats.duplicates_skipped, 0);
    assert_eq!(stats.hosts, domains.len());

    let merged: Vec<PageRecord> =
        serde_json::from_str(&std::fs::read_to_string(&index).unwrap()).unwrap();
    let expected: Vec<String> = {
        let mut v: Vec<String> = servers.iter().map(|s| format!("{}/", s.uri())).collect();
        v.sort();
        v
    };
    assert_eq!(urls(&merged), expected);
}

#[tokio::test]
async fn test_unwritable_artifacts_dir_fails_before_any_request() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(html_page())
        .expect(0)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let blocker = dir.path().join("blocker");
    std::fs::write(&blocker, "not a directory").unwrap();

    let domains = vec![DomainEntry::parse(&server.uri()).unwrap()];
    let worker = ShardWorker::new(create_test_config(0, 1, 0)).unwrap();
    let result = worker
        .run(&domains, &CrawlStateStore::new(), &blocker.join("artifacts"))
        .await;

    assert!(matches!(result, Err(CrawlError::Output { .. })));
}
