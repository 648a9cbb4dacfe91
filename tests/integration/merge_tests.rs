//! Integration tests for merging shard artifacts

use sitemap_shard_indexer::merge::{MergeInputs, PageRecord, ShardMergeEngine};
use sitemap_shard_indexer::state::CrawlStateStore;
use sitemap_shard_indexer::url::stable_hash;
use sitemap_shard_indexer::CrawlError;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

struct Site {
    _dir: TempDir,
    artifacts: PathBuf,
    index: PathBuf,
    state: PathBuf,
}

impl Site {
    fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let artifacts = dir.path().join("shard_artifacts");
        fs::create_dir_all(&artifacts).unwrap();
        Self {
            index: dir.path().join("site/index.json"),
            state: dir.path().join("site/last_indexed.json"),
            artifacts,
            _dir: dir,
        }
    }

    fn artifact(&self, name: &str, content: &str) {
        fs::write(self.artifacts.join(name), content).unwrap();
    }

    fn merge(&self) -> Result<sitemap_shard_indexer::output::MergeStats, CrawlError> {
        let inputs = MergeInputs::discover(&self.artifacts, &self.index, &self.state)?;
        ShardMergeEngine::new(100, 10_000).merge(&inputs, &self.index, &self.state)
    }

    fn records(&self) -> Vec<PageRecord> {
        serde_json::from_str(&fs::read_to_string(&self.index).unwrap()).unwrap()
    }
}

fn record(url: &str, title: &str) -> String {
    format!(
        r#"{{"id": {}, "url": "{}", "title": "{}", "description": "d", "text": "t"}}"#,
        stable_hash(url),
        url,
        title
    )
}

fn read(path: &Path) -> String {
    fs::read_to_string(path).unwrap()
}

#[test]
fn test_duplicate_url_across_shards_kept_once() {
    let site = Site::new();
    site.artifact(
        "shard-output-0.json",
        &format!("[{}]", record("https://example.com/a", "first")),
    );
    site.artifact(
        "shard-output-1.json",
        &format!(
            "[{}, {}]",
            record("https://EXAMPLE.com/a#section", "second"),
            record("https://example.com/b", "b")
        ),
    );

    let stats = site.merge().unwrap();
    let records = site.records();

    assert_eq!(records.len(), 2);
    assert_eq!(records[0].url, "https://example.com/a");
    assert_eq!(records[0].title, "first");
    assert_eq!(records[1].url, "https://example.com/b");
    assert_eq!(stats.duplicates_skipped, 1);
}

#[test]
fn test_merge_is_idempotent() {
    let site = Site::new();
    site.artifact(
        "shard-output-0.json",
        &format!(
            "[{}, {}]",
            record("https://example.com/", "home"),
            record("https://example.com/a", "a")
        ),
    );
    site.artifact(
        "shard-output-1.json",
        &format!("[{}]", record("https://other.org/", "other")),
    );
    site.artifact(
        "shard-last-0.json",
        r#"{"example.com": {"lastAt": 1700000000000, "urls": ["https://example.com/", "https://example.com/a"]}}"#,
    );
    site.artifact(
        "shard-last-1.json",
        r#"{"other.org": {"lastAt": 1700000001000, "urls": ["https://other.org/"]}}"#,
    );

    site.merge().unwrap();
    let index_once = read(&site.index);
    let state_once = read(&site.state);

    // Same artifacts again: everything is already present
    let stats = site.merge().unwrap();
    assert_eq!(read(&site.index), index_once);
    assert_eq!(read(&site.state), state_once);
    assert_eq!(stats.merged_records, 0);
    assert_eq!(stats.existing_records, 3);

    // No artifacts at all: the output reproduces itself
    fs::remove_dir_all(&site.artifacts).unwrap();
    fs::create_dir_all(&site.artifacts).unwrap();
    site.merge().unwrap();
    assert_eq!(read(&site.index), index_once);
    assert_eq!(read(&site.state), state_once);
}

#[test]
fn test_legacy_index_is_retruncated() {
    let site = Site::new();
    let long = "x".repeat(250);
    fs::create_dir_all(site.index.parent().unwrap()).unwrap();
    fs::write(
        &site.index,
        format!(
            r#"[{{"id": "https://legacy.example/page", "title": "{long}", "description": "{long}", "text": "{long}"}}]"#
        ),
    )
    .unwrap();

    site.merge().unwrap();

    let records = site.records();
    assert_eq!(records.len(), 1);
    let legacy = &records[0];
    assert_eq!(legacy.url, "https://legacy.example/page");
    assert_eq!(legacy.id, stable_hash("https://legacy.example/page"));
    assert_eq!(legacy.title.chars().count(), 100);
    assert_eq!(legacy.description.chars().count(), 100);
    assert_eq!(legacy.text.chars().count(), 100);
}

#[test]
fn test_malformed_shard_file_is_skipped() {
    let site = Site::new();
    site.artifact(
        "shard-output-0.json",
        &format!("[{}]", record("https://example.com/a", "a")),
    );
    site.artifact("shard-output-1.json", r#"[{"url": "https://example.com/broken""#);
    site.artifact(
        "shard-output-2.json",
        &format!("{}\n{}\n", record("https://example.com/c", "c"), "garbage line"),
    );

    let stats = site.merge().unwrap();

    assert_eq!(stats.files_skipped, 1);
    assert_eq!(stats.output_files, 2);
    let urls: Vec<String> = site.records().into_iter().map(|r| r.url).collect();
    assert_eq!(urls, vec!["https://example.com/a", "https://example.com/c"]);
}

#[test]
fn test_missing_artifacts_dir_is_fatal_and_writes_nothing() {
    let site = Site::new();
    fs::remove_dir_all(&site.artifacts).unwrap();

    let result = site.merge();

    assert!(matches!(result, Err(CrawlError::MissingInput(_))));
    assert!(!site.index.exists());
    assert!(!site.state.exists());
}

#[test]
fn test_state_fragments_take_latest_time_and_union() {
    let site = Site::new();
    fs::create_dir_all(site.state.parent().unwrap()).unwrap();
    fs::write(
        &site.state,
        r#"{"example.com": {"lastAt": 2000, "urls": ["https://example.com/"]}}"#,
    )
    .unwrap();
    site.artifact(
        "shard-last-0.json",
        r#"{"example.com": {"lastAt": 1000, "urls": ["https://example.com/old"]}}"#,
    );
    site.artifact(
        "shard-last-1.json",
        r#"{"example.com": {"lastAt": 3000, "urls": ["https://example.com/new"]}}"#,
    );

    site.merge().unwrap();

    let ledger = CrawlStateStore::load(&site.state, 10_000);
    let host = ledger.get("example.com").unwrap();
    assert_eq!(host.last_crawled_at.timestamp_millis(), 3000);
    assert_eq!(
        host.seen_urls,
        vec![
            "https://example.com/",
            "https://example.com/old",
            "https://example.com/new"
        ]
    );
}

#[test]
fn test_bad_existing_elements_do_not_drop_index_or_ledger() {
    let site = Site::new();
    fs::create_dir_all(site.index.parent().unwrap()).unwrap();
    fs::write(
        &site.index,
        format!(
            r#"[{}, {{"url": "https://keep.example/b", "title": 7}}, null]"#,
            record("https://keep.example/a", "a")
        ),
    )
    .unwrap();
    fs::write(
        &site.state,
        r#"{"keep.example": {"lastAt": 1700000000000, "urls": ["https://keep.example/a"]},
            "old.example": {"lastAt": null}}"#,
    )
    .unwrap();
    site.artifact(
        "shard-output-0.json",
        &format!("[{}]", record("https://new.example/", "new")),
    );

    let stats = site.merge().unwrap();

    let urls: Vec<String> = site.records().into_iter().map(|r| r.url).collect();
    assert_eq!(urls, vec!["https://keep.example/a", "https://new.example/"]);
    assert_eq!(stats.existing_records, 1);
    assert_eq!(stats.invalid_skipped, 2);

    let ledger = CrawlStateStore::load(&site.state, 10_000);
    assert_eq!(ledger.len(), 2);
    assert_eq!(
        ledger.get("keep.example").unwrap().seen_urls,
        vec!["https://keep.example/a"]
    );
    assert_eq!(
        ledger.get("old.example").unwrap().last_crawled_at.timestamp_millis(),
        0
    );
}

#[test]
fn test_unwritable_ledger_leaves_index_untouched() {
    let site = Site::new();
    fs::create_dir_all(site.index.parent().unwrap()).unwrap();
    let previous = format!("[{}]\n", record("https://example.com/old", "old"));
    fs::write(&site.index, &previous).unwrap();
    site.artifact(
        "shard-output-0.json",
        &format!("[{}]", record("https://example.com/new", "new")),
    );

    let blocker = site.artifacts.join("blocker");
    fs::write(&blocker, "not a directory").unwrap();
    let state_out = blocker.join("last_indexed.json");

    let inputs = MergeInputs::discover(&site.artifacts, &site.index, &site.state).unwrap();
    let result = ShardMergeEngine::new(100, 10_000).merge(&inputs, &site.index, &state_out);

    assert!(matches!(result, Err(CrawlError::Output { .. })));
    assert_eq!(read(&site.index), previous);
    let leftovers = fs::read_dir(site.index.parent().unwrap()).unwrap().count();
    assert_eq!(leftovers, 1);
}
