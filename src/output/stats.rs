//! Run counters for shard and merge runs
//!
//! Recoverable failures never escape their host or page; they surface here
//! and in the structured logs.

use std::collections::BTreeMap;

/// Counters for one shard run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShardStats {
    /// Hosts assigned to this shard (after the per-shard cap)
    pub hosts_assigned: usize,

    /// Hosts skipped because they were crawled within the TTL
    pub hosts_fresh: usize,

    /// Hosts whose pipeline ran to completion
    pub hosts_crawled: usize,

    /// Hosts aborted by the per-host timeout
    pub hosts_timed_out: usize,

    /// Hosts whose sitemap discovery produced no new candidates
    pub hosts_without_candidates: usize,

    /// Hosts left for a later run because the page budget was spent
    pub hosts_deferred: usize,

    /// Candidate pages handed to the fetch pipeline
    pub candidates: usize,

    /// Page records produced
    pub records: usize,

    /// Dropped candidates, by failure kind
    pub failures_by_reason: BTreeMap<String, usize>,
}

impl ShardStats {
    pub fn record_failure(&mut self, reason: &str) {
        *self.failures_by_reason.entry(reason.to_string()).or_insert(0) += 1;
    }

    pub fn total_failures(&self) -> usize {
        self.failures_by_reason.values().sum()
    }

    /// Emits the counters as one structured log line
    pub fn log_summary(&self, shard_index: u32) {
        tracing::info!(
            shard = shard_index,
            hosts_assigned = self.hosts_assigned,
            hosts_fresh = self.hosts_fresh,
            hosts_crawled = self.hosts_crawled,
            hosts_timed_out = self.hosts_timed_out,
            hosts_without_candidates = self.hosts_without_candidates,
            hosts_deferred = self.hosts_deferred,
            candidates = self.candidates,
            records = self.records,
            failures = self.total_failures(),
            "Shard run finished"
        );
    }
}

/// Counters for one merge run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeStats {
    /// Records carried over from the existing index
    pub existing_records: usize,

    /// New records taken from shard output files
    pub merged_records: usize,

    /// Records dropped because their canonical URL was already present
    pub duplicates_skipped: usize,

    /// Records dropped because their URL could not be canonicalized
    pub invalid_skipped: usize,

    /// Shard output files merged
    pub output_files: usize,

    /// Shard state files merged
    pub state_files: usize,

    /// Artifact files skipped as malformed
    pub files_skipped: usize,

    /// Hosts tracked in the resulting ledger
    pub hosts: usize,
}

impl MergeStats {
    /// Total records in the written index
    pub fn total_records(&self) -> usize {
        self.existing_records + self.merged_records
    }

    /// Emits the counters as one structured log line
    pub fn log_summary(&self) {
        tracing::info!(
            existing_records = self.existing_records,
            merged_records = self.merged_records,
            duplicates_skipped = self.duplicates_skipped,
            invalid_skipped = self.invalid_skipped,
            output_files = self.output_files,
            state_files = self.state_files,
            files_skipped = self.files_skipped,
            hosts = self.hosts,
            "Merge finished"
        );
    }
}

/// Prints shard counters to stdout
pub fn print_shard_stats(shard_index: u32, stats: &ShardStats) {
    println!("=== Shard {} ===\n", shard_index);
    println!("Hosts:");
    println!("  Assigned: {}", stats.hosts_assigned);
    println!("  Skipped (fresh): {}", stats.hosts_fresh);
    println!("  Crawled: {}", stats.hosts_crawled);
    println!("  Timed out: {}", stats.hosts_timed_out);
    println!("  No new candidates: {}", stats.hosts_without_candidates);
    println!("  Deferred (page budget): {}", stats.hosts_deferred);
    println!();
    println!("Pages:");
    println!("  Candidates: {}", stats.candidates);
    println!("  Records: {}", stats.records);
    println!("  Dropped: {}", stats.total_failures());

    for (reason, count) in &stats.failures_by_reason {
        println!("    {}: {}", reason, count);
    }
}

/// Prints merge counters to stdout
pub fn print_merge_stats(stats: &MergeStats) {
    println!("=== Merge ===\n");
    println!("Index:");
    println!("  Total records: {}", stats.total_records());
    println!("  From existing index: {}", stats.existing_records);
    println!("  From shards: {}", stats.merged_records);
    println!("  Duplicates skipped: {}", stats.duplicates_skipped);
    println!("  Invalid skipped: {}", stats.invalid_skipped);
    println!();
    println!("Artifacts:");
    println!("  Output files: {}", stats.output_files);
    println!("  State files: {}", stats.state_files);
    println!("  Skipped (malformed): {}", stats.files_skipped);
    println!();
    println!("Hosts tracked: {}", stats.hosts);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_counts() {
        let mut stats = ShardStats::default();
        stats.record_failure("http");
        stats.record_failure("http");
        stats.record_failure("timeout");

        assert_eq!(stats.failures_by_reason.get("http"), Some(&2));
        assert_eq!(stats.total_failures(), 3);
    }

    #[test]
    fn test_merge_total() {
        let stats = MergeStats {
            existing_records: 10,
            merged_records: 5,
            ..Default::default()
        };
        assert_eq!(stats.total_records(), 15);
    }
}
