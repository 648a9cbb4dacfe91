//! Sharding module
//!
//! This module handles:
//! - Deterministic assignment of domains to shards
//! - The per-shard worker that crawls its hosts and writes shard artifacts

mod partition;
mod worker;

pub use partition::{assign, shard_of};
pub use worker::{HostRun, HostStatus, ShardWorker};

/// File name prefix of shard page-record files
pub const OUTPUT_FILE_PREFIX: &str = "shard-output-";

/// File name prefix of shard host-state fragments
pub const STATE_FILE_PREFIX: &str = "shard-last-";

/// `shard-output-<i>.json`
pub fn output_file_name(shard_index: u32) -> String {
    format!("{}{}.json", OUTPUT_FILE_PREFIX, shard_index)
}

/// `shard-last-<i>.json`
pub fn state_file_name(shard_index: u32) -> String {
    format!("{}{}.json", STATE_FILE_PREFIX, shard_index)
}
