//! Output module for artifacts and run summaries
//!
//! This module handles:
//! - Writing artifact files atomically (temporary file, then rename)
//! - Recording shard and merge counters

mod atomic;
pub mod stats;

pub use atomic::{
    ensure_writable_dir, prepare_json, write_json_atomic, AtomicFile, PreparedFile,
};
pub use stats::{print_merge_stats, print_shard_stats, MergeStats, ShardStats};
