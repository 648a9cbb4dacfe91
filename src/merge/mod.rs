//! Merge module
//!
//! Combines independently produced shard artifacts into the canonical,
//! deduplicated index and the crawl-state ledger.

mod engine;
mod records;

pub use engine::{MergeInputs, ShardMergeEngine};
pub use records::{
    parse_records, stream_records, truncate_chars, PageRecord, RawRecord, RecordEntry,
    RecordWriter,
};
