//! Crawl state ledger
//!
//! # Components
//!
//! - `HostState`: last crawl time and previously indexed URLs for one host
//! - `CrawlStateStore`: the host-keyed ledger, loaded at shard start and
//!   written atomically as shard fragments and by the merge

mod host_state;
mod store;

pub use host_state::HostState;
pub use store::CrawlStateStore;

use chrono::{DateTime, Utc};

/// Current time truncated to whole milliseconds, the ledger's resolution
pub fn now_millis() -> DateTime<Utc> {
    let now = Utc::now();
    DateTime::from_timestamp_millis(now.timestamp_millis()).unwrap_or(now)
}
