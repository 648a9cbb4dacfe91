use crate::output::{prepare_json, PreparedFile};
use crate::state::HostState;
use crate::CrawlError;
use chrono::{DateTime, Duration, Utc};
use serde_json::Value;
use std::collections::btree_map::{self, BTreeMap};
use std::fs;
use std::io;
use std::path::Path;

/// Per-host crawl ledger
///
/// Maps a host key to its [`HostState`]. The ledger is read at shard start,
/// written as a fragment at shard end, and folded back into the global ledger
/// by the merge. Iteration order is sorted by host so written files are
/// deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CrawlStateStore {
    hosts: BTreeMap<String, HostState>,
}

impl CrawlStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads a ledger file
    ///
    /// A missing or unreadable file yields an empty ledger; the run never
    /// fails on it. Entries over `cap` are trimmed to their newest URLs.
    pub fn load(path: &Path, cap: usize) -> Self {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                tracing::info!("No crawl state at {}, starting empty", path.display());
                return Self::new();
            }
            Err(e) => {
                tracing::warn!("Failed to read crawl state {}: {}", path.display(), e);
                return Self::new();
            }
        };

        match Self::from_json(&content, cap) {
            Ok(store) => {
                tracing::debug!(
                    "Loaded crawl state for {} hosts from {}",
                    store.len(),
                    path.display()
                );
                store
            }
            Err(e) => {
                tracing::warn!(
                    "Crawl state {} is corrupt ({}), starting empty",
                    path.display(),
                    e
                );
                Self::new()
            }
        }
    }

    /// Parses a ledger document (`{ host: { "lastAt": ..., "urls": [...] } }`)
    ///
    /// Only a document that is not a JSON object is an error. Entries are
    /// read one at a time: bad fields fall back to their defaults and entries
    /// that are not objects are skipped.
    pub fn from_json(content: &str, cap: usize) -> Result<Self, serde_json::Error> {
        let raw: BTreeMap<String, Value> = serde_json::from_str(content)?;

        let mut hosts = BTreeMap::new();
        for (host, value) in raw {
            match HostState::from_value(&host, &value) {
                Some(mut state) => {
                    state.enforce_cap(cap);
                    hosts.insert(host, state);
                }
                None => tracing::warn!(host = %host, "Skipping malformed crawl state entry"),
            }
        }

        Ok(Self { hosts })
    }

    pub fn get(&self, host: &str) -> Option<&HostState> {
        self.hosts.get(host)
    }

    /// Checks whether `host` was crawled within `ttl` of `now`
    ///
    /// Unknown hosts are never fresh, and `force` disables the check.
    pub fn is_fresh(&self, host: &str, now: DateTime<Utc>, ttl: Duration, force: bool) -> bool {
        self.hosts
            .get(host)
            .map(|state| state.is_fresh(now, ttl, force))
            .unwrap_or(false)
    }

    /// Inserts or replaces the state for its host
    pub fn insert(&mut self, state: HostState) {
        self.hosts.insert(state.host.clone(), state);
    }

    /// Folds a fragment into the ledger: max of `lastAt`, union of URLs
    pub fn merge_host(&mut self, state: HostState, cap: usize) {
        match self.hosts.entry(state.host.clone()) {
            btree_map::Entry::Occupied(mut entry) => entry.get_mut().merge_from(state, cap),
            btree_map::Entry::Vacant(entry) => {
                let mut state = state;
                state.enforce_cap(cap);
                entry.insert(state);
            }
        }
    }

    /// Folds every host of another ledger into this one
    pub fn merge_store(&mut self, other: CrawlStateStore, cap: usize) {
        for (_, state) in other.hosts {
            self.merge_host(state, cap);
        }
    }

    /// Writes the ledger atomically
    pub fn save(&self, path: &Path) -> Result<(), CrawlError> {
        self.prepare_save(path)?
            .rename()
            .map_err(|source| CrawlError::Output {
                path: path.to_path_buf(),
                source,
            })?;

        tracing::debug!(
            "Saved crawl state for {} hosts to {}",
            self.len(),
            path.display()
        );
        Ok(())
    }

    /// Writes the ledger to a temporary file for `path`, leaving the rename
    /// to the caller
    pub fn prepare_save(&self, path: &Path) -> Result<PreparedFile, CrawlError> {
        prepare_json(path, &self.hosts).map_err(|source| CrawlError::Output {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn len(&self) -> usize {
        self.hosts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hosts.is_empty()
    }
}

impl FromIterator<HostState> for CrawlStateStore {
    fn from_iter<I: IntoIterator<Item = HostState>>(iter: I) -> Self {
        let mut store = Self::new();
        for state in iter {
            store.insert(state);
        }
        store
    }
}
