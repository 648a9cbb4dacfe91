use super::records::{parse_records, stream_records, RecordEntry, RecordWriter};
use crate::config::Config;
use crate::output::{AtomicFile, MergeStats, PreparedFile};
use crate::shard::{OUTPUT_FILE_PREFIX, STATE_FILE_PREFIX};
use crate::state::CrawlStateStore;
use crate::CrawlError;
use std::collections::HashSet;
use std::fs::{self, File};
use std::io::{self, BufReader};
use std::path::{Path, PathBuf};

/// Files consumed by one merge run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeInputs {
    /// Shard output files, in the order their records are merged
    pub output_files: Vec<PathBuf>,
    /// Shard state fragments
    pub state_files: Vec<PathBuf>,
    /// Existing canonical index (may not exist yet)
    pub existing_index: PathBuf,
    /// Existing crawl-state ledger (may not exist yet)
    pub existing_state: PathBuf,
}

impl MergeInputs {
    /// Collects the shard artifacts in `artifacts_dir`, sorted by file name
    ///
    /// The artifacts directory is mandatory; a missing one is fatal.
    pub fn discover(
        artifacts_dir: &Path,
        existing_index: &Path,
        existing_state: &Path,
    ) -> Result<Self, CrawlError> {
        if !artifacts_dir.is_dir() {
            return Err(CrawlError::MissingInput(artifacts_dir.to_path_buf()));
        }

        let mut names: Vec<String> = fs::read_dir(artifacts_dir)?
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.path().is_file())
            .filter_map(|entry| entry.file_name().into_string().ok())
            .filter(|name| name.ends_with(".json"))
            .collect();
        names.sort();

        let pick = |prefix: &str| -> Vec<PathBuf> {
            names
                .iter()
                .filter(|name| name.starts_with(prefix))
                .map(|name| artifacts_dir.join(name))
                .collect()
        };

        let inputs = Self {
            output_files: pick(OUTPUT_FILE_PREFIX),
            state_files: pick(STATE_FILE_PREFIX),
            existing_index: existing_index.to_path_buf(),
            existing_state: existing_state.to_path_buf(),
        };

        tracing::info!(
            output_files = inputs.output_files.len(),
            state_files = inputs.state_files.len(),
            "Discovered shard artifacts in {}",
            artifacts_dir.display()
        );
        Ok(inputs)
    }
}

/// Combines shard artifacts into the canonical index and ledger
///
/// The index is streamed: the existing index is copied record by record,
/// then each shard file's records are appended, skipping canonical URLs that
/// were already written. Only the set of written URLs is kept in memory.
/// Both results are written to temporary files first and renamed into place
/// only once both are complete, so a failed merge leaves the previous index
/// and ledger in place together.
#[derive(Debug, Clone)]
pub struct ShardMergeEngine {
    max_field_chars: usize,
    max_urls_per_host: usize,
}

impl ShardMergeEngine {
    pub fn new(max_field_chars: usize, max_urls_per_host: usize) -> Self {
        Self {
            max_field_chars,
            max_urls_per_host,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.index.max_field_chars, config.state.max_urls_per_host)
    }

    /// Runs the merge, writing the index to `index_out` and the ledger to
    /// `state_out`
    ///
    /// The outputs may be the same paths as the existing inputs.
    pub fn merge(
        &self,
        inputs: &MergeInputs,
        index_out: &Path,
        state_out: &Path,
    ) -> Result<MergeStats, CrawlError> {
        let mut stats = MergeStats::default();

        let index = self
            .merge_index(inputs, index_out, &mut stats)
            .map_err(|source| CrawlError::Output {
                path: index_out.to_path_buf(),
                source,
            })?;

        let ledger = self.merge_state(inputs, &mut stats);
        stats.hosts = ledger.len();
        let state = ledger.prepare_save(state_out)?;

        index.rename().map_err(|source| CrawlError::Output {
            path: index_out.to_path_buf(),
            source,
        })?;
        state.rename().map_err(|source| CrawlError::Output {
            path: state_out.to_path_buf(),
            source,
        })?;

        stats.log_summary();
        Ok(stats)
    }

    /// Writes the merged index to a temporary file for `index_out`
    fn merge_index(
        &self,
        inputs: &MergeInputs,
        index_out: &Path,
        stats: &mut MergeStats,
    ) -> io::Result<PreparedFile> {
        let mut sink = IndexSink {
            writer: RecordWriter::new(AtomicFile::create(index_out)?)?,
            seen: HashSet::new(),
            max_field_chars: self.max_field_chars,
            error: None,
        };

        if self.existing_index_is_valid(&inputs.existing_index) {
            let file = File::open(&inputs.existing_index)?;
            let mut outcome = |raw| sink.push(raw, stats, Origin::Existing);
            stream_records(BufReader::new(file), &mut outcome).map_err(io::Error::from)?;
        }
        if let Some(e) = sink.error.take() {
            return Err(e);
        }

        for path in &inputs.output_files {
            let records = match read_output_file(path) {
                Ok(records) => records,
                Err(e) => {
                    tracing::warn!("Skipping malformed shard output {}: {}", path.display(), e);
                    stats.files_skipped += 1;
                    continue;
                }
            };

            stats.output_files += 1;
            tracing::debug!("Merging {} records from {}", records.len(), path.display());

            for raw in records {
                sink.push(raw, stats, Origin::Shard);
            }
            if let Some(e) = sink.error.take() {
                return Err(e);
            }
        }

        let file = sink.writer.finish()?;
        file.prepare()
    }

    /// Validates the existing index in a streaming pre-pass
    fn existing_index_is_valid(&self, path: &Path) -> bool {
        let file = match File::open(path) {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                tracing::info!("No existing index at {}", path.display());
                return false;
            }
            Err(e) => {
                tracing::warn!("Failed to open existing index {}: {}", path.display(), e);
                return false;
            }
        };

        match stream_records(BufReader::new(file), |_| {}) {
            Ok(count) => {
                tracing::debug!("Existing index has {} records", count);
                true
            }
            Err(e) => {
                tracing::warn!(
                    "Existing index {} is unreadable ({}), treating it as empty",
                    path.display(),
                    e
                );
                false
            }
        }
    }

    fn merge_state(&self, inputs: &MergeInputs, stats: &mut MergeStats) -> CrawlStateStore {
        let cap = self.max_urls_per_host;
        let mut ledger = CrawlStateStore::load(&inputs.existing_state, cap);

        for path in &inputs.state_files {
            let fragment = fs::read_to_string(path)
                .map_err(|e| e.to_string())
                .and_then(|content| {
                    CrawlStateStore::from_json(&content, cap).map_err(|e| e.to_string())
                });

            match fragment {
                Ok(fragment) => {
                    stats.state_files += 1;
                    ledger.merge_store(fragment, cap);
                }
                Err(e) => {
                    tracing::warn!("Skipping malformed state fragment {}: {}", path.display(), e);
                    stats.files_skipped += 1;
                }
            }
        }

        ledger
    }
}

fn read_output_file(path: &Path) -> Result<Vec<RecordEntry>, CrawlError> {
    let content = fs::read_to_string(path)?;
    Ok(parse_records(&content)?)
}

#[derive(Debug, Clone, Copy)]
enum Origin {
    Existing,
    Shard,
}

/// Deduplicating record sink over the index writer
struct IndexSink {
    writer: RecordWriter<AtomicFile>,
    seen: HashSet<String>,
    max_field_chars: usize,
    error: Option<io::Error>,
}

impl IndexSink {
    fn push(&mut self, entry: RecordEntry, stats: &mut MergeStats, origin: Origin) {
        if self.error.is_some() {
            return;
        }

        let raw = match entry {
            Ok(raw) => raw,
            Err(e) => {
                tracing::debug!("Skipping malformed record: {}", e);
                stats.invalid_skipped += 1;
                return;
            }
        };

        let record = match raw.normalize(self.max_field_chars) {
            Ok(record) => record,
            Err(e) => {
                tracing::debug!("Skipping record with invalid URL: {}", e);
                stats.invalid_skipped += 1;
                return;
            }
        };

        if !self.seen.insert(record.url.clone()) {
            stats.duplicates_skipped += 1;
            return;
        }

        if let Err(e) = self.writer.write(&record) {
            self.error = Some(e);
            return;
        }

        match origin {
            Origin::Existing => stats.existing_records += 1,
            Origin::Shard => stats.merged_records += 1,
        }
    }
}
