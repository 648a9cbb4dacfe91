//! Sitemap Shard Indexer main entry point
//!
//! This is the command-line interface for running one crawl shard and for
//! merging shard artifacts into the canonical index.

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

use sitemap_shard_indexer::config::{
    load_config_with_hash, load_domain_list, validate, Config,
};
use sitemap_shard_indexer::merge::{MergeInputs, ShardMergeEngine};
use sitemap_shard_indexer::output::{print_merge_stats, print_shard_stats};
use sitemap_shard_indexer::shard::ShardWorker;
use sitemap_shard_indexer::state::CrawlStateStore;

/// Sitemap Shard Indexer: a sharded, polite sitemap crawler
///
/// Each `crawl` run processes one shard of the domain list and writes its
/// artifacts; `merge` folds every shard's artifacts into one deduplicated
/// index and crawl-state ledger.
#[derive(Parser, Debug)]
#[command(name = "sitemap-shard-indexer")]
#[command(version)]
#[command(about = "A sharded, polite sitemap crawler", long_about = None)]
struct Cli {
    /// Path to an optional TOML configuration file
    #[arg(short, long, global = true, value_name = "CONFIG", env = "CRAWL_CONFIG")]
    config: Option<PathBuf>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Crawl the hosts of one shard and write its artifacts
    Crawl(CrawlArgs),

    /// Merge shard artifacts into the canonical index and state ledger
    Merge(MergeArgs),
}

#[derive(Args, Debug)]
struct CrawlArgs {
    /// Domain list (one domain per line, or CSV with the domain in column 2)
    #[arg(long, default_value = "domains.csv", env = "CRAWL_DOMAINS")]
    domains: PathBuf,

    /// Existing crawl-state ledger
    #[arg(long, default_value = "site/last_indexed.json", env = "CRAWL_STATE")]
    state: PathBuf,

    /// Directory the shard artifacts are written to
    #[arg(long, default_value = "shard_artifacts", env = "CRAWL_ARTIFACTS")]
    artifacts: PathBuf,

    #[command(flatten)]
    overrides: CrawlOverrides,
}

#[derive(Args, Debug)]
struct MergeArgs {
    /// Directory holding shard-output-*.json and shard-last-*.json
    #[arg(long, default_value = "shard_artifacts", env = "CRAWL_ARTIFACTS")]
    artifacts: PathBuf,

    /// Canonical index, read and rewritten in place
    #[arg(long, default_value = "site/index.json", env = "CRAWL_INDEX")]
    index: PathBuf,

    /// Crawl-state ledger, read and rewritten in place
    #[arg(long, default_value = "site/last_indexed.json", env = "CRAWL_STATE")]
    state: PathBuf,

    #[arg(long, env = "CRAWL_MAX_FIELD_CHARS")]
    max_field_chars: Option<usize>,

    #[arg(long, env = "CRAWL_MAX_URLS_PER_HOST")]
    max_urls_per_host: Option<usize>,
}

/// Command-line and environment overrides; unset values keep the
/// configuration file's (or default) value
#[derive(Args, Debug, Default)]
struct CrawlOverrides {
    #[arg(long, env = "CRAWL_SHARD_INDEX")]
    shard_index: Option<u32>,

    #[arg(long, env = "CRAWL_SHARD_COUNT")]
    shard_count: Option<u32>,

    #[arg(long, env = "CRAWL_DOMAINS_PER_RUN")]
    max_domains: Option<usize>,

    #[arg(long, env = "CRAWL_CONCURRENCY")]
    concurrency: Option<usize>,

    #[arg(long, env = "CRAWL_RATE_MS")]
    rate_ms: Option<u64>,

    #[arg(long, env = "CRAWL_FETCH_TIMEOUT_MS")]
    fetch_timeout_ms: Option<u64>,

    #[arg(long, env = "CRAWL_HOST_TIMEOUT_MS")]
    host_timeout_ms: Option<u64>,

    #[arg(long, env = "CRAWL_PAGES_PER_DOMAIN")]
    max_pages_per_host: Option<usize>,

    /// Stop starting new hosts once this many records were produced
    #[arg(long, env = "CRAWL_MAX_TOTAL_PAGES")]
    max_total_pages: Option<usize>,

    #[arg(long, env = "CRAWL_RETRIES")]
    retries: Option<u32>,

    #[arg(long, env = "CRAWL_RETRY_BACKOFF_MS")]
    retry_backoff_ms: Option<u64>,

    #[arg(long, env = "CRAWL_DAYS_NO_CHECK")]
    days_no_check: Option<u32>,

    #[arg(long, env = "CRAWL_MAX_URLS_PER_HOST")]
    max_urls_per_host: Option<usize>,

    #[arg(long, env = "CRAWL_MAX_FIELD_CHARS")]
    max_field_chars: Option<usize>,

    #[arg(long, env = "CRAWL_MAX_TEXT_CHARS")]
    max_text_chars: Option<usize>,

    /// Crawl every assigned host, ignoring the re-crawl TTL
    #[arg(long, env = "CRAWL_FORCE")]
    force: bool,
}

impl CrawlOverrides {
    fn apply(&self, config: &mut Config) {
        fn set<T: Copy>(target: &mut T, value: Option<T>) {
            if let Some(value) = value {
                *target = value;
            }
        }

        set(&mut config.shard.index, self.shard_index);
        set(&mut config.shard.count, self.shard_count);
        set(&mut config.shard.max_domains, self.max_domains);
        set(&mut config.crawler.concurrency, self.concurrency);
        set(&mut config.crawler.rate_ms, self.rate_ms);
        set(&mut config.crawler.fetch_timeout_ms, self.fetch_timeout_ms);
        set(&mut config.crawler.host_timeout_ms, self.host_timeout_ms);
        set(&mut config.crawler.max_pages_per_host, self.max_pages_per_host);
        set(&mut config.crawler.max_total_pages, self.max_total_pages);
        set(&mut config.crawler.retries, self.retries);
        set(&mut config.crawler.retry_backoff_ms, self.retry_backoff_ms);
        set(&mut config.state.days_no_check, self.days_no_check);
        set(&mut config.state.max_urls_per_host, self.max_urls_per_host);
        set(&mut config.index.max_field_chars, self.max_field_chars);
        set(&mut config.index.max_text_chars, self.max_text_chars);
        if self.force {
            config.state.force = true;
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    let mut config = load_base_config(cli.config.as_deref())?;

    match cli.command {
        Command::Crawl(args) => {
            args.overrides.apply(&mut config);
            validate(&config).context("invalid configuration")?;
            handle_crawl(config, &args, cli.quiet).await
        }
        Command::Merge(args) => {
            if let Some(max) = args.max_field_chars {
                config.index.max_field_chars = max;
            }
            if let Some(max) = args.max_urls_per_host {
                config.state.max_urls_per_host = max;
            }
            validate(&config).context("invalid configuration")?;
            handle_merge(&config, &args, cli.quiet)
        }
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
///
/// `RUST_LOG` takes precedence when set.
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else if let Ok(filter) = EnvFilter::try_from_default_env() {
        filter
    } else {
        match verbose {
            0 => EnvFilter::new("sitemap_shard_indexer=info,warn"),
            1 => EnvFilter::new("sitemap_shard_indexer=debug,info"),
            2 => EnvFilter::new("sitemap_shard_indexer=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

fn load_base_config(path: Option<&Path>) -> anyhow::Result<Config> {
    let Some(path) = path else {
        tracing::info!("No configuration file given, using defaults");
        return Ok(Config::default());
    };

    tracing::info!("Loading configuration from: {}", path.display());
    let (config, hash) = load_config_with_hash(path)
        .with_context(|| format!("failed to load configuration {}", path.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", hash);
    Ok(config)
}

/// Runs one shard
async fn handle_crawl(config: Config, args: &CrawlArgs, quiet: bool) -> anyhow::Result<()> {
    let domains = load_domain_list(&args.domains)
        .with_context(|| format!("cannot read domain list {}", args.domains.display()))?;
    tracing::info!("Loaded {} domains from {}", domains.len(), args.domains.display());

    let ledger = CrawlStateStore::load(&args.state, config.state.max_urls_per_host);
    let shard_index = config.shard.index;

    let worker = ShardWorker::new(config).context("failed to build HTTP client")?;
    let stats = worker
        .run(&domains, &ledger, &args.artifacts)
        .await
        .context("shard run failed")?;

    if !quiet {
        print_shard_stats(shard_index, &stats);
    }
    Ok(())
}

/// Merges all shard artifacts
fn handle_merge(config: &Config, args: &MergeArgs, quiet: bool) -> anyhow::Result<()> {
    let inputs = MergeInputs::discover(&args.artifacts, &args.index, &args.state)
        .with_context(|| format!("cannot read artifacts directory {}", args.artifacts.display()))?;

    let stats = ShardMergeEngine::from_config(config)
        .merge(&inputs, &args.index, &args.state)
        .context("merge failed")?;

    tracing::info!(
        "Wrote {} records to {} and {} hosts to {}",
        stats.total_records(),
        args.index.display(),
        stats.hosts,
        args.state.display()
    );

    if !quiet {
        print_merge_stats(&stats);
    }
    Ok(())
}
