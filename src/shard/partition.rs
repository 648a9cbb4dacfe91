use crate::url::{stable_hash, DomainEntry};

/// Shard a host belongs to for a given shard count
///
/// Returns 0 when `shard_count` is 0.
pub fn shard_of(host: &str, shard_count: u32) -> u32 {
    if shard_count == 0 {
        return 0;
    }
    stable_hash(host) % shard_count
}

/// Selects the domains owned by shard `shard_index` of `shard_count`
///
/// Keeps list order and stops after `max_domains` matches; later matches
/// are skipped for this run.
pub fn assign(
    domains: &[DomainEntry],
    shard_index: u32,
    shard_count: u32,
    max_domains: usize,
) -> Vec<DomainEntry> {
    if shard_count == 0 || shard_index >= shard_count {
        return Vec::new();
    }

    let assigned: Vec<DomainEntry> = domains
        .iter()
        .filter(|entry| shard_of(&entry.host, shard_count) == shard_index)
        .take(max_domains)
        .cloned()
        .collect();

    tracing::debug!(
        shard = shard_index,
        shards = shard_count,
        assigned = assigned.len(),
        total = domains.len(),
        "Assigned domains"
    );
    assigned
}
