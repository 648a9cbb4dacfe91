/// Computes a deterministic 32-bit DJB2 hash of a string
///
/// The hash is computed over the UTF-8 bytes with wrapping arithmetic
/// (`h = h * 33 + byte`, seeded with 5381). It is used both for shard
/// assignment and for page record identifiers, so its output must never
/// change between processes, platforms or releases.
///
/// # Examples
///
/// ```
/// use sitemap_shard_indexer::url::stable_hash;
///
/// assert_eq!(stable_hash(""), 5381);
/// assert_eq!(stable_hash("a"), 177670);
/// ```
pub fn stable_hash(s: &str) -> u32 {
    s.bytes()
        .fold(5381u32, |hash, byte| {
            hash.wrapping_mul(33).wrapping_add(u32::from(byte))
        })
}
