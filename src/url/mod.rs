//! URL handling module
//!
//! This module provides canonicalization, the stable string hash used for
//! sharding and record identifiers, domain-list entries, and host matching.

mod domain;
mod hash;
mod matcher;
mod normalize;

pub use domain::{host_key, DomainEntry};
pub use hash::stable_hash;
pub use matcher::{matches_host, HostFilter};
pub use normalize::{canonicalize, CanonicalUrl};

/// Computes the record identifier for a canonical URL
pub fn record_id(url: &CanonicalUrl) -> u32 {
    stable_hash(url.as_str())
}
