use crate::url::domain::host_key;
use url::Url;

/// Checks if a candidate host is an assigned host or one of its subdomains
///
/// # Examples
///
/// ```
/// use sitemap_shard_indexer::url::matches_host;
///
/// assert!(matches_host("example.com", "example.com"));
/// assert!(matches_host("example.com", "blog.example.com"));
/// assert!(!matches_host("example.com", "notexample.com"));
/// ```
pub fn matches_host(assigned: &str, candidate: &str) -> bool {
    if assigned.is_empty() {
        return false;
    }
    candidate == assigned
        || (candidate.len() > assigned.len()
            && candidate.ends_with(assigned)
            && candidate.as_bytes()[candidate.len() - assigned.len() - 1] == b'.')
}

/// Allow-filter for sitemap candidates: a page is kept only when its host is
/// one of the assigned hosts or a subdomain of one
#[derive(Debug, Clone, Default)]
pub struct HostFilter {
    hosts: Vec<String>,
}

impl HostFilter {
    pub fn new<I, S>(hosts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            hosts: hosts.into_iter().map(Into::into).collect(),
        }
    }

    /// Returns true if the URL's host passes the filter
    pub fn allows(&self, url: &Url) -> bool {
        let candidate = host_key(url);
        self.hosts.iter().any(|host| matches_host(host, &candidate))
    }

    pub fn len(&self) -> usize {
        self.hosts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hosts.is_empty()
    }
}
