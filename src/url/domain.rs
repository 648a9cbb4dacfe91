use crate::url::normalize::{canonicalize, CanonicalUrl};
use crate::UrlError;
use url::Url;

/// A configured domain, canonicalized once at load time
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DomainEntry {
    /// The raw value as it appeared in the domain list
    pub raw_input: String,

    /// Absolute origin, e.g. `https://example.com`
    pub canonical_origin: String,

    /// Host key (`host[:port]`), used for sharding and the state ledger
    pub host: String,
}

impl DomainEntry {
    /// Parses a raw domain-list value into a DomainEntry
    ///
    /// Trailing slashes are ignored; everything else follows [`canonicalize`].
    pub fn parse(raw: &str) -> Result<Self, UrlError> {
        let url = canonicalize(raw.trim().trim_end_matches('/'))?;

        Ok(Self {
            raw_input: raw.to_string(),
            canonical_origin: url.origin(),
            host: url.host(),
        })
    }

    /// Returns the origin as a parsed URL (path `/`)
    pub fn origin_url(&self) -> Result<Url, UrlError> {
        Url::parse(&self.canonical_origin).map_err(|e| UrlError::Parse {
            input: self.canonical_origin.clone(),
            reason: e.to_string(),
        })
    }

    /// Returns the canonical homepage URL (`<origin>/`)
    pub fn homepage(&self) -> Result<CanonicalUrl, UrlError> {
        canonicalize(&format!("{}/", self.canonical_origin))
    }
}

/// Extracts the host key of a URL
///
/// The key is the lowercase host, followed by `:port` when the URL carries a
/// non-default port. Returns an empty string for URLs without a host.
///
/// # Examples
///
/// ```
/// use url::Url;
/// use sitemap_shard_indexer::url::host_key;
///
/// let url = Url::parse("https://EXAMPLE.COM/path").unwrap();
/// assert_eq!(host_key(&url), "example.com");
///
/// let url = Url::parse("http://localhost:8080/").unwrap();
/// assert_eq!(host_key(&url), "localhost:8080");
/// ```
pub fn host_key(url: &Url) -> String {
    let host = url.host_str().unwrap_or_default().to_lowercase();
    match url.port() {
        Some(port) => format!("{}:{}", host, port),
        None => host,
    }
}
