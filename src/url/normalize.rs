use crate::url::domain::host_key;
use crate::UrlError;
use std::fmt;
use url::Url;

/// Tracking query parameters removed during canonicalization
const TRACKING_PARAMS: &[&str] = &["fbclid", "gclid", "mc_eid"];

/// A URL in canonical form, used as the dedup key for page records
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CanonicalUrl(Url);

impl CanonicalUrl {
    /// Returns the canonical URL string
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    /// Returns the underlying parsed URL
    pub fn as_url(&self) -> &Url {
        &self.0
    }

    /// Returns the host key (`host[:port]`, port only when non-default)
    pub fn host(&self) -> String {
        host_key(&self.0)
    }

    /// Returns the ASCII origin (`scheme://host[:port]`)
    pub fn origin(&self) -> String {
        self.0.origin().ascii_serialization()
    }
}

impl fmt::Display for CanonicalUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0.as_str())
    }
}

/// Canonicalizes a raw URL or domain string
///
/// # Accepted Inputs
///
/// - Bare hostnames (`example.com`) and scheme-less strings (`example.com/a`)
/// - Angle-bracket-wrapped URLs (`<https://example.com>`)
/// - Markdown links (`[text](https://example.com)`), the inner URL is used
///
/// # Canonicalization Steps
///
/// 1. Unwrap Markdown and angle-bracket forms, trim whitespace
/// 2. Default to `https://` when no scheme is present
/// 3. Parse; reject anything that is not an `http`/`https` URL with a host
/// 4. Lowercase the host (done by the parser) and remove the fragment
/// 5. Remove tracking query parameters and drop an empty query string
///
/// The result is idempotent: canonicalizing a canonical URL yields itself.
///
/// # Examples
///
/// ```
/// use sitemap_shard_indexer::url::canonicalize;
///
/// let url = canonicalize("[home](EXAMPLE.com/page#top)").unwrap();
/// assert_eq!(url.as_str(), "https://example.com/page");
/// ```
pub fn canonicalize(raw: &str) -> Result<CanonicalUrl, UrlError> {
    let trimmed = unwrap_link(raw.trim());
    if trimmed.is_empty() {
        return Err(UrlError::Empty);
    }

    let candidate = if has_scheme(trimmed) {
        trimmed.to_string()
    } else {
        format!("https://{}", trimmed.trim_start_matches('/'))
    };

    let mut url = Url::parse(&candidate).map_err(|e| UrlError::Parse {
        input: raw.to_string(),
        reason: e.to_string(),
    })?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(url.scheme().to_string()));
    }

    if url.host_str().map_or(true, str::is_empty) {
        return Err(UrlError::MissingHost(raw.to_string()));
    }

    url.set_fragment(None);
    strip_tracking_params(&mut url);

    Ok(CanonicalUrl(url))
}

/// Extracts the inner URL from Markdown-link and angle-bracket wrappers
fn unwrap_link(s: &str) -> &str {
    let mut s = s;

    if s.starts_with('[') && s.ends_with(')') {
        if let Some(split) = s.find("](") {
            s = s[split + 2..s.len() - 1].trim();
        }
    }

    if s.starts_with('<') && s.ends_with('>') && s.len() >= 2 {
        s = s[1..s.len() - 1].trim();
    }

    s
}

/// Checks whether the string starts with `scheme://`
fn has_scheme(s: &str) -> bool {
    let Some(pos) = s.find("://") else {
        return false;
    };
    let scheme = &s[..pos];
    let mut chars = scheme.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() => {
            chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
        }
        _ => false,
    }
}

/// Removes tracking parameters, rewriting the query only when one was present
fn strip_tracking_params(url: &mut Url) {
    match url.query() {
        None => return,
        Some("") => {
            url.set_query(None);
            return;
        }
        Some(_) => {}
    }

    if !url.query_pairs().any(|(key, _)| is_tracking_param(&key)) {
        return;
    }

    let kept: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(key, _)| !is_tracking_param(key))
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();

    if kept.is_empty() {
        url.set_query(None);
    } else {
        url.query_pairs_mut().clear().extend_pairs(kept);
    }
}

/// Checks if a query parameter is a tracking parameter
fn is_tracking_param(key: &str) -> bool {
    key.starts_with("utm_") || TRACKING_PARAMS.contains(&key)
}
