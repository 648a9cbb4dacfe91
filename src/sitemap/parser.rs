//! Sitemap document parsing
//!
//! Both document shapes are handled by one structured pass:
//! `<urlset><url><loc>` and `<sitemapindex><sitemap><loc>`. Malformed XML
//! falls back to a `<loc>` scan over the raw text, and the result records
//! which strategy produced it.

use flate2::read::GzDecoder;
use regex::Regex;
use serde::Deserialize;
use std::io::{self, Read};
use std::sync::OnceLock;

/// Outcome of parsing one sitemap document
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SitemapParse {
    /// The document parsed as XML
    Structured(Vec<String>),
    /// XML parsing failed or found nothing, but a raw `<loc>` scan did
    RegexFallback(Vec<String>),
    /// Neither strategy found anything in a document that is not valid XML
    Failed(String),
}

impl SitemapParse {
    pub fn locs(&self) -> &[String] {
        match self {
            SitemapParse::Structured(locs) | SitemapParse::RegexFallback(locs) => locs,
            SitemapParse::Failed(_) => &[],
        }
    }

    pub fn strategy(&self) -> &'static str {
        match self {
            SitemapParse::Structured(_) => "structured",
            SitemapParse::RegexFallback(_) => "regex",
            SitemapParse::Failed(_) => "failed",
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct SitemapDocument {
    #[serde(default)]
    url: Vec<LocEntry>,
    #[serde(default)]
    sitemap: Vec<LocEntry>,
}

#[derive(Debug, Default, Deserialize)]
struct LocEntry {
    #[serde(default)]
    loc: Option<String>,
}

/// Parses a sitemap or sitemap index document
pub fn parse_sitemap(xml: &str) -> SitemapParse {
    let structured = quick_xml::de::from_str::<SitemapDocument>(xml).map(|doc| {
        doc.sitemap
            .into_iter()
            .chain(doc.url)
            .filter_map(|entry| entry.loc)
            .map(|loc| loc.trim().to_string())
            .filter(|loc| !loc.is_empty())
            .collect::<Vec<_>>()
    });

    match structured {
        Ok(locs) if !locs.is_empty() => SitemapParse::Structured(locs),
        Ok(locs) => {
            let scanned = scan_locs(xml);
            if scanned.is_empty() {
                SitemapParse::Structured(locs)
            } else {
                SitemapParse::RegexFallback(scanned)
            }
        }
        Err(e) => {
            let scanned = scan_locs(xml);
            if scanned.is_empty() {
                SitemapParse::Failed(e.to_string())
            } else {
                tracing::debug!("Sitemap is not valid XML ({}), using <loc> scan", e);
                SitemapParse::RegexFallback(scanned)
            }
        }
    }
}

fn loc_regex() -> Option<&'static Regex> {
    static LOC: OnceLock<Option<Regex>> = OnceLock::new();
    LOC.get_or_init(|| Regex::new(r"(?is)<loc>\s*(.*?)\s*</loc>").ok())
        .as_ref()
}

/// Scans raw text for `<loc>` values
fn scan_locs(text: &str) -> Vec<String> {
    let Some(re) = loc_regex() else {
        return Vec::new();
    };

    re.captures_iter(text)
        .filter_map(|caps| caps.get(1))
        .map(|m| {
            let raw = m.as_str();
            let raw = raw
                .strip_prefix("<![CDATA[")
                .and_then(|s| s.strip_suffix("]]>"))
                .unwrap_or(raw)
                .trim();
            quick_xml::escape::unescape(raw)
                .map(|s| s.into_owned())
                .unwrap_or_else(|_| raw.to_string())
        })
        .filter(|loc| !loc.is_empty())
        .collect()
}

/// Decodes a sitemap body, gunzipping when the URL or content type says gzip
///
/// Bodies that are flagged as gzip but lack the gzip magic bytes are taken
/// as already decompressed (the HTTP layer may have decoded them).
pub fn decode_body(url: &str, content_type: &str, body: &[u8]) -> io::Result<String> {
    let flagged = url.to_ascii_lowercase().ends_with(".gz") || content_type.contains("gzip");

    if flagged && body.starts_with(&[0x1f, 0x8b]) {
        let mut decoder = GzDecoder::new(body);
        let mut bytes = Vec::new();
        decoder.read_to_end(&mut bytes)?;
        return Ok(String::from_utf8_lossy(&bytes).into_owned());
    }

    Ok(String::from_utf8_lossy(body).into_owned())
}
