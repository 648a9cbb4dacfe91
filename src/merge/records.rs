//! Page record serialization
//!
//! Records are written as a JSON array. Readers are lenient about legacy
//! data: the `url` may be missing (the `id` then carries the URL), ids may be
//! strings, and shard output files may be newline-delimited JSON. Elements
//! are read one at a time, so a single bad element is reported on its own
//! instead of failing the whole document.

use crate::url::{canonicalize, record_id, CanonicalUrl};
use crate::UrlError;
use serde::de::{self, Deserializer as _, SeqAccess, Visitor};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::{self, Read, Write};

/// One indexed page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRecord {
    /// `stable_hash` of the canonical URL
    pub id: u32,
    /// Canonical URL
    pub url: String,
    pub title: String,
    pub description: String,
    pub text: String,
}

impl PageRecord {
    /// Builds a record for `url`, truncating every text field to `max_chars`
    pub fn build(
        url: &CanonicalUrl,
        title: &str,
        description: &str,
        text: &str,
        max_chars: usize,
    ) -> Self {
        Self {
            id: record_id(url),
            url: url.to_string(),
            title: truncate_chars(title, max_chars),
            description: truncate_chars(description, max_chars),
            text: truncate_chars(text, max_chars),
        }
    }
}

/// A record as found on disk, before validation
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawRecord {
    #[serde(default)]
    pub id: Option<serde_json::Value>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
}

/// One element of a record document: the record, or why it could not be read
pub type RecordEntry = Result<RawRecord, serde_json::Error>;

impl RawRecord {
    /// Reads a record from an already parsed JSON element
    pub fn from_value(value: serde_json::Value) -> RecordEntry {
        serde_json::from_value(value)
    }

    /// Re-canonicalizes the URL, recomputes the id and re-truncates the fields
    pub fn normalize(self, max_chars: usize) -> Result<PageRecord, UrlError> {
        let raw_url = match (self.url, &self.id) {
            (Some(url), _) if !url.trim().is_empty() => url,
            (_, Some(serde_json::Value::String(id))) => id.clone(),
            _ => return Err(UrlError::Empty),
        };

        let url = canonicalize(&raw_url)?;
        Ok(PageRecord::build(
            &url,
            self.title.as_deref().unwrap_or_default(),
            self.description.as_deref().unwrap_or_default(),
            self.text.as_deref().unwrap_or_default(),
            max_chars,
        ))
    }
}

/// Keeps at most `max` characters of `s`
pub fn truncate_chars(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((end, _)) => s[..end].to_string(),
        None => s.to_string(),
    }
}

/// Reads a whole shard output file
///
/// A document starting with `[` must be a valid JSON array; anything else is
/// read as one record per line. Elements or lines that are not records come
/// back as errors in place.
pub fn parse_records(content: &str) -> Result<Vec<RecordEntry>, serde_json::Error> {
    let trimmed = content.trim_start();
    if trimmed.is_empty() {
        return Ok(Vec::new());
    }

    if trimmed.starts_with('[') {
        let elements: Vec<serde_json::Value> = serde_json::from_str(trimmed)?;
        return Ok(elements.into_iter().map(RawRecord::from_value).collect());
    }

    Ok(content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(serde_json::from_str::<RawRecord>)
        .collect())
}

/// Streams the elements of a JSON array of records to `f` without holding
/// the whole array in memory
///
/// Only a document that is not a JSON array fails; an element that is not a
/// record reaches `f` as an error. Returns the number of elements visited.
pub fn stream_records<R, F>(reader: R, f: F) -> Result<usize, serde_json::Error>
where
    R: Read,
    F: FnMut(RecordEntry),
{
    let mut deserializer = serde_json::Deserializer::from_reader(reader);
    let count = (&mut deserializer).deserialize_seq(RecordVisitor(f))?;
    deserializer.end()?;
    Ok(count)
}

struct RecordVisitor<F>(F);

impl<'de, F> Visitor<'de> for RecordVisitor<F>
where
    F: FnMut(RecordEntry),
{
    type Value = usize;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("an array of page records")
    }

    fn visit_seq<A>(mut self, mut seq: A) -> Result<Self::Value, A::Error>
    where
        A: SeqAccess<'de>,
    {
        let mut count = 0;
        while let Some(element) = seq.next_element::<serde_json::Value>()? {
            (self.0)(RawRecord::from_value(element));
            count += 1;
        }
        Ok(count)
    }

    fn visit_unit<E: de::Error>(self) -> Result<Self::Value, E> {
        Ok(0)
    }
}

/// Writes records one at a time as a JSON array
pub struct RecordWriter<W: Write> {
    out: W,
    count: usize,
}

impl<W: Write> RecordWriter<W> {
    pub fn new(mut out: W) -> io::Result<Self> {
        out.write_all(b"[")?;
        Ok(Self { out, count: 0 })
    }

    pub fn write(&mut self, record: &PageRecord) -> io::Result<()> {
        if self.count > 0 {
            self.out.write_all(b",")?;
        }
        self.out.write_all(b"\n  ")?;
        serde_json::to_writer(&mut self.out, record)?;
        self.count += 1;
        Ok(())
    }

    pub fn count(&self) -> usize {
        self.count
    }

    /// Closes the array and returns the underlying writer
    pub fn finish(mut self) -> io::Result<W> {
        if self.count > 0 {
            self.out.write_all(b"\n")?;
        }
        self.out.write_all(b"]\n")?;
        Ok(self.out)
    }
}
