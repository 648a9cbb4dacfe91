use crate::url::DomainEntry;
use crate::CrawlError;
use std::collections::HashSet;
use std::path::Path;

/// Loads the domain list
///
/// One entry per line. Blank lines and `#` comments are ignored. For
/// comma-separated lines the second column is used when present, otherwise
/// the first. Entries that cannot be canonicalized are logged and dropped;
/// repeated hosts keep their first occurrence.
///
/// Columns are split on every comma. Quoted fields containing commas
/// (`"Acme, Inc",acme.com`) are not supported and shift the columns.
///
/// A missing or unreadable file is fatal.
pub fn load_domain_list(path: &Path) -> Result<Vec<DomainEntry>, CrawlError> {
    if !path.is_file() {
        return Err(CrawlError::MissingInput(path.to_path_buf()));
    }

    let content = std::fs::read_to_string(path)?;
    Ok(parse_domain_list(&content))
}

/// Parses domain-list text into canonical entries
pub fn parse_domain_list(content: &str) -> Vec<DomainEntry> {
    let mut entries = Vec::new();
    let mut hosts = HashSet::new();

    for (line_no, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let value = select_column(line);
        if value.is_empty() {
            continue;
        }

        match DomainEntry::parse(value) {
            Ok(entry) => {
                if hosts.insert(entry.host.clone()) {
                    entries.push(entry);
                } else {
                    tracing::debug!("Duplicate host on line {}: {}", line_no + 1, entry.host);
                }
            }
            Err(e) => {
                tracing::warn!("Dropping invalid domain on line {}: {}", line_no + 1, e);
            }
        }
    }

    entries
}

/// Picks the domain column of a line; quoting is not understood
fn select_column(line: &str) -> &str {
    let mut columns = line.split(',').map(|c| c.trim().trim_matches('"').trim());
    let first = columns.next().unwrap_or_default();
    match columns.next() {
        Some(second) if !second.is_empty() => second,
        _ => first,
    }
}
