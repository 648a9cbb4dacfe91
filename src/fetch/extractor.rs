//! Page extraction
//!
//! Turns an HTML document into the three text fields a page record carries:
//! - the `<title>` text
//! - the `<meta name="description">` content
//! - the non-empty `<p>` texts, joined with newlines

use crate::merge::truncate_chars;
use scraper::{Html, Selector};

/// Text fields extracted from one page, before field truncation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractedPage {
    pub title: String,
    pub description: String,
    pub text: String,
}

impl ExtractedPage {
    /// True when none of the three fields is empty
    pub fn is_complete(&self) -> bool {
        !self.title.is_empty() && !self.description.is_empty() && !self.text.is_empty()
    }
}

/// Extracts page fields from an HTML body
pub trait PageExtractor: Send + Sync {
    fn extract(&self, html: &str) -> ExtractedPage;
}

/// [`PageExtractor`] backed by `scraper`
#[derive(Debug, Clone)]
pub struct HtmlExtractor {
    max_text_chars: usize,
}

impl HtmlExtractor {
    /// `max_text_chars` caps the joined paragraph text
    pub fn new(max_text_chars: usize) -> Self {
        Self { max_text_chars }
    }
}

impl Default for HtmlExtractor {
    fn default() -> Self {
        Self::new(120_000)
    }
}

impl PageExtractor for HtmlExtractor {
    fn extract(&self, html: &str) -> ExtractedPage {
        let document = Html::parse_document(html);

        let paragraphs: Vec<String> = select_all(&document, "p")
            .into_iter()
            .filter(|p| !p.is_empty())
            .collect();

        ExtractedPage {
            title: extract_title(&document).unwrap_or_default(),
            description: extract_description(&document).unwrap_or_default(),
            text: truncate_chars(&paragraphs.join("\n"), self.max_text_chars),
        }
    }
}

/// Extracts the page title from the HTML document
fn extract_title(document: &Html) -> Option<String> {
    let title_selector = Selector::parse("title").ok()?;

    document
        .select(&title_selector)
        .next()
        .map(|element| element.text().collect::<String>().trim().to_string())
        .filter(|s| !s.is_empty())
}

fn extract_description(document: &Html) -> Option<String> {
    let selector = Selector::parse(r#"meta[name="description"]"#).ok()?;

    document
        .select(&selector)
        .next()
        .and_then(|element| element.value().attr("content"))
        .map(|content| content.trim().to_string())
        .filter(|s| !s.is_empty())
}

fn select_all(document: &Html, selector: &str) -> Vec<String> {
    let Ok(selector) = Selector::parse(selector) else {
        return Vec::new();
    };

    document
        .select(&selector)
        .map(|element| element.text().collect::<String>().trim().to_string())
        .collect()
}
