//! Fetching module
//!
//! This module handles all page and document fetching:
//! - Building the HTTP client with the crawler's user agent
//! - Single fetch attempts under a hard timeout
//! - The retry-with-backoff decorator and the bounded worker pool
//! - Page extraction (title, description, paragraph text)
//! - The fetch pipeline turning candidate URLs into page records

mod client;
mod extractor;
mod pipeline;
mod pool;
mod retry;

pub use client::{build_http_client, fetch_once, FetchedBody};
pub use extractor::{ExtractedPage, HtmlExtractor, PageExtractor};
pub use pipeline::{FetchFailure, FetchPipeline, FetchReport, PipelineOptions};
pub use pool::WorkerPool;
pub use retry::{retry_with_backoff, RetryPolicy};

use std::time::Duration;
use thiserror::Error;

/// Why a single fetch attempt was rejected
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FetchError {
    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    #[error("HTTP status {status}")]
    Http { status: u16 },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Not HTML (content-type '{content_type}')")]
    NotHtml { content_type: String },

    #[error("Extraction incomplete (empty title, description or text)")]
    IncompleteExtraction,

    #[error("Failed to read body: {0}")]
    Body(String),
}

impl FetchError {
    /// Returns false for rejections that retrying cannot change
    pub fn is_retryable(&self) -> bool {
        !matches!(
            self,
            FetchError::NotHtml { .. } | FetchError::IncompleteExtraction
        )
    }

    /// Short label used for failure counters
    pub fn kind(&self) -> &'static str {
        match self {
            FetchError::Timeout(_) => "timeout",
            FetchError::Http { .. } => "http",
            FetchError::Network(_) => "network",
            FetchError::NotHtml { .. } => "not_html",
            FetchError::IncompleteExtraction => "incomplete",
            FetchError::Body(_) => "body",
        }
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(e: reqwest::Error) -> Self {
        if let Some(status) = e.status() {
            FetchError::Http {
                status: status.as_u16(),
            }
        } else if e.is_body() || e.is_decode() {
            FetchError::Body(e.to_string())
        } else {
            FetchError::Network(e.to_string())
        }
    }
}
