use super::FetchError;
use crate::config::UserAgentConfig;
use reqwest::{redirect::Policy, Client};
use std::time::Duration;

/// A successful (2xx) response with its body read in full
#[derive(Debug, Clone)]
pub struct FetchedBody {
    /// Final URL after redirects
    pub final_url: String,
    /// HTTP status code
    pub status: u16,
    /// Content-Type header value, lower-cased (empty when absent)
    pub content_type: String,
    /// Raw body bytes
    pub body: Vec<u8>,
}

impl FetchedBody {
    /// Checks the content type the way page fetches expect it
    pub fn is_html(&self) -> bool {
        self.content_type.contains("html")
    }

    /// Body decoded as UTF-8, replacing invalid sequences
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Builds an HTTP client with proper configuration
///
/// The per-request timeout is enforced by [`fetch_once`]; the client timeout
/// is a backstop for requests issued elsewhere.
///
/// # Example
///
/// ```no_run
/// use sitemap_shard_indexer::config::UserAgentConfig;
/// use sitemap_shard_indexer::fetch::build_http_client;
/// use std::time::Duration;
///
/// let client = build_http_client(&UserAgentConfig::default(), Duration::from_secs(12)).unwrap();
/// ```
pub fn build_http_client(
    config: &UserAgentConfig,
    timeout: Duration,
) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(config.header_value())
        .timeout(timeout)
        .connect_timeout(timeout.min(Duration::from_secs(10)))
        .redirect(Policy::limited(10))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Performs one GET request under a hard timeout
///
/// The request future is dropped when the timeout expires, which aborts the
/// in-flight request. Non-2xx statuses are returned as [`FetchError::Http`].
pub async fn fetch_once(
    client: &Client,
    url: &str,
    timeout: Duration,
) -> Result<FetchedBody, FetchError> {
    let request = async {
        let response = client.get(url).send().await?;
        let status = response.status();

        if !status.is_success() {
            return Err(FetchError::Http {
                status: status.as_u16(),
            });
        }

        let final_url = response.url().to_string();
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_lowercase();

        let body = response
            .bytes()
            .await
            .map_err(|e| FetchError::Body(e.to_string()))?;

        Ok(FetchedBody {
            final_url,
            status: status.as_u16(),
            content_type,
            body: body.to_vec(),
        })
    };

    match tokio::time::timeout(timeout, request).await {
        Ok(result) => result,
        Err(_) => Err(FetchError::Timeout(timeout)),
    }
}
