//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests for the crawler, including:
//! - Building HTTP clients with the configured user agent and referrer
//! - GET requests to fetch page content
//! - Error classification for transport failures
//!
//! Non-2xx responses are data, not errors: the caller decides what an HTTP
//! status means for the page.

use crate::config::{CrawlerConfig, UserAgentConfig};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, REFERER};
use reqwest::{redirect::Policy, Client};
use std::time::Duration;

/// Result of a fetch operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchResult {
    /// The server answered (any status code)
    Response {
        /// Final URL after redirects
        final_url: String,
        /// HTTP status code
        status: u16,
        /// Response body
        body: String,
    },

    /// Network error (connection refused, timeout, etc.)
    NetworkError {
        /// Error description without the URL
        error: String,
    },
}

/// Fetch collaborator used by the crawler
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Fetches an absolute URL
    async fn fetch(&self, url: &str) -> FetchResult;
}

/// Builds an HTTP client with proper configuration
///
/// # Arguments
///
/// * `agent` - The user agent configuration
/// * `crawler` - Crawler settings (for the network timeout)
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client
///
/// # Example
///
/// ```no_run
/// use lemma_search::config::{CrawlerConfig, UserAgentConfig};
/// use lemma_search::crawler::build_http_client;
///
/// let agent = UserAgentConfig {
///     name: "LemmaSearchBot".to_string(),
///     version: "1.0".to_string(),
///     referrer: Some("https://www.google.com".to_string()),
/// };
///
/// let client = build_http_client(&agent, &CrawlerConfig::default()).unwrap();
/// ```
pub fn build_http_client(
    agent: &UserAgentConfig,
    crawler: &CrawlerConfig,
) -> Result<Client, reqwest::Error> {
    // Format: Name/Version
    let user_agent = format!("{}/{}", agent.name, agent.version);

    let mut headers = HeaderMap::new();
    if let Some(referrer) = &agent.referrer {
        match HeaderValue::from_str(referrer) {
            Ok(value) => {
                headers.insert(REFERER, value);
            }
            Err(_) => tracing::warn!("Ignoring referrer that is not a valid header: {}", referrer),
        }
    }

    Client::builder()
        .user_agent(user_agent)
        .default_headers(headers)
        .timeout(Duration::from_secs(crawler.timeout))
        .connect_timeout(Duration::from_secs(crawler.timeout.min(10)))
        .redirect(Policy::limited(10))
        .gzip(true)
        .brotli(true)
        .build()
}

/// [`Fetcher`] backed by a `reqwest` client
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    /// Creates a fetcher from the agent and crawler configuration
    pub fn new(agent: &UserAgentConfig, crawler: &CrawlerConfig) -> Result<Self, reqwest::Error> {
        Ok(Self {
            client: build_http_client(agent, crawler)?,
        })
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> FetchResult {
        fetch_url(&self.client, url).await
    }
}

/// Fetches a URL, mapping transport failures to [`FetchResult::NetworkError`]
///
/// Redirects are followed by the client (at most 10 hops). There is no
/// retry: a timed-out or refused request is final for the caller.
pub async fn fetch_url(client: &Client, url: &str) -> FetchResult {
    let response = match client.get(url).send().await {
        Ok(response) => response,
        Err(e) => return FetchResult::NetworkError { error: classify(e) },
    };

    let status = response.status().as_u16();
    let final_url = response.url().to_string();
    match response.text().await {
        Ok(body) => FetchResult::Response {
            final_url,
            status,
            body,
        },
        Err(e) => FetchResult::NetworkError { error: classify(e) },
    }
}

fn classify(e: reqwest::Error) -> String {
    if e.is_timeout() {
        "Request timeout".to_string()
    } else if e.is_connect() {
        "Connection refused".to_string()
    } else if e.is_redirect() {
        "Too many redirects".to_string()
    } else {
        e.without_url().to_string()
    }
}
