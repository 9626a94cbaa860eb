//! Fetch-parse-merge pipeline for a single page
//!
//! Both the recursive crawl and single-page re-indexing go through
//! [`PageIndexer::index_page`]: fetch the page, record it, lemmatize its text
//! and merge the lemma map into the site index.

use crate::crawler::fetcher::{FetchResult, Fetcher};
use crate::crawler::parser::parse_html;
use crate::lemma::Lemmatizer;
use crate::storage::{self, SharedStorage, Storage};
use std::sync::Arc;
use url::Url;

/// Outcome of one crawl branch
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CrawlOutcome {
    /// The page was fetched and indexed
    Success,

    /// The path was already recorded for the site
    AlreadyKnown,

    /// The URL lies outside the site; nothing was fetched
    OutsideSite,

    /// The server answered with HTTP >= 400
    ContentUnavailable { status: u16 },

    /// The fetch failed outright
    NetworkError(String),

    /// The page could not be written
    StorageError(String),

    /// The stop flag was set before the branch started
    Stopped,
}

impl CrawlOutcome {
    /// Returns true for outcomes that count as handled
    pub fn is_success(&self) -> bool {
        matches!(self, CrawlOutcome::Success | CrawlOutcome::AlreadyKnown)
    }

    /// The message recorded as a site's last error
    pub fn error_message(&self) -> Option<String> {
        match self {
            CrawlOutcome::Success | CrawlOutcome::AlreadyKnown | CrawlOutcome::OutsideSite => None,
            CrawlOutcome::ContentUnavailable { status } => {
                Some(format!("Content unavailable (HTTP {})", status))
            }
            CrawlOutcome::NetworkError(reason) => Some(format!("Network unavailable: {}", reason)),
            CrawlOutcome::StorageError(reason) => Some(format!("Storage error: {}", reason)),
            CrawlOutcome::Stopped => Some(STOPPED_MESSAGE.to_string()),
        }
    }
}

/// Error recorded for sites whose crawl was stopped by the operator
pub const STOPPED_MESSAGE: &str = "Indexing stopped by user";

/// A processed page: its outcome and the links it exposes
#[derive(Debug)]
pub struct IndexedPage {
    pub outcome: CrawlOutcome,
    pub links: Vec<String>,
}

impl IndexedPage {
    fn failed(outcome: CrawlOutcome) -> Self {
        Self {
            outcome,
            links: Vec::new(),
        }
    }
}

/// Fetches pages and publishes them to the index store
#[derive(Clone)]
pub struct PageIndexer {
    fetcher: Arc<dyn Fetcher>,
    storage: SharedStorage,
    lemmatizer: Lemmatizer,
}

impl PageIndexer {
    pub fn new(fetcher: Arc<dyn Fetcher>, storage: SharedStorage, lemmatizer: Lemmatizer) -> Self {
        Self {
            fetcher,
            storage,
            lemmatizer,
        }
    }

    /// Fetches `url` and records it under `path` on the site
    ///
    /// # Arguments
    ///
    /// * `site_id` - The site the page belongs to
    /// * `path` - Site-relative path of the page
    /// * `url` - Absolute URL to fetch
    ///
    /// # Returns
    ///
    /// The branch outcome, plus the page's outbound links when it was indexed.
    /// Pages answering HTTP >= 400 are recorded with empty content and no
    /// lemmas; network failures record nothing.
    pub async fn index_page(&self, site_id: i64, path: &str, url: &Url) -> IndexedPage {
        let (final_url, status, body) = match self.fetcher.fetch(url.as_str()).await {
            FetchResult::Response {
                final_url,
                status,
                body,
            } => (final_url, status, body),
            FetchResult::NetworkError { error } => {
                tracing::warn!("Failed to fetch {}: {}", url, error);
                return IndexedPage::failed(CrawlOutcome::NetworkError(error));
            }
        };

        if status >= 400 {
            tracing::debug!("{} answered HTTP {}", url, status);
            let mut storage = storage::lock(&self.storage);
            if let Err(e) = storage.insert_page(site_id, path, status, "") {
                tracing::error!("Failed to record {}: {}", url, e);
                return IndexedPage::failed(CrawlOutcome::StorageError(e.to_string()));
            }
            return IndexedPage::failed(CrawlOutcome::ContentUnavailable { status });
        }

        // Relative links resolve against where the page actually lives
        let base = Url::parse(&final_url).unwrap_or_else(|_| url.clone());
        let parsed = parse_html(&body, &base);
        let lemmas = self.lemmatizer.extract_lemmas(&parsed.indexable_text());

        let merged = {
            let mut storage = storage::lock(&self.storage);
            storage
                .insert_page(site_id, path, status, &body)
                .and_then(|page_id| storage.merge_page(page_id, &lemmas))
        };

        if let Err(e) = merged {
            tracing::error!("Failed to index {}: {}", url, e);
            return IndexedPage::failed(CrawlOutcome::StorageError(e.to_string()));
        }

        tracing::debug!("Indexed {} ({} lemmas)", url, lemmas.len());
        IndexedPage {
            outcome: CrawlOutcome::Success,
            links: parsed.links,
        }
    }
}
