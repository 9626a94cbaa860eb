//! Crawler coordinator - per-site crawl orchestration
//!
//! This module ties the pieces of a site crawl together:
//! - Loading the site's known paths from storage
//! - Running the recursive branch tree from the site root
//! - Deciding the site's final status from the aggregated outcomes
//! - Re-indexing a single page on demand

use crate::config::CrawlerConfig;
use crate::crawler::branch::{crawl_branch, CrawlTally, SiteCrawl};
use crate::crawler::fetcher::Fetcher;
use crate::crawler::indexer::{CrawlOutcome, PageIndexer, STOPPED_MESSAGE};
use crate::lemma::Lemmatizer;
use crate::state::SiteStatus;
use crate::storage::{self, SharedStorage, SiteRecord, Storage, StorageError};
use crate::url::{fetch_target, site_path};
use crate::EngineError;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Semaphore;
use url::Url;

/// Result of crawling one site
#[derive(Debug, Clone, PartialEq)]
pub struct SiteCrawlResult {
    pub site_url: String,
    pub status: SiteStatus,
    pub last_error: Option<String>,
    pub tally: CrawlTally,
}

/// Main crawler structure
///
/// One `Crawler` serves every site; its worker permits are shared so the
/// bound on concurrent fetches holds process-wide.
pub struct Crawler {
    indexer: PageIndexer,
    storage: SharedStorage,
    workers: Arc<Semaphore>,
    request_delay: Duration,
}

impl Crawler {
    /// Creates a new crawler
    ///
    /// # Arguments
    ///
    /// * `config` - Crawler settings (worker count, request delay)
    /// * `fetcher` - The HTTP fetch collaborator
    /// * `storage` - Shared index storage
    /// * `lemmatizer` - Text to lemma frequency extraction
    pub fn new(
        config: &CrawlerConfig,
        fetcher: Arc<dyn Fetcher>,
        storage: SharedStorage,
        lemmatizer: Lemmatizer,
    ) -> Self {
        Self {
            indexer: PageIndexer::new(fetcher, storage.clone(), lemmatizer),
            storage,
            workers: Arc::new(Semaphore::new(config.worker_count())),
            request_delay: Duration::from_millis(config.request_delay),
        }
    }

    /// Crawls a site from its seed URL and records the final status
    ///
    /// The seed is the URL as configured (it may carry a `www.` host the
    /// canonical site URL drops). Paths already recorded for the site are
    /// skipped, so crawling a site that was not cleared writes nothing new.
    ///
    /// # Returns
    ///
    /// * `Ok(SiteCrawlResult)` - The crawl ran; the site is INDEXED or FAILED
    /// * `Err(EngineError)` - The site could not be prepared or its status saved
    pub async fn crawl_site(
        &self,
        site: &SiteRecord,
        seed: &Url,
        stop: Arc<AtomicBool>,
    ) -> Result<SiteCrawlResult, EngineError> {
        let known: HashSet<String> = storage::lock(&self.storage)
            .list_page_paths(site.id)?
            .into_iter()
            .collect();

        tracing::info!(
            "Crawling {} from {} ({} paths already known)",
            site.url,
            seed,
            known.len()
        );

        let crawl = Arc::new(SiteCrawl {
            site: site.clone(),
            indexer: self.indexer.clone(),
            known_paths: Mutex::new(known),
            workers: Arc::clone(&self.workers),
            request_delay: self.request_delay,
            stop: Arc::clone(&stop),
        });

        let tally = crawl_branch(crawl, seed.clone()).await;

        let (status, last_error) = if stop.load(Ordering::SeqCst) {
            (SiteStatus::Failed, Some(STOPPED_MESSAGE.to_string()))
        } else if tally.is_success() {
            (SiteStatus::Indexed, None)
        } else {
            (SiteStatus::Failed, Some(tally.error_summary()))
        };

        storage::lock(&self.storage).update_site_status(site.id, status, last_error.as_deref())?;

        match status {
            SiteStatus::Indexed => tracing::info!(
                "Site {} indexed: {} pages, {} skipped, {} distinct errors",
                site.url,
                tally.succeeded,
                tally.skipped,
                tally.errors.len()
            ),
            _ => tracing::warn!(
                "Site {} failed: {}",
                site.url,
                last_error.as_deref().unwrap_or_default()
            ),
        }

        Ok(SiteCrawlResult {
            site_url: site.url.clone(),
            status,
            last_error,
            tally,
        })
    }

    /// Re-indexes one page of a site without following its links
    ///
    /// The previous page row (if any) is removed first, so repeating the
    /// operation never double-counts lemma frequencies.
    ///
    /// # Returns
    ///
    /// * `Ok(())` - The page was fetched and indexed
    /// * `Err(EngineError::ContentUnavailable)` - HTTP >= 400; the page is recorded empty
    /// * `Err(EngineError::NetworkUnavailable)` - The fetch failed outright
    pub async fn index_single_page(&self, site: &SiteRecord, url: &Url) -> Result<(), EngineError> {
        let path = site_path(&site.url, url).ok_or_else(|| EngineError::SiteNotConfigured {
            url: url.to_string(),
        })?;

        {
            let mut storage = storage::lock(&self.storage);
            if let Some(previous) = storage.get_page_by_path(site.id, &path)? {
                tracing::debug!("Removing previous copy of {}", path);
                storage.remove_page(previous.id)?;
            }
        }

        let target = fetch_target(url);
        let page = self.indexer.index_page(site.id, &path, &target).await;

        match page.outcome {
            // The indexer never reports a skip or a stop for a single page
            CrawlOutcome::Success
            | CrawlOutcome::AlreadyKnown
            | CrawlOutcome::OutsideSite
            | CrawlOutcome::Stopped => Ok(()),
            CrawlOutcome::ContentUnavailable { status } => {
                Err(EngineError::ContentUnavailable { status })
            }
            CrawlOutcome::NetworkError(reason) => Err(EngineError::NetworkUnavailable {
                url: target.to_string(),
                reason,
            }),
            CrawlOutcome::StorageError(reason) => Err(StorageError::Write(reason).into()),
        }
    }
}
