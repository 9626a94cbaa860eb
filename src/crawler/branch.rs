//! Recursive crawl branches
//!
//! Every discovered link becomes a branch: a spawned task that visits one
//! page, then spawns and joins one child branch per followable link. The
//! pool of worker permits bounds how many branches fetch at once; a branch
//! holds its permit only while it fetches and indexes, never while joining
//! children.

use crate::crawler::indexer::{CrawlOutcome, PageIndexer};
use crate::storage::SiteRecord;
use crate::url::{fetch_target, is_followable_link, site_path};
use std::collections::{BTreeSet, HashSet};
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use url::Url;

/// Aggregated outcomes of a crawl tree
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CrawlTally {
    /// Branches that indexed their page
    pub succeeded: usize,

    /// Branches that found their path already recorded
    pub skipped: usize,

    /// Distinct error messages of failed branches
    pub errors: BTreeSet<String>,
}

impl CrawlTally {
    /// Adds one branch outcome
    pub fn record(&mut self, outcome: &CrawlOutcome) {
        match outcome {
            CrawlOutcome::Success => self.succeeded += 1,
            CrawlOutcome::AlreadyKnown => self.skipped += 1,
            CrawlOutcome::OutsideSite => {}
            other => {
                if let Some(message) = other.error_message() {
                    self.errors.insert(message);
                }
            }
        }
    }

    /// Folds a child tree into this one
    pub fn merge(&mut self, other: CrawlTally) {
        self.succeeded += other.succeeded;
        self.skipped += other.skipped;
        self.errors.extend(other.errors);
    }

    /// Whether the tree handled at least one page
    pub fn is_success(&self) -> bool {
        self.succeeded > 0 || self.skipped > 0
    }

    /// Distinct error messages joined into one line
    pub fn error_summary(&self) -> String {
        self.errors.iter().cloned().collect::<Vec<_>>().join("; ")
    }
}

/// State shared by all branches of one site's crawl
pub struct SiteCrawl {
    pub site: SiteRecord,
    pub indexer: PageIndexer,
    pub known_paths: Mutex<HashSet<String>>,
    pub workers: Arc<Semaphore>,
    pub request_delay: Duration,
    pub stop: Arc<AtomicBool>,
}

impl SiteCrawl {
    fn is_stopped(&self) -> bool {
        self.stop.load(Ordering::SeqCst)
    }

    /// Claims a path for this crawl; false if another branch already has it
    fn claim(&self, path: &str) -> bool {
        self.known_paths
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(path.to_string())
    }

    /// Visits one page: claim, wait for a worker, fetch, index
    async fn visit(&self, url: &Url) -> (CrawlOutcome, Vec<String>) {
        if self.is_stopped() {
            return (CrawlOutcome::Stopped, Vec::new());
        }

        let Some(path) = site_path(&self.site.url, url) else {
            tracing::debug!("Skipping {}: outside {}", url, self.site.url);
            return (CrawlOutcome::OutsideSite, Vec::new());
        };

        if !self.claim(&path) {
            tracing::trace!("Skipping known path {}", path);
            return (CrawlOutcome::AlreadyKnown, Vec::new());
        }

        let Ok(_permit) = self.workers.acquire().await else {
            return (CrawlOutcome::Stopped, Vec::new());
        };

        // Branches still queued for a worker have not started yet
        if self.is_stopped() {
            return (CrawlOutcome::Stopped, Vec::new());
        }

        tokio::time::sleep(self.request_delay).await;

        let target = fetch_target(url);
        let page = self.indexer.index_page(self.site.id, &path, &target).await;
        (page.outcome, page.links)
    }
}

type BranchFuture = Pin<Box<dyn Future<Output = CrawlTally> + Send>>;

/// Crawls `url` and everything reachable from it within the site
pub fn crawl_branch(crawl: Arc<SiteCrawl>, url: Url) -> BranchFuture {
    Box::pin(async move {
        let mut tally = CrawlTally::default();

        let (outcome, links) = crawl.visit(&url).await;
        tally.record(&outcome);

        if links.is_empty() || crawl.is_stopped() {
            return tally;
        }

        let mut children = JoinSet::new();
        for link in links {
            if !is_followable_link(&crawl.site.url, &link) {
                continue;
            }
            if let Ok(child) = Url::parse(&link) {
                children.spawn(crawl_branch(Arc::clone(&crawl), child));
            }
        }

        while let Some(joined) = children.join_next().await {
            match joined {
                Ok(child) => tally.merge(child),
                Err(e) => {
                    tracing::error!("Crawl branch under {} failed: {}", url, e);
                    tally.errors.insert("Crawl task failed".to_string());
                }
            }
        }

        tally
    })
}
