//! Lifecycle of one full indexing run
//!
//! A [`CrawlSupervisor`] is created when indexing starts and owns everything
//! the run shares: the cooperative stop flag and the channel the final
//! report is published on. Sites are crawled in parallel, one task per site.

use crate::crawler::coordinator::{Crawler, SiteCrawlResult};
use crate::state::SiteStatus;
use crate::storage::{self, SharedStorage, SiteRecord, Storage};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinSet;
use url::Url;

/// Final report of an indexing run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CrawlReport {
    pub sites: Vec<SiteCrawlResult>,
}

impl CrawlReport {
    /// Number of sites that ended INDEXED
    pub fn indexed(&self) -> usize {
        self.sites
            .iter()
            .filter(|site| site.status == SiteStatus::Indexed)
            .count()
    }
}

/// Owns the stop flag and result channel of a running crawl
#[derive(Debug)]
pub struct CrawlSupervisor {
    stop: Arc<AtomicBool>,
    report: watch::Receiver<Option<CrawlReport>>,
}

impl CrawlSupervisor {
    /// Spawns one crawl task per site and returns the supervisor
    ///
    /// Each site is paired with the URL its crawl starts from. Sites must
    /// already be prepared (cleared and marked INDEXING).
    pub fn start(
        crawler: Arc<Crawler>,
        storage: SharedStorage,
        sites: Vec<(SiteRecord, Url)>,
    ) -> Self {
        let stop = Arc::new(AtomicBool::new(false));
        let (tx, rx) = watch::channel(None);

        let run_stop = Arc::clone(&stop);
        tokio::spawn(async move {
            let mut tasks = JoinSet::new();
            for (site, seed) in sites {
                let crawler = Arc::clone(&crawler);
                let storage = storage.clone();
                let stop = Arc::clone(&run_stop);
                tasks.spawn(async move {
                    match crawler.crawl_site(&site, &seed, stop).await {
                        Ok(result) => result,
                        Err(e) => fail_site(&storage, &site, &e.to_string()),
                    }
                });
            }

            let mut report = CrawlReport::default();
            while let Some(joined) = tasks.join_next().await {
                match joined {
                    Ok(result) => report.sites.push(result),
                    Err(e) => tracing::error!("Site crawl task failed: {}", e),
                }
            }

            tracing::info!(
                "Indexing finished: {} of {} sites indexed",
                report.indexed(),
                report.sites.len()
            );
            let _ = tx.send(Some(report));
        });

        Self { stop, report: rx }
    }

    /// Requests a cooperative stop
    ///
    /// # Returns
    ///
    /// `false` if a stop was already requested or the run has finished
    pub fn request_stop(&self) -> bool {
        if self.is_finished() {
            return false;
        }
        !self.stop.swap(true, Ordering::SeqCst)
    }

    /// Whether every site task has completed
    pub fn is_finished(&self) -> bool {
        self.report.borrow().is_some()
    }

    /// Waits for the run to drain and returns its report
    pub async fn wait(&self) -> CrawlReport {
        let mut rx = self.report.clone();
        let report = match rx.wait_for(Option::is_some).await {
            Ok(report) => report.clone().unwrap_or_default(),
            // The run task died before reporting
            Err(_) => CrawlReport::default(),
        };
        report
    }
}

/// Marks a site FAILED when its crawl could not run at all
fn fail_site(storage: &SharedStorage, site: &SiteRecord, error: &str) -> SiteCrawlResult {
    tracing::error!("Crawl of {} aborted: {}", site.url, error);
    if let Err(e) =
        storage::lock(storage).update_site_status(site.id, SiteStatus::Failed, Some(error))
    {
        tracing::error!("Failed to record status of {}: {}", site.url, e);
    }

    SiteCrawlResult {
        site_url: site.url.clone(),
        status: SiteStatus::Failed,
        last_error: Some(error.to_string()),
        tally: Default::default(),
    }
}
