use crate::config::Config;
use crate::crawler::{CrawlReport, CrawlSupervisor, Crawler, Fetcher, HttpFetcher};
use crate::lemma::Lemmatizer;
use crate::output::{load_statistics, IndexStatistics};
use crate::search::{SearchEngine, SearchResults};
use crate::state::SiteStatus;
use crate::storage::{self, SharedStorage, SiteRecord, SqliteStorage, Storage};
use crate::url::{fetch_target, normalize_site_url, parse_http_url, site_path};
use crate::EngineError;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use url::Url;

/// Error recorded for sites left INDEXING by a process that did not finish
pub const INTERRUPTED_MESSAGE: &str = "Indexing was interrupted";

/// A configured site: canonical identity plus the URL its crawl starts from
#[derive(Debug, Clone, PartialEq, Eq)]
struct ConfiguredSite {
    url: String,
    name: String,
    seed: Url,
}

/// Marks a single-page re-index in flight until dropped
struct PageReindex<'a>(&'a AtomicUsize);

impl Drop for PageReindex<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// The operator-facing facade over crawling, indexing and search
///
/// At most one full indexing run exists at a time. The run is owned by a
/// [`CrawlSupervisor`] that lives in `active` until the next start replaces it.
/// Full runs and single-page re-indexes exclude each other; both checks are
/// made under the `active` lock.
pub struct IndexingService {
    sites: Vec<ConfiguredSite>,
    default_limit: usize,
    storage: SharedStorage,
    crawler: Arc<Crawler>,
    engine: SearchEngine,
    active: Mutex<Option<Arc<CrawlSupervisor>>>,
    reindexing: AtomicUsize,
}

impl IndexingService {
    /// Opens the database and builds the HTTP fetcher and lemmatizer from the configuration
    ///
    /// # Arguments
    ///
    /// * `config` - A validated configuration
    ///
    /// # Returns
    ///
    /// * `Ok(IndexingService)` - Ready service; interrupted sites are reconciled
    /// * `Err(EngineError)` - The database or HTTP client could not be created
    pub fn new(config: &Config) -> Result<Self, EngineError> {
        let storage = SqliteStorage::new(Path::new(&config.database.path))?;
        let fetcher = HttpFetcher::new(&config.user_agent, &config.crawler)?;
        let lemmatizer = Lemmatizer::from_config(&config.lemmatizer);

        Self::with_parts(config, storage, Arc::new(fetcher), lemmatizer)
    }

    /// Builds the service from explicit collaborators
    pub fn with_parts(
        config: &Config,
        mut storage: SqliteStorage,
        fetcher: Arc<dyn Fetcher>,
        lemmatizer: Lemmatizer,
    ) -> Result<Self, EngineError> {
        let reconciled = storage.fail_interrupted_sites(INTERRUPTED_MESSAGE)?;
        if reconciled > 0 {
            tracing::warn!("Marked {} interrupted sites as failed", reconciled);
        }

        let sites = config
            .sites
            .iter()
            .map(|entry| -> Result<ConfiguredSite, EngineError> {
                Ok(ConfiguredSite {
                    url: normalize_site_url(&entry.url)?,
                    name: entry.name.clone(),
                    seed: fetch_target(&parse_http_url(entry.url.trim())?),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let storage = storage::shared(storage);
        let crawler = Crawler::new(&config.crawler, fetcher, storage.clone(), lemmatizer.clone());

        Ok(Self {
            sites,
            default_limit: config.search.default_limit,
            engine: SearchEngine::new(storage.clone(), lemmatizer),
            crawler: Arc::new(crawler),
            storage,
            active: Mutex::new(None),
            reindexing: AtomicUsize::new(0),
        })
    }

    /// The running supervisor, if a run has not finished yet
    fn running(&self) -> Option<Arc<CrawlSupervisor>> {
        self.active
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .filter(|supervisor| !supervisor.is_finished())
            .cloned()
    }

    /// Whether a full indexing run is in progress
    pub fn is_indexing(&self) -> bool {
        self.running().is_some()
    }

    /// Starts a full re-index of every configured site
    ///
    /// Each site's previous pages, lemmas and index rows are deleted and the
    /// site is marked INDEXING before its crawl task is spawned.
    ///
    /// # Returns
    ///
    /// * `Ok(())` - The run started
    /// * `Err(EngineError::AlreadyRunning)` - A run or a single-page re-index
    ///   is active; nothing changed
    pub async fn start_indexing(&self) -> Result<(), EngineError> {
        let mut active = self.active.lock().unwrap_or_else(PoisonError::into_inner);
        if active.as_ref().is_some_and(|supervisor| !supervisor.is_finished())
            || self.reindexing.load(Ordering::SeqCst) > 0
        {
            return Err(EngineError::AlreadyRunning);
        }

        let sites = self.prepare_sites()?;
        tracing::info!("Starting indexing of {} sites", sites.len());

        *active = Some(Arc::new(CrawlSupervisor::start(
            Arc::clone(&self.crawler),
            self.storage.clone(),
            sites,
        )));
        Ok(())
    }

    fn prepare_sites(&self) -> Result<Vec<(SiteRecord, Url)>, EngineError> {
        let mut storage = storage::lock(&self.storage);
        let mut records = Vec::with_capacity(self.sites.len());

        for site in &self.sites {
            let record = storage.insert_or_get_site(&site.url, &site.name, SiteStatus::Indexing)?;
            storage.clear_site(record.id)?;
            storage.update_site_status(record.id, SiteStatus::Indexing, None)?;
            records.push((storage.get_site(record.id)?, site.seed.clone()));
        }

        Ok(records)
    }

    /// Requests a cooperative stop of the running indexing
    ///
    /// Branches already fetching finish their page; nothing new starts.
    ///
    /// # Returns
    ///
    /// * `Ok(())` - Stop requested
    /// * `Err(EngineError::NotRunning)` - No run is active, or a stop is already pending
    pub fn stop_indexing(&self) -> Result<(), EngineError> {
        match self.running() {
            Some(supervisor) if supervisor.request_stop() => {
                tracing::info!("Indexing stop requested");
                Ok(())
            }
            _ => Err(EngineError::NotRunning),
        }
    }

    /// Waits for the current (or last) run to finish
    ///
    /// # Returns
    ///
    /// The run's report, or `None` if indexing was never started
    pub async fn wait_for_completion(&self) -> Option<CrawlReport> {
        let supervisor = self
            .active
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()?;
        Some(supervisor.wait().await)
    }

    /// Fetches and re-indexes one page of a configured site
    ///
    /// # Returns
    ///
    /// * `Ok(())` - The page is indexed
    /// * `Err(EngineError::SiteNotConfigured)` - The URL is outside every configured site
    /// * `Err(EngineError::AlreadyRunning)` - A full run is active
    ///
    /// While the page is re-indexed, [`start_indexing`](Self::start_indexing)
    /// is rejected.
    pub async fn index_page(&self, url: &str) -> Result<(), EngineError> {
        let target = parse_http_url(url.trim())?;
        let configured = self
            .sites
            .iter()
            .find(|site| site_path(&site.url, &target).is_some())
            .ok_or_else(|| EngineError::SiteNotConfigured {
                url: url.to_string(),
            })?;

        let _reindex = self.reserve_page_reindex()?;

        let (site, created) = {
            let mut storage = storage::lock(&self.storage);
            match storage.get_site_by_url(&configured.url)? {
                Some(site) => (site, false),
                None => {
                    let site = storage.insert_or_get_site(
                        &configured.url,
                        &configured.name,
                        SiteStatus::Indexing,
                    )?;
                    (site, true)
                }
            }
        };

        tracing::info!("Re-indexing {}", target);
        let result = self.crawler.index_single_page(&site, &target).await;

        let mut storage = storage::lock(&self.storage);
        match &result {
            Ok(()) => storage.update_site_status(site.id, SiteStatus::Indexed, None)?,
            Err(e) if created => {
                storage.update_site_status(site.id, SiteStatus::Failed, Some(&e.to_string()))?
            }
            Err(e) => tracing::warn!("Re-indexing {} failed: {}", target, e),
        }

        result
    }

    /// Registers a single-page re-index unless a full run is active
    fn reserve_page_reindex(&self) -> Result<PageReindex<'_>, EngineError> {
        let active = self.active.lock().unwrap_or_else(PoisonError::into_inner);
        if active.as_ref().is_some_and(|supervisor| !supervisor.is_finished()) {
            return Err(EngineError::AlreadyRunning);
        }
        self.reindexing.fetch_add(1, Ordering::SeqCst);
        Ok(PageReindex(&self.reindexing))
    }

    /// Searches one configured site or all searchable sites
    ///
    /// `limit` falls back to the configured default.
    pub fn search(
        &self,
        query: &str,
        site: Option<&str>,
        offset: usize,
        limit: Option<usize>,
    ) -> Result<SearchResults, EngineError> {
        if let Some(url) = site {
            let canonical = normalize_site_url(url)?;
            if !self.sites.iter().any(|site| site.url == canonical) {
                return Err(EngineError::SiteNotConfigured {
                    url: url.to_string(),
                });
            }
        }

        let limit = limit.unwrap_or(self.default_limit);
        self.engine.search(query, site, offset, limit)
    }

    /// Per-site and total index statistics
    pub fn statistics(&self) -> Result<IndexStatistics, EngineError> {
        let indexing = self.is_indexing();
        let storage = storage::lock(&self.storage);
        load_statistics(&*storage, indexing)
    }
}
