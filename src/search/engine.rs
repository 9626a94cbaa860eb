//! Query planning and execution
//!
//! A query runs through the same steps on every site it targets:
//! lemmatize, resolve the lemmas on the site (rarest first), intersect the
//! page sets, score. Results of all sites are normalized against one
//! [`RelevanceSession`] and ordered globally before rendering.

use crate::crawler::parse_html;
use crate::lemma::Lemmatizer;
use crate::search::relevance::RelevanceSession;
use crate::search::snippet::snippet;
use crate::state::SiteStatus;
use crate::storage::{self, filter_overcommon_lemma, LemmaRecord, SharedStorage, SiteRecord, Storage};
use crate::url::{normalize_site_url, page_url};
use crate::EngineError;
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::HashSet;
use url::Url;

/// One rendered search hit
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchResult {
    /// Canonical site URL
    pub site: String,
    pub site_name: String,
    /// Site-relative page path
    pub uri: String,
    pub title: String,
    pub snippet: String,
    /// Normalized relevance in (0, 1]
    pub relevance: f64,
}

/// A page of search results
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SearchResults {
    /// Number of matching pages before pagination
    pub count: usize,
    pub results: Vec<SearchResult>,
}

/// A matching page before rendering
#[derive(Debug, Clone)]
struct ScoredPage {
    /// Index into the searched sites
    site: usize,
    page_id: i64,
    absolute: f64,
}

/// The lemmas a site search runs with, and the pages they matched
#[derive(Debug, Default)]
struct SiteMatches {
    lemmas: Vec<String>,
    pages: Vec<(i64, f64)>,
}

/// Pages of one query in global order, with what rendering needs
#[derive(Debug)]
struct RankedMatches {
    sites: Vec<SiteRecord>,
    plans: Vec<Vec<String>>,
    pages: Vec<ScoredPage>,
    session: RelevanceSession,
}

/// Answers ranked queries against the index store
#[derive(Debug, Clone)]
pub struct SearchEngine {
    storage: SharedStorage,
    lemmatizer: Lemmatizer,
}

impl SearchEngine {
    pub fn new(storage: SharedStorage, lemmatizer: Lemmatizer) -> Self {
        Self {
            storage,
            lemmatizer,
        }
    }

    /// Runs a query against one site or against every searchable site
    ///
    /// # Arguments
    ///
    /// * `query` - Raw query text; its lemmas are combined with AND
    /// * `site` - Optional site URL restricting the search
    /// * `offset` - Number of ranked results to skip
    /// * `limit` - Maximum number of results to render
    ///
    /// # Returns
    ///
    /// * `Ok(SearchResults)` - The total match count and the requested window
    /// * `Err(EngineError::EmptyQuery)` - The query has no indexable words
    /// * `Err(EngineError::SiteNotIndexed)` - The scoped site is not INDEXED
    /// * `Err(EngineError::NoMatch)` - No page matched
    pub fn search(
        &self,
        query: &str,
        site: Option<&str>,
        offset: usize,
        limit: usize,
    ) -> Result<SearchResults, EngineError> {
        let mut query_lemmas: Vec<String> =
            self.lemmatizer.extract_lemmas(query).into_keys().collect();
        if query_lemmas.is_empty() {
            return Err(EngineError::EmptyQuery);
        }
        query_lemmas.sort();

        let ranked = self.rank(&query_lemmas, site)?;
        let count = ranked.pages.len();
        let results = ranked
            .pages
            .iter()
            .skip(offset)
            .take(limit)
            .map(|page| {
                self.render(
                    &ranked.sites[page.site],
                    &ranked.plans[page.site],
                    page.page_id,
                    ranked.session.normalize(page.absolute),
                )
            })
            .collect::<Result<Vec<_>, _>>()?;

        tracing::debug!(
            "Query {:?} matched {} pages, returning {}",
            query,
            count,
            results.len()
        );

        Ok(SearchResults { count, results })
    }

    /// Scores every matching page and orders them globally
    ///
    /// The storage lock is held only here; rendering re-locks per page.
    fn rank(&self, query_lemmas: &[String], site: Option<&str>) -> Result<RankedMatches, EngineError> {
        let storage = storage::lock(&self.storage);

        let sites = match site {
            Some(url) => vec![scoped_site(&*storage, url)?],
            None => storage
                .list_sites()?
                .into_iter()
                .filter(|site| site.status != SiteStatus::Indexing)
                .collect(),
        };

        let mut session = RelevanceSession::new();
        let mut plans = Vec::with_capacity(sites.len());
        let mut pages = Vec::new();

        for (index, target) in sites.iter().enumerate() {
            match search_site(&*storage, target, query_lemmas, &mut session) {
                Ok(matches) => {
                    pages.extend(matches.pages.iter().map(|&(page_id, absolute)| ScoredPage {
                        site: index,
                        page_id,
                        absolute,
                    }));
                    plans.push(matches.lemmas);
                }
                Err(e) if site.is_some() => return Err(e),
                Err(e) => {
                    tracing::debug!("No results from {}: {}", target.url, e);
                    plans.push(Vec::new());
                }
            }
        }

        if pages.is_empty() {
            return Err(EngineError::NoMatch);
        }

        pages.sort_by(|a, b| {
            session
                .normalize(b.absolute)
                .partial_cmp(&session.normalize(a.absolute))
                .unwrap_or(Ordering::Equal)
        });

        Ok(RankedMatches {
            sites,
            plans,
            pages,
            session,
        })
    }

    fn render(
        &self,
        site: &SiteRecord,
        lemmas: &[String],
        page_id: i64,
        relevance: f64,
    ) -> Result<SearchResult, EngineError> {
        let page = storage::lock(&self.storage).get_page(page_id)?;
        let base = Url::parse(&page_url(&site.url, &page.path))?;
        let parsed = parse_html(&page.content, &base);

        Ok(SearchResult {
            site: site.url.clone(),
            site_name: site.name.clone(),
            uri: page.path,
            title: parsed.title.unwrap_or_default(),
            snippet: snippet(&self.lemmatizer, lemmas, &parsed.text),
            relevance,
        })
    }
}

/// Looks up the site a scoped search targets; it must be INDEXED
fn scoped_site(storage: &impl Storage, url: &str) -> Result<SiteRecord, EngineError> {
    let canonical = normalize_site_url(url)?;
    match storage.get_site_by_url(&canonical)? {
        Some(site) if site.status.is_searchable() => Ok(site),
        _ => Err(EngineError::SiteNotIndexed { url: canonical }),
    }
}

/// Resolves query lemmas on a site, rarest first
///
/// Lemmas unknown to the site and lemmas too common to discriminate are
/// dropped. The sort is stable, so equal frequencies keep query order.
pub(crate) fn plan_query(
    storage: &impl Storage,
    site: &SiteRecord,
    query_lemmas: &[String],
) -> Result<Vec<LemmaRecord>, EngineError> {
    let total_pages = storage.count_pages(site.id)?;

    let mut resolved = Vec::new();
    for lemma in query_lemmas {
        if let Some(record) = storage.get_lemma(site.id, lemma)? {
            if filter_overcommon_lemma(&record, total_pages) {
                resolved.push(record);
            }
        }
    }

    resolved.sort_by_key(|record| record.frequency);
    Ok(resolved)
}

/// Pages indexed under every planned lemma, in page order
fn intersect_pages(
    storage: &impl Storage,
    lemmas: &[LemmaRecord],
) -> Result<Vec<i64>, EngineError> {
    let Some((rarest, rest)) = lemmas.split_first() else {
        return Ok(Vec::new());
    };

    let mut pages = storage.pages_with_lemma(rarest.id)?;
    for lemma in rest {
        if pages.is_empty() {
            break;
        }
        let indexed: HashSet<i64> = storage.pages_with_lemma(lemma.id)?.into_iter().collect();
        pages.retain(|page| indexed.contains(page));
    }

    Ok(pages)
}

fn search_site(
    storage: &impl Storage,
    site: &SiteRecord,
    query_lemmas: &[String],
    session: &mut RelevanceSession,
) -> Result<SiteMatches, EngineError> {
    let plan = plan_query(storage, site, query_lemmas)?;
    let pages = intersect_pages(storage, &plan)?;
    if pages.is_empty() {
        return Err(EngineError::NoMatch);
    }

    let lemma_ids: Vec<i64> = plan.iter().map(|lemma| lemma.id).collect();
    let mut scored = Vec::with_capacity(pages.len());
    for page_id in pages {
        let entries = storage.index_entries(page_id, &lemma_ids)?;
        scored.push((page_id, session.score(&entries)));
    }

    Ok(SiteMatches {
        lemmas: plan.into_iter().map(|lemma| lemma.lemma).collect(),
        pages: scored,
    })
}
