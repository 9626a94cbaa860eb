//! Integration tests for crawling, indexing and search
//!
//! These tests use wiremock to create mock HTTP servers and run the full
//! crawl → index → search cycle end-to-end.

use lemma_search::api::INTERRUPTED_MESSAGE;
use lemma_search::config::{
    Config, CrawlerConfig, DatabaseConfig, LemmatizerConfig, SearchConfig, SiteEntry,
    UserAgentConfig,
};
use lemma_search::crawler::{Crawler, HttpFetcher, STOPPED_MESSAGE};
use lemma_search::storage::{self, SharedStorage, SiteRecord, SqliteStorage, Storage};
use lemma_search::{EngineError, IndexingService, Lemmatizer, SiteStatus};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use url::Url;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Creates a test configuration crawling the given site URLs
fn create_test_config(sites: &[&str], db_path: &str) -> Config {
    Config {
        crawler: CrawlerConfig {
            request_delay: 10, // Very short for testing
            workers: 4,
            timeout: 5,
        },
        user_agent: UserAgentConfig {
            name: "TestBot".to_string(),
            version: "1.0.0".to_string(),
            referrer: None,
        },
        database: DatabaseConfig {
            path: db_path.to_string(),
        },
        lemmatizer: LemmatizerConfig::default(),
        search: SearchConfig::default(),
        sites: sites
            .iter()
            .enumerate()
            .map(|(i, url)| SiteEntry {
                name: format!("Site {}", i + 1),
                url: url.to_string(),
            })
            .collect(),
    }
}

fn create_service(config: &Config) -> IndexingService {
    let fetcher = HttpFetcher::new(&config.user_agent, &config.crawler).unwrap();
    IndexingService::with_parts(
        config,
        SqliteStorage::new_in_memory().unwrap(),
        Arc::new(fetcher),
        Lemmatizer::russian(),
    )
    .unwrap()
}

fn html(body: &str) -> String {
    format!("<html><head><title>Test</title></head><body>{}</body></html>", body)
}

async fn mount_page(server: &MockServer, page: &str, body: &str) {
    Mock::given(method("GET"))
        .and(path(page))
        .respond_with(ResponseTemplate::new(200).set_body_string(html(body)))
        .mount(server)
        .await;
}

/// A crawler over fresh in-memory storage with one site row
fn create_crawler(site_url: &str) -> (Crawler, SharedStorage, SiteRecord) {
    create_crawler_with_workers(site_url, 4)
}

fn create_crawler_with_workers(
    site_url: &str,
    workers: usize,
) -> (Crawler, SharedStorage, SiteRecord) {
    let mut config = create_test_config(&[site_url], ":memory:");
    config.crawler.workers = workers;
    let storage = storage::shared(SqliteStorage::new_in_memory().unwrap());
    let site = storage::lock(&storage)
        .insert_or_get_site(site_url, "Test", SiteStatus::Indexing)
        .unwrap();
    let fetcher = HttpFetcher::new(&config.user_agent, &config.crawler).unwrap();
    let crawler = Crawler::new(
        &config.crawler,
        Arc::new(fetcher),
        storage.clone(),
        Lemmatizer::russian(),
    );
    (crawler, storage, site)
}

fn no_stop() -> Arc<AtomicBool> {
    Arc::new(AtomicBool::new(false))
}

/// The URL a site's crawl starts from
fn seed(site: &SiteRecord) -> Url {
    Url::parse(&site.url).unwrap()
}

/// Paths the mock server has been asked for, in arrival order
async fn requested_paths(server: &MockServer) -> Vec<String> {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .map(|request| request.url.path().to_string())
        .collect()
}

/// Polls until the mock server has seen `count` requests
async fn wait_for_requests(server: &MockServer, count: usize) {
    for _ in 0..200 {
        if requested_paths(server).await.len() >= count {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("server never received {} requests", count);
}

#[tokio::test]
async fn test_single_page_site_is_indexed() {
    let mock_server = MockServer::start().await;
    mount_page(&mock_server, "/", "кот кот кот").await;

    let (crawler, storage, site) = create_crawler(&mock_server.uri());
    let result = crawler.crawl_site(&site, &seed(&site), no_stop()).await.unwrap();
    assert_eq!(result.status, SiteStatus::Indexed);
    assert_eq!(result.last_error, None);

    let storage = storage::lock(&storage);
    let lemma = storage.get_lemma(site.id, "кот").unwrap().unwrap();
    assert_eq!(lemma.frequency, 1);

    let pages = storage.pages_with_lemma(lemma.id).unwrap();
    assert_eq!(pages.len(), 1);
    let entries = storage.index_entries(pages[0], &[lemma.id]).unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].rank, 3.0);

    assert_eq!(storage.get_site(site.id).unwrap().status, SiteStatus::Indexed);
}

#[tokio::test]
async fn test_recrawl_of_known_pages_writes_nothing() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200).set_body_string(html("кот кот кот")))
        .expect(1)
        .mount(&mock_server)
        .await;

    let (crawler, storage, site) = create_crawler(&mock_server.uri());
    crawler.crawl_site(&site, &seed(&site), no_stop()).await.unwrap();

    let counts = |storage: &SharedStorage| {
        let storage = storage::lock(storage);
        (
            storage.count_pages(site.id).unwrap(),
            storage.count_lemmas(site.id).unwrap(),
            storage.count_index_entries(site.id).unwrap(),
            storage.get_lemma(site.id, "кот").unwrap(),
        )
    };
    let before = counts(&storage);

    let again = crawler.crawl_site(&site, &seed(&site), no_stop()).await.unwrap();
    assert_eq!(again.status, SiteStatus::Indexed);
    assert_eq!(again.tally.succeeded, 0);
    assert_eq!(again.tally.skipped, 1);
    assert_eq!(counts(&storage), before);
}

#[tokio::test]
async fn test_links_are_followed_within_site() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    mount_page(
        &mock_server,
        "/",
        &format!(
            r#"<a href="/news">Новости</a>
               <a href="{}/news/">Снова новости</a>
               <a href="/photo.png">Фото</a>
               <a href="/news?page=2">Дальше</a>
               <a href="https://other.example/">Чужой сайт</a>"#,
            base_url
        ),
    )
    .await;
    mount_page(&mock_server, "/news", "Свежие новости").await;
    mount_page(&mock_server, "/news/", "Свежие новости").await;
    Mock::given(method("GET"))
        .and(path("/photo.png"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&mock_server)
        .await;

    let (crawler, storage, site) = create_crawler(&base_url);
    let result = crawler.crawl_site(&site, &seed(&site), no_stop()).await.unwrap();
    assert_eq!(result.tally.succeeded, 2);

    let mut paths = storage::lock(&storage).list_page_paths(site.id).unwrap();
    paths.sort();
    assert_eq!(paths, vec!["/".to_string(), "/news".to_string()]);

    // "/news" and "/news/" share a path, so only one of them is fetched
    let news_requests = requested_paths(&mock_server)
        .await
        .into_iter()
        .filter(|p| p.starts_with("/news"))
        .count();
    assert_eq!(news_requests, 1);
}

#[tokio::test]
async fn test_directory_pages_keep_their_trailing_slash() {
    let mock_server = MockServer::start().await;
    mount_page(&mock_server, "/", r#"<a href="/docs/">Документация</a>"#).await;
    mount_page(
        &mock_server,
        "/docs/",
        r#"Документация <a href="intro">Введение</a>"#,
    )
    .await;
    mount_page(&mock_server, "/docs/intro", "Введение в систему").await;

    let (crawler, storage, site) = create_crawler(&mock_server.uri());
    let result = crawler.crawl_site(&site, &seed(&site), no_stop()).await.unwrap();
    assert_eq!(result.status, SiteStatus::Indexed);
    assert!(result.tally.errors.is_empty(), "{:?}", result.tally.errors);
    assert_eq!(result.tally.succeeded, 3);

    let mut requested = requested_paths(&mock_server).await;
    requested.sort();
    assert_eq!(requested, vec!["/", "/docs/", "/docs/intro"]);

    let mut paths = storage::lock(&storage).list_page_paths(site.id).unwrap();
    paths.sort();
    assert_eq!(paths, vec!["/", "/docs", "/docs/intro"]);
}

#[tokio::test]
async fn test_crawl_starts_from_configured_seed() {
    let mock_server = MockServer::start().await;
    mount_page(&mock_server, "/blog/", r#"Блог <a href="first">Первая запись</a>"#).await;
    mount_page(&mock_server, "/blog/first", "кот").await;

    let site_url = format!("{}/blog/", mock_server.uri());
    let service = create_service(&create_test_config(&[&site_url], ":memory:"));

    service.start_indexing().await.unwrap();
    let report = service.wait_for_completion().await.unwrap();
    assert_eq!(report.sites[0].status, SiteStatus::Indexed);
    assert_eq!(report.sites[0].site_url, format!("{}/blog", mock_server.uri()));

    let results = service.search("кот", None, 0, None).unwrap();
    assert_eq!(results.results[0].uri, "/first");
}

#[tokio::test]
async fn test_concurrent_merges_keep_frequencies_exact() {
    let mock_server = MockServer::start().await;
    let links: String = (0..24)
        .map(|i| format!(r#"<a href="/page{}">Дальше</a> "#, i))
        .collect();
    mount_page(&mock_server, "/", &links).await;
    for i in 0..24 {
        mount_page(&mock_server, &format!("/page{}", i), "кот и собака").await;
    }

    let (crawler, storage, site) = create_crawler_with_workers(&mock_server.uri(), 8);
    let result = crawler.crawl_site(&site, &seed(&site), no_stop()).await.unwrap();
    assert_eq!(result.tally.succeeded, 25);

    let lemmatizer = Lemmatizer::russian();
    let storage = storage::lock(&storage);
    assert_eq!(storage.count_pages(site.id).unwrap(), 25);
    for word in ["кот", "собака"] {
        let lemma = lemmatizer.lemma_of(word).unwrap();
        let record = storage.get_lemma(site.id, &lemma).unwrap();
        let record = record.unwrap_or_else(|| panic!("{} not indexed", lemma));
        assert_eq!(record.frequency, 24, "document frequency of {}", lemma);
    }
}

#[tokio::test]
async fn test_queued_branches_see_the_stop_flag() {
    let mock_server = MockServer::start().await;
    let links: String = (0..5)
        .map(|i| format!(r#"<a href="/slow{}">Дальше</a> "#, i))
        .collect();
    mount_page(&mock_server, "/", &links).await;
    for i in 0..5 {
        Mock::given(method("GET"))
            .and(path(format!("/slow{}", i)))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(html("кот"))
                    .set_delay(Duration::from_millis(300)),
            )
            .mount(&mock_server)
            .await;
    }

    // One worker: the first child fetches, the other four wait for it
    let (crawler, storage, site) = create_crawler_with_workers(&mock_server.uri(), 1);
    let stop = no_stop();
    let crawl = {
        let stop = Arc::clone(&stop);
        let site = site.clone();
        tokio::spawn(async move { crawler.crawl_site(&site, &seed(&site), stop).await })
    };

    wait_for_requests(&mock_server, 2).await;
    stop.store(true, Ordering::SeqCst);

    let result = crawl.await.unwrap().unwrap();
    assert_eq!(result.status, SiteStatus::Failed);
    assert_eq!(result.last_error.as_deref(), Some(STOPPED_MESSAGE));
    assert_eq!(requested_paths(&mock_server).await.len(), 2);
    assert_eq!(storage::lock(&storage).count_pages(site.id).unwrap(), 2);
}

#[tokio::test]
async fn test_partial_failures_keep_site_indexed() {
    let mock_server = MockServer::start().await;
    mount_page(&mock_server, "/", r#"кот <a href="/broken">Сломано</a>"#).await;
    Mock::given(method("GET"))
        .and(path("/broken"))
        .respond_with(ResponseTemplate::new(404).set_body_string("кот кот кот кот"))
        .mount(&mock_server)
        .await;

    let (crawler, storage, site) = create_crawler(&mock_server.uri());
    let result = crawler.crawl_site(&site, &seed(&site), no_stop()).await.unwrap();
    assert_eq!(result.status, SiteStatus::Indexed);
    assert_eq!(result.tally.errors.len(), 1);

    let storage = storage::lock(&storage);
    let broken = storage.get_page_by_path(site.id, "/broken").unwrap().unwrap();
    assert_eq!(broken.code, 404);
    assert!(broken.content.is_empty());
    assert_eq!(storage.get_lemma(site.id, "кот").unwrap().unwrap().frequency, 1);
}

#[tokio::test]
async fn test_failed_site_is_not_searchable() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&mock_server)
        .await;

    let site_url = mock_server.uri();
    let service = create_service(&create_test_config(&[&site_url], ":memory:"));

    service.start_indexing().await.unwrap();
    let report = service.wait_for_completion().await.unwrap();
    assert_eq!(report.sites.len(), 1);
    assert_eq!(report.sites[0].status, SiteStatus::Failed);

    let stats = service.statistics().unwrap();
    let site = &stats.detailed[0];
    assert_eq!(site.status, SiteStatus::Failed);
    let error = site.error.clone().unwrap_or_default();
    assert!(!error.is_empty());
    assert!(error.contains("HTTP 500"), "unexpected error: {}", error);

    let result = service.search("кот", Some(&site_url), 0, None);
    assert!(matches!(result, Err(EngineError::SiteNotIndexed { .. })));
}

#[tokio::test]
async fn test_unreachable_site_fails_with_network_error() {
    let service = create_service(&create_test_config(&["http://127.0.0.1:9"], ":memory:"));

    service.start_indexing().await.unwrap();
    let report = service.wait_for_completion().await.unwrap();

    let error = report.sites[0].last_error.clone().unwrap_or_default();
    assert_eq!(report.sites[0].status, SiteStatus::Failed);
    assert!(error.starts_with("Network unavailable"), "unexpected error: {}", error);
}

#[tokio::test]
async fn test_global_search_orders_across_sites() {
    let first = MockServer::start().await;
    mount_page(
        &first,
        "/",
        r#"<a href="/two">Два</a> <a href="/five">Пять</a>"#,
    )
    .await;
    mount_page(&first, "/two", "кот кот").await;
    mount_page(&first, "/five", "кот кот кот кот кот").await;

    let second = MockServer::start().await;
    mount_page(&second, "/", "кот кот кот").await;

    let first_url = first.uri();
    let second_url = second.uri();
    let service = create_service(&create_test_config(&[&first_url, &second_url], ":memory:"));

    service.start_indexing().await.unwrap();
    let report = service.wait_for_completion().await.unwrap();
    assert_eq!(report.indexed(), 2);

    let results = service.search("коты", None, 0, None).unwrap();
    assert_eq!(results.count, 3);

    let order: Vec<(String, String, f64)> = results
        .results
        .iter()
        .map(|r| (r.site.clone(), r.uri.clone(), r.relevance))
        .collect();
    assert_eq!(
        order,
        vec![
            (first_url.clone(), "/five".to_string(), 1.0),
            (second_url.clone(), "/".to_string(), 0.6),
            (first_url.clone(), "/two".to_string(), 0.4),
        ]
    );
    assert!(results.results[0].snippet.contains("<b>кот</b>"));
    assert_eq!(results.results[1].site_name, "Site 2");

    let scoped = service.search("кот", Some(&second_url), 0, None).unwrap();
    assert_eq!(scoped.count, 1);
    assert_eq!(scoped.results[0].relevance, 1.0);
}

#[tokio::test]
async fn test_start_and_stop_conflicts() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(html(r#"кот <a href="/next">Дальше</a>"#))
                .set_delay(Duration::from_millis(300)),
        )
        .mount(&mock_server)
        .await;
    mount_page(&mock_server, "/next", "пес").await;

    let site_url = mock_server.uri();
    let service = create_service(&create_test_config(&[&site_url], ":memory:"));

    assert!(matches!(service.stop_indexing(), Err(EngineError::NotRunning)));
    assert!(service.wait_for_completion().await.is_none());

    service.start_indexing().await.unwrap();
    assert!(service.is_indexing());
    assert!(matches!(
        service.start_indexing().await,
        Err(EngineError::AlreadyRunning)
    ));
    assert!(matches!(
        service.index_page(&format!("{}/next", site_url)).await,
        Err(EngineError::AlreadyRunning)
    ));
    assert!(service.statistics().unwrap().total.indexing);

    service.stop_indexing().unwrap();
    assert!(matches!(service.stop_indexing(), Err(EngineError::NotRunning)));

    let report = service.wait_for_completion().await.unwrap();
    assert_eq!(report.sites[0].status, SiteStatus::Failed);
    assert_eq!(report.sites[0].last_error.as_deref(), Some(STOPPED_MESSAGE));
    assert!(!service.is_indexing());
    assert!(matches!(service.stop_indexing(), Err(EngineError::NotRunning)));

    // The stopped root never spawned its child
    let stats = service.statistics().unwrap();
    assert_eq!(stats.detailed[0].pages, 1);
}

#[tokio::test]
async fn test_index_page_is_repeatable() {
    let mock_server = MockServer::start().await;
    mount_page(&mock_server, "/cats", "кот кот дом").await;

    let site_url = mock_server.uri();
    let service = create_service(&create_test_config(&[&site_url], ":memory:"));
    let page_url = format!("{}/cats", site_url);

    service.index_page(&page_url).await.unwrap();
    let first = service.statistics().unwrap();

    service.index_page(&page_url).await.unwrap();
    let second = service.statistics().unwrap();

    let counts = |site: &lemma_search::output::SiteStatistics| {
        (site.pages, site.lemmas, site.index_entries)
    };
    assert_eq!(counts(&first.detailed[0]), (1, 2, 2));
    assert_eq!(counts(&second.detailed[0]), counts(&first.detailed[0]));
    assert_eq!(second.detailed[0].status, SiteStatus::Indexed);

    let results = service.search("кот", None, 0, None).unwrap();
    assert_eq!(results.count, 1);
    assert_eq!(results.results[0].uri, "/cats");
}

#[tokio::test]
async fn test_start_is_rejected_during_page_reindex() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/slow"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(html("кот"))
                .set_delay(Duration::from_millis(300)),
        )
        .mount(&mock_server)
        .await;

    let site_url = mock_server.uri();
    let service = Arc::new(create_service(&create_test_config(&[&site_url], ":memory:")));
    let reindex = {
        let service = Arc::clone(&service);
        let page_url = format!("{}/slow", site_url);
        tokio::spawn(async move { service.index_page(&page_url).await })
    };

    wait_for_requests(&mock_server, 1).await;
    assert!(matches!(
        service.start_indexing().await,
        Err(EngineError::AlreadyRunning)
    ));

    reindex.await.unwrap().unwrap();
    let stats = service.statistics().unwrap();
    assert_eq!(stats.detailed[0].pages, 1);
    assert!(!stats.total.indexing);
}

#[tokio::test]
async fn test_index_page_outside_configured_sites() {
    let mock_server = MockServer::start().await;
    let service = create_service(&create_test_config(&[&mock_server.uri()], ":memory:"));

    let result = service.index_page("https://elsewhere.example/page").await;
    assert!(matches!(result, Err(EngineError::SiteNotConfigured { .. })));
}

#[tokio::test]
async fn test_index_page_reports_unavailable_content() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/gone"))
        .respond_with(ResponseTemplate::new(410))
        .mount(&mock_server)
        .await;

    let service = create_service(&create_test_config(&[&mock_server.uri()], ":memory:"));
    let result = service
        .index_page(&format!("{}/gone", mock_server.uri()))
        .await;
    assert!(matches!(
        result,
        Err(EngineError::ContentUnavailable { status: 410 })
    ));
}

#[test]
fn test_interrupted_sites_are_reconciled() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("index.db");

    {
        let mut storage = SqliteStorage::new(&db_path).unwrap();
        storage
            .insert_or_get_site("https://example.com", "Example", SiteStatus::Indexing)
            .unwrap();
    }

    let config = create_test_config(&["https://example.com"], db_path.to_str().unwrap());
    let service = IndexingService::new(&config).unwrap();

    let stats = service.statistics().unwrap();
    assert_eq!(stats.detailed[0].status, SiteStatus::Failed);
    assert_eq!(stats.detailed[0].error.as_deref(), Some(INTERRUPTED_MESSAGE));
}
