//! Crawler module for page discovery and indexing
//!
//! This module contains the core crawling logic, including:
//! - HTTP fetching through a pluggable [`Fetcher`]
//! - HTML parsing and link extraction
//! - The recursive, worker-bounded branch tree
//! - Per-site coordination and the run-wide [`CrawlSupervisor`]

mod branch;
mod coordinator;
mod fetcher;
mod indexer;
mod parser;
mod supervisor;

pub use branch::CrawlTally;
pub use coordinator::{Crawler, SiteCrawlResult};
pub use fetcher::{build_http_client, fetch_url, FetchResult, Fetcher, HttpFetcher};
pub use indexer::{CrawlOutcome, IndexedPage, PageIndexer, STOPPED_MESSAGE};
pub use parser::{parse_html, ParsedPage};
pub use supervisor::{CrawlReport, CrawlSupervisor};
