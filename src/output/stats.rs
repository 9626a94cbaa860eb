//! Statistics generation from the index database
//!
//! This module provides functionality for extracting and displaying
//! per-site index statistics from the storage layer.

use crate::state::SiteStatus;
use crate::storage::Storage;
use crate::EngineError;
use serde::Serialize;

/// Totals across every site
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TotalStatistics {
    pub sites: usize,
    pub pages: u64,
    pub lemmas: u64,
    /// Whether a full indexing run is in progress
    pub indexing: bool,
}

/// Statistics of one site
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SiteStatistics {
    pub url: String,
    pub name: String,
    pub status: SiteStatus,
    /// RFC 3339 time of the last status change
    pub status_time: String,
    pub error: Option<String>,
    pub pages: u64,
    pub lemmas: u64,
    pub index_entries: u64,
}

/// Index statistics summary
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct IndexStatistics {
    pub total: TotalStatistics,
    pub detailed: Vec<SiteStatistics>,
}

/// Loads statistics from storage
///
/// # Arguments
///
/// * `storage` - The storage backend to query
/// * `indexing` - Whether a full indexing run is in progress
///
/// # Returns
///
/// * `Ok(IndexStatistics)` - Successfully loaded statistics
/// * `Err(EngineError)` - Failed to query statistics
pub fn load_statistics(storage: &dyn Storage, indexing: bool) -> Result<IndexStatistics, EngineError> {
    let mut stats = IndexStatistics {
        total: TotalStatistics {
            indexing,
            ..Default::default()
        },
        detailed: Vec::new(),
    };

    for site in storage.list_sites()? {
        let pages = storage.count_pages(site.id)?;
        let lemmas = storage.count_lemmas(site.id)?;
        let index_entries = storage.count_index_entries(site.id)?;

        stats.total.sites += 1;
        stats.total.pages += pages;
        stats.total.lemmas += lemmas;

        stats.detailed.push(SiteStatistics {
            url: site.url,
            name: site.name,
            status: site.status,
            status_time: site.status_time,
            error: site.last_error,
            pages,
            lemmas,
            index_entries,
        });
    }

    Ok(stats)
}

/// Prints statistics to stdout in a formatted manner
///
/// # Arguments
///
/// * `stats` - The statistics to display
pub fn print_statistics(stats: &IndexStatistics) {
    println!("=== Index Statistics ===\n");

    println!("Overview:");
    println!("  Sites: {}", stats.total.sites);
    println!("  Pages: {}", stats.total.pages);
    println!("  Lemmas: {}", stats.total.lemmas);
    println!(
        "  Indexing: {}",
        if stats.total.indexing { "running" } else { "idle" }
    );
    println!();

    for site in &stats.detailed {
        println!("{} ({})", site.name, site.url);
        println!("  Status: {} since {}", site.status, site.status_time);
        println!(
            "  Pages: {}, lemmas: {}, index entries: {}",
            site.pages, site.lemmas, site.index_entries
        );
        if let Some(error) = &site.error {
            println!("  Last error: {}", error);
        }
        println!();
    }
}
