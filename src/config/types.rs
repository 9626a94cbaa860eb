use serde::Deserialize;

/// Main configuration structure for Lemma-Search
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub crawler: CrawlerConfig,
    #[serde(rename = "user-agent")]
    pub user_agent: UserAgentConfig,
    pub database: DatabaseConfig,
    #[serde(default)]
    pub lemmatizer: LemmatizerConfig,
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub sites: Vec<SiteEntry>,
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlerConfig {
    /// Delay before every fetch (milliseconds)
    #[serde(rename = "request-delay", default = "default_request_delay")]
    pub request_delay: u64,

    /// Size of the crawl worker pool; 0 means available parallelism
    #[serde(default)]
    pub workers: usize,

    /// Per-fetch network timeout (seconds)
    #[serde(default = "default_timeout")]
    pub timeout: u64,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            request_delay: default_request_delay(),
            workers: 0,
            timeout: default_timeout(),
        }
    }
}

impl CrawlerConfig {
    /// Returns the effective worker pool size
    pub fn worker_count(&self) -> usize {
        if self.workers > 0 {
            return self.workers;
        }
        std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1)
    }
}

fn default_request_delay() -> u64 {
    500
}

fn default_timeout() -> u64 {
    30
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
pub struct UserAgentConfig {
    /// Name of the crawler
    pub name: String,

    /// Version of the crawler
    pub version: String,

    /// Referrer sent with every request
    #[serde(default)]
    pub referrer: Option<String>,
}

/// Database configuration
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Path to the SQLite database file
    pub path: String,
}

/// Lemmatizer configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LemmatizerConfig {
    /// Optional "form<TAB>lemma" dictionary consulted before stemming
    #[serde(default)]
    pub dictionary: Option<String>,
}

/// Search configuration
#[derive(Debug, Clone, Deserialize)]
pub struct SearchConfig {
    #[serde(rename = "default-limit", default = "default_limit")]
    pub default_limit: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            default_limit: default_limit(),
        }
    }
}

fn default_limit() -> usize {
    20
}

/// A site seed to crawl
#[derive(Debug, Clone, Deserialize)]
pub struct SiteEntry {
    /// Human-readable site name
    pub name: String,

    /// Root URL of the site
    pub url: String,
}
