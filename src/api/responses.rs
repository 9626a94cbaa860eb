//! Structured responses of the operator-facing API
//!
//! Every failure is reported as `{"ok": false, "error": "..."}`.

use crate::output::IndexStatistics;
use crate::search::{SearchResult, SearchResults};
use crate::EngineError;
use serde::Serialize;

/// Response of commands without a payload
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ApiResponse {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ApiResponse {
    pub fn success() -> Self {
        Self {
            ok: true,
            error: None,
        }
    }

    pub fn failure(error: &EngineError) -> Self {
        Self {
            ok: false,
            error: Some(error.to_string()),
        }
    }
}

impl From<Result<(), EngineError>> for ApiResponse {
    fn from(result: Result<(), EngineError>) -> Self {
        match result {
            Ok(()) => Self::success(),
            Err(e) => Self::failure(&e),
        }
    }
}

/// Response of a search
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchResponse {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub results: Option<Vec<SearchResult>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<Result<SearchResults, EngineError>> for SearchResponse {
    fn from(result: Result<SearchResults, EngineError>) -> Self {
        match result {
            Ok(results) => Self {
                ok: true,
                count: Some(results.count),
                results: Some(results.results),
                error: None,
            },
            Err(e) => Self {
                ok: false,
                count: None,
                results: None,
                error: Some(e.to_string()),
            },
        }
    }
}

/// Response of a statistics request
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatisticsResponse {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub statistics: Option<IndexStatistics>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<Result<IndexStatistics, EngineError>> for StatisticsResponse {
    fn from(result: Result<IndexStatistics, EngineError>) -> Self {
        match result {
            Ok(statistics) => Self {
                ok: true,
                statistics: Some(statistics),
                error: None,
            },
            Err(e) => Self {
                ok: false,
                statistics: None,
                error: Some(e.to_string()),
            },
        }
    }
}
