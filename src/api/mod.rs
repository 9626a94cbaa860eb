//! Operator-facing API
//!
//! [`IndexingService`] exposes the five operations an outer surface (the
//! CLI here) needs: start and stop a full indexing run, re-index one page,
//! search, and statistics. The `responses` types turn their results into
//! `{ok, error}`-shaped JSON values.

mod responses;
mod service;

pub use responses::{ApiResponse, SearchResponse, StatisticsResponse};
pub use service::{IndexingService, INTERRUPTED_MESSAGE};
