//! Search module: ranked lemma queries over the index store
//!
//! - `engine`: query planning, page intersection and global ordering
//! - `relevance`: absolute and normalized relevance for one search session
//! - `snippet`: highlighted excerpts of matching pages

mod engine;
mod relevance;
mod snippet;

pub use engine::{SearchEngine, SearchResult, SearchResults};
pub use relevance::RelevanceSession;
pub use snippet::{snippet, SNIPPET_LEAD, SNIPPET_LENGTH};
