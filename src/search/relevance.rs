//! Relevance scoring
//!
//! A page's absolute relevance is the sum of the ranks of its index rows for
//! the query lemmas. Normalization divides by the largest absolute relevance
//! seen in the current [`RelevanceSession`]; one session spans one search
//! call, across every site it touches.

use crate::storage::IndexRecord;

/// Running maximum of absolute relevance for one search call
#[derive(Debug, Default, Clone, PartialEq)]
pub struct RelevanceSession {
    max: f64,
}

impl RelevanceSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Scores a page from its index rows and updates the running maximum
    ///
    /// # Returns
    ///
    /// The page's absolute relevance
    pub fn score(&mut self, entries: &[IndexRecord]) -> f64 {
        let absolute: f64 = entries.iter().map(|entry| entry.rank).sum();
        if absolute > self.max {
            self.max = absolute;
        }
        absolute
    }

    /// The largest absolute relevance scored so far
    pub fn max(&self) -> f64 {
        self.max
    }

    /// Normalizes an absolute relevance into (0, 1]
    ///
    /// The page holding the maximum gets exactly 1.0.
    pub fn normalize(&self, absolute: f64) -> f64 {
        if self.max <= 0.0 {
            return 0.0;
        }
        absolute / self.max
    }
}
