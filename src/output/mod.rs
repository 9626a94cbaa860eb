//! Output module for reporting on the index
//!
//! This module handles:
//! - Gathering per-site and total index statistics
//! - Rendering them for the console

pub mod stats;

pub use stats::{load_statistics, print_statistics, IndexStatistics, SiteStatistics, TotalStatistics};
