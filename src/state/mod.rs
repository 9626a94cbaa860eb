//! State module for tracking indexing progress
//!
//! # Components
//!
//! - `SiteStatus`: lifecycle of a site's index (indexing, indexed, failed)

mod site_status;

pub use site_status::SiteStatus;
