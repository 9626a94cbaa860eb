//! URL handling module for Lemma-Search
//!
//! This module canonicalizes site URLs, maps page URLs to site-relative paths,
//! and decides which discovered links the crawler should follow.

mod domain;
mod normalize;

pub use domain::site_authority;
pub use normalize::{fetch_target, normalize_site_url, page_url, parse_http_url, site_path};

use url::Url;

/// File extensions that never point at an HTML document
const NON_DOCUMENT_EXTENSIONS: &[&str] = &[
    // images
    "jpg", "jpeg", "png", "gif", "bmp", "svg", "webp", "ico", "tif", "tiff", "eps",
    // archives
    "zip", "rar", "7z", "tar", "gz", "bz2", "xz",
    // audio / video
    "mp3", "wav", "ogg", "flac", "mp4", "avi", "mov", "mkv", "webm", "wmv",
    // documents
    "pdf", "doc", "docx", "xls", "xlsx", "ppt", "pptx", "odt", "ods", "rtf", "txt", "csv",
    // assets and binaries
    "css", "js", "json", "xml", "exe", "apk", "dmg", "iso", "woff", "woff2", "ttf",
];

/// Decides whether a discovered link should become a new crawl branch
///
/// A link is followed only when:
/// 1. it carries no query (`?`) and no fragment (`#`) marker
/// 2. it belongs to the same site (authority and path prefix)
/// 3. its last path segment has no known non-document extension
///
/// # Examples
///
/// ```
/// use lemma_search::url::is_followable_link;
///
/// assert!(is_followable_link("https://example.com", "https://www.example.com/news"));
/// assert!(!is_followable_link("https://example.com", "https://example.com/photo.JPG"));
/// assert!(!is_followable_link("https://example.com", "https://example.com/?page=2"));
/// assert!(!is_followable_link("https://example.com", "https://other.com/news"));
/// ```
pub fn is_followable_link(site_url: &str, link: &str) -> bool {
    if link.contains('?') || link.contains('#') {
        return false;
    }

    let Ok(url) = parse_http_url(link) else {
        return false;
    };

    if site_path(site_url, &url).is_none() {
        return false;
    }

    !has_non_document_extension(&url)
}

/// Returns true when the URL's last path segment ends with a non-document extension
fn has_non_document_extension(url: &Url) -> bool {
    let last_segment = url
        .path_segments()
        .and_then(|mut segments| segments.next_back())
        .unwrap_or("");

    match last_segment.rsplit_once('.') {
        Some((_, ext)) => NON_DOCUMENT_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()),
        None => false,
    }
}
