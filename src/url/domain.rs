use url::Url;

/// Extracts the site authority from a URL
///
/// The authority is the lowercase host with any leading `www.` removed,
/// followed by `:port` when the URL carries a non-default port. Two URLs
/// belong to the same site exactly when their authorities are equal.
///
/// # Examples
///
/// ```
/// use url::Url;
/// use lemma_search::url::site_authority;
///
/// let url = Url::parse("https://WWW.Example.com/path").unwrap();
/// assert_eq!(site_authority(&url), Some("example.com".to_string()));
///
/// let url = Url::parse("http://127.0.0.1:8080/").unwrap();
/// assert_eq!(site_authority(&url), Some("127.0.0.1:8080".to_string()));
/// ```
pub fn site_authority(url: &Url) -> Option<String> {
    let host = url.host_str()?.to_lowercase();
    let host = host.strip_prefix("www.").unwrap_or(&host);

    Some(match url.port() {
        Some(port) => format!("{}:{}", host, port),
        None => host.to_string(),
    })
}
