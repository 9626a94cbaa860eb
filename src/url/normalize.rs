use crate::url::site_authority;
use crate::UrlError;
use url::Url;

/// Canonicalizes a configured site URL
///
/// # Normalization Steps
///
/// 1. Parse the URL; reject if malformed
/// 2. Accept only HTTP and HTTPS
/// 3. Lowercase the host and remove the `www.` prefix
/// 4. Collapse repeated slashes and drop the trailing slash
/// 5. Drop query and fragment
///
/// The scheme is kept, so the canonical form can be used directly to build
/// page URLs.
///
/// # Examples
///
/// ```
/// use lemma_search::url::normalize_site_url;
///
/// let url = normalize_site_url("https://WWW.EXAMPLE.COM/").unwrap();
/// assert_eq!(url, "https://example.com");
/// ```
pub fn normalize_site_url(url_str: &str) -> Result<String, UrlError> {
    let url = parse_http_url(url_str.trim())?;
    let authority = site_authority(&url).ok_or(UrlError::MissingDomain)?;
    let path = normalize_path(url.path());

    let prefix = if path == "/" { "" } else { path.as_str() };
    Ok(format!("{}://{}{}", url.scheme(), authority, prefix))
}

/// Returns the site-relative path of `url`, or `None` when it lies outside the site
///
/// The path always has a leading slash and never a trailing one (the site root
/// is `/`). Query and fragment are ignored.
///
/// # Examples
///
/// ```
/// use lemma_search::url::site_path;
/// use url::Url;
///
/// let url = Url::parse("https://www.example.com/news/").unwrap();
/// assert_eq!(site_path("https://example.com", &url), Some("/news".to_string()));
///
/// let other = Url::parse("https://other.com/news").unwrap();
/// assert_eq!(site_path("https://example.com", &other), None);
/// ```
pub fn site_path(site_url: &str, url: &Url) -> Option<String> {
    let site = Url::parse(site_url).ok()?;
    if site_authority(&site)? != site_authority(url)? {
        return None;
    }

    let site_prefix = normalize_path(site.path());
    let path = normalize_path(url.path());

    if site_prefix == "/" {
        return Some(path);
    }

    let rest = path.strip_prefix(&site_prefix)?;
    if rest.is_empty() {
        Some("/".to_string())
    } else if rest.starts_with('/') {
        Some(rest.to_string())
    } else {
        // "/blog" must not claim "/blogger"
        None
    }
}

/// Builds the absolute URL of a page from its site URL and site-relative path
pub fn page_url(site_url: &str, path: &str) -> String {
    format!("{}{}", site_url.trim_end_matches('/'), path)
}

/// Returns the URL a page is fetched from: the discovered URL without query
/// or fragment
///
/// The path is kept as written. `/docs` and `/docs/` share a [`site_path`]
/// but may be different resources on the server, so only the dedupe key is
/// normalized, never the request.
pub fn fetch_target(url: &Url) -> Url {
    let mut target = url.clone();
    target.set_query(None);
    target.set_fragment(None);
    target
}

/// Parses a URL and checks it uses an HTTP(S) scheme
pub fn parse_http_url(url_str: &str) -> Result<Url, UrlError> {
    let url = Url::parse(url_str).map_err(|e| UrlError::Parse(e.to_string()))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(format!(
            "Only HTTP and HTTPS schemes are supported, got: {}",
            url.scheme()
        )));
    }

    if url.host_str().is_none() {
        return Err(UrlError::MissingDomain);
    }

    Ok(url)
}

/// Normalizes a URL path by collapsing empty segments and trailing slashes
fn normalize_path(path: &str) -> String {
    let segments: Vec<&str> = path
        .split('/')
        .filter(|segment| !segment.is_empty() && *segment != ".")
        .collect();

    if segments.is_empty() {
        return "/".to_string();
    }

    format!("/{}", segments.join("/"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn test_remove_www() {
        assert_eq!(
            normalize_site_url("https://www.example.com/").unwrap(),
            "https://example.com"
        );
    }

    #[test]
    fn test_keep_scheme() {
        assert_eq!(
            normalize_site_url("http://example.com").unwrap(),
            "http://example.com"
        );
    }

    #[test]
    fn test_keep_port() {
        assert_eq!(
            normalize_site_url("http://127.0.0.1:3000/").unwrap(),
            "http://127.0.0.1:3000"
        );
    }

    #[test]
    fn test_site_with_prefix() {
        assert_eq!(
            normalize_site_url("https://example.com/blog/").unwrap(),
            "https://example.com/blog"
        );
    }

    #[test]
    fn test_drop_query_and_fragment() {
        assert_eq!(
            normalize_site_url("https://example.com/?a=1#top").unwrap(),
            "https://example.com"
        );
    }

    #[test]
    fn test_invalid_scheme() {
        let result = normalize_site_url("ftp://example.com/");
        assert!(matches!(result, Err(UrlError::InvalidScheme(_))));
    }

    #[test]
    fn test_malformed_url() {
        assert!(normalize_site_url("not a url").is_err());
    }

    #[test]
    fn test_fetch_target_keeps_path() {
        assert_eq!(
            fetch_target(&url("https://www.example.com/docs/?a=1#top")).as_str(),
            "https://www.example.com/docs/"
        );
        assert_eq!(
            fetch_target(&url("https://example.com/docs")).as_str(),
            "https://example.com/docs"
        );
        assert_eq!(
            fetch_target(&url("http://127.0.0.1:8080")).as_str(),
            "http://127.0.0.1:8080/"
        );
    }

    #[test]
    fn test_site_path_root() {
        assert_eq!(
            site_path("https://example.com", &url("https://example.com")),
            Some("/".to_string())
        );
        assert_eq!(
            site_path("https://example.com", &url("https://example.com/")),
            Some("/".to_string())
        );
    }

    #[test]
    fn test_site_path_strips_trailing_slash() {
        assert_eq!(
            site_path("https://example.com", &url("https://example.com/a/b/")),
            Some("/a/b".to_string())
        );
    }

    #[test]
    fn test_site_path_collapses_slashes() {
        assert_eq!(
            site_path("https://example.com", &url("https://example.com//a///b")),
            Some("/a/b".to_string())
        );
    }

    #[test]
    fn test_site_path_ignores_www_and_case() {
        assert_eq!(
            site_path("https://example.com", &url("https://WWW.Example.com/page")),
            Some("/page".to_string())
        );
    }

    #[test]
    fn test_site_path_other_domain() {
        assert_eq!(
            site_path("https://example.com", &url("https://sub.example.com/page")),
            None
        );
    }

    #[test]
    fn test_site_path_with_prefix() {
        let site = "https://example.com/blog";
        assert_eq!(
            site_path(site, &url("https://example.com/blog/post")),
            Some("/post".to_string())
        );
        assert_eq!(
            site_path(site, &url("https://example.com/blog")),
            Some("/".to_string())
        );
        assert_eq!(site_path(site, &url("https://example.com/blogger")), None);
        assert_eq!(site_path(site, &url("https://example.com/about")), None);
    }

    #[test]
    fn test_page_url() {
        assert_eq!(page_url("https://example.com", "/a"), "https://example.com/a");
        assert_eq!(page_url("https://example.com", "/"), "https://example.com/");
    }
}
