use crate::{UrlError, UrlResult};
use url::Url;

/// Extracts the domain from a parsed URL
///
/// This function retrieves the host portion of a URL and converts it to lowercase.
/// If the URL has no host (e.g. `mailto:` or `data:` URLs), it returns None.
///
/// # Examples
///
/// ```
/// use url::Url;
/// use fanout_crawler::url::extract_domain;
///
/// let url = Url::parse("https://EXAMPLE.COM/path").unwrap();
/// assert_eq!(extract_domain(&url), Some("example.com".to_string()));
/// ```
pub fn extract_domain(url: &Url) -> Option<String> {
    url.host_str().map(|h| h.to_lowercase())
}

/// Parses a URL string and returns its lowercase host
///
/// This is the admission key for per-host concurrency limits: two URLs
/// share a slot pool exactly when their hosts are equal. The port is not
/// part of the key.
///
/// # Errors
///
/// * `UrlError::Parse` - The string is not an absolute URL
/// * `UrlError::MissingHost` - The URL has no host component
///
/// # Examples
///
/// ```
/// use fanout_crawler::url::extract_host;
///
/// assert_eq!(extract_host("https://Sub.Example.com:8080/a?b=c").unwrap(), "sub.example.com");
/// assert!(extract_host("not a url").is_err());
/// ```
pub fn extract_host(url: &str) -> UrlResult<String> {
    let parsed = Url::parse(url).map_err(|source| UrlError::Parse {
        url: url.to_string(),
        source,
    })?;

    extract_domain(&parsed).ok_or_else(|| UrlError::MissingHost(url.to_string()))
}
