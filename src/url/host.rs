use crate::UrlError;
use url::Url;

/// Extracts the host component of a URL, lowercased
///
/// The host is used as the admission-control key: all URLs sharing a host
/// compete for the same per-host download slots. Ports are ignored so that
/// `example.com` and `example.com:8080` count against the same budget.
///
/// # Arguments
///
/// * `url` - The URL string to extract the host from
///
/// # Returns
///
/// * `Ok(String)` - The lowercase host
/// * `Err(UrlError)` - The URL is malformed or has no host
///
/// # Examples
///
/// ```
/// use kumo::url::host_of;
///
/// assert_eq!(host_of("https://Example.COM/path").unwrap(), "example.com");
/// assert!(host_of("not a url").is_err());
/// ```
pub fn host_of(url: &str) -> Result<String, UrlError> {
    let parsed = Url::parse(url).map_err(|e| UrlError::Parse(format!("{}: {}", url, e)))?;

    parsed
        .host_str()
        .map(|h| h.to_lowercase())
        .ok_or_else(|| UrlError::MissingHost(url.to_string()))
}
