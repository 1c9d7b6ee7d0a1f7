//! Target URL resolution: the inbound request path encodes the destination.

use std::borrow::Cow;

use url::Url;

use crate::error::TargetUrlError;

/// Turn an inbound request path (and its raw query string) into a
/// fully-qualified destination URL.
///
/// The path minus its leading `/` is the destination. Explicit `https://`
/// and `http://` prefixes pass through; the degenerate single-slash forms
/// `https:/...` and `http:/...` are corrected; anything else defaults to
/// `https://`. The inbound query string is authoritative and replaces
/// whatever query text the path may have carried.
///
/// # Examples
/// ```
/// use mirrorgate::resolve_target;
///
/// let url = resolve_target("/example.com/path", None).unwrap();
/// assert_eq!(url.as_str(), "https://example.com/path");
/// ```
pub fn resolve_target(path: &str, raw_query: Option<&str>) -> Result<Url, TargetUrlError> {
    let path = path.strip_prefix('/').unwrap_or(path);
    if path.is_empty() {
        return Err(TargetUrlError::EmptyPath);
    }

    let candidate: Cow<'_, str> = if path.starts_with("https://") || path.starts_with("http://") {
        Cow::Borrowed(path)
    } else if let Some(rest) = path.strip_prefix("https:/") {
        Cow::Owned(format!("https://{rest}"))
    } else if let Some(rest) = path.strip_prefix("http:/") {
        Cow::Owned(format!("http://{rest}"))
    } else {
        Cow::Owned(format!("https://{path}"))
    };

    let mut url = Url::parse(&candidate)?;

    if url.scheme().is_empty() {
        return Err(TargetUrlError::MissingScheme);
    }
    if url.host_str().map_or(true, str::is_empty) {
        return Err(TargetUrlError::MissingHost);
    }

    // The inbound query wins over any query embedded in the path.
    url.set_query(raw_query);

    if url.path().is_empty() {
        url.set_path("/");
    }

    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_https_url() {
        let url = resolve_target("/https://example.com/path", None).unwrap();
        assert_eq!(url.as_str(), "https://example.com/path");
    }

    #[test]
    fn test_single_slash_https() {
        let url = resolve_target("/https:/example.com/path", None).unwrap();
        assert_eq!(url.as_str(), "https://example.com/path");
    }

    #[test]
    fn test_full_http_url() {
        let url = resolve_target("/http://example.com/path", None).unwrap();
        assert_eq!(url.as_str(), "http://example.com/path");
        assert_eq!(url.scheme(), "http");
    }

    #[test]
    fn test_single_slash_http() {
        let url = resolve_target("/http:/example.com/path", None).unwrap();
        assert_eq!(url.as_str(), "http://example.com/path");
    }

    #[test]
    fn test_no_scheme_defaults_to_https() {
        let url = resolve_target("/example.com/path", None).unwrap();
        assert_eq!(url.scheme(), "https");
        assert_eq!(url.as_str(), "https://example.com/path");
    }

    #[test]
    fn test_inbound_query_is_authoritative() {
        let url = resolve_target("/example.com/path", Some("param=value")).unwrap();
        assert_eq!(url.query(), Some("param=value"));
        assert_eq!(url.as_str(), "https://example.com/path?param=value");
    }

    #[test]
    fn test_inbound_query_replaces_embedded_query() {
        let url = resolve_target("/https://example.com/path%3Fold=1", Some("new=2")).unwrap();
        assert_eq!(url.query(), Some("new=2"));
    }

    #[test]
    fn test_bare_host_gets_root_path() {
        let url = resolve_target("/example.com", None).unwrap();
        assert_eq!(url.path(), "/");
    }

    #[test]
    fn test_host_with_port_preserved() {
        let url = resolve_target("/http://127.0.0.1:8081/r", None).unwrap();
        assert_eq!(url.host_str(), Some("127.0.0.1"));
        assert_eq!(url.port(), Some(8081));
    }

    #[test]
    fn test_empty_path_rejected() {
        assert!(matches!(
            resolve_target("/", None),
            Err(TargetUrlError::EmptyPath)
        ));
        assert!(matches!(
            resolve_target("", None),
            Err(TargetUrlError::EmptyPath)
        ));
    }

    #[test]
    fn test_unparseable_target_rejected() {
        assert!(resolve_target("/https://exa mple.com/", None).is_err());
    }
}
