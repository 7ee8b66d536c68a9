//! URL normalization and sanitization utilities.
//!
//! Two inputs that point at the same resource must normalize to the same string,
//! because the normalized form is half of the link deduplication key.

use url::Url;

/// Errors that can occur during URL normalization.
#[derive(Debug, thiserror::Error)]
pub enum UrlNormalizationError {
    #[error("URL must not be empty")]
    Empty,

    #[error("Invalid URL format: {0}")]
    InvalidFormat(String),

    #[error("Only HTTP and HTTPS protocols are allowed")]
    UnsupportedProtocol,

    #[error("URL must have a host")]
    MissingHost,

    #[error("Failed to normalize URL: {0}")]
    NormalizationFailed(String),
}

/// Normalizes a URL to a canonical form.
///
/// # Normalization Rules
///
/// 1. **Protocol**: Only HTTP and HTTPS are allowed, lowercased
/// 2. **Hostname**: Converted to lowercase
/// 3. **Default ports**: Removed (80 for HTTP, 443 for HTTPS)
/// 4. **Fragments**: Removed (e.g., `#section`)
/// 5. **Query parameters**: Raw segments sorted by key, then value, without
///    re-encoding; empty segments and an empty query are dropped
/// 6. **Path**: Case preserved, trailing slash removed except for the root
///
/// # Security
///
/// Rejects potentially dangerous protocols like `javascript:`, `data:`, `file:`, etc.
///
/// # Errors
///
/// Returns [`UrlNormalizationError::Empty`] for blank input.
/// Returns [`UrlNormalizationError::InvalidFormat`] for malformed URLs.
/// Returns [`UrlNormalizationError::UnsupportedProtocol`] for non-HTTP(S) schemes.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(
///     normalize_url("HTTPS://EXAMPLE.COM:443/Path/?b=2&a=1#top").unwrap(),
///     "https://example.com/Path?a=1&b=2"
/// );
/// ```
pub fn normalize_url(input: &str) -> Result<String, UrlNormalizationError> {
    let input = input.trim();
    if input.is_empty() {
        return Err(UrlNormalizationError::Empty);
    }

    let mut url =
        Url::parse(input).map_err(|e| UrlNormalizationError::InvalidFormat(e.to_string()))?;

    match url.scheme() {
        "http" | "https" => {}
        _ => return Err(UrlNormalizationError::UnsupportedProtocol),
    }

    let host = url
        .host_str()
        .filter(|h| !h.is_empty())
        .ok_or(UrlNormalizationError::MissingHost)?
        .to_ascii_lowercase();
    url.set_host(Some(&host)).map_err(|_| {
        UrlNormalizationError::NormalizationFailed("Failed to set normalized host".to_string())
    })?;

    url.set_fragment(None);

    let is_default_port = matches!(
        (url.scheme(), url.port()),
        ("http", Some(80)) | ("https", Some(443))
    );
    if is_default_port {
        url.set_port(None).map_err(|_| {
            UrlNormalizationError::NormalizationFailed("Failed to remove default port".to_string())
        })?;
    }

    let path = url.path();
    if path.len() > 1 && path.ends_with('/') {
        let trimmed = path.trim_end_matches('/');
        let trimmed = if trimmed.is_empty() { "/" } else { trimmed }.to_string();
        url.set_path(&trimmed);
    }

    let query = url.query().map(sort_query_segments).unwrap_or_default();
    if query.is_empty() {
        url.set_query(None);
    } else {
        url.set_query(Some(&query));
    }

    Ok(url.to_string())
}

/// Orders the raw `&`-separated segments by key, then value.
///
/// Segments are compared as written, so percent-escapes, bare flags and `=`
/// inside values survive unchanged.
fn sort_query_segments(query: &str) -> String {
    let mut segments: Vec<&str> = query.split('&').filter(|s| !s.is_empty()).collect();
    segments.sort_by(|a, b| split_segment(a).cmp(&split_segment(b)));
    segments.join("&")
}

fn split_segment(segment: &str) -> (&str, &str) {
    segment.split_once('=').unwrap_or((segment, ""))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_simple_https() {
        assert_eq!(normalize_url("https://example.com").unwrap(), "https://example.com/");
    }

    #[test]
    fn test_normalize_uppercase_scheme_and_host() {
        assert_eq!(
            normalize_url("HTTPS://EXAMPLE.COM/Path").unwrap(),
            "https://example.com/Path"
        );
    }

    #[test]
    fn test_normalize_remove_default_ports() {
        assert_eq!(
            normalize_url("http://example.com:80/path").unwrap(),
            "http://example.com/path"
        );
        assert_eq!(
            normalize_url("https://example.com:443/path").unwrap(),
            "https://example.com/path"
        );
    }

    #[test]
    fn test_normalize_keep_custom_port() {
        assert_eq!(
            normalize_url("http://localhost:3000/test").unwrap(),
            "http://localhost:3000/test"
        );
    }

    #[test]
    fn test_normalize_remove_fragment() {
        assert_eq!(
            normalize_url("https://example.com/page?key=value#section").unwrap(),
            "https://example.com/page?key=value"
        );
    }

    #[test]
    fn test_normalize_sorts_query_pairs() {
        let a = normalize_url("https://example.com/a?z=1&y=2").unwrap();
        let b = normalize_url("https://example.com/a?y=2&z=1").unwrap();

        assert_eq!(a, "https://example.com/a?y=2&z=1");
        assert_eq!(a, b);
    }

    #[test]
    fn test_normalize_keeps_query_segments_verbatim() {
        for input in [
            "https://x.com/p?flag",
            "https://x.com/p?q=a%20b",
            "https://x.com/p?a=b=c",
            "https://x.com/p?t=a:b",
            "https://x.com/p?q=a+b",
        ] {
            assert_eq!(normalize_url(input).unwrap(), input);
        }
    }

    #[test]
    fn test_normalize_sorts_raw_segments() {
        assert_eq!(
            normalize_url("https://x.com/p?z=1&&flag&a=b=c&q=a%20b").unwrap(),
            "https://x.com/p?a=b=c&flag&q=a%20b&z=1"
        );
        assert_eq!(
            normalize_url("https://x.com/p?k=2&k=1&k").unwrap(),
            "https://x.com/p?k&k=1&k=2"
        );
    }

    #[test]
    fn test_normalize_drops_empty_query() {
        assert_eq!(
            normalize_url("https://example.com/a?").unwrap(),
            "https://example.com/a"
        );
    }

    #[test]
    fn test_normalize_trailing_slash() {
        assert_eq!(
            normalize_url("https://example.com/docs/").unwrap(),
            "https://example.com/docs"
        );
        assert_eq!(normalize_url("https://example.com/").unwrap(), "https://example.com/");
    }

    #[test]
    fn test_normalize_preserves_path_case_and_encoding() {
        assert_eq!(
            normalize_url("https://example.com/Path%20With%20Spaces").unwrap(),
            "https://example.com/Path%20With%20Spaces"
        );
    }

    #[test]
    fn test_normalize_rejects_blank() {
        assert!(matches!(normalize_url(""), Err(UrlNormalizationError::Empty)));
        assert!(matches!(normalize_url("   "), Err(UrlNormalizationError::Empty)));
    }

    #[test]
    fn test_normalize_rejects_malformed() {
        assert!(matches!(
            normalize_url("not a valid url"),
            Err(UrlNormalizationError::InvalidFormat(_))
        ));
        assert!(matches!(
            normalize_url("example.com"),
            Err(UrlNormalizationError::InvalidFormat(_))
        ));
    }

    #[test]
    fn test_normalize_rejects_unsafe_protocols() {
        for input in [
            "javascript:alert('xss')",
            "data:text/plain,Hello",
            "ftp://example.com/file.txt",
            "file:///etc/passwd",
            "mailto:test@example.com",
        ] {
            assert!(
                matches!(normalize_url(input), Err(UrlNormalizationError::UnsupportedProtocol)),
                "{input} should be rejected"
            );
        }
    }
}
