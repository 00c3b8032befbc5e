use thiserror::Error;
use url::Url;

/// Errors produced when a configured feed URL fails validation.
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("URL could not be parsed: {0}")]
    Parse(#[from] url::ParseError),

    #[error("unsupported URL scheme '{0}': only http and https are allowed")]
    UnsupportedScheme(String),

    #[error("URL has no host")]
    MissingHost,
}

/// Validates a configured feed URL before it is fetched.
///
/// Sources come from the operator's own config file, so this is hygiene
/// rather than a security boundary: the URL must parse, use http or https,
/// and name a host. Anything else becomes a per-source failure instead of a
/// confusing fetch error.
pub fn validate_url(raw: &str) -> Result<Url, UrlError> {
    let url = Url::parse(raw)?;

    match url.scheme() {
        "http" | "https" => {}
        other => return Err(UrlError::UnsupportedScheme(other.to_string())),
    }

    if url.host_str().is_none() {
        return Err(UrlError::MissingHost);
    }

    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_https() {
        let url = validate_url("https://example.com/feed.xml").unwrap();
        assert_eq!(url.host_str(), Some("example.com"));
    }

    #[test]
    fn test_accepts_http_with_port_and_query() {
        let url = validate_url("http://example.com:8080/rss?format=xml").unwrap();
        assert_eq!(url.port(), Some(8080));
    }

    #[test]
    fn test_rejects_file_scheme() {
        let err = validate_url("file:///etc/passwd").unwrap_err();
        assert!(matches!(err, UrlError::UnsupportedScheme(s) if s == "file"));
    }

    #[test]
    fn test_rejects_ftp_scheme() {
        assert!(matches!(
            validate_url("ftp://example.com/feed"),
            Err(UrlError::UnsupportedScheme(_))
        ));
    }

    #[test]
    fn test_rejects_empty_string() {
        assert!(matches!(validate_url(""), Err(UrlError::Parse(_))));
    }

    #[test]
    fn test_rejects_relative_url() {
        assert!(matches!(validate_url("/feed.xml"), Err(UrlError::Parse(_))));
    }
}
