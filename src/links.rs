//! Absolute links built from an envelope's access token.

/// Placeholder replaced by the token in a [`SiteLinks`] path.
pub const TOKEN_PLACEHOLDER: &str = "{token}";

/// Maps an access token to an absolute URL.
///
/// Implemented for any `Fn(&str) -> String`, so a closure over the
/// application's router works as well as [`SiteLinks`].
pub trait LinkResolver: Send + Sync {
    fn resolve(&self, token: &str) -> String;
}

impl<F> LinkResolver for F
where
    F: Fn(&str) -> String + Send + Sync,
{
    fn resolve(&self, token: &str) -> String {
        self(token)
    }
}

/// Links of the form `{scheme}://{domain}{path}`, with the token substituted
/// into `path` percent-encoded.
///
/// ```
/// use bulkmail::links::{LinkResolver, SiteLinks};
///
/// let links = SiteLinks::new("example.com", "/acces/{token}");
/// assert_eq!(links.resolve("abc"), "http://example.com/acces/abc");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteLinks {
    scheme: String,
    domain: String,
    path: String,
}

impl SiteLinks {
    /// Plain `http` links on `domain`.
    pub fn new(domain: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            scheme: "http".to_string(),
            domain: domain.into(),
            path: path.into(),
        }
    }

    /// Use `https`.
    pub fn https(mut self) -> Self {
        self.scheme = "https".to_string();
        self
    }
}

impl LinkResolver for SiteLinks {
    fn resolve(&self, token: &str) -> String {
        let path = self
            .path
            .replace(TOKEN_PLACEHOLDER, &urlencoding::encode(token));
        format!("{}://{}{}", self.scheme, self.domain, path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_site_links() {
        let links = SiteLinks::new("example.com", "/acces/{token}");
        assert_eq!(links.resolve("T0k3n"), "http://example.com/acces/T0k3n");
        assert_eq!(
            links.clone().https().resolve("T0k3n"),
            "https://example.com/acces/T0k3n"
        );
    }

    #[test]
    fn test_token_is_encoded() {
        let links = SiteLinks::new("example.com", "/acces/{token}");
        assert_eq!(links.resolve("a b/c"), "http://example.com/acces/a%20b%2Fc");
    }

    #[test]
    fn test_closure_resolver() {
        let resolver = |token: &str| format!("https://app.test/t/{}", token);
        assert_eq!(LinkResolver::resolve(&resolver, "x"), "https://app.test/t/x");
    }
}
