//! Common types shared by the worker, its collaborators and the host

use std::fmt;

use reqwest::Method;

/// Name of a cache generation (e.g. "bible-app-cache-v3")
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheVersion(String);

impl CacheVersion {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Ordered list of URLs fetched and stored during install
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PrecacheManifest(Vec<String>);

impl PrecacheManifest {
    /// Creates a manifest, keeping the first occurrence of any repeated URL
    pub fn new<I, T>(urls: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        let mut deduped: Vec<String> = Vec::new();
        for url in urls.into_iter().map(Into::into) {
            if !deduped.contains(&url) {
                deduped.push(url);
            }
        }
        Self(deduped)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn contains(&self, url: &str) -> bool {
        self.0.iter().any(|u| u == url)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// An intercepted request. `url` is the path and query relative to the origin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub method: Method,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl Request {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: Vec::new(),
            body: Vec::new(),
        }
    }

    pub fn get(url: impl Into<String>) -> Self {
        Self::new(Method::GET, url)
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    /// URL used as the cache key; fragments never reach the server
    pub fn cache_url(&self) -> &str {
        match self.url.split_once('#') {
            Some((url, _)) => url,
            None => &self.url,
        }
    }
}

/// A response from the network or the cache
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl Response {
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: body.into(),
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Returns true for 2xx statuses
    pub fn is_ok(&self) -> bool {
        (200..=299).contains(&self.status)
    }

    /// Returns the first header value matching `name` (case-insensitive)
    #[cfg(test)]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Summary of a stored entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedEntry {
    pub url: String,
    pub status: u16,
    pub size: usize,
    /// Milliseconds since UNIX epoch
    pub stored_at: i64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn manifest_keeps_first_occurrence_of_duplicates() {
        let manifest = PrecacheManifest::new(["/", "/offline", "/", "/about"]);

        assert_eq!(
            manifest.iter().collect::<Vec<_>>(),
            vec!["/", "/offline", "/about"]
        );
        assert_eq!(manifest.len(), 3);
        assert!(manifest.contains("/offline"));
        assert!(!manifest.contains("/missing"));
    }

    #[rstest]
    #[case("/verses/KJV", "/verses/KJV")]
    #[case("/verses/KJV#john-3", "/verses/KJV")]
    #[case("/search?q=love#top", "/search?q=love")]
    fn cache_url_strips_fragment(#[case] url: &str, #[case] expected: &str) {
        assert_eq!(Request::get(url).cache_url(), expected);
    }

    #[rstest]
    #[case(200, true)]
    #[case(204, true)]
    #[case(301, false)]
    #[case(404, false)]
    #[case(500, false)]
    fn response_is_ok_only_for_2xx(#[case] status: u16, #[case] expected: bool) {
        assert_eq!(Response::new(status, "").is_ok(), expected);
    }

    #[test]
    fn response_header_lookup_is_case_insensitive() {
        let response = Response::new(200, "").with_header("Content-Type", "text/html");

        assert_eq!(response.header("content-type"), Some("text/html"));
        assert_eq!(response.header("etag"), None);
    }
}
