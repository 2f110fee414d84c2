use std::collections::BTreeMap;

use url::Url;

/// A page response, as fetched from the network or read back from the cache.
#[derive(Debug, Clone, PartialEq)]
pub struct PageResponse {
  /// URL the page was requested as. This is the cache key.
  pub url: String,
  /// URL the response actually came from, after redirects.
  pub final_url: String,
  /// HTTP status code.
  pub status: u16,
  /// Response headers.
  pub headers: BTreeMap<String, String>,
  /// Response body.
  pub body: Vec<u8>,
}

impl PageResponse {
  /// Whether the response status qualifies it for caching.
  pub fn is_ok(&self) -> bool {
    self.status == 200
  }

  /// Whether the response's final URL shares scheme, host, and port with `origin`.
  ///
  /// A final URL that does not parse is treated as cross-origin.
  pub fn is_same_origin(&self, origin: &Url) -> bool {
    match Url::parse(&self.final_url) {
      Ok(final_url) => final_url.origin() == origin.origin(),
      Err(_) => false,
    }
  }
}

/// Where a fetched page came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchSource {
  /// Served from the cache store, without touching the network.
  Cache,
  /// Fetched from the network.
  Network,
}

/// A page plus its provenance, as returned by the fetch handler.
#[derive(Debug, Clone)]
pub struct FetchedPage {
  /// The page content.
  pub page: PageResponse,
  /// Where the page came from.
  pub source: FetchSource,
}

impl FetchedPage {
  /// Wrap a page served from the cache.
  pub fn from_cache(page: PageResponse) -> Self {
    Self {
      page,
      source: FetchSource::Cache,
    }
  }

  /// Wrap a page fetched from the network.
  pub fn from_network(page: PageResponse) -> Self {
    Self {
      page,
      source: FetchSource::Network,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn response(final_url: &str, status: u16) -> PageResponse {
    PageResponse {
      url: final_url.to_string(),
      final_url: final_url.to_string(),
      status,
      headers: BTreeMap::new(),
      body: Vec::new(),
    }
  }

  #[test]
  fn test_only_status_200_is_ok() {
    assert!(response("https://site.test/a", 200).is_ok());
    assert!(!response("https://site.test/a", 204).is_ok());
    assert!(!response("https://site.test/a", 301).is_ok());
    assert!(!response("https://site.test/a", 404).is_ok());
    assert!(!response("https://site.test/a", 500).is_ok());
  }

  #[test]
  fn test_same_origin_matches_scheme_host_port() {
    let origin = Url::parse("https://site.test").unwrap();

    assert!(response("https://site.test/page/", 200).is_same_origin(&origin));
    assert!(!response("https://other.test/page/", 200).is_same_origin(&origin));
    assert!(!response("http://site.test/page/", 200).is_same_origin(&origin));
    assert!(!response("https://site.test:8443/page/", 200).is_same_origin(&origin));
  }

  #[test]
  fn test_unparseable_final_url_is_cross_origin() {
    let origin = Url::parse("https://site.test").unwrap();
    assert!(!response("not a url", 200).is_same_origin(&origin));
  }
}
