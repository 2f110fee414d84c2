use std::collections::BTreeMap;

use async_trait::async_trait;
use color_eyre::{eyre::eyre, Result};
use reqwest::Client;

use super::types::PageResponse;

/// Trait for fetching pages over the network.
#[async_trait]
pub trait PageSource: Send + Sync {
  /// GET `url` and return the response, following redirects.
  ///
  /// Only transport failures are errors; a non-success status is a normal
  /// response and is returned as-is.
  async fn fetch(&self, url: &str) -> Result<PageResponse>;
}

/// HTTP page source backed by reqwest.
pub struct HttpSource {
  client: Client,
}

impl HttpSource {
  pub fn new() -> Result<Self> {
    let client = Client::builder()
      .user_agent(concat!("pagestash/", env!("CARGO_PKG_VERSION")))
      .build()
      .map_err(|e| eyre!("Failed to build HTTP client: {}", e))?;

    Ok(Self { client })
  }
}

#[async_trait]
impl PageSource for HttpSource {
  async fn fetch(&self, url: &str) -> Result<PageResponse> {
    let response = self
      .client
      .get(url)
      .send()
      .await
      .map_err(|e| eyre!("Failed to fetch {}: {}", url, e))?;

    let status = response.status().as_u16();
    let final_url = response.url().to_string();

    let mut headers = BTreeMap::new();
    for (name, value) in response.headers() {
      if let Ok(value) = value.to_str() {
        headers.insert(name.as_str().to_string(), value.to_string());
      }
    }

    let body = response
      .bytes()
      .await
      .map_err(|e| eyre!("Failed to read body of {}: {}", url, e))?
      .to_vec();

    Ok(PageResponse {
      url: url.to_string(),
      final_url,
      status,
      headers,
      body,
    })
  }
}
