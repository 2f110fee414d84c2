//! Lifecycle handlers for the offline cache: install, fetch, activate.
//!
//! The worker is registered once with its configuration, storage backend, and
//! page source; the cache version and pre-cache list come from the injected
//! config, not from globals.

use color_eyre::{eyre::eyre, Result};
use futures::future::try_join_all;
use tracing::{debug, info, warn};

use crate::cache::CacheStorage;
use crate::config::Config;
use crate::site::{FetchedPage, PageSource};

/// The offline cache worker.
///
/// Serves pages from the current cache store with network fallback, and
/// manages the store lifecycle across cache versions.
pub struct Worker<S, P> {
  config: Config,
  storage: S,
  source: P,
}

/// Summary of one cache store, as reported by `status`.
#[derive(Debug, Clone)]
pub struct StoreStatus {
  /// Store name (a cache version identifier).
  pub name: String,
  /// Number of stored pages.
  pub entries: u64,
  /// Whether this is the configured current version.
  pub current: bool,
}

impl<S: CacheStorage, P: PageSource> Worker<S, P> {
  /// Register the handlers against a configuration, storage backend, and
  /// page source.
  pub fn new(config: Config, storage: S, source: P) -> Self {
    Self {
      config,
      storage,
      source,
    }
  }

  /// Install: open the current store and pre-cache the configured page list.
  ///
  /// Pages are fetched concurrently. Fails if any page cannot be fetched or
  /// stored; no retry.
  pub async fn install(&self) -> Result<()> {
    let store = self.config.cache.version.as_str();

    self.storage.open_store(store)?;
    info!(store, "opened cache store");

    let urls = self.config.precache_urls()?;
    try_join_all(urls.iter().map(|url| self.precache_one(store, url))).await?;

    info!(store, pages = urls.len(), "pre-cache complete");
    Ok(())
  }

  async fn precache_one(&self, store: &str, url: &str) -> Result<()> {
    let page = self
      .source
      .fetch(url)
      .await
      .map_err(|e| eyre!("Failed to pre-cache {}: {}", url, e))?;

    if !page.is_ok() {
      return Err(eyre!("Failed to pre-cache {}: status {}", url, page.status));
    }

    self
      .storage
      .put(store, &page)
      .map_err(|e| eyre!("Failed to store pre-cached {}: {}", url, e))?;

    debug!(url, "pre-cached page");
    Ok(())
  }

  /// Fetch: serve a page from the cache, falling back to the network.
  ///
  /// On a cache miss, a same-origin status-200 response is stored for future
  /// offline use before it is returned; anything else is returned as-is
  /// without touching the store. Network failures propagate to the caller. A
  /// cache-write failure never fails the response path: it is logged and
  /// dropped.
  pub async fn fetch(&self, url: &str) -> Result<FetchedPage> {
    let store = self.config.cache.version.as_str();

    // Cache hit - return without touching the network.
    if let Some(cached) = self.storage.get(store, url)? {
      debug!(url, "cache hit");
      return Ok(FetchedPage::from_cache(cached.page));
    }

    let page = self.source.fetch(url).await?;

    if page.is_ok() && page.is_same_origin(&self.config.site.origin) {
      if let Err(err) = self.storage.put(store, &page) {
        warn!(url, %err, "failed to store fetched page");
      }
    }

    Ok(FetchedPage::from_network(page))
  }

  /// Activate: delete every store whose name is not the current version.
  pub fn activate(&self) -> Result<()> {
    let keep = [self.config.cache.version.as_str()];

    for name in self.storage.store_names()? {
      if !keep.contains(&name.as_str()) {
        self.storage.delete_store(&name)?;
        info!(store = %name, "deleted stale cache store");
      }
    }

    Ok(())
  }

  /// List existing stores with entry counts, marking the current version.
  pub fn status(&self) -> Result<Vec<StoreStatus>> {
    let current = self.config.cache.version.as_str();

    self
      .storage
      .store_names()?
      .into_iter()
      .map(|name| {
        let entries = self.storage.entry_count(&name)?;
        Ok(StoreStatus {
          current: name == current,
          name,
          entries,
        })
      })
      .collect()
  }
}
