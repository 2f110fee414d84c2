//! Cache storage trait and SQLite implementation.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use color_eyre::{eyre::eyre, Result};
use rusqlite::{params, Connection};

use crate::site::PageResponse;

/// A stored page plus the time it entered the cache.
#[derive(Debug, Clone)]
pub struct CachedPage {
  /// The stored page.
  pub page: PageResponse,
  /// When the page was stored.
  #[allow(dead_code)]
  pub fetched_at: DateTime<Utc>,
}

/// Trait for cache storage backends.
///
/// A backend holds named stores; each store maps a request URL to a stored
/// response. Writes to individual keys are serialized by the backend.
pub trait CacheStorage: Send + Sync {
  /// Open a store, creating it if absent.
  fn open_store(&self, name: &str) -> Result<()>;

  /// List the names of all existing stores.
  fn store_names(&self) -> Result<Vec<String>>;

  /// Delete a store and every entry in it.
  fn delete_store(&self, name: &str) -> Result<()>;

  /// Look up a stored page by request URL.
  fn get(&self, store: &str, url: &str) -> Result<Option<CachedPage>>;

  /// Store a page keyed by its request URL, replacing any previous entry.
  ///
  /// Creates the store if it does not exist yet.
  fn put(&self, store: &str, page: &PageResponse) -> Result<()>;

  /// Number of entries in a store.
  fn entry_count(&self, store: &str) -> Result<u64>;
}

/// SQLite-based cache storage implementation.
pub struct SqliteStorage {
  conn: Mutex<Connection>,
}

impl SqliteStorage {
  /// Open the storage at the default location.
  pub fn open() -> Result<Self> {
    let path = Self::default_path()?;

    // Ensure parent directory exists
    if let Some(parent) = path.parent() {
      std::fs::create_dir_all(parent)
        .map_err(|e| eyre!("Failed to create cache directory: {}", e))?;
    }

    Self::open_at(&path)
  }

  /// Open the storage at a specific database path.
  pub fn open_at(path: &Path) -> Result<Self> {
    let conn = Connection::open(path)
      .map_err(|e| eyre!("Failed to open cache database at {}: {}", path.display(), e))?;

    let storage = Self {
      conn: Mutex::new(conn),
    };
    storage.run_migrations()?;

    Ok(storage)
  }

  /// Get the default database path.
  fn default_path() -> Result<PathBuf> {
    let data_dir = dirs::data_dir()
      .or_else(|| dirs::home_dir().map(|p| p.join(".local/share")))
      .ok_or_else(|| eyre!("Could not determine data directory"))?;

    Ok(data_dir.join("pagestash").join("cache.db"))
  }

  /// Run database migrations for cache tables.
  fn run_migrations(&self) -> Result<()> {
    let conn = self
      .conn
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    conn
      .execute_batch(CACHE_SCHEMA)
      .map_err(|e| eyre!("Failed to run cache migrations: {}", e))?;

    Ok(())
  }
}

/// Schema for cache tables.
const CACHE_SCHEMA: &str = r#"
-- Named cache stores, one per cache version
CREATE TABLE IF NOT EXISTS stores (
    name TEXT PRIMARY KEY,
    created_at TEXT NOT NULL DEFAULT (datetime('now'))
);

-- Stored pages, keyed by request URL within a store
CREATE TABLE IF NOT EXISTS pages (
    store_name TEXT NOT NULL,
    url TEXT NOT NULL,
    final_url TEXT NOT NULL,
    status INTEGER NOT NULL,
    headers TEXT NOT NULL,
    body BLOB NOT NULL,
    fetched_at TEXT NOT NULL DEFAULT (datetime('now')),
    PRIMARY KEY (store_name, url),
    FOREIGN KEY (store_name) REFERENCES stores(name) ON DELETE CASCADE
);
"#;

impl CacheStorage for SqliteStorage {
  fn open_store(&self, name: &str) -> Result<()> {
    let conn = self
      .conn
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    conn
      .execute("INSERT OR IGNORE INTO stores (name) VALUES (?)", params![name])
      .map_err(|e| eyre!("Failed to open store {}: {}", name, e))?;

    Ok(())
  }

  fn store_names(&self) -> Result<Vec<String>> {
    let conn = self
      .conn
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    let mut stmt = conn
      .prepare("SELECT name FROM stores ORDER BY name")
      .map_err(|e| eyre!("Failed to prepare query: {}", e))?;

    let names = stmt
      .query_map([], |row| row.get(0))
      .map_err(|e| eyre!("Failed to list stores: {}", e))?
      .filter_map(|r| r.ok())
      .collect();

    Ok(names)
  }

  fn delete_store(&self, name: &str) -> Result<()> {
    let conn = self
      .conn
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    conn
      .execute("BEGIN TRANSACTION", [])
      .map_err(|e| eyre!("Failed to begin transaction: {}", e))?;

    conn
      .execute("DELETE FROM pages WHERE store_name = ?", params![name])
      .map_err(|e| eyre!("Failed to delete entries of store {}: {}", name, e))?;

    conn
      .execute("DELETE FROM stores WHERE name = ?", params![name])
      .map_err(|e| eyre!("Failed to delete store {}: {}", name, e))?;

    conn
      .execute("COMMIT", [])
      .map_err(|e| eyre!("Failed to commit transaction: {}", e))?;

    Ok(())
  }

  fn get(&self, store: &str, url: &str) -> Result<Option<CachedPage>> {
    let conn = self
      .conn
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    let mut stmt = conn
      .prepare(
        "SELECT final_url, status, headers, body, fetched_at FROM pages
         WHERE store_name = ? AND url = ?",
      )
      .map_err(|e| eyre!("Failed to prepare query: {}", e))?;

    let row: Option<(String, u16, String, Vec<u8>, String)> = stmt
      .query_row(params![store, url], |row| {
        Ok((
          row.get(0)?,
          row.get(1)?,
          row.get(2)?,
          row.get(3)?,
          row.get(4)?,
        ))
      })
      .ok();

    match row {
      Some((final_url, status, headers, body, fetched_at_str)) => {
        let headers: BTreeMap<String, String> = serde_json::from_str(&headers)
          .map_err(|e| eyre!("Failed to deserialize headers: {}", e))?;
        let fetched_at = parse_datetime(&fetched_at_str)?;

        Ok(Some(CachedPage {
          page: PageResponse {
            url: url.to_string(),
            final_url,
            status,
            headers,
            body,
          },
          fetched_at,
        }))
      }
      None => Ok(None),
    }
  }

  fn put(&self, store: &str, page: &PageResponse) -> Result<()> {
    let conn = self
      .conn
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    let headers =
      serde_json::to_string(&page.headers).map_err(|e| eyre!("Failed to serialize headers: {}", e))?;

    conn
      .execute("INSERT OR IGNORE INTO stores (name) VALUES (?)", params![store])
      .map_err(|e| eyre!("Failed to open store {}: {}", store, e))?;

    conn
      .execute(
        "INSERT OR REPLACE INTO pages (store_name, url, final_url, status, headers, body, fetched_at)
         VALUES (?, ?, ?, ?, ?, ?, datetime('now'))",
        params![store, page.url, page.final_url, page.status, headers, page.body],
      )
      .map_err(|e| eyre!("Failed to store page {}: {}", page.url, e))?;

    Ok(())
  }

  fn entry_count(&self, store: &str) -> Result<u64> {
    let conn = self
      .conn
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    let count: i64 = conn
      .query_row(
        "SELECT COUNT(*) FROM pages WHERE store_name = ?",
        params![store],
        |row| row.get(0),
      )
      .map_err(|e| eyre!("Failed to count entries of store {}: {}", store, e))?;

    Ok(count as u64)
  }
}

/// Parse a datetime string from SQLite format.
fn parse_datetime(s: &str) -> Result<DateTime<Utc>> {
  // SQLite stores as "YYYY-MM-DD HH:MM:SS"
  chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
    .map(|dt| dt.and_utc())
    .map_err(|e| eyre!("Failed to parse datetime '{}': {}", s, e))
}
