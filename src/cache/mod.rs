//! Named cache stores persisting pages for offline use.
//!
//! A store is identified by the cache version string and maps request URLs to
//! stored responses. Stores are created on install, populated on install and
//! on successful network fetches, and pruned on activation.

mod storage;

pub use storage::{CacheStorage, CachedPage, SqliteStorage};
