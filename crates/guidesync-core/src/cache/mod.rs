//! Local caching module for offline data access.
//!
//! This module provides the `CacheStore` for storing and retrieving API
//! results locally. Each entry carries its own expiry and, optionally, the
//! principal it belongs to; expired entries are evicted lazily when read.
//!
//! Entries live under `cache:<namespace>:<key>` in a
//! [`KeyValueStore`](crate::storage::KeyValueStore).

pub mod store;

pub use store::{CacheEntry, CacheInfo, CacheStore, MAX_TTL_MINUTES};
