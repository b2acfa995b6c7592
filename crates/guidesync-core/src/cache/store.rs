use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::clock::Clock;
use crate::error::{GuideError, Result};
use crate::storage::KeyValueStore;

/// Longest accepted entry lifetime: one year.
pub const MAX_TTL_MINUTES: i64 = 365 * 24 * 60;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheEntry<T> {
    pub data: T,
    pub written_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner_id: Option<String>,
}

impl<T> CacheEntry<T> {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }

    /// An owned entry is only visible to its owner; an unowned one to everybody.
    pub fn is_visible_to(&self, owner_id: Option<&str>) -> bool {
        match self.owner_id.as_deref() {
            Some(owner) => owner_id == Some(owner),
            None => true,
        }
    }

    pub fn age_minutes(&self, now: DateTime<Utc>) -> i64 {
        (now - self.written_at).num_minutes()
    }

    pub fn age_display(&self, now: DateTime<Utc>) -> String {
        let minutes = self.age_minutes(now);
        if minutes < 1 {
            // Also covers clock skew
            "just now".to_string()
        } else if minutes < 60 {
            format!("{}m ago", minutes)
        } else if minutes < 1440 {
            let hours = minutes / 60;
            let remaining_mins = minutes % 60;
            if remaining_mins >= 30 {
                format!("{}h ago", hours + 1)
            } else {
                format!("{}h ago", hours)
            }
        } else {
            let days = minutes / 1440;
            let remaining_hours = (minutes % 1440) / 60;
            if remaining_hours >= 12 {
                format!("{}d ago", days + 1)
            } else {
                format!("{}d ago", days)
            }
        }
    }
}

/// Diagnostics over one cache namespace.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct CacheInfo {
    pub count: usize,
    pub total_bytes: usize,
    pub keys: Vec<String>,
}

/// Keyed store with per-entry TTL and optional owner scoping.
#[derive(Clone)]
pub struct CacheStore {
    kv: Arc<dyn KeyValueStore>,
    prefix: String,
    clock: Arc<dyn Clock>,
}

impl CacheStore {
    pub fn new(kv: Arc<dyn KeyValueStore>, namespace: &str, clock: Arc<dyn Clock>) -> Self {
        Self {
            kv,
            prefix: format!("cache:{}:", namespace),
            clock,
        }
    }

    fn storage_key(&self, key: &str) -> String {
        format!("{}{}", self.prefix, key)
    }

    /// Write `value` under `key`, replacing any existing entry.
    pub fn set<T: Serialize>(
        &self,
        key: &str,
        value: &T,
        ttl_minutes: i64,
        owner_id: Option<&str>,
    ) -> Result<()> {
        if !(1..=MAX_TTL_MINUTES).contains(&ttl_minutes) {
            return Err(GuideError::InvalidTtl(ttl_minutes));
        }
        let now = self.clock.now();
        let expires_at = Duration::try_minutes(ttl_minutes)
            .and_then(|ttl| now.checked_add_signed(ttl))
            .ok_or(GuideError::InvalidTtl(ttl_minutes))?;
        let entry = CacheEntry {
            data: value,
            written_at: now,
            expires_at,
            owner_id: owner_id.map(str::to_string),
        };
        let contents = serde_json::to_string(&entry)?;
        self.kv.set(&self.storage_key(key), &contents)?;
        debug!(key, ttl_minutes, "Cache entry written");
        Ok(())
    }

    /// Read the full entry for `key` as seen by `owner_id`.
    ///
    /// Expired and unreadable entries are evicted. An entry owned by someone
    /// else is reported absent but left in place for its owner.
    pub fn get_entry<T: DeserializeOwned>(
        &self,
        key: &str,
        owner_id: Option<&str>,
    ) -> Option<CacheEntry<T>> {
        let storage_key = self.storage_key(key);
        let raw = match self.kv.get(&storage_key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                warn!(key, error = %e, "Failed to read cache entry");
                return None;
            }
        };

        let entry: CacheEntry<Value> = match serde_json::from_str(&raw) {
            Ok(entry) => entry,
            Err(e) => {
                warn!(key, error = %e, "Corrupt cache entry, evicting");
                self.evict(key);
                return None;
            }
        };

        if entry.is_expired(self.clock.now()) {
            debug!(key, "Cache entry expired, evicting");
            self.evict(key);
            return None;
        }

        if !entry.is_visible_to(owner_id) {
            debug!(key, "Cache entry belongs to another principal");
            return None;
        }

        match serde_json::from_value(entry.data) {
            Ok(data) => Some(CacheEntry {
                data,
                written_at: entry.written_at,
                expires_at: entry.expires_at,
                owner_id: entry.owner_id,
            }),
            Err(e) => {
                warn!(key, error = %e, "Cache entry has unexpected shape, evicting");
                self.evict(key);
                None
            }
        }
    }

    pub fn get<T: DeserializeOwned>(&self, key: &str, owner_id: Option<&str>) -> Option<T> {
        self.get_entry(key, owner_id).map(|entry| entry.data)
    }

    /// How long ago the entry for `key` was written, if it is readable.
    pub fn age_display<T: DeserializeOwned>(&self, key: &str, owner_id: Option<&str>) -> Option<String> {
        self.get_entry::<T>(key, owner_id)
            .map(|entry| entry.age_display(self.clock.now()))
    }

    pub fn remove(&self, key: &str) -> Result<()> {
        self.kv.remove(&self.storage_key(key))
    }

    /// Remove every entry in this namespace. Returns how many were removed.
    pub fn clear(&self) -> Result<usize> {
        let keys = self.namespaced_keys()?;
        for key in &keys {
            self.kv.remove(key)?;
        }
        Ok(keys.len())
    }

    pub fn info(&self) -> Result<CacheInfo> {
        let mut info = CacheInfo::default();
        for key in self.namespaced_keys()? {
            if let Some(value) = self.kv.get(&key)? {
                info.total_bytes += value.len();
            }
            info.count += 1;
            info.keys.push(key[self.prefix.len()..].to_string());
        }
        Ok(info)
    }

    fn namespaced_keys(&self) -> Result<Vec<String>> {
        Ok(self
            .kv
            .keys()?
            .into_iter()
            .filter(|k| k.starts_with(&self.prefix))
            .collect())
    }

    fn evict(&self, key: &str) {
        if let Err(e) = self.remove(key) {
            warn!(key, error = %e, "Failed to evict cache entry");
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
