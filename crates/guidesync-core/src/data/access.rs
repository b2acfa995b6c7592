use std::sync::Arc;

use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::api::{ApiError, Transport};
use crate::auth::AuthProvider;
use crate::cache::{CacheStore, MAX_TTL_MINUTES};
use crate::error::{GuideError, Result};
use crate::network::{ConnectivityMonitor, RuntimeContext};
use crate::sync::{ActionKind, SyncCoordinator};

/// A write as it will be sent now or replayed later.
#[derive(Debug, Clone)]
pub struct Mutation {
    pub kind: ActionKind,
    pub endpoint: String,
    pub payload: Option<Value>,
    /// Cache keys that are stale once the server accepts the write.
    pub invalidates: Vec<String>,
}

impl Mutation {
    pub fn new(kind: ActionKind, endpoint: impl Into<String>) -> Self {
        Self {
            kind,
            endpoint: endpoint.into(),
            payload: None,
            invalidates: Vec::new(),
        }
    }

    pub fn with_payload(mut self, payload: Value) -> Self {
        self.payload = Some(payload);
        self
    }

    pub fn invalidating(mut self, key: impl Into<String>) -> Self {
        self.invalidates.push(key.into());
        self
    }
}

/// How a write was taken.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteOutcome {
    /// The server accepted it.
    Applied,
    /// It will be replayed by the sync coordinator.
    Queued { action_id: String },
}

impl WriteOutcome {
    pub fn is_queued(&self) -> bool {
        matches!(self, WriteOutcome::Queued { .. })
    }
}

/// Read-through cache and write-behind queue over a transport.
///
/// Entity services build on this; it knows nothing about guides.
pub struct DataAccess {
    transport: Arc<dyn Transport>,
    cache: CacheStore,
    sync: Arc<SyncCoordinator>,
    connectivity: ConnectivityMonitor,
    auth: Arc<dyn AuthProvider>,
    context: RuntimeContext,
    ttl_minutes: i64,
}

impl DataAccess {
    pub fn new(
        transport: Arc<dyn Transport>,
        cache: CacheStore,
        sync: Arc<SyncCoordinator>,
        connectivity: ConnectivityMonitor,
        auth: Arc<dyn AuthProvider>,
        ttl_minutes: i64,
    ) -> Result<Self> {
        if !(1..=MAX_TTL_MINUTES).contains(&ttl_minutes) {
            return Err(GuideError::InvalidTtl(ttl_minutes));
        }
        let context = connectivity.context();
        Ok(Self {
            transport,
            cache,
            sync,
            connectivity,
            auth,
            context,
            ttl_minutes,
        })
    }

    pub fn cache(&self) -> &CacheStore {
        &self.cache
    }

    pub fn sync(&self) -> &Arc<SyncCoordinator> {
        &self.sync
    }

    pub fn connectivity(&self) -> &ConnectivityMonitor {
        &self.connectivity
    }

    pub fn ttl_minutes(&self) -> i64 {
        self.ttl_minutes
    }

    pub fn principal_id(&self) -> Option<String> {
        self.auth.current_principal_id()
    }

    // ===== Reads =====

    /// Fetch a list, falling back to the cached copy on any failure.
    ///
    /// Non-interactive contexts get an empty list without touching network or cache.
    pub async fn read_collection<T>(&self, endpoint: &str, cache_key: &str) -> Result<Vec<T>>
    where
        T: Serialize + DeserializeOwned,
    {
        if !self.context.is_interactive() {
            debug!(endpoint, "Non-interactive context, returning empty collection");
            return Ok(Vec::new());
        }

        let owner = self.principal_id();
        if !self.connectivity.is_online() {
            return self.cached_or_offline(cache_key, owner.as_deref());
        }

        // A null body is an empty list
        match self.fetch::<Option<Vec<T>>>(endpoint).await {
            Ok(items) => {
                let items = items.unwrap_or_default();
                self.store(cache_key, &items, owner.as_deref());
                Ok(items)
            }
            Err(e) => {
                warn!(endpoint, error = %e, "Fetch failed, trying cache");
                self.cache
                    .get(cache_key, owner.as_deref())
                    .ok_or_else(|| e.into())
            }
        }
    }

    /// Fetch one entity. Authorization failures are surfaced even when a
    /// cached copy exists; other failures fall back to the cache.
    pub async fn read_entity<T>(&self, endpoint: &str, cache_key: &str) -> Result<T>
    where
        T: Serialize + DeserializeOwned,
    {
        if !self.context.is_interactive() {
            return Err(GuideError::NonInteractive);
        }

        let owner = self.principal_id();
        if !self.connectivity.is_online() {
            return self.cached_or_offline(cache_key, owner.as_deref());
        }

        match self.fetch::<T>(endpoint).await {
            Ok(item) => {
                self.store(cache_key, &item, owner.as_deref());
                Ok(item)
            }
            Err(e) if e.is_authorization() => {
                warn!(endpoint, error = %e, "Access refused");
                Err(e.into())
            }
            Err(e) => {
                warn!(endpoint, error = %e, "Fetch failed, trying cache");
                self.cache
                    .get(cache_key, owner.as_deref())
                    .ok_or_else(|| e.into())
            }
        }
    }

    async fn fetch<T: DeserializeOwned>(&self, endpoint: &str) -> std::result::Result<T, ApiError> {
        let value = self.transport.get(endpoint).await?;
        serde_json::from_value(value)
            .map_err(|e| ApiError::InvalidResponse(format!("{}: {}", endpoint, e)))
    }

    fn cached_or_offline<T: DeserializeOwned>(&self, key: &str, owner: Option<&str>) -> Result<T> {
        match self.cache.get(key, owner) {
            Some(value) => {
                debug!(key, "Serving from cache while offline");
                Ok(value)
            }
            None => Err(GuideError::OfflineNoCache),
        }
    }

    /// Cache writes never fail a read.
    fn store<T: Serialize>(&self, key: &str, value: &T, owner: Option<&str>) {
        if let Err(e) = self.cache.set(key, value, self.ttl_minutes, owner) {
            warn!(key, error = %e, "Failed to cache response");
        }
    }

    // ===== Writes =====

    /// Send a write now, or queue it for replay.
    ///
    /// Offline, the mutation is queued and `optimistic` is applied to the
    /// cache so reads reflect it. Online, a failed call is queued instead of
    /// surfaced, and a successful one invalidates `mutation.invalidates`.
    pub async fn write<F>(&self, mutation: Mutation, optimistic: F) -> Result<WriteOutcome>
    where
        F: FnOnce(&CacheStore, Option<&str>) + Send,
    {
        if !self.context.is_interactive() {
            return Err(GuideError::NonInteractive);
        }

        let Mutation {
            kind,
            endpoint,
            payload,
            invalidates,
        } = mutation;

        if !self.connectivity.is_online() {
            let action_id = self.sync.enqueue(kind, &endpoint, payload)?;
            let owner = self.principal_id();
            optimistic(&self.cache, owner.as_deref());
            info!(%kind, endpoint = %endpoint, "Offline, write queued for sync");
            return Ok(WriteOutcome::Queued { action_id });
        }

        match kind
            .send(self.transport.as_ref(), &endpoint, payload.as_ref())
            .await
        {
            Ok(()) => {
                for key in &invalidates {
                    if let Err(e) = self.cache.remove(key) {
                        warn!(key = %key, error = %e, "Failed to invalidate cache entry");
                    }
                }
                debug!(%kind, endpoint = %endpoint, "Write applied");
                Ok(WriteOutcome::Applied)
            }
            Err(e) => {
                warn!(%kind, endpoint = %endpoint, error = %e, "Write failed, queued for sync");
                let action_id = self.sync.enqueue(kind, &endpoint, payload)?;
                Ok(WriteOutcome::Queued { action_id })
            }
        }
    }
}
