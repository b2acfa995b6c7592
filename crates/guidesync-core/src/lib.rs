//! Guidesync core - offline-first data layer for travel guides.
//!
//! Reads go through a TTL cache scoped to the signed-in principal; writes
//! made while offline (or that fail online) are queued and replayed by the
//! sync coordinator once connectivity returns.
//!
//! Typical wiring:
//!
//! ```ignore
//! let kv: Arc<dyn KeyValueStore> = Arc::new(FileStore::new(config.data_dir()?)?);
//! let clock: Arc<dyn Clock> = Arc::new(SystemClock);
//! let monitor = ConnectivityMonitor::new(RuntimeContext::Interactive, true);
//! let queue = Arc::new(PendingActionQueue::new(kv.clone(), clock.clone()));
//! let sync = Arc::new(SyncCoordinator::new(queue, transport.clone(), monitor.clone(), clock.clone(), config.sync_settings()));
//! let _triggers = sync.start();
//! let cache = CacheStore::new(kv, &config.cache_namespace, clock);
//! let guides = GuideService::new(DataAccess::new(transport, cache, sync, monitor, auth, config.cache_ttl_minutes)?);
//! ```

pub mod api;
pub mod auth;
pub mod cache;
pub mod clock;
pub mod config;
pub mod data;
pub mod error;
pub mod guides;
pub mod models;
pub mod network;
pub mod storage;
pub mod sync;

pub use api::{ApiClient, ApiError, Transport};
pub use auth::{AuthProvider, Session};
pub use cache::{CacheEntry, CacheInfo, CacheStore};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::Config;
pub use data::{DataAccess, Mutation, WriteOutcome};
pub use error::{GuideError, Result};
pub use guides::GuideService;
pub use models::{Guide, GuideDraft};
pub use network::{ConnectivityMonitor, RuntimeContext};
pub use storage::{FileStore, KeyValueStore, MemoryStore};
pub use sync::{
    ActionKind, PendingActionQueue, PendingSyncAction, SyncCoordinator, SyncHandle, SyncOutcome,
    SyncReport, SyncSettings, SyncStatus,
};
