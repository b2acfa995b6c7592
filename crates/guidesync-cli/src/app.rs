//! Wires the core components together for one CLI invocation.

use std::sync::Arc;

use anyhow::{Context, Result};
use guidesync_core::config::ENV_TOKEN;
use guidesync_core::{
    ApiClient, CacheStore, Clock, Config, ConnectivityMonitor, DataAccess, FileStore,
    GuideService, KeyValueStore, PendingActionQueue, RuntimeContext, Session, SyncCoordinator,
    SystemClock,
};
use tracing::{debug, info, warn};

pub struct App {
    pub config: Config,
    pub session: Arc<Session>,
    pub monitor: ConnectivityMonitor,
    pub sync: Arc<SyncCoordinator>,
    pub guides: GuideService,
}

impl App {
    pub async fn new(offline: bool) -> Result<Self> {
        let config = Config::load()?;
        let data_dir = config.data_dir()?;

        let session = Arc::new(Session::new(data_dir.clone()));
        if let Ok(token) = std::env::var(ENV_TOKEN) {
            session
                .set_token(token.trim())
                .with_context(|| format!("{} is not a usable token", ENV_TOKEN))?;
        } else if let Err(e) = session.load() {
            warn!(error = %e, "Failed to load saved session");
        }

        let kv: Arc<dyn KeyValueStore> = Arc::new(
            FileStore::new(data_dir.join("store"))
                .context("Failed to open local data store")?,
        );
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let transport = Arc::new(
            ApiClient::with_timeout(
                config.api_base_url.clone(),
                session.clone(),
                config.request_timeout(),
            )
            .context("Failed to build HTTP client")?,
        );

        let monitor = ConnectivityMonitor::with_health_check(
            RuntimeContext::Interactive,
            !offline,
            &config.health_url(),
        );
        if !offline {
            let online = monitor.check_connectivity().await;
            monitor.set_online(online);
        }
        info!(online = monitor.is_online(), api = %config.api_base_url, "Starting");

        let queue = Arc::new(PendingActionQueue::new(kv.clone(), clock.clone()));
        let sync = Arc::new(SyncCoordinator::new(
            queue,
            transport.clone(),
            monitor.clone(),
            clock.clone(),
            config.sync_settings(),
        ));

        let cache = CacheStore::new(kv, &config.cache_namespace, clock);
        let data = DataAccess::new(
            transport,
            cache,
            sync.clone(),
            monitor.clone(),
            session.clone(),
            config.cache_ttl_minutes,
        )?;

        Ok(Self {
            config,
            session,
            monitor,
            sync,
            guides: GuideService::new(data),
        })
    }

    /// Replay queued writes before running a command, when there are any.
    pub async fn flush_pending(&self) {
        if self.sync.status().pending_count == 0 || !self.monitor.is_online() {
            return;
        }
        debug!("Replaying pending writes");
        self.sync.sync_pending().await;
    }

    /// Remember who signed in last.
    pub fn remember_principal(&mut self) {
        let principal = self.session.data().map(|d| d.principal_id);
        if principal.is_some() && principal != self.config.last_principal {
            self.config.last_principal = principal;
            if let Err(e) = self.config.save() {
                warn!(error = %e, "Failed to save config");
            }
        }
    }
}
