use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;
use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;
use tracing::{debug, info};

/// Timeout for the active health probe.
const PROBE_TIMEOUT_SECS: u64 = 5;

/// Whether platform network signals are available at all.
///
/// Queried once, when components are constructed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuntimeContext {
    /// A live client that receives online/offline signals.
    Interactive,
    /// A pass with no network signals (pre-rendering, batch jobs).
    NonInteractive,
}

impl RuntimeContext {
    pub fn is_interactive(&self) -> bool {
        matches!(self, RuntimeContext::Interactive)
    }
}

struct HealthProbe {
    client: Client,
    url: String,
}

struct Inner {
    context: RuntimeContext,
    state: watch::Sender<bool>,
    probe: Option<HealthProbe>,
}

/// Process-wide online/offline state with change notification.
///
/// Cloning yields another handle onto the same state.
#[derive(Clone)]
pub struct ConnectivityMonitor {
    inner: Arc<Inner>,
}

impl ConnectivityMonitor {
    /// A non-interactive context is permanently offline regardless of `initially_online`.
    pub fn new(context: RuntimeContext, initially_online: bool) -> Self {
        Self::build(context, initially_online, None)
    }

    /// Enable `check_connectivity` against a health URL.
    pub fn with_health_check(context: RuntimeContext, initially_online: bool, url: &str) -> Self {
        let probe = Client::builder()
            .timeout(Duration::from_secs(PROBE_TIMEOUT_SECS))
            .build()
            .ok()
            .map(|client| HealthProbe {
                client,
                url: url.to_string(),
            });
        Self::build(context, initially_online, probe)
    }

    fn build(context: RuntimeContext, initially_online: bool, probe: Option<HealthProbe>) -> Self {
        let online = context.is_interactive() && initially_online;
        let (state, _) = watch::channel(online);
        debug!(?context, online, "Connectivity monitor initialized");
        Self {
            inner: Arc::new(Inner {
                context,
                state,
                probe,
            }),
        }
    }

    pub fn context(&self) -> RuntimeContext {
        self.inner.context
    }

    pub fn is_online(&self) -> bool {
        *self.inner.state.borrow()
    }

    /// Record a platform online/offline signal. Only real transitions are published.
    pub fn set_online(&self, online: bool) {
        if !self.inner.context.is_interactive() {
            debug!(online, "Ignoring connectivity signal in non-interactive context");
            return;
        }
        let changed = self.inner.state.send_if_modified(|current| {
            if *current == online {
                false
            } else {
                *current = online;
                true
            }
        });
        if changed {
            if online {
                info!("Connection restored");
            } else {
                info!("Connection lost - offline mode");
            }
        }
    }

    /// Stream of connectivity values: the current value first, then each transition.
    pub fn transitions(&self) -> WatchStream<bool> {
        WatchStream::new(self.inner.state.subscribe())
    }

    /// Best-effort reachability check. Never fails; any error reads as offline.
    ///
    /// This does not change the monitored state.
    pub async fn check_connectivity(&self) -> bool {
        if !self.inner.context.is_interactive() || !self.is_online() {
            return false;
        }
        let Some(probe) = &self.inner.probe else {
            return true;
        };
        match probe.client.head(&probe.url).send().await {
            Ok(response) => {
                debug!(status = %response.status(), "Health probe answered");
                true
            }
            Err(e) => {
                debug!(error = %e, "Health probe failed");
                false
            }
        }
    }
}
