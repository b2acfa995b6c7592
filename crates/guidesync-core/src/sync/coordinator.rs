use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::StreamExt;
use serde::Serialize;
use serde_json::Value;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use super::queue::{ActionKind, PendingActionQueue, PendingSyncAction};
use crate::api::{ApiError, Transport};
use crate::clock::Clock;
use crate::error::{GuideError, Result};
use crate::network::ConnectivityMonitor;

/// Default interval between periodic passes.
pub const DEFAULT_SYNC_INTERVAL: Duration = Duration::from_secs(5 * 60);

/// Delay between a reconnection and the pass it triggers, so the link can settle.
pub const DEFAULT_SETTLE_DELAY: Duration = Duration::from_millis(1000);

/// Queued actions older than this are dropped on their next failed replay.
pub const DEFAULT_STALENESS_HOURS: i64 = 24;

#[derive(Debug, Clone)]
pub struct SyncSettings {
    pub interval: Duration,
    pub settle_delay: Duration,
    pub staleness: chrono::Duration,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            interval: DEFAULT_SYNC_INTERVAL,
            settle_delay: DEFAULT_SETTLE_DELAY,
            staleness: chrono::Duration::hours(DEFAULT_STALENESS_HOURS),
        }
    }
}

/// Observable summary of replay activity.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
#[serde(rename_all = "camelCase")]
pub struct SyncStatus {
    pub is_active: bool,
    pub pending_count: usize,
    pub last_sync_at: Option<DateTime<Utc>>,
    pub errors: Vec<String>,
}

/// What one pass did.
#[derive(Debug, Clone, Default)]
pub struct SyncReport {
    pub attempted: usize,
    pub succeeded: usize,
    /// Failed but still queued for the next pass.
    pub retained: usize,
    /// Failed past the staleness bound and dropped; these writes are lost.
    pub expired: Vec<PendingSyncAction>,
    pub errors: Vec<String>,
}

#[derive(Debug, Clone)]
pub enum SyncOutcome {
    Completed(SyncReport),
    AlreadyRunning,
    Offline,
}

/// Replays the pending-action queue against the transport.
pub struct SyncCoordinator {
    queue: Arc<PendingActionQueue>,
    transport: Arc<dyn Transport>,
    connectivity: ConnectivityMonitor,
    clock: Arc<dyn Clock>,
    settings: SyncSettings,
    in_progress: AtomicBool,
    status: watch::Sender<SyncStatus>,
}

/// Clears the in-progress flag however a pass ends.
struct PassGuard {
    coordinator: Arc<SyncCoordinator>,
}

impl Drop for PassGuard {
    fn drop(&mut self) {
        self.coordinator.in_progress.store(false, Ordering::Release);
        self.coordinator.status.send_if_modified(|status| {
            let was_active = status.is_active;
            status.is_active = false;
            was_active
        });
    }
}

impl SyncCoordinator {
    pub fn new(
        queue: Arc<PendingActionQueue>,
        transport: Arc<dyn Transport>,
        connectivity: ConnectivityMonitor,
        clock: Arc<dyn Clock>,
        settings: SyncSettings,
    ) -> Self {
        let initial = SyncStatus {
            pending_count: queue.len(),
            ..SyncStatus::default()
        };
        let (status, _) = watch::channel(initial);

        Self {
            queue,
            transport,
            connectivity,
            clock,
            settings,
            in_progress: AtomicBool::new(false),
            status,
        }
    }

    pub fn status(&self) -> SyncStatus {
        self.status.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SyncStatus> {
        self.status.subscribe()
    }

    pub fn is_active(&self) -> bool {
        self.in_progress.load(Ordering::Acquire)
    }

    pub fn queue(&self) -> &Arc<PendingActionQueue> {
        &self.queue
    }

    // ===== Queueing =====

    pub fn enqueue(&self, kind: ActionKind, endpoint: &str, payload: Option<Value>) -> Result<String> {
        let id = self.queue.enqueue(kind, endpoint, payload)?;
        self.refresh_pending_count();
        Ok(id)
    }

    pub fn queue_create(&self, endpoint: &str, payload: Value) -> Result<String> {
        self.enqueue(ActionKind::Create, endpoint, Some(payload))
    }

    pub fn queue_update(&self, endpoint: &str, payload: Value) -> Result<String> {
        self.enqueue(ActionKind::Update, endpoint, Some(payload))
    }

    pub fn queue_delete(&self, endpoint: &str) -> Result<String> {
        self.enqueue(ActionKind::Delete, endpoint, None)
    }

    pub fn clear_queue(&self) -> Result<()> {
        self.queue.clear()?;
        self.refresh_pending_count();
        Ok(())
    }

    fn refresh_pending_count(&self) {
        let count = self.queue.len();
        self.status.send_if_modified(|status| {
            let changed = status.pending_count != count;
            status.pending_count = count;
            changed
        });
    }

    // ===== Passes =====

    /// Run a pass now. Fails immediately when offline; a no-op while another pass runs.
    pub async fn force_sync(self: &Arc<Self>) -> Result<SyncOutcome> {
        if !self.connectivity.is_online() {
            return Err(GuideError::SyncOffline);
        }
        Ok(self.sync_pending().await)
    }

    /// Run a pass if online and idle.
    ///
    /// The pass runs on its own task, so dropping this future or aborting
    /// the trigger that called it does not cut the pass short.
    pub async fn sync_pending(self: &Arc<Self>) -> SyncOutcome {
        if !self.connectivity.is_online() {
            debug!("Skipping sync pass while offline");
            return SyncOutcome::Offline;
        }
        if self
            .in_progress
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!("Sync pass already running");
            return SyncOutcome::AlreadyRunning;
        }

        let guard = PassGuard {
            coordinator: Arc::clone(self),
        };
        let pass = tokio::spawn(async move {
            let report = guard.coordinator.run_pass().await;
            drop(guard);
            report
        });

        match pass.await {
            Ok(report) => SyncOutcome::Completed(report),
            Err(e) => {
                warn!(error = %e, "Sync pass task failed");
                SyncOutcome::Completed(SyncReport {
                    errors: vec![format!("Sync pass failed: {}", e)],
                    ..SyncReport::default()
                })
            }
        }
    }

    async fn run_pass(&self) -> SyncReport {
        let snapshot = self.queue.list();
        self.status.send_modify(|status| {
            status.is_active = true;
            status.errors.clear();
        });
        info!(pending = snapshot.len(), "Sync pass started");

        let mut report = SyncReport::default();
        for action in snapshot {
            report.attempted += 1;
            match self.dispatch(&action).await {
                Ok(()) => {
                    debug!(id = %action.id, kind = %action.kind, endpoint = %action.endpoint, "Action synced");
                    if let Err(e) = self.queue.remove(&action.id) {
                        warn!(id = %action.id, error = %e, "Failed to remove synced action");
                    }
                    report.succeeded += 1;
                }
                Err(e) => self.record_failure(action, e, &mut report),
            }
        }

        let pending = self.queue.len();
        let now = self.clock.now();
        self.status.send_modify(|status| {
            status.is_active = false;
            status.last_sync_at = Some(now);
            status.pending_count = pending;
            status.errors = report.errors.clone();
        });

        info!(
            succeeded = report.succeeded,
            retained = report.retained,
            expired = report.expired.len(),
            pending,
            "Sync pass complete"
        );
        report
    }

    async fn dispatch(&self, action: &PendingSyncAction) -> std::result::Result<(), ApiError> {
        action
            .kind
            .send(self.transport.as_ref(), &action.endpoint, action.payload.as_ref())
            .await
    }

    fn record_failure(&self, action: PendingSyncAction, cause: ApiError, report: &mut SyncReport) {
        let age = self.clock.now() - action.enqueued_at;

        if age > self.settings.staleness {
            let err = GuideError::SyncActionExpired {
                kind: action.kind.to_string(),
                endpoint: action.endpoint.clone(),
                age_hours: age.num_hours(),
                reason: cause.to_string(),
            };
            warn!(id = %action.id, error = %err, "Dropping expired action");
            if let Err(e) = self.queue.remove(&action.id) {
                warn!(id = %action.id, error = %e, "Failed to remove expired action");
            }
            report.errors.push(err.to_string());
            report.expired.push(action);
        } else {
            let err = GuideError::SyncActionFailed {
                kind: action.kind.to_string(),
                endpoint: action.endpoint.clone(),
                reason: cause.to_string(),
            };
            warn!(id = %action.id, error = %err, "Action kept for retry");
            report.errors.push(err.to_string());
            report.retained += 1;
        }
    }

    // ===== Triggers =====

    /// Start the reconnection and periodic triggers.
    ///
    /// Does nothing in a non-interactive context. Triggers stop when the
    /// returned handle is dropped; a pass already underway still finishes.
    pub fn start(self: &Arc<Self>) -> SyncHandle {
        if !self.connectivity.context().is_interactive() {
            debug!("Non-interactive context, sync triggers disabled");
            return SyncHandle { tasks: Vec::new() };
        }

        let on_reconnect = {
            let this = Arc::clone(self);
            let mut transitions = this.connectivity.transitions();
            tokio::spawn(async move {
                while let Some(online) = transitions.next().await {
                    if online && !this.is_active() {
                        tokio::time::sleep(this.settings.settle_delay).await;
                        this.sync_pending().await;
                    }
                }
            })
        };

        let periodic = {
            let this = Arc::clone(self);
            tokio::spawn(async move {
                let period = this.settings.interval;
                let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
                ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
                loop {
                    ticker.tick().await;
                    if this.connectivity.is_online() && !this.is_active() {
                        this.sync_pending().await;
                    }
                }
            })
        };

        SyncHandle {
            tasks: vec![on_reconnect, periodic],
        }
    }
}

/// Keeps the background triggers alive.
pub struct SyncHandle {
    tasks: Vec<JoinHandle<()>>,
}

impl SyncHandle {
    pub fn is_running(&self) -> bool {
        self.tasks.iter().any(|t| !t.is_finished())
    }

    pub fn stop(self) {
        drop(self);
    }
}

impl Drop for SyncHandle {
    fn drop(&mut self) {
        for task in &self.tasks {
            task.abort();
        }
    }
}
