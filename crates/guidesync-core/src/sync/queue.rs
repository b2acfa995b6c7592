use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::api::{ApiError, Transport};
use crate::clock::Clock;
use crate::error::Result;
use crate::storage::KeyValueStore;

/// Storage key holding the whole queue as one JSON array.
pub const PENDING_KEY: &str = "sync:pending";

/// Which network call replays an action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ActionKind {
    Create,
    Update,
    Delete,
}

impl ActionKind {
    /// Issue the network call this kind corresponds to.
    pub async fn send(
        self,
        transport: &dyn Transport,
        endpoint: &str,
        payload: Option<&Value>,
    ) -> std::result::Result<(), ApiError> {
        match self {
            ActionKind::Create => transport.create(endpoint, payload).await,
            ActionKind::Update => transport.update(endpoint, payload).await,
            ActionKind::Delete => transport.delete(endpoint).await,
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActionKind::Create => write!(f, "CREATE"),
            ActionKind::Update => write!(f, "UPDATE"),
            ActionKind::Delete => write!(f, "DELETE"),
        }
    }
}

/// A write that has not reached the server yet. Never mutated once queued.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingSyncAction {
    pub id: String,
    pub kind: ActionKind,
    pub endpoint: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,
    pub enqueued_at: DateTime<Utc>,
}

/// Durable FIFO of pending writes.
///
/// The queue does not prune itself; staleness is enforced by the
/// coordinator during replay.
pub struct PendingActionQueue {
    kv: Arc<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
    // Serializes read-modify-write cycles on the stored array.
    write_lock: Mutex<()>,
}

impl PendingActionQueue {
    pub fn new(kv: Arc<dyn KeyValueStore>, clock: Arc<dyn Clock>) -> Self {
        Self {
            kv,
            clock,
            write_lock: Mutex::new(()),
        }
    }

    /// Append an action and return its id.
    pub fn enqueue(
        &self,
        kind: ActionKind,
        endpoint: &str,
        payload: Option<Value>,
    ) -> Result<String> {
        let action = PendingSyncAction {
            id: Uuid::new_v4().to_string(),
            kind,
            endpoint: endpoint.to_string(),
            payload,
            enqueued_at: self.clock.now(),
        };
        let id = action.id.clone();

        let _guard = self.write_lock.lock();
        let mut actions = self.load()?;
        actions.push(action);
        self.save(&actions)?;

        debug!(id = %id, %kind, endpoint, pending = actions.len(), "Action queued");
        Ok(id)
    }

    /// Snapshot of the queue in FIFO order.
    ///
    /// A storage failure reads as an empty snapshot; nothing is written back.
    pub fn list(&self) -> Vec<PendingSyncAction> {
        self.load().unwrap_or_else(|e| {
            warn!(error = %e, "Failed to read pending queue");
            Vec::new()
        })
    }

    /// Delete the action with `id`. Missing ids are ignored.
    pub fn remove(&self, id: &str) -> Result<()> {
        let _guard = self.write_lock.lock();
        let mut actions = self.load()?;
        let before = actions.len();
        actions.retain(|a| a.id != id);
        if actions.len() != before {
            self.save(&actions)?;
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.list().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) -> Result<()> {
        let _guard = self.write_lock.lock();
        self.kv.remove(PENDING_KEY)
    }

    /// Corrupt contents read as empty, matching how the cache treats
    /// corruption. Storage errors are returned so a write never replaces
    /// a queue it could not read.
    fn load(&self) -> Result<Vec<PendingSyncAction>> {
        let Some(raw) = self.kv.get(PENDING_KEY)? else {
            return Ok(Vec::new());
        };
        Ok(serde_json::from_str(&raw).unwrap_or_else(|e| {
            warn!(error = %e, "Pending queue is unreadable, treating as empty");
            Vec::new()
        }))
    }

    fn save(&self, actions: &[PendingSyncAction]) -> Result<()> {
        if actions.is_empty() {
            return self.kv.remove(PENDING_KEY);
        }
        let contents = serde_json::to_string(actions)?;
        self.kv.set(PENDING_KEY, &contents)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::error::GuideError;
    use crate::storage::MemoryStore;
    use chrono::Duration;
    use std::io;
    use std::sync::atomic::{AtomicBool, Ordering};

    /// Memory store whose next `get` fails once.
    #[derive(Default)]
    struct FlakyStore {
        inner: MemoryStore,
        fail_next_get: AtomicBool,
    }

    impl KeyValueStore for FlakyStore {
        fn get(&self, key: &str) -> Result<Option<String>> {
            if self.fail_next_get.swap(false, Ordering::SeqCst) {
                return Err(io::Error::new(io::ErrorKind::PermissionDenied, "denied").into());
            }
            self.inner.get(key)
        }

        fn set(&self, key: &str, value: &str) -> Result<()> {
            self.inner.set(key, value)
        }

        fn remove(&self, key: &str) -> Result<()> {
            self.inner.remove(key)
        }

        fn keys(&self) -> Result<Vec<String>> {
            self.inner.keys()
        }
    }

    fn setup() -> (Arc<MemoryStore>, Arc<ManualClock>, PendingActionQueue) {
        let kv = Arc::new(MemoryStore::new());
        let clock = Arc::new(ManualClock::default());
        let queue = PendingActionQueue::new(kv.clone(), clock.clone());
        (kv, clock, queue)
    }

    #[test]
    fn test_enqueue_is_fifo() {
        let (_, clock, queue) = setup();
        let first = queue
            .enqueue(ActionKind::Update, "/guides/1/favorite", Some(serde_json::json!({})))
            .unwrap();
        clock.advance(Duration::seconds(5));
        let second = queue.enqueue(ActionKind::Delete, "/guides/999", None).unwrap();

        let actions = queue.list();
        assert_eq!(actions.len(), 2);
        assert_eq!(actions[0].id, first);
        assert_eq!(actions[0].kind, ActionKind::Update);
        assert_eq!(actions[1].id, second);
        assert_eq!(actions[1].payload, None);
        assert!(actions[0].enqueued_at < actions[1].enqueued_at);
        assert_ne!(first, second);
    }

    #[test]
    fn test_remove_is_idempotent() {
        let (_, _, queue) = setup();
        let id = queue.enqueue(ActionKind::Create, "/guides", None).unwrap();
        let keep = queue.enqueue(ActionKind::Create, "/guides", None).unwrap();

        queue.remove(&id).unwrap();
        queue.remove(&id).unwrap();
        queue.remove("unknown").unwrap();

        let ids: Vec<String> = queue.list().into_iter().map(|a| a.id).collect();
        assert_eq!(ids, vec![keep]);
    }

    #[test]
    fn test_list_is_a_snapshot() {
        let (_, _, queue) = setup();
        queue.enqueue(ActionKind::Create, "/guides", None).unwrap();
        let snapshot = queue.list();
        queue.enqueue(ActionKind::Create, "/guides", None).unwrap();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(queue.len(), 2);
    }

    #[test]
    fn test_persisted_shape() {
        let (kv, _, queue) = setup();
        queue
            .enqueue(ActionKind::Update, "/guides/1/favorite", Some(serde_json::json!({})))
            .unwrap();
        let raw: Value = serde_json::from_str(&kv.get(PENDING_KEY).unwrap().unwrap()).unwrap();
        assert_eq!(raw[0]["kind"], "UPDATE");
        assert_eq!(raw[0]["endpoint"], "/guides/1/favorite");
        assert!(raw[0].get("enqueuedAt").is_some());
    }

    #[test]
    fn test_corrupt_queue_reads_empty() {
        let (kv, _, queue) = setup();
        kv.set(PENDING_KEY, "not json").unwrap();
        assert!(queue.is_empty());

        queue.enqueue(ActionKind::Delete, "/guides/3", None).unwrap();
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn test_read_failure_never_overwrites_queue() {
        let kv = Arc::new(FlakyStore::default());
        let queue = PendingActionQueue::new(kv.clone(), Arc::new(ManualClock::default()));
        let first = queue.enqueue(ActionKind::Delete, "/guides/1", None).unwrap();
        queue.enqueue(ActionKind::Delete, "/guides/2", None).unwrap();

        kv.fail_next_get.store(true, Ordering::SeqCst);
        assert!(matches!(
            queue.enqueue(ActionKind::Delete, "/guides/3", None),
            Err(GuideError::Io(_))
        ));
        assert_eq!(queue.len(), 2);

        kv.fail_next_get.store(true, Ordering::SeqCst);
        assert!(queue.remove(&first).is_err());

        let endpoints: Vec<String> = queue.list().into_iter().map(|a| a.endpoint).collect();
        assert_eq!(endpoints, vec!["/guides/1", "/guides/2"]);
    }

    #[test]
    fn test_clear() {
        let (kv, _, queue) = setup();
        queue.enqueue(ActionKind::Delete, "/guides/3", None).unwrap();
        queue.clear().unwrap();
        assert!(queue.is_empty());
        assert_eq!(kv.get(PENDING_KEY).unwrap(), None);
    }
}
