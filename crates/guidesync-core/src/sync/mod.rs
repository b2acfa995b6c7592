//! Write-behind replay.
//!
//! - `PendingActionQueue`: durable FIFO of writes that have not reached the server
//! - `SyncCoordinator`: drains the queue when online, one pass at a time,
//!   triggered by reconnection, a periodic timer, or `force_sync`
//! - `SyncStatus`: observable summary of the last pass

pub mod coordinator;
pub mod queue;

pub use coordinator::{SyncCoordinator, SyncHandle, SyncOutcome, SyncReport, SyncSettings, SyncStatus};
pub use queue::{ActionKind, PendingActionQueue, PendingSyncAction};
