//! Persistent key-value medium shared by the cache and the pending-action queue.
//!
//! Backends:
//! - `MemoryStore`: process-local, for tests and non-persistent sessions
//! - `FileStore`: one JSON file per key under a directory
//!
//! Concurrent access from several processes sharing one `FileStore`
//! directory is not coordinated.

pub mod file;
pub mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

use crate::error::Result;

/// Minimal storage capability: string values addressed by string keys.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>>;

    fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Removing a missing key is not an error.
    fn remove(&self, key: &str) -> Result<()>;

    fn keys(&self) -> Result<Vec<String>>;
}
