//! Durable key-value/set store client for the Corvid agent.
//!
//! The store is the only shared mutable resource in the system: the scanner,
//! the executor, and the dispatch loop coordinate exclusively through the
//! operations defined here. [`AgentStore`] is the seam; production code uses
//! [`RedisStore`], tests use [`MemoryStore`].
//!
//! Every operation fails only with [`StoreError::Unavailable`]. Callers treat
//! that as retryable, never fatal, and must not assume multi-key batches are
//! atomic: crash-safety orderings (mark-before-decode, record-before-signal)
//! are the callers' responsibility.

use async_trait::async_trait;
use thiserror::Error;

mod memory;
mod redis_store;

pub use memory::MemoryStore;
pub use redis_store::RedisStore;

/// Store error type.
#[derive(Error, Debug)]
pub enum StoreError {
    /// The store could not be reached or the operation did not complete.
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

impl From<redis::RedisError> for StoreError {
    fn from(err: redis::RedisError) -> Self {
        StoreError::Unavailable(err.to_string())
    }
}

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Typed operations over the durable KV/set store.
///
/// Keys and set members are strings; values are opaque bytes. Per-key
/// operations are atomic; nothing across keys is.
#[async_trait]
pub trait AgentStore: Send + Sync {
    /// One cheap round-trip to confirm the store is reachable.
    async fn ping(&self) -> StoreResult<()>;

    /// Value under `key`, or `None` if absent.
    async fn get(&self, key: &str) -> StoreResult<Option<Vec<u8>>>;

    /// Writes `value` under `key`, replacing any previous value.
    async fn set(&self, key: &str, value: &[u8]) -> StoreResult<()>;

    /// Removes `key`. Removing an absent key is not an error.
    async fn delete(&self, key: &str) -> StoreResult<()>;

    /// All keys starting with `prefix`, in store order.
    ///
    /// The scan walks the keyspace in chunks server-side; the full result is
    /// collected before returning, so callers see one consistent list.
    async fn scan_prefix(&self, prefix: &str) -> StoreResult<Vec<String>>;

    /// Adds `members` to the set under `set_key`. Empty input is a no-op.
    async fn set_add(&self, set_key: &str, members: &[String]) -> StoreResult<()>;

    /// Removes `members` from the set under `set_key`. Empty input is a no-op.
    async fn set_remove(&self, set_key: &str, members: &[String]) -> StoreResult<()>;

    /// All members of the set under `set_key`.
    async fn set_members(&self, set_key: &str) -> StoreResult<Vec<String>>;
}
