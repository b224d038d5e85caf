//! In-memory implementation of [`AgentStore`].
//!
//! Backs tests and the `--store memory` mode for running the agent without a
//! Redis server. Sorted containers keep scan and member order deterministic.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::{AgentStore, StoreError, StoreResult};

#[derive(Default)]
struct Inner {
    values: BTreeMap<String, Vec<u8>>,
    sets: BTreeMap<String, BTreeSet<String>>,
}

/// Store held entirely in process memory.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
    offline: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulates a store outage. While offline, every operation fails with
    /// [`StoreError::Unavailable`]; flipping back online restores the data
    /// untouched.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    fn check_online(&self) -> StoreResult<()> {
        if self.offline.load(Ordering::SeqCst) {
            Err(StoreError::Unavailable("in-memory store is offline".into()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl AgentStore for MemoryStore {
    async fn ping(&self) -> StoreResult<()> {
        self.check_online()
    }

    async fn get(&self, key: &str) -> StoreResult<Option<Vec<u8>>> {
        self.check_online()?;
        Ok(self.inner.lock().await.values.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &[u8]) -> StoreResult<()> {
        self.check_online()?;
        self.inner
            .lock()
            .await
            .values
            .insert(key.to_string(), value.to_vec());
        Ok(())
    }

    async fn delete(&self, key: &str) -> StoreResult<()> {
        self.check_online()?;
        self.inner.lock().await.values.remove(key);
        Ok(())
    }

    async fn scan_prefix(&self, prefix: &str) -> StoreResult<Vec<String>> {
        self.check_online()?;
        Ok(self
            .inner
            .lock()
            .await
            .values
            .keys()
            .filter(|key| key.starts_with(prefix))
            .cloned()
            .collect())
    }

    async fn set_add(&self, set_key: &str, members: &[String]) -> StoreResult<()> {
        self.check_online()?;
        if members.is_empty() {
            return Ok(());
        }
        self.inner
            .lock()
            .await
            .sets
            .entry(set_key.to_string())
            .or_default()
            .extend(members.iter().cloned());
        Ok(())
    }

    async fn set_remove(&self, set_key: &str, members: &[String]) -> StoreResult<()> {
        self.check_online()?;
        if members.is_empty() {
            return Ok(());
        }
        if let Some(set) = self.inner.lock().await.sets.get_mut(set_key) {
            for member in members {
                set.remove(member);
            }
        }
        Ok(())
    }

    async fn set_members(&self, set_key: &str) -> StoreResult<Vec<String>> {
        self.check_online()?;
        Ok(self
            .inner
            .lock()
            .await
            .sets
            .get(set_key)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default())
    }
}
