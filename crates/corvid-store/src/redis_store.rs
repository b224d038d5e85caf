//! Redis-backed implementation of [`AgentStore`].

use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::{Client, RedisResult};
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::{AgentStore, StoreResult};

/// Chunk size for server-side SCAN iterations.
const SCAN_COUNT: u32 = 100;

/// Store client backed by a Redis server.
///
/// The connection is dialed lazily on first use, so the agent can start
/// while the server is down. A multiplexed connection does not heal itself
/// after a transport fault; [`AgentStore::ping`] replaces it, which is why
/// the dispatch loop pings before every polling phase.
pub struct RedisStore {
    client: Client,
    conn: Mutex<Option<MultiplexedConnection>>,
}

impl RedisStore {
    /// Builds a client for the Redis server at `url` without dialing it.
    pub fn open(url: &str) -> StoreResult<Self> {
        let client = Client::open(url)?;
        Ok(Self {
            client,
            conn: Mutex::new(None),
        })
    }

    /// A handle to the shared connection, dialing if none exists yet.
    /// Cloning is cheap; requests from clones multiplex onto one socket.
    async fn connection(&self) -> StoreResult<MultiplexedConnection> {
        let mut slot = self.conn.lock().await;
        if let Some(conn) = slot.as_ref() {
            return Ok(conn.clone());
        }
        let fresh = self.client.get_multiplexed_async_connection().await?;
        *slot = Some(fresh.clone());
        info!("Connected to store");
        Ok(fresh)
    }

    /// Drops the current connection so the next use dials a fresh one.
    async fn invalidate(&self) {
        *self.conn.lock().await = None;
    }
}

#[async_trait]
impl AgentStore for RedisStore {
    async fn ping(&self) -> StoreResult<()> {
        let mut conn = self.connection().await?;
        let alive: RedisResult<String> = redis::cmd("PING").query_async(&mut conn).await;
        match alive {
            Ok(_) => Ok(()),
            Err(err) => {
                debug!(error = %err, "Ping failed, replacing connection");
                self.invalidate().await;
                let mut conn = self.connection().await?;
                let _: String = redis::cmd("PING").query_async(&mut conn).await?;
                Ok(())
            }
        }
    }

    async fn get(&self, key: &str) -> StoreResult<Option<Vec<u8>>> {
        let mut conn = self.connection().await?;
        let value: Option<Vec<u8>> = redis::cmd("GET").arg(key).query_async(&mut conn).await?;
        Ok(value)
    }

    async fn set(&self, key: &str, value: &[u8]) -> StoreResult<()> {
        let mut conn = self.connection().await?;
        let _: () = redis::cmd("SET")
            .arg(key)
            .arg(value)
            .query_async(&mut conn)
            .await?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> StoreResult<()> {
        let mut conn = self.connection().await?;
        let _: i64 = redis::cmd("DEL").arg(key).query_async(&mut conn).await?;
        Ok(())
    }

    async fn scan_prefix(&self, prefix: &str) -> StoreResult<Vec<String>> {
        let mut conn = self.connection().await?;
        let pattern = format!("{prefix}*");
        let mut keys = Vec::new();
        let mut cursor: u64 = 0;
        loop {
            // SCAN cursor MATCH pattern COUNT n
            let (next, chunk): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(&pattern)
                .arg("COUNT")
                .arg(SCAN_COUNT)
                .query_async(&mut conn)
                .await?;
            keys.extend(chunk);
            cursor = next;
            if cursor == 0 {
                break;
            }
        }
        Ok(keys)
    }

    async fn set_add(&self, set_key: &str, members: &[String]) -> StoreResult<()> {
        if members.is_empty() {
            return Ok(());
        }
        let mut conn = self.connection().await?;
        let _: i64 = redis::cmd("SADD")
            .arg(set_key)
            .arg(members)
            .query_async(&mut conn)
            .await?;
        Ok(())
    }

    async fn set_remove(&self, set_key: &str, members: &[String]) -> StoreResult<()> {
        if members.is_empty() {
            return Ok(());
        }
        let mut conn = self.connection().await?;
        let _: i64 = redis::cmd("SREM")
            .arg(set_key)
            .arg(members)
            .query_async(&mut conn)
            .await?;
        Ok(())
    }

    async fn set_members(&self, set_key: &str) -> StoreResult<Vec<String>> {
        let mut conn = self.connection().await?;
        let members: Vec<String> = redis::cmd("SMEMBERS")
            .arg(set_key)
            .query_async(&mut conn)
            .await?;
        Ok(members)
    }
}
