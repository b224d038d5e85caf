//! Test harness for agent integration tests.
//!
//! Provides a [`TestHarness`] bundling an in-memory store, a passthrough
//! codec, and a tempdir-backed directory layout, plus waiters that poll the
//! observable state the way a peer would.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tempfile::TempDir;
use tokio::task::JoinHandle;
use uuid::Uuid;

use corvid_codec::{CodecError, CodecResult, CovertChannel, PassthroughCodec};
use corvid_core::{keys, AgentConfig, ExecutionRecord, Message, MessageKind, Origin};
use corvid_store::{AgentStore, MemoryStore};

use crate::dispatch::DispatchLoop;
use crate::error::AgentResult;
use crate::executor::{CommandExecutor, ShellRunner};
use crate::outbound::OutboundWriter;
use crate::scanner::IngestScanner;

/// How long waiters poll before giving up.
const WAIT_DEADLINE: Duration = Duration::from_secs(5);
const WAIT_STEP: Duration = Duration::from_millis(10);

/// Codec double that rejects every carrier.
pub struct RejectingCodec;

impl CovertChannel for RejectingCodec {
    fn decode_file(&self, path: &Path) -> CodecResult<Vec<u8>> {
        Err(CodecError::Codec(format!(
            "unsupported carrier: {}",
            path.display()
        )))
    }

    fn encode_file(&self, _payload: &[u8], path: &Path) -> CodecResult<PathBuf> {
        Err(CodecError::Codec(format!("cannot encode {}", path.display())))
    }
}

/// Shared fixture for scanner, executor, outbound, and dispatch tests.
pub struct TestHarness {
    pub store: Arc<MemoryStore>,
    pub codec: Arc<PassthroughCodec>,
    pub config: AgentConfig,
    _base: TempDir,
}

impl TestHarness {
    /// Fresh harness with tight timings so loops spin fast under test.
    pub fn new() -> Self {
        let base = TempDir::new().unwrap();
        let config = AgentConfig {
            base_dir: base.path().join("msgs"),
            scan_interval: Duration::from_millis(20),
            idle_backoff: Duration::from_millis(10),
            reconnect_backoff: Duration::from_millis(10),
            ..AgentConfig::default()
        };
        config.ensure_dirs().unwrap();

        Self {
            store: Arc::new(MemoryStore::new()),
            codec: Arc::new(PassthroughCodec),
            config,
            _base: base,
        }
    }

    // ---- component builders -------------------------------------------

    pub fn scanner(&self) -> IngestScanner {
        IngestScanner::new(self.store.clone(), self.codec.clone(), self.config.clone())
    }

    /// Scanner wired to a codec double instead of the passthrough codec.
    pub fn scanner_with_codec(&self, codec: Arc<dyn CovertChannel>) -> IngestScanner {
        IngestScanner::new(self.store.clone(), codec, self.config.clone())
    }

    pub fn executor(&self) -> CommandExecutor {
        self.executor_with_timeout(self.config.command_timeout)
    }

    pub fn executor_with_timeout(&self, limit: Duration) -> CommandExecutor {
        CommandExecutor::new(self.store.clone(), Arc::new(ShellRunner), limit)
    }

    pub fn outbound(&self) -> OutboundWriter {
        OutboundWriter::new(self.codec.clone(), self.config.clone())
    }

    pub fn dispatch(&self) -> DispatchLoop {
        DispatchLoop::new(
            self.store.clone(),
            self.executor(),
            self.outbound(),
            self.config.clone(),
        )
    }

    /// Runs the dispatch loop in the background. Abort the handle when done.
    pub fn spawn_dispatch(&self) -> JoinHandle<AgentResult<()>> {
        let dispatch = self.dispatch();
        tokio::spawn(async move { dispatch.run().await })
    }

    // ---- fixtures ------------------------------------------------------

    /// Server-authored request carrying `payload`.
    pub fn request(payload: &[u8]) -> Message {
        Message::new(
            MessageKind::CommandRequest,
            Origin::Server,
            Some(payload.to_vec()),
        )
    }

    /// Drops a carrier file holding `bytes` verbatim into the inbox.
    pub fn drop_carrier(&self, name: &str, bytes: &[u8]) -> PathBuf {
        let path = self.config.inbox_dir().join(name);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(&path, bytes).unwrap();
        path
    }

    /// Drops a carrier encoding `message` into the inbox.
    pub fn drop_message(&self, name: &str, message: &Message) -> PathBuf {
        self.drop_carrier(name, &message.encode().unwrap())
    }

    /// Stores `message` directly, as a finished scan would have.
    pub async fn store_message(&self, message: &Message) {
        self.store
            .set(&keys::message_key(message.id), &message.encode().unwrap())
            .await
            .unwrap();
    }

    // ---- inspectors ----------------------------------------------------

    pub async fn message_keys(&self) -> Vec<String> {
        self.store.scan_prefix(keys::MESSAGE_PREFIX).await.unwrap()
    }

    pub async fn stored_message(&self, key: &str) -> Message {
        Message::decode(&self.store.get(key).await.unwrap().unwrap()).unwrap()
    }

    pub async fn seen_paths(&self) -> Vec<String> {
        self.store.set_members(keys::SEEN_FILES_SET).await.unwrap()
    }

    pub async fn completed_ids(&self) -> Vec<String> {
        self.store
            .set_members(keys::COMPLETED_COMMANDS_SET)
            .await
            .unwrap()
    }

    pub fn outbox_files(&self) -> Vec<PathBuf> {
        let mut files: Vec<PathBuf> = std::fs::read_dir(self.config.outbox_dir())
            .unwrap()
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .collect();
        files.sort();
        files
    }

    // ---- waiters -------------------------------------------------------

    /// Waits until every message record has been drained from the store.
    pub async fn wait_for_messages_drained(&self) {
        let deadline = tokio::time::Instant::now() + WAIT_DEADLINE;
        while !self.message_keys().await.is_empty() {
            if tokio::time::Instant::now() > deadline {
                panic!("message records were never drained");
            }
            tokio::time::sleep(WAIT_STEP).await;
        }
    }

    /// Waits until the completed-command set is empty.
    pub async fn wait_for_completions_drained(&self) {
        let deadline = tokio::time::Instant::now() + WAIT_DEADLINE;
        while !self.completed_ids().await.is_empty() {
            if tokio::time::Instant::now() > deadline {
                panic!("completion signals were never drained");
            }
            tokio::time::sleep(WAIT_STEP).await;
        }
    }

    /// Waits until `id` appears in the completed-command set.
    pub async fn wait_for_completion_signal(&self, id: Uuid) {
        let member = id.to_string();
        let deadline = tokio::time::Instant::now() + WAIT_DEADLINE;
        while !self.completed_ids().await.contains(&member) {
            if tokio::time::Instant::now() > deadline {
                panic!("completion signal for {id} never appeared");
            }
            tokio::time::sleep(WAIT_STEP).await;
        }
    }

    /// Waits for the execution record of `id` to be published.
    pub async fn wait_for_execution_record(&self, id: Uuid) -> ExecutionRecord {
        let key = keys::execution_key(id);
        let deadline = tokio::time::Instant::now() + WAIT_DEADLINE;
        loop {
            if let Some(raw) = self.store.get(&key).await.unwrap() {
                return ExecutionRecord::decode(&raw).unwrap();
            }
            if tokio::time::Instant::now() > deadline {
                panic!("execution record {id} never appeared");
            }
            tokio::time::sleep(WAIT_STEP).await;
        }
    }

    /// Waits until the outbox holds at least `count` files; returns them.
    pub async fn wait_for_outbox_count(&self, count: usize) -> Vec<PathBuf> {
        let deadline = tokio::time::Instant::now() + WAIT_DEADLINE;
        loop {
            let files = self.outbox_files();
            if files.len() >= count {
                return files;
            }
            if tokio::time::Instant::now() > deadline {
                panic!("outbox never reached {count} files (has {})", files.len());
            }
            tokio::time::sleep(WAIT_STEP).await;
        }
    }

    /// Waits for `path` to exist.
    pub async fn wait_for_file(&self, path: &Path) {
        let deadline = tokio::time::Instant::now() + WAIT_DEADLINE;
        while !path.exists() {
            if tokio::time::Instant::now() > deadline {
                panic!("{} never appeared", path.display());
            }
            tokio::time::sleep(WAIT_STEP).await;
        }
    }
}
