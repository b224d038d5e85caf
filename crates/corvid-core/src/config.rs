//! Runtime configuration for the agent process.

use std::io;
use std::path::PathBuf;
use std::time::Duration;

/// Default working directory; inbox, decoded, and outbox live under it.
pub const DEFAULT_BASE_DIR: &str = "msgs";
/// Default store endpoint.
pub const DEFAULT_REDIS_URL: &str = "redis://127.0.0.1:6379";
/// Default extension for encoded carrier files.
pub const DEFAULT_ENCODED_SUFFIX: &str = ".mp4";
/// Seconds between inbox scans.
pub const DEFAULT_SCAN_INTERVAL_SECS: u64 = 5;
/// Seconds the dispatch loop sleeps when a poll finds nothing.
pub const DEFAULT_IDLE_BACKOFF_SECS: u64 = 5;
/// Seconds between reconnect attempts while the store is unreachable.
pub const DEFAULT_RECONNECT_BACKOFF_SECS: u64 = 1;
/// Wall-clock limit on a single shell command.
pub const DEFAULT_COMMAND_TIMEOUT_SECS: u64 = 60;

/// Everything the agent needs to run, resolved before any worker starts.
#[derive(Debug, Clone)]
pub struct AgentConfig {
    pub base_dir: PathBuf,
    pub redis_url: String,
    pub encoded_suffix: String,
    pub scan_interval: Duration,
    pub idle_backoff: Duration,
    pub reconnect_backoff: Duration,
    pub command_timeout: Duration,
    /// Archive drained messages under a separate key prefix instead of
    /// discarding them.
    pub retain_drained: bool,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            base_dir: PathBuf::from(DEFAULT_BASE_DIR),
            redis_url: DEFAULT_REDIS_URL.to_string(),
            encoded_suffix: DEFAULT_ENCODED_SUFFIX.to_string(),
            scan_interval: Duration::from_secs(DEFAULT_SCAN_INTERVAL_SECS),
            idle_backoff: Duration::from_secs(DEFAULT_IDLE_BACKOFF_SECS),
            reconnect_backoff: Duration::from_secs(DEFAULT_RECONNECT_BACKOFF_SECS),
            command_timeout: Duration::from_secs(DEFAULT_COMMAND_TIMEOUT_SECS),
            retain_drained: false,
        }
    }
}

impl AgentConfig {
    /// Where encoded files arrive.
    pub fn inbox_dir(&self) -> PathBuf {
        self.base_dir.join("raw")
    }

    /// Where decoded intermediates are materialized.
    pub fn decoded_dir(&self) -> PathBuf {
        self.base_dir.join("decoded")
    }

    /// Where outbound encoded files are written.
    pub fn outbox_dir(&self) -> PathBuf {
        self.base_dir.join("outgoing")
    }

    /// Creates the working directories if they do not exist yet.
    pub fn ensure_dirs(&self) -> io::Result<()> {
        std::fs::create_dir_all(self.inbox_dir())?;
        std::fs::create_dir_all(self.decoded_dir())?;
        std::fs::create_dir_all(self.outbox_dir())?;
        Ok(())
    }
}
