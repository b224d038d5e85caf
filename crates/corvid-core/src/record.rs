//! Durable record of one shell command execution.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::wire;

/// What a finished command left behind.
///
/// Written to the store once, when the command completes (cleanly, with a
/// non-zero exit, or by timeout), and consumed exactly once by the dispatch
/// loop. The `id` doubles as the completed-set member.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionRecord {
    pub id: Uuid,
    pub command_text: String,
    pub stdout: String,
    pub stderr: String,
    #[serde(with = "wire::epoch_seconds")]
    pub start_time: chrono::DateTime<chrono::Utc>,
    #[serde(with = "wire::epoch_seconds")]
    pub end_time: chrono::DateTime<chrono::Utc>,
    /// Process exit code; absent when the process was killed by a signal or
    /// never finished.
    #[serde(default)]
    pub exit_code: Option<i32>,
    /// True when the wall-clock limit fired. Partial output is discarded, so
    /// `stdout` and `stderr` are empty in that case.
    #[serde(default)]
    pub timed_out: bool,
}

impl ExecutionRecord {
    pub fn decode(raw: &[u8]) -> Result<Self, crate::message::ParseError> {
        Ok(serde_json::from_slice(raw)?)
    }

    pub fn encode(&self) -> Result<Vec<u8>, crate::message::ParseError> {
        Ok(serde_json::to_vec(self)?)
    }

    pub fn duration(&self) -> chrono::Duration {
        self.end_time - self.start_time
    }
}
