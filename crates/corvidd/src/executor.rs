//! Shell command execution with timeout and durable result capture.
//!
//! [`CommandExecutor::execute`] returns as soon as the command is scheduled;
//! completion is announced only through the store, by writing an
//! [`ExecutionRecord`] and then appending its id to the completed-set. That
//! write order is load-bearing: a consumer that sees the set member can rely
//! on the record being present.

use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use corvid_core::{command, keys, wire, ExecutionRecord, Message};
use corvid_store::AgentStore;

use crate::error::{AgentError, AgentResult};

/// How long to wait between attempts to publish a finished record while the
/// store is down, and how many attempts to make before giving up.
const PUBLISH_RETRY_BACKOFF: Duration = Duration::from_secs(1);
const PUBLISH_ATTEMPTS: u32 = 30;

/// Raw output of one subprocess run.
#[derive(Debug, Clone, Default)]
pub struct RunOutcome {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: Option<i32>,
}

/// Where command execution is delegated. The agent ships [`ShellRunner`];
/// tests substitute their own.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Runs `command_text` to completion within `limit`.
    ///
    /// A non-zero exit is an `Ok` outcome; `Err` is reserved for the run
    /// never finishing: [`AgentError::Timeout`] past the limit, or an IO
    /// fault spawning the process.
    async fn run(&self, command_text: &str, limit: Duration) -> AgentResult<RunOutcome>;
}

/// Runs commands through the system shell.
///
/// No sandboxing happens here. Whoever can place payloads in the inbox can
/// run arbitrary commands as this process; that trust boundary sits upstream.
pub struct ShellRunner;

#[async_trait]
impl CommandRunner for ShellRunner {
    async fn run(&self, command_text: &str, limit: Duration) -> AgentResult<RunOutcome> {
        let mut cmd = Command::new("sh");
        cmd.arg("-c").arg(command_text);
        cmd.stdin(Stdio::null());
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());
        // The child must not outlive the timeout.
        cmd.kill_on_drop(true);

        let output = match timeout(limit, cmd.output()).await {
            Err(_) => return Err(AgentError::Timeout(limit.as_secs())),
            Ok(Err(err)) => return Err(err.into()),
            Ok(Ok(output)) => output,
        };

        Ok(RunOutcome {
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            exit_code: output.status.code(),
        })
    }
}

/// Schedules command payloads and records their completions.
pub struct CommandExecutor {
    store: Arc<dyn AgentStore>,
    runner: Arc<dyn CommandRunner>,
    limit: Duration,
}

impl CommandExecutor {
    pub fn new(store: Arc<dyn AgentStore>, runner: Arc<dyn CommandRunner>, limit: Duration) -> Self {
        Self {
            store,
            runner,
            limit,
        }
    }

    /// Extracts the `command:` directive from `message` and schedules it.
    ///
    /// Returns the execution id without waiting for completion. A payload
    /// with no usable directive is rejected with
    /// [`AgentError::MalformedCommand`] and leaves no trace in the store.
    pub fn execute(&self, message: &Message) -> AgentResult<Uuid> {
        let payload = message
            .payload
            .as_deref()
            .ok_or_else(|| AgentError::MalformedCommand("payload is empty".to_string()))?;
        let command_text = command::extract_command(payload)
            .ok_or_else(|| AgentError::MalformedCommand(preview(payload)))?
            .to_string();

        let id = Uuid::new_v4();
        info!(execution_id = %id, command = %command_text, "Scheduling command");

        let store = Arc::clone(&self.store);
        let runner = Arc::clone(&self.runner);
        let limit = self.limit;
        tokio::spawn(async move {
            run_to_completion(store, runner, id, command_text, limit).await;
        });
        Ok(id)
    }
}

/// Runs one command and publishes its record. Never fails out: every ending
/// (clean, non-zero, timeout, spawn fault) becomes a durable record.
async fn run_to_completion(
    store: Arc<dyn AgentStore>,
    runner: Arc<dyn CommandRunner>,
    id: Uuid,
    command_text: String,
    limit: Duration,
) {
    let start_time = wire::now_micros();
    let (outcome, timed_out) = match runner.run(&command_text, limit).await {
        Ok(outcome) => (outcome, false),
        Err(AgentError::Timeout(secs)) => {
            // Partial output is discarded on timeout.
            warn!(execution_id = %id, command = %command_text, secs, "Command timed out");
            (RunOutcome::default(), true)
        }
        Err(err) => {
            warn!(execution_id = %id, command = %command_text, error = %err, "Command failed to run");
            (
                RunOutcome {
                    stderr: err.to_string(),
                    ..RunOutcome::default()
                },
                false,
            )
        }
    };
    let end_time = wire::now_micros();

    let record = ExecutionRecord {
        id,
        command_text,
        stdout: outcome.stdout,
        stderr: outcome.stderr,
        start_time,
        end_time,
        exit_code: outcome.exit_code,
        timed_out,
    };
    publish_record(store, record).await;
}

/// Writes the record, then appends the completion signal, retrying through
/// transient store outages.
async fn publish_record(store: Arc<dyn AgentStore>, record: ExecutionRecord) {
    let encoded = match record.encode() {
        Ok(encoded) => encoded,
        Err(err) => {
            error!(execution_id = %record.id, error = %err, "Execution record does not serialize");
            return;
        }
    };
    let key = keys::execution_key(record.id);
    let member = record.id.to_string();

    for attempt in 1..=PUBLISH_ATTEMPTS {
        let result = async {
            store.set(&key, &encoded).await?;
            store
                .set_add(keys::COMPLETED_COMMANDS_SET, std::slice::from_ref(&member))
                .await
        }
        .await;

        match result {
            Ok(()) => {
                debug!(execution_id = %record.id, "Published execution record");
                return;
            }
            Err(err) if attempt < PUBLISH_ATTEMPTS => {
                warn!(
                    execution_id = %record.id,
                    error = %err,
                    attempt,
                    "Could not publish execution record; retrying"
                );
                tokio::time::sleep(PUBLISH_RETRY_BACKOFF).await;
            }
            Err(err) => {
                error!(
                    execution_id = %record.id,
                    error = %err,
                    "Giving up on publishing execution record"
                );
            }
        }
    }
}

/// Short printable form of a payload for error messages.
fn preview(payload: &[u8]) -> String {
    let text = String::from_utf8_lossy(payload);
    if text.chars().count() <= 80 {
        text.to_string()
    } else {
        let mut cut: String = text.chars().take(80).collect();
        cut.push_str("...");
        cut
    }
}
