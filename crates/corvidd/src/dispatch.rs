//! The dispatch loop: polls the store and routes everything the other
//! workers left there.
//!
//! Each iteration has two phases. CONNECTING pings the store and retries on
//! a short fixed backoff until it answers; POLLING drains message records
//! and completed-command signals until a store fault sends it back to
//! CONNECTING. Both draining and deletion are safe to repeat, so re-entering
//! POLLING after a fault is harmless.

use std::sync::Arc;

use tokio::time::sleep;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use corvid_core::{command, keys, AgentConfig, ExecutionRecord, Message};
use corvid_store::AgentStore;

use crate::error::{AgentError, AgentResult};
use crate::executor::CommandExecutor;
use crate::outbound::OutboundWriter;

/// The agent's routing loop. Single-threaded and cooperative; all shared
/// state lives in the store.
pub struct DispatchLoop {
    store: Arc<dyn AgentStore>,
    executor: CommandExecutor,
    outbound: OutboundWriter,
    config: AgentConfig,
}

impl DispatchLoop {
    pub fn new(
        store: Arc<dyn AgentStore>,
        executor: CommandExecutor,
        outbound: OutboundWriter,
        config: AgentConfig,
    ) -> Self {
        Self {
            store,
            executor,
            outbound,
            config,
        }
    }

    /// Runs forever, or until an integrity fault halts the loop.
    ///
    /// Store faults never end the loop; they send it back to the reconnect
    /// phase. The one fatal condition is an outbound path collision, which
    /// means id generation broke.
    pub async fn run(&self) -> AgentResult<()> {
        info!(
            idle_secs = self.config.idle_backoff.as_secs(),
            reconnect_secs = self.config.reconnect_backoff.as_secs(),
            retain_drained = self.config.retain_drained,
            "Starting dispatch loop"
        );

        self.wait_for_store().await;
        if let Err(err) = self.startup_sweep().await {
            warn!(error = %err, "Startup sweep failed");
        }

        loop {
            match self.poll_until_fault().await {
                AgentError::Store(err) => {
                    warn!(error = %err, "Store fault while polling; reconnecting");
                }
                fault => {
                    error!(error = %fault, "Dispatch loop halted");
                    return Err(fault);
                }
            }
            self.wait_for_store().await;
        }
    }

    /// CONNECTING: ping until the store answers, on a fixed backoff.
    async fn wait_for_store(&self) {
        loop {
            match self.store.ping().await {
                Ok(()) => {
                    info!("Store reachable; polling");
                    return;
                }
                Err(err) => {
                    warn!(error = %err, "Store unreachable; retrying");
                    sleep(self.config.reconnect_backoff).await;
                }
            }
        }
    }

    /// Logs executions left over from an earlier run of this agent.
    async fn startup_sweep(&self) -> AgentResult<()> {
        let leftovers = self.store.scan_prefix(keys::EXECUTION_PREFIX).await?;
        if !leftovers.is_empty() {
            info!(
                count = leftovers.len(),
                "Execution records present from an earlier run"
            );
        }
        Ok(())
    }

    /// POLLING: drain until something faults. Sleeps the idle backoff after
    /// an empty cycle; a busy cycle rolls straight into the next one.
    async fn poll_until_fault(&self) -> AgentError {
        loop {
            match self.poll_once().await {
                Ok(0) => sleep(self.config.idle_backoff).await,
                Ok(handled) => debug!(handled, "Poll cycle drained items"),
                Err(err) => return err,
            }
        }
    }

    /// One full drain of message records and completion signals. Returns how
    /// many items were actually consumed.
    async fn poll_once(&self) -> AgentResult<usize> {
        let mut handled = 0;
        for key in self.store.scan_prefix(keys::MESSAGE_PREFIX).await? {
            handled += self.drain_message(&key).await?;
        }
        for member in self.store.set_members(keys::COMPLETED_COMMANDS_SET).await? {
            handled += self.drain_completion(&member).await?;
        }
        Ok(handled)
    }

    /// Consumes one stored message: route, optionally archive, delete.
    async fn drain_message(&self, key: &str) -> AgentResult<usize> {
        let Some(raw) = self.store.get(key).await? else {
            // Already consumed by an earlier cycle.
            return Ok(0);
        };

        match Message::decode(&raw) {
            Ok(message) => {
                self.route(&message).await?;
                if self.config.retain_drained {
                    // Archive before delete so a crash between the two keeps
                    // the record reachable.
                    self.store.set(&keys::drained_key(message.id), &raw).await?;
                }
            }
            Err(err) => {
                warn!(key, error = %err, "Stored message does not parse; discarding");
            }
        }

        self.store.delete(key).await?;
        Ok(1)
    }

    /// Routes one message: commands to the executor, everything else gets a
    /// byte-reversed response. Non-store failures are absorbed here.
    async fn route(&self, message: &Message) -> AgentResult<()> {
        if !message.valid {
            info!(
                id = %message.id,
                source = ?message.source_path,
                "Skipping message that failed to decode"
            );
            return Ok(());
        }
        let Some(payload) = message.payload.as_deref() else {
            info!(id = %message.id, "Message carries no payload; skipping");
            return Ok(());
        };

        if command::extract_command(payload).is_some() {
            match self.executor.execute(message) {
                Ok(execution_id) => {
                    info!(id = %message.id, execution_id = %execution_id, "Dispatched command")
                }
                Err(err) => warn!(id = %message.id, error = %err, "Rejected command message"),
            }
            return Ok(());
        }

        // No directive: echo the payload back reversed, proving receipt.
        let mut reversed = payload.to_vec();
        reversed.reverse();
        let response = Message::response(reversed);
        match self.outbound.write(&response).await {
            Ok(path) => {
                info!(
                    request = %message.id,
                    response = %response.id,
                    path = %path.display(),
                    "Queued response"
                );
            }
            Err(err @ AgentError::DuplicatePath(_)) => return Err(err),
            Err(err) => {
                warn!(
                    request = %message.id,
                    error = %err,
                    "Outbound write failed; dropping response"
                );
            }
        }
        Ok(())
    }

    /// Consumes one completion signal when its record is ready: log the
    /// record, remove the signal, delete the record. A signal whose record
    /// has not appeared yet is left in place for a later drain.
    async fn drain_completion(&self, member: &str) -> AgentResult<usize> {
        let Ok(id) = Uuid::parse_str(member) else {
            // Can never name a record, so it can never become ready.
            warn!(member, "Completed-set member is not an execution id; dropping");
            self.remove_signal(member).await?;
            return Ok(1);
        };

        let key = keys::execution_key(id);
        let Some(raw) = self.store.get(&key).await? else {
            debug!(execution_id = %id, "Execution not ready; leaving signal for a later drain");
            return Ok(0);
        };

        match ExecutionRecord::decode(&raw) {
            Ok(record) => {
                info!(
                    execution_id = %id,
                    command = %record.command_text,
                    exit_code = ?record.exit_code,
                    timed_out = record.timed_out,
                    duration_ms = record.duration().num_milliseconds(),
                    stdout = %record.stdout.trim_end(),
                    stderr = %record.stderr.trim_end(),
                    "Command completed"
                );
            }
            Err(err) => {
                // The record is immutable; a corrupt one never heals.
                warn!(execution_id = %id, error = %err, "Execution record does not parse; discarding");
            }
        }

        // Signal first, then record: a crash in between leaves an orphaned
        // record, never a re-announced completion.
        self.remove_signal(member).await?;
        self.store.delete(&key).await?;
        Ok(1)
    }

    async fn remove_signal(&self, member: &str) -> AgentResult<()> {
        let members = [member.to_string()];
        self.store
            .set_remove(keys::COMPLETED_COMMANDS_SET, &members)
            .await?;
        Ok(())
    }
}
