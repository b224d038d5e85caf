//! Corvid: store-and-forward covert messaging agent.
//!
//! Corvid exchanges commands and results with a remote party through carrier
//! files that look like ordinary media, using a durable key-value store as
//! the only synchronization point between its workers.
//!
//! # Core Invariants
//!
//! 1. **Mark before decode**: inbox paths enter the seen-set before any
//!    decode attempt, so a poison file is processed at most once
//! 2. **Record before signal**: an execution record is written before its
//!    completion signal; a signal whose record is not readable yet is left
//!    in place and drained later
//! 3. **Failures become data**: carrier and parse failures are stored as
//!    `valid=false` messages, never raised past the scanner
//! 4. **Store faults only reconnect**: the dispatch loop survives any store
//!    outage; the lone fatal fault is an outbound path collision
//!
//! # Architecture
//!
//! ```text
//! inbox/ --> Scanner --> store <-- Executor
//!                          |           ^
//!                          v           |
//!                     Dispatch --------+
//!                          |
//!                          v
//!                 OutboundWriter --> outbox/
//! ```

pub mod dispatch;
pub mod error;
pub mod executor;
pub mod outbound;
pub mod scanner;

#[cfg(test)]
mod tests;

pub use dispatch::DispatchLoop;
pub use error::{AgentError, AgentResult};
pub use executor::{CommandExecutor, CommandRunner, RunOutcome, ShellRunner};
pub use outbound::OutboundWriter;
pub use scanner::{run_scan_worker, IngestScanner};
