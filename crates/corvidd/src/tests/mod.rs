//! Integration tests for the agent workers.
//!
//! - `harness.rs`  - shared fixture: in-memory store, passthrough codec,
//!                   tempdir directory layout, polling waiters
//! - `ingest.rs`   - scanner de-dup, poison files, store faults
//! - `executor.rs` - directive extraction, output capture, timeout
//! - `dispatch.rs` - routing, reversal replies, outage recovery
//! - `outbound.rs` - carrier naming and collision handling

mod executor;
pub(crate) mod harness;
mod outbound;
