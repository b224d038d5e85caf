//! Corvid core: the message entity, wire codec, store keyspace, and
//! configuration shared by every agent component.
//!
//! # Architecture
//!
//! The agent is a small distributed system coordinated entirely through a
//! durable key-value store: a periodic scanner ingests encoded files into
//! message records, an executor runs command payloads, and a dispatch loop
//! drains both. This crate holds the vocabulary they share:
//!
//! - [`Message`] / [`ExecutionRecord`]: the two durable record types and
//!   their JSON wire encoding (base64 payloads, epoch-second timestamps).
//! - [`keys`]: the store keyspace; every cross-component handoff is a key
//!   or set defined here.
//! - [`command`]: the `command:` payload directive grammar.
//! - [`AgentConfig`]: directories, store endpoint, and timing knobs.

pub mod command;
pub mod config;
pub mod keys;
pub mod logging;
pub mod message;
pub mod record;
pub mod wire;

pub use config::AgentConfig;
pub use message::{Message, MessageKind, Origin, ParseError, MAX_PAYLOAD_BYTES};
pub use record::ExecutionRecord;
