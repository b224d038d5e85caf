//! Error types for the agent daemon.

use std::path::PathBuf;

use thiserror::Error;

/// Agent error type.
///
/// Only [`AgentError::Store`] is retryable; the dispatch loop falls back to
/// its reconnect phase on it. Payload-level failures never reach this type,
/// they become `valid=false` messages at the scanner. A `DuplicatePath`
/// means id generation broke, which halts the dispatch worker.
#[derive(Error, Debug)]
pub enum AgentError {
    /// Store connection or operation fault
    #[error("Store error: {0}")]
    Store(#[from] corvid_store::StoreError),

    /// Carrier file could not be encoded or decoded
    #[error("Codec error: {0}")]
    Codec(#[from] corvid_codec::CodecError),

    /// Bytes did not parse as a structured record
    #[error("Parse error: {0}")]
    Parse(#[from] corvid_core::ParseError),

    /// Payload routed as a command but carrying no usable directive
    #[error("Malformed command payload: {0}")]
    MalformedCommand(String),

    /// Command exceeded the wall-clock limit
    #[error("Command timed out after {0} seconds")]
    Timeout(u64),

    /// Outbound carrier path already occupied (identifier collision)
    #[error("Outbound path collision: {}", .0.display())]
    DuplicatePath(PathBuf),

    /// IO error (directories, intermediates)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A background task ended without reporting back
    #[error("Task error: {0}")]
    Task(String),
}

/// Result type for agent operations.
pub type AgentResult<T> = Result<T, AgentError>;
