//! Covert-channel codec adapter for the Corvid agent.
//!
//! The codec turns payload bytes into innocuous-looking carrier files and
//! back. The actual transformation is an external collaborator; this crate
//! defines the contract the agent consumes ([`CovertChannel`]) plus two
//! implementations: [`ExternalCodec`] drives a codec tool as a subprocess,
//! [`PassthroughCodec`] copies bytes verbatim for tests and local runs.
//!
//! Both operations are synchronous and potentially slow (video transcoding
//! is CPU-bound); async callers run them on a blocking thread.

use std::path::{Path, PathBuf};

use thiserror::Error;

mod external;
mod passthrough;

pub use external::ExternalCodec;
pub use passthrough::PassthroughCodec;

/// Codec error type.
#[derive(Error, Debug)]
pub enum CodecError {
    /// The encode target path is already occupied.
    #[error("encode target already exists: {0}")]
    AlreadyExists(PathBuf),

    /// The carrier file is corrupt or the codec tool rejected it.
    #[error("codec failure: {0}")]
    Codec(String),

    /// Filesystem fault while reading or writing carrier files.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for codec operations.
pub type CodecResult<T> = Result<T, CodecError>;

/// Contract wrapping the external encode/decode collaborator.
pub trait CovertChannel: Send + Sync {
    /// Reads the carrier file at `path` and returns the embedded bytes.
    fn decode_file(&self, path: &Path) -> CodecResult<Vec<u8>>;

    /// Embeds `payload` into a newly created carrier file at `path`.
    ///
    /// Fails with [`CodecError::AlreadyExists`] if `path` is occupied;
    /// callers derive paths from fresh message ids so a collision signals a
    /// broken identity invariant, not a retry.
    fn encode_file(&self, payload: &[u8], path: &Path) -> CodecResult<PathBuf>;
}
