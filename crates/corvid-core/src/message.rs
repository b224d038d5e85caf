//! The canonical message entity and its wire encoding.
//!
//! A [`Message`] serializes to one JSON document that serves as both the
//! decoded-file intermediate and the store value. The payload travels as
//! base64 text; `issued_at` travels as numeric epoch seconds.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::wire;

/// Upper bound on payload size, dictated by the store's per-value limit.
pub const MAX_PAYLOAD_BYTES: usize = 500 * 1024 * 1024;

/// What a message is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    CommandRequest,
    CommandResponse,
}

/// Which side authored a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Origin {
    Server,
    Agent,
}

/// A structured message could not be decoded from raw bytes.
#[derive(Debug, thiserror::Error)]
#[error("malformed message: {0}")]
pub struct ParseError(#[from] serde_json::Error);

/// The canonical record exchanged between agent and server.
///
/// The `id` is assigned at construction and never changes; it keys the store
/// record and names the outbound file. Messages are immutable once persisted;
/// corrections are modeled as new messages.
///
/// Inbound documents may omit `id`, `issued_at`, and `valid`; decode fills
/// the same defaults construction would. `kind` and `origin` stay required.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    #[serde(default = "Uuid::new_v4")]
    pub id: Uuid,
    pub kind: MessageKind,
    pub origin: Origin,
    #[serde(with = "wire::epoch_seconds", default = "wire::now_micros")]
    pub issued_at: chrono::DateTime<chrono::Utc>,
    #[serde(default = "default_valid")]
    pub valid: bool,
    #[serde(with = "wire::base64_payload", default)]
    pub payload: Option<Vec<u8>>,
    #[serde(default)]
    pub source_path: Option<PathBuf>,
    #[serde(default)]
    pub materialized_path: Option<PathBuf>,
}

fn default_valid() -> bool {
    true
}

impl Message {
    /// Builds a fresh message with a random id and the current time.
    pub fn new(kind: MessageKind, origin: Origin, payload: Option<Vec<u8>>) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            origin,
            issued_at: wire::now_micros(),
            valid: true,
            payload,
            source_path: None,
            materialized_path: None,
        }
    }

    /// Agent-authored response carrying `payload`.
    pub fn response(payload: Vec<u8>) -> Self {
        Self::new(MessageKind::CommandResponse, Origin::Agent, Some(payload))
    }

    /// Durable record of an inbound file whose contents failed to decode.
    ///
    /// The failure is about the payload, not the message's existence: both
    /// path fields are populated so the operator can find the offender.
    pub fn invalid(source_path: &Path, materialized_path: &Path) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind: MessageKind::CommandRequest,
            origin: Origin::Server,
            issued_at: wire::now_micros(),
            valid: false,
            payload: None,
            source_path: Some(source_path.to_path_buf()),
            materialized_path: Some(materialized_path.to_path_buf()),
        }
    }

    /// Parses the wire representation.
    pub fn decode(raw: &[u8]) -> Result<Self, ParseError> {
        Ok(serde_json::from_slice(raw)?)
    }

    /// Produces the wire representation. Total for any well-formed message.
    pub fn encode(&self) -> Result<Vec<u8>, ParseError> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Payload bytes viewed as UTF-8 text, if both exist.
    pub fn payload_text(&self) -> Option<&str> {
        self.payload.as_deref().and_then(|bytes| std::str::from_utf8(bytes).ok())
    }
}
