//! Outbound writer: message back to carrier file.

use std::path::PathBuf;
use std::sync::Arc;

use tracing::info;

use corvid_codec::{CodecError, CovertChannel};
use corvid_core::{AgentConfig, Message};

use crate::error::{AgentError, AgentResult};

/// Serializes messages and encodes them into outbox carrier files.
pub struct OutboundWriter {
    codec: Arc<dyn CovertChannel>,
    config: AgentConfig,
}

impl OutboundWriter {
    pub fn new(codec: Arc<dyn CovertChannel>, config: AgentConfig) -> Self {
        Self { codec, config }
    }

    /// Writes `message` as `{outbox}/{id}{suffix}` and returns that path.
    ///
    /// The decoded intermediate is materialized first, then handed to the
    /// codec. The target path is derived from the message id, so an occupied
    /// path means id generation is broken; that surfaces as
    /// [`AgentError::DuplicatePath`] and is not retried.
    pub async fn write(&self, message: &Message) -> AgentResult<PathBuf> {
        let encoded = message.encode()?;

        let intermediate = self
            .config
            .decoded_dir()
            .join(format!("{}.data", message.id));
        tokio::fs::write(&intermediate, &encoded).await?;

        let target = self
            .config
            .outbox_dir()
            .join(format!("{}{}", message.id, self.config.encoded_suffix));

        let codec = Arc::clone(&self.codec);
        let carrier = target.clone();
        let written = tokio::task::spawn_blocking(move || codec.encode_file(&encoded, &carrier))
            .await
            .map_err(|err| AgentError::Task(err.to_string()))?
            .map_err(|err| match err {
                CodecError::AlreadyExists(path) => AgentError::DuplicatePath(path),
                other => AgentError::Codec(other),
            })?;

        info!(
            id = %message.id,
            path = %written.display(),
            "Wrote outbound carrier"
        );
        Ok(written)
    }
}
