//! File ingestion scanner.
//!
//! Walks the inbox for carrier files that have not been seen before, decodes
//! each one, and persists the result as a message record. The seen-file set
//! in the store is the de-dup boundary: paths are marked seen in one batch
//! *before* any decode runs, so a crash on a poison file can never cause
//! infinite reprocessing. The price is that a path marked right before a
//! store outage stays marked without a record; the carrier file itself is
//! kept on disk for manual recovery.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use corvid_codec::CovertChannel;
use corvid_core::{keys, AgentConfig, Message, MAX_PAYLOAD_BYTES};
use corvid_store::AgentStore;

use crate::error::AgentResult;

/// Decodes newly observed inbox files into message records, exactly once per
/// path.
pub struct IngestScanner {
    store: Arc<dyn AgentStore>,
    codec: Arc<dyn CovertChannel>,
    config: AgentConfig,
}

impl IngestScanner {
    pub fn new(
        store: Arc<dyn AgentStore>,
        codec: Arc<dyn CovertChannel>,
        config: AgentConfig,
    ) -> Self {
        Self {
            store,
            codec,
            config,
        }
    }

    /// One scan pass. Returns the store keys written, in discovery order.
    ///
    /// The seen set is read once up front; a file dropped into the inbox
    /// during the pass is picked up next pass. Store faults abort the whole
    /// pass and the caller retries on its next tick.
    pub async fn scan(&self) -> AgentResult<Vec<String>> {
        let seen: HashSet<String> = self
            .store
            .set_members(keys::SEEN_FILES_SET)
            .await?
            .into_iter()
            .collect();

        // Seen-set members are absolute paths; canonicalize the root so a
        // relative base_dir or a changed working directory cannot defeat
        // the de-dup check.
        let root = self.config.inbox_dir();
        let root = tokio::fs::canonicalize(&root).await.unwrap_or(root);

        let mut fresh: Vec<PathBuf> = Vec::new();
        for entry in WalkDir::new(root).follow_links(false) {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    // Vanished mid-walk or unreadable; next pass will see it.
                    warn!(error = %err, "Skipping unreadable inbox entry");
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }
            let path = entry.into_path();
            if !seen.contains(path.to_string_lossy().as_ref()) {
                fresh.push(path);
            }
        }

        if fresh.is_empty() {
            return Ok(Vec::new());
        }
        debug!(count = fresh.len(), "Found new inbox files");

        // Mark every new path seen before decoding any of them.
        let members: Vec<String> = fresh
            .iter()
            .map(|path| path.to_string_lossy().to_string())
            .collect();
        self.store.set_add(keys::SEEN_FILES_SET, &members).await?;

        let mut written = Vec::with_capacity(fresh.len());
        for path in &fresh {
            let message = self.ingest_one(path).await;
            let key = keys::message_key(message.id);
            self.store.set(&key, &message.encode()?).await?;
            info!(
                key = %key,
                valid = message.valid,
                source = %path.display(),
                "Stored ingested message"
            );
            written.push(key);
        }
        Ok(written)
    }

    /// Decodes one carrier file into a message.
    ///
    /// Codec and parse failures are absorbed into a `valid=false` message;
    /// only the caller's store writes can fail past this point.
    async fn ingest_one(&self, path: &Path) -> Message {
        let decoded_path = self.config.decoded_dir().join(decoded_name(path));

        let codec = Arc::clone(&self.codec);
        let carrier = path.to_path_buf();
        let decoded = match tokio::task::spawn_blocking(move || codec.decode_file(&carrier)).await
        {
            Ok(Ok(bytes)) => bytes,
            Ok(Err(err)) => {
                warn!(path = %path.display(), error = %err, "Carrier decode failed");
                return Message::invalid(path, &decoded_path);
            }
            Err(err) => {
                warn!(path = %path.display(), error = %err, "Decode task died");
                return Message::invalid(path, &decoded_path);
            }
        };

        // Materialize the intermediate so operators can inspect exactly what
        // came out of the carrier.
        let wrote = match tokio::fs::write(&decoded_path, &decoded).await {
            Ok(()) => true,
            Err(err) => {
                warn!(
                    path = %decoded_path.display(),
                    error = %err,
                    "Could not materialize decoded intermediate"
                );
                false
            }
        };

        match Message::decode(&decoded) {
            Ok(mut message) => {
                if let Some(payload) = message.payload.as_deref() {
                    if payload.len() > MAX_PAYLOAD_BYTES {
                        warn!(
                            id = %message.id,
                            bytes = payload.len(),
                            "Payload exceeds the store value bound; the store write will likely be refused"
                        );
                    }
                }
                message.source_path = Some(path.to_path_buf());
                // A message never names an intermediate that is not on disk.
                message.materialized_path = if wrote { Some(decoded_path) } else { None };
                message
            }
            Err(err) => {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "Decoded bytes are not a structured message"
                );
                Message::invalid(path, &decoded_path)
            }
        }
    }
}

/// Periodic worker: one [`IngestScanner::scan`] pass per tick, forever.
pub async fn run_scan_worker(scanner: IngestScanner) {
    let mut ticker = tokio::time::interval(scanner.config.scan_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        ticker.tick().await;
        match scanner.scan().await {
            Ok(written) if written.is_empty() => debug!("Scan pass found nothing new"),
            Ok(written) => info!(count = written.len(), "Scan pass ingested messages"),
            Err(err) => warn!(error = %err, "Scan pass failed; retrying next tick"),
        }
    }
}

/// Name of the decoded intermediate for a carrier file.
fn decoded_name(path: &Path) -> String {
    let name = path
        .file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_else(|| "unnamed".to_string());
    format!("{name}.data")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decoded_name_appends_data_suffix() {
        assert_eq!(decoded_name(Path::new("/inbox/drop.mp4")), "drop.mp4.data");
        assert_eq!(decoded_name(Path::new("bare")), "bare.data");
    }
}
