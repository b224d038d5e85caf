//! Identity codec: the carrier file holds the payload bytes verbatim.

use std::io::Write;
use std::path::{Path, PathBuf};

use crate::{CodecError, CodecResult, CovertChannel};

/// Codec that performs no transformation.
///
/// Useful for tests and for running the agent against a peer that skips the
/// covert layer.
#[derive(Debug, Default, Clone, Copy)]
pub struct PassthroughCodec;

impl CovertChannel for PassthroughCodec {
    fn decode_file(&self, path: &Path) -> CodecResult<Vec<u8>> {
        Ok(std::fs::read(path)?)
    }

    fn encode_file(&self, payload: &[u8], path: &Path) -> CodecResult<PathBuf> {
        let mut file = std::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(path)
            .map_err(|err| {
                if err.kind() == std::io::ErrorKind::AlreadyExists {
                    CodecError::AlreadyExists(path.to_path_buf())
                } else {
                    CodecError::Io(err)
                }
            })?;
        file.write_all(payload)?;
        Ok(path.to_path_buf())
    }
}
