//! Codec backed by an external command-line tool.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::Command;

use tracing::debug;

use crate::{CodecError, CodecResult, CovertChannel};

/// Placeholder substituted with the input path.
pub const IN_PLACEHOLDER: &str = "{in}";
/// Placeholder substituted with the output path.
pub const OUT_PLACEHOLDER: &str = "{out}";

/// Codec that shells out to an external tool for every encode and decode.
///
/// The tool is described by two argv templates. Decode runs with `{in}`
/// bound to the carrier file and must print the payload to stdout. Encode
/// runs with `{in}` bound to a staging file holding the payload and `{out}`
/// bound to the carrier file it must create.
pub struct ExternalCodec {
    decode_argv: Vec<String>,
    encode_argv: Vec<String>,
}

impl ExternalCodec {
    /// Builds a codec from two whitespace-separated command templates.
    pub fn from_templates(decode: &str, encode: &str) -> CodecResult<Self> {
        let decode_argv: Vec<String> = decode.split_whitespace().map(str::to_string).collect();
        let encode_argv: Vec<String> = encode.split_whitespace().map(str::to_string).collect();

        if decode_argv.is_empty() || !decode.contains(IN_PLACEHOLDER) {
            return Err(CodecError::Codec(format!(
                "decode template needs a command and {IN_PLACEHOLDER}"
            )));
        }
        if encode_argv.is_empty() || !encode.contains(OUT_PLACEHOLDER) {
            return Err(CodecError::Codec(format!(
                "encode template needs a command and {OUT_PLACEHOLDER}"
            )));
        }

        Ok(Self {
            decode_argv,
            encode_argv,
        })
    }

    fn run(argv: &[String], input: &Path, output: Option<&Path>) -> CodecResult<Vec<u8>> {
        let substitute = |arg: &String| {
            let arg = arg.replace(IN_PLACEHOLDER, &input.to_string_lossy());
            match output {
                Some(out) => arg.replace(OUT_PLACEHOLDER, &out.to_string_lossy()),
                None => arg,
            }
        };
        let program = substitute(&argv[0]);
        let args: Vec<String> = argv[1..].iter().map(substitute).collect();

        debug!(program = %program, input = %input.display(), "Running codec tool");
        let out = Command::new(&program).args(&args).output()?;
        if !out.status.success() {
            return Err(CodecError::Codec(format!(
                "{program} exited with {}: {}",
                out.status,
                String::from_utf8_lossy(&out.stderr).trim()
            )));
        }
        Ok(out.stdout)
    }
}

impl CovertChannel for ExternalCodec {
    fn decode_file(&self, path: &Path) -> CodecResult<Vec<u8>> {
        Self::run(&self.decode_argv, path, None)
    }

    fn encode_file(&self, payload: &[u8], path: &Path) -> CodecResult<PathBuf> {
        if path.exists() {
            return Err(CodecError::AlreadyExists(path.to_path_buf()));
        }

        let mut staging = tempfile::NamedTempFile::new()?;
        staging.write_all(payload)?;
        staging.flush()?;

        Self::run(&self.encode_argv, staging.path(), Some(path))?;
        if !path.exists() {
            return Err(CodecError::Codec(format!(
                "encoder did not produce {}",
                path.display()
            )));
        }
        Ok(path.to_path_buf())
    }
}
