//! Corvid agent binary entry point.
//!
//! Usage: corvidd [--base-dir <dir>] [--store redis|memory]
//!                [--codec passthrough|external] ...
//!
//! The agent runs two workers until killed: a periodic inbox scanner and
//! the dispatch loop.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, ValueEnum};
use tracing::{error, info, warn};

use corvid_codec::{CodecError, CovertChannel, ExternalCodec, PassthroughCodec};
use corvid_core::{config, logging, AgentConfig};
use corvid_store::{AgentStore, MemoryStore, RedisStore};
use corvidd::{
    run_scan_worker, AgentError, AgentResult, CommandExecutor, DispatchLoop, IngestScanner,
    OutboundWriter, ShellRunner,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum StoreBackend {
    /// Durable Redis server (the normal mode).
    Redis,
    /// Process-local store; state dies with the process.
    Memory,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum CodecBackend {
    /// Carrier files hold the payload verbatim.
    Passthrough,
    /// Carrier files are produced by an external codec tool.
    External,
}

/// Corvid: store-and-forward covert messaging agent.
#[derive(Parser, Debug)]
#[command(name = "corvidd")]
#[command(about = "Store-and-forward covert messaging agent")]
struct Args {
    /// Working directory; raw/, decoded/ and outgoing/ live under it.
    #[arg(long, env = "CORVID_BASE_DIR", default_value = config::DEFAULT_BASE_DIR)]
    base_dir: PathBuf,

    /// Redis connection URL.
    #[arg(long, env = "REDIS_URL", default_value = config::DEFAULT_REDIS_URL)]
    redis_url: String,

    /// Store backend.
    #[arg(long, value_enum, default_value_t = StoreBackend::Redis)]
    store: StoreBackend,

    /// Codec backend.
    #[arg(long, value_enum, default_value_t = CodecBackend::Passthrough)]
    codec: CodecBackend,

    /// Decode command template for --codec external; {in} is the carrier
    /// file, payload is read from stdout.
    #[arg(long, env = "CORVID_DECODE_CMD")]
    decode_cmd: Option<String>,

    /// Encode command template for --codec external; {in} is a staging file
    /// holding the payload, {out} is the carrier file to create.
    #[arg(long, env = "CORVID_ENCODE_CMD")]
    encode_cmd: Option<String>,

    /// Extension for outbound carrier files.
    #[arg(long, env = "CORVID_SUFFIX", default_value = config::DEFAULT_ENCODED_SUFFIX)]
    suffix: String,

    /// Seconds between inbox scans.
    #[arg(long, env = "CORVID_SCAN_SECS", default_value_t = config::DEFAULT_SCAN_INTERVAL_SECS)]
    scan_secs: u64,

    /// Seconds the dispatch loop sleeps after an empty poll.
    #[arg(long, env = "CORVID_IDLE_SECS", default_value_t = config::DEFAULT_IDLE_BACKOFF_SECS)]
    idle_secs: u64,

    /// Seconds between reconnect attempts while the store is down.
    #[arg(long, env = "CORVID_RECONNECT_SECS", default_value_t = config::DEFAULT_RECONNECT_BACKOFF_SECS)]
    reconnect_secs: u64,

    /// Wall-clock limit for one shell command, in seconds.
    #[arg(long, env = "CORVID_CMD_TIMEOUT_SECS", default_value_t = config::DEFAULT_COMMAND_TIMEOUT_SECS)]
    command_timeout_secs: u64,

    /// Archive drained messages under a separate key prefix instead of
    /// discarding them.
    #[arg(long, env = "CORVID_RETAIN_DRAINED")]
    retain_drained: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

fn build_codec(args: &Args) -> AgentResult<Arc<dyn CovertChannel>> {
    match args.codec {
        CodecBackend::Passthrough => Ok(Arc::new(PassthroughCodec)),
        CodecBackend::External => {
            let decode = args.decode_cmd.as_deref().ok_or_else(|| {
                AgentError::Codec(CodecError::Codec(
                    "--codec external requires --decode-cmd".to_string(),
                ))
            })?;
            let encode = args.encode_cmd.as_deref().ok_or_else(|| {
                AgentError::Codec(CodecError::Codec(
                    "--codec external requires --encode-cmd".to_string(),
                ))
            })?;
            Ok(Arc::new(ExternalCodec::from_templates(decode, encode)?))
        }
    }
}

#[tokio::main]
async fn main() -> AgentResult<()> {
    let args = Args::parse();

    logging::init_logging(&args.log_level);
    info!("Corvid agent starting...");

    let agent_config = AgentConfig {
        base_dir: args.base_dir.clone(),
        redis_url: args.redis_url.clone(),
        encoded_suffix: args.suffix.clone(),
        scan_interval: Duration::from_secs(args.scan_secs),
        idle_backoff: Duration::from_secs(args.idle_secs),
        reconnect_backoff: Duration::from_secs(args.reconnect_secs),
        command_timeout: Duration::from_secs(args.command_timeout_secs),
        retain_drained: args.retain_drained,
    };
    agent_config.ensure_dirs()?;

    info!(
        base_dir = %agent_config.base_dir.display(),
        redis_url = %agent_config.redis_url,
        suffix = %agent_config.encoded_suffix,
        scan_secs = agent_config.scan_interval.as_secs(),
        command_timeout_secs = agent_config.command_timeout.as_secs(),
        "Configuration loaded"
    );

    let store: Arc<dyn AgentStore> = match args.store {
        StoreBackend::Redis => Arc::new(RedisStore::open(&agent_config.redis_url)?),
        StoreBackend::Memory => {
            warn!("Using in-memory store; nothing will survive a restart");
            Arc::new(MemoryStore::new())
        }
    };
    let codec = build_codec(&args)?;

    let scanner = IngestScanner::new(
        Arc::clone(&store),
        Arc::clone(&codec),
        agent_config.clone(),
    );
    let executor = CommandExecutor::new(
        Arc::clone(&store),
        Arc::new(ShellRunner),
        agent_config.command_timeout,
    );
    let outbound = OutboundWriter::new(Arc::clone(&codec), agent_config.clone());
    let dispatch = DispatchLoop::new(store, executor, outbound, agent_config);

    let scan_worker = tokio::spawn(run_scan_worker(scanner));

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::select! {
        result = dispatch.run() => {
            if let Err(err) = result {
                error!(error = %err, "Dispatch loop exited with error");
                scan_worker.abort();
                return Err(err);
            }
        }
        _ = ctrl_c => {
            info!("Received shutdown signal, exiting...");
        }
    }

    scan_worker.abort();
    Ok(())
}
