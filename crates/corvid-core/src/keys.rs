//! Store keyspace shared by every component.
//!
//! All coordination happens through these keys; no other process state is
//! shared. Meta keys carry a leading underscore so prefix scans over message
//! records never pick them up.

use uuid::Uuid;

/// Prefix under which parsed messages are stored.
pub const MESSAGE_PREFIX: &str = "agent-msg-parsed-";

/// Prefix under which drained messages are archived when retention is on.
pub const DRAINED_PREFIX: &str = "agent-msg-drained-";

/// Prefix under which execution records are stored.
pub const EXECUTION_PREFIX: &str = "agent-task-meta-";

/// Set of inbox file paths already ingested.
pub const SEEN_FILES_SET: &str = "_agent_meta-msgs";

/// Set of execution ids whose records are ready to drain.
pub const COMPLETED_COMMANDS_SET: &str = "_agent_meta-cmds";

/// Store key for a parsed message.
pub fn message_key(id: Uuid) -> String {
    format!("{MESSAGE_PREFIX}{id}")
}

/// Archive key for a drained message.
pub fn drained_key(id: Uuid) -> String {
    format!("{DRAINED_PREFIX}{id}")
}

/// Store key for an execution record.
pub fn execution_key(id: Uuid) -> String {
    format!("{EXECUTION_PREFIX}{id}")
}
