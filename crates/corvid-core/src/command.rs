//! Payload grammar for command-bearing messages.

/// Marker that labels a payload as a shell command request.
pub const COMMAND_DIRECTIVE: &str = "command:";

/// Extracts the shell command carried by a payload.
///
/// The command is everything after the first `command:` directive, trimmed.
/// Returns `None` when the payload is not UTF-8 text, carries no directive,
/// or the directive is empty; callers decide whether that is a routing
/// signal or a malformed request.
pub fn extract_command(payload: &[u8]) -> Option<&str> {
    let text = std::str::from_utf8(payload).ok()?;
    let (_, rest) = text.split_once(COMMAND_DIRECTIVE)?;
    let command = rest.trim();
    if command.is_empty() {
        None
    } else {
        Some(command)
    }
}
