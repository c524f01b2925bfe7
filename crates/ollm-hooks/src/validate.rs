//! Pre-spawn command validation.
//!
//! Commands are spawned with shell interpretation disabled, and the command
//! string itself must be free of shell metacharacters and either an
//! absolute path or one of the whitelisted interpreters.

use std::path::Path;

use crate::errors::{HookError, Result};

/// Characters that reject a command outright.
const FORBIDDEN: &[char] = &[
    ';', '&', '|', '`', '$', '(', ')', '{', '}', '[', ']', '<', '>',
];

/// Interpreters allowed by bare name.
const WHITELIST: &[&str] = &["node", "python", "python3", "bash", "sh", "npx", "uvx"];

/// Validate a hook command before spawning.
pub fn validate_command(command: &str) -> Result<()> {
    if command.trim().is_empty() {
        return Err(HookError::InvalidCommand {
            reason: "empty command".into(),
        });
    }
    if let Some(bad) = command.chars().find(|c| FORBIDDEN.contains(c)) {
        return Err(HookError::InvalidCommand {
            reason: format!("command contains forbidden character '{bad}'"),
        });
    }
    if Path::new(command).is_absolute() || WHITELIST.contains(&command) {
        return Ok(());
    }
    Err(HookError::InvalidCommand {
        reason: format!("command '{command}' is neither an absolute path nor a whitelisted interpreter"),
    })
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
