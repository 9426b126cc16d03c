//! Pre-dispatch screening of raw shell commands.

use crate::dispatch::DispatchError;

/// Substrings that disqualify a shell command outright. Host power
/// transitions belong to the power actions, not to ad hoc shell.
const DENYLIST: &[&str] = &[
    "rm -rf /",
    "rm -fr /",
    "mkfs",
    "dd if=",
    "wipefs",
    ":(){",
    "> /dev/sd",
    "> /dev/nvme",
    "shutdown",
    "reboot",
    "poweroff",
    "halt",
    "init 0",
    "init 6",
];

/// Reject denylisted commands before they ever reach an executor.
pub fn check(command: &str, extra: &[String]) -> Result<(), DispatchError> {
    let normalized = command.to_lowercase();

    for pattern in DENYLIST {
        if normalized.contains(pattern) {
            return Err(DispatchError::PolicyViolation(format!(
                "command contains denied pattern '{}'",
                pattern
            )));
        }
    }
    for pattern in extra {
        if !pattern.is_empty() && normalized.contains(&pattern.to_lowercase()) {
            return Err(DispatchError::PolicyViolation(format!(
                "command contains denied pattern '{}'",
                pattern
            )));
        }
    }

    Ok(())
}
