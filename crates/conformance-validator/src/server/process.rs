// crates/conformance-validator/src/server/process.rs
// ============================================================================
// Module: Process Groups
// Description: Platform helpers for spawning and killing server process trees.
// Purpose: Ensure wrapper commands and their children stop together.
// Dependencies: std
// ============================================================================

//! ## Overview
//! Commands such as `go run` build and exec a child binary; killing only the
//! wrapper leaves the child serving. Servers are therefore spawned in their
//! own process group and the whole group is killed on shutdown.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::process::Child;
use std::process::Command;
#[cfg(unix)]
use std::process::Stdio;

use super::ServerError;

// ============================================================================
// SECTION: Spawning
// ============================================================================

/// Places the command in a new process group.
#[cfg(unix)]
pub(crate) fn isolate(command: &mut Command) {
    use std::os::unix::process::CommandExt;
    command.process_group(0);
}

/// Places the command in a new process group.
#[cfg(windows)]
pub(crate) fn isolate(command: &mut Command) {
    use std::os::windows::process::CommandExt;
    /// `CREATE_NEW_PROCESS_GROUP` creation flag.
    const CREATE_NEW_PROCESS_GROUP: u32 = 0x0000_0200;
    command.creation_flags(CREATE_NEW_PROCESS_GROUP);
}

/// Leaves the command unchanged on platforms without process groups.
#[cfg(not(any(unix, windows)))]
pub(crate) const fn isolate(_command: &mut Command) {}

// ============================================================================
// SECTION: Termination
// ============================================================================

/// Kills the child's process group, falling back to the child alone.
#[cfg(unix)]
pub(crate) fn terminate(child: &mut Child) -> Result<(), ServerError> {
    let group = format!("-{}", child.id());
    let killed_group = Command::new("kill")
        .args(["-KILL", "--", &group])
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .is_ok_and(|status| status.success());
    if killed_group {
        return Ok(());
    }
    child.kill().map_err(|err| ServerError::Stop(format!("failed to kill process: {err}")))
}

/// Kills the child process.
#[cfg(not(unix))]
pub(crate) fn terminate(child: &mut Child) -> Result<(), ServerError> {
    child.kill().map_err(|err| ServerError::Stop(format!("failed to kill process: {err}")))
}
