// crates/conformance-validator/src/server/local.rs
// ============================================================================
// Module: Local Function Server
// Description: Runs the function under test as a local command.
// Purpose: Spawn, observe and stop a local function process group.
// Dependencies: std
// ============================================================================

//! ## Overview
//! The command line is split on whitespace and spawned in its own process
//! group with stdout and stderr redirected to the run's log files. Output is
//! read from the run's output file.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs;
use std::fs::File;
use std::path::PathBuf;
use std::process::Child;
use std::process::Command;
use std::process::Stdio;
use std::thread;
use std::time::Duration;

use super::FunctionServer;
use super::ServerError;
use super::process;
use crate::config::RunPaths;

// ============================================================================
// SECTION: Server
// ============================================================================

/// Function served by a local command.
#[derive(Debug)]
pub struct LocalFunctionServer {
    /// Program followed by its arguments.
    command: Vec<String>,
    /// Wait after spawning before the server is considered up.
    start_delay: Duration,
    /// Output file of the current run.
    output_file: Option<PathBuf>,
    /// Running server process.
    child: Option<Child>,
}

impl LocalFunctionServer {
    /// Creates a server for a whitespace-separated command line.
    #[must_use]
    pub fn new(cmd: &str, start_delay: Duration) -> Self {
        Self {
            command: cmd.split_whitespace().map(str::to_string).collect(),
            start_delay,
            output_file: None,
            child: None,
        }
    }

    /// Returns the process id of the running server.
    #[must_use]
    pub fn pid(&self) -> Option<u32> {
        self.child.as_ref().map(Child::id)
    }
}

impl FunctionServer for LocalFunctionServer {
    fn start(&mut self, paths: &RunPaths) -> Result<(), ServerError> {
        if self.child.is_some() {
            return Ok(());
        }
        let (program, args) = self.command.split_first().ok_or(ServerError::EmptyCommand)?;
        let stdout = File::create(&paths.stdout).map_err(|err| ServerError::io(&paths.stdout, &err))?;
        let stderr = File::create(&paths.stderr).map_err(|err| ServerError::io(&paths.stderr, &err))?;

        let mut command = Command::new(program);
        command
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::from(stdout))
            .stderr(Stdio::from(stderr));
        process::isolate(&mut command);
        let mut child = command.spawn().map_err(|err| ServerError::Spawn {
            program: program.clone(),
            message: err.to_string(),
        })?;

        thread::sleep(self.start_delay);
        if let Ok(Some(status)) = child.try_wait() {
            let _ = process::terminate(&mut child);
            return Err(ServerError::ExitedEarly(status.to_string()));
        }
        self.output_file = Some(paths.output_file.clone());
        self.child = Some(child);
        Ok(())
    }

    fn fetch_output(&self) -> Result<Vec<u8>, ServerError> {
        let path = self.output_file.as_ref().ok_or(ServerError::NotRunning)?;
        fs::read(path).map_err(|err| ServerError::io(path, &err))
    }

    fn shutdown(&mut self) -> Result<(), ServerError> {
        let Some(mut child) = self.child.take() else {
            return Ok(());
        };
        let killed = process::terminate(&mut child);
        let reaped = child
            .wait()
            .map(|_| ())
            .map_err(|err| ServerError::Stop(format!("failed to reap process: {err}")));
        killed.and(reaped)
    }

    fn describe(&self) -> String {
        format!("local command \"{}\"", self.command.join(" "))
    }
}

impl Drop for LocalFunctionServer {
    fn drop(&mut self) {
        let _ = self.shutdown();
    }
}
