// crates/conformance-validator/src/server/mod.rs
// ============================================================================
// Module: Function Servers
// Description: Lifecycle of the function under test.
// Purpose: Start, read output from and stop a local or containerized function.
// Dependencies: thiserror
// ============================================================================

//! ## Overview
//! A [`FunctionServer`] is started once per run, queried for the most recent
//! function output any number of times, and shut down exactly once after a
//! successful start. [`build_server`] selects the variant from configuration.
//! Invariants:
//! - `shutdown` is idempotent; a second call returns `Ok(())`.
//! - A failed `start` leaves nothing running.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod container;
pub mod local;
mod process;

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::Path;
use std::process::Command;

use thiserror::Error;

pub use self::container::ContainerFunctionServer;
pub use self::local::LocalFunctionServer;
use crate::config::RunPaths;
use crate::config::ServerSpec;
use crate::config::ValidatorConfig;

// ============================================================================
// SECTION: Contract
// ============================================================================

/// Lifecycle of the function under test.
pub trait FunctionServer {
    /// Brings the function up, capturing its logs to `paths`.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError`] when the function cannot be started.
    fn start(&mut self, paths: &RunPaths) -> Result<(), ServerError>;

    /// Returns the most recent function output.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError`] when the output cannot be read.
    fn fetch_output(&self) -> Result<Vec<u8>, ServerError>;

    /// Stops the function and flushes its logs.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError`] when the function could not be stopped.
    fn shutdown(&mut self) -> Result<(), ServerError>;

    /// Returns a short description for run logs.
    fn describe(&self) -> String;
}

/// Builds the server selected by configuration.
#[must_use]
pub fn build_server(config: &ValidatorConfig) -> Box<dyn FunctionServer> {
    match &config.server {
        ServerSpec::Local {
            cmd,
        } => Box::new(LocalFunctionServer::new(cmd, config.start_delay())),
        ServerSpec::Container {
            source,
            target,
            runtime,
            tag,
            envs,
        } => Box::new(ContainerFunctionServer::new(
            container::ContainerBuild {
                source: source.clone(),
                target: target.clone(),
                runtime: runtime.clone(),
                tag: tag.clone(),
                envs: envs.clone(),
                signature_type: config.signature_type,
            },
            config.start_delay(),
        )),
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Function server errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ServerError {
    /// Local command line is empty.
    #[error("server command is empty")]
    EmptyCommand,
    /// Server process could not be spawned.
    #[error("failed to spawn {program}: {message}")]
    Spawn {
        /// Program name.
        program: String,
        /// Spawn error.
        message: String,
    },
    /// Function image could not be built.
    #[error("building function container: {0}")]
    Build(String),
    /// Function container could not be run.
    #[error("running function container: {0}")]
    Run(String),
    /// Server process exited before the start delay elapsed.
    #[error("server exited during startup: {0}")]
    ExitedEarly(String),
    /// File I/O failure.
    #[error("{path}: {message}")]
    Io {
        /// Path involved.
        path: String,
        /// I/O error.
        message: String,
    },
    /// External tool invocation failed.
    #[error("`{command}` failed: {message}")]
    Command {
        /// Rendered command line.
        command: String,
        /// Failure detail.
        message: String,
    },
    /// Operation requires a started server.
    #[error("server is not running")]
    NotRunning,
    /// Server could not be stopped.
    #[error("failed to stop server: {0}")]
    Stop(String),
}

impl ServerError {
    /// Builds an I/O error for a path.
    pub(crate) fn io(path: &Path, err: &std::io::Error) -> Self {
        Self::Io {
            path: path.display().to_string(),
            message: err.to_string(),
        }
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Runs an external tool to completion and returns its stdout.
pub(crate) fn run_tool(program: &str, args: &[String]) -> Result<Vec<u8>, ServerError> {
    let rendered = render_command(program, args);
    let output = Command::new(program).args(args).output().map_err(|err| ServerError::Command {
        command: rendered.clone(),
        message: err.to_string(),
    })?;
    if output.status.success() {
        return Ok(output.stdout);
    }
    let mut detail = String::from_utf8_lossy(&output.stderr).trim().to_string();
    if detail.is_empty() {
        detail = String::from_utf8_lossy(&output.stdout).trim().to_string();
    }
    Err(ServerError::Command {
        command: rendered,
        message: format!("{}: {detail}", output.status),
    })
}

/// Renders a command line for messages.
pub(crate) fn render_command(program: &str, args: &[String]) -> String {
    std::iter::once(program).chain(args.iter().map(String::as_str)).collect::<Vec<_>>().join(" ")
}
