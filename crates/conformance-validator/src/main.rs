// crates/conformance-validator/src/main.rs
// ============================================================================
// Module: Function Conformance CLI Entry Point
// Description: Command-line front end for one validation run.
// Purpose: Resolve configuration, wire collaborators and report the verdict.
// Dependencies: clap, conformance-validator, thiserror
// ============================================================================

//! ## Overview
//! Flags mirror the long-standing conformance client: `--cmd` for a local
//! server or `--buildpacks` with `--builder-*` for a container build, the
//! signature `--type`, and the mapping and concurrency switches. Flags
//! override the environment, which overrides the optional TOML file.

// ============================================================================
// SECTION: Modules
// ============================================================================


// ============================================================================
// SECTION: Imports
// ============================================================================

use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use conformance_validator::ConfigError;
use conformance_validator::ConfigOverrides;
use conformance_validator::Elapsed;
use conformance_validator::FileRunLog;
use conformance_validator::HttpTransport;
use conformance_validator::LogFormat;
use conformance_validator::RunLog;
use conformance_validator::RunSummary;
use conformance_validator::ServerOverride;
use conformance_validator::SignatureType;
use conformance_validator::StderrRunLog;
use conformance_validator::TransportError;
use conformance_validator::ValidationError;
use conformance_validator::ValidationOrchestrator;
use conformance_validator::ValidatorConfig;
use conformance_validator::build_server;
use thiserror::Error;

// ============================================================================
// SECTION: CLI Definition
// ============================================================================

/// Validates a function framework against the conformance matrix.
#[derive(Parser, Debug)]
#[command(name = "function-conformance", version)]
struct Cli {
    /// Optional TOML config file (defaults to `FUNCTION_CONFORMANCE_CONFIG`).
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
    /// Type of function to validate: http, cloudevent or legacyevent.
    #[arg(long = "type", value_name = "TYPE")]
    signature_type: Option<SignatureType>,
    /// URL the function serves on.
    #[arg(long, value_name = "URL")]
    url: Option<String>,
    /// Also validate cross-encoding event mapping.
    #[arg(long, value_name = "BOOL", num_args = 0 ..= 1, default_missing_value = "true")]
    validate_mapping: Option<bool>,
    /// Run the concurrency benchmark instead of the scenario matrix.
    #[arg(long, value_name = "BOOL", num_args = 0 ..= 1, default_missing_value = "true")]
    validate_concurrency: Option<bool>,
    /// Command that serves the function locally.
    #[arg(long, value_name = "COMMAND")]
    cmd: Option<String>,
    /// Build and run the function in a container with buildpacks.
    #[arg(long)]
    buildpacks: bool,
    /// Function source directory for the container build.
    #[arg(long, value_name = "DIR")]
    builder_source: Option<String>,
    /// Function entry point for the container build.
    #[arg(long, value_name = "NAME")]
    builder_target: Option<String>,
    /// Language runtime for the container build.
    #[arg(long, value_name = "RUNTIME")]
    builder_runtime: Option<String>,
    /// Builder image tag for the container build (default `latest`).
    #[arg(long, value_name = "TAG")]
    builder_tag: Option<String>,
    /// Comma-separated `KEY=VALUE` runtime environment for the container.
    #[arg(long, value_name = "ENVS", value_delimiter = ',')]
    envs: Option<Vec<String>>,
    /// Seconds to wait after starting the server.
    #[arg(long, value_name = "SECONDS")]
    start_delay: Option<u64>,
    /// File the function writes its output to.
    #[arg(long, value_name = "PATH")]
    output_file: Option<PathBuf>,
    /// File capturing the server's stdout.
    #[arg(long, value_name = "PATH")]
    stdout: Option<PathBuf>,
    /// File capturing the server's stderr.
    #[arg(long, value_name = "PATH")]
    stderr: Option<PathBuf>,
    /// Rendering of run events on stderr: text or json.
    #[arg(long, value_name = "FORMAT")]
    log_format: Option<LogFormat>,
    /// Append run events as JSON lines to this file instead of stderr.
    #[arg(long, value_name = "PATH")]
    run_log: Option<PathBuf>,
}

impl Cli {
    /// Collects flag values that override lower configuration layers.
    fn overrides(&self) -> ConfigOverrides {
        let server = if self.buildpacks {
            Some(ServerOverride::Container {
                source: self.builder_source.clone(),
                target: self.builder_target.clone(),
                runtime: self.builder_runtime.clone(),
                tag: self.builder_tag.clone(),
                envs: self.envs.clone(),
            })
        } else {
            self.cmd.clone().map(|cmd| ServerOverride::Local {
                cmd,
            })
        };
        ConfigOverrides {
            signature_type: self.signature_type,
            url: self.url.clone(),
            validate_mapping: self.validate_mapping,
            validate_concurrency: self.validate_concurrency,
            start_delay_sec: self.start_delay,
            server,
            stdout: self.stdout.clone(),
            stderr: self.stderr.clone(),
            output_file: self.output_file.clone(),
            log_format: self.log_format,
        }
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// CLI failures.
#[derive(Debug, Error)]
enum CliError {
    /// Configuration could not be resolved.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// Transport could not be built.
    #[error(transparent)]
    Transport(#[from] TransportError),
    /// Run log file could not be opened.
    #[error("opening run log {path}: {message}")]
    RunLog {
        /// Log path.
        path: String,
        /// I/O error.
        message: String,
    },
    /// Validation failed.
    #[error(transparent)]
    Validation(#[from] ValidationError),
}

// ============================================================================
// SECTION: Entry Point
// ============================================================================

/// CLI entry point returning an exit code.
fn main() -> ExitCode {
    match run() {
        Ok(code) => code,
        Err(err) => emit_error(&err.to_string()),
    }
}

/// Resolves configuration and executes one validation run.
fn run() -> Result<ExitCode, CliError> {
    let cli = Cli::parse();
    let config =
        ValidatorConfig::resolve(cli.config.as_deref(), |key| std::env::var(key).ok(), cli.overrides())?;

    let log: Arc<dyn RunLog> = match &cli.run_log {
        Some(path) => Arc::new(FileRunLog::new(path).map_err(|err| CliError::RunLog {
            path: path.display().to_string(),
            message: err.to_string(),
        })?),
        None => Arc::new(StderrRunLog::new(config.log_format)),
    };
    let transport = HttpTransport::new(&config.url)?;
    let server = build_server(&config);
    let summary = ValidationOrchestrator::new(config, server, Box::new(transport), log).run()?;
    let message = match summary {
        RunSummary::Matrix(_) => "All validation passed!".to_string(),
        RunSummary::Benchmark(sample) => format!(
            "Concurrency validation passed: {} workers in {} (single request {})",
            sample.fan_out,
            Elapsed(sample.concurrent),
            Elapsed(sample.baseline)
        ),
    };
    let _ = write_stderr_line(&message);
    Ok(ExitCode::SUCCESS)
}

// ============================================================================
// SECTION: Output Helpers
// ============================================================================

/// Writes a single line to stderr.
fn write_stderr_line(message: &str) -> std::io::Result<()> {
    let mut stderr = std::io::stderr();
    writeln!(&mut stderr, "{message}")
}

/// Emits an error message to stderr and returns a failure exit code.
fn emit_error(message: &str) -> ExitCode {
    let _ = write_stderr_line(message);
    ExitCode::FAILURE
}
