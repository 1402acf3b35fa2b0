// crates/conformance-validator/src/server/container.rs
// ============================================================================
// Module: Container Function Server
// Description: Builds the function with buildpacks and runs it in Docker.
// Purpose: Validate functions exactly as the hosted platform packages them.
// Dependencies: std
// ============================================================================

//! ## Overview
//! Start pulls the builder image, builds the function image with `pack`,
//! and runs it with host networking. `docker run --cidfile` records the id
//! of exactly the container this server started. Output is
//! copied out of `/workspace` on demand. Shutdown writes the container logs
//! into the run's log files before killing the container.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::env;
use std::fs;
use std::fs::File;
use std::path::Path;
use std::path::PathBuf;
use std::process;
use std::process::Child;
use std::process::Command;
use std::process::Stdio;
use std::thread;
use std::time::Duration;

use super::FunctionServer;
use super::ServerError;
use super::render_command;
use super::run_tool;
use crate::config::RunPaths;
use crate::config::SignatureType;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Image name of the built function.
pub const IMAGE: &str = "conformance-test-func";
/// Builder image repository; the tag is appended.
pub const BUILDER_REPOSITORY: &str = "gcr.io/buildpacks/builder";
/// Target platform passed to the builder.
pub const TARGET_PLATFORM: &str = "gcf";
/// Directory inside the container holding function output.
const WORKSPACE_DIR: &str = "/workspace";
/// Docker CLI binary.
const DOCKER: &str = "docker";
/// Buildpacks CLI binary.
const PACK: &str = "pack";

// ============================================================================
// SECTION: Types
// ============================================================================

/// Build inputs for the function image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerBuild {
    /// Function source directory.
    pub source: String,
    /// Function entry point name.
    pub target: String,
    /// Language runtime identifier.
    pub runtime: String,
    /// Builder image tag.
    pub tag: String,
    /// Extra `KEY=VALUE` runtime environment entries.
    pub envs: Vec<String>,
    /// Signature type under validation.
    pub signature_type: SignatureType,
}

impl ContainerBuild {
    /// Returns the builder image reference.
    #[must_use]
    pub fn builder_image(&self) -> String {
        format!("{BUILDER_REPOSITORY}:{}", self.tag)
    }

    /// Returns the `pack build` arguments.
    #[must_use]
    pub fn pack_build_args(&self) -> Vec<String> {
        let signature = self.signature_type.builder_name();
        let mut args = vec![
            "build".to_string(),
            IMAGE.to_string(),
            "--builder".to_string(),
            self.builder_image(),
            "--path".to_string(),
            self.source.clone(),
        ];
        for entry in [
            format!("GOOGLE_FUNCTION_TARGET={}", self.target),
            format!("GOOGLE_FUNCTION_SIGNATURE_TYPE={signature}"),
            format!("GOOGLE_RUNTIME={}", self.runtime),
            format!("X_GOOGLE_TARGET_PLATFORM={TARGET_PLATFORM}"),
        ] {
            args.push("--env".to_string());
            args.push(entry);
        }
        args
    }

    /// Returns the `docker run` arguments; docker writes the id to `cidfile`.
    #[must_use]
    pub fn docker_run_args(&self, cidfile: &Path) -> Vec<String> {
        let signature = self.signature_type.builder_name();
        let mut args = vec![
            "run".to_string(),
            "--network=host".to_string(),
            format!("--cidfile={}", cidfile.display()),
            format!("--env=FUNCTION_TARGET={}", self.target),
            format!("--env=FUNCTION_SIGNATURE_TYPE={signature}"),
        ];
        args.extend(
            self.envs
                .iter()
                .filter(|entry| !entry.trim().is_empty())
                .map(|entry| format!("--env={entry}")),
        );
        args.push(IMAGE.to_string());
        args
    }
}

/// State of a started container.
#[derive(Debug)]
struct RunningContainer {
    /// `docker run` process.
    run: Child,
    /// Container id.
    id: String,
    /// File docker wrote the container id to.
    cidfile: PathBuf,
    /// Stdout log path.
    stdout: PathBuf,
    /// Stderr log path.
    stderr: PathBuf,
    /// Output file name inside the workspace.
    output_file: PathBuf,
}

// ============================================================================
// SECTION: Server
// ============================================================================

/// Function built with buildpacks and served from a container.
#[derive(Debug)]
pub struct ContainerFunctionServer {
    /// Build inputs.
    build: ContainerBuild,
    /// Wait after `docker run` before the server is considered up.
    start_delay: Duration,
    /// Running container, if started.
    running: Option<RunningContainer>,
}

impl ContainerFunctionServer {
    /// Creates a container server.
    #[must_use]
    pub const fn new(build: ContainerBuild, start_delay: Duration) -> Self {
        Self {
            build,
            start_delay,
            running: None,
        }
    }

    /// Pulls the builder and builds the function image.
    fn build_image(&self) -> Result<(), ServerError> {
        run_tool(DOCKER, &["pull".to_string(), self.build.builder_image()])?;
        run_tool(PACK, &self.build.pack_build_args())?;
        Ok(())
    }

}

/// Returns a cidfile path unique to this validator process.
///
/// Docker refuses to overwrite an existing cidfile, so a stale one is removed.
fn prepare_cidfile() -> Result<PathBuf, ServerError> {
    let path = env::temp_dir().join(format!("{IMAGE}-{}.cid", process::id()));
    match fs::remove_file(&path) {
        Ok(()) => Ok(path),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(path),
        Err(err) => Err(ServerError::io(&path, &err)),
    }
}

/// Reads the container id docker wrote to `cidfile`.
fn read_container_id(cidfile: &Path) -> Result<String, ServerError> {
    let id = fs::read_to_string(cidfile).map_err(|err| ServerError::io(cidfile, &err))?;
    let id = id.trim();
    if id.is_empty() {
        return Err(ServerError::Io {
            path: cidfile.display().to_string(),
            message: "container id file is empty".to_string(),
        });
    }
    Ok(id.to_string())
}

impl FunctionServer for ContainerFunctionServer {
    fn start(&mut self, paths: &RunPaths) -> Result<(), ServerError> {
        if self.running.is_some() {
            return Ok(());
        }
        self.build_image().map_err(|err| ServerError::Build(err.to_string()))?;
        File::create(&paths.stdout).map_err(|err| ServerError::io(&paths.stdout, &err))?;
        File::create(&paths.stderr).map_err(|err| ServerError::io(&paths.stderr, &err))?;

        let cidfile = prepare_cidfile().map_err(|err| ServerError::Run(err.to_string()))?;
        let mut run = Command::new(DOCKER)
            .args(self.build.docker_run_args(&cidfile))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|err| ServerError::Run(format!("spawning {DOCKER}: {err}")))?;
        thread::sleep(self.start_delay);
        if let Ok(Some(status)) = run.try_wait() {
            let _ = fs::remove_file(&cidfile);
            return Err(ServerError::Run(format!("docker run exited: {status}")));
        }
        let id = match read_container_id(&cidfile) {
            Ok(id) => id,
            Err(err) => {
                let _ = run.kill();
                let _ = run.wait();
                let _ = fs::remove_file(&cidfile);
                return Err(ServerError::Run(err.to_string()));
            }
        };
        self.running = Some(RunningContainer {
            run,
            id,
            cidfile,
            stdout: paths.stdout.clone(),
            stderr: paths.stderr.clone(),
            output_file: paths.output_file.clone(),
        });
        Ok(())
    }

    fn fetch_output(&self) -> Result<Vec<u8>, ServerError> {
        let running = self.running.as_ref().ok_or(ServerError::NotRunning)?;
        let name = running.output_file.file_name().ok_or_else(|| ServerError::Io {
            path: running.output_file.display().to_string(),
            message: "output path has no file name".to_string(),
        })?;
        let source = format!("{}:{WORKSPACE_DIR}/{}", running.id, name.to_string_lossy());
        let destination = env::temp_dir();
        run_tool(DOCKER, &["cp".to_string(), source, destination.display().to_string()])?;
        let copied = destination.join(name);
        fs::read(&copied).map_err(|err| ServerError::io(&copied, &err))
    }

    fn shutdown(&mut self) -> Result<(), ServerError> {
        let Some(mut running) = self.running.take() else {
            return Ok(());
        };
        let logs = write_logs(&running);
        let killed_run = running
            .run
            .kill()
            .and_then(|()| running.run.wait().map(|_| ()))
            .map_err(|err| ServerError::Stop(format!("failed to kill process: {err}")));
        let killed_container = run_tool(DOCKER, &["kill".to_string(), running.id.clone()]).map(|_| ());
        let _ = fs::remove_file(&running.cidfile);
        logs.and(killed_run).and(killed_container)
    }

    fn describe(&self) -> String {
        format!("container {IMAGE} built from {}", self.build.source)
    }
}

impl Drop for ContainerFunctionServer {
    fn drop(&mut self) {
        let _ = self.shutdown();
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Writes `docker logs` output into the run's log files.
fn write_logs(running: &RunningContainer) -> Result<(), ServerError> {
    let stdout =
        File::create(&running.stdout).map_err(|err| ServerError::io(&running.stdout, &err))?;
    let stderr =
        File::create(&running.stderr).map_err(|err| ServerError::io(&running.stderr, &err))?;
    let args = ["logs".to_string(), running.id.clone()];
    let status = Command::new(DOCKER)
        .args(&args)
        .stdin(Stdio::null())
        .stdout(Stdio::from(stdout))
        .stderr(Stdio::from(stderr))
        .status()
        .map_err(|err| ServerError::Command {
            command: render_command(DOCKER, &args),
            message: err.to_string(),
        })?;
    if status.success() {
        Ok(())
    } else {
        Err(ServerError::Command {
            command: render_command(DOCKER, &args),
            message: status.to_string(),
        })
    }
}
