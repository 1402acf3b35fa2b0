// crates/conformance-validator/src/config.rs
// ============================================================================
// Module: Validator Configuration
// Description: Layered, validated configuration for one validation run.
// Purpose: Resolve defaults, TOML file, environment and CLI overrides once.
// Dependencies: conformance-events, serde, toml, url, thiserror
// ============================================================================

//! ## Overview
//! [`ValidatorConfig`] is built once before a run and handed to the
//! orchestrator by value. Layers apply lowest precedence first: built-in
//! defaults, an optional TOML file, environment overrides, then
//! [`ConfigOverrides`] from the command line. [`ValidatorConfig::validate`]
//! fails closed on anything the run could not honor.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::env;
use std::fmt;
use std::fs;
use std::path::Path;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use conformance_events::Encoding;
use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;
use url::Url;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Environment variable naming the TOML config file.
pub const CONFIG_ENV_VAR: &str = "FUNCTION_CONFORMANCE_CONFIG";
/// Environment variable overriding the target URL.
pub const URL_ENV_VAR: &str = "FUNCTION_CONFORMANCE_URL";
/// Environment variable overriding the start delay in seconds.
pub const START_DELAY_ENV_VAR: &str = "FUNCTION_CONFORMANCE_START_DELAY_SEC";
/// Maximum configuration file size in bytes.
pub(crate) const MAX_CONFIG_FILE_SIZE: usize = 64 * 1024;
/// Default function URL.
pub const DEFAULT_URL: &str = "http://localhost:8080";
/// Default server stdout log file.
pub const DEFAULT_STDOUT_LOG: &str = "serverlog_stdout.txt";
/// Default server stderr log file.
pub const DEFAULT_STDERR_LOG: &str = "serverlog_stderr.txt";
/// Default function output file.
pub const DEFAULT_OUTPUT_FILE: &str = "function_output.json";
/// Default builder image tag.
pub const DEFAULT_BUILDER_TAG: &str = "latest";
/// Default seconds to wait after starting the server.
pub(crate) const DEFAULT_START_DELAY_SEC: u64 = 1;
/// Default number of concurrent benchmark requests.
pub(crate) const DEFAULT_FAN_OUT: usize = 10;
/// Default allowed ratio of concurrent to baseline duration.
pub(crate) const DEFAULT_SCALING_FACTOR: u32 = 2;
/// Default minimum single-request duration in milliseconds.
pub(crate) const DEFAULT_MIN_BASELINE_MS: u64 = 1_000;

// ============================================================================
// SECTION: Enumerations
// ============================================================================

/// Function signature under validation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SignatureType {
    /// Plain HTTP request/response.
    #[default]
    Http,
    /// CloudEvent handler.
    Cloudevent,
    /// Legacy background-event handler.
    Legacyevent,
}

impl SignatureType {
    /// Returns the flag spelling of the signature type.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Http => "http",
            Self::Cloudevent => "cloudevent",
            Self::Legacyevent => "legacyevent",
        }
    }

    /// Returns the signature name understood by function builders.
    #[must_use]
    pub const fn builder_name(self) -> &'static str {
        match self {
            Self::Http => "http",
            Self::Cloudevent => "cloudevent",
            Self::Legacyevent => "event",
        }
    }

    /// Returns the event encoding the function emits, if any.
    #[must_use]
    pub const fn encoding(self) -> Option<Encoding> {
        match self {
            Self::Http => None,
            Self::Cloudevent => Some(Encoding::CloudEvent),
            Self::Legacyevent => Some(Encoding::Legacy),
        }
    }
}

impl fmt::Display for SignatureType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SignatureType {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "http" => Ok(Self::Http),
            "cloudevent" => Ok(Self::Cloudevent),
            "legacyevent" => Ok(Self::Legacyevent),
            other => Err(ConfigError::Invalid(format!(
                "expected type to be one of 'http', 'cloudevent', or 'legacyevent', got {other}"
            ))),
        }
    }
}

/// Rendering of run log events on stderr.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Text,
    /// One JSON object per line.
    Json,
}

impl FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Invalid(format!("unknown log format: {other}"))),
        }
    }
}

// ============================================================================
// SECTION: Sections
// ============================================================================

/// How the function under test is brought up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ServerSpec {
    /// Local command serving the function.
    Local {
        /// Whitespace-separated command line.
        cmd: String,
    },
    /// Function built into a container with buildpacks.
    Container {
        /// Function source directory.
        source: String,
        /// Function entry point name.
        target: String,
        /// Language runtime identifier.
        runtime: String,
        /// Builder image tag.
        #[serde(default = "default_builder_tag")]
        tag: String,
        /// Extra `KEY=VALUE` runtime environment entries.
        #[serde(default)]
        envs: Vec<String>,
    },
}

impl Default for ServerSpec {
    fn default() -> Self {
        Self::Local {
            cmd: String::new(),
        }
    }
}

impl ServerSpec {
    /// Validates the server section.
    fn validate(&self) -> Result<(), ConfigError> {
        match self {
            Self::Local {
                cmd,
            } => {
                if cmd.trim().is_empty() {
                    return Err(ConfigError::Invalid("local server requires a command".to_string()));
                }
            }
            Self::Container {
                source,
                target,
                runtime,
                tag,
                ..
            } => {
                for (label, value) in
                    [("source", source), ("target", target), ("runtime", runtime), ("tag", tag)]
                {
                    if value.trim().is_empty() {
                        return Err(ConfigError::Invalid(format!(
                            "container server requires a non-empty {label}"
                        )));
                    }
                }
            }
        }
        Ok(())
    }
}

/// Files written during a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RunPaths {
    /// Server stdout capture.
    pub stdout: PathBuf,
    /// Server stderr capture.
    pub stderr: PathBuf,
    /// Function output file.
    pub output_file: PathBuf,
}

impl Default for RunPaths {
    fn default() -> Self {
        Self {
            stdout: PathBuf::from(DEFAULT_STDOUT_LOG),
            stderr: PathBuf::from(DEFAULT_STDERR_LOG),
            output_file: PathBuf::from(DEFAULT_OUTPUT_FILE),
        }
    }
}

impl RunPaths {
    /// Rejects empty or colliding paths.
    fn validate(&self) -> Result<(), ConfigError> {
        let paths = [&self.stdout, &self.stderr, &self.output_file];
        if paths.iter().any(|path| path.as_os_str().is_empty()) {
            return Err(ConfigError::Invalid("run paths must not be empty".to_string()));
        }
        if self.stdout == self.stderr
            || self.stdout == self.output_file
            || self.stderr == self.output_file
        {
            return Err(ConfigError::Invalid(
                "stdout, stderr and output paths must be distinct".to_string(),
            ));
        }
        Ok(())
    }
}

/// Concurrency benchmark thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BenchmarkConfig {
    /// Number of concurrent requests.
    pub fan_out: usize,
    /// Allowed ratio of concurrent to baseline duration.
    pub scaling_factor: u32,
    /// Minimum single-request duration in milliseconds.
    pub min_baseline_ms: u64,
}

impl Default for BenchmarkConfig {
    fn default() -> Self {
        Self {
            fan_out: DEFAULT_FAN_OUT,
            scaling_factor: DEFAULT_SCALING_FACTOR,
            min_baseline_ms: DEFAULT_MIN_BASELINE_MS,
        }
    }
}

impl BenchmarkConfig {
    /// Returns the minimum baseline as a duration.
    #[must_use]
    pub const fn min_baseline(&self) -> Duration {
        Duration::from_millis(self.min_baseline_ms)
    }

    /// Validates benchmark thresholds.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.fan_out == 0 {
            return Err(ConfigError::Invalid("benchmark fan_out must be positive".to_string()));
        }
        if self.scaling_factor == 0 {
            return Err(ConfigError::Invalid(
                "benchmark scaling_factor must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

// ============================================================================
// SECTION: Root Configuration
// ============================================================================

/// Complete configuration for one validation run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ValidatorConfig {
    /// Signature type under validation.
    #[serde(rename = "type")]
    pub signature_type: SignatureType,
    /// Function URL.
    pub url: String,
    /// Also validate the cross-encoding mapping direction.
    pub validate_mapping: bool,
    /// Run the concurrency benchmark instead of the scenario matrix.
    pub validate_concurrency: bool,
    /// Seconds to wait after starting the server.
    pub start_delay_sec: u64,
    /// Files written during the run.
    pub paths: RunPaths,
    /// Function server selection.
    pub server: ServerSpec,
    /// Benchmark thresholds.
    pub benchmark: BenchmarkConfig,
    /// Run log rendering.
    pub log_format: LogFormat,
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            signature_type: SignatureType::default(),
            url: DEFAULT_URL.to_string(),
            validate_mapping: true,
            validate_concurrency: false,
            start_delay_sec: DEFAULT_START_DELAY_SEC,
            paths: RunPaths::default(),
            server: ServerSpec::default(),
            benchmark: BenchmarkConfig::default(),
            log_format: LogFormat::default(),
        }
    }
}

impl ValidatorConfig {
    /// Parses TOML text over the built-in defaults without validating.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] when the text is not a valid config.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        toml::from_str(text).map_err(|err| ConfigError::Parse(err.to_string()))
    }

    /// Loads the config file named explicitly or by [`CONFIG_ENV_VAR`].
    ///
    /// Returns the defaults when neither names a file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the file cannot be read or parsed.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let resolved = path
            .map(Path::to_path_buf)
            .or_else(|| env::var_os(CONFIG_ENV_VAR).map(PathBuf::from));
        let Some(resolved) = resolved else {
            return Ok(Self::default());
        };
        let bytes = fs::read(&resolved)
            .map_err(|err| ConfigError::Io(format!("{}: {err}", resolved.display())))?;
        if bytes.len() > MAX_CONFIG_FILE_SIZE {
            return Err(ConfigError::Invalid("config file exceeds size limit".to_string()));
        }
        let content = std::str::from_utf8(&bytes)
            .map_err(|_| ConfigError::Invalid("config file must be utf-8".to_string()))?;
        Self::from_toml_str(content)
    }

    /// Resolves the full layer stack and validates the result.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when any layer fails or the result is invalid.
    pub fn resolve(
        path: Option<&Path>,
        lookup: impl Fn(&str) -> Option<String>,
        overrides: ConfigOverrides,
    ) -> Result<Self, ConfigError> {
        let mut config = Self::load(path)?;
        config.apply_env(lookup)?;
        overrides.apply(&mut config);
        config.validate()?;
        Ok(config)
    }

    /// Applies environment overrides read through `lookup`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when an override does not parse.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<(), ConfigError> {
        if let Some(url) = lookup(URL_ENV_VAR) {
            self.url = url;
        }
        if let Some(delay) = lookup(START_DELAY_ENV_VAR) {
            self.start_delay_sec = delay.trim().parse().map_err(|_| {
                ConfigError::Invalid(format!("{START_DELAY_ENV_VAR} must be whole seconds"))
            })?;
        }
        Ok(())
    }

    /// Validates the configuration for internal consistency.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when the configuration is unusable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let url = Url::parse(&self.url)
            .map_err(|err| ConfigError::Invalid(format!("invalid url {}: {err}", self.url)))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ConfigError::Invalid(format!(
                "url scheme must be http or https, got {}",
                url.scheme()
            )));
        }
        self.server.validate()?;
        self.paths.validate()?;
        self.benchmark.validate()?;
        Ok(())
    }

    /// Returns the start delay as a duration.
    #[must_use]
    pub const fn start_delay(&self) -> Duration {
        Duration::from_secs(self.start_delay_sec)
    }
}

// ============================================================================
// SECTION: Overrides
// ============================================================================

/// Command-line overrides; `None` leaves the lower layer untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigOverrides {
    /// Signature type override.
    pub signature_type: Option<SignatureType>,
    /// URL override.
    pub url: Option<String>,
    /// Mapping validation override.
    pub validate_mapping: Option<bool>,
    /// Benchmark mode override.
    pub validate_concurrency: Option<bool>,
    /// Start delay override in seconds.
    pub start_delay_sec: Option<u64>,
    /// Server selection override.
    pub server: Option<ServerOverride>,
    /// Stdout log path override.
    pub stdout: Option<PathBuf>,
    /// Stderr log path override.
    pub stderr: Option<PathBuf>,
    /// Output file override.
    pub output_file: Option<PathBuf>,
    /// Log format override.
    pub log_format: Option<LogFormat>,
}

impl ConfigOverrides {
    /// Writes every present override into `config`.
    pub fn apply(self, config: &mut ValidatorConfig) {
        if let Some(value) = self.signature_type {
            config.signature_type = value;
        }
        if let Some(value) = self.url {
            config.url = value;
        }
        if let Some(value) = self.validate_mapping {
            config.validate_mapping = value;
        }
        if let Some(value) = self.validate_concurrency {
            config.validate_concurrency = value;
        }
        if let Some(value) = self.start_delay_sec {
            config.start_delay_sec = value;
        }
        if let Some(value) = self.server {
            value.apply(&mut config.server);
        }
        if let Some(value) = self.stdout {
            config.paths.stdout = value;
        }
        if let Some(value) = self.stderr {
            config.paths.stderr = value;
        }
        if let Some(value) = self.output_file {
            config.paths.output_file = value;
        }
        if let Some(value) = self.log_format {
            config.log_format = value;
        }
    }
}

/// Server selection from the command line.
///
/// A container override keeps the lower layer's container fields for every
/// value it leaves as `None`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerOverride {
    /// Replace the server with a local command.
    Local {
        /// Whitespace-separated command line.
        cmd: String,
    },
    /// Select the container server, replacing the given fields.
    Container {
        /// Function source directory.
        source: Option<String>,
        /// Function entry point name.
        target: Option<String>,
        /// Language runtime identifier.
        runtime: Option<String>,
        /// Builder image tag.
        tag: Option<String>,
        /// Runtime environment entries.
        envs: Option<Vec<String>>,
    },
}

impl ServerOverride {
    /// Merges the override into `server`.
    fn apply(self, server: &mut ServerSpec) {
        match self {
            Self::Local {
                cmd,
            } => {
                *server = ServerSpec::Local {
                    cmd,
                };
            }
            Self::Container {
                source,
                target,
                runtime,
                tag,
                envs,
            } => {
                if matches!(server, ServerSpec::Local { .. }) {
                    *server = ServerSpec::Container {
                        source: String::new(),
                        target: String::new(),
                        runtime: String::new(),
                        tag: default_builder_tag(),
                        envs: Vec::new(),
                    };
                }
                if let ServerSpec::Container {
                    source: base_source,
                    target: base_target,
                    runtime: base_runtime,
                    tag: base_tag,
                    envs: base_envs,
                } = server
                {
                    replace_if_some(base_source, source);
                    replace_if_some(base_target, target);
                    replace_if_some(base_runtime, runtime);
                    replace_if_some(base_tag, tag);
                    replace_if_some(base_envs, envs);
                }
            }
        }
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Configuration errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// I/O failure while reading configuration.
    #[error("config io error: {0}")]
    Io(String),
    /// TOML parsing error.
    #[error("config parse error: {0}")]
    Parse(String),
    /// Invalid configuration data.
    #[error("invalid config: {0}")]
    Invalid(String),
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Overwrites `slot` when a value is present.
fn replace_if_some<T>(slot: &mut T, value: Option<T>) {
    if let Some(value) = value {
        *slot = value;
    }
}

/// Default builder tag for serde.
fn default_builder_tag() -> String {
    DEFAULT_BUILDER_TAG.to_string()
}
