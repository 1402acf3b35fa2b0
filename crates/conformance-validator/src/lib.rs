// crates/conformance-validator/src/lib.rs
// ============================================================================
// Module: Conformance Validator Library
// Description: Runs a function under test through the conformance matrix.
// Purpose: Compose configuration, servers, transport, benchmark and judging.
// Dependencies: conformance-events, reqwest, serde, thiserror, toml, url
// ============================================================================

//! ## Overview
//! The validator starts a function locally or in a container, drives it with
//! HTTP requests or events, and judges the output it writes using
//! [`conformance_events`]. [`ValidationOrchestrator`] owns one run;
//! [`ValidatorConfig`] describes it.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod benchmark;
pub mod canned;
pub mod config;
pub mod log;
pub mod orchestrator;
pub mod server;
pub mod transport;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use benchmark::BenchmarkError;
pub use benchmark::BenchmarkSample;
pub use benchmark::ConcurrencyBenchmark;
pub use benchmark::Elapsed;
pub use benchmark::Slot;
pub use config::ConfigError;
pub use config::ConfigOverrides;
pub use config::LogFormat;
pub use config::RunPaths;
pub use config::ServerOverride;
pub use config::ServerSpec;
pub use config::SignatureType;
pub use config::ValidatorConfig;
pub use log::FileRunLog;
pub use log::MemoryRunLog;
pub use log::NoopRunLog;
pub use log::RunEvent;
pub use log::RunLog;
pub use log::RunPhase;
pub use log::StderrRunLog;
pub use orchestrator::FailureReport;
pub use orchestrator::RunFailure;
pub use orchestrator::RunSummary;
pub use orchestrator::ValidationError;
pub use orchestrator::ValidationOrchestrator;
pub use server::ContainerFunctionServer;
pub use server::FunctionServer;
pub use server::LocalFunctionServer;
pub use server::ServerError;
pub use server::build_server;
pub use transport::Delivery;
pub use transport::HttpTransport;
pub use transport::Transport;
pub use transport::TransportError;
