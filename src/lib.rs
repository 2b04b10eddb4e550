//! # KODEGEN Image Builder
//!
//! Single entry point for running the container image builder on any host.
//!
//! The container runtime is asked for its server OS family first. On Linux
//! hosts the builder runs inside a container built from the builder image
//! plus the repository, with the runtime socket bind-mounted. On every other
//! host the builder executable is extracted once from the Windows builder
//! image and run locally.
//!
//! ## Features
//!
//! - **Platform-aware acquisition**: pull + build, or one-time extraction
//! - **Retried pulls**: exponential backoff for registry operations only
//! - **Post-execution hooks**: run caller logic while the container is alive
//! - **Guaranteed cleanup**: a container whose removal was deferred is removed
//!   exactly once, on every exit path
//!
//! ## Usage
//!
//! ```bash
//! kodegen_image_builder -- build --manifest manifest.json
//! kodegen_image_builder --reuse-image -- build --manifest manifest.json
//! kodegen_image_builder --on-executed "docker cp {container}:/out ./out" -- build
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

// Core modules
pub mod cli;
pub mod config;
pub mod error;
pub mod images;
pub mod orchestrator;
pub mod retry;
pub mod runtime;

// Re-export main types for public API
pub use config::RunnerConfig;
pub use error::{CliError, CommandError, ConfigError, Result, RunnerError};
pub use images::{FileImageNames, ImageNameProvider, ImageNames, ImageRole, StaticImageNames};
pub use orchestrator::{
    ExecutionResult, InvocationContext, ManagedContainer, Orchestrator, PostRunHook, RunRequest,
    RunnerArtifact,
};
pub use retry::{RetryPolicy, retry_with_backoff};
pub use runtime::{
    CommandExecutor, CommandOutput, ContainerRemover, DockerCli, PlatformStrategy, ProcessExecutor,
    ProcessRemover, RuntimeCommand,
};
