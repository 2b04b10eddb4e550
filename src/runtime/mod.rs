//! Container runtime boundary.
//!
//! Everything the orchestrator knows about the container runtime lives here.
//!
//! # Module Structure
//!
//! - `command` - Typed runtime commands and their literal rendering
//! - `executor` - Command execution seam and the process-backed implementation
//! - `guard` - RAII backstop for container removal
//! - `platform` - Host OS family query and strategy selection

mod command;
mod executor;
mod guard;
mod platform;

// Re-export public API
pub use command::{DockerCli, RunSpec, RuntimeCommand, split_options};
pub use executor::{CommandExecutor, CommandOutput, ProcessExecutor, run_checked};
pub use guard::{ContainerGuard, ContainerRemover, GUARD_REMOVE_TIMEOUT, ProcessRemover};
pub use platform::{LINUX_OS_TOKEN, PlatformStrategy, resolve_platform};
