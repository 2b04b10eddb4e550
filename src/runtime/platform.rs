//! Platform resolution.
//!
//! The container runtime reports the OS family of its server; that single
//! answer decides how the runner is acquired and launched.

use super::command::DockerCli;
use super::executor::{CommandExecutor, run_checked};
use crate::error::{RunnerError, Result};
use serde::Serialize;
use std::fmt;

/// OS family token that selects the containerized runner
pub const LINUX_OS_TOKEN: &str = "linux";

/// How the runner is acquired and launched for this invocation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PlatformStrategy {
    /// Runner runs in a container built from the runner image plus the repository
    ContainerizedRunner,
    /// Runner executable is extracted from the runner image and run on the host
    LocalBinaryRunner,
}

impl PlatformStrategy {
    /// Map the runtime's reported OS family; only the exact Linux token is containerized.
    pub fn from_os_family(os: &str) -> Self {
        if os == LINUX_OS_TOKEN {
            PlatformStrategy::ContainerizedRunner
        } else {
            PlatformStrategy::LocalBinaryRunner
        }
    }
}

impl fmt::Display for PlatformStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlatformStrategy::ContainerizedRunner => f.write_str("containerized runner"),
            PlatformStrategy::LocalBinaryRunner => f.write_str("local binary runner"),
        }
    }
}

/// Ask the runtime for its server OS and select a strategy. Not retried.
pub async fn resolve_platform<E>(executor: &E, docker: &DockerCli) -> Result<PlatformStrategy>
where
    E: CommandExecutor,
{
    let output = run_checked(executor, &docker.server_os(), RunnerError::Platform).await?;
    let os = output.stdout.trim();
    let strategy = PlatformStrategy::from_os_family(os);
    log::info!("Container runtime reports '{}': using {}", os, strategy);
    Ok(strategy)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_linux_selects_containerized_runner() {
        assert_eq!(
            PlatformStrategy::from_os_family("linux"),
            PlatformStrategy::ContainerizedRunner
        );
    }

    #[test]
    fn test_everything_else_selects_local_binary() {
        for os in ["windows", "Linux", "LINUX", "linux ", "", "darwin", "linux/amd64"] {
            assert_eq!(
                PlatformStrategy::from_os_family(os),
                PlatformStrategy::LocalBinaryRunner,
                "os family {:?}",
                os
            );
        }
    }
}
