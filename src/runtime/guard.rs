//! RAII backstop for managed container removal.
//!
//! The orchestrator removes containers explicitly in its cleanup stage, where
//! failures can be reported. This guard only covers the paths that never reach
//! that stage: a panic, or the invocation future being dropped mid-flight
//! (e.g. Ctrl-C).

use super::command::RuntimeCommand;
use log::{debug, warn};
use std::fmt;
use std::process::{Command, Stdio};
use std::sync::Arc;
use std::time::Duration;
use wait_timeout::ChildExt;

/// How long a best-effort removal may take before it is abandoned
pub const GUARD_REMOVE_TIMEOUT: Duration = Duration::from_secs(5);

/// Issues a removal command from `Drop`, where nothing can be awaited.
///
/// Implementations must not panic; failures are logged and swallowed.
pub trait ContainerRemover: fmt::Debug + Send + Sync {
    /// Run `command` to completion or give up
    fn remove_blocking(&self, command: &RuntimeCommand);
}

/// Runs the removal as a child process bounded by [`GUARD_REMOVE_TIMEOUT`]
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessRemover;

impl ContainerRemover for ProcessRemover {
    fn remove_blocking(&self, command: &RuntimeCommand) {
        // spawn() + wait_timeout() instead of output() so an unresponsive daemon cannot hang us
        let mut child = match Command::new(command.program())
            .args(command.arguments())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
        {
            Ok(child) => child,
            Err(e) => {
                warn!("Could not launch '{}': {}", command, e);
                return;
            }
        };

        match child.wait_timeout(GUARD_REMOVE_TIMEOUT) {
            Ok(Some(status)) => {
                if !status.success() {
                    warn!(
                        "Failed: '{}' (exit code: {})",
                        command,
                        status.code().unwrap_or(-1)
                    );
                }
            }
            Ok(None) => {
                let _ = child.kill();
                let _ = child.wait();

                warn!(
                    "Timed out after {} seconds: '{}'. The container daemon may be down.",
                    GUARD_REMOVE_TIMEOUT.as_secs(),
                    command
                );
            }
            Err(_) => {
                let _ = child.kill();
                let _ = child.wait();
            }
        }
    }
}

/// Issues its removal command through a [`ContainerRemover`] when dropped while armed.
#[derive(Debug)]
pub struct ContainerGuard {
    remover: Arc<dyn ContainerRemover>,
    removal: RuntimeCommand,
    armed: bool,
}

impl ContainerGuard {
    /// Armed guard that runs `removal` on drop
    pub fn arm(remover: Arc<dyn ContainerRemover>, removal: RuntimeCommand) -> Self {
        Self {
            remover,
            removal,
            armed: true,
        }
    }

    /// Stop the guard from acting on drop; the caller has taken over removal.
    pub fn disarm(&mut self) {
        self.armed = false;
    }

    /// Whether dropping the guard would remove the container
    pub fn is_armed(&self) -> bool {
        self.armed
    }
}

impl Drop for ContainerGuard {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }

        debug!("Guard executing: '{}'", self.removal);
        self.remover.remove_blocking(&self.removal);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Debug, Default)]
    struct Recording(Mutex<Vec<String>>);

    impl ContainerRemover for Recording {
        fn remove_blocking(&self, command: &RuntimeCommand) {
            self.0.lock().unwrap().push(command.to_string());
        }
    }

    fn removal() -> RuntimeCommand {
        RuntimeCommand::new("docker").args(["container", "rm", "-f", "c1"])
    }

    #[test]
    fn test_armed_guard_removes_once_on_drop() {
        let remover = Arc::new(Recording::default());
        let guard = ContainerGuard::arm(remover.clone(), removal());
        assert!(guard.is_armed());
        drop(guard);
        assert_eq!(*remover.0.lock().unwrap(), ["docker container rm -f c1"]);
    }

    #[test]
    fn test_disarmed_guard_does_nothing() {
        let remover = Arc::new(Recording::default());
        let mut guard = ContainerGuard::arm(remover.clone(), removal());
        guard.disarm();
        assert!(!guard.is_armed());
        drop(guard);
        assert!(remover.0.lock().unwrap().is_empty());
    }

    #[test]
    fn test_process_remover_tolerates_missing_runtime() {
        ProcessRemover.remove_blocking(&RuntimeCommand::new("kodegen-no-such-runtime").args([
            "container",
            "rm",
            "-f",
            "c1",
        ]));
    }
}
