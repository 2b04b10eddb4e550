//! Execution of external commands.
//!
//! [`CommandExecutor`] is the seam between the orchestrator and the container
//! runtime: production code uses [`ProcessExecutor`], tests substitute a
//! recording implementation.

use super::command::RuntimeCommand;
use crate::cli::OutputManager;
use crate::error::{CommandError, RunnerError};
use log::{debug, info};
use std::future::Future;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;

/// Exit status and captured output of one command
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// Exit code, `None` when terminated by a signal
    pub code: Option<i32>,
    /// Captured stdout (empty unless the command asked for capture)
    pub stdout: String,
}

impl CommandOutput {
    /// Output of a command that exited with `code`
    pub fn exited(code: i32) -> Self {
        Self {
            code: Some(code),
            stdout: String::new(),
        }
    }

    /// Whether the command exited with status zero
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

/// Runs external commands to completion, one at a time
pub trait CommandExecutor: Send + Sync {
    /// Run `command` and wait for it to exit.
    ///
    /// `Err` means the command could not be started; a started command that
    /// fails is reported through [`CommandOutput::code`].
    fn execute(
        &self,
        command: &RuntimeCommand,
    ) -> impl Future<Output = std::io::Result<CommandOutput>> + Send;
}

/// Run `command` and convert every failure into a stage error citing the command text.
pub async fn run_checked<E, F>(
    executor: &E,
    command: &RuntimeCommand,
    stage: F,
) -> Result<CommandOutput, RunnerError>
where
    E: CommandExecutor + ?Sized,
    F: Fn(CommandError) -> RunnerError,
{
    let text = command.to_string();
    info!("Executing: '{}'", text);

    let output = executor.execute(command).await.map_err(|e| {
        stage(CommandError::Launch {
            command: text.clone(),
            reason: e.to_string(),
        })
    })?;

    match output.code {
        Some(0) => Ok(output),
        Some(code) => Err(stage(CommandError::NonZeroExit {
            command: text,
            code,
        })),
        None => Err(stage(CommandError::Terminated { command: text })),
    }
}

/// Executes commands as child processes rooted in the repository directory
#[derive(Debug, Clone)]
pub struct ProcessExecutor {
    working_dir: PathBuf,
    output: OutputManager,
}

impl ProcessExecutor {
    /// Executor whose children run in `working_dir`
    pub fn new(working_dir: impl Into<PathBuf>, output: OutputManager) -> Self {
        Self {
            working_dir: working_dir.into(),
            output,
        }
    }

    /// Working directory of every child
    pub fn working_dir(&self) -> &Path {
        &self.working_dir
    }

    /// Resolve `program` on PATH, for an early and readable failure
    pub fn locate(program: &str) -> std::io::Result<PathBuf> {
        which::which(program).map_err(|e| {
            std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("'{}' not found on PATH: {}", program, e),
            )
        })
    }
}

impl CommandExecutor for ProcessExecutor {
    async fn execute(&self, command: &RuntimeCommand) -> std::io::Result<CommandOutput> {
        let mut child_command = Command::new(command.program());
        child_command
            .args(command.arguments())
            .current_dir(&self.working_dir)
            .stderr(Stdio::inherit());

        if command.captures_stdout() {
            let output = child_command.stdout(Stdio::piped()).output().await?;
            let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
            debug!("'{}' exited with {:?}", command, output.status.code());
            return Ok(CommandOutput {
                code: output.status.code(),
                stdout,
            });
        }

        let mut child = child_command.stdout(Stdio::piped()).spawn()?;

        // Stream stdout line-by-line; the pipe is read to EOF so the child never sees EPIPE
        if let Some(stdout) = child.stdout.take() {
            let mut reader = BufReader::new(stdout);
            let mut line = Vec::new();

            loop {
                line.clear();
                match reader.read_until(b'\n', &mut line).await {
                    Ok(0) => break,
                    Ok(_) => {
                        let text = String::from_utf8_lossy(&line);
                        let _ = self.output.indent(text.trim_end_matches(['\r', '\n']));
                    }
                    Err(e) => {
                        debug!("Discarding remaining output of '{}': {}", command, e);
                        let _ = tokio::io::copy(&mut reader, &mut tokio::io::sink()).await;
                        break;
                    }
                }
            }
        }

        let status = child.wait().await?;
        debug!("'{}' exited with {:?}", command, status.code());
        Ok(CommandOutput {
            code: status.code(),
            stdout: String::new(),
        })
    }
}
