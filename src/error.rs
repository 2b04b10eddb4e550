//! Error types for image builder invocations.
//!
//! Every failure of an external command is converted into an error that carries
//! the literal command text, so the caller can see exactly what was executed.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for image builder operations
pub type Result<T> = std::result::Result<T, RunnerError>;

/// Main error type for all image builder operations
#[derive(Error, Debug)]
pub enum RunnerError {
    /// Querying the container runtime for its host OS failed
    #[error("Platform query failed: {0}")]
    Platform(CommandError),

    /// Pulling, building or extracting the runner artifact failed
    #[error("Acquisition failed: {0}")]
    Acquisition(CommandError),

    /// The primary runner invocation failed
    #[error("Execution failed: {0}")]
    Execution(CommandError),

    /// Removing the managed container failed
    #[error("Cleanup failed: {0}")]
    Cleanup(CommandError),

    /// The caller-supplied post-execution hook failed
    #[error("Post-execution hook failed for container '{container}': {source}")]
    Hook {
        /// Name of the managed container handed to the hook
        container: String,
        /// Error returned by the hook
        #[source]
        source: anyhow::Error,
    },

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// CLI argument errors
    #[error("CLI error: {0}")]
    Cli(#[from] CliError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic errors from anyhow
    #[error("{0}")]
    Anyhow(#[from] anyhow::Error),
}

/// Failure of a single external command or local acquisition step
#[derive(Error, Debug)]
pub enum CommandError {
    /// Command ran and returned a non-zero exit status
    #[error("Failed: '{command}' (exit code: {code})")]
    NonZeroExit {
        /// Literal command text
        command: String,
        /// Exit code reported by the process
        code: i32,
    },

    /// Command was terminated without an exit code (signal)
    #[error("Failed: '{command}' (terminated by signal)")]
    Terminated {
        /// Literal command text
        command: String,
    },

    /// Command could not be started at all
    #[error("Could not launch '{command}': {reason}")]
    Launch {
        /// Literal command text
        command: String,
        /// Reason for the error
        reason: String,
    },

    /// Local filesystem step failed
    #[error("Failed to {operation} '{}': {reason}", .path.display())]
    Filesystem {
        /// Operation that was attempted
        operation: String,
        /// Path the operation targeted
        path: PathBuf,
        /// Reason for the error
        reason: String,
    },
}

impl CommandError {
    /// Literal command text (or a description of the local step)
    pub fn command(&self) -> String {
        match self {
            CommandError::NonZeroExit { command, .. }
            | CommandError::Terminated { command }
            | CommandError::Launch { command, .. } => command.clone(),
            CommandError::Filesystem {
                operation, path, ..
            } => format!("{} {}", operation, path.display()),
        }
    }
}

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Configuration file could not be read
    #[error("Cannot read {}: {source}", .path.display())]
    Read {
        /// Path of the file
        path: PathBuf,
        /// Underlying IO error
        #[source]
        source: std::io::Error,
    },

    /// Configuration file could not be parsed
    #[error("Cannot parse {}: {reason}", .path.display())]
    Parse {
        /// Path of the file
        path: PathBuf,
        /// Reason for the error
        reason: String,
    },

    /// A configuration value is out of range or empty
    #[error("Invalid value for '{key}': {reason}")]
    InvalidValue {
        /// Configuration key
        key: String,
        /// Reason for the error
        reason: String,
    },

    /// The image-name mapping has no entry for a required role
    #[error("No image configured for role '{role}'")]
    MissingImage {
        /// Logical image role
        role: String,
    },
}

/// CLI-specific errors
#[derive(Error, Debug)]
pub enum CliError {
    /// Invalid command line arguments
    #[error("Invalid arguments: {reason}")]
    InvalidArguments {
        /// Reason for the error
        reason: String,
    },
}

impl RunnerError {
    /// The external command this error originated from, if any
    pub fn failed_command(&self) -> Option<String> {
        match self {
            RunnerError::Platform(e)
            | RunnerError::Acquisition(e)
            | RunnerError::Execution(e)
            | RunnerError::Cleanup(e) => Some(e.command()),
            _ => None,
        }
    }

    /// Get actionable recovery suggestions for this error
    pub fn recovery_suggestions(&self) -> Vec<String> {
        match self {
            RunnerError::Platform(CommandError::Launch { .. }) => vec![
                "Install Docker: https://docs.docker.com/get-docker/".to_string(),
                "Or point KODEGEN_IB_RUNTIME at another docker-compatible CLI".to_string(),
            ],
            RunnerError::Platform(_) => vec![
                "Ensure the container daemon is running: docker version".to_string(),
            ],
            RunnerError::Acquisition(CommandError::NonZeroExit { command, .. })
                if command.contains(" pull ") =>
            {
                vec![
                    "Check registry connectivity and credentials: docker login".to_string(),
                    "Raise the retry budget with --retries or KODEGEN_IB_RETRIES".to_string(),
                ]
            }
            RunnerError::Acquisition(CommandError::Filesystem { path, .. }) => vec![format!(
                "Remove {} manually and try again",
                path.display()
            )],
            RunnerError::Execution(_) if self.is_reuse_candidate() => vec![
                "If the derived image is missing, run again without --reuse-image".to_string(),
            ],
            RunnerError::Cleanup(CommandError::NonZeroExit { command, .. }) => vec![format!(
                "Remove the container manually: {}",
                command
            )],
            RunnerError::Config(ConfigError::MissingImage { role }) => vec![format!(
                "Add an entry for '{}' to the image names file",
                role
            )],
            _ => vec!["Check the error message above for specific details".to_string()],
        }
    }

    fn is_reuse_candidate(&self) -> bool {
        matches!(
            self,
            RunnerError::Execution(CommandError::NonZeroExit { command, .. })
                if command.contains(" run ")
        )
    }

    /// Check if this error is recoverable
    pub fn is_recoverable(&self) -> bool {
        !matches!(
            self,
            RunnerError::Platform(CommandError::Launch { .. })
                | RunnerError::Acquisition(CommandError::Launch { .. })
                | RunnerError::Execution(CommandError::Launch { .. })
                | RunnerError::Cleanup(CommandError::Launch { .. })
                | RunnerError::Config(_)
                | RunnerError::Cli(_)
        )
    }
}
