//! Runner configuration.
//!
//! Values come from (in increasing priority) built-in defaults, an optional
//! TOML file, `KODEGEN_IB_*` environment variables and command line flags.

use crate::error::{ConfigError, Result};
use crate::retry::RetryPolicy;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Upper bound for the pull retry count
pub const MAX_RETRIES: u32 = 20;

/// Configuration for a single image builder invocation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RunnerConfig {
    /// Container runtime CLI (e.g. "docker")
    pub runtime: String,

    /// Repository root; every command runs with this as working directory
    pub repo_root: PathBuf,

    /// Tag of the derived image that embeds the repository contents
    pub derived_image: String,

    /// Build file used for the derived image, relative to `repo_root`
    pub build_file: PathBuf,

    /// Build context for the derived image, relative to `repo_root`
    pub build_context: PathBuf,

    /// Build argument that receives the runner base image tag
    pub build_arg: String,

    /// Container runtime socket, bind-mounted into the runner container
    pub socket_path: String,

    /// Directory the runner payload is extracted into, relative to `repo_root`
    pub local_runner_dir: PathBuf,

    /// Executable inside `local_runner_dir`
    pub local_executable: String,

    /// Location of the runner payload inside the runner image
    pub payload_path: String,

    /// Prefix of generated container names
    pub container_prefix: String,

    /// Logical role to image tag mapping, relative to `repo_root`
    pub image_names_file: PathBuf,

    /// Retry behavior for pulls
    pub retry: RetrySettings,
}

/// Retry settings as written in the configuration file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RetrySettings {
    /// Retries after the first failed attempt
    pub max_retries: u32,
    /// Wait before the first retry, in seconds
    pub initial_backoff_secs: u64,
    /// Upper bound for any single wait, in seconds
    pub max_backoff_secs: u64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_retries: 5,
            initial_backoff_secs: 1,
            max_backoff_secs: 60,
        }
    }
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            runtime: "docker".to_string(),
            repo_root: PathBuf::from("."),
            derived_image: "imagebuilder-withrepo".to_string(),
            build_file: PathBuf::from("eng/common/Dockerfile.WithRepo"),
            build_context: PathBuf::from("."),
            build_arg: "IMAGE".to_string(),
            socket_path: "/var/run/docker.sock".to_string(),
            local_runner_dir: PathBuf::from(".image-builder"),
            local_executable: "ImageBuilder.exe".to_string(),
            payload_path: "/image-builder".to_string(),
            container_prefix: "ImageBuilder".to_string(),
            image_names_file: PathBuf::from("eng/image-names.toml"),
            retry: RetrySettings::default(),
        }
    }
}

impl RunnerConfig {
    /// Load configuration from an optional TOML file, then apply environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env();
        Ok(config)
    }

    /// Parse a TOML configuration file; missing keys keep their defaults.
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&contents).map_err(|e| {
            ConfigError::Parse {
                path: path.to_path_buf(),
                reason: e.to_string(),
            }
            .into()
        })
    }

    /// Apply `KODEGEN_IB_*` environment variable overrides
    pub fn apply_env(&mut self) {
        self.apply_overrides(|name| std::env::var(name).ok());
    }

    /// Apply `KODEGEN_IB_*` overrides resolved through `lookup`; blank values are ignored.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |name: &str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        if let Some(runtime) = non_empty("KODEGEN_IB_RUNTIME") {
            self.runtime = runtime;
        }
        if let Some(image) = non_empty("KODEGEN_IB_DERIVED_IMAGE") {
            self.derived_image = image;
        }
        if let Some(socket) = non_empty("KODEGEN_IB_SOCKET") {
            self.socket_path = socket;
        }
        self.retry.max_retries = parse_retries(
            non_empty("KODEGEN_IB_RETRIES").as_deref(),
            self.retry.max_retries,
            MAX_RETRIES,
        );
    }

    /// Validate values before any external command is issued
    pub fn validate(&self) -> Result<()> {
        let required = [
            ("runtime", self.runtime.as_str()),
            ("derived_image", self.derived_image.as_str()),
            ("build_arg", self.build_arg.as_str()),
            ("socket_path", self.socket_path.as_str()),
            ("local_executable", self.local_executable.as_str()),
            ("payload_path", self.payload_path.as_str()),
            ("container_prefix", self.container_prefix.as_str()),
        ];
        for (key, value) in required {
            if value.trim().is_empty() {
                return Err(invalid(key, "must not be empty"));
            }
        }

        let paths = [
            ("repo_root", &self.repo_root),
            ("build_file", &self.build_file),
            ("build_context", &self.build_context),
            ("local_runner_dir", &self.local_runner_dir),
            ("image_names_file", &self.image_names_file),
        ];
        for (key, value) in paths {
            if value.as_os_str().is_empty() {
                return Err(invalid(key, "must not be empty"));
            }
        }

        if self.container_prefix.chars().any(char::is_whitespace) {
            return Err(invalid("container_prefix", "must not contain whitespace"));
        }

        if self.retry.max_retries > MAX_RETRIES {
            return Err(invalid(
                "retry.max_retries",
                &format!("{} is too high (max: {})", self.retry.max_retries, MAX_RETRIES),
            ));
        }
        if self.retry.initial_backoff_secs > self.retry.max_backoff_secs {
            return Err(invalid(
                "retry.initial_backoff_secs",
                "must not exceed retry.max_backoff_secs",
            ));
        }
        Ok(())
    }

    /// Retry policy for pulls
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.retry.max_retries,
            initial_backoff: Duration::from_secs(self.retry.initial_backoff_secs),
            max_backoff: Duration::from_secs(self.retry.max_backoff_secs),
        }
    }

    /// Path of the extracted runner executable
    pub fn local_executable_path(&self) -> PathBuf {
        self.repo_root
            .join(&self.local_runner_dir)
            .join(&self.local_executable)
    }

    /// Path of the extraction directory
    pub fn local_runner_path(&self) -> PathBuf {
        self.repo_root.join(&self.local_runner_dir)
    }

    /// Path of the image names file
    pub fn image_names_path(&self) -> PathBuf {
        self.repo_root.join(&self.image_names_file)
    }
}

fn invalid(key: &str, reason: &str) -> crate::error::RunnerError {
    ConfigError::InvalidValue {
        key: key.to_string(),
        reason: reason.to_string(),
    }
    .into()
}

/// Parse a retry count, clamped to `max`; unparsable values keep `default`
fn parse_retries(value: Option<&str>, default: u32, max: u32) -> u32 {
    value
        .and_then(|s| s.trim().parse::<u32>().ok())
        .map(|v| v.min(max))
        .unwrap_or(default)
}
