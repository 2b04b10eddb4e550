//! Command line argument parsing and validation.

use crate::config::{MAX_RETRIES, RunnerConfig};
use clap::Parser;
use std::path::PathBuf;

/// Launch the container image builder for this host
#[derive(Parser, Debug)]
#[command(
    name = "kodegen_image_builder",
    version,
    about = "Launch the container image builder for this host",
    long_about = "Acquire and launch the image builder, then remove any container it created.

On Linux container hosts the builder runs in a container built from the builder
image plus the repository. Everywhere else the builder executable is extracted
from the Windows builder image once and run locally.

Usage:
  kodegen_image_builder -- build --manifest manifest.json
  kodegen_image_builder --reuse-image -- build --manifest manifest.json
  kodegen_image_builder --on-executed \"docker cp {container}:/artifacts ./artifacts\" -- build"
)]
pub struct Args {
    /// Repository root (build context and working directory); overrides `repo_root`
    #[arg(long, value_name = "PATH")]
    pub repo: Option<PathBuf>,

    /// TOML configuration file
    #[arg(long, value_name = "PATH", env = "KODEGEN_IB_CONFIG")]
    pub config: Option<PathBuf>,

    /// Image names file (TOML or JSON), relative to the repository root
    #[arg(long, value_name = "PATH")]
    pub image_names: Option<PathBuf>,

    /// Extra options for the runtime's run command, whitespace separated
    #[arg(long, value_name = "OPTS", allow_hyphen_values = true, default_value = "")]
    pub docker_run_options: String,

    /// Reuse the previously built runner image instead of pulling and building
    #[arg(long)]
    pub reuse_image: bool,

    /// Command to run after the builder, while its container still exists;
    /// `{container}` is replaced by the container name
    #[arg(long, value_name = "COMMAND", allow_hyphen_values = true)]
    pub on_executed: Option<String>,

    /// Retry budget for image pulls
    #[arg(long, value_name = "N")]
    pub retries: Option<u32>,

    /// Print the invocation result as JSON
    #[arg(long)]
    pub json: bool,

    /// Arguments passed through to the image builder
    #[arg(last = true, value_name = "BUILDER_ARGS")]
    pub builder_args: Vec<String>,
}

impl Args {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate arguments for consistency
    pub fn validate(&self) -> Result<(), String> {
        if self
            .repo
            .as_ref()
            .is_some_and(|repo| repo.as_os_str().is_empty())
        {
            return Err("Repository path must not be empty".to_string());
        }

        if let Some(retries) = self.retries
            && retries > MAX_RETRIES
        {
            return Err(format!(
                "--retries {} is too high (max: {})",
                retries, MAX_RETRIES
            ));
        }

        if let Some(command) = &self.on_executed
            && command.trim().is_empty()
        {
            return Err("--on-executed requires a command".to_string());
        }

        Ok(())
    }

    /// Apply command line overrides on top of file and environment configuration
    pub fn apply_to(&self, config: &mut RunnerConfig) {
        if let Some(repo) = &self.repo {
            config.repo_root = repo.clone();
        }
        if let Some(path) = &self.image_names {
            config.image_names_file = path.clone();
        }
        if let Some(retries) = self.retries {
            config.retry.max_retries = retries;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(argv: &[&str]) -> Args {
        Args::try_parse_from(argv).expect("valid arguments")
    }

    #[test]
    fn test_builder_args_follow_double_dash() {
        let args = parse(&[
            "kodegen_image_builder",
            "--reuse-image",
            "--",
            "build",
            "--manifest",
            "manifest.json",
        ]);
        assert!(args.reuse_image);
        assert_eq!(args.builder_args, ["build", "--manifest", "manifest.json"]);
    }

    #[test]
    fn test_run_options_accept_leading_hyphen() {
        let args = parse(&[
            "kodegen_image_builder",
            "--docker-run-options",
            "--network host",
        ]);
        assert_eq!(args.docker_run_options, "--network host");
    }

    #[test]
    fn test_validate_rejects_excessive_retries() {
        let args = parse(&["kodegen_image_builder", "--retries", "99"]);
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_blank_hook() {
        let args = parse(&["kodegen_image_builder", "--on-executed", "  "]);
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_apply_overrides_config() {
        let args = parse(&[
            "kodegen_image_builder",
            "--repo",
            "/src/repo",
            "--image-names",
            "names.json",
            "--retries",
            "2",
        ]);
        let mut config = RunnerConfig::default();
        args.apply_to(&mut config);
        assert_eq!(config.repo_root, PathBuf::from("/src/repo"));
        assert_eq!(config.image_names_file, PathBuf::from("names.json"));
        assert_eq!(config.retry.max_retries, 2);
    }

    #[test]
    fn test_apply_keeps_configured_repo_without_flag() {
        let args = parse(&["kodegen_image_builder", "--", "build"]);
        let mut config = RunnerConfig {
            repo_root: PathBuf::from("/configured/repo"),
            ..RunnerConfig::default()
        };
        args.apply_to(&mut config);
        assert_eq!(config.repo_root, PathBuf::from("/configured/repo"));
    }
}
