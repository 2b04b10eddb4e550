//! Command line interface for kodegen_image_builder.
//!
//! Turns parsed arguments into a [`RunRequest`], wires the process-backed
//! executor and file-backed image names into an [`Orchestrator`], and reports
//! the outcome.

mod args;
mod hook;
mod output;

pub use args::Args;
pub use hook::{CONTAINER_PLACEHOLDER, render_hook_command, run_hook_command};
pub use output::OutputManager;

use crate::config::RunnerConfig;
use crate::error::{CliError, ConfigError, Result};
use crate::images::FileImageNames;
use crate::orchestrator::{Orchestrator, RunRequest};
use crate::runtime::ProcessExecutor;

/// Main CLI entry point
pub async fn run() -> Result<i32> {
    let args = Args::parse_args();
    execute(args).await
}

/// Parse arguments without executing (for testing)
pub fn parse_args() -> Args {
    Args::parse_args()
}

/// Load, override and validate configuration for `args`
pub fn build_config(args: &Args) -> Result<RunnerConfig> {
    let mut config = RunnerConfig::load(args.config.as_deref())?;
    args.apply_to(&mut config);

    // Absolute root so the extracted executable resolves independently of our cwd
    config.repo_root = config.repo_root.canonicalize().map_err(|e| {
        ConfigError::InvalidValue {
            key: "repo".to_string(),
            reason: format!("cannot resolve '{}': {}", config.repo_root.display(), e),
        }
    })?;

    config.validate()?;
    Ok(config)
}

/// Execute one invocation for parsed arguments
pub async fn execute(args: Args) -> Result<i32> {
    args.validate()
        .map_err(|reason| CliError::InvalidArguments { reason })?;

    let config = build_config(&args)?;
    let output = OutputManager::new(false, args.json);

    if let Err(e) = ProcessExecutor::locate(&config.runtime) {
        let _ = output.warn(&e.to_string());
    }

    let executor = ProcessExecutor::new(config.repo_root.clone(), output.clone());
    let images = FileImageNames::new(config.image_names_path());

    let mut request = RunRequest::new(args.builder_args.clone())
        .runtime_options(&args.docker_run_options)
        .reuse_artifact(args.reuse_image);

    if let Some(template) = args.on_executed.clone() {
        let hook_executor = executor.clone();
        request = request.on_executed(move |container| async move {
            run_hook_command(&hook_executor, &template, &container).await
        });
    }

    let _ = output.progress(&format!(
        "Launching image builder in {}",
        config.repo_root.display()
    ));

    let orchestrator = Orchestrator::new(config, executor, images);
    let result = orchestrator.invoke(request).await?;

    if args.json {
        let json = serde_json::to_string_pretty(&result).map_err(anyhow::Error::from)?;
        let _ = output.println(&json);
    } else {
        let _ = output.success(&format!(
            "Image builder finished ({}, container {})",
            result.strategy, result.container_name
        ));
    }

    Ok(0)
}
