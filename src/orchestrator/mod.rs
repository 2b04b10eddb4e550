//! Invocation orchestration.
//!
//! One call to [`Orchestrator::invoke`] walks four stages in order:
//!
//! 1. platform resolution (`runtime::resolve_platform`)
//! 2. acquisition of the runner artifact (`acquire`)
//! 3. execution of the runner (`execute`)
//! 4. post-execution hook and container cleanup (`lifecycle`)
//!
//! The cleanup step runs after stages 2-4 regardless of their outcome. A
//! cleanup failure is returned even when it hides an earlier error; the hidden
//! error is logged.

mod acquire;
mod context;
mod execute;
mod lifecycle;

pub use context::{
    ExecutionResult, HookFuture, InvocationContext, ManagedContainer, PostRunHook, RunRequest,
    RunnerArtifact,
};

use crate::config::RunnerConfig;
use crate::error::Result;
use crate::images::ImageNameProvider;
use crate::retry::RetryPolicy;
use crate::runtime::{
    CommandExecutor, ContainerRemover, DockerCli, ProcessRemover, resolve_platform,
};
use chrono::Utc;
use log::error;
use std::sync::Arc;

/// Drives a single image builder invocation
#[derive(Debug)]
pub struct Orchestrator<E, P> {
    executor: E,
    images: P,
    config: RunnerConfig,
    docker: DockerCli,
    retry: RetryPolicy,
    remover: Arc<dyn ContainerRemover>,
}

impl<E, P> Orchestrator<E, P>
where
    E: CommandExecutor,
    P: ImageNameProvider,
{
    /// Orchestrator issuing commands through `executor` and resolving images through `images`
    pub fn new(config: RunnerConfig, executor: E, images: P) -> Self {
        Self {
            docker: DockerCli::new(config.runtime.clone()),
            retry: config.retry_policy(),
            remover: Arc::new(ProcessRemover),
            executor,
            images,
            config,
        }
    }

    /// Override the pull retry policy
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Override how the drop guard removes a container when cleanup never ran
    pub fn with_remover(mut self, remover: Arc<dyn ContainerRemover>) -> Self {
        self.remover = remover;
        self
    }

    /// Command executor
    pub fn executor(&self) -> &E {
        &self.executor
    }

    /// Active configuration
    pub fn config(&self) -> &RunnerConfig {
        &self.config
    }

    /// Run one invocation end to end.
    pub async fn invoke(&self, request: RunRequest) -> Result<ExecutionResult> {
        let RunRequest {
            runner_args,
            runtime_options,
            reuse_artifact,
            hook,
        } = request;

        // Nothing has been created yet, so a failure here needs no cleanup.
        let strategy = resolve_platform(&self.executor, &self.docker).await?;

        let name = ManagedContainer::generate_name(&self.config.container_prefix, Utc::now());
        let container = ManagedContainer::new(name, hook.is_some());
        let mut ctx = InvocationContext::new(strategy, container);

        let outcome: Result<()> = async {
            self.acquire(&mut ctx, reuse_artifact).await?;
            self.execute(&mut ctx, &runner_args, &runtime_options).await?;
            self.invoke_hook(&mut ctx, hook).await
        }
        .await;

        let cleanup = self.release(&mut ctx).await;

        match (outcome, cleanup) {
            (Ok(()), Ok(())) => Ok(ctx.into_result()),
            (Err(e), Ok(())) => Err(e),
            (Ok(()), Err(cleanup_err)) => Err(cleanup_err),
            (Err(e), Err(cleanup_err)) => {
                error!("{} (masked by cleanup failure: {})", e, cleanup_err);
                Err(cleanup_err)
            }
        }
    }
}
