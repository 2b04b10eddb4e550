//! Invocation state threaded through the orchestrator stages.

use crate::runtime::{
    ContainerGuard, ContainerRemover, PlatformStrategy, RuntimeCommand, split_options,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;
use std::sync::Arc;

/// Future returned by a post-execution hook
pub type HookFuture = Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send>>;

/// Caller-supplied logic run while the managed container is still alive.
///
/// Receives the managed container's name.
pub type PostRunHook = Box<dyn FnOnce(String) -> HookFuture + Send>;

/// Caller-supplied inputs of one invocation
#[derive(Default)]
pub struct RunRequest {
    /// Arguments handed to the runner
    pub runner_args: Vec<String>,
    /// Extra options for the runtime's `run` subcommand
    pub runtime_options: Vec<String>,
    /// Trust that a previously built runner image exists and skip pull + build
    pub reuse_artifact: bool,
    /// Post-execution hook; its presence defers container removal to the cleanup stage
    pub hook: Option<PostRunHook>,
}

impl RunRequest {
    /// Request that runs the runner with `runner_args`
    pub fn new<I, S>(runner_args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            runner_args: runner_args.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    /// Request whose runner arguments are given as one whitespace-separated string
    pub fn from_arg_string(runner_args: &str) -> Self {
        Self::new(split_options(runner_args))
    }

    /// Extra runtime options as one whitespace-separated string
    pub fn runtime_options(mut self, options: &str) -> Self {
        self.runtime_options = split_options(options);
        self
    }

    /// Set whether the existing runner image may be reused
    pub fn reuse_artifact(mut self, reuse: bool) -> Self {
        self.reuse_artifact = reuse;
        self
    }

    /// Register a post-execution hook
    pub fn on_executed<F, Fut>(mut self, hook: F) -> Self
    where
        F: FnOnce(String) -> Fut + Send + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.hook = Some(Box::new(move |name| Box::pin(hook(name))));
        self
    }
}

impl fmt::Debug for RunRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RunRequest")
            .field("runner_args", &self.runner_args)
            .field("runtime_options", &self.runtime_options)
            .field("reuse_artifact", &self.reuse_artifact)
            .field("hook", &self.hook.is_some())
            .finish()
    }
}

/// The thing that performs the image building work
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "location", rename_all = "snake_case")]
pub enum RunnerArtifact {
    /// Container image reference
    Image(String),
    /// Extracted executable on the host
    Executable(PathBuf),
}

/// Container created and owned by one invocation
#[derive(Debug)]
pub struct ManagedContainer {
    name: String,
    created: bool,
    cleanup_deferred: bool,
    guard: Option<ContainerGuard>,
}

impl ManagedContainer {
    /// Container that does not exist yet
    pub fn new(name: impl Into<String>, cleanup_deferred: bool) -> Self {
        Self {
            name: name.into(),
            created: false,
            cleanup_deferred,
            guard: None,
        }
    }

    /// `<prefix>-<yyyyMMddHHmmss>`; unique per second, not across concurrent invocations.
    pub fn generate_name(prefix: &str, now: DateTime<Utc>) -> String {
        format!("{}-{}", prefix, now.format("%Y%m%d%H%M%S"))
    }

    /// Container name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether a container with this name was created by this invocation
    pub fn created(&self) -> bool {
        self.created
    }

    /// Whether removal is left to the cleanup stage
    pub fn cleanup_deferred(&self) -> bool {
        self.cleanup_deferred
    }

    /// Whether the cleanup stage must remove the container
    pub fn needs_cleanup(&self) -> bool {
        self.created && self.cleanup_deferred
    }

    /// Record creation; arms the drop guard with `removal` when removal is deferred.
    pub fn mark_created(
        &mut self,
        remover: &Arc<dyn ContainerRemover>,
        removal: RuntimeCommand,
    ) {
        self.created = true;
        if self.cleanup_deferred && self.guard.is_none() {
            self.guard = Some(ContainerGuard::arm(Arc::clone(remover), removal));
        }
    }

    /// Hand removal over to the caller
    pub fn disarm(&mut self) {
        if let Some(guard) = self.guard.as_mut() {
            guard.disarm();
        }
    }

    /// Whether dropping this value would still remove the container
    pub fn guard_armed(&self) -> bool {
        self.guard.as_ref().is_some_and(ContainerGuard::is_armed)
    }
}

/// State of one invocation, passed through platform, acquisition, execution and cleanup
#[derive(Debug)]
pub struct InvocationContext {
    /// Strategy chosen by the platform resolver
    pub strategy: PlatformStrategy,
    /// The managed container
    pub container: ManagedContainer,
    /// Runner artifact, once acquired
    pub artifact: Option<RunnerArtifact>,
    /// Exit code of the primary runner invocation
    pub runner_exit_code: Option<i32>,
    /// Whether the post-execution hook was invoked
    pub hook_invoked: bool,
    /// Whether the cleanup stage removed the container
    pub removed: bool,
    /// When the invocation started
    pub started_at: DateTime<Utc>,
}

impl InvocationContext {
    /// Fresh context for `strategy`
    pub fn new(strategy: PlatformStrategy, container: ManagedContainer) -> Self {
        Self {
            strategy,
            container,
            artifact: None,
            runner_exit_code: None,
            hook_invoked: false,
            removed: false,
            started_at: Utc::now(),
        }
    }

    /// Summarize a successful invocation
    pub fn into_result(self) -> ExecutionResult {
        ExecutionResult {
            strategy: self.strategy,
            artifact: self.artifact,
            container_name: self.container.name().to_string(),
            container_created: self.container.created(),
            cleanup_deferred: self.container.cleanup_deferred(),
            container_removed: self.removed,
            exit_code: self.runner_exit_code.unwrap_or(0),
            hook_invoked: self.hook_invoked,
            started_at: self.started_at,
            finished_at: Utc::now(),
        }
    }
}

/// Outcome of a successful invocation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExecutionResult {
    /// Strategy used
    pub strategy: PlatformStrategy,
    /// Runner artifact that was executed
    pub artifact: Option<RunnerArtifact>,
    /// Managed container name
    pub container_name: String,
    /// Whether a container was created
    pub container_created: bool,
    /// Whether removal was deferred to the cleanup stage
    pub cleanup_deferred: bool,
    /// Whether the cleanup stage removed the container
    pub container_removed: bool,
    /// Exit code of the runner
    pub exit_code: i32,
    /// Whether the post-execution hook ran
    pub hook_invoked: bool,
    /// Invocation start
    pub started_at: DateTime<Utc>,
    /// Invocation end
    pub finished_at: DateTime<Utc>,
}
