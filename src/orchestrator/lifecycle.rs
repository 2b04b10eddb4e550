//! Lifecycle stage: post-execution hook and guaranteed container removal.

use super::Orchestrator;
use super::context::{InvocationContext, PostRunHook};
use crate::error::{Result, RunnerError};
use crate::images::ImageNameProvider;
use crate::runtime::{CommandExecutor, run_checked};
use log::{debug, info};

impl<E, P> Orchestrator<E, P>
where
    E: CommandExecutor,
    P: ImageNameProvider,
{
    /// Run the hook, if any, while the managed container still exists.
    pub(super) async fn invoke_hook(
        &self,
        ctx: &mut InvocationContext,
        hook: Option<PostRunHook>,
    ) -> Result<()> {
        let Some(hook) = hook else {
            return Ok(());
        };

        let container = ctx.container.name().to_string();
        info!("Invoking post-execution hook for container '{}'", container);
        ctx.hook_invoked = true;

        hook(container.clone())
            .await
            .map_err(|source| RunnerError::Hook { container, source })
    }

    /// Record that the managed container now exists.
    pub(super) fn track_created(&self, ctx: &mut InvocationContext) {
        let removal = self.docker.remove_container(ctx.container.name());
        ctx.container.mark_created(&self.remover, removal);
    }

    /// Remove the managed container if this invocation created it and deferred its removal.
    ///
    /// Runs once per invocation, whatever the earlier stages returned.
    pub(super) async fn release(&self, ctx: &mut InvocationContext) -> Result<()> {
        if !ctx.container.needs_cleanup() {
            if ctx.container.created() {
                debug!(
                    "Container '{}' is not removed by the cleanup stage (cleanup not deferred)",
                    ctx.container.name()
                );
            }
            return Ok(());
        }

        ctx.container.disarm();
        let remove = self.docker.remove_container(ctx.container.name());
        run_checked(&self.executor, &remove, RunnerError::Cleanup).await?;
        ctx.removed = true;
        Ok(())
    }
}
