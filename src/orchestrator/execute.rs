//! Execution stage: run the runner once and require a zero exit status.

use super::Orchestrator;
use super::context::{InvocationContext, RunnerArtifact};
use crate::error::{CommandError, Result, RunnerError};
use crate::images::ImageNameProvider;
use crate::runtime::{CommandExecutor, RunSpec, RuntimeCommand, run_checked};
use log::debug;

impl<E, P> Orchestrator<E, P>
where
    E: CommandExecutor,
    P: ImageNameProvider,
{
    pub(super) async fn execute(
        &self,
        ctx: &mut InvocationContext,
        runner_args: &[String],
        runtime_options: &[String],
    ) -> Result<()> {
        let command = match &ctx.artifact {
            Some(RunnerArtifact::Image(image)) => {
                // With a hook the container must outlive the run, so auto-remove is off.
                let auto_remove = !ctx.container.cleanup_deferred();
                let command = self.docker.run(&RunSpec {
                    name: ctx.container.name(),
                    image,
                    socket_path: &self.config.socket_path,
                    options: runtime_options,
                    runner_args,
                    auto_remove,
                });
                let removal = self.docker.remove_container(ctx.container.name());
                ctx.container.mark_created(&self.remover, removal);
                debug!(
                    "Running container '{}' (auto-remove: {})",
                    ctx.container.name(),
                    auto_remove
                );
                command
            }
            Some(RunnerArtifact::Executable(path)) => {
                RuntimeCommand::new(path.display().to_string()).args(runner_args.iter().cloned())
            }
            None => {
                return Err(RunnerError::Execution(CommandError::Launch {
                    command: "runner".to_string(),
                    reason: "no runner artifact was acquired".to_string(),
                }));
            }
        };

        let output = run_checked(&self.executor, &command, RunnerError::Execution).await?;
        ctx.runner_exit_code = output.code;
        Ok(())
    }
}
