//! Acquisition stage: make sure a runnable artifact exists.

use super::Orchestrator;
use super::context::{InvocationContext, RunnerArtifact};
use crate::error::{CommandError, Result, RunnerError};
use crate::images::{ImageNameProvider, ImageRole};
use crate::retry::retry_with_backoff;
use crate::runtime::{CommandExecutor, PlatformStrategy, run_checked};
use log::{debug, info};

impl<E, P> Orchestrator<E, P>
where
    E: CommandExecutor,
    P: ImageNameProvider,
{
    pub(super) async fn acquire(&self, ctx: &mut InvocationContext, reuse: bool) -> Result<()> {
        let artifact = match ctx.strategy {
            PlatformStrategy::ContainerizedRunner => self.acquire_image(reuse).await?,
            PlatformStrategy::LocalBinaryRunner => self.acquire_executable(ctx).await?,
        };
        debug!("Runner artifact: {:?}", artifact);
        ctx.artifact = Some(artifact);
        Ok(())
    }

    /// Pull the runner base image and build the derived image that embeds the repository.
    async fn acquire_image(&self, reuse: bool) -> Result<RunnerArtifact> {
        let derived = self.config.derived_image.clone();

        // The caller vouches for the image; its existence is not checked.
        if reuse {
            info!("Reusing existing runner image '{}'", derived);
            return Ok(RunnerArtifact::Image(derived));
        }

        let names = self.images.image_names()?;
        let base_image = names.get(ImageRole::ImageBuilderLinux)?;

        self.pull_with_retry(base_image).await?;

        let build = self.docker.build(
            &derived,
            &self.config.build_arg,
            base_image,
            &self.config.build_file,
            &self.config.build_context,
        );
        run_checked(&self.executor, &build, RunnerError::Acquisition).await?;

        Ok(RunnerArtifact::Image(derived))
    }

    /// Extract the runner executable from the Windows runner image unless it is already present.
    async fn acquire_executable(&self, ctx: &mut InvocationContext) -> Result<RunnerArtifact> {
        let executable = self.config.local_executable_path();
        let present = tokio::fs::metadata(&executable)
            .await
            .is_ok_and(|metadata| metadata.is_file());
        if present {
            info!(
                "Runner executable already present at {}",
                executable.display()
            );
            return Ok(RunnerArtifact::Executable(executable));
        }

        let names = self.images.image_names()?;
        let image = names.get(ImageRole::ImageBuilderWindows)?;

        self.pull_with_retry(image).await?;

        let create = self.docker.create(ctx.container.name(), image);
        run_checked(&self.executor, &create, RunnerError::Acquisition).await?;
        self.track_created(ctx);

        let runner_dir = self.config.local_runner_path();
        if tokio::fs::try_exists(&runner_dir).await.unwrap_or(false) {
            debug!("Removing stale {}", runner_dir.display());
            tokio::fs::remove_dir_all(&runner_dir).await.map_err(|e| {
                RunnerError::Acquisition(CommandError::Filesystem {
                    operation: "remove".to_string(),
                    path: runner_dir.clone(),
                    reason: e.to_string(),
                })
            })?;
        }

        let copy = self.docker.copy_out(
            ctx.container.name(),
            &self.config.payload_path,
            &self.config.local_runner_dir,
        );
        run_checked(&self.executor, &copy, RunnerError::Acquisition).await?;

        Ok(RunnerArtifact::Executable(executable))
    }

    async fn pull_with_retry(&self, image: &str) -> Result<()> {
        let pull = self.docker.pull(image);
        let operation_name = pull.to_string();
        let executor = &self.executor;
        let pull_ref = &pull;

        retry_with_backoff(
            move || run_checked(executor, pull_ref, RunnerError::Acquisition),
            self.retry,
            &operation_name,
        )
        .await?;
        Ok(())
    }
}
