//! `--on-executed` support: a command run while the builder's container exists.

use crate::error::RunnerError;
use crate::runtime::{CommandExecutor, RuntimeCommand, run_checked, split_options};

/// Placeholder replaced by the managed container's name
pub const CONTAINER_PLACEHOLDER: &str = "{container}";

/// Build the hook command for `container` from a whitespace-separated template.
pub fn render_hook_command(template: &str, container: &str) -> Option<RuntimeCommand> {
    let mut words = split_options(template)
        .into_iter()
        .map(|word| word.replace(CONTAINER_PLACEHOLDER, container));
    let program = words.next()?;
    Some(RuntimeCommand::new(program).args(words))
}

/// Run the hook command through `executor`; a non-zero exit fails the hook.
pub async fn run_hook_command<E>(
    executor: &E,
    template: &str,
    container: &str,
) -> anyhow::Result<()>
where
    E: CommandExecutor,
{
    let command = render_hook_command(template, container)
        .ok_or_else(|| anyhow::anyhow!("--on-executed command is empty"))?;
    run_checked(executor, &command, |e| RunnerError::Anyhow(anyhow::anyhow!(e))).await?;
    Ok(())
}
