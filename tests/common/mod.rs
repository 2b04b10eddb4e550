//! Shared fixtures for orchestrator tests.

#![allow(dead_code)]

use kodegen_image_builder::{
    CommandExecutor, CommandOutput, ContainerRemover, ImageNameProvider, ImageNames, ImageRole,
    Orchestrator, RetryPolicy, RunnerConfig, RuntimeCommand, StaticImageNames,
};
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const LINUX_IMAGE: &str = "registry.test/image-builder:linux";
pub const WINDOWS_IMAGE: &str = "registry.test/image-builder:nanoserver";

/// Shared, ordered record of commands and hook calls
pub type Journal = Arc<Mutex<Vec<String>>>;

struct Failure {
    prefix: String,
    code: Option<i32>,
    remaining: Option<u32>,
}

/// Records every command and answers from a script; unscripted commands exit 0.
pub struct FakeExecutor {
    os: String,
    journal: Journal,
    failures: Mutex<Vec<Failure>>,
}

impl FakeExecutor {
    pub fn new(os: &str) -> Self {
        Self {
            os: os.to_string(),
            journal: Arc::new(Mutex::new(Vec::new())),
            failures: Mutex::new(Vec::new()),
        }
    }

    /// Commands starting with `prefix` exit with `code`
    pub fn fail(self, prefix: &str, code: i32) -> Self {
        self.push_failure(prefix, Some(code), None)
    }

    /// Commands starting with `prefix` exit with `code` the first `times` calls
    pub fn fail_times(self, prefix: &str, code: i32, times: u32) -> Self {
        self.push_failure(prefix, Some(code), Some(times))
    }

    /// Commands starting with `prefix` cannot be launched
    pub fn unlaunchable(self, prefix: &str) -> Self {
        self.push_failure(prefix, None, None)
    }

    fn push_failure(self, prefix: &str, code: Option<i32>, remaining: Option<u32>) -> Self {
        self.failures.lock().unwrap().push(Failure {
            prefix: prefix.to_string(),
            code,
            remaining,
        });
        self
    }

    pub fn journal(&self) -> Journal {
        Arc::clone(&self.journal)
    }

    pub fn entries(&self) -> Vec<String> {
        self.journal.lock().unwrap().clone()
    }

    /// Drop-guard remover writing `guard:<command>` into the same journal
    pub fn remover(&self) -> Arc<dyn ContainerRemover> {
        Arc::new(FakeRemover {
            journal: self.journal(),
        })
    }
}

/// Records guard removals instead of spawning the runtime
#[derive(Debug)]
pub struct FakeRemover {
    journal: Journal,
}

impl ContainerRemover for FakeRemover {
    fn remove_blocking(&self, command: &RuntimeCommand) {
        self.journal.lock().unwrap().push(format!("guard:{}", command));
    }
}

impl CommandExecutor for FakeExecutor {
    async fn execute(&self, command: &RuntimeCommand) -> std::io::Result<CommandOutput> {
        let text = command.to_string();
        self.journal.lock().unwrap().push(text.clone());

        let mut failures = self.failures.lock().unwrap();
        for failure in failures.iter_mut() {
            if !text.starts_with(&failure.prefix) {
                continue;
            }
            match failure.remaining {
                Some(0) => continue,
                Some(n) => failure.remaining = Some(n - 1),
                None => {}
            }
            return match failure.code {
                Some(code) => Ok(CommandOutput::exited(code)),
                None => Err(std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    "No such file or directory",
                )),
            };
        }

        if command.captures_stdout() {
            return Ok(CommandOutput {
                code: Some(0),
                stdout: format!("{}\n", self.os),
            });
        }
        Ok(CommandOutput::exited(0))
    }
}

pub fn config(repo_root: &Path) -> RunnerConfig {
    RunnerConfig {
        repo_root: repo_root.to_path_buf(),
        ..RunnerConfig::default()
    }
}

/// Orchestrator over `executor` whose drop guard never touches the host runtime
pub fn orchestrator_for<P: ImageNameProvider>(
    repo_root: &Path,
    executor: FakeExecutor,
    images: P,
    retries: u32,
) -> Orchestrator<FakeExecutor, P> {
    let remover = executor.remover();
    Orchestrator::new(config(repo_root), executor, images)
        .with_retry_policy(instant_retries(retries))
        .with_remover(remover)
}

pub fn images() -> StaticImageNames {
    StaticImageNames(ImageNames::from_pairs([
        (ImageRole::ImageBuilderLinux, LINUX_IMAGE),
        (ImageRole::ImageBuilderWindows, WINDOWS_IMAGE),
    ]))
}

pub fn no_images() -> StaticImageNames {
    StaticImageNames::default()
}

pub fn instant_retries(max_retries: u32) -> RetryPolicy {
    RetryPolicy {
        max_retries,
        initial_backoff: Duration::ZERO,
        max_backoff: Duration::ZERO,
    }
}

/// Container name taken from the first `--name` argument in the journal
pub fn container_name(entries: &[String]) -> String {
    entries
        .iter()
        .find_map(|entry| {
            let mut words = entry.split_whitespace();
            words.find(|w| *w == "--name")?;
            words.next().map(str::to_string)
        })
        .expect("a command with --name was issued")
}

pub fn count_prefixed(entries: &[String], prefix: &str) -> usize {
    entries.iter().filter(|e| e.starts_with(prefix)).count()
}
