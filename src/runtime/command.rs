//! Typed external commands.
//!
//! Commands are kept as a program plus an argument vector and are never passed
//! through a shell. [`RuntimeCommand`]'s `Display` renders the literal command
//! text used in logs and error messages.

use std::fmt;
use std::path::Path;

/// A single external command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeCommand {
    program: String,
    args: Vec<String>,
    capture_stdout: bool,
}

impl RuntimeCommand {
    /// Command for `program` with no arguments
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            capture_stdout: false,
        }
    }

    /// Append one argument
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Append several arguments
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Capture stdout instead of streaming it
    pub fn capture_stdout(mut self) -> Self {
        self.capture_stdout = true;
        self
    }

    /// Program to execute
    pub fn program(&self) -> &str {
        &self.program
    }

    /// Arguments passed to the program
    pub fn arguments(&self) -> &[String] {
        &self.args
    }

    /// Whether stdout should be captured
    pub fn captures_stdout(&self) -> bool {
        self.capture_stdout
    }
}

impl fmt::Display for RuntimeCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", quote(&self.program))?;
        for arg in &self.args {
            write!(f, " {}", quote(arg))?;
        }
        Ok(())
    }
}

fn quote(word: &str) -> String {
    if !word.is_empty() && !word.chars().any(|c| c.is_whitespace() || c == '"') {
        word.to_string()
    } else {
        format!("\"{}\"", word.replace('"', "\\\""))
    }
}

/// Split a whitespace-separated option string into arguments
pub fn split_options(options: &str) -> Vec<String> {
    options.split_whitespace().map(str::to_string).collect()
}

/// Builder for the container runtime CLI subcommands the orchestrator issues
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DockerCli {
    program: String,
}

impl DockerCli {
    /// Builder for the runtime CLI named `program`
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Runtime CLI program name
    pub fn program(&self) -> &str {
        &self.program
    }

    fn command(&self) -> RuntimeCommand {
        RuntimeCommand::new(self.program.clone())
    }

    /// `docker version -f "{{ .Server.Os }}"`
    pub fn server_os(&self) -> RuntimeCommand {
        self.command()
            .args(["version", "-f", "{{ .Server.Os }}"])
            .capture_stdout()
    }

    /// `docker pull <image>`
    pub fn pull(&self, image: &str) -> RuntimeCommand {
        self.command().args(["pull", image])
    }

    /// `docker build -t <tag> --build-arg <arg>=<base> -f <file> <context>`
    pub fn build(
        &self,
        tag: &str,
        build_arg: &str,
        base_image: &str,
        build_file: &Path,
        context: &Path,
    ) -> RuntimeCommand {
        self.command().args([
            "build".to_string(),
            "-t".to_string(),
            tag.to_string(),
            "--build-arg".to_string(),
            format!("{}={}", build_arg, base_image),
            "-f".to_string(),
            build_file.display().to_string(),
            context.display().to_string(),
        ])
    }

    /// `docker run [--rm] <options> --name <name> -v <socket>:<socket> <image> <args>`
    pub fn run(&self, spec: &RunSpec<'_>) -> RuntimeCommand {
        let mut command = self.command().arg("run");
        if spec.auto_remove {
            command = command.arg("--rm");
        }
        command
            .args(spec.options.iter().cloned())
            .args(["--name", spec.name])
            .args(["-v".to_string(), format!("{0}:{0}", spec.socket_path)])
            .arg(spec.image)
            .args(spec.runner_args.iter().cloned())
    }

    /// `docker create --name <name> <image>`
    pub fn create(&self, name: &str, image: &str) -> RuntimeCommand {
        self.command().args(["create", "--name", name, image])
    }

    /// `docker cp <container>:<source> <destination>`
    pub fn copy_out(&self, container: &str, source: &str, destination: &Path) -> RuntimeCommand {
        self.command().args([
            "cp".to_string(),
            format!("{}:{}", container, source),
            destination.display().to_string(),
        ])
    }

    /// `docker container rm -f <name>`
    pub fn remove_container(&self, name: &str) -> RuntimeCommand {
        self.command().args(["container", "rm", "-f", name])
    }
}

/// Inputs of a `docker run` invocation of the runner image
#[derive(Debug, Clone)]
pub struct RunSpec<'a> {
    /// Managed container name
    pub name: &'a str,
    /// Image to run
    pub image: &'a str,
    /// Runtime socket bind-mounted at the same path
    pub socket_path: &'a str,
    /// Caller-supplied extra runtime options
    pub options: &'a [String],
    /// Arguments for the runner inside the container
    pub runner_args: &'a [String],
    /// Whether the runtime removes the container on exit
    pub auto_remove: bool,
}
