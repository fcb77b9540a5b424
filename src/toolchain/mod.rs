//! External container toolchain invocation.
//!
//! Commands are described as [`Invocation`] values and executed through a
//! [`CommandRunner`], so orchestration code can be exercised against a
//! recording runner in tests.

pub mod docker;
#[cfg(test)]
pub(crate) mod fake;

use std::process::{Command, Stdio};

use tracing::{debug, info};

use crate::error::ToolError;

pub use docker::Docker;

/// A program, its arguments and extra environment variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<String>,
    pub env: Vec<(String, String)>,
}

impl Invocation {
    /// `program` may carry leading arguments separated by whitespace
    /// (`"docker compose"`).
    pub fn new(program: &str) -> Self {
        let mut words = program.split_whitespace().map(str::to_string);
        Self {
            program: words.next().unwrap_or_default(),
            args: words.collect(),
            env: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    /// Space-joined command line, for logs and error messages.
    pub fn command_line(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);
        for (key, value) in &self.env {
            cmd.env(key, value);
        }
        cmd
    }

    fn spawn_err(&self, source: std::io::Error) -> ToolError {
        ToolError::Spawn {
            program: self.program.clone(),
            source,
        }
    }

    fn failed(&self, code: Option<i32>) -> ToolError {
        ToolError::Failed {
            command: self.command_line(),
            code,
        }
    }
}

/// Executes invocations.
pub trait CommandRunner {
    /// Run with inherited stdio; a non-zero exit is an error.
    fn run(&self, invocation: &Invocation) -> Result<(), ToolError>;

    /// Run and return trimmed stdout; a non-zero exit is an error.
    fn capture(&self, invocation: &Invocation) -> Result<String, ToolError>;
}

/// Runs invocations as real subprocesses.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn run(&self, invocation: &Invocation) -> Result<(), ToolError> {
        info!("Running {}", invocation.command_line());
        let status = invocation
            .command()
            .status()
            .map_err(|e| invocation.spawn_err(e))?;
        if !status.success() {
            return Err(invocation.failed(status.code()));
        }
        Ok(())
    }

    fn capture(&self, invocation: &Invocation) -> Result<String, ToolError> {
        debug!("Capturing {}", invocation.command_line());
        let output = invocation
            .command()
            .stdin(Stdio::null())
            .stderr(Stdio::null())
            .output()
            .map_err(|e| invocation.spawn_err(e))?;
        if !output.status.success() {
            return Err(invocation.failed(output.status.code()));
        }
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}
