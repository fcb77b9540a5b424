//! Recording runner for tests.

use std::cell::RefCell;

use super::{CommandRunner, Invocation};
use crate::error::ToolError;

/// Records every invocation. Commands whose line starts with a registered
/// prefix fail with the given exit code or capture the given output.
#[derive(Debug, Default)]
pub(crate) struct FakeRunner {
    calls: RefCell<Vec<Invocation>>,
    failures: Vec<(String, i32)>,
    outputs: Vec<(String, String)>,
}

impl FakeRunner {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn fail(mut self, prefix: &str, code: i32) -> Self {
        self.failures.push((prefix.to_string(), code));
        self
    }

    pub(crate) fn output(mut self, prefix: &str, stdout: &str) -> Self {
        self.outputs.push((prefix.to_string(), stdout.to_string()));
        self
    }

    pub(crate) fn calls(&self) -> Vec<Invocation> {
        self.calls.borrow().clone()
    }

    /// Recorded command lines.
    pub(crate) fn lines(&self) -> Vec<String> {
        self.calls.borrow().iter().map(Invocation::command_line).collect()
    }

    fn record(&self, invocation: &Invocation) -> Result<String, ToolError> {
        self.calls.borrow_mut().push(invocation.clone());
        let line = invocation.command_line();
        if let Some((_, code)) = self.failures.iter().find(|(p, _)| line.starts_with(p)) {
            return Err(ToolError::Failed {
                command: line,
                code: Some(*code),
            });
        }
        Ok(self
            .outputs
            .iter()
            .find(|(p, _)| line.starts_with(p))
            .map(|(_, out)| out.clone())
            .unwrap_or_default())
    }
}

impl CommandRunner for FakeRunner {
    fn run(&self, invocation: &Invocation) -> Result<(), ToolError> {
        self.record(invocation).map(|_| ())
    }

    fn capture(&self, invocation: &Invocation) -> Result<String, ToolError> {
        self.record(invocation)
    }
}
