//! Delegation to the external processes that actually run tests
//!
//! Two collaborators are involved:
//! - the task runner (`rake test`), used with no target and for directories
//! - the test engine (`ruby -Itest FILE -n /PATTERN/`), used for a single file
//!
//! Both inherit stdio, so their output reaches the user untouched, and their exit
//! status is passed through verbatim.

use std::io;
use std::path::Path;
use std::process::{Command, ExitStatus};

use thiserror::Error;

use super::ExitCode;
use crate::config::RunnerConfig;

/// A delegated process could not be started.
#[derive(Debug, Error)]
pub enum DelegateError {
    #[error("failed to run `{command}`: {source}")]
    Spawn { command: String, source: io::Error },
}

/// Runs the project's test task.
pub trait TaskRunner {
    /// Run the default test task.
    fn run_default(&self) -> Result<ExitCode, DelegateError>;

    /// Run every test file in `dir` matching the configured pattern.
    fn run_directory(&self, dir: &Path) -> Result<ExitCode, DelegateError>;
}

/// Runs the named tests of a single file.
pub trait TestEngine {
    /// Run the tests in `file` whose names match `expression`.
    fn run(&self, file: &Path, expression: &str) -> Result<ExitCode, DelegateError>;
}

// ============================================================================
// Default Implementations
// ============================================================================

/// `rake test`, or whatever `task_command` is configured.
#[derive(Debug, Clone)]
pub struct RakeRunner {
    config: RunnerConfig,
}

impl RakeRunner {
    pub fn new(config: RunnerConfig) -> Self {
        Self { config }
    }

    /// The task command, restricted to the tests in `dir` when given.
    pub fn command(&self, dir: Option<&Path>) -> Command {
        let (program, args) = match self.config.task_command.split_first() {
            Some((program, args)) => (program.as_str(), args),
            None => ("rake", &[][..]),
        };
        let mut cmd = Command::new(program);
        cmd.args(args);
        if let Some(dir) = dir {
            cmd.env("TEST", dir.join(&self.config.test_pattern));
        }
        cmd
    }
}

impl TaskRunner for RakeRunner {
    fn run_default(&self) -> Result<ExitCode, DelegateError> {
        tracing::info!("running default test task");
        spawn(self.command(None))
    }

    fn run_directory(&self, dir: &Path) -> Result<ExitCode, DelegateError> {
        tracing::info!(dir = %dir.display(), pattern = %self.config.test_pattern, "running test directory");
        spawn(self.command(Some(dir)))
    }
}

/// `ruby -I<load path>... FILE -n EXPRESSION`
#[derive(Debug, Clone)]
pub struct RubyEngine {
    config: RunnerConfig,
}

impl RubyEngine {
    pub fn new(config: RunnerConfig) -> Self {
        Self { config }
    }

    pub fn command(&self, file: &Path, expression: &str) -> Command {
        let mut cmd = Command::new(&self.config.ruby);
        for path in &self.config.load_paths {
            cmd.arg(format!("-I{}", path));
        }
        cmd.arg(file).arg("-n").arg(expression);
        cmd
    }
}

impl TestEngine for RubyEngine {
    fn run(&self, file: &Path, expression: &str) -> Result<ExitCode, DelegateError> {
        tracing::info!(file = %file.display(), %expression, "running selected tests");
        spawn(self.command(file, expression))
    }
}

#[tracing::instrument(skip_all, fields(program = ?cmd.get_program()))]
fn spawn(mut cmd: Command) -> Result<ExitCode, DelegateError> {
    let status = cmd.status().map_err(|source| DelegateError::Spawn {
        command: describe(&cmd),
        source,
    })?;
    let code = exit_code(status);
    tracing::debug!(code = code.0, "delegated process finished");
    Ok(code)
}

/// Exit code to pass on for a finished child process.
pub fn exit_code(status: ExitStatus) -> ExitCode {
    if let Some(code) = status.code() {
        return ExitCode(code);
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return ExitCode(128 + signal);
        }
    }
    ExitCode::FAILURE
}

fn describe(cmd: &Command) -> String {
    std::iter::once(cmd.get_program())
        .chain(cmd.get_args())
        .map(|part| part.to_string_lossy())
        .collect::<Vec<_>>()
        .join(" ")
}
