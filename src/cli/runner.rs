//! Target dispatch: the default task, a directory of tests, or a test picked by line.

use std::path::{Path, PathBuf};

use super::delegate::{RakeRunner, RubyEngine, TaskRunner, TestEngine};
use super::{CliError, CliResult, ExitCode};
use crate::config::RunnerConfig;
use crate::extract::extract;
use crate::loader::{SourceLoader, TestFileLoader};
use crate::selector::{Selection, no_match_report, selection_expression};

/// A `PATH[:LINE]` command-line target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    /// The path as typed, used verbatim in suggestions
    pub file: String,
    /// Requested line, `0` when missing or not a number
    pub line: usize,
}

impl Target {
    /// Split `PATH:LINE` on `:`; anything after a second `:` is ignored.
    pub fn parse(arg: &str) -> Self {
        let mut parts = arg.split(':');
        let file = parts.next().unwrap_or_default().to_string();
        let line = parts.next().map(parse_line).unwrap_or(0);
        Self { file, line }
    }

    pub fn path(&self) -> PathBuf {
        PathBuf::from(&self.file)
    }
}

/// Leading decimal digits of `text`, or `0`.
fn parse_line(text: &str) -> usize {
    let digits: String = text
        .trim_start()
        .chars()
        .take_while(char::is_ascii_digit)
        .collect();
    digits.parse().unwrap_or(0)
}

/// Dispatches a command-line target to the right collaborator.
pub struct Runner<L = SourceLoader, T = RakeRunner, E = RubyEngine> {
    loader: L,
    tasks: T,
    engine: E,
}

impl Runner {
    /// Runner backed by the filesystem, rake and ruby.
    pub fn new(config: RunnerConfig) -> Self {
        Self {
            loader: SourceLoader,
            tasks: RakeRunner::new(config.clone()),
            engine: RubyEngine::new(config),
        }
    }
}

impl<L, T, E> Runner<L, T, E>
where
    L: TestFileLoader,
    T: TaskRunner,
    E: TestEngine,
{
    pub fn with_parts(loader: L, tasks: T, engine: E) -> Self {
        Self { loader, tasks, engine }
    }

    /// Run `target`, or the default test task when there is none.
    pub fn run(&self, target: Option<&str>) -> CliResult<ExitCode> {
        let Some(arg) = target else {
            return self.tasks.run_default().map_err(|e| CliError::failure(e.to_string()));
        };

        let target = Target::parse(arg);
        let path = target.path();
        if path.is_dir() {
            return self
                .tasks
                .run_directory(&path)
                .map_err(|e| CliError::failure(e.to_string()));
        }

        self.run_line(&target, &path)
    }

    /// Run the tests owning `target.line`, or abort with the list of tests in the file.
    fn run_line(&self, target: &Target, path: &Path) -> CliResult<ExitCode> {
        let scanned = self
            .loader
            .load(path)
            .map_err(|e| CliError::failure(format!("Failed loading test file:\n{}", e)))?;
        let tests = extract(&scanned);

        match Selection::for_line(&tests, target.line) {
            Selection::Matched(found) => {
                let expression = selection_expression(found.iter().map(|test| test.name.as_str()));
                self.engine
                    .run(path, &expression)
                    .map_err(|e| CliError::failure(e.to_string()))
            }
            Selection::Unmatched => {
                tracing::debug!(line = target.line, tests = tests.len(), "no test on requested line");
                let report = no_match_report(&tests, &target.file, target.line);
                Err(CliError::failure(report.trim_end()))
            }
        }
    }
}
