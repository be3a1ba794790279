//! CLI module for `m`
//!
//! ## Usage
//!
//! - `m` - run the project's default test task (`rake test`)
//! - `m test/models` - run every test file in a directory
//! - `m test/models/user_test.rb:42` - run the test(s) defined around line 42
//!
//! ## Modules
//!
//! - `runner` - Target parsing and dispatch
//! - `delegate` - The external rake/ruby processes tests are handed to
//!
//! ## Design
//!
//! Functions return `CliResult<T>` instead of calling `process::exit`.
//! Only the top-level `run()` function handles errors and exits.

// Enforce explicit error handling - no panicking in production code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]

pub mod delegate;
pub mod runner;

use std::fmt;
use std::path::Path;
use std::process;

use clap::Parser;

use crate::config::RunnerConfig;
use runner::Runner;

// ============================================================================
// CLI Error handling
// ============================================================================

/// Exit code for CLI operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitCode(pub i32);

impl ExitCode {
    pub const SUCCESS: ExitCode = ExitCode(0);
    pub const FAILURE: ExitCode = ExitCode(1);

    pub fn is_success(self) -> bool {
        self.0 == 0
    }
}

/// Error type for CLI operations.
///
/// Contains a user-facing message and an exit code. The CLI entry point
/// catches these errors, prints the message, and exits with the code.
#[derive(Debug)]
pub struct CliError {
    /// User-facing error message (already formatted for display)
    pub message: String,
    /// Exit code to return to the shell
    pub exit_code: ExitCode,
}

impl CliError {
    /// Create a new CLI error with a message and exit code.
    pub fn new(message: impl Into<String>, exit_code: ExitCode) -> Self {
        Self {
            message: message.into(),
            exit_code,
        }
    }

    /// Create a failure error (exit code 1).
    pub fn failure(message: impl Into<String>) -> Self {
        Self::new(message, ExitCode::FAILURE)
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

/// Result type for CLI operations.
pub type CliResult<T> = Result<T, CliError>;

// ============================================================================
// Clap CLI definition
// ============================================================================

/// Run a single test by pointing at its file and line number
#[derive(Parser, Debug)]
#[command(name = "m")]
#[command(version)]
#[command(about = "Run a single test by pointing at its file and line number", long_about = None)]
pub struct Cli {
    /// Test file with optional line (`test/user_test.rb:42`), or a directory of tests
    #[arg(value_name = "PATH[:LINE]")]
    pub target: Option<String>,
}

// ============================================================================
// CLI entry point
// ============================================================================

/// Main CLI entry point.
///
/// This is the only place where `process::exit` is called.
pub fn run() {
    let cli = Cli::parse();

    match execute(cli) {
        Ok(exit_code) => {
            if !exit_code.is_success() {
                process::exit(exit_code.0);
            }
        }
        Err(e) => {
            if !e.message.is_empty() {
                eprintln!("{}", e.message);
            }
            process::exit(e.exit_code.0);
        }
    }
}

/// Execute the CLI command and return result.
fn execute(cli: Cli) -> CliResult<ExitCode> {
    let config = RunnerConfig::load(Path::new(".")).map_err(|e| CliError::failure(e.to_string()))?;
    Runner::new(config).run(cli.target.as_deref())
}

// ============================================================================
// Tests
// ============================================================================
