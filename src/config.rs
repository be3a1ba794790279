//! Runner configuration
//!
//! Resolution order (highest priority first):
//! 1. Environment variables (`M_*`)
//! 2. Project config (`.m.toml` in the working directory)
//! 3. Compiled defaults
//!
//! ```toml
//! task_command = ["bundle", "exec", "rake", "test"]
//! ruby = "ruby"
//! load_paths = ["test", "lib"]
//! test_pattern = "*_test.rb"
//! ```

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

/// Project config file name, looked up in the working directory.
pub const CONFIG_FILE: &str = ".m.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", path.display())]
    Read { path: PathBuf, source: std::io::Error },

    #[error("invalid config in {path}: {message}")]
    Parse { path: String, message: String },

    #[error("invalid config value for `{field}`: {message}")]
    Invalid { field: &'static str, message: String },
}

/// How `m` delegates to rake and ruby.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RunnerConfig {
    /// Task run when no target is given; also runs directories via `TEST=<glob>`
    pub task_command: Vec<String>,
    /// Ruby interpreter used to run a single file
    pub ruby: String,
    /// Directories added to the load path (`-I`)
    pub load_paths: Vec<String>,
    /// File glob for test files inside a directory target
    pub test_pattern: String,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            task_command: vec!["rake".to_string(), "test".to_string()],
            ruby: "ruby".to_string(),
            load_paths: vec!["test".to_string()],
            test_pattern: "*test*.rb".to_string(),
        }
    }
}

impl RunnerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load the config for a project rooted at `root`.
    pub fn load(root: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        let path = root.join(CONFIG_FILE);
        if path.is_file() {
            let content = fs::read_to_string(&path).map_err(|source| ConfigError::Read {
                path: path.clone(),
                source,
            })?;
            config = toml::from_str(&content).map_err(|e| ConfigError::Parse {
                path: path.display().to_string(),
                message: e.to_string(),
            })?;
            tracing::debug!(path = %path.display(), "loaded project config");
        }

        config.apply_env_overrides(|key| env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Parse a config from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(toml_str).map_err(|e| ConfigError::Parse {
            path: "<string>".to_string(),
            message: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Apply `M_*` overrides using `lookup` to read variables.
    pub fn apply_env_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(value) = lookup("M_TASK_COMMAND") {
            self.task_command = value.split_whitespace().map(str::to_string).collect();
        }
        if let Some(value) = lookup("M_RUBY") {
            self.ruby = value;
        }
        if let Some(value) = lookup("M_LOAD_PATHS") {
            self.load_paths = value
                .split(':')
                .filter(|p| !p.is_empty())
                .map(str::to_string)
                .collect();
        }
        if let Some(value) = lookup("M_TEST_PATTERN") {
            self.test_pattern = value;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.task_command.is_empty() {
            return Err(ConfigError::Invalid {
                field: "task_command",
                message: "must name a program".to_string(),
            });
        }
        if self.ruby.trim().is_empty() {
            return Err(ConfigError::Invalid {
                field: "ruby",
                message: "must not be empty".to_string(),
            });
        }
        if self.test_pattern.trim().is_empty() {
            return Err(ConfigError::Invalid {
                field: "test_pattern",
                message: "must not be empty".to_string(),
            });
        }
        Ok(())
    }

    pub fn with_task_command<I, S>(mut self, command: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.task_command = command.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_ruby(mut self, ruby: impl Into<String>) -> Self {
        self.ruby = ruby.into();
        self
    }

    pub fn with_load_paths<I, S>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.load_paths = paths.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_test_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.test_pattern = pattern.into();
        self
    }
}
