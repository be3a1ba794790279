#![forbid(unsafe_code)]
//! Run a single Ruby test by pointing at its file and line number.
//!
//! `m test/models/user_test.rb:42` finds the test method(s) whose body spans line 42 and runs
//! only those through `ruby -n`. When no test owns the line, every test in the file is listed
//! with the command that runs it.
//!
//! The pipeline is:
//!
//! 1. [`loader`] reads the file and scans it for test declarations (the file is never executed)
//! 2. [`extract`] turns declarations into line spans, collected in a [`collection::TestCollection`]
//! 3. [`selector`] picks the tests owning the line, or renders the no-match listing
//! 4. [`cli`] hands the selection to ruby, or the whole run to rake
//!
//! ## Panic Policy
//!
//! Production code returns `Result` and propagates with `?`. The `cli` module enforces
//! `#![deny(clippy::unwrap_used)]`. `.unwrap()` is acceptable in tests.

pub mod cli;
pub mod collection;
pub mod config;
pub mod extract;
pub mod loader;
pub mod selector;

pub use collection::{TestCollection, TestMethod};
pub use config::RunnerConfig;
pub use extract::extract;
pub use selector::{Selection, no_match_report, selection_expression};
