//! Selecting tests by line, and the report shown when nothing matches.

use std::fmt::Write as _;

use crate::collection::{TestCollection, TestMethod};

/// Command name shown in the suggestions of the no-match report.
pub const PROGRAM: &str = "m";

/// Outcome of looking up a line in a file's tests.
#[derive(Debug, PartialEq, Eq)]
pub enum Selection<'a> {
    /// At least one test owns the line
    Matched(Vec<&'a TestMethod>),
    /// No test owns the line
    Unmatched,
}

impl<'a> Selection<'a> {
    pub fn for_line(tests: &'a TestCollection, line: usize) -> Self {
        let matched = tests.within(line);
        if matched.is_empty() {
            Selection::Unmatched
        } else {
            Selection::Matched(matched)
        }
    }
}

/// Name filter satisfied by exactly the given test names.
///
/// Each name is escaped and the alternation is anchored, so `test_a` never selects
/// `test_ab`. Repeated names appear once.
pub fn selection_expression<'a>(names: impl IntoIterator<Item = &'a str>) -> String {
    let mut unique: Vec<&str> = Vec::new();
    for name in names {
        if !unique.contains(&name) {
            unique.push(name);
        }
    }
    let alternation = unique
        .iter()
        .map(|name| regex::escape(name))
        .collect::<Vec<_>>()
        .join("|");
    format!("/^(?:{})$/", alternation)
}

/// The listing shown when no test owns `line`: every test in line order with the
/// command that runs it, names right-aligned to a common width.
pub fn no_match_report(tests: &TestCollection, file: &str, line: usize) -> String {
    let mut report = format!("No tests found on line {}. Valid tests to run:\n\n", line);
    let width = tests.column_size();
    tests.by_line_number(|test| {
        let _ = writeln!(
            report,
            "{:>width$}: {} {}:{}",
            test.name,
            PROGRAM,
            file,
            test.start_line,
            width = width
        );
    });
    report
}
