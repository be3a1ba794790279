//! Span extraction: turns scanned declarations into bounded test spans.
//!
//! Within each suite, a test owns every line from its declaration up to the line before the
//! next test of the same suite; the last test owns everything up to the end of the file.
//! Suites are handled independently, so spans from different suites may overlap.

use m_syntax::{ScannedFile, SuiteDecl};

use crate::collection::{TestCollection, TestMethod};

/// Build the collection for a scanned file.
///
/// Suites and their methods are emitted in the order the scanner reported them.
#[tracing::instrument(skip_all, fields(suites = file.suites.len(), line_count = file.line_count))]
pub fn extract(file: &ScannedFile) -> TestCollection {
    let mut collection = TestCollection::new();
    for suite in &file.suites {
        collection.extend(suite_spans(suite, file.line_count));
    }
    tracing::debug!(tests = collection.len(), "extracted test spans");
    collection
}

/// Compute the spans of one suite's methods, returned in the suite's declaration order.
pub fn suite_spans(suite: &SuiteDecl, end_of_file: usize) -> Vec<TestMethod> {
    let mut by_start: Vec<usize> = (0..suite.methods.len()).collect();
    by_start.sort_by_key(|&idx| suite.methods[idx].line);

    let mut end_lines = vec![0; suite.methods.len()];
    for (pos, &idx) in by_start.iter().enumerate() {
        let start = suite.methods[idx].line;
        let end = match by_start.get(pos + 1) {
            Some(&next) => suite.methods[next].line.saturating_sub(1),
            None => end_of_file,
        };
        if end < start {
            tracing::warn!(
                suite = %suite.name,
                test = %suite.methods[idx].name,
                line = start,
                "test declaration overlaps the next one; narrowing to a single line"
            );
        }
        end_lines[idx] = end.max(start);
    }

    suite
        .methods
        .iter()
        .zip(end_lines)
        .map(|(method, end_line)| TestMethod::new(method.name.clone(), method.line, end_line))
        .collect()
}
