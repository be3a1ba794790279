//! Declarations reported by the scanner.

/// A test method declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodDecl {
    /// Invocable method name (e.g. `test_parses_empty_input`)
    pub name: String,
    /// 1-based line the declaration starts on
    pub line: usize,
}

impl MethodDecl {
    pub fn new(name: impl Into<String>, line: usize) -> Self {
        Self {
            name: name.into(),
            line,
        }
    }
}

/// A test suite (class) and the test methods declared in it, in source order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SuiteDecl {
    /// Fully qualified class name, e.g. `Billing::InvoiceTest`
    pub name: String,
    pub methods: Vec<MethodDecl>,
}

/// Everything the scanner learned about one file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScannedFile {
    /// Suites with at least one test, in order of their first test declaration
    pub suites: Vec<SuiteDecl>,
    /// Number of lines in the source (the end-of-file line)
    pub line_count: usize,
}

impl ScannedFile {
    /// Total number of test methods across all suites.
    pub fn test_count(&self) -> usize {
        self.suites.iter().map(|s| s.methods.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.suites.is_empty()
    }
}
