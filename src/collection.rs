//! Test methods with their owned line spans, and the per-file collection of them.

/// A test method and the span of source lines it owns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestMethod {
    /// Invocable name, unique within its suite only
    pub name: String,
    /// 1-based line the declaration starts on
    pub start_line: usize,
    /// 1-based inclusive end of the owned span
    pub end_line: usize,
}

impl TestMethod {
    pub fn new(name: impl Into<String>, start_line: usize, end_line: usize) -> Self {
        Self {
            name: name.into(),
            start_line,
            end_line,
        }
    }

    /// Whether `line` falls inside this method's span.
    pub fn contains(&self, line: usize) -> bool {
        (self.start_line..=self.end_line).contains(&line)
    }
}

/// The test methods of one file, in discovery order.
///
/// Built once per invocation and only read afterwards.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TestCollection {
    tests: Vec<TestMethod>,
}

impl TestCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a test. Duplicates are kept.
    pub fn push(&mut self, test: TestMethod) {
        self.tests.push(test);
    }

    /// Every test whose span contains `line`, in collection order.
    pub fn within(&self, line: usize) -> Vec<&TestMethod> {
        self.tests.iter().filter(|test| test.contains(line)).collect()
    }

    /// Visit every test in ascending start line order.
    pub fn by_line_number(&self, mut visit: impl FnMut(&TestMethod)) {
        self.ordered_by_line().for_each(|test| visit(test));
    }

    /// Tests in ascending start line order; equal start lines keep insertion order.
    pub fn ordered_by_line(&self) -> impl Iterator<Item = &TestMethod> {
        let mut ordered: Vec<&TestMethod> = self.tests.iter().collect();
        // Stable sort keeps insertion order for ties
        ordered.sort_by_key(|test| test.start_line);
        ordered.into_iter()
    }

    /// Width of the longest test name, `0` when empty.
    pub fn column_size(&self) -> usize {
        self.tests
            .iter()
            .map(|test| test.name.chars().count())
            .max()
            .unwrap_or(0)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, TestMethod> {
        self.tests.iter()
    }

    pub fn len(&self) -> usize {
        self.tests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tests.is_empty()
    }
}

impl Extend<TestMethod> for TestCollection {
    fn extend<I: IntoIterator<Item = TestMethod>>(&mut self, iter: I) {
        self.tests.extend(iter);
    }
}

impl FromIterator<TestMethod> for TestCollection {
    fn from_iter<I: IntoIterator<Item = TestMethod>>(iter: I) -> Self {
        Self {
            tests: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a TestCollection {
    type Item = &'a TestMethod;
    type IntoIter = std::slice::Iter<'a, TestMethod>;

    fn into_iter(self) -> Self::IntoIter {
        self.tests.iter()
    }
}
