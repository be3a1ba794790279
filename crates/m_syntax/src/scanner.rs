//! Line-oriented scanner for Ruby test declarations
//!
//! Recognised declarations:
//! - `def test_name` inside a test class (test-unit / minitest)
//! - `test "some description" do` inside a test class (ActiveSupport), reported as
//!   `test_some_description` after unescaping the description
//!
//! A test class is one declared with a superclass (`class FooTest < Minitest::Test`), either on
//! this opening or on an earlier one in the same file. Plain classes such as test doubles are not
//! suites, even when they define `test_*` methods.
//!
//! ## Scopes
//!
//! `class` and `module` lines open a scope at their indentation. A later line starting with one
//! of the keywords `end`, `class`, `module`, `def` or `test` at the same or a lower indentation
//! closes it, which covers the matching `end` as well as one-line definitions such as
//! `class Foo < Bar; end`.
//!
//! Lines that are not code are skipped: blank lines, `#` comments, `=begin`/`=end` blocks,
//! heredoc bodies, continuation lines of multi-line string, percent and regexp literals, and
//! everything after `__END__`.

use std::collections::{HashSet, VecDeque};
use std::sync::LazyLock;

use indexmap::IndexMap;
use regex::Regex;

use crate::decl::{MethodDecl, ScannedFile, SuiteDecl};

static CLASS_RE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^class\s+([A-Z]\w*(?:::[A-Z]\w*)*)\s*(<)?").ok());
static MODULE_RE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^module\s+([A-Z]\w*(?:::[A-Z]\w*)*)").ok());
static DEF_RE: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r"^def\s+(test_\w*[?!]?)(?:[\s(;]|$)").ok());
static DSL_RE: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(r#"^test\s*\(?\s*(?:"((?:[^"\\]|\\.)*)"|'((?:[^'\\]|\\.)*)')"#).ok()
});
static HEREDOC_RE: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(r#"<<([~-]?)(?:"([^"]+)"|'([^']+)'|`([^`]+)`|([A-Z_]\w*))"#).ok()
});
static WHITESPACE_RE: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r"\s+").ok());

/// Keywords whose lines may close an open scope
const SCOPE_KEYWORDS: [&str; 5] = ["end", "class", "module", "def", "test"];

/// Scan Ruby source for test suites and their test methods.
///
/// Shorthand for `Scanner::new(source).scan()`.
#[tracing::instrument(skip_all, fields(source_len = source.len()))]
pub fn scan(source: &str) -> ScannedFile {
    Scanner::new(source).scan()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScopeKind {
    Module,
    Class,
}

#[derive(Debug)]
struct Scope {
    indent: usize,
    /// Name qualified by every enclosing scope
    path: String,
    kind: ScopeKind,
    is_suite: bool,
}

#[derive(Debug)]
struct Heredoc {
    terminator: String,
    /// `<<-` and `<<~` allow an indented terminator
    indented: bool,
}

impl Heredoc {
    fn is_terminated_by(&self, line: &str) -> bool {
        if self.indented {
            line.trim() == self.terminator
        } else {
            line.trim_end() == self.terminator
        }
    }
}

/// A string-like literal that is still open at the end of a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Literal {
    close: char,
    /// Opening bracket for `%w(...)`-style delimiters, which nest
    open: Option<char>,
    depth: usize,
}

impl Literal {
    fn quoted(close: char) -> Self {
        Self {
            close,
            open: None,
            depth: 0,
        }
    }

    fn delimited(delimiter: char) -> Self {
        let close = match delimiter {
            '(' => ')',
            '[' => ']',
            '{' => '}',
            '<' => '>',
            other => return Self::quoted(other),
        };
        Self {
            close,
            open: Some(delimiter),
            depth: 0,
        }
    }
}

/// Scanner state for a single source file.
pub struct Scanner<'a> {
    source: &'a str,
    scopes: Vec<Scope>,
    /// Heredocs opened on the current line; their bodies follow in order
    heredocs: VecDeque<Heredoc>,
    open_literal: Option<Literal>,
    in_block_comment: bool,
    in_data_section: bool,
    /// Qualified names of classes declared with a superclass
    suite_classes: HashSet<String>,
    suites: IndexMap<String, Vec<MethodDecl>>,
}

impl<'a> Scanner<'a> {
    pub fn new(source: &'a str) -> Self {
        Self {
            source,
            scopes: Vec::new(),
            heredocs: VecDeque::new(),
            open_literal: None,
            in_block_comment: false,
            in_data_section: false,
            suite_classes: HashSet::new(),
            suites: IndexMap::new(),
        }
    }

    /// Scan the whole source.
    pub fn scan(mut self) -> ScannedFile {
        let mut line_count = 0;
        for (idx, line) in self.source.lines().enumerate() {
            line_count = idx + 1;
            self.scan_line(line_count, line);
        }

        let suites: Vec<SuiteDecl> = self
            .suites
            .into_iter()
            .map(|(name, methods)| SuiteDecl { name, methods })
            .collect();

        tracing::debug!(suites = suites.len(), line_count, "scanned test declarations");
        ScannedFile { suites, line_count }
    }

    fn scan_line(&mut self, number: usize, line: &str) {
        if self.in_data_section {
            return;
        }

        if let Some(heredoc) = self.heredocs.front() {
            if heredoc.is_terminated_by(line) {
                self.heredocs.pop_front();
            }
            return;
        }

        if let Some(literal) = self.open_literal.take() {
            self.open_literal = skip_literals(line, Some(literal));
            return;
        }

        if self.in_block_comment {
            if starts_with_word(line, "=end") {
                self.in_block_comment = false;
            }
            return;
        }
        if starts_with_word(line, "=begin") {
            self.in_block_comment = true;
            return;
        }
        if line.trim_end() == "__END__" {
            self.in_data_section = true;
            return;
        }

        let code = line.trim_start();
        if code.is_empty() || code.starts_with('#') {
            return;
        }
        let indent = line.len() - code.len();

        if SCOPE_KEYWORDS.iter().any(|keyword| starts_with_keyword(code, keyword)) {
            while self.scopes.last().is_some_and(|scope| scope.indent >= indent) {
                self.scopes.pop();
            }
        }

        if let Some(caps) = CLASS_RE.as_ref().and_then(|re| re.captures(code)) {
            let path = self.qualify(&caps[1]);
            let is_suite = caps.get(2).is_some() || self.suite_classes.contains(&path);
            if is_suite {
                self.suite_classes.insert(path.clone());
            }
            self.scopes.push(Scope {
                indent,
                path,
                kind: ScopeKind::Class,
                is_suite,
            });
        } else if let Some(name) = capture(&MODULE_RE, code) {
            let path = self.qualify(&name);
            self.scopes.push(Scope {
                indent,
                path,
                kind: ScopeKind::Module,
                is_suite: false,
            });
        } else if let Some(test_name) = test_declaration(code) {
            self.record(test_name, number);
        }

        self.queue_heredocs(code);
        self.open_literal = skip_literals(code, None);
    }

    fn qualify(&self, name: &str) -> String {
        match self.scopes.last() {
            Some(parent) => format!("{}::{}", parent.path, name),
            None => name.to_string(),
        }
    }

    /// Attach a test to the enclosing test class, if there is one.
    fn record(&mut self, test_name: String, line: usize) {
        let Some(innermost) = self.scopes.last() else {
            tracing::trace!(line, test = %test_name, "ignoring test declared outside a class");
            return;
        };
        if innermost.kind != ScopeKind::Class || !innermost.is_suite {
            tracing::trace!(line, test = %test_name, scope = %innermost.path, "ignoring test outside a test class");
            return;
        }

        self.suites
            .entry(innermost.path.clone())
            .or_default()
            .push(MethodDecl::new(test_name, line));
    }

    fn queue_heredocs(&mut self, code: &str) {
        let Some(re) = HEREDOC_RE.as_ref() else {
            return;
        };
        for caps in re.captures_iter(code) {
            let indented = caps.get(1).is_some_and(|m| !m.as_str().is_empty());
            let terminator = (2..=5).find_map(|i| caps.get(i)).map(|m| m.as_str().to_string());
            if let Some(terminator) = terminator {
                self.heredocs.push_back(Heredoc { terminator, indented });
            }
        }
    }
}

/// Walk `line`, starting inside `open` if given, and return the literal still open at its end.
///
/// Recognises quoted strings, backtick commands, `%`-literals with any type letter and
/// delimiter, and `/regexp/` literals in operand position. A `#` outside a literal ends the line.
fn skip_literals(line: &str, open: Option<Literal>) -> Option<Literal> {
    let chars: Vec<char> = line.chars().collect();
    let mut literal = open;
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        if let Some(current) = literal.as_mut() {
            if c == '\\' {
                i += 2;
                continue;
            }
            if current.open == Some(c) {
                current.depth += 1;
            } else if c == current.close {
                if current.depth == 0 {
                    literal = None;
                } else {
                    current.depth -= 1;
                }
            }
            i += 1;
            continue;
        }

        let previous = i.checked_sub(1).map(|p| chars[p]);
        match c {
            '#' => return None,
            '"' | '\'' | '`' => literal = Some(Literal::quoted(c)),
            // `$"` and friends are global variables
            '$' => i += 1,
            '%' if in_operand_position(previous) => {
                let mut next = i + 1;
                if chars.get(next).is_some_and(|t| "qQwWiIrsx".contains(*t)) {
                    next += 1;
                }
                let typed = next > i + 1;
                let delimiter = chars.get(next).copied().filter(|d| {
                    !d.is_alphanumeric() && !d.is_whitespace() && (typed || *d != '=')
                });
                if let Some(delimiter) = delimiter {
                    literal = Some(Literal::delimited(delimiter));
                    i = next;
                }
            }
            '/' if is_regexp_start(&chars, i) => literal = Some(Literal::quoted('/')),
            _ => {}
        }
        i += 1;
    }

    literal
}

/// Whether a `%` or `/` after `previous` starts a literal rather than an operator.
fn in_operand_position(previous: Option<char>) -> bool {
    previous.is_none_or(|p| !(is_ident_char(p) || matches!(p, ')' | ']' | '}')))
}

fn is_regexp_start(chars: &[char], i: usize) -> bool {
    let previous = i.checked_sub(1).map(|p| chars[p]);
    let Some(next) = chars.get(i + 1) else {
        return false;
    };
    match previous {
        // `foo /bar/` reads as a call with a regexp argument, `a / b` as division
        Some(p) if p.is_whitespace() => {
            let before = chars[..i].iter().rev().find(|c| !c.is_whitespace());
            !next.is_whitespace()
                && *next != '='
                && before.is_none_or(|b| !matches!(b, ')' | ']' | '}') && !b.is_ascii_digit())
        }
        _ => in_operand_position(previous),
    }
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// The test name declared on this code line, if any.
fn test_declaration(code: &str) -> Option<String> {
    if let Some(name) = capture(&DEF_RE, code) {
        return Some(name);
    }

    let caps = DSL_RE.as_ref()?.captures(code)?;
    let description = match (caps.get(1), caps.get(2)) {
        (Some(double), _) => unescape(double.as_str(), '"'),
        (None, Some(single)) => unescape(single.as_str(), '\''),
        (None, None) => return None,
    };
    let description = match WHITESPACE_RE.as_ref() {
        Some(ws) => ws.replace_all(&description, "_").into_owned(),
        None => description,
    };
    Some(format!("test_{}", description))
}

/// Resolve the escapes of a string literal body quoted with `quote`.
///
/// Single quotes only escape `\\` and `\'`. Double quotes also turn `\n`, `\t` and `\s` into
/// whitespace, and drop the backslash before any other character.
fn unescape(body: &str, quote: char) -> String {
    let mut out = String::with_capacity(body.len());
    let mut chars = body.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some(escaped) if quote == '"' => out.push(match escaped {
                'n' => '\n',
                't' => '\t',
                's' => ' ',
                other => other,
            }),
            Some(escaped @ ('\\' | '\'')) => out.push(escaped),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}

fn capture(re: &LazyLock<Option<Regex>>, code: &str) -> Option<String> {
    let caps = re.as_ref()?.captures(code)?;
    caps.get(1).map(|m| m.as_str().to_string())
}

/// `line` starts with `word` followed by whitespace or the end of the line.
fn starts_with_word(line: &str, word: &str) -> bool {
    line.strip_prefix(word)
        .is_some_and(|rest| rest.chars().next().is_none_or(char::is_whitespace))
}

/// `code` starts with the keyword `word`, not with a longer identifier.
fn starts_with_keyword(code: &str, word: &str) -> bool {
    code.strip_prefix(word)
        .is_some_and(|rest| rest.chars().next().is_none_or(|c| !is_ident_char(c)))
}


// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn names(file: &ScannedFile) -> Vec<(String, Vec<(String, usize)>)> {
        file.suites
            .iter()
            .map(|s| {
                (
                    s.name.clone(),
                    s.methods.iter().map(|m| (m.name.clone(), m.line)).collect(),
                )
            })
            .collect()
    }

    #[test]
    fn test_single_suite() {
        let source = "\
require 'minitest/autorun'

class MathTest < Minitest::Test
  def test_add
    assert_equal 2, 1 + 1
  end

  def test_sub
    assert_equal 0, 1 - 1
  end
end
";
        let file = scan(source);
        assert_eq!(file.line_count, 11);
        assert_eq!(
            names(&file),
            vec![(
                "MathTest".to_string(),
                vec![("test_add".to_string(), 4), ("test_sub".to_string(), 8)]
            )]
        );
    }

    #[test]
    fn test_helpers_are_not_tests() {
        let source = "\
class HelperTest < Test::Unit::TestCase
  def setup
  end

  def helper_method
  end

  def self.test_class_level
  end

  def testing_without_underscore
  end

  def test_real
  end
end
";
        let file = scan(source);
        assert_eq!(file.test_count(), 1);
        assert_eq!(file.suites[0].methods[0], MethodDecl::new("test_real", 14));
    }

    #[test]
    fn test_predicate_and_bang_names() {
        let source = "class T < Minitest::Test\n  def test_empty?\n  end\n  def test_save!()\n  end\nend\n";
        let file = scan(source);
        let tests: Vec<_> = file.suites[0].methods.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(tests, vec!["test_empty?", "test_save!"]);
    }

    #[test]
    fn test_activesupport_declarations() {
        let source = "\
class UserTest < ActiveSupport::TestCase
  test \"creates a user\" do
  end

  test('rejects   blank  names') do
  end
end
";
        let file = scan(source);
        assert_eq!(
            names(&file)[0].1,
            vec![
                ("test_creates_a_user".to_string(), 2),
                ("test_rejects_blank_names".to_string(), 5)
            ]
        );
    }

    #[test]
    fn test_nested_namespaces_qualify_suite_names() {
        let source = "\
module Billing
  class InvoiceTest < Minitest::Test
    def test_total
    end
  end

  module Reports
    class SummaryTest < Minitest::Test
      def test_render
      end
    end
  end
end
";
        let file = scan(source);
        let suites: Vec<_> = file.suites.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(suites, vec!["Billing::InvoiceTest", "Billing::Reports::SummaryTest"]);
    }

    #[test]
    fn test_compact_class_path() {
        let file = scan("class Billing::InvoiceTest < Minitest::Test\n  def test_x\n  end\nend\n");
        assert_eq!(file.suites[0].name, "Billing::InvoiceTest");
    }

    #[test]
    fn test_methods_in_module_are_ignored() {
        let source = "\
module SharedTests
  def test_shared
  end
end

def test_top_level
end
";
        let file = scan(source);
        assert!(file.is_empty());
        assert_eq!(file.line_count, 7);
    }

    #[test]
    fn test_comments_are_skipped() {
        let source = "\
class CommentTest < Minitest::Test
  # def test_commented_out
  # end

=begin
  def test_in_block_comment
  end
=end

  def test_live
  end
end
";
        let file = scan(source);
        assert_eq!(names(&file)[0].1, vec![("test_live".to_string(), 10)]);
    }

    #[test]
    fn test_heredoc_bodies_are_skipped() {
        let source = "\
class HeredocTest < Minitest::Test
  FIXTURE = <<~RUBY
    class Fake < Minitest::Test
def test_inside_heredoc
    end
  RUBY

  def test_after_heredoc
  end
end
";
        let file = scan(source);
        assert_eq!(names(&file), vec![(
            "HeredocTest".to_string(),
            vec![("test_after_heredoc".to_string(), 8)]
        )]);
    }

    #[test]
    fn test_plain_heredoc_requires_terminator_at_column_zero() {
        let source = "\
class PlainHeredocTest < Minitest::Test
  TEXT = <<EOS
  EOS
def test_still_in_heredoc
EOS

  def test_real
  end
end
";
        let file = scan(source);
        assert_eq!(names(&file)[0].1, vec![("test_real".to_string(), 7)]);
    }

    #[test]
    fn test_data_section_is_ignored() {
        let source = "class DataTest < Minitest::Test\n  def test_a\n  end\nend\n__END__\nclass X\n  def test_b\n  end\nend\n";
        let file = scan(source);
        assert_eq!(file.test_count(), 1);
        assert_eq!(file.line_count, 9);
    }

    #[test]
    fn test_reopened_class_merges_into_first_suite() {
        let source = "\
class ATest < Minitest::Test
  def test_one
  end
end

class BTest < Minitest::Test
  def test_two
  end
end

class ATest
  def test_three
  end
end
";
        let file = scan(source);
        assert_eq!(
            names(&file),
            vec![
                (
                    "ATest".to_string(),
                    vec![("test_one".to_string(), 2), ("test_three".to_string(), 12)]
                ),
                ("BTest".to_string(), vec![("test_two".to_string(), 7)]),
            ]
        );
    }

    #[test]
    fn test_class_shovel_self_is_not_a_scope() {
        let source = "\
class SingletonTest < Minitest::Test
  class << self
    def helper
    end
  end

  def test_after_singleton
  end
end
";
        let file = scan(source);
        assert_eq!(file.suites[0].name, "SingletonTest");
        assert_eq!(file.suites[0].methods[0].line, 7);
    }

    #[test]
    fn test_one_line_class_closes_at_next_line() {
        let source = "class Base < Minitest::Test; end\nclass RealTest < Base\n  def test_x\n  end\nend\n";
        let file = scan(source);
        assert_eq!(file.suites[0].name, "RealTest");
    }

    #[test]
    fn test_empty_source() {
        let file = scan("");
        assert!(file.is_empty());
        assert_eq!(file.line_count, 0);
    }

    #[test]
    fn test_crlf_line_endings() {
        let file = scan("class CrlfTest < Minitest::Test\r\n  def test_a\r\n  end\r\nend\r\n");
        assert_eq!(file.suites[0].methods[0], MethodDecl::new("test_a", 2));
        assert_eq!(file.line_count, 4);
    }

    #[test]
    fn test_multiline_string_does_not_close_class() {
        let source = "\
class SqlTest < Minitest::Test
  def test_a
    sql = \"SELECT *
FROM users\"
    assert sql
  end

  def test_b
  end
end
";
        let file = scan(source);
        assert_eq!(
            names(&file),
            vec![(
                "SqlTest".to_string(),
                vec![("test_a".to_string(), 2), ("test_b".to_string(), 8)]
            )]
        );
    }

    #[test]
    fn test_percent_literal_bodies_are_skipped() {
        let source = "\
class WordsTest < Minitest::Test
  WORDS = %w(
alpha (beta)
end
  )
  QUERY = %q{
def test_inside_literal
}

  def test_words
    assert_match /\"/, WORDS.inspect
  end

  def test_after_regexp
  end
end
";
        let file = scan(source);
        assert_eq!(
            names(&file)[0].1,
            vec![("test_words".to_string(), 10), ("test_after_regexp".to_string(), 14)]
        );
    }

    #[test]
    fn test_modulo_and_division_are_not_literals() {
        let source = "\
class ArithmeticTest < Minitest::Test
  def test_mod
    assert_equal 1, 7 % 3
    assert_equal 2, 6 / 3
  end

  def test_div
  end
end
";
        let file = scan(source);
        assert_eq!(file.test_count(), 2);
        assert_eq!(file.suites[0].methods[1], MethodDecl::new("test_div", 7));
    }

    #[test]
    fn test_only_keyword_lines_close_scopes() {
        let source = "\
class DedentTest < Minitest::Test
  def test_a
    assert_equal 3, [1,
2].sum
  end

  def test_b
  end
end
";
        let file = scan(source);
        assert_eq!(file.suites[0].methods[1], MethodDecl::new("test_b", 7));
    }

    #[test]
    fn test_dsl_description_is_unescaped() {
        let source = "\
class GreetingTest < ActiveSupport::TestCase
  test \"says \\\"hi\\\"\" do
  end

  test 'it\\'s \\\\ fine' do
  end

  test \"tab\\tseparated\" do
  end
end
";
        let file = scan(source);
        let tests: Vec<_> = file.suites[0].methods.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(tests, vec!["test_says_\"hi\"", "test_it's_\\_fine", "test_tab_separated"]);
    }

    #[test]
    fn test_class_without_superclass_is_not_a_suite() {
        let source = "\
class FakeClient
  def test_mode?
  end
end

class ClientTest < Minitest::Test
  def test_real
  end
end
";
        let file = scan(source);
        let suites: Vec<_> = file.suites.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(suites, vec!["ClientTest"]);
        assert_eq!(file.test_count(), 1);
    }

    #[test]
    fn test_nested_plain_class_is_not_a_suite() {
        let source = "\
class OuterTest < Minitest::Test
  class Stub
    def test_stubbed
    end
  end

  def test_outer
  end
end
";
        let file = scan(source);
        assert_eq!(names(&file), vec![("OuterTest".to_string(), vec![("test_outer".to_string(), 7)])]);
    }
}
