//! Static declaration scanner for Ruby test files.
//!
//! Finds test suites (classes declared with a superclass) and the test methods they declare,
//! together with the line each declaration starts on, without loading or executing the file.
//!
//! ## Notes
//! - The scanner is line-oriented and keyed on indentation, not a full Ruby parser.
//! - It never fails: any text produces a (possibly empty) [`ScannedFile`].
//!
//! ## Examples
//! ```rust
//! use m_syntax::scan;
//!
//! let file = scan("class MathTest < Minitest::Test\n  def test_add\n  end\nend\n");
//! assert_eq!(file.suites.len(), 1);
//! assert_eq!(file.suites[0].name, "MathTest");
//! assert_eq!(file.suites[0].methods[0].line, 2);
//! assert_eq!(file.line_count, 4);
//! ```

pub mod decl;
pub mod scanner;

pub use decl::{MethodDecl, ScannedFile, SuiteDecl};
pub use scanner::{Scanner, scan};
