//! Tests for the `m` binary: exit codes and what reaches stderr

use std::fs;
use std::process::Command;

fn m() -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_m"));
    for var in ["RUST_LOG", "M_TASK_COMMAND", "M_RUBY", "M_LOAD_PATHS", "M_TEST_PATTERN"] {
        cmd.env_remove(var);
    }
    cmd
}

#[test]
fn test_no_match_prints_listing_and_fails() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(
        dir.path().join("math_test.rb"),
        "class MathTest < Minitest::Test\n  def test_add\n  end\n\n  def test_subtract\n  end\nend\n",
    )
    .unwrap();

    let output = m().arg("math_test.rb:99").current_dir(dir.path()).output().unwrap();

    assert_eq!(output.status.code(), Some(1));
    assert!(output.stdout.is_empty());
    assert_eq!(
        String::from_utf8_lossy(&output.stderr),
        "No tests found on line 99. Valid tests to run:\n\n\
         \x20\x20\x20\x20\x20test_add: m math_test.rb:2\n\
         test_subtract: m math_test.rb:5\n"
    );
}

#[test]
fn test_missing_file_reports_load_failure() {
    let dir = tempfile::tempdir().unwrap();

    let output = m().arg("missing_test.rb:3").current_dir(dir.path()).output().unwrap();

    assert_eq!(output.status.code(), Some(1));
    assert_eq!(
        String::from_utf8_lossy(&output.stderr),
        "Failed loading test file:\ncannot load such file -- missing_test.rb\n"
    );
}

#[cfg(unix)]
#[test]
fn test_engine_status_is_propagated() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(
        dir.path().join("math_test.rb"),
        "class MathTest < Minitest::Test\n  def test_add\n  end\nend\n",
    )
    .unwrap();
    // `false` ignores its arguments and exits 1, standing in for a failing test run
    fs::write(dir.path().join(".m.toml"), "ruby = \"false\"\n").unwrap();

    let output = m().arg("math_test.rb:2").current_dir(dir.path()).output().unwrap();

    assert_eq!(output.status.code(), Some(1));
    assert!(output.stderr.is_empty());
}

#[test]
fn test_invalid_config_aborts() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join(".m.toml"), "task_command = []\n").unwrap();

    let output = m().arg("anything_test.rb:1").current_dir(dir.path()).output().unwrap();

    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("task_command"));
}
