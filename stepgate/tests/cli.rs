//! CLI tests: spawn the stepgate binary and check exit codes.

use std::process::{Command, Output};

use stepgate::core::tree_doc::TreeKind;
use stepgate::exit_codes;
use stepgate::test_support::TestWorkspace;

fn stepgate(ws: &TestWorkspace, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_stepgate"))
        .arg("--root")
        .arg(ws.root())
        .args(args)
        .env_remove("RUST_LOG")
        .output()
        .expect("run stepgate")
}

#[test]
fn active_on_complete_tree_exits_with_complete_code() {
    let ws = TestWorkspace::new();
    ws.write_tree(TreeKind::Maintenance, &[(true, "STEP_01__Fix_Build.md")]);

    let output = stepgate(&ws, &["active"]);
    assert_eq!(output.status.code(), Some(exit_codes::COMPLETE));
    assert!(String::from_utf8_lossy(&output.stdout).contains("All steps complete"));
}

#[test]
fn active_with_open_step_prints_its_path() {
    let ws = TestWorkspace::new();
    ws.write_tree(TreeKind::Maintenance, &[(false, "STEP_01__Fix_Build.md")]);

    let output = stepgate(&ws, &["active"]);
    assert_eq!(output.status.code(), Some(exit_codes::OK));
    assert!(String::from_utf8_lossy(&output.stdout).contains("steps/STEP_01__Fix_Build.md"));
    assert!(ws.root().join("steps/STEP_01__Fix_Build.md").is_file());
}

#[test]
fn check_fails_while_locked_and_passes_after_unlock() {
    let ws = TestWorkspace::new();
    ws.session().locks().halt("waiting on review").expect("halt");

    let output = stepgate(&ws, &["check"]);
    assert_eq!(output.status.code(), Some(exit_codes::FAILED));
    assert!(String::from_utf8_lossy(&output.stdout).contains("waiting on review"));

    assert_eq!(stepgate(&ws, &["unlock"]).status.code(), Some(exit_codes::OK));
    assert_eq!(stepgate(&ws, &["check"]).status.code(), Some(exit_codes::OK));
}

#[test]
fn failing_exec_locks_and_blocks_the_next_exec() {
    let ws = TestWorkspace::new();

    let output = stepgate(&ws, &["exec", "exit", "3"]);
    assert_eq!(output.status.code(), Some(exit_codes::FAILED));
    assert!(ws.session().locks().is_locked());

    let output = stepgate(&ws, &["exec", "true"]);
    assert_eq!(output.status.code(), Some(exit_codes::FAILED));
    assert!(String::from_utf8_lossy(&output.stdout).contains("❌ Operation blocked: command failed: exit 3"));
}
