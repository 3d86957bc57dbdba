//! End-to-end scenarios across registry, verifier and push gate.

use std::fs;
use std::path::Path;

use stepgate::core::checklist::check_line;
use stepgate::core::step_doc::{StepDocument, mark_complete};
use stepgate::core::tree_doc::TreeKind;
use stepgate::core::types::{REASON_CHECKLIST_INCOMPLETE, REASON_TAMPERING};
use stepgate::error::GateError;
use stepgate::exec::exec_command;
use stepgate::publish::{PublishOutcome, PushGate};
use stepgate::registry::{ActiveStep, Resolution, StepRegistry};
use stepgate::test_support::{FakeVcs, ScriptedRunner, TestWorkspace, step_document};
use stepgate::verify::{Advance, StepVerifier, VerifyOutcome};

fn resolve_active(ws: &TestWorkspace) -> ActiveStep {
    let registry = StepRegistry::new(ws.session()).expect("registry");
    match registry.resolve_active_step().expect("resolve") {
        Resolution::Active(active) => active,
        other => panic!("expected an active step, got {other:?}"),
    }
}

/// Check every open box in a step document, as an actor would.
fn tick_all(path: &Path) {
    let text = fs::read_to_string(path).expect("read step");
    let mut ticked: String = text
        .lines()
        .map(|line| check_line(line).unwrap_or_else(|| line.to_string()))
        .collect::<Vec<_>>()
        .join("\n");
    ticked.push('\n');
    fs::write(path, ticked).expect("write step");
}

#[test]
fn second_step_is_active_and_publish_is_blocked() {
    let ws = TestWorkspace::new();
    ws.write_tree(
        TreeKind::NewInitiative,
        &[(true, "STEP_01__Choose_Stack.md"), (false, "STEP_02__Scaffold.md")],
    );

    let active = resolve_active(&ws);
    assert_eq!(active.reference.to_string(), "STEP_02__Scaffold.md");
    assert!(active.created);
    let text = fs::read_to_string(&active.path).expect("created document");
    assert!(text.starts_with("# STEP 02: Scaffold\n"));
    assert!(text.contains("## 📁 Task"));
    assert_eq!(
        ws.session().locks().active().expect("pointer"),
        Some(active.path.clone())
    );

    let runner = ScriptedRunner::passing();
    let vcs = FakeVcs::dirty();
    let outcome = PushGate::new(ws.session(), &runner, &vcs)
        .attempt_publish()
        .expect("attempt");
    let PublishOutcome::Blocked(failure) = outcome else {
        panic!("publish must be blocked");
    };
    assert_eq!(failure.reason, REASON_CHECKLIST_INCOMPLETE);
    assert!(vcs.published().is_empty());
    let marker = ws.session().locks().current().expect("read").expect("locked");
    assert_eq!(marker.reason, REASON_CHECKLIST_INCOMPLETE);
}

#[test]
fn editing_a_ledgered_document_is_detected_and_locks() {
    let ws = TestWorkspace::new();
    ws.write_tree(TreeKind::Maintenance, &[(false, "STEP_01__Fix_Build.md")]);
    let active = resolve_active(&ws);

    fs::write(&active.path, "**Status:** ✅ Complete\n").expect("tamper");

    let registry = StepRegistry::new(ws.session()).expect("registry");
    let err = registry.resolve_active_step().expect_err("tampering");
    match err.downcast_ref::<GateError>() {
        Some(GateError::IntegrityViolation { path, .. }) => assert_eq!(path, &active.path),
        other => panic!("expected an integrity violation, got {other:?}"),
    }
    let marker = ws.session().locks().current().expect("read").expect("locked");
    assert_eq!(marker.reason, REASON_TAMPERING);
}

#[test]
fn missing_child_blocks_until_it_exists_and_is_complete() {
    let ws = TestWorkspace::new();
    ws.write_tree(TreeKind::Maintenance, &[(false, "STEP_01__Build.md")]);
    ws.write_step(
        "STEP_01__Build.md",
        &step_document(&[("compile", true)], &["STEP_01A__Child.md"], false),
    );
    let active = resolve_active(&ws);

    let runner = ScriptedRunner::passing();
    let vcs = FakeVcs::clean();
    let verifier = StepVerifier::new(ws.session(), &runner, &vcs);
    let VerifyOutcome::Failed(failure) = verifier.verify(&active.path).expect("verify") else {
        panic!("missing child must fail");
    };
    assert_eq!(failure.reason, "missing child step: STEP_01A__Child.md");
    assert!(ws.session().locks().is_locked());

    let registry = StepRegistry::new(ws.session()).expect("registry");
    let child = registry
        .create_step_document("STEP_01A__Child.md")
        .expect("create child");
    let child_text = fs::read_to_string(&child).expect("child");
    assert!(!StepDocument::parse(&child_text).is_complete());
    fs::write(&child, mark_complete(&child_text).expect("mark")).expect("write child");

    assert!(verifier.verify(&active.path).expect("verify").is_completed());
    assert!(!ws.session().locks().is_locked());
}

#[test]
fn full_lifecycle_reaches_publish() {
    let ws = TestWorkspace::new();
    ws.write_tree(
        TreeKind::Maintenance,
        &[(false, "STEP_01__Reproduce.md"), (false, "STEP_02__Fix.md")],
    );
    ws.write_expected("02", r#"{"validation_commands": ["cargo test"], "expected_logs": ["make lint"]}"#);

    let runner = ScriptedRunner::passing();
    let vcs = FakeVcs::dirty();
    let registry = StepRegistry::new(ws.session()).expect("registry");
    let verifier = StepVerifier::new(ws.session(), &runner, &vcs);

    let first = resolve_active(&ws);
    tick_all(&first.path);
    let Advance::Moved { next, advisories, .. } = verifier.advance(&registry).expect("advance") else {
        panic!("first step must complete");
    };
    assert_eq!(advisories.len(), 1, "dirty working tree is reported");
    let Resolution::Active(second) = next else {
        panic!("second step must become active");
    };
    assert_eq!(second.reference.to_string(), "STEP_02__Fix.md");

    tick_all(&second.path);
    exec_command(ws.session(), &runner, "make lint").expect("exec");
    let Advance::Moved { next, .. } = verifier.advance(&registry).expect("advance") else {
        panic!("second step must complete");
    };
    assert!(matches!(next, Resolution::AllComplete(_)));
    assert_eq!(runner.calls(), vec!["make lint", "cargo test"]);

    let outcome = PushGate::new(ws.session(), &runner, &vcs)
        .attempt_publish()
        .expect("attempt");
    assert!(matches!(outcome, PublishOutcome::Published { committed: true, .. }));
    assert_eq!(vcs.published(), vec!["Completed checklist steps"]);
    assert!(ws.session().ledger().verify_all().expect("verify").is_clean());
}
