//! Step verifier: the Open -> Complete transition.
//!
//! Gates run in a fixed order and the first failure locks with its reason.
//! Gate failures are returned as [`VerifyOutcome::Failed`]; errors are
//! reserved for state violations, format errors and I/O.

use std::path::{Path, PathBuf};

use anyhow::Result;
use tracing::{debug, info, instrument, warn};

use crate::core::step_doc::{StepDocument, mark_complete};
use crate::core::step_ref::StepRef;
use crate::core::tree_doc::check_entry;
use crate::core::types::{
    Gate, GateFailure, REASON_EXPECTED_OUTPUT, REASON_INCOMPLETE_CHECKLIST,
    REASON_PENDING_QUESTIONS, incomplete_child_reason, missing_child_reason,
};
use crate::error::GateError;
use crate::io::git::VersionControl;
use crate::io::process::ProcessRunner;
use crate::io::store::{read_document, read_optional, write_atomic};
use crate::outputs::{RunPolicy, check_expectations, load_expected};
use crate::registry::{Resolution, StepRegistry, locate_tree};
use crate::session::Session;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerifyOutcome {
    Completed {
        step: PathBuf,
        /// Non-blocking findings (uncommitted changes).
        advisories: Vec<String>,
    },
    Failed(GateFailure),
}

impl VerifyOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, VerifyOutcome::Completed { .. })
    }
}

/// Result of `next`: either blocked by a gate, or moved on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Advance {
    Blocked(GateFailure),
    Moved {
        completed: PathBuf,
        advisories: Vec<String>,
        next: Resolution,
    },
}

pub struct StepVerifier<'a, R: ProcessRunner, V: VersionControl> {
    session: &'a Session,
    runner: &'a R,
    vcs: &'a V,
}

impl<'a, R: ProcessRunner, V: VersionControl> StepVerifier<'a, R, V> {
    pub fn new(session: &'a Session, runner: &'a R, vcs: &'a V) -> Self {
        Self {
            session,
            runner,
            vcs,
        }
    }

    /// Run every gate against `step` and complete it if all pass.
    #[instrument(skip_all, fields(step = %step.display()))]
    pub fn verify(&self, step: &Path) -> Result<VerifyOutcome> {
        self.session.locks().assert_is_active(step)?;

        let Some(text) = read_optional(step)? else {
            return Err(GateError::state(format!(
                "step document not found: {}",
                step.display()
            ))
            .into());
        };
        let reference = step_ref_for(step)?;
        let doc = StepDocument::parse(&text);

        if !doc.all_items_checked() {
            let open: Vec<&str> = doc.open_items().map(|item| item.text.as_str()).collect();
            return self.fail(
                GateFailure::new(Gate::Checklist, REASON_INCOMPLETE_CHECKLIST)
                    .with_detail(open.join("\n")),
            );
        }

        if doc.has_open_questions {
            return self.fail(GateFailure::new(Gate::OpenQuestions, REASON_PENDING_QUESTIONS));
        }

        if let Some(failure) = self.check_children(&doc)? {
            return self.fail(failure);
        }

        if let Some(failure) = self.check_expected_output(&reference, step)? {
            return self.fail(failure);
        }

        let advisories = self.advisories();
        self.complete(step, &reference, &text)?;
        self.session.locks().unlock()?;
        self.session.ledger().record_hash(step)?;
        info!(step = %reference, "step completed");

        Ok(VerifyOutcome::Completed {
            step: step.to_path_buf(),
            advisories,
        })
    }

    /// `next`: verify the active step, then resolve the one after it.
    pub fn advance(&self, registry: &StepRegistry<'_>) -> Result<Advance> {
        self.session.locks().assert_unlocked()?;
        let Some(active) = self.session.locks().active()? else {
            return Err(GateError::state("no current step defined").into());
        };
        match self.verify(&active)? {
            VerifyOutcome::Failed(failure) => Ok(Advance::Blocked(failure)),
            VerifyOutcome::Completed { step, advisories } => Ok(Advance::Moved {
                completed: step,
                advisories,
                next: registry.resolve_active_step()?,
            }),
        }
    }

    fn fail(&self, failure: GateFailure) -> Result<VerifyOutcome> {
        warn!(gate = %failure.gate, reason = %failure.reason, "gate failed");
        self.session.locks().lock(&failure.reason)?;
        Ok(VerifyOutcome::Failed(failure))
    }

    /// Single level: a child's own status marker is trusted.
    fn check_children(&self, doc: &StepDocument) -> Result<Option<GateFailure>> {
        for child in &doc.children {
            let name = child.to_string();
            let path = self.session.paths().step_path(&name);
            let Some(text) = read_optional(&path)? else {
                return Ok(Some(GateFailure::new(
                    Gate::ChildSteps,
                    missing_child_reason(&name),
                )));
            };
            if !StepDocument::parse(&text).is_complete() {
                return Ok(Some(GateFailure::new(
                    Gate::ChildSteps,
                    incomplete_child_reason(&name),
                )));
            }
            debug!(child = %name, "child step complete");
        }
        Ok(None)
    }

    fn check_expected_output(&self, reference: &StepRef, step: &Path) -> Result<Option<GateFailure>> {
        let spec_path = self.session.paths().expected_path(reference.number());
        let spec = match load_expected(&spec_path) {
            Ok(Some(spec)) => spec,
            Ok(None) => {
                debug!(spec = %spec_path.display(), "no expected output specification");
                return Ok(None);
            }
            Err(err) => {
                return Ok(Some(
                    GateFailure::new(Gate::ExpectedOutput, REASON_EXPECTED_OUTPUT)
                        .with_detail(format!("{err:#}")),
                ));
            }
        };
        let failures = check_expectations(
            self.session,
            self.runner,
            &spec,
            step,
            RunPolicy::StopAtFirstFailure,
        )?;
        Ok(failures.into_iter().next().map(|failure| {
            GateFailure::new(Gate::ExpectedOutput, REASON_EXPECTED_OUTPUT)
                .with_detail(format!("{}\n{}", failure.summary, failure.detail))
        }))
    }

    fn advisories(&self) -> Vec<String> {
        match self.vcs.uncommitted_changes() {
            Ok(changes) if changes.is_empty() => Vec::new(),
            Ok(changes) => {
                warn!(count = changes.len(), "uncommitted changes in working tree");
                vec![format!(
                    "{} uncommitted change(s) in the working tree",
                    changes.len()
                )]
            }
            Err(err) => {
                debug!(err = %err, "working tree status unavailable");
                vec![format!("could not inspect the working tree: {err}")]
            }
        }
    }

    /// Flip the step's status line and its tree entry.
    ///
    /// Both edits are computed before writing; if the tree write fails the
    /// step document is restored.
    fn complete(&self, step: &Path, reference: &StepRef, step_text: &str) -> Result<()> {
        let Some(tree) = locate_tree(self.session.paths())? else {
            return Err(GateError::state("no tree document to record completion in").into());
        };
        let tree_text = read_document(&tree.path)?;
        let completed_step = mark_complete(step_text)?;
        let completed_tree = check_entry(&tree_text, &reference.to_string())?;

        write_atomic(step, &completed_step)?;
        if let Err(err) = write_atomic(&tree.path, &completed_tree) {
            warn!(err = %err, "tree update failed, restoring step document");
            write_atomic(step, step_text)?;
            return Err(err);
        }
        Ok(())
    }
}

fn step_ref_for(step: &Path) -> Result<StepRef> {
    let name = step
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| GateError::format(format!("not a step document: {}", step.display())))?;
    Ok(StepRef::parse(name)?)
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;
    use crate::core::tree_doc::{TreeDocument, TreeKind};
    use crate::test_support::{FakeVcs, ScriptedRunner, TestWorkspace, step_document};

    const STEP: &str = "STEP_01__Build.md";

    /// Workspace with a single open step made active.
    fn active_workspace(body: &str) -> (TestWorkspace, PathBuf) {
        let ws = TestWorkspace::new();
        ws.write_tree(TreeKind::Maintenance, &[(false, STEP), (false, "STEP_02__Ship.md")]);
        let path = ws.write_step(STEP, body);
        ws.session().locks().set_active(&path).expect("pointer");
        (ws, path)
    }

    fn verify(ws: &TestWorkspace, path: &Path, runner: &ScriptedRunner) -> VerifyOutcome {
        StepVerifier::new(ws.session(), runner, &FakeVcs::clean())
            .verify(path)
            .expect("verify")
    }

    fn tree_open_count(ws: &TestWorkspace) -> usize {
        let text = fs::read_to_string(ws.session().paths().tree_path(TreeKind::Maintenance))
            .expect("tree");
        TreeDocument::parse(&text).expect("parse").open_count()
    }

    /// All four blocking conditions, each independently switchable.
    struct Conditions {
        checked: bool,
        no_questions: bool,
        children_complete: bool,
        commands_pass: bool,
    }

    fn run_with(conditions: &Conditions) -> (VerifyOutcome, TestWorkspace) {
        let body = step_document(
            &[("design", true), ("implement", conditions.checked)],
            &["STEP_01A__Child.md"],
            !conditions.no_questions,
        );
        let (ws, path) = active_workspace(&body);
        let child_status = if conditions.children_complete {
            "✅ Complete"
        } else {
            "☐ In Progress"
        };
        ws.write_step("STEP_01A__Child.md", &format!("**Status:** {child_status}\n"));
        ws.write_expected("01", r#"{"validation_commands": ["make check"]}"#);
        let runner = if conditions.commands_pass {
            ScriptedRunner::passing()
        } else {
            ScriptedRunner::failing(&["make check"])
        };
        let outcome = verify(&ws, &path, &runner);
        (outcome, ws)
    }

    #[test]
    fn succeeds_iff_every_gate_holds() {
        for mask in 0u8..16 {
            let conditions = Conditions {
                checked: mask & 1 != 0,
                no_questions: mask & 2 != 0,
                children_complete: mask & 4 != 0,
                commands_pass: mask & 8 != 0,
            };
            let (outcome, ws) = run_with(&conditions);
            assert_eq!(outcome.is_completed(), mask == 15, "mask {mask:#06b}");
            assert_eq!(ws.session().locks().is_locked(), mask != 15, "mask {mask:#06b}");
        }
    }

    #[test]
    fn gates_run_in_order() {
        let (outcome, _ws) = run_with(&Conditions {
            checked: false,
            no_questions: false,
            children_complete: false,
            commands_pass: false,
        });
        let VerifyOutcome::Failed(failure) = outcome else {
            panic!("expected failure");
        };
        assert_eq!(failure.gate, Gate::Checklist);
        assert_eq!(failure.reason, REASON_INCOMPLETE_CHECKLIST);
        assert_eq!(failure.detail.as_deref(), Some("implement"));

        let (outcome, _ws) = run_with(&Conditions {
            checked: true,
            no_questions: true,
            children_complete: false,
            commands_pass: false,
        });
        assert!(matches!(
            outcome,
            VerifyOutcome::Failed(GateFailure { gate: Gate::ChildSteps, ref reason, .. })
                if reason == "incomplete child step: STEP_01A__Child.md"
        ));
    }

    #[test]
    fn completion_flips_step_and_tree_and_clears_stale_lock() {
        let body = step_document(&[("design", true)], &[], false);
        let (ws, path) = active_workspace(&body);
        ws.session().locks().lock("stale").expect("stale lock");

        let outcome = verify(&ws, &path, &ScriptedRunner::passing());
        assert!(outcome.is_completed());
        assert!(!ws.session().locks().is_locked());
        let text = fs::read_to_string(&path).expect("step");
        assert!(StepDocument::parse(&text).is_complete());
        assert_eq!(tree_open_count(&ws), 1);
        assert!(
            ws.session().ledger().verify_all().expect("verify").is_clean(),
            "completion re-records the step hash"
        );
    }

    #[test]
    fn failing_command_logs_an_inconsistency_with_output() {
        let body = step_document(&[("design", true)], &[], false);
        let (ws, path) = active_workspace(&body);
        ws.write_expected("01", r#"{"validation_commands": ["make check"]}"#);

        let outcome = verify(&ws, &path, &ScriptedRunner::failing(&["make check"]));
        let VerifyOutcome::Failed(failure) = outcome else {
            panic!("expected failure");
        };
        assert_eq!(failure.reason, REASON_EXPECTED_OUTPUT);
        assert!(failure.detail.as_deref().is_some_and(|d| d.contains("scripted failure")));
        let logged = fs::read_to_string(&ws.session().paths().inconsistencies_path).expect("log");
        assert!(logged.contains("**File:** steps/STEP_01__Build.md"));
        assert!(logged.contains("Validation command failed: make check"));
        assert_eq!(tree_open_count(&ws), 2, "no completion on failure");
    }

    #[test]
    fn missing_specification_is_not_applicable() {
        let body = step_document(&[("design", true)], &[], false);
        let (ws, path) = active_workspace(&body);
        let runner = ScriptedRunner::failing(&["anything"]);
        assert!(verify(&ws, &path, &runner).is_completed());
        assert!(runner.calls().is_empty());
    }

    #[test]
    fn malformed_specification_fails_the_gate() {
        let body = step_document(&[("design", true)], &[], false);
        let (ws, path) = active_workspace(&body);
        ws.write_expected("01", "{ not json");
        let outcome = verify(&ws, &path, &ScriptedRunner::passing());
        assert!(matches!(
            outcome,
            VerifyOutcome::Failed(GateFailure { gate: Gate::ExpectedOutput, .. })
        ));
    }

    #[test]
    fn dirty_working_tree_is_advisory_only() {
        let body = step_document(&[("design", true)], &[], false);
        let (ws, path) = active_workspace(&body);
        let outcome = StepVerifier::new(ws.session(), &ScriptedRunner::passing(), &FakeVcs::dirty())
            .verify(&path)
            .expect("verify");
        let VerifyOutcome::Completed { advisories, .. } = outcome else {
            panic!("expected completion");
        };
        assert_eq!(advisories, vec!["1 uncommitted change(s) in the working tree"]);
    }

    #[test]
    fn verifying_a_non_active_step_is_a_state_violation() {
        let body = step_document(&[("design", true)], &[], false);
        let (ws, _path) = active_workspace(&body);
        let other = ws.write_step("STEP_02__Ship.md", &body);
        let err = StepVerifier::new(ws.session(), &ScriptedRunner::passing(), &FakeVcs::clean())
            .verify(&other)
            .expect_err("not active");
        assert!(matches!(err.downcast_ref::<GateError>(), Some(GateError::StateViolation(_))));
        assert!(!ws.session().locks().is_locked());
    }

    #[test]
    fn advance_requires_unlocked_and_moves_on() {
        let body = step_document(&[("design", true)], &[], false);
        let (ws, path) = active_workspace(&body);
        let registry = StepRegistry::new(ws.session()).expect("registry");
        let runner = ScriptedRunner::passing();
        let vcs = FakeVcs::clean();
        let verifier = StepVerifier::new(ws.session(), &runner, &vcs);

        ws.session().locks().halt("wait").expect("halt");
        let err = verifier.advance(&registry).expect_err("locked");
        assert!(matches!(err.downcast_ref::<GateError>(), Some(GateError::Locked { .. })));
        ws.session().locks().unlock().expect("unlock");

        let Advance::Moved { completed, next, .. } = verifier.advance(&registry).expect("advance")
        else {
            panic!("expected to move on");
        };
        assert_eq!(completed, path);
        let Resolution::Active(active) = next else {
            panic!("expected step 2");
        };
        assert_eq!(active.reference.to_string(), "STEP_02__Ship.md");
        assert!(active.created);
    }
}
