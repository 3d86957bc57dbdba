//! Push gate: the final allow/deny decision before publishing.

use anyhow::Result;
use tracing::{info, instrument, warn};

use crate::core::types::{
    Gate, GateFailure, REASON_CHECKLIST_INCOMPLETE, REASON_INCONSISTENCIES,
    REASON_OUTPUT_VALIDATION, REASON_SCRATCHPAD_QUESTIONS, publish_error_reason,
};
use crate::io::git::VersionControl;
use crate::io::process::ProcessRunner;
use crate::outputs::validate_outputs;
use crate::registry::StepRegistry;
use crate::session::Session;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublishOutcome {
    Published {
        committed: bool,
        push_output: String,
    },
    Blocked(GateFailure),
}

pub struct PushGate<'a, R: ProcessRunner, V: VersionControl> {
    session: &'a Session,
    runner: &'a R,
    vcs: &'a V,
}

impl<'a, R: ProcessRunner, V: VersionControl> PushGate<'a, R, V> {
    pub fn new(session: &'a Session, runner: &'a R, vcs: &'a V) -> Self {
        Self {
            session,
            runner,
            vcs,
        }
    }

    /// Short-circuiting gate chain, then publish.
    ///
    /// An existing lock blocks without being rewritten. Every other failure
    /// locks with its own reason.
    #[instrument(skip_all)]
    pub fn attempt_publish(&self) -> Result<PublishOutcome> {
        if let Some(marker) = self.session.locks().current()? {
            info!(reason = %marker.reason, "publish blocked by existing lock");
            return Ok(PublishOutcome::Blocked(GateFailure::new(
                Gate::Unlocked,
                marker.reason,
            )));
        }

        if let Some(failure) = self.check_tree()? {
            return self.block(failure);
        }

        let questions = self.session.scratchpad().pending_questions()?;
        if !questions.is_empty() {
            return self.block(
                GateFailure::new(Gate::ScratchpadQuestions, REASON_SCRATCHPAD_QUESTIONS)
                    .with_detail(bullets(&questions)),
            );
        }

        let inconsistencies = self.session.scratchpad().unresolved_inconsistencies()?;
        if !inconsistencies.is_empty() {
            return self.block(
                GateFailure::new(Gate::ScratchpadInconsistencies, REASON_INCONSISTENCIES)
                    .with_detail(bullets(&inconsistencies)),
            );
        }

        if let Some(failure) = self.check_outputs()? {
            return self.block(failure);
        }

        match self.vcs.publish(&self.session.config().publish.commit_message) {
            Ok(report) => {
                info!(committed = report.committed, "published");
                Ok(PublishOutcome::Published {
                    committed: report.committed,
                    push_output: report.push_output,
                })
            }
            Err(err) => self.block(GateFailure::new(
                Gate::Publish,
                publish_error_reason(&format!("{err:#}")),
            )),
        }
    }

    fn block(&self, failure: GateFailure) -> Result<PublishOutcome> {
        warn!(gate = %failure.gate, reason = %failure.reason, "publish blocked");
        self.session.locks().lock(&failure.reason)?;
        Ok(PublishOutcome::Blocked(failure))
    }

    /// Every entry of the ordered tree section must be checked. No tree
    /// counts as incomplete.
    fn check_tree(&self) -> Result<Option<GateFailure>> {
        let registry = StepRegistry::new(self.session)?;
        let incomplete = GateFailure::new(Gate::TreeComplete, REASON_CHECKLIST_INCOMPLETE);
        let Some((_, tree)) = registry.load_tree()? else {
            return Ok(Some(incomplete.with_detail("no tree document")));
        };
        let open: Vec<String> = tree
            .entries
            .iter()
            .filter(|entry| !entry.checked)
            .map(|entry| entry.reference.clone())
            .collect();
        if open.is_empty() {
            return Ok(None);
        }
        Ok(Some(incomplete.with_detail(bullets(&open))))
    }

    fn check_outputs(&self) -> Result<Option<GateFailure>> {
        let publish = &self.session.config().publish;
        if !publish.output_validation {
            return Ok(None);
        }
        if publish.output_validator.is_empty() {
            // validate_outputs locks on its own; block() rewrites the same reason.
            let report = validate_outputs(self.session, self.runner)?;
            return Ok(report.to_gate_failure());
        }
        let output = match self
            .runner
            .run_argv(&publish.output_validator, self.session.root())
        {
            Ok(output) if output.success() => return Ok(None),
            Ok(output) => output.combined(),
            Err(err) => format!("{err:#}"),
        };
        Ok(Some(
            GateFailure::new(Gate::OutputValidation, REASON_OUTPUT_VALIDATION).with_detail(output),
        ))
    }
}

fn bullets(items: &[String]) -> String {
    items
        .iter()
        .map(|item| format!("- {item}"))
        .collect::<Vec<_>>()
        .join("\n")
}
