//! User-facing marker lines shared by the CLI and the REPL.
//!
//! Every outcome prints one marker line with a one-line cause, followed by
//! indented detail (open items, captured subprocess output) where relevant.

use std::io::{self, Write};

use crate::core::types::GateFailure;
use crate::error::GateError;
use crate::io::ledger::IntegrityReport;
use crate::io::lock::LockKind;
use crate::io::process::CommandOutput;
use crate::outputs::SweepReport;
use crate::publish::PublishOutcome;
use crate::registry::{Resolution, StatusReport};
use crate::session::Session;
use crate::verify::{Advance, VerifyOutcome};

const RULE: &str = "==================================================";

fn indented(out: &mut dyn Write, text: &str) -> io::Result<()> {
    for line in text.lines() {
        writeln!(out, "  {line}")?;
    }
    Ok(())
}

fn locked_line(out: &mut dyn Write, failure: &GateFailure) -> io::Result<()> {
    if let Some(detail) = &failure.detail {
        indented(out, detail)?;
    }
    writeln!(out, "🔒 System locked: {}", failure.reason)
}

pub fn render_resolution(
    out: &mut dyn Write,
    session: &Session,
    resolution: &Resolution,
    show_document: bool,
) -> io::Result<()> {
    match resolution {
        Resolution::NoTree => writeln!(
            out,
            "❌ No tree document found in {}",
            session.relative(&session.paths().bootstrap_dir)
        ),
        Resolution::AllComplete(_) => writeln!(out, "✅ All steps complete"),
        Resolution::Active(active) => {
            let created = if active.created {
                " (created from template)"
            } else {
                ""
            };
            writeln!(
                out,
                "📋 Current active step: {}{created}",
                session.relative(&active.path)
            )?;
            if show_document && let Ok(text) = std::fs::read_to_string(&active.path) {
                writeln!(out, "{RULE}")?;
                write!(out, "{text}")?;
                if !text.ends_with('\n') {
                    writeln!(out)?;
                }
                writeln!(out, "{RULE}")?;
            }
            Ok(())
        }
    }
}

pub fn render_verify(out: &mut dyn Write, session: &Session, outcome: &VerifyOutcome) -> io::Result<()> {
    match outcome {
        VerifyOutcome::Completed { step, advisories } => {
            for advisory in advisories {
                writeln!(out, "⚠️ {advisory}")?;
            }
            writeln!(out, "✅ Step verified and marked complete: {}", session.relative(step))
        }
        VerifyOutcome::Failed(failure) => {
            writeln!(out, "❌ Step verification failed: {}", failure.reason)?;
            locked_line(out, failure)
        }
    }
}

pub fn render_advance(out: &mut dyn Write, session: &Session, advance: &Advance) -> io::Result<()> {
    match advance {
        Advance::Blocked(failure) => {
            writeln!(out, "🚫 Cannot move to next step: {}", failure.reason)?;
            locked_line(out, failure)
        }
        Advance::Moved {
            completed,
            advisories,
            next,
        } => {
            for advisory in advisories {
                writeln!(out, "⚠️ {advisory}")?;
            }
            writeln!(out, "✅ Completed: {}", session.relative(completed))?;
            render_resolution(out, session, next, true)
        }
    }
}

pub fn render_publish(out: &mut dyn Write, outcome: &PublishOutcome) -> io::Result<()> {
    match outcome {
        PublishOutcome::Published {
            committed,
            push_output,
        } => {
            if *committed {
                writeln!(out, "Committed pending changes.")?;
            }
            indented(out, push_output)?;
            writeln!(out, "✅ Changes pushed successfully")
        }
        PublishOutcome::Blocked(failure) => {
            writeln!(out, "🚫 Push blocked: {}", failure.reason)?;
            if let Some(detail) = &failure.detail {
                indented(out, detail)?;
            }
            Ok(())
        }
    }
}

pub fn render_status(out: &mut dyn Write, session: &Session, report: &StatusReport) -> io::Result<()> {
    match &report.tree {
        Some(tree) => writeln!(
            out,
            "🗂 Tree: {} ({})",
            session.relative(&tree.path),
            tree.kind.label()
        )?,
        None => writeln!(out, "❌ No tree document")?,
    }

    writeln!(out, "\n📋 Step Status:")?;
    for entry in &report.entries {
        let state = if entry.checked {
            "✅ Complete  "
        } else {
            "☐ Incomplete"
        };
        writeln!(out, "  {state} - {}", entry.reference)?;
    }

    if let Some(active) = &report.active_pointer {
        writeln!(out, "\n👉 Current step: {}", session.relative(active))?;
    }

    match &report.lock {
        Some(marker) => {
            let label = match marker.kind {
                LockKind::Locked => "🔒 Locked",
                LockKind::Halted => "🛑 Halted",
            };
            writeln!(out, "\n{label}: {}", marker.reason)?;
        }
        None => writeln!(out, "\n🔓 Unlocked")?,
    }

    if !report.pending_questions.is_empty() {
        writeln!(out, "\n❓ Pending Questions:")?;
        for question in &report.pending_questions {
            writeln!(out, "  - {question}")?;
        }
    }
    if !report.unresolved_inconsistencies.is_empty() {
        writeln!(out, "\n⚠️ Unresolved Inconsistencies:")?;
        for item in &report.unresolved_inconsistencies {
            writeln!(out, "  - {item}")?;
        }
    }
    Ok(())
}

pub fn render_exec(out: &mut dyn Write, command: &str, output: &CommandOutput) -> io::Result<()> {
    if !output.stdout.is_empty() {
        write!(out, "{}", output.stdout)?;
        if !output.stdout.ends_with('\n') {
            writeln!(out)?;
        }
    }
    if !output.stderr.is_empty() {
        writeln!(out, "STDERR:")?;
        write!(out, "{}", output.stderr)?;
        if !output.stderr.ends_with('\n') {
            writeln!(out)?;
        }
    }
    if output.success() {
        return Ok(());
    }
    writeln!(
        out,
        "❌ Command failed with return code {}",
        output.code_or_negative()
    )?;
    writeln!(out, "🔒 System locked: command failed: {command}")
}

pub fn render_sweep(out: &mut dyn Write, report: &SweepReport) -> io::Result<()> {
    if report.checked == 0 {
        return writeln!(out, "No expected output files found.");
    }
    for failure in &report.failures {
        writeln!(out, "❌ {}: {}", failure.spec.display(), failure.message)?;
        indented(out, &failure.detail)?;
    }
    if report.is_clean() {
        writeln!(out, "✅ All {} expected output file(s) validated", report.checked)
    } else {
        writeln!(
            out,
            "❌ Output validation failed ({} problem(s) in {} file(s))",
            report.failures.len(),
            report.checked
        )
    }
}

pub fn render_integrity(out: &mut dyn Write, session: &Session, report: &IntegrityReport) -> io::Result<()> {
    for mismatch in &report.mismatches {
        let current = mismatch.current.as_deref().unwrap_or("missing");
        writeln!(
            out,
            "❌ {} (recorded {}, current {current})",
            session.relative(&mismatch.path),
            mismatch.recorded
        )?;
    }
    if report.is_clean() {
        writeln!(
            out,
            "✅ {} ledgered document(s) match their recorded hashes",
            report.checked
        )?;
    }
    if report.skipped_missing > 0 {
        writeln!(
            out,
            "⚠️ {} ledgered document(s) no longer exist",
            report.skipped_missing
        )?;
    }
    Ok(())
}

/// Marker line for an error that aborted a command.
pub fn render_error(out: &mut dyn Write, err: &anyhow::Error) -> io::Result<()> {
    match err.downcast_ref::<GateError>() {
        Some(GateError::Locked { reason }) => writeln!(out, "❌ Operation blocked: {reason}"),
        Some(violation @ GateError::IntegrityViolation { .. }) => {
            writeln!(out, "❌ File tampering detected: {violation}")?;
            writeln!(out, "🔒 System locked: tampering detected")
        }
        Some(other) => writeln!(out, "❌ {other}"),
        None => writeln!(out, "❌ Error: {err:#}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{Gate, REASON_INCOMPLETE_CHECKLIST};

    fn render(f: impl FnOnce(&mut dyn Write) -> io::Result<()>) -> String {
        let mut buf = Vec::new();
        f(&mut buf).expect("render");
        String::from_utf8(buf).expect("utf8")
    }

    #[test]
    fn locked_error_surfaces_reason() {
        let err = anyhow::Error::from(GateError::Locked {
            reason: "pending questions".to_string(),
        });
        assert_eq!(
            render(|out| render_error(out, &err)),
            "❌ Operation blocked: pending questions\n"
        );
    }

    #[test]
    fn failed_publish_lists_detail() {
        let outcome = PublishOutcome::Blocked(
            GateFailure::new(Gate::TreeComplete, "checklist incomplete").with_detail("- STEP_02__B.md"),
        );
        assert_eq!(
            render(|out| render_publish(out, &outcome)),
            "🚫 Push blocked: checklist incomplete\n  - STEP_02__B.md\n"
        );
    }

    #[test]
    fn failed_verify_reports_lock() {
        let session = Session::with_config("/work", Default::default());
        let outcome = VerifyOutcome::Failed(
            GateFailure::new(Gate::Checklist, REASON_INCOMPLETE_CHECKLIST).with_detail("implement"),
        );
        assert_eq!(
            render(|out| render_verify(out, &session, &outcome)),
            "❌ Step verification failed: incomplete checklist items\n  implement\n🔒 System locked: incomplete checklist items\n"
        );
    }
}
