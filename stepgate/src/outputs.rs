//! Expected-output checks: per step during verification, and the standalone
//! sweep over every specification used by `validate-output`, `check` and the
//! push gate.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{info, instrument, warn};

use crate::core::expected::{ExpectedOutput, number_from_file_name};
use crate::core::step_ref::StepRef;
use crate::core::types::{Gate, GateFailure, REASON_OUTPUT_VALIDATION};
use crate::io::process::ProcessRunner;
use crate::io::store::read_document;
use crate::session::Session;

/// One unmet expectation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpectationFailure {
    pub summary: String,
    /// Captured output of the failing command, if any.
    pub detail: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunPolicy {
    /// Return after the first failure (step verification).
    StopAtFirstFailure,
    /// Evaluate everything (sweep).
    RunAll,
}

/// Load the specification at `path`, if it exists.
pub fn load_expected(path: &Path) -> Result<Option<ExpectedOutput>> {
    if !path.exists() {
        return Ok(None);
    }
    let spec = ExpectedOutput::from_json(&read_document(path)?)
        .with_context(|| format!("load {}", path.display()))?;
    for field in spec.ignored_fields() {
        warn!(path = %path.display(), field, "ignoring unsupported expected output field");
    }
    Ok(Some(spec))
}

/// Run the validation commands and log checks of `spec` for `step_file`.
///
/// Every failure is appended to the inconsistency log against `step_file`.
#[instrument(skip_all, fields(step = %step_file.display()))]
pub fn check_expectations<R: ProcessRunner + ?Sized>(
    session: &Session,
    runner: &R,
    spec: &ExpectedOutput,
    step_file: &Path,
    policy: RunPolicy,
) -> Result<Vec<ExpectationFailure>> {
    let origin = session.relative(step_file);
    let mut failures = Vec::new();

    for command in &spec.validation_commands {
        info!(command, "running validation command");
        let failure = match runner.run_shell(command, session.root()) {
            Ok(output) if output.success() => continue,
            Ok(output) => ExpectationFailure {
                summary: format!("Validation command failed: {command}"),
                detail: output.combined(),
            },
            Err(err) => ExpectationFailure {
                summary: format!("Validation command failed: {command}"),
                detail: format!("{err:#}"),
            },
        };
        session.scratchpad().log_inconsistency(
            &origin,
            &format!("{}\nOutput:\n{}", failure.summary, failure.detail),
        )?;
        failures.push(failure);
        if policy == RunPolicy::StopAtFirstFailure {
            return Ok(failures);
        }
    }

    if !spec.expected_logs.is_empty() {
        let log = session.command_log().read()?;
        for needle in spec.missing_logs(&log) {
            let failure = ExpectationFailure {
                summary: format!("Expected log not found: {needle}"),
                detail: String::new(),
            };
            session
                .scratchpad()
                .log_inconsistency(&origin, &failure.summary)?;
            failures.push(failure);
            if policy == RunPolicy::StopAtFirstFailure {
                return Ok(failures);
            }
        }
    }

    Ok(failures)
}

/// Failure of one specification file during a sweep.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SweepFailure {
    pub spec: PathBuf,
    pub message: String,
    pub detail: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub checked: usize,
    pub failures: Vec<SweepFailure>,
}

impl SweepReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn to_gate_failure(&self) -> Option<GateFailure> {
        if self.is_clean() {
            return None;
        }
        let detail = self
            .failures
            .iter()
            .map(|f| format!("{}: {}", f.spec.display(), f.message))
            .collect::<Vec<_>>()
            .join("\n");
        Some(GateFailure::new(Gate::OutputValidation, REASON_OUTPUT_VALIDATION).with_detail(detail))
    }
}

/// Evaluate every `expected/EXPECTED_OUTPUT_<nn>.json`, in name order.
///
/// Keeps going past failures. Does not lock.
#[instrument(skip_all)]
pub fn sweep<R: ProcessRunner + ?Sized>(session: &Session, runner: &R) -> Result<SweepReport> {
    let mut report = SweepReport::default();
    for (number, spec_path) in list_specs(&session.paths().expected_dir)? {
        report.checked += 1;
        let display = PathBuf::from(session.relative(&spec_path));
        let fail = |message: String, detail: String| SweepFailure {
            spec: display.clone(),
            message,
            detail,
        };

        let Some(step_file) = find_step_document(&session.paths().steps_dir, &number)? else {
            report
                .failures
                .push(fail(format!("no step document found for step {number}"), String::new()));
            continue;
        };
        let spec = match load_expected(&spec_path) {
            Ok(Some(spec)) => spec,
            Ok(None) => continue,
            Err(err) => {
                report.failures.push(fail(format!("{err:#}"), String::new()));
                continue;
            }
        };
        for failure in check_expectations(session, runner, &spec, &step_file, RunPolicy::RunAll)? {
            report.failures.push(fail(failure.summary, failure.detail));
        }
    }
    Ok(report)
}

/// Sweep and lock with "output validation failed" on any failure.
pub fn validate_outputs<R: ProcessRunner + ?Sized>(
    session: &Session,
    runner: &R,
) -> Result<SweepReport> {
    let report = sweep(session, runner)?;
    if !report.is_clean() {
        session.locks().lock(REASON_OUTPUT_VALIDATION)?;
    }
    Ok(report)
}

fn list_specs(dir: &Path) -> Result<Vec<(String, PathBuf)>> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }
    let mut specs = Vec::new();
    for entry in fs::read_dir(dir).with_context(|| format!("read dir {}", dir.display()))? {
        let entry = entry.with_context(|| format!("read dir entry in {}", dir.display()))?;
        let name = entry.file_name();
        let Some(name) = name.to_str() else {
            continue;
        };
        if let Some(number) = number_from_file_name(name) {
            specs.push((number.to_string(), entry.path()));
        }
    }
    specs.sort_by(|a, b| a.1.cmp(&b.1));
    Ok(specs)
}

/// The top-level step document numbered `number`, first by name.
fn find_step_document(steps_dir: &Path, number: &str) -> Result<Option<PathBuf>> {
    if !steps_dir.is_dir() {
        return Ok(None);
    }
    let mut matches = Vec::new();
    for entry in
        fs::read_dir(steps_dir).with_context(|| format!("read dir {}", steps_dir.display()))?
    {
        let entry = entry.with_context(|| format!("read dir entry in {}", steps_dir.display()))?;
        let name = entry.file_name();
        let Some(name) = name.to_str() else {
            continue;
        };
        if let Ok(step) = StepRef::parse(name)
            && !step.is_child()
            && step.number() == number
        {
            matches.push(entry.path());
        }
    }
    matches.sort();
    Ok(matches.into_iter().next())
}
