//! Lock-gated checklist driver.
//!
//! Resolves the active step of `bootstrap/`'s tree document, verifies and
//! completes steps, and gates publishing behind a clean tree, an empty
//! scratchpad and passing expected outputs.

use std::io::{self, Write};
use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::{Parser, Subcommand};

use stepgate::error::GateError;
use stepgate::exec::exec_command;
use stepgate::exit_codes;
use stepgate::io::git::Git;
use stepgate::io::process::ShellRunner;
use stepgate::logging;
use stepgate::outputs::validate_outputs;
use stepgate::publish::{PublishOutcome, PushGate};
use stepgate::registry::{Resolution, StepRegistry};
use stepgate::render;
use stepgate::repl::Repl;
use stepgate::session::Session;
use stepgate::verify::{Advance, StepVerifier};

#[derive(Parser)]
#[command(
    name = "stepgate",
    version,
    about = "Lock-gated progression through a hierarchical checklist"
)]
struct Cli {
    /// Project root holding bootstrap/, steps/, expected/ and scratchpad/.
    #[arg(long, global = true, default_value = ".")]
    root: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Resolve and print the active step (exit 2 when every step is complete).
    Active,
    /// Show tree entries, pointer, lock and scratchpad state.
    Status,
    /// Verify the active step, then move to the next one.
    Next,
    /// Verify a step document (defaults to the active step).
    Verify { step: Option<PathBuf> },
    /// Record an open question in the scratchpad.
    Log {
        #[arg(required = true)]
        question: Vec<String>,
    },
    /// Halt with a reason.
    Halt {
        #[arg(required = true)]
        reason: Vec<String>,
    },
    /// Run a shell command in the root and record it in the command log.
    Exec {
        #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
        command: Vec<String>,
    },
    /// Instantiate a step document from its template if missing.
    Create { reference: String },
    /// Run the publish gates, then commit and push.
    Push,
    /// Remove the lock marker.
    Unlock,
    /// Check every ledgered document against its recorded hash.
    Integrity,
    /// Run every expected-output specification.
    ValidateOutput,
    /// Hook entry point: fail when locked, otherwise validate outputs.
    Check,
    /// Interactive command loop.
    Repl,
}

fn main() {
    logging::init();
    let code = match run() {
        Ok(code) => code,
        Err(err) => {
            report_error(&mut io::stdout(), &err);
            exit_codes::FAILED
        }
    };
    std::process::exit(code);
}

fn run() -> Result<i32> {
    let cli = Cli::parse();
    let session = Session::open(&cli.root)?;
    let runner = ShellRunner::from_config(&session.config().commands);
    let vcs = Git::new(session.root());
    let stdout = io::stdout();
    let mut out = stdout.lock();

    let code = match cli.command {
        Command::Active => cmd_active(&session, &mut out)?,
        Command::Status => {
            let report = StepRegistry::new(&session)?.status()?;
            render::render_status(&mut out, &session, &report)?;
            exit_codes::OK
        }
        Command::Next => {
            let registry = StepRegistry::new(&session)?;
            let advance = StepVerifier::new(&session, &runner, &vcs).advance(&registry)?;
            render::render_advance(&mut out, &session, &advance)?;
            match advance {
                Advance::Moved { .. } => exit_codes::OK,
                Advance::Blocked(_) => exit_codes::FAILED,
            }
        }
        Command::Verify { step } => {
            let step = match step {
                Some(step) => resolve_path(&session, &step),
                None => session
                    .locks()
                    .active()?
                    .ok_or_else(|| GateError::state("no current step defined"))?,
            };
            let outcome = StepVerifier::new(&session, &runner, &vcs).verify(&step)?;
            render::render_verify(&mut out, &session, &outcome)?;
            status_code(outcome.is_completed())
        }
        Command::Log { question } => {
            session.scratchpad().log_question(&question.join(" "))?;
            writeln!(out, "❓ Question logged")?;
            exit_codes::OK
        }
        Command::Halt { reason } => {
            let reason = reason.join(" ");
            session.locks().halt(&reason)?;
            writeln!(out, "🛑 Halted: {reason}")?;
            exit_codes::OK
        }
        Command::Exec { command } => {
            let command = command.join(" ");
            let output = exec_command(&session, &runner, &command)?;
            render::render_exec(&mut out, &command, &output)?;
            status_code(output.success())
        }
        Command::Create { reference } => {
            let path = StepRegistry::new(&session)?.create_step_document(&reference)?;
            writeln!(out, "📋 {}", session.relative(&path))?;
            exit_codes::OK
        }
        Command::Push => {
            let outcome = PushGate::new(&session, &runner, &vcs).attempt_publish()?;
            render::render_publish(&mut out, &outcome)?;
            status_code(matches!(outcome, PublishOutcome::Published { .. }))
        }
        Command::Unlock => {
            if session.locks().unlock()? {
                writeln!(out, "🔓 Unlocked")?;
            } else {
                writeln!(out, "🔓 No lock present")?;
            }
            exit_codes::OK
        }
        Command::Integrity => {
            let report = session.ledger().verify_all()?;
            render::render_integrity(&mut out, &session, &report)?;
            status_code(report.is_clean())
        }
        Command::ValidateOutput => {
            let report = validate_outputs(&session, &runner)?;
            render::render_sweep(&mut out, &report)?;
            status_code(report.is_clean())
        }
        Command::Check => {
            if let Some(marker) = session.locks().current()? {
                writeln!(out, "❌ Operation blocked: {}", marker.reason)?;
                return Ok(exit_codes::FAILED);
            }
            let report = validate_outputs(&session, &runner)?;
            render::render_sweep(&mut out, &report)?;
            status_code(report.is_clean())
        }
        Command::Repl => {
            let stdin = io::stdin();
            Repl::new(&session, &runner, &vcs, stdin.lock(), &mut out).run()?;
            exit_codes::OK
        }
    };
    Ok(code)
}

/// Print the error marker, falling back to stderr when stdout is unwritable.
fn report_error(out: &mut dyn Write, err: &anyhow::Error) {
    if render::render_error(out, err).is_err() {
        eprintln!("❌ Error: {err:#}");
    }
}

fn cmd_active(session: &Session, out: &mut dyn Write) -> Result<i32> {
    let resolution = StepRegistry::new(session)?.resolve_active_step()?;
    render::render_resolution(out, session, &resolution, false)?;
    Ok(match resolution {
        Resolution::Active(_) => exit_codes::OK,
        Resolution::AllComplete(_) => exit_codes::COMPLETE,
        Resolution::NoTree => exit_codes::FAILED,
    })
}

fn resolve_path(session: &Session, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        session.root().join(path)
    }
}

fn status_code(passed: bool) -> i32 {
    if passed {
        exit_codes::OK
    } else {
        exit_codes::FAILED
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_verify_with_step() {
        let cli = Cli::parse_from(["stepgate", "verify", "steps/STEP_01__A.md"]);
        assert!(matches!(cli.command, Command::Verify { step: Some(_) }));
        assert_eq!(cli.root, PathBuf::from("."));
    }

    #[test]
    fn parse_exec_keeps_hyphenated_args() {
        let cli = Cli::parse_from(["stepgate", "--root", "/work", "exec", "cargo", "test", "--all"]);
        let Command::Exec { command } = cli.command else {
            panic!("expected exec");
        };
        assert_eq!(command, vec!["cargo", "test", "--all"]);
        assert_eq!(cli.root, PathBuf::from("/work"));
    }

    #[test]
    fn parse_log_joins_words() {
        let cli = Cli::parse_from(["stepgate", "log", "which", "port?"]);
        let Command::Log { question } = cli.command else {
            panic!("expected log");
        };
        assert_eq!(question.join(" "), "which port?");
    }

    struct ClosedPipe;

    impl Write for ClosedPipe {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::from(io::ErrorKind::BrokenPipe))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn report_error_renders_the_marker() {
        let mut out = Vec::new();
        report_error(&mut out, &anyhow::anyhow!("disk full"));
        assert_eq!(String::from_utf8(out).expect("utf8"), "❌ Error: disk full\n");
    }

    #[test]
    fn report_error_survives_an_unwritable_stdout() {
        report_error(&mut ClosedPipe, &GateError::state("no current step defined").into());
    }

    #[test]
    fn log_requires_text() {
        assert!(Cli::try_parse_from(["stepgate", "log"]).is_err());
    }
}
