//! Interactive command surface.
//!
//! Reads one verb per line. Failures print a marker and the loop continues;
//! only end of input or `exit` stops it.

use std::io::{BufRead, Write};

use anyhow::Result;
use tracing::debug;

use crate::error::GateError;
use crate::exec::exec_command;
use crate::io::git::VersionControl;
use crate::io::process::ProcessRunner;
use crate::publish::PushGate;
use crate::registry::StepRegistry;
use crate::render;
use crate::session::Session;
use crate::verify::StepVerifier;

const PROMPT: &str = "stepgate> ";

const HELP: &str = "\
Commands:
  next          verify the active step and move to the next one
  log [text]    record an open question
  verify        verify the active step
  status        show tree, lock and scratchpad state
  halt [text]   halt with a reason
  exec <cmd>    run a shell command and log it
  push          run the publish gates and push
  help          show this help
  exit          leave";

#[derive(Debug, Clone, PartialEq, Eq)]
enum Verb {
    Next,
    Log(Option<String>),
    Verify,
    Status,
    Halt(Option<String>),
    Exec(String),
    Push,
    Help,
    Exit,
    Unknown(String),
    Empty,
}

impl Verb {
    fn parse(line: &str) -> Self {
        let line = line.trim();
        let (head, rest) = match line.split_once(char::is_whitespace) {
            Some((head, rest)) => (head, rest.trim()),
            None => (line, ""),
        };
        let text = (!rest.is_empty()).then(|| rest.to_string());
        match head.to_ascii_lowercase().as_str() {
            "" => Verb::Empty,
            "next" => Verb::Next,
            "log" => Verb::Log(text),
            "verify" => Verb::Verify,
            "status" => Verb::Status,
            "halt" => Verb::Halt(text),
            "exec" => Verb::Exec(rest.to_string()),
            "push" => Verb::Push,
            "help" | "?" => Verb::Help,
            "exit" | "quit" => Verb::Exit,
            _ => Verb::Unknown(head.to_string()),
        }
    }
}

pub struct Repl<'a, R: ProcessRunner, V: VersionControl, I: BufRead, O: Write> {
    session: &'a Session,
    runner: &'a R,
    vcs: &'a V,
    input: I,
    out: O,
}

impl<'a, R: ProcessRunner, V: VersionControl, I: BufRead, O: Write> Repl<'a, R, V, I, O> {
    pub fn new(session: &'a Session, runner: &'a R, vcs: &'a V, input: I, out: O) -> Self {
        Self {
            session,
            runner,
            vcs,
            input,
            out,
        }
    }

    /// Resolve the active step, then serve verbs until `exit` or end of input.
    pub fn run(&mut self) -> Result<()> {
        let registry = StepRegistry::new(self.session)?;
        match registry.resolve_active_step() {
            Ok(resolution) => {
                render::render_resolution(&mut self.out, self.session, &resolution, true)?;
            }
            Err(err) => render::render_error(&mut self.out, &err)?,
        }

        loop {
            let Some(line) = self.prompt(PROMPT)? else {
                break;
            };
            let verb = Verb::parse(&line);
            debug!(?verb, "repl verb");
            if verb == Verb::Exit {
                break;
            }
            if let Err(err) = self.dispatch(verb, &registry) {
                render::render_error(&mut self.out, &err)?;
            }
        }
        Ok(())
    }

    fn dispatch(&mut self, verb: Verb, registry: &StepRegistry<'_>) -> Result<()> {
        let verifier = StepVerifier::new(self.session, self.runner, self.vcs);
        match verb {
            Verb::Empty | Verb::Exit => {}
            Verb::Next => {
                let advance = verifier.advance(registry)?;
                render::render_advance(&mut self.out, self.session, &advance)?;
            }
            Verb::Verify => {
                let Some(active) = self.session.locks().active()? else {
                    return Err(GateError::state("no current step defined").into());
                };
                let outcome = verifier.verify(&active)?;
                render::render_verify(&mut self.out, self.session, &outcome)?;
            }
            Verb::Log(text) => {
                let Some(question) = self.text_or_prompt(text, "Question: ")? else {
                    return Ok(());
                };
                self.session.scratchpad().log_question(&question)?;
                writeln!(self.out, "❓ Question logged")?;
            }
            Verb::Halt(text) => {
                let Some(reason) = self.text_or_prompt(text, "Reason: ")? else {
                    return Ok(());
                };
                self.session.locks().halt(&reason)?;
                writeln!(self.out, "🛑 Halted: {reason}")?;
            }
            Verb::Status => {
                let report = registry.status()?;
                render::render_status(&mut self.out, self.session, &report)?;
            }
            Verb::Exec(command) if command.is_empty() => {
                writeln!(self.out, "usage: exec <command>")?;
            }
            Verb::Exec(command) => {
                let output = exec_command(self.session, self.runner, &command)?;
                render::render_exec(&mut self.out, &command, &output)?;
            }
            Verb::Push => {
                let outcome = PushGate::new(self.session, self.runner, self.vcs).attempt_publish()?;
                render::render_publish(&mut self.out, &outcome)?;
            }
            Verb::Help => writeln!(self.out, "{HELP}")?,
            Verb::Unknown(head) => {
                writeln!(self.out, "❌ Unknown command: {head} (type 'help')")?;
            }
        }
        Ok(())
    }

    /// Inline text, or the next input line. Blank input yields `None`.
    fn text_or_prompt(&mut self, inline: Option<String>, label: &str) -> Result<Option<String>> {
        let text = match inline {
            Some(text) => text,
            None => self.prompt(label)?.unwrap_or_default(),
        };
        let text = text.trim();
        if text.is_empty() {
            writeln!(self.out, "❌ Nothing entered")?;
            return Ok(None);
        }
        Ok(Some(text.to_string()))
    }

    fn prompt(&mut self, label: &str) -> Result<Option<String>> {
        write!(self.out, "{label}")?;
        self.out.flush()?;
        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim_end_matches(['\r', '\n']).to_string()))
    }
}
