//! Logged shell command execution (`exec`).

use anyhow::Result;
use tracing::{instrument, warn};

use crate::core::types::command_failed_reason;
use crate::io::process::{CommandOutput, ProcessRunner};
use crate::session::Session;

/// Run `command` in the root, recording it in the command-execution log.
///
/// A non-zero exit locks and is returned as output; a spawn failure locks
/// and is returned as an error.
#[instrument(skip_all, fields(command))]
pub fn exec_command<R: ProcessRunner + ?Sized>(
    session: &Session,
    runner: &R,
    command: &str,
) -> Result<CommandOutput> {
    session.locks().assert_unlocked()?;
    let log = session.command_log();
    log.begin(command)?;

    let output = match runner.run_shell(command, session.root()) {
        Ok(output) => output,
        Err(err) => {
            log.abort(&format!("{err:#}"))?;
            session.locks().lock(&command_failed_reason(command))?;
            return Err(err);
        }
    };
    log.finish(&output)?;

    if !output.success() {
        warn!(exit_code = ?output.exit_code, "command failed");
        session.locks().lock(&command_failed_reason(command))?;
    }
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GateError;
    use crate::test_support::{ScriptedRunner, TestWorkspace};

    #[test]
    fn successful_command_is_logged() {
        let ws = TestWorkspace::new();
        let output = exec_command(ws.session(), &ScriptedRunner::passing(), "cargo test")
            .expect("exec");
        assert!(output.success());
        let log = ws.session().command_log().read().expect("log");
        assert!(log.contains("] cargo test\nSTDOUT:\n"));
        assert!(log.contains("Return code: 0\n"));
        assert!(!ws.session().locks().is_locked());
    }

    #[test]
    fn failing_command_locks() {
        let ws = TestWorkspace::new();
        let output = exec_command(ws.session(), &ScriptedRunner::failing(&["make"]), "make")
            .expect("exec");
        assert_eq!(output.exit_code, Some(1));
        let marker = ws.session().locks().current().expect("read").expect("locked");
        assert_eq!(marker.reason, "command failed: make");
    }

    #[test]
    fn refuses_while_locked() {
        let ws = TestWorkspace::new();
        ws.session().locks().lock("pending questions").expect("lock");
        let runner = ScriptedRunner::passing();
        let err = exec_command(ws.session(), &runner, "ls").expect_err("locked");
        assert!(matches!(err.downcast_ref::<GateError>(), Some(GateError::Locked { .. })));
        assert!(runner.calls().is_empty());
        assert_eq!(ws.session().command_log().read().expect("log"), "");
    }
}
