//! Process runner for validation commands, `exec` and the output validator.
//!
//! Commands block the calling flow. Without a configured timeout a hung
//! command hangs the flow.

use std::io::Read;
use std::path::Path;
use std::process::{Command, Stdio};
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use tracing::{debug, error, instrument, warn};
use wait_timeout::ChildExt;

use crate::io::config::CommandConfig;

/// Captured child process output.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// `None` when the child was killed by a signal.
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
    pub stdout_truncated: usize,
    pub stderr_truncated: usize,
    pub timed_out: bool,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0) && !self.timed_out
    }

    /// Exit code for display (`-1` for signals and timeouts).
    pub fn code_or_negative(&self) -> i32 {
        self.exit_code.unwrap_or(-1)
    }

    /// Stdout and stderr joined, with truncation and timeout notices.
    pub fn combined(&self) -> String {
        let mut out = self.stdout.clone();
        if self.stdout_truncated > 0 {
            out.push_str(&format!("\n[stdout truncated {} bytes]\n", self.stdout_truncated));
        }
        if !self.stderr.is_empty() {
            if !out.is_empty() && !out.ends_with('\n') {
                out.push('\n');
            }
            out.push_str(&self.stderr);
        }
        if self.stderr_truncated > 0 {
            out.push_str(&format!("\n[stderr truncated {} bytes]\n", self.stderr_truncated));
        }
        if self.timed_out {
            out.push_str("\n[timed out]\n");
        }
        out
    }
}

/// Seam for subprocess execution so gates can be tested without a shell.
pub trait ProcessRunner {
    /// Run an opaque shell command string in `workdir`.
    fn run_shell(&self, command: &str, workdir: &Path) -> Result<CommandOutput>;

    /// Run an argv directly (no shell) in `workdir`.
    fn run_argv(&self, argv: &[String], workdir: &Path) -> Result<CommandOutput>;
}

/// Runs commands through the configured shell.
#[derive(Debug, Clone)]
pub struct ShellRunner {
    shell: Vec<String>,
    timeout: Option<Duration>,
    output_limit_bytes: usize,
}

impl ShellRunner {
    pub fn from_config(cfg: &CommandConfig) -> Self {
        Self {
            shell: cfg.shell.clone(),
            timeout: cfg.timeout_secs.map(Duration::from_secs),
            output_limit_bytes: cfg.output_limit_bytes,
        }
    }
}

impl ProcessRunner for ShellRunner {
    fn run_shell(&self, command: &str, workdir: &Path) -> Result<CommandOutput> {
        let mut argv = self.shell.clone();
        argv.push(command.to_string());
        self.run_argv(&argv, workdir)
    }

    fn run_argv(&self, argv: &[String], workdir: &Path) -> Result<CommandOutput> {
        let (program, args) = argv
            .split_first()
            .ok_or_else(|| anyhow!("empty command line"))?;
        let mut cmd = Command::new(program);
        cmd.args(args).current_dir(workdir);
        run_command(cmd, self.timeout, self.output_limit_bytes)
            .with_context(|| format!("run {program}"))
    }
}

/// Run a command, capturing stdout/stderr without risking pipe deadlocks.
///
/// Output is read concurrently while the child runs. `output_limit_bytes` bounds the amount of
/// stdout/stderr stored in memory (bytes beyond this are discarded while still draining the pipe).
#[instrument(skip_all, fields(timeout_secs = timeout.map(|t| t.as_secs()), output_limit_bytes))]
pub fn run_command(
    mut cmd: Command,
    timeout: Option<Duration>,
    output_limit_bytes: usize,
) -> Result<CommandOutput> {
    cmd.stdin(Stdio::null());
    cmd.stdout(Stdio::piped()).stderr(Stdio::piped());

    debug!("spawning child process");
    let mut child = match cmd.spawn() {
        Ok(c) => c,
        Err(e) => {
            error!(err = %e, "failed to spawn command");
            return Err(e).context("spawn command");
        }
    };

    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| anyhow!("stdout was not piped"))?;
    let stderr = child
        .stderr
        .take()
        .ok_or_else(|| anyhow!("stderr was not piped"))?;

    let stdout_handle = thread::spawn(move || read_stream_limited(stdout, output_limit_bytes));
    let stderr_handle = thread::spawn(move || read_stream_limited(stderr, output_limit_bytes));

    let mut timed_out = false;
    let status = match timeout {
        None => child.wait().context("wait for command")?,
        Some(limit) => match child.wait_timeout(limit).context("wait for command")? {
            Some(status) => status,
            None => {
                warn!(timeout_secs = limit.as_secs(), "command timed out, killing");
                timed_out = true;
                child.kill().context("kill command")?;
                child.wait().context("wait command after kill")?
            }
        },
    };

    let (stdout, stdout_truncated) = join_output(stdout_handle).context("join stdout")?;
    let (stderr, stderr_truncated) = join_output(stderr_handle).context("join stderr")?;

    if stdout_truncated > 0 || stderr_truncated > 0 {
        warn!(stdout_truncated, stderr_truncated, "output truncated");
    }

    debug!(exit_code = ?status.code(), timed_out, "command finished");
    Ok(CommandOutput {
        exit_code: status.code(),
        stdout: String::from_utf8_lossy(&stdout).into_owned(),
        stderr: String::from_utf8_lossy(&stderr).into_owned(),
        stdout_truncated,
        stderr_truncated,
        timed_out,
    })
}

fn join_output(handle: thread::JoinHandle<Result<(Vec<u8>, usize)>>) -> Result<(Vec<u8>, usize)> {
    match handle.join() {
        Ok(result) => result,
        Err(_) => Err(anyhow!("output reader thread panicked")),
    }
}

fn read_stream_limited<R: Read>(mut reader: R, limit: usize) -> Result<(Vec<u8>, usize)> {
    let mut buf = Vec::new();
    let mut truncated = 0usize;
    let mut chunk = [0u8; 8192];

    loop {
        let n = reader.read(&mut chunk).context("read output")?;
        if n == 0 {
            break;
        }
        let remaining = limit.saturating_sub(buf.len());
        if remaining > 0 {
            let keep = n.min(remaining);
            buf.extend_from_slice(&chunk[..keep]);
            truncated += n.saturating_sub(keep);
        } else {
            truncated += n;
        }
    }

    Ok((buf, truncated))
}
