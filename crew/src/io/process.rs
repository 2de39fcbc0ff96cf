//! Helpers for running child processes with timeouts and bounded output.

use std::io::{Read, Write};
use std::process::{Command, ExitStatus, Stdio};
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use tracing::{debug, error, instrument, warn};
use wait_timeout::ChildExt;

/// Captured child process output.
#[derive(Debug)]
pub struct CommandOutput {
    pub status: ExitStatus,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
    pub stdout_truncated: usize,
    pub stderr_truncated: usize,
    pub timed_out: bool,
}

impl CommandOutput {
    /// Stdout as text, with a trailing notice if bytes were discarded.
    pub fn stdout_text(&self) -> String {
        let mut text = String::from_utf8_lossy(&self.stdout).into_owned();
        if self.stdout_truncated > 0 {
            text.push_str(&format!(
                "\n[stdout truncated {} bytes]\n",
                self.stdout_truncated
            ));
        }
        text
    }

    /// Last few lines of stderr, for error messages.
    pub fn stderr_tail(&self, max_lines: usize) -> String {
        let text = String::from_utf8_lossy(&self.stderr);
        let lines: Vec<&str> = text.lines().collect();
        let start = lines.len().saturating_sub(max_lines);
        lines[start..].join("\n")
    }
}

/// Bytes kept from one output pipe, plus how many were dropped past the limit.
#[derive(Debug, Default)]
struct Capture {
    kept: Vec<u8>,
    dropped: usize,
}

impl Capture {
    fn drain<R: Read>(mut reader: R, limit: usize) -> Result<Self> {
        let mut capture = Self::default();
        let mut chunk = [0u8; 8192];
        loop {
            let n = reader.read(&mut chunk).context("read output")?;
            if n == 0 {
                return Ok(capture);
            }
            let keep = n.min(limit.saturating_sub(capture.kept.len()));
            capture.kept.extend_from_slice(&chunk[..keep]);
            capture.dropped += n - keep;
        }
    }
}

fn spawn_capture<R: Read + Send + 'static>(
    reader: Option<R>,
    name: &'static str,
    limit: usize,
) -> Result<thread::JoinHandle<Result<Capture>>> {
    let reader = reader.ok_or_else(|| anyhow!("{name} was not piped"))?;
    Ok(thread::spawn(move || Capture::drain(reader, limit)))
}

fn collect(handle: thread::JoinHandle<Result<Capture>>, name: &str) -> Result<Capture> {
    handle
        .join()
        .map_err(|_| anyhow!("{name} reader thread panicked"))?
        .with_context(|| format!("collect {name}"))
}

/// Run `cmd`, optionally feeding `stdin`, and wait at most `timeout`.
///
/// Both pipes are drained on their own threads while the child runs, so a
/// chatty child never blocks on a full pipe. At most `output_limit_bytes` of
/// each stream is kept. A child that outlives `timeout` is killed and the
/// result is flagged `timed_out`.
#[instrument(skip_all, fields(timeout_secs = timeout.as_secs(), output_limit_bytes))]
pub fn run_command_with_timeout(
    mut cmd: Command,
    stdin: Option<&[u8]>,
    timeout: Duration,
    output_limit_bytes: usize,
) -> Result<CommandOutput> {
    let stdin_mode = if stdin.is_some() {
        Stdio::piped()
    } else {
        Stdio::null()
    };
    cmd.stdin(stdin_mode)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    debug!("spawning child process");
    let mut child = cmd
        .spawn()
        .inspect_err(|e| error!(err = %e, "failed to spawn command"))
        .context("spawn command")?;

    let stdout_handle = spawn_capture(child.stdout.take(), "stdout", output_limit_bytes)?;
    let stderr_handle = spawn_capture(child.stderr.take(), "stderr", output_limit_bytes)?;

    // Writes on its own thread so the timeout below applies even to a child
    // that never reads stdin. Dropping the handle closes stdin.
    let stdin_handle = match stdin {
        Some(input) => {
            let mut child_stdin = child
                .stdin
                .take()
                .ok_or_else(|| anyhow!("stdin was not piped"))?;
            let input = input.to_vec();
            Some(thread::spawn(move || child_stdin.write_all(&input)))
        }
        None => None,
    };

    let (status, timed_out) = match child.wait_timeout(timeout).context("wait for command")? {
        Some(status) => (status, false),
        None => {
            warn!(timeout_secs = timeout.as_secs(), "command timed out, killing");
            child.kill().context("kill command")?;
            (child.wait().context("wait command after kill")?, true)
        }
    };

    if let Some(handle) = stdin_handle {
        match handle.join() {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!(err = %e, "child closed stdin early"),
            Err(_) => return Err(anyhow!("stdin writer thread panicked")),
        }
    }

    let stdout = collect(stdout_handle, "stdout")?;
    let stderr = collect(stderr_handle, "stderr")?;
    if stdout.dropped > 0 || stderr.dropped > 0 {
        warn!(
            stdout_truncated = stdout.dropped,
            stderr_truncated = stderr.dropped,
            "output truncated"
        );
    }

    debug!(exit_code = ?status.code(), timed_out, "command finished");
    Ok(CommandOutput {
        status,
        stdout: stdout.kept,
        stderr: stderr.kept,
        stdout_truncated: stdout.dropped,
        stderr_truncated: stderr.dropped,
        timed_out,
    })
}
