// src/orchestrator/process.rs

//! Subprocess helpers for the compose orchestrator.

use std::path::Path;
use std::process::Stdio;

use anyhow::{anyhow, Context, Result};
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use super::output::{CommandRun, OutputLine, OutputStream};

/// Captured result of a short query command.
#[derive(Debug, Clone)]
pub struct Captured {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

fn build_command(argv: &[String], cwd: &Path) -> Result<Command> {
    let (program, args) = argv
        .split_first()
        .ok_or_else(|| anyhow!("empty command line"))?;

    let mut cmd = Command::new(program);
    cmd.args(args).current_dir(cwd);
    Ok(cmd)
}

/// Spawn `argv` in `cwd` and stream its stdout/stderr line by line.
///
/// There is no timeout: a hung tool blocks the caller until it exits.
pub fn spawn_streaming(label: &str, argv: &[String], cwd: &Path) -> Result<CommandRun> {
    let mut cmd = build_command(argv, cwd)?;
    cmd.stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    info!(command = %label, argv = ?argv, "starting command");

    let mut child = cmd
        .spawn()
        .with_context(|| format!("spawning process for '{}'", label))?;

    let (line_tx, line_rx) = mpsc::channel::<OutputLine>(64);

    if let Some(stdout) = child.stdout.take() {
        forward_lines(stdout, OutputStream::Stdout, line_tx.clone());
    }
    if let Some(stderr) = child.stderr.take() {
        forward_lines(stderr, OutputStream::Stderr, line_tx.clone());
    }
    // The channel closes once both pipe readers are done.
    drop(line_tx);

    let (exit_tx, exit_rx) = oneshot::channel();
    let wait_label = label.to_string();
    tokio::spawn(async move {
        let result = child.wait().await.map(|status| status.code().unwrap_or(-1));
        if let Ok(code) = &result {
            debug!(command = %wait_label, exit_code = code, "command exited");
        }
        let _ = exit_tx.send(result);
    });

    Ok(CommandRun::new(label, line_rx, exit_rx))
}

/// Consecutive read errors tolerated on one pipe before giving up on it.
const MAX_READ_ERRORS: u32 = 8;

/// Forward `pipe` line by line until EOF.
///
/// The pipe is drained to the end even when nobody listens anymore or a line
/// is not valid UTF-8: closing it early would kill the child with SIGPIPE.
fn forward_lines<R>(pipe: R, stream: OutputStream, tx: mpsc::Sender<OutputLine>)
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut reader = BufReader::new(pipe);
        let mut buf = Vec::new();
        let mut forwarding = true;
        let mut read_errors = 0;

        loop {
            buf.clear();
            match reader.read_until(b'\n', &mut buf).await {
                Ok(0) => break,
                Ok(_) => {
                    read_errors = 0;
                    if !forwarding {
                        continue;
                    }
                    let text = decode_line(&buf);
                    if tx.send(OutputLine { stream, text }).await.is_err() {
                        forwarding = false;
                    }
                }
                Err(err) => {
                    read_errors += 1;
                    warn!(stream = %stream, error = %err, "reading command output failed");
                    if read_errors >= MAX_READ_ERRORS {
                        warn!(stream = %stream, "giving up on command output");
                        break;
                    }
                }
            }
        }
    });
}

/// Strip the line terminator and decode, replacing invalid UTF-8.
fn decode_line(raw: &[u8]) -> String {
    let raw = raw.strip_suffix(b"\n").unwrap_or(raw);
    let raw = raw.strip_suffix(b"\r").unwrap_or(raw);
    String::from_utf8_lossy(raw).into_owned()
}

/// Run `argv` in `cwd` to completion and capture its output.
pub async fn run_captured(argv: &[String], cwd: &Path) -> Result<Captured> {
    let mut cmd = build_command(argv, cwd)?;
    cmd.stdin(Stdio::null()).kill_on_drop(true);

    let output = cmd
        .output()
        .await
        .with_context(|| format!("running {:?}", argv))?;

    let captured = Captured {
        exit_code: output.status.code().unwrap_or(-1),
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
    };

    debug!(argv = ?argv, exit_code = captured.exit_code, stdout = %captured.stdout.trim(), "query command finished");

    Ok(captured)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_strips_terminators_and_replaces_invalid_bytes() {
        assert_eq!(decode_line(b"pulling web\n"), "pulling web");
        assert_eq!(decode_line(b"windows\r\n"), "windows");
        assert_eq!(decode_line(b"no newline"), "no newline");
        assert_eq!(decode_line(b"bad \xff byte\n"), "bad \u{FFFD} byte");
    }
}
