// src/orchestrator/output.rs

//! Streamed output of a container-tooling command.

use std::fmt;

use tokio::sync::{mpsc, oneshot};
use tracing::debug;

/// Which pipe a line came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputStream {
    Stdout,
    Stderr,
}

impl fmt::Display for OutputStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputStream::Stdout => f.write_str("stdout"),
            OutputStream::Stderr => f.write_str("stderr"),
        }
    }
}

/// A single line of command output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputLine {
    pub stream: OutputStream,
    pub text: String,
}

impl OutputLine {
    pub fn stdout(text: impl Into<String>) -> Self {
        Self {
            stream: OutputStream::Stdout,
            text: text.into(),
        }
    }

    pub fn stderr(text: impl Into<String>) -> Self {
        Self {
            stream: OutputStream::Stderr,
            text: text.into(),
        }
    }
}

/// Everything a finished command produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    pub label: String,
    pub exit_code: i32,
    pub lines: Vec<OutputLine>,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// A running (or already finished) command.
///
/// Lines can be pulled one at a time with [`CommandRun::next_line`] while the
/// process is still going; the stream is finite and cannot be restarted.
/// [`CommandRun::finish`] drains whatever is left and waits for the exit
/// code. Lines handed out by `next_line` are kept, so the final
/// [`CommandOutput`] always holds the full capture.
#[derive(Debug)]
pub struct CommandRun {
    label: String,
    lines: mpsc::Receiver<OutputLine>,
    exit: oneshot::Receiver<std::io::Result<i32>>,
    captured: Vec<OutputLine>,
}

impl CommandRun {
    /// Wire up a run from its line channel and exit-code channel.
    pub fn new(
        label: impl Into<String>,
        lines: mpsc::Receiver<OutputLine>,
        exit: oneshot::Receiver<std::io::Result<i32>>,
    ) -> Self {
        Self {
            label: label.into(),
            lines,
            exit,
            captured: Vec::new(),
        }
    }

    /// A run whose output and exit code are known up front.
    pub fn completed(label: impl Into<String>, lines: Vec<OutputLine>, exit_code: i32) -> Self {
        let (line_tx, line_rx) = mpsc::channel(lines.len().max(1));
        for line in lines {
            // Capacity covers every line, so this cannot be full.
            let _ = line_tx.try_send(line);
        }
        drop(line_tx);

        let (exit_tx, exit_rx) = oneshot::channel();
        let _ = exit_tx.send(Ok(exit_code));

        Self::new(label, line_rx, exit_rx)
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Next output line, or `None` once both pipes are closed.
    pub async fn next_line(&mut self) -> Option<OutputLine> {
        let line = self.lines.recv().await?;
        self.captured.push(line.clone());
        Some(line)
    }

    /// Drain remaining output and wait for the exit code.
    pub async fn finish(mut self) -> std::io::Result<CommandOutput> {
        while self.next_line().await.is_some() {}

        let exit_code = match self.exit.await {
            Ok(result) => result?,
            Err(_) => {
                return Err(std::io::Error::other(format!(
                    "'{}' exited without reporting a status",
                    self.label
                )));
            }
        };

        Ok(CommandOutput {
            label: self.label,
            exit_code,
            lines: self.captured,
        })
    }

    /// Like [`CommandRun::finish`], logging every line at `debug` as it
    /// arrives.
    pub async fn follow(mut self) -> std::io::Result<CommandOutput> {
        while let Some(line) = self.next_line().await {
            debug!(command = %self.label, stream = %line.stream, "{}", line.text);
        }
        self.finish().await
    }
}
