//! External command execution with line-by-line output logging

use async_trait::async_trait;
use std::ffi::{OsStr, OsString};
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tracing::{debug, info, warn};

use quarry_core::error::QuarryError;

use crate::AcquireResult;

/// Level at which a command's output stream is logged
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputLevel {
    Off,
    Debug,
    Info,
    Warn,
}

impl OutputLevel {
    fn log(&self, stream: &str, line: &str) {
        match self {
            OutputLevel::Off => {},
            OutputLevel::Debug => debug!("{}: {}", stream, line),
            OutputLevel::Info => info!("{}: {}", stream, line),
            OutputLevel::Warn => warn!("{}: {}", stream, line),
        }
    }
}

/// Captured output of a finished command
#[derive(Debug, Clone, Default)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
}

/// Runs external programs
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run `program` to completion; a non-zero exit is an error
    async fn run(
        &self,
        program: &str,
        args: &[OsString],
        stderr_level: OutputLevel,
    ) -> AcquireResult<CommandOutput>;
}

/// Render a command line for messages
pub fn display_command(program: &str, args: &[OsString]) -> String {
    std::iter::once(OsStr::new(program))
        .chain(args.iter().map(OsString::as_os_str))
        .map(|part| part.to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Runs commands as tokio child processes
#[derive(Debug, Clone, Copy)]
pub struct TokioCommandRunner {
    stdout_level: OutputLevel,
}

impl TokioCommandRunner {
    pub fn new() -> Self {
        Self {
            stdout_level: OutputLevel::Off,
        }
    }

    /// Runner that also logs each stdout line at `stdout_level`
    pub fn with_stdout_level(stdout_level: OutputLevel) -> Self {
        Self { stdout_level }
    }
}

impl Default for TokioCommandRunner {
    fn default() -> Self {
        Self::new()
    }
}

async fn collect_lines<R>(stream: R, name: &str, level: OutputLevel) -> std::io::Result<String>
where
    R: AsyncRead + Unpin,
{
    let mut lines = BufReader::new(stream).lines();
    let mut collected = String::new();
    while let Some(line) = lines.next_line().await? {
        level.log(name, line.trim());
        collected.push_str(&line);
        collected.push('\n');
    }
    Ok(collected)
}

#[async_trait]
impl CommandRunner for TokioCommandRunner {
    async fn run(
        &self,
        program: &str,
        args: &[OsString],
        stderr_level: OutputLevel,
    ) -> AcquireResult<CommandOutput> {
        let command = display_command(program, args);
        debug!("Running subprocess: {}", command);

        let mut child = tokio::process::Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| QuarryError::CommandFailed {
                command: command.clone(),
                reason: e.to_string(),
            })?;

        let stdout = child.stdout.take().ok_or_else(|| QuarryError::CommandFailed {
            command: command.clone(),
            reason: "stdout was not captured".to_string(),
        })?;
        let stderr = child.stderr.take().ok_or_else(|| QuarryError::CommandFailed {
            command: command.clone(),
            reason: "stderr was not captured".to_string(),
        })?;

        let (stdout, stderr) = tokio::join!(
            collect_lines(stdout, "stdout", self.stdout_level),
            collect_lines(stderr, "stderr", stderr_level)
        );
        let status = child.wait().await.map_err(|e| QuarryError::CommandFailed {
            command: command.clone(),
            reason: e.to_string(),
        })?;

        let read_error = |e: std::io::Error| QuarryError::CommandFailed {
            command: command.clone(),
            reason: format!("failed to read output: {}", e),
        };
        let output = CommandOutput {
            stdout: stdout.map_err(read_error)?,
            stderr: stderr.map_err(read_error)?,
        };

        if !status.success() {
            return Err(QuarryError::CommandFailed {
                command,
                reason: format!("{}: {}", status, output.stderr.trim()),
            });
        }
        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(raw: &[&str]) -> Vec<OsString> {
        raw.iter().map(OsString::from).collect()
    }

    #[test]
    fn test_display_command() {
        assert_eq!(
            display_command("git", &args(&["clone", "https://example.com/repo", "/tmp/x"])),
            "git clone https://example.com/repo /tmp/x"
        );
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_captures_output() {
        let output = TokioCommandRunner::new()
            .run("sh", &args(&["-c", "echo out; echo err >&2"]), OutputLevel::Debug)
            .await
            .unwrap();
        assert_eq!(output.stdout, "out\n");
        assert_eq!(output.stderr, "err\n");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_non_zero_exit_is_error() {
        let err = TokioCommandRunner::new()
            .run("sh", &args(&["-c", "echo broken >&2; exit 3"]), OutputLevel::Warn)
            .await
            .unwrap_err();
        match err {
            QuarryError::CommandFailed { command, reason } => {
                assert!(command.starts_with("sh -c"));
                assert!(reason.contains("broken"));
            },
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_logged_stdout_is_still_captured() {
        let runner = TokioCommandRunner::with_stdout_level(OutputLevel::Debug);
        assert_eq!(runner.stdout_level, OutputLevel::Debug);
        assert_eq!(TokioCommandRunner::default().stdout_level, OutputLevel::Off);

        let output = runner
            .run("sh", &args(&["-c", "echo one; echo two"]), OutputLevel::Off)
            .await
            .unwrap();
        assert_eq!(output.stdout, "one\ntwo\n");
    }

    #[tokio::test]
    async fn test_missing_program() {
        let result = TokioCommandRunner::new()
            .run("quarry-no-such-program", &[], OutputLevel::Debug)
            .await;
        assert!(matches!(result, Err(QuarryError::CommandFailed { .. })));
    }
}
