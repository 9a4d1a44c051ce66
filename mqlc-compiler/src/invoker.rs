//! Process invocation
//!
//! Spawns the external compiler, captures stdout/stderr as it arrives and
//! enforces the wall-clock budget. The caller receives one tagged
//! [`InvocationOutcome`]; the exit code is reported but never decides success,
//! since the wrapped compiler's exit codes are unreliable across strategies.

use std::process::Stdio;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::strategy::CommandLine;

/// Maximum stdout or stderr size captured per stream (10 MiB)
const MAX_OUTPUT_BYTES: usize = 10 * 1024 * 1024;

/// How long output readers may keep draining after the child is gone
///
/// A killed emulator can leave grandchildren holding the pipes open.
const DRAIN_GRACE: Duration = Duration::from_secs(2);

/// How an invocation ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvocationOutcome {
    /// The process exited on its own (any code)
    Completed {
        exit_code: Option<i32>,
        stdout: String,
        stderr: String,
        elapsed: Duration,
    },
    /// The budget ran out; the process was killed
    TimedOut {
        stdout: String,
        stderr: String,
        elapsed: Duration,
    },
    /// The executable could not be started
    SpawnFailed { detail: String },
}

impl InvocationOutcome {
    /// Captured output, empty for spawn failures
    pub fn output(&self) -> (&str, &str) {
        match self {
            InvocationOutcome::Completed { stdout, stderr, .. }
            | InvocationOutcome::TimedOut { stdout, stderr, .. } => (stdout.as_str(), stderr.as_str()),
            InvocationOutcome::SpawnFailed { .. } => ("", ""),
        }
    }
}

type SharedBuffer = Arc<Mutex<Vec<u8>>>;

/// Runs `command` to completion or until `timeout` elapses
pub async fn invoke(command: &CommandLine, timeout: Duration) -> InvocationOutcome {
    info!("Command: {}", command);

    let mut cmd = Command::new(&command.program);
    cmd.args(&command.args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let start = Instant::now();

    let mut child = match cmd.spawn() {
        Ok(child) => child,
        Err(e) => {
            warn!("Compiler spawn error: {}", e);
            return InvocationOutcome::SpawnFailed {
                detail: format!(
                    "Failed to start compiler '{}': {}",
                    command.program.to_string_lossy(),
                    e
                ),
            };
        }
    };

    let stdout_buf: SharedBuffer = Arc::new(Mutex::new(Vec::new()));
    let stderr_buf: SharedBuffer = Arc::new(Mutex::new(Vec::new()));

    let stdout_task = spawn_reader(child.stdout.take(), Arc::clone(&stdout_buf));
    let stderr_task = spawn_reader(child.stderr.take(), Arc::clone(&stderr_buf));

    let exit_code = match tokio::time::timeout(timeout, child.wait()).await {
        Ok(Ok(status)) => {
            debug!("Compiler exited with code: {:?}", status.code());
            status.code()
        }
        Ok(Err(e)) => {
            // The artifact check decides the job either way
            warn!("Failed to wait for compiler: {}", e);
            None
        }
        Err(_) => {
            let elapsed = start.elapsed();
            warn!("Compilation timeout after {:?}, killing compiler", timeout);
            if let Err(e) = child.kill().await {
                warn!("Failed to kill compiler process: {}", e);
            }
            drain(stdout_task, stderr_task).await;

            return InvocationOutcome::TimedOut {
                stdout: take_text(&stdout_buf),
                stderr: take_text(&stderr_buf),
                elapsed,
            };
        }
    };

    let elapsed = start.elapsed();
    drain(stdout_task, stderr_task).await;

    InvocationOutcome::Completed {
        exit_code,
        stdout: take_text(&stdout_buf),
        stderr: take_text(&stderr_buf),
        elapsed,
    }
}

/// Copies a child stream into `sink` chunk by chunk, capped at [`MAX_OUTPUT_BYTES`]
fn spawn_reader<R>(handle: Option<R>, sink: SharedBuffer) -> Option<JoinHandle<()>>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    let mut reader = handle?;
    Some(tokio::spawn(async move {
        let mut chunk = [0u8; 8192];
        loop {
            match reader.read(&mut chunk).await {
                Ok(0) | Err(_) => break,
                Ok(n) => {
                    let mut buf = sink.lock().unwrap_or_else(PoisonError::into_inner);
                    let room = MAX_OUTPUT_BYTES.saturating_sub(buf.len());
                    buf.extend_from_slice(&chunk[..n.min(room)]);
                }
            }
        }
    }))
}

/// Waits for both readers, abandoning them after [`DRAIN_GRACE`]
async fn drain(stdout: Option<JoinHandle<()>>, stderr: Option<JoinHandle<()>>) {
    for task in [stdout, stderr].into_iter().flatten() {
        let abort = task.abort_handle();
        if tokio::time::timeout(DRAIN_GRACE, task).await.is_err() {
            debug!("Output reader still open after {:?}, abandoning", DRAIN_GRACE);
            abort.abort();
        }
    }
}

fn take_text(buffer: &SharedBuffer) -> String {
    let bytes = std::mem::take(&mut *buffer.lock().unwrap_or_else(PoisonError::into_inner));
    String::from_utf8_lossy(&bytes).into_owned()
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::ffi::OsString;

    fn sh(script: &str) -> CommandLine {
        CommandLine {
            program: OsString::from("sh"),
            args: vec![OsString::from("-c"), OsString::from(script)],
        }
    }

    #[tokio::test]
    async fn test_completed_captures_streams() {
        let outcome = invoke(&sh("echo compiled; echo warning >&2; exit 3"), Duration::from_secs(5)).await;

        match outcome {
            InvocationOutcome::Completed {
                exit_code,
                stdout,
                stderr,
                ..
            } => {
                assert_eq!(exit_code, Some(3));
                assert_eq!(stdout, "compiled\n");
                assert_eq!(stderr, "warning\n");
            }
            other => panic!("expected completion, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_timeout_kills_and_keeps_partial_output() {
        let started = Instant::now();
        let outcome = invoke(&sh("echo started; exec sleep 30"), Duration::from_millis(300)).await;

        assert!(started.elapsed() < Duration::from_secs(10));
        match outcome {
            InvocationOutcome::TimedOut { stdout, .. } => assert_eq!(stdout, "started\n"),
            other => panic!("expected timeout, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_spawn_failure() {
        let command = CommandLine {
            program: OsString::from("/nonexistent/metaeditor64.exe"),
            args: vec![],
        };

        let outcome = invoke(&command, Duration::from_secs(1)).await;
        assert!(matches!(outcome, InvocationOutcome::SpawnFailed { .. }));
        assert_eq!(outcome.output(), ("", ""));
    }
}
