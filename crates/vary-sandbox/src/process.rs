//! Deadline-bounded subprocess execution.
//!
//! The child is polled on a short tick while a one-shot deadline channel
//! races it. If the deadline wins the child is killed and reaped; nothing
//! is retried here.

use std::io::Read;
use std::path::Path;
use std::process::{Command, ExitStatus, Stdio};
use std::time::Duration;

use crossbeam::channel::{after, bounded, tick, Receiver};
use crossbeam::select;

/// Poll period for child completion.
const POLL_INTERVAL: Duration = Duration::from_millis(10);
/// How long a killed child's output is waited for. A grandchild still
/// holding the pipe keeps the reader thread alive; it is detached past this.
const DRAIN_GRACE: Duration = Duration::from_millis(200);

#[derive(Debug, thiserror::Error)]
pub enum ProcessError {
    #[error("empty command line")]
    EmptyCommand,

    #[error("failed to run '{program}': {source}")]
    Spawn {
        program: String,
        source: std::io::Error,
    },

    #[error("'{program}' did not finish within {timeout:?}")]
    Timeout { program: String, timeout: Duration },

    #[error("I/O error while waiting for '{program}': {source}")]
    Wait {
        program: String,
        source: std::io::Error,
    },
}

/// Exit status and captured stdout of a finished command.
#[derive(Debug)]
pub struct CommandOutput {
    pub status: ExitStatus,
    pub stdout: Vec<u8>,
}

/// Run `argv` (plus `extra_args`) in `cwd`, capturing stdout, killing it at `timeout`.
pub fn run_with_timeout(
    argv: &[String],
    extra_args: &[&str],
    cwd: &Path,
    timeout: Duration,
) -> Result<CommandOutput, ProcessError> {
    let (program, args) = argv.split_first().ok_or(ProcessError::EmptyCommand)?;

    let mut child = Command::new(program)
        .args(args)
        .args(extra_args)
        .current_dir(cwd)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .map_err(|source| ProcessError::Spawn {
            program: program.clone(),
            source,
        })?;

    // Drain stdout on a side thread so a chatty child cannot block on a full pipe.
    let stdout = child.stdout.take();
    let (sender, output) = bounded(1);
    std::thread::spawn(move || {
        let mut buf = Vec::new();
        if let Some(mut out) = stdout {
            let _ = out.read_to_end(&mut buf);
        }
        let _ = sender.send(buf);
    });

    let deadline = after(timeout);
    let ticker = tick(POLL_INTERVAL);

    let status = loop {
        let expired = select! {
            recv(deadline) -> _ => true,
            recv(ticker) -> _ => false,
        };

        if expired {
            let _ = child.kill();
            let _ = child.wait();
            collect_output(&output, DRAIN_GRACE, program);
            log::warn!("'{program}' killed after {timeout:?}");
            return Err(ProcessError::Timeout {
                program: program.clone(),
                timeout,
            });
        }

        match child.try_wait() {
            Ok(Some(status)) => break status,
            Ok(None) => continue,
            Err(source) => {
                let _ = child.kill();
                return Err(ProcessError::Wait {
                    program: program.clone(),
                    source,
                });
            }
        }
    };

    let stdout = collect_output(&output, timeout, program);
    log::debug!("'{program}' exited with {status}");

    Ok(CommandOutput { status, stdout })
}

/// Output gathered by the reader thread, empty if the pipe is still open
/// after `wait`.
fn collect_output(output: &Receiver<Vec<u8>>, wait: Duration, program: &str) -> Vec<u8> {
    output.recv_timeout(wait).unwrap_or_else(|_| {
        log::warn!("output of '{program}' still open after {wait:?}, detaching its reader");
        Vec::new()
    })
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn argv(parts: &[&str]) -> Vec<String> {
        parts.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_captures_stdout() {
        let dir = std::env::temp_dir();
        let out = run_with_timeout(&argv(&["echo", "hello"]), &[], &dir, Duration::from_secs(5)).unwrap();
        assert!(out.status.success());
        assert_eq!(String::from_utf8_lossy(&out.stdout).trim(), "hello");
    }

    #[test]
    fn test_extra_args_are_appended() {
        let dir = std::env::temp_dir();
        let out = run_with_timeout(&argv(&["echo", "a"]), &["b"], &dir, Duration::from_secs(5)).unwrap();
        assert_eq!(String::from_utf8_lossy(&out.stdout).trim(), "a b");
    }

    #[test]
    fn test_deadline_kills_child() {
        let dir = std::env::temp_dir();
        let err = run_with_timeout(&argv(&["sleep", "5"]), &[], &dir, Duration::from_millis(200)).unwrap_err();
        assert!(matches!(err, ProcessError::Timeout { .. }));
    }

    #[test]
    fn test_timeout_returns_while_grandchild_holds_output() {
        let dir = std::env::temp_dir();
        let started = std::time::Instant::now();
        let err = run_with_timeout(
            &argv(&["sh", "-c", "sleep 5 & sleep 5"]),
            &[],
            &dir,
            Duration::from_millis(200),
        )
        .unwrap_err();
        assert!(matches!(err, ProcessError::Timeout { .. }));
        assert!(started.elapsed() < Duration::from_secs(3), "{:?}", started.elapsed());
    }

    #[test]
    fn test_empty_command_rejected() {
        let dir = std::env::temp_dir();
        let err = run_with_timeout(&[], &[], &dir, Duration::from_secs(1)).unwrap_err();
        assert!(matches!(err, ProcessError::EmptyCommand));
    }

    #[test]
    fn test_missing_program_is_spawn_error() {
        let dir = std::env::temp_dir();
        let err = run_with_timeout(
            &argv(&["definitely-not-a-real-program-vary"]),
            &[],
            &dir,
            Duration::from_secs(1),
        )
        .unwrap_err();
        assert!(matches!(err, ProcessError::Spawn { .. }));
    }
}
