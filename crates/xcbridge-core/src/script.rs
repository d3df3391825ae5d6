//! Bounded-wait execution of external scripts.
//!
//! A script is fed to the interpreter on stdin. stdout and stderr are drained
//! on reader threads so a chatty script cannot block on a full pipe, while the
//! calling thread waits on the child with an OS-level deadline. When the
//! deadline passes first, the child is killed and reaped and the call returns
//! [`XcbError::ProcessTimeout`]. Nothing here waits indefinitely.

use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use tracing::{debug, warn};
use wait_timeout::ChildExt;

use crate::error::{XcbError, XcbResult};

/// Captured result of a script that finished before its deadline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptOutput {
    /// Whether the interpreter exited with status 0.
    pub success: bool,
    /// Exit code if available.
    pub exit_code: Option<i32>,
    /// Captured stdout.
    pub stdout: String,
    /// Captured stderr.
    pub stderr: String,
    /// Wall time until exit.
    pub duration: Duration,
}

/// Runs scripts through one interpreter with a fixed deadline.
#[derive(Debug, Clone)]
pub struct ScriptRunner {
    program: PathBuf,
    args: Vec<String>,
    timeout: Duration,
}

impl ScriptRunner {
    /// Create a runner for `program` with a 60 second deadline.
    pub fn new(program: impl Into<PathBuf>) -> Self {
        ScriptRunner {
            program: program.into(),
            args: Vec::new(),
            timeout: Duration::from_secs(60),
        }
    }

    /// Set interpreter arguments placed before the script.
    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    /// Set the deadline.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// The interpreter this runner invokes.
    pub fn program(&self) -> &Path {
        &self.program
    }

    /// The deadline applied to each script.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Run `script` and wait for it, at most until the deadline.
    pub fn run(&self, script: &str) -> XcbResult<ScriptOutput> {
        let start = Instant::now();
        let mut child = self.spawn(script)?;

        let stdout = drain(child.stdout.take());
        let stderr = drain(child.stderr.take());

        match child.wait_timeout(self.timeout)? {
            Some(status) => {
                let output = ScriptOutput {
                    success: status.success(),
                    exit_code: status.code(),
                    stdout: join_reader(stdout),
                    stderr: join_reader(stderr),
                    duration: start.elapsed(),
                };
                debug!(
                    program = %self.program.display(),
                    exit_code = ?output.exit_code,
                    duration = ?output.duration,
                    "script finished"
                );
                Ok(output)
            }
            None => {
                let _ = child.kill();
                let _ = child.wait();
                // Not joined: a grandchild may still hold the pipes open.
                drop((stdout, stderr));
                warn!(
                    program = %self.program.display(),
                    timeout = ?self.timeout,
                    "script timed out and was killed"
                );
                Err(XcbError::timeout(
                    format!("script {}", self.program.display()),
                    self.timeout,
                ))
            }
        }
    }

    /// Start `script` without waiting for it.
    ///
    /// A detached reaper thread collects the child, killing it if it outlives
    /// the deadline, so no zombie is left behind.
    pub fn spawn_detached(&self, script: &str) -> XcbResult<()> {
        let mut child = self.spawn(script)?;
        let timeout = self.timeout;
        let program = self.program.display().to_string();

        thread::Builder::new()
            .name("xcb-script-reaper".to_string())
            .spawn(move || {
                let stdout = drain(child.stdout.take());
                let stderr = drain(child.stderr.take());
                match child.wait_timeout(timeout) {
                    Ok(Some(status)) if !status.success() => {
                        let stderr = join_reader(stderr);
                        warn!(program = %program, code = ?status.code(), stderr = %stderr.trim(), "detached script failed");
                    }
                    Ok(Some(_)) => {}
                    Ok(None) => {
                        let _ = child.kill();
                        let _ = child.wait();
                        warn!(program = %program, ?timeout, "detached script timed out and was killed");
                    }
                    Err(e) => warn!(program = %program, error = %e, "cannot wait for detached script"),
                }
                let _ = join_reader(stdout);
            })?;
        Ok(())
    }

    fn spawn(&self, script: &str) -> XcbResult<Child> {
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                XcbError::unavailable(format!("cannot start {}: {}", self.program.display(), e))
            })?;

        if let Some(mut stdin) = child.stdin.take() {
            if let Err(e) = stdin.write_all(script.as_bytes()) {
                let _ = child.kill();
                let _ = child.wait();
                return Err(XcbError::unavailable(format!(
                    "cannot send script to {}: {}",
                    self.program.display(),
                    e
                )));
            }
            // stdin drops here, closing the pipe so the interpreter sees EOF
        }

        Ok(child)
    }
}

fn drain<R>(pipe: Option<R>) -> Option<JoinHandle<Vec<u8>>>
where
    R: Read + Send + 'static,
{
    pipe.map(|mut reader| {
        thread::spawn(move || {
            let mut buf = Vec::new();
            let _ = reader.read_to_end(&mut buf);
            buf
        })
    })
}

fn join_reader(handle: Option<JoinHandle<Vec<u8>>>) -> String {
    handle
        .and_then(|h| h.join().ok())
        .map(|buf| String::from_utf8_lossy(&buf).into_owned())
        .unwrap_or_default()
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
#[cfg(unix)]
mod tests {
    use super::*;

    fn sh() -> ScriptRunner {
        ScriptRunner::new("sh").with_args(["-s"])
    }

    #[test]
    fn captures_stdout_and_exit_code() {
        let output = sh().run("echo hello\n").unwrap();
        assert!(output.success);
        assert_eq!(output.exit_code, Some(0));
        assert_eq!(output.stdout.trim(), "hello");
    }

    #[test]
    fn failing_script_reports_status_and_stderr() {
        let output = sh().run("echo oops >&2\nexit 3\n").unwrap();
        assert!(!output.success);
        assert_eq!(output.exit_code, Some(3));
        assert_eq!(output.stderr.trim(), "oops");
    }

    #[test]
    fn large_output_does_not_block() {
        let output = sh()
            .run("i=0\nwhile [ $i -lt 20000 ]; do echo line-$i; i=$((i+1)); done\n")
            .unwrap();
        assert!(output.success);
        assert_eq!(output.stdout.lines().count(), 20000);
    }

    #[test]
    fn deadline_kills_long_running_script() {
        let start = Instant::now();
        let err = sh()
            .with_timeout(Duration::from_millis(300))
            .run("sleep 10\n")
            .unwrap_err();
        assert!(matches!(err, XcbError::ProcessTimeout { .. }), "{:?}", err);
        assert!(
            start.elapsed() < Duration::from_secs(5),
            "should not wait for the sleep: {:?}",
            start.elapsed()
        );
    }

    #[test]
    fn missing_interpreter_is_unavailable() {
        let err = ScriptRunner::new("/nonexistent/interpreter")
            .run("")
            .unwrap_err();
        assert!(matches!(err, XcbError::AutomationUnavailable { .. }));
    }

    #[test]
    fn detached_script_returns_immediately() {
        let start = Instant::now();
        sh().with_timeout(Duration::from_secs(5))
            .spawn_detached("sleep 2\n")
            .unwrap();
        assert!(start.elapsed() < Duration::from_secs(1));
    }
}
