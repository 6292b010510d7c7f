//! Command-line programs as tool backends.
//!
//! Arguments are always handed to the program as a literal argv; nothing is ever
//! composed into a shell string.

use async_trait::async_trait;
use std::io;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncReadExt;
use tokio::process::Command;

use super::require_env;

/// Everything observed about one finished (or abandoned) process run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProcessInvocation {
    pub argv: Vec<String>,
    pub stdout: String,
    pub stderr: String,
    pub exit_code: Option<i32>,
    pub timed_out: bool,
}

impl ProcessInvocation {
    /// A short note for the model when the process did not exit cleanly
    pub fn exit_note(&self) -> Option<String> {
        if self.exit_code == Some(0) {
            return None;
        }
        let code = self
            .exit_code
            .map(|c| c.to_string())
            .unwrap_or_else(|| "unknown".to_string());
        Some(format!("(exit status {}: {})", code, self.stderr.trim()))
    }
}

/// Spawns processes on behalf of a [`ProcessToolExecutor`]
#[async_trait]
pub trait ProcessRunner: Send + Sync {
    /// Run `argv` to completion or until `timeout` elapses.
    ///
    /// Returns `Err` only when the process could not be started.
    async fn run(&self, argv: Vec<String>, timeout: Duration) -> io::Result<ProcessInvocation>;
}

/// Runs processes with tokio, killing them on timeout or when the caller goes away
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioProcessRunner;

#[async_trait]
impl ProcessRunner for TokioProcessRunner {
    async fn run(&self, argv: Vec<String>, timeout: Duration) -> io::Result<ProcessInvocation> {
        let (program, args) = argv
            .split_first()
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "empty command line"))?;

        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        let mut stdout_pipe = child
            .stdout
            .take()
            .ok_or_else(|| io::Error::new(io::ErrorKind::Other, "stdout was not captured"))?;
        let mut stderr_pipe = child
            .stderr
            .take()
            .ok_or_else(|| io::Error::new(io::ErrorKind::Other, "stderr was not captured"))?;

        let mut stdout = Vec::new();
        let mut stderr = Vec::new();
        let finished = tokio::time::timeout(timeout, async {
            let (out, err, status) = tokio::join!(
                stdout_pipe.read_to_end(&mut stdout),
                stderr_pipe.read_to_end(&mut stderr),
                child.wait()
            );
            out?;
            err?;
            status
        })
        .await;

        let (exit_code, timed_out) = match finished {
            Ok(status) => (status?.code(), false),
            Err(_) => {
                tracing::warn!(program = %program, "process timed out, killing it");
                if let Err(e) = child.kill().await {
                    tracing::error!(program = %program, "failed to kill process: {}", e);
                }
                (None, true)
            }
        };

        Ok(ProcessInvocation {
            argv,
            stdout: String::from_utf8_lossy(&stdout).into_owned(),
            stderr: String::from_utf8_lossy(&stderr).into_owned(),
            exit_code,
            timed_out,
        })
    }
}

/// Runs tool backends as processes under a timeout, turning every failure into text
#[derive(Clone)]
pub struct ProcessToolExecutor {
    runner: Arc<dyn ProcessRunner>,
    timeout: Duration,
}

impl ProcessToolExecutor {
    pub fn new(runner: Arc<dyn ProcessRunner>, timeout: Duration) -> Self {
        Self { runner, timeout }
    }

    /// Run `argv`. `Err` carries the failure text for the model.
    pub async fn run(&self, operation: &str, argv: Vec<String>) -> Result<ProcessInvocation, String> {
        let program = argv.first().cloned().unwrap_or_default();
        // argv may hold a signing key, so only the program name is logged
        tracing::info!(operation, program = %program, "running tool process");

        match self.runner.run(argv, self.timeout).await {
            Ok(invocation) if invocation.timed_out => Err(format!(
                "{} failed: {} timed out after {:?}",
                operation, program, self.timeout
            )),
            Ok(invocation) => {
                if invocation.exit_code != Some(0) {
                    tracing::warn!(
                        operation,
                        exit_code = ?invocation.exit_code,
                        "tool process exited unsuccessfully"
                    );
                }
                Ok(invocation)
            }
            Err(e) => {
                tracing::error!(operation, program = %program, "failed to spawn process: {}", e);
                Err(format!("Error executing {} command: {}", program, e))
            }
        }
    }

    /// Check that `credential_var` is set, then run the argv built from its value.
    ///
    /// Nothing is spawned when the variable is missing.
    pub async fn run_with_credential<F>(
        &self,
        operation: &str,
        credential_var: &str,
        build_argv: F,
    ) -> Result<ProcessInvocation, String>
    where
        F: FnOnce(&str) -> Vec<String> + Send,
    {
        let credential = require_env(operation, credential_var)?;
        self.run(operation, build_argv(&credential)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    fn argv(parts: &[&str]) -> Vec<String> {
        parts.iter().map(|s| s.to_string()).collect()
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_captures_streams_and_exit_code() {
        let invocation = TokioProcessRunner
            .run(
                argv(&["sh", "-c", "echo out; echo err >&2; exit 3"]),
                Duration::from_secs(10),
            )
            .await
            .unwrap();

        assert_eq!(invocation.stdout, "out\n");
        assert_eq!(invocation.stderr, "err\n");
        assert_eq!(invocation.exit_code, Some(3));
        assert!(!invocation.timed_out);
        assert_eq!(invocation.exit_note().unwrap(), "(exit status 3: err)");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_arguments_are_not_shell_expanded() {
        let invocation = TokioProcessRunner
            .run(argv(&["echo", "$HOME; rm -rf /"]), Duration::from_secs(10))
            .await
            .unwrap();
        assert_eq!(invocation.stdout, "$HOME; rm -rf /\n");
        assert_eq!(invocation.exit_note(), None);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_timeout_kills_process() {
        let started = Instant::now();
        let invocation = TokioProcessRunner
            .run(argv(&["sleep", "30"]), Duration::from_millis(200))
            .await
            .unwrap();

        assert!(invocation.timed_out);
        assert_eq!(invocation.exit_code, None);
        assert!(started.elapsed() < Duration::from_secs(10));
    }

    #[tokio::test]
    async fn test_spawn_failure_is_reported_as_text() {
        let executor = ProcessToolExecutor::new(Arc::new(TokioProcessRunner), Duration::from_secs(5));
        let err = executor
            .run("Create proposal", argv(&["definitely-not-a-real-binary-4821"]))
            .await
            .unwrap_err();
        assert!(err.starts_with("Error executing definitely-not-a-real-binary-4821 command:"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_executor_reports_timeout() {
        let executor =
            ProcessToolExecutor::new(Arc::new(TokioProcessRunner), Duration::from_millis(100));
        let err = executor
            .run("Vote", argv(&["sleep", "30"]))
            .await
            .unwrap_err();
        assert_eq!(err, "Vote failed: sleep timed out after 100ms");
    }

    #[tokio::test]
    async fn test_missing_credential_skips_spawn() {
        let executor = ProcessToolExecutor::new(Arc::new(TokioProcessRunner), Duration::from_secs(5));
        let err = executor
            .run_with_credential("Vote", "DAO_TEST_UNSET_PROCESS_KEY", |_| {
                panic!("argv must not be built without a credential")
            })
            .await
            .unwrap_err();
        assert_eq!(
            err,
            "Vote failed: DAO_TEST_UNSET_PROCESS_KEY not set in environment."
        );
    }
}
