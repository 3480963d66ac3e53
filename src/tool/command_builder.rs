//! Builder for running external tools with consistent error handling.
//!
//! Container creation and signing are delegated to executables outside this crate.
//! [`ToolCommand`] spawns them, optionally bounds the wait, captures output and maps
//! every failure onto an [`UpdateError`] variant:
//!
//! | Failure                         | Error                          |
//! |---------------------------------|--------------------------------|
//! | executable missing              | [`UpdateError::ToolNotFound`]  |
//! | nonzero exit / killed by signal | [`UpdateError::ToolFailed`]    |
//! | timeout elapsed                 | [`UpdateError::ToolTimedOut`]  |
//!
//! A spawn failure and a nonzero exit are equally fatal; callers never salvage
//! partial output.

use anyhow::{Context, Result};
use std::ffi::{OsStr, OsString};
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, Command};
use tokio::time::timeout;

use crate::core::UpdateError;

/// Type-safe builder for constructing and executing external tool invocations.
///
/// # Examples
///
/// ```rust,no_run
/// use fullupdate_cli::tool::ToolCommand;
/// use std::time::Duration;
///
/// # async fn example() -> anyhow::Result<()> {
/// ToolCommand::new("make_full_update.sh")
///     .arg("/w/update/app-complete.mar")
///     .arg("/w/mar/current-build")
///     .env("MAR", "/opt/mar")
///     .with_timeout(Some(Duration::from_secs(3600)))
///     .with_context("Building complete update")
///     .execute_success()
///     .await?;
/// # Ok(())
/// # }
/// ```
///
/// # Default Configuration
///
/// - **Timeout**: none (wait until the tool exits)
/// - **Output capture**: enabled
/// - **Environment**: inherited from the parent process plus [`env`](Self::env) entries
pub struct ToolCommand {
    /// Executable name or path
    program: PathBuf,

    /// Arguments passed to the tool
    args: Vec<OsString>,

    /// Extra environment variables for the child
    env_vars: Vec<(OsString, OsString)>,

    /// Maximum duration to wait for the tool (None = no timeout)
    timeout_duration: Option<Duration>,

    /// Optional context string for log lines
    context: Option<String>,
}

/// Captured output of a successful tool run.
#[derive(Debug, Clone)]
pub struct ToolOutput {
    /// Standard output, lossily decoded
    pub stdout: String,
    /// Standard error, lossily decoded
    pub stderr: String,
}

impl ToolCommand {
    /// Creates a builder for `program` with no arguments and no timeout.
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            env_vars: Vec::new(),
            timeout_duration: None,
            context: None,
        }
    }

    /// Appends one argument.
    pub fn arg(mut self, arg: impl AsRef<OsStr>) -> Self {
        self.args.push(arg.as_ref().to_os_string());
        self
    }

    /// Appends several arguments.
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        self.args.extend(args.into_iter().map(|a| a.as_ref().to_os_string()));
        self
    }

    /// Sets an environment variable for the child process.
    pub fn env(mut self, key: impl AsRef<OsStr>, value: impl AsRef<OsStr>) -> Self {
        self.env_vars.push((key.as_ref().to_os_string(), value.as_ref().to_os_string()));
        self
    }

    /// Bounds the wait for the tool. On expiry the tool and every process it
    /// started are killed.
    pub const fn with_timeout(mut self, duration: Option<Duration>) -> Self {
        self.timeout_duration = duration;
        self
    }

    /// Adds a context label to log lines emitted for this invocation.
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    /// The tool as it will be reported in errors.
    #[must_use]
    pub fn tool_name(&self) -> String {
        self.program.display().to_string()
    }

    fn command_line(&self) -> String {
        let mut line = self.tool_name();
        for arg in &self.args {
            line.push(' ');
            line.push_str(&arg.to_string_lossy());
        }
        line
    }

    /// Runs the tool and returns its captured output.
    ///
    /// # Errors
    ///
    /// - [`UpdateError::ToolNotFound`] if the executable cannot be launched
    /// - [`UpdateError::ToolFailed`] if it exits unsuccessfully
    /// - [`UpdateError::ToolTimedOut`] if the configured timeout elapses
    pub async fn execute(self) -> Result<ToolOutput> {
        let start = std::time::Instant::now();
        let tool = self.tool_name();
        let command_line = self.command_line();
        let label = self.context.clone().unwrap_or_else(|| tool.clone());

        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        // Own process group, so a timeout can take down everything the tool started.
        #[cfg(unix)]
        cmd.process_group(0);

        for (key, value) in &self.env_vars {
            tracing::trace!(
                target: "tool",
                "Setting env var: {}={}",
                key.to_string_lossy(),
                value.to_string_lossy()
            );
            cmd.env(key, value);
        }

        tracing::debug!(target: "tool", "({}) Executing command: {}", label, command_line);

        let mut child = match cmd.spawn() {
            Ok(child) => child,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(UpdateError::ToolNotFound {
                    tool,
                }
                .into());
            }
            Err(e) => {
                return Err(e).with_context(|| format!("Failed to launch {command_line}"));
            }
        };

        let stdout_pipe = child.stdout.take();
        let stderr_pipe = child.stderr.take();
        let collect = async {
            let (status, stdout, stderr) =
                tokio::join!(child.wait(), read_pipe(stdout_pipe), read_pipe(stderr_pipe));
            Ok::<_, std::io::Error>((status?, stdout?, stderr?))
        };

        let waited = match self.timeout_duration {
            Some(duration) => timeout(duration, collect).await.map_err(|_| duration),
            None => Ok(collect.await),
        };
        let result = match waited {
            Ok(result) => result,
            Err(duration) => {
                tracing::warn!(
                    target: "tool",
                    "({}) Command timed out after {:?}: {}",
                    label,
                    duration,
                    command_line
                );
                terminate(&mut child, &label).await;
                return Err(UpdateError::ToolTimedOut {
                    tool,
                    timeout: duration,
                }
                .into());
            }
        };
        let (status, stdout, stderr) =
            result.with_context(|| format!("Failed to wait for {command_line}"))?;

        let stdout = String::from_utf8_lossy(&stdout).to_string();
        let stderr = String::from_utf8_lossy(&stderr).to_string();

        if !status.success() {
            tracing::debug!(
                target: "tool",
                "({}) Command failed with exit code: {:?}",
                label,
                status.code()
            );
            if !stderr.is_empty() {
                tracing::debug!(target: "tool", "({}) Error: {}", label, stderr.trim());
            }

            return Err(UpdateError::ToolFailed {
                tool,
                code: status.code(),
                stderr: if stderr.trim().is_empty() {
                    stdout
                } else {
                    stderr
                },
            }
            .into());
        }

        if !stdout.is_empty() {
            tracing::debug!(target: "tool", "({}) {}", label, stdout.trim());
        }
        if !stderr.is_empty() {
            tracing::debug!(target: "tool", "({}) {}", label, stderr.trim());
        }

        let elapsed = start.elapsed();
        if elapsed.as_secs() > 1 {
            tracing::info!(target: "tool::perf", "({}) {} took {:.2}s", label, tool, elapsed.as_secs_f64());
        } else {
            tracing::debug!(target: "tool::perf", "({}) {} took {}ms", label, tool, elapsed.as_millis());
        }

        Ok(ToolOutput {
            stdout,
            stderr,
        })
    }

    /// Runs the tool and discards its output.
    pub async fn execute_success(self) -> Result<()> {
        self.execute().await?;
        Ok(())
    }
}

async fn read_pipe<R: AsyncRead + Unpin>(pipe: Option<R>) -> std::io::Result<Vec<u8>> {
    let mut buf = Vec::new();
    if let Some(mut pipe) = pipe {
        pipe.read_to_end(&mut buf).await?;
    }
    Ok(buf)
}

/// Kills the tool's whole process group, then the tool itself, and reaps it.
async fn terminate(child: &mut Child, label: &str) {
    #[cfg(unix)]
    if let Some(pid) = child.id().and_then(|id| i32::try_from(id).ok()) {
        use nix::sys::signal::{Signal, killpg};
        use nix::unistd::Pid;

        if let Err(e) = killpg(Pid::from_raw(pid), Signal::SIGKILL) {
            tracing::debug!(target: "tool", "({}) Failed to kill process group {}: {}", label, pid, e);
        }
    }
    if let Err(e) = child.kill().await {
        tracing::debug!(target: "tool", "({}) Failed to kill tool: {}", label, e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_builder_basic() {
        let cmd = ToolCommand::new("mar").args(["-C", "/w/update"]).arg("-s");
        assert_eq!(cmd.command_line(), "mar -C /w/update -s");
        assert!(cmd.timeout_duration.is_none());
    }

    #[tokio::test]
    async fn test_missing_tool_is_not_found() {
        let err = ToolCommand::new("fullupdate-no-such-tool-anywhere").execute().await.unwrap_err();
        match err.downcast_ref::<UpdateError>() {
            Some(UpdateError::ToolNotFound {
                tool,
            }) => assert_eq!(tool, "fullupdate-no-such-tool-anywhere"),
            other => panic!("Expected ToolNotFound, got {other:?}"),
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_nonzero_exit_is_tool_failed() {
        let err = ToolCommand::new("sh")
            .args(["-c", "echo broken >&2; exit 3"])
            .execute()
            .await
            .unwrap_err();
        match err.downcast_ref::<UpdateError>() {
            Some(UpdateError::ToolFailed {
                code,
                stderr,
                ..
            }) => {
                assert_eq!(*code, Some(3));
                assert_eq!(stderr.trim(), "broken");
            }
            other => panic!("Expected ToolFailed, got {other:?}"),
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_success_captures_stdout_and_env() {
        let output = ToolCommand::new("sh")
            .args(["-c", "printf '%s' \"$FULLUPDATE_TEST_VALUE\""])
            .env("FULLUPDATE_TEST_VALUE", "hello")
            .execute()
            .await
            .unwrap();
        assert_eq!(output.stdout, "hello");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_timeout_kills_tool() {
        let start = std::time::Instant::now();
        let err = ToolCommand::new("sh")
            .args(["-c", "sleep 30"])
            .with_timeout(Some(Duration::from_millis(200)))
            .execute()
            .await
            .unwrap_err();
        assert!(matches!(err.downcast_ref::<UpdateError>(), Some(UpdateError::ToolTimedOut { .. })));
        assert!(start.elapsed() < Duration::from_secs(10));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_timeout_kills_processes_started_by_tool() {
        let temp = tempfile::tempdir().unwrap();
        let late = temp.path().join("late.mar");

        // The shell waits on a background job instead of exec'ing it.
        let err = ToolCommand::new("sh")
            .args(["-c", "sh -c 'sleep 1; echo late > \"$0\"' \"$1\" & wait", "tool"])
            .arg(&late)
            .with_timeout(Some(Duration::from_millis(200)))
            .execute()
            .await
            .unwrap_err();
        assert!(matches!(err.downcast_ref::<UpdateError>(), Some(UpdateError::ToolTimedOut { .. })));

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert!(!late.exists(), "background job outlived the timeout");
    }
}
