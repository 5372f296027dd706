//! Builder for executing short-lived encoder queries with timeout support.

use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use ffb_core::{Error, ProcessErrorKind};
use tokio::process::Command;

/// Default command timeout.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Output captured from a tool execution.
#[derive(Debug, Clone)]
pub struct ToolOutput {
    pub status: ExitStatus,
    /// Captured standard output (lossy UTF-8).
    pub stdout: String,
    /// Captured standard error (lossy UTF-8).
    pub stderr: String,
}

impl ToolOutput {
    /// Stdout followed by stderr.
    ///
    /// The encoder prints listings on stdout but media information on
    /// stderr, so parsers read both.
    pub fn combined(&self) -> String {
        let mut text = String::with_capacity(self.stdout.len() + self.stderr.len() + 1);
        text.push_str(&self.stdout);
        if !self.stdout.is_empty() && !self.stdout.ends_with('\n') {
            text.push('\n');
        }
        text.push_str(&self.stderr);
        text
    }
}

/// A builder for constructing and executing encoder invocations.
///
/// # Example
///
/// ```no_run
/// use ffb_av::ToolCommand;
/// use std::path::PathBuf;
///
/// # async fn example() -> ffb_core::Result<()> {
/// let output = ToolCommand::new(PathBuf::from("ffmpeg"))
///     .arg("-hide_banner")
///     .arg("-codecs")
///     .execute()
///     .await?;
/// println!("{}", output.stdout);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct ToolCommand {
    program: PathBuf,
    args: Vec<String>,
    timeout: Duration,
    allow_failure: bool,
}

impl ToolCommand {
    pub fn new(program: PathBuf) -> Self {
        Self {
            program,
            args: Vec::new(),
            timeout: DEFAULT_TIMEOUT,
            allow_failure: false,
        }
    }

    /// Append a single argument.
    pub fn arg(&mut self, s: impl Into<String>) -> &mut Self {
        self.args.push(s.into());
        self
    }

    /// Append multiple arguments.
    pub fn args(&mut self, iter: impl IntoIterator<Item = impl Into<String>>) -> &mut Self {
        self.args.extend(iter.into_iter().map(Into::into));
        self
    }

    /// Set the maximum execution time.
    pub fn timeout(&mut self, d: Duration) -> &mut Self {
        self.timeout = d;
        self
    }

    /// Accept a non-zero exit status.
    ///
    /// `ffmpeg -i <file>` always exits with an error because no output is
    /// given, yet prints everything we need.
    pub fn allow_failure(&mut self) -> &mut Self {
        self.allow_failure = true;
        self
    }

    /// Execute the command, capturing stdout and stderr.
    ///
    /// # Errors
    ///
    /// - [`Error::BinaryNotFound`] if the program does not exist.
    /// - [`Error::Process`] with [`ProcessErrorKind::FailedToStart`] if
    ///   spawning fails for another reason.
    /// - [`Error::Process`] with [`ProcessErrorKind::Timeout`] if the
    ///   process outlives the timeout. The child is killed.
    /// - [`Error::Process`] with [`ProcessErrorKind::Crashed`] on a non-zero
    ///   exit, unless [`allow_failure`](Self::allow_failure) was set.
    pub async fn execute(&self) -> ffb_core::Result<ToolOutput> {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let child = cmd.spawn().map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Error::binary_not_found(self.program.display())
            } else {
                Error::process(
                    ProcessErrorKind::FailedToStart,
                    format!("{}: {e}", self.program_name()),
                )
            }
        })?;

        match tokio::time::timeout(self.timeout, child.wait_with_output()).await {
            Ok(Ok(output)) => {
                let tool_output = ToolOutput {
                    status: output.status,
                    stdout: String::from_utf8_lossy(&output.stdout).to_string(),
                    stderr: String::from_utf8_lossy(&output.stderr).to_string(),
                };

                if !output.status.success() && !self.allow_failure {
                    return Err(Error::process(
                        ProcessErrorKind::Crashed,
                        format!(
                            "{} exited with status {}: {}",
                            self.program_name(),
                            output.status,
                            tool_output.stderr.trim()
                        ),
                    ));
                }

                Ok(tool_output)
            }
            Ok(Err(e)) => Err(Error::process(
                ProcessErrorKind::ReadError,
                format!("I/O error waiting for {}: {e}", self.program_name()),
            )),
            // The future owning the child is dropped here; kill_on_drop reaps it.
            Err(_elapsed) => Err(Error::process(
                ProcessErrorKind::Timeout,
                format!("{} timed out after {:?}", self.program_name(), self.timeout),
            )),
        }
    }

    fn program_name(&self) -> String {
        self.program
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| self.program.to_string_lossy().to_string())
    }
}
