//! Long-running encoder processes.
//!
//! A [`ProcessLauncher`] spawns the encoder and reports everything that
//! happens to it as [`ProcessEvent`]s on an mpsc channel, so the owner never
//! blocks on the child. Each launch carries a generation number; the owner
//! compares it against the job it is currently tracking and drops events
//! from superseded launches.

use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use ffb_core::{Error, ProcessErrorKind};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::process::{Child, ChildStdin, Command};
use tokio::sync::{mpsc, watch, Mutex};
use tokio_util::sync::CancellationToken;

use crate::tools::resolve_binary;

/// How a process ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExitOutcome {
    /// The process returned an exit code, zero or not.
    Normal { code: i32 },
    /// The process was terminated without an exit code, e.g. by a signal.
    Crashed { description: String },
}

impl From<ExitStatus> for ExitOutcome {
    fn from(status: ExitStatus) -> Self {
        match status.code() {
            Some(code) => ExitOutcome::Normal { code },
            None => ExitOutcome::Crashed {
                description: status.to_string(),
            },
        }
    }
}

/// Something that happened to a launched process.
#[derive(Debug, Clone, PartialEq)]
pub enum ProcessEvent {
    /// A chunk of stdout or stderr, lossily decoded.
    Output { generation: u64, text: String },
    /// The process is gone and all of its output has been delivered.
    Exited { generation: u64, outcome: ExitOutcome },
    /// Supervising the process failed.
    Failed {
        generation: u64,
        kind: ProcessErrorKind,
        message: String,
    },
}

impl ProcessEvent {
    pub fn generation(&self) -> u64 {
        match self {
            ProcessEvent::Output { generation, .. }
            | ProcessEvent::Exited { generation, .. }
            | ProcessEvent::Failed { generation, .. } => *generation,
        }
    }
}

/// Control handle for a running encoder.
#[async_trait]
pub trait EncoderProcess: Send + Sync {
    /// OS process id, if known.
    fn id(&self) -> Option<u32>;

    /// Ask the encoder to finish gracefully by typing `q` on its stdin.
    async fn quit(&self) -> ffb_core::Result<()>;

    /// Wait until the process has exited. Returns `false` on timeout.
    async fn wait_for_exit(&self, timeout: Duration) -> bool;

    /// Terminate the process without waiting.
    fn kill(&self);
}

/// Spawns encoder processes.
pub trait ProcessLauncher: Send + Sync {
    /// Check that launching can work at all, before any job is dequeued.
    fn ensure_ready(&self) -> ffb_core::Result<()> {
        Ok(())
    }

    /// Start the encoder with `args`. Events are tagged with `generation`.
    fn launch(
        &self,
        args: &[String],
        generation: u64,
        events: mpsc::UnboundedSender<ProcessEvent>,
    ) -> ffb_core::Result<Arc<dyn EncoderProcess>>;
}

/// Launches the real encoder binary with `tokio::process`.
///
/// Must be used from within a tokio runtime.
#[derive(Debug, Clone, Default)]
pub struct FfmpegLauncher {
    /// Configured binary; `None` searches `PATH`.
    binary: Option<PathBuf>,
}

impl FfmpegLauncher {
    pub fn new(binary: Option<PathBuf>) -> Self {
        Self { binary }
    }
}

impl ProcessLauncher for FfmpegLauncher {
    fn ensure_ready(&self) -> ffb_core::Result<()> {
        resolve_binary(self.binary.as_deref()).map(|_| ())
    }

    fn launch(
        &self,
        args: &[String],
        generation: u64,
        events: mpsc::UnboundedSender<ProcessEvent>,
    ) -> ffb_core::Result<Arc<dyn EncoderProcess>> {
        let binary = resolve_binary(self.binary.as_deref())?;

        let mut child = Command::new(&binary)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                Error::process(
                    ProcessErrorKind::FailedToStart,
                    format!("{}: {e}", binary.display()),
                )
            })?;

        let pid = child.id();
        tracing::debug!(?pid, generation, "Encoder started");

        let stdin = child.stdin.take();
        let cancel = CancellationToken::new();
        let (exited_tx, exited_rx) = watch::channel(false);

        tokio::spawn(monitor(child, generation, events, cancel.clone(), exited_tx));

        Ok(Arc::new(FfmpegProcess {
            pid,
            stdin: Mutex::new(stdin),
            cancel,
            exited: exited_rx,
        }))
    }
}

/// Own the child until it exits, forwarding its output.
async fn monitor(
    mut child: Child,
    generation: u64,
    events: mpsc::UnboundedSender<ProcessEvent>,
    cancel: CancellationToken,
    exited: watch::Sender<bool>,
) {
    let readers: Vec<_> = [
        child.stdout.take().map(|s| Box::new(s) as Box<dyn AsyncRead + Send + Unpin>),
        child.stderr.take().map(|s| Box::new(s) as Box<dyn AsyncRead + Send + Unpin>),
    ]
    .into_iter()
    .flatten()
    .map(|reader| tokio::spawn(forward_output(reader, generation, events.clone())))
    .collect();

    let status = tokio::select! {
        status = child.wait() => status,
        _ = cancel.cancelled() => {
            if let Err(e) = child.start_kill() {
                tracing::warn!("Failed to kill encoder: {e}");
            }
            child.wait().await
        }
    };

    // Deliver all output before the exit notification.
    for reader in readers {
        let _ = reader.await;
    }

    let event = match status {
        Ok(status) => ProcessEvent::Exited {
            generation,
            outcome: status.into(),
        },
        Err(e) => ProcessEvent::Failed {
            generation,
            kind: ProcessErrorKind::Unknown,
            message: format!("waiting for encoder failed: {e}"),
        },
    };
    let _ = events.send(event);
    let _ = exited.send(true);
}

async fn forward_output(
    mut reader: Box<dyn AsyncRead + Send + Unpin>,
    generation: u64,
    events: mpsc::UnboundedSender<ProcessEvent>,
) {
    let mut buf = vec![0u8; 4096];
    loop {
        match reader.read(&mut buf).await {
            Ok(0) => break,
            Ok(n) => {
                let text = String::from_utf8_lossy(&buf[..n]).into_owned();
                if events.send(ProcessEvent::Output { generation, text }).is_err() {
                    break;
                }
            }
            Err(e) => {
                let _ = events.send(ProcessEvent::Failed {
                    generation,
                    kind: ProcessErrorKind::ReadError,
                    message: e.to_string(),
                });
                break;
            }
        }
    }
}

struct FfmpegProcess {
    pid: Option<u32>,
    stdin: Mutex<Option<ChildStdin>>,
    cancel: CancellationToken,
    exited: watch::Receiver<bool>,
}

#[async_trait]
impl EncoderProcess for FfmpegProcess {
    fn id(&self) -> Option<u32> {
        self.pid
    }

    async fn quit(&self) -> ffb_core::Result<()> {
        let mut stdin = self.stdin.lock().await;
        let pipe = stdin.as_mut().ok_or_else(|| {
            Error::process(ProcessErrorKind::WriteError, "encoder stdin is closed")
        })?;
        let write = async {
            pipe.write_all(b"q\n").await?;
            pipe.flush().await
        };
        write
            .await
            .map_err(|e| Error::process(ProcessErrorKind::WriteError, e.to_string()))
    }

    async fn wait_for_exit(&self, timeout: Duration) -> bool {
        let mut exited = self.exited.clone();
        // A closed channel also means the monitor is done.
        let done = tokio::time::timeout(timeout, exited.wait_for(|done| *done))
            .await
            .is_ok();
        done
    }

    fn kill(&self) {
        self.cancel.cancel();
    }
}
