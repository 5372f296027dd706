//! One-encode-at-a-time process supervisor.
//!
//! The supervisor pops items from the [`JobQueue`], builds their argument
//! vectors, launches the encoder, and feeds the encoder's output through a
//! [`ProgressParser`]. Process notifications arrive on an mpsc channel that
//! [`Supervisor::run`] drains; each launch is tagged with a generation so
//! notifications from a process the supervisor has already let go of are
//! dropped.
//!
//! ```text
//!            encode()                 normal exit, queue empty
//!  Waiting ───────────► Encoding ─────────────────────────────► Waiting
//!     ▲                  │    ▲ │
//!     │ stop()   crash / │    └─┘ normal exit, next item
//!     │        failure   ▼
//!     └─────────────── Error
//! ```

use std::sync::Arc;
use std::time::{Duration, Instant};

use ffb_av::{args, CapabilityProbe, EncoderProcess, ExitOutcome, ProcessEvent, ProcessLauncher, ProgressParser};
use ffb_core::{
    CatalogStore, EncoderStatus, Error, EventBus, EventPayload, MediaDescriptor, ProcessErrorKind,
    ProgressSnapshot, QueueItem, QueueItemStatus, Result,
};
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::queue::JobQueue;

/// Grace period between the quit request and a forced kill.
pub const DEFAULT_STOP_TIMEOUT: Duration = Duration::from_millis(3000);

/// The failure that put the supervisor into [`EncoderStatus::Error`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LastError {
    /// The encoder binary is missing. Nothing can run until it is fixed.
    BinaryNotFound { path: String },
    /// The encoder process failed.
    Process {
        kind: ProcessErrorKind,
        detail: String,
    },
}

impl LastError {
    pub fn is_fatal(&self) -> bool {
        matches!(self, LastError::BinaryNotFound { .. })
    }

    pub fn kind(&self) -> Option<ProcessErrorKind> {
        match self {
            LastError::Process { kind, .. } => Some(*kind),
            LastError::BinaryNotFound { .. } => None,
        }
    }

    /// Human-readable description.
    pub fn message(&self) -> String {
        match self {
            LastError::BinaryNotFound { path } => format!("Encoder binary not found: {path}"),
            LastError::Process { kind, detail } if detail.is_empty() => kind.message().to_string(),
            LastError::Process { kind, detail } => format!("{} ({detail})", kind.message()),
        }
    }
}

impl From<&Error> for LastError {
    fn from(err: &Error) -> Self {
        match err {
            Error::BinaryNotFound { path } => LastError::BinaryNotFound { path: path.clone() },
            Error::Process { kind, message } => LastError::Process {
                kind: *kind,
                detail: message.clone(),
            },
            other => LastError::Process {
                kind: ProcessErrorKind::Unknown,
                detail: other.to_string(),
            },
        }
    }
}

struct RunningJob {
    item: QueueItem,
    process: Arc<dyn EncoderProcess>,
    parser: ProgressParser,
    started: Instant,
    generation: u64,
}

struct Inner {
    status: EncoderStatus,
    current: Option<RunningJob>,
    history: Vec<QueueItem>,
    last_error: Option<LastError>,
    last_progress: ProgressSnapshot,
    /// Output of the most recently ended job.
    last_output: String,
    generation: u64,
    /// A capability refresh is running outside the lock.
    probing: bool,
    /// encode() was called during a refresh.
    encode_requested: bool,
}

pub struct Supervisor {
    queue: JobQueue,
    inner: Mutex<Inner>,
    launcher: Arc<dyn ProcessLauncher>,
    catalog: Arc<CatalogStore>,
    events: Arc<EventBus>,
    tx: mpsc::UnboundedSender<ProcessEvent>,
    rx: Mutex<Option<mpsc::UnboundedReceiver<ProcessEvent>>>,
    stop_timeout: Duration,
}

impl Supervisor {
    pub fn new(
        launcher: Arc<dyn ProcessLauncher>,
        catalog: Arc<CatalogStore>,
        events: Arc<EventBus>,
    ) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            queue: JobQueue::new(),
            inner: Mutex::new(Inner {
                status: EncoderStatus::Waiting,
                current: None,
                history: Vec::new(),
                last_error: None,
                last_progress: ProgressSnapshot::default(),
                last_output: String::new(),
                generation: 0,
                probing: false,
                encode_requested: false,
            }),
            launcher,
            catalog,
            events,
            tx,
            rx: Mutex::new(Some(rx)),
            stop_timeout: DEFAULT_STOP_TIMEOUT,
        }
    }

    pub fn with_stop_timeout(mut self, timeout: Duration) -> Self {
        self.stop_timeout = timeout;
        self
    }

    // ---- Queue ------------------------------------------------------------

    pub fn queue(&self) -> &JobQueue {
        &self.queue
    }

    /// Queue `item` and start encoding if idle.
    pub fn encode_item(&self, item: QueueItem) -> Result<()> {
        self.queue.add(item)?;
        self.encode()
    }

    pub fn encode_items(&self, items: impl IntoIterator<Item = QueueItem>) -> Result<()> {
        for item in items {
            self.queue.add(item)?;
        }
        self.encode()
    }

    /// Queue a single-input job and start encoding if idle.
    pub fn encode_media(&self, input: MediaDescriptor, outputs: Vec<MediaDescriptor>) -> Result<()> {
        self.encode_item(QueueItem::new(vec![input], outputs))
    }

    // ---- Lifecycle --------------------------------------------------------

    /// Start the next queued item unless an encode is already running.
    ///
    /// During a capability refresh the request is held and served once the
    /// refresh completes.
    ///
    /// # Errors
    ///
    /// [`Error::BinaryNotFound`] if the encoder cannot be located. The queue
    /// is left untouched and the supervisor moves to the error state.
    pub fn encode(&self) -> Result<()> {
        let mut inner = self.inner.lock();
        if inner.status == EncoderStatus::Encoding {
            tracing::debug!("Encoder busy, encode request ignored");
            return Ok(());
        }
        if inner.probing {
            tracing::debug!("Capability refresh running, encode deferred");
            inner.encode_requested = true;
            return Ok(());
        }

        self.start(&mut inner)
    }

    fn start(&self, inner: &mut Inner) -> Result<()> {
        if let Err(e) = self.launcher.ensure_ready() {
            tracing::error!("Cannot encode: {e}");
            inner.last_error = Some(LastError::from(&e));
            self.set_status(inner, EncoderStatus::Error);
            return Err(e);
        }

        self.launch_next(inner);
        Ok(())
    }

    /// Stop the running encode, waiting the configured grace period.
    pub async fn stop(&self) {
        self.stop_with_timeout(self.stop_timeout).await
    }

    /// Ask the encoder to quit, wait up to `timeout`, then kill it.
    ///
    /// The stopped item goes to history and the queue does not advance.
    /// Without a running encode this only clears the error state.
    pub async fn stop_with_timeout(&self, timeout: Duration) {
        // Taking the job out retires its generation; status stays Encoding
        // until the process is gone so encode() cannot start another one.
        let job = {
            let mut inner = self.inner.lock();
            match inner.current.take() {
                Some(job) => job,
                None => {
                    if inner.status == EncoderStatus::Error {
                        self.set_status(&mut inner, EncoderStatus::Waiting);
                    }
                    return;
                }
            }
        };

        tracing::info!(item_id = %job.item.id, "Stopping encoder");
        if let Err(e) = job.process.quit().await {
            tracing::warn!("Quit request failed: {e}");
        }
        if !job.process.wait_for_exit(timeout).await {
            tracing::warn!("Encoder did not quit within {timeout:?}, killing it");
        }
        job.process.kill();

        let mut inner = self.inner.lock();
        let item_id = job.item.id;
        self.retire(&mut inner, job, QueueItemStatus::Stopped);
        self.events.broadcast(EventPayload::EncodingStopped { item_id });
        self.set_status(&mut inner, EncoderStatus::Waiting);
    }

    /// Drain process notifications until `shutdown` fires.
    pub async fn run(&self, shutdown: CancellationToken) {
        let rx = self.rx.lock().take();
        let Some(mut rx) = rx else {
            tracing::warn!("Supervisor event loop already running");
            return;
        };
        tracing::debug!("Supervisor event loop started");

        loop {
            tokio::select! {
                biased;

                _ = shutdown.cancelled() => break,
                event = rx.recv() => match event {
                    Some(event) => self.handle_event(event),
                    None => break,
                },
            }
        }

        tracing::debug!("Supervisor event loop stopped");
        *self.rx.lock() = Some(rx);
    }

    /// Apply one process notification.
    pub fn handle_event(&self, event: ProcessEvent) {
        let mut inner = self.inner.lock();
        let live = inner.current.as_ref().map(|job| job.generation);
        if live != Some(event.generation()) {
            tracing::trace!(generation = event.generation(), "Dropping stale process event");
            return;
        }

        match event {
            ProcessEvent::Output { text, .. } => {
                let Some(job) = inner.current.as_mut() else {
                    return;
                };
                tracing::trace!("{}", text.trim_end());
                let snapshots = job.parser.feed(&text, job.started.elapsed());
                let item_id = job.item.id;
                self.events.broadcast(EventPayload::Output { text });
                for snapshot in snapshots {
                    self.events.broadcast(EventPayload::Progress { item_id, snapshot });
                }
            }
            ProcessEvent::Exited {
                outcome: ExitOutcome::Normal { code },
                ..
            } => {
                let Some(mut job) = inner.current.take() else {
                    return;
                };
                if let Some(snapshot) = job.parser.finish(job.started.elapsed()) {
                    let item_id = job.item.id;
                    self.events.broadcast(EventPayload::Progress { item_id, snapshot });
                }
                if code != 0 {
                    tracing::warn!(item_id = %job.item.id, "Encoder exited with code {code}");
                }

                let item_id = job.item.id;
                tracing::info!(%item_id, "Encoding finished");
                self.retire(&mut inner, job, QueueItemStatus::Finished);
                self.events.broadcast(EventPayload::EncodingFinished { item_id });
                self.launch_next(&mut inner);
            }
            ProcessEvent::Exited {
                outcome: ExitOutcome::Crashed { description },
                ..
            } => self.fail_current(&mut inner, ProcessErrorKind::Crashed, description),
            ProcessEvent::Failed { kind, message, .. } => {
                self.fail_current(&mut inner, kind, message)
            }
        }
    }

    /// Replace the catalog with a fresh probe result.
    ///
    /// Refused while encoding, since the probe and the encode share the
    /// binary, and while another refresh is running. Encode requests made
    /// during the refresh start once it completes.
    pub fn refresh_catalog(&self, probe: &dyn CapabilityProbe) -> Result<()> {
        {
            let mut inner = self.inner.lock();
            if inner.status == EncoderStatus::Encoding {
                return Err(Error::Validation(
                    "cannot refresh capabilities while encoding".into(),
                ));
            }
            if inner.probing {
                return Err(Error::Validation(
                    "a capability refresh is already running".into(),
                ));
            }
            inner.probing = true;
        }

        tracing::info!(probe = probe.name(), "Refreshing capability catalog");
        let result = probe.refresh_catalog();

        let mut inner = self.inner.lock();
        inner.probing = false;
        let outcome = match result {
            Ok(catalog) => {
                let payload = EventPayload::CatalogRefreshed {
                    video_encoders: catalog.video_encoders().len(),
                    audio_encoders: catalog.audio_encoders().len(),
                    muxers: catalog.muxers().len(),
                };
                self.catalog.replace(catalog);
                self.events.broadcast(payload);
                Ok(())
            }
            Err(e) => {
                if e.is_fatal() {
                    inner.last_error = Some(LastError::from(&e));
                    self.set_status(&mut inner, EncoderStatus::Error);
                }
                Err(e)
            }
        };

        if std::mem::take(&mut inner.encode_requested) {
            tracing::debug!("Starting encode deferred by the refresh");
            // Failures are recorded in last_error.
            let _ = self.start(&mut inner);
        }
        outcome
    }

    // ---- Accessors --------------------------------------------------------

    /// Items still waiting, head first.
    pub fn items(&self) -> Vec<QueueItem> {
        self.queue.items()
    }

    /// Finished and stopped items, oldest first.
    pub fn history(&self) -> Vec<QueueItem> {
        self.inner.lock().history.clone()
    }

    pub fn current_item(&self) -> Option<QueueItem> {
        self.inner.lock().current.as_ref().map(|job| job.item.clone())
    }

    pub fn status(&self) -> EncoderStatus {
        self.inner.lock().status
    }

    pub fn last_error(&self) -> Option<LastError> {
        self.inner.lock().last_error.clone()
    }

    /// Latest snapshot of the running job, or of the last one if idle.
    pub fn last_progress(&self) -> ProgressSnapshot {
        let inner = self.inner.lock();
        match &inner.current {
            Some(job) => job.parser.last(),
            None => inner.last_progress,
        }
    }

    /// Output of the running job, or of the last one if idle.
    pub fn output(&self) -> String {
        let inner = self.inner.lock();
        match &inner.current {
            Some(job) => job.parser.output().to_string(),
            None => inner.last_output.clone(),
        }
    }

    pub fn events(&self) -> &Arc<EventBus> {
        &self.events
    }

    // ---- Internals --------------------------------------------------------

    fn set_status(&self, inner: &mut Inner, status: EncoderStatus) {
        if inner.status == status {
            return;
        }
        tracing::info!("Encoder status: {} -> {}", inner.status, status);
        inner.status = status;
        self.events.broadcast(EventPayload::StatusChanged { status });
    }

    /// Pop and launch the head of the queue, or go idle.
    fn launch_next(&self, inner: &mut Inner) {
        let mut item = loop {
            let Some(mut item) = self.queue.pop_front() else {
                self.set_status(inner, EncoderStatus::Waiting);
                return;
            };
            if item.advance(QueueItemStatus::InProgress) {
                break item;
            }
            tracing::warn!(item_id = %item.id, status = %item.status(), "Skipping item that cannot start");
        };

        let catalog = self.catalog.snapshot();
        let args = args::build(&item, &catalog);
        tracing::debug!(item_id = %item.id, ?args, "Launching encoder");
        self.events.broadcast(EventPayload::DebugInfo {
            message: args.join(" "),
        });

        inner.generation += 1;
        let generation = inner.generation;

        match self.launcher.launch(&args, generation, self.tx.clone()) {
            Ok(process) => {
                let item_id = item.id;
                tracing::info!(%item_id, pid = ?process.id(), "Encoding started");
                inner.current = Some(RunningJob {
                    parser: ProgressParser::new(item.expected_frames()),
                    item,
                    process,
                    started: Instant::now(),
                    generation,
                });
                self.set_status(inner, EncoderStatus::Encoding);
                self.events.broadcast(EventPayload::EncodingStarted { item_id });
            }
            Err(e) => {
                tracing::error!(item_id = %item.id, "Failed to launch encoder: {e}");
                item.advance(QueueItemStatus::Stopped);
                let item_id = item.id;
                inner.history.push(item);
                self.record_failure(inner, &e);
                self.events.broadcast(EventPayload::EncodingStopped { item_id });
            }
        }
    }

    fn fail_current(&self, inner: &mut Inner, kind: ProcessErrorKind, detail: String) {
        let Some(job) = inner.current.take() else {
            return;
        };
        job.process.kill();

        let item_id = job.item.id;
        tracing::error!(%item_id, "Encoder failed [{kind}]: {detail}");
        self.retire(inner, job, QueueItemStatus::Stopped);
        self.record_failure(inner, &Error::process(kind, detail));
        self.events.broadcast(EventPayload::EncodingStopped { item_id });
    }

    fn record_failure(&self, inner: &mut Inner, err: &Error) {
        let last = LastError::from(err);
        if let Some(kind) = last.kind() {
            self.events.broadcast(EventPayload::ProcessError {
                kind,
                message: last.message(),
            });
        }
        inner.last_error = Some(last);
        self.set_status(inner, EncoderStatus::Error);
    }

    /// Move a job's item to history with its final status.
    fn retire(&self, inner: &mut Inner, mut job: RunningJob, status: QueueItemStatus) {
        job.item.advance(status);
        inner.last_progress = job.parser.last();
        inner.last_output = job.parser.into_output();
        inner.history.push(job.item);
    }
}
