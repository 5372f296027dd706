//! Queue items, their lifecycle, and encoder-level state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::QueueItemId;
use crate::media::MediaDescriptor;

/// Lifecycle of a queue item. Transitions only move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueueItemStatus {
    Queued,
    InProgress,
    Finished,
    Stopped,
}

impl QueueItemStatus {
    pub fn can_transition_to(self, next: QueueItemStatus) -> bool {
        use QueueItemStatus::*;
        matches!(
            (self, next),
            (Queued, InProgress) | (InProgress, Finished) | (InProgress, Stopped)
        )
    }

    /// Whether the item has left the encoder for good.
    pub fn is_terminal(self) -> bool {
        matches!(self, QueueItemStatus::Finished | QueueItemStatus::Stopped)
    }
}

impl std::fmt::Display for QueueItemStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            QueueItemStatus::Queued => "queued",
            QueueItemStatus::InProgress => "in progress",
            QueueItemStatus::Finished => "finished",
            QueueItemStatus::Stopped => "stopped",
        };
        f.write_str(s)
    }
}

/// One transcoding job: a set of inputs feeding a set of outputs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueItem {
    pub id: QueueItemId,
    pub inputs: Vec<MediaDescriptor>,
    pub outputs: Vec<MediaDescriptor>,
    status: QueueItemStatus,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl QueueItem {
    pub fn new(inputs: Vec<MediaDescriptor>, outputs: Vec<MediaDescriptor>) -> Self {
        Self {
            id: QueueItemId::new(),
            inputs,
            outputs,
            status: QueueItemStatus::Queued,
            created_at: Utc::now(),
            started_at: None,
            completed_at: None,
        }
    }

    pub fn single(input: MediaDescriptor, output: MediaDescriptor) -> Self {
        Self::new(vec![input], vec![output])
    }

    pub fn status(&self) -> QueueItemStatus {
        self.status
    }

    /// Move to `next` if the transition is allowed.
    ///
    /// Returns `false` and leaves the item untouched otherwise.
    pub fn advance(&mut self, next: QueueItemStatus) -> bool {
        if !self.status.can_transition_to(next) {
            return false;
        }
        self.status = next;
        match next {
            QueueItemStatus::InProgress => self.started_at = Some(Utc::now()),
            QueueItemStatus::Finished | QueueItemStatus::Stopped => {
                self.completed_at = Some(Utc::now())
            }
            QueueItemStatus::Queued => {}
        }
        true
    }

    /// Total frame count of the first input carrying video, used as the
    /// denominator for remaining-time estimates.
    pub fn expected_frames(&self) -> u64 {
        self.inputs
            .iter()
            .find(|input| input.has_video)
            .map(MediaDescriptor::total_frames)
            .unwrap_or(0)
    }
}

/// Engine-level state of the encoder supervisor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EncoderStatus {
    /// Ready for work.
    Waiting,
    /// An encoder process is running.
    Encoding,
    /// The last operation failed.
    Error,
}

impl std::fmt::Display for EncoderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            EncoderStatus::Waiting => "waiting",
            EncoderStatus::Encoding => "encoding",
            EncoderStatus::Error => "error",
        };
        f.write_str(s)
    }
}

/// Metrics extracted from one encoder status line.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ProgressSnapshot {
    /// Frames encoded so far.
    pub frame: u64,
    /// Encoding frames per second.
    pub fps: f64,
    /// Output size in bytes.
    pub size_bytes: u64,
    /// Output bitrate in bits per second.
    pub bitrate_bps: u64,
    /// Encoding speed as a multiple of real time.
    pub speed: f64,
    /// Position in the output, in seconds.
    pub out_time_secs: f64,
    /// Estimated seconds until the item finishes.
    pub remaining_secs: u64,
}
