//! Unified error type for the ffbatch crates.
//!
//! Every failure funnels into [`Error`]. Process-level failures carry a
//! [`ProcessErrorKind`] so the supervisor can record the last error kind next
//! to its human-readable message.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Classification of a failure reported by the encoder process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessErrorKind {
    /// The process could not be spawned.
    FailedToStart,
    /// The process was terminated by a signal.
    Crashed,
    /// A query did not finish within its time budget.
    Timeout,
    /// Writing to the process's stdin failed.
    WriteError,
    /// Reading the process's output failed.
    ReadError,
    /// Anything else.
    Unknown,
}

impl ProcessErrorKind {
    /// Human-readable description surfaced to observers.
    pub fn message(&self) -> &'static str {
        match self {
            ProcessErrorKind::FailedToStart => "Failed to start the encoder.",
            ProcessErrorKind::Crashed => "The encoder crashed.",
            ProcessErrorKind::Timeout => "Operation timed out.",
            ProcessErrorKind::WriteError => "Could not write to the encoder.",
            ProcessErrorKind::ReadError => "Cannot read the encoder output.",
            ProcessErrorKind::Unknown => "An unknown error occurred.",
        }
    }
}

impl fmt::Display for ProcessErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ProcessErrorKind::FailedToStart => "failed to start",
            ProcessErrorKind::Crashed => "crashed",
            ProcessErrorKind::Timeout => "timeout",
            ProcessErrorKind::WriteError => "write error",
            ProcessErrorKind::ReadError => "read error",
            ProcessErrorKind::Unknown => "unknown",
        };
        f.write_str(name)
    }
}

/// Unified error type covering all failure modes in ffbatch.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The encoder binary does not exist. Disables probing and encoding.
    #[error("Encoder binary not found: {path}")]
    BinaryNotFound {
        /// The path (or program name) that was looked up.
        path: String,
    },

    /// The encoder process failed.
    #[error("Process error [{kind}]: {message}")]
    Process {
        /// What went wrong.
        kind: ProcessErrorKind,
        /// Human-readable error description.
        message: String,
    },

    /// A probe listing line did not match the expected grammar.
    #[error("Malformed probe line: {0}")]
    MalformedProbeLine(String),

    /// A preset document could not be mapped to a media descriptor.
    #[error("Malformed preset record: {0}")]
    MalformedPresetRecord(String),

    /// A positional queue index did not address an item.
    #[error("Index {index} out of range for queue of length {len}")]
    IndexOutOfRange {
        /// The requested index.
        index: usize,
        /// The queue length at the time of the request.
        len: usize,
    },

    /// Input data failed validation.
    #[error("Validation error: {0}")]
    Validation(String),

    /// An I/O operation failed.
    #[error("IO error: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Catch-all for unexpected internal errors.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Whether the error disables the engine altogether.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Error::BinaryNotFound { .. })
    }

    /// The process error kind, if this is a process failure.
    pub fn process_kind(&self) -> Option<ProcessErrorKind> {
        match self {
            Error::Process { kind, .. } => Some(*kind),
            _ => None,
        }
    }

    /// Convenience constructor for [`Error::BinaryNotFound`].
    pub fn binary_not_found(path: impl fmt::Display) -> Self {
        Error::BinaryNotFound {
            path: path.to_string(),
        }
    }

    /// Convenience constructor for [`Error::Process`].
    pub fn process(kind: ProcessErrorKind, message: impl Into<String>) -> Self {
        Error::Process {
            kind,
            message: message.into(),
        }
    }
}

/// Result alias using the crate-level [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn binary_not_found_is_fatal() {
        let err = Error::binary_not_found("/opt/ffmpeg/bin/ffmpeg");
        assert_eq!(
            err.to_string(),
            "Encoder binary not found: /opt/ffmpeg/bin/ffmpeg"
        );
        assert!(err.is_fatal());
    }

    #[test]
    fn process_errors_are_not_fatal() {
        let err = Error::process(ProcessErrorKind::Crashed, "signal 9");
        assert_eq!(err.to_string(), "Process error [crashed]: signal 9");
        assert!(!err.is_fatal());
        assert_eq!(err.process_kind(), Some(ProcessErrorKind::Crashed));
    }

    #[test]
    fn index_out_of_range_display() {
        let err = Error::IndexOutOfRange { index: 4, len: 2 };
        assert_eq!(
            err.to_string(),
            "Index 4 out of range for queue of length 2"
        );
        assert_eq!(err.process_kind(), None);
    }

    #[test]
    fn malformed_preset_display() {
        let err = Error::MalformedPresetRecord("missing root".into());
        assert_eq!(err.to_string(), "Malformed preset record: missing root");
    }

    #[test]
    fn io_from_std() {
        let io_err = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "pipe closed");
        let err = Error::from(io_err);
        assert!(matches!(err, Error::Io { .. }));
        assert!(!err.is_fatal());
    }

    #[test]
    fn kind_messages_are_distinct() {
        let kinds = [
            ProcessErrorKind::FailedToStart,
            ProcessErrorKind::Crashed,
            ProcessErrorKind::Timeout,
            ProcessErrorKind::WriteError,
            ProcessErrorKind::ReadError,
            ProcessErrorKind::Unknown,
        ];
        let mut messages: Vec<&str> = kinds.iter().map(|k| k.message()).collect();
        messages.sort_unstable();
        messages.dedup();
        assert_eq!(messages.len(), kinds.len());
    }

    #[test]
    fn kind_serializes_snake_case() {
        let json = serde_json::to_string(&ProcessErrorKind::FailedToStart).unwrap();
        assert_eq!(json, "\"failed_to_start\"");
    }
}
