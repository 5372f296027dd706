//! ffbatch - batch transcoding queue driving an external ffmpeg binary
//!
//! This library crate exposes the queue, the supervisor and configuration
//! for the CLI and for integration testing.

pub mod config;
pub mod jobfile;
pub mod queue;
pub mod supervisor;

pub use queue::JobQueue;
pub use supervisor::{LastError, Supervisor, DEFAULT_STOP_TIMEOUT};
