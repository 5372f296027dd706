//! # ffb-av
//!
//! Everything that talks to the encoder binary, or parses what it says.
//!
//! This crate provides:
//!
//! - **Binary discovery** ([`tools`]) -- locate the configured or `PATH`
//!   encoder and report its version.
//! - **Command execution** ([`ToolCommand`]) -- async builder with timeout
//!   support for short query runs.
//! - **Capability probing** ([`probe`]) -- [`CapabilityProbe`] and the
//!   listing parsers behind [`CliProbe`].
//! - **Argument building** ([`args`]) -- turn a queue item into the encoder's
//!   argument vector.
//! - **Progress parsing** ([`ProgressParser`]) -- incremental `-stats` line
//!   parsing with remaining-time estimates.
//! - **Process supervision primitives** ([`process`]) -- launch a long-running
//!   encoder and receive its output and exit as events.
//! - **Presets** ([`preset`]) -- JSON import and export of output settings.

/// Declare a lazily compiled, process-wide regular expression accessor.
macro_rules! static_pattern {
    ($name:ident, $re:expr) => {
        fn $name() -> &'static regex::Regex {
            static PATTERN: std::sync::OnceLock<regex::Regex> = std::sync::OnceLock::new();
            PATTERN.get_or_init(|| {
                regex::Regex::new($re).expect(concat!("invalid pattern ", stringify!($name)))
            })
        }
    };
}

pub mod args;
pub mod command;
pub mod preset;
pub mod probe;
pub mod process;
pub mod progress;
pub mod tools;

// ---- Re-exports for convenience ----

pub use command::{ToolCommand, ToolOutput};
pub use probe::{CapabilityProbe, CliProbe, ProbeTimeouts};
pub use process::{EncoderProcess, ExitOutcome, FfmpegLauncher, ProcessEvent, ProcessLauncher};
pub use progress::{ProgressParser, StatsLine};
pub use tools::{check_binary, resolve_binary, ToolInfo, DEFAULT_BINARY};
