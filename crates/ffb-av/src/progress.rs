//! Incremental parser for the encoder's `-stats` output.
//!
//! The encoder rewrites one status line in place, terminating it with `\r`:
//!
//! ```text
//! frame=  120 fps= 24 q=28.0 size=    2048kB time=00:00:05.00 bitrate=3277.0kbits/s speed=1.2x
//! ```
//!
//! Output arrives in arbitrary chunks. [`ProgressParser`] keeps every chunk
//! in a per-job accumulator, buffers the unterminated tail, and parses each
//! complete line.

use std::time::Duration;

use ffb_core::ProgressSnapshot;

static_pattern!(
    stats_line,
    r"(?:frame= *(\d+).*fps= *(\d+(?:\.\d+)?).*)?size= *(?:(\d+)(?:kB|KiB))?.*time=(\d\d):(\d\d):(\d\d)\.(\d\d).*bitrate= *(?:(\d+)(?:\.\d+)?kbits?)?.*speed= *(\d+(?:\.\d*)?)x"
);

/// Fields read from one status line. Absent optional fields are zero.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct StatsLine {
    pub frame: u64,
    pub fps: f64,
    pub size_bytes: u64,
    pub out_time_secs: f64,
    pub bitrate_bps: u64,
    pub speed: f64,
}

impl StatsLine {
    /// Parse a status line, or `None` if `line` is not one.
    ///
    /// Sizes are reported in kibibytes and bitrates in kibibits; both are
    /// scaled by 1024.
    pub fn parse(line: &str) -> Option<Self> {
        let caps = stats_line().captures(line)?;
        let int = |i: usize| {
            caps.get(i)
                .and_then(|m| m.as_str().parse::<u64>().ok())
                .unwrap_or(0)
        };
        let float = |i: usize| {
            caps.get(i)
                .and_then(|m| m.as_str().parse::<f64>().ok())
                .unwrap_or(0.0)
        };

        Some(Self {
            frame: int(1),
            fps: float(2),
            size_bytes: int(3) * 1024,
            out_time_secs: float(4) * 3600.0 + float(5) * 60.0 + float(6) + float(7) / 100.0,
            bitrate_bps: int(8) * 1024,
            speed: float(9),
        })
    }
}

/// Per-job progress state.
#[derive(Debug, Clone, Default)]
pub struct ProgressParser {
    /// Frames the job is expected to produce; zero when unknown.
    expected_frames: u64,
    output: String,
    pending: String,
    last: ProgressSnapshot,
}

impl ProgressParser {
    pub fn new(expected_frames: u64) -> Self {
        Self {
            expected_frames,
            ..Default::default()
        }
    }

    /// Everything received since the job started, in arrival order.
    pub fn output(&self) -> &str {
        &self.output
    }

    /// Give up the accumulated output.
    pub fn into_output(self) -> String {
        self.output
    }

    /// The most recent snapshot.
    pub fn last(&self) -> ProgressSnapshot {
        self.last
    }

    /// Consume a chunk of output.
    ///
    /// `elapsed` is the wall-clock time since the job started. Returns one
    /// snapshot per complete status line in the chunk.
    pub fn feed(&mut self, chunk: &str, elapsed: Duration) -> Vec<ProgressSnapshot> {
        self.output.push_str(chunk);
        self.pending.push_str(chunk);

        let Some(end) = self.pending.rfind(['\r', '\n']) else {
            return Vec::new();
        };
        let tail = self.pending.split_off(end + 1);
        let complete = std::mem::replace(&mut self.pending, tail);

        complete
            .split(['\r', '\n'])
            .filter_map(|line| self.apply(line, elapsed))
            .collect()
    }

    /// Parse whatever is left unterminated once the process has exited.
    pub fn finish(&mut self, elapsed: Duration) -> Option<ProgressSnapshot> {
        let tail = std::mem::take(&mut self.pending);
        self.apply(&tail, elapsed)
    }

    fn apply(&mut self, line: &str, elapsed: Duration) -> Option<ProgressSnapshot> {
        let stats = StatsLine::parse(line)?;

        let mut snapshot = ProgressSnapshot {
            frame: stats.frame,
            fps: stats.fps,
            size_bytes: stats.size_bytes,
            bitrate_bps: stats.bitrate_bps,
            speed: stats.speed,
            out_time_secs: stats.out_time_secs,
            remaining_secs: self.last.remaining_secs,
        };

        if stats.frame > 0 && self.expected_frames > 0 {
            let elapsed = u128::from(elapsed.as_secs());
            let total = elapsed * u128::from(self.expected_frames) / u128::from(stats.frame);
            let remaining = total.saturating_sub(elapsed);
            snapshot.remaining_secs = u64::try_from(remaining).unwrap_or(u64::MAX);
        }

        self.last = snapshot;
        Some(snapshot)
    }
}
