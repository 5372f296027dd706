use ffb_av::ProbeTimeouts;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub encoder: EncoderConfig,

    #[serde(default)]
    pub probe: ProbeConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EncoderConfig {
    /// Encoder binary. Looked up on `PATH` when unset.
    #[serde(default)]
    pub binary_path: Option<PathBuf>,

    /// Grace period after asking the encoder to quit before it is killed
    #[serde(default = "default_stop_timeout_ms")]
    pub stop_timeout_ms: u64,
}

fn default_stop_timeout_ms() -> u64 {
    3000
}

impl Default for EncoderConfig {
    fn default() -> Self {
        Self {
            binary_path: None,
            stop_timeout_ms: default_stop_timeout_ms(),
        }
    }
}

impl EncoderConfig {
    pub fn stop_timeout(&self) -> Duration {
        Duration::from_millis(self.stop_timeout_ms)
    }
}

/// Per-query timeouts, in seconds.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ProbeConfig {
    #[serde(default = "default_listing_timeout")]
    pub codecs: u64,

    #[serde(default = "default_listing_timeout")]
    pub formats: u64,

    #[serde(default = "default_help_timeout")]
    pub help: u64,

    #[serde(default = "default_help_timeout")]
    pub long_help: u64,

    #[serde(default = "default_listing_timeout")]
    pub muxer_details: u64,

    #[serde(default = "default_help_timeout")]
    pub media_info: u64,
}

fn default_listing_timeout() -> u64 {
    10
}

fn default_help_timeout() -> u64 {
    3
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            codecs: default_listing_timeout(),
            formats: default_listing_timeout(),
            help: default_help_timeout(),
            long_help: default_help_timeout(),
            muxer_details: default_listing_timeout(),
            media_info: default_help_timeout(),
        }
    }
}

impl ProbeConfig {
    pub fn timeouts(&self) -> ProbeTimeouts {
        ProbeTimeouts {
            codecs: Duration::from_secs(self.codecs),
            formats: Duration::from_secs(self.formats),
            help: Duration::from_secs(self.help),
            long_help: Duration::from_secs(self.long_help),
            muxer_details: Duration::from_secs(self.muxer_details),
            media_info: Duration::from_secs(self.media_info),
        }
    }

    /// Named timeouts, for validation and display.
    pub fn entries(&self) -> [(&'static str, u64); 6] {
        [
            ("codecs", self.codecs),
            ("formats", self.formats),
            ("help", self.help),
            ("long_help", self.long_help),
            ("muxer_details", self.muxer_details),
            ("media_info", self.media_info),
        ]
    }
}
